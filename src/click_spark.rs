//! The click spark overlay component.
//!
//! `ClickSpark` glues the pool, render loop, viewport adapter and pointer
//! input together over a [`HostEnvironment`]. The host renders its own UI
//! first and the spark canvas on top of it; the component never consumes
//! input, so whatever was clicked still handles the click.
//!
//! Lifecycle:
//! 1. [`ClickSpark::mount`] acquires the canvas, sizes it, registers the
//!    pointer-down and resize listeners and schedules the first frame. A host
//!    that cannot provide a canvas gets `None` back and nothing is registered.
//! 2. The host forwards events to [`ClickSpark::on_pointer_down`],
//!    [`ClickSpark::on_resize`] and [`ClickSpark::on_frame`].
//! 3. [`ClickSpark::unmount`] cancels the pending frame and removes both
//!    listeners.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::SparkConfig;
use crate::graphics::canvas::SparkCanvas;
use crate::graphics::render_loop::{
    FrameHandle, FrameOutcome, FrameScheduler, LoopState, RenderLoop,
};
use crate::graphics::spark::{Spark, SparkPool};
use crate::graphics::viewport::{Viewport, ViewportAdapter};
use crate::input::listeners::{ListenerHandle, ListenerKind};
use crate::input::pointer::PointerEvent;

/// What the component needs from the application embedding it.
pub trait HostEnvironment: FrameScheduler {
    type Canvas: SparkCanvas;

    /// Acquires the drawing surface. `None` when the host cannot draw.
    fn create_canvas(&mut self) -> Option<Self::Canvas>;

    fn viewport(&self) -> Viewport;

    fn add_listener(&mut self, kind: ListenerKind) -> ListenerHandle;

    fn remove_listener(&mut self, handle: ListenerHandle);
}

#[derive(Debug)]
pub struct ClickSpark<C: SparkCanvas> {
    pool: SparkPool,
    render_loop: RenderLoop,
    viewport: ViewportAdapter,
    canvas: C,
    listeners: Vec<ListenerHandle>,
}

impl<C: SparkCanvas> ClickSpark<C> {
    pub fn mount<H>(host: &mut H, config: &SparkConfig) -> Option<Self>
    where
        H: HostEnvironment<Canvas = C>,
    {
        Self::mount_with_rng(host, config, StdRng::from_entropy())
    }

    /// Mounts with a deterministic spark generator.
    pub fn mount_with_seed<H>(host: &mut H, config: &SparkConfig, seed: u64) -> Option<Self>
    where
        H: HostEnvironment<Canvas = C>,
    {
        Self::mount_with_rng(host, config, StdRng::seed_from_u64(seed))
    }

    fn mount_with_rng<H>(host: &mut H, config: &SparkConfig, rng: StdRng) -> Option<Self>
    where
        H: HostEnvironment<Canvas = C>,
    {
        let Some(mut canvas) = host.create_canvas() else {
            log::warn!("ClickSpark::mount: no drawing surface available, sparks disabled");
            return None;
        };

        let settings = config.settings();
        log::info!("ClickSpark::mount: {settings:?}");

        let mut viewport = ViewportAdapter::new();
        viewport.apply(host.viewport(), &mut canvas);

        let listeners = vec![
            host.add_listener(ListenerKind::PointerDown),
            host.add_listener(ListenerKind::ViewportResize),
        ];

        let mut render_loop = RenderLoop::new();
        render_loop.start(host);

        Some(Self {
            pool: SparkPool::with_rng(settings, rng),
            render_loop,
            viewport,
            canvas,
            listeners,
        })
    }

    /// Spawns a burst for a primary pointer-down. Other buttons are ignored.
    /// Returns the number of sparks spawned.
    pub fn on_pointer_down(&mut self, event: &PointerEvent) -> usize {
        if !self.is_mounted() || !event.is_primary() {
            return 0;
        }
        self.pool.spawn(event.position)
    }

    /// Returns whether the backing buffer was reallocated.
    pub fn on_resize(&mut self, viewport: Viewport) -> bool {
        if !self.is_mounted() {
            return false;
        }
        self.viewport.apply(viewport, &mut self.canvas)
    }

    /// Runs the frame callback for `handle`. Hosts only need to present the
    /// canvas when the outcome says so.
    pub fn on_frame<S: FrameScheduler + ?Sized>(
        &mut self,
        scheduler: &mut S,
        handle: FrameHandle,
        timestamp: Instant,
    ) -> FrameOutcome {
        let pixel_ratio = self.viewport.pixel_ratio() as f32;
        self.render_loop.run_frame(
            scheduler,
            handle,
            timestamp,
            &mut self.pool,
            &mut self.canvas,
            pixel_ratio,
        )
    }

    /// Cancels the pending frame and removes the listeners.
    pub fn unmount<H>(mut self, host: &mut H)
    where
        H: HostEnvironment<Canvas = C>,
    {
        self.teardown(host);
    }

    fn teardown<H>(&mut self, host: &mut H)
    where
        H: HostEnvironment<Canvas = C>,
    {
        self.render_loop.cancel(host);
        for handle in self.listeners.drain(..) {
            host.remove_listener(handle);
        }
        self.pool.clear();
        log::info!(
            "ClickSpark::unmount: stopped after {} frames",
            self.render_loop.frames()
        );
    }

    pub fn is_mounted(&self) -> bool {
        self.render_loop.state() != LoopState::Stopped
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.render_loop.pending()
    }

    pub fn loop_state(&self) -> LoopState {
        self.render_loop.state()
    }

    /// Live sparks, oldest first.
    pub fn sparks(&self) -> impl ExactSizeIterator<Item = &Spark> + '_ {
        self.pool.iter()
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }
}

impl<C: SparkCanvas> Drop for ClickSpark<C> {
    fn drop(&mut self) {
        if !self.listeners.is_empty() || self.render_loop.pending().is_some() {
            log::warn!("ClickSpark::drop: dropped while mounted, call unmount to release listeners");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::render_loop::tests::{RecordingCanvas, TestScheduler};
    use crate::input::listeners::ListenerRegistry;
    use crate::input::pointer::PointerButton;
    use crate::utils::clock::{Clock, TestClock};
    use crate::utils::geometry::{BufferSize, Extent, Position};

    struct TestHost {
        scheduler: TestScheduler,
        listeners: ListenerRegistry,
        viewport: Viewport,
        has_canvas: bool,
    }

    impl TestHost {
        fn new() -> Self {
            Self {
                scheduler: TestScheduler::default(),
                listeners: ListenerRegistry::new(),
                viewport: Viewport::new(Extent::new(800.0, 600.0), 2.0),
                has_canvas: true,
            }
        }
    }

    impl FrameScheduler for TestHost {
        fn request_frame(&mut self) -> FrameHandle {
            self.scheduler.request_frame()
        }

        fn cancel_frame(&mut self, handle: FrameHandle) {
            self.scheduler.cancel_frame(handle)
        }
    }

    impl HostEnvironment for TestHost {
        type Canvas = RecordingCanvas;

        fn create_canvas(&mut self) -> Option<RecordingCanvas> {
            self.has_canvas.then(RecordingCanvas::default)
        }

        fn viewport(&self) -> Viewport {
            self.viewport
        }

        fn add_listener(&mut self, kind: ListenerKind) -> ListenerHandle {
            self.listeners.add(kind)
        }

        fn remove_listener(&mut self, handle: ListenerHandle) {
            self.listeners.remove(handle);
        }
    }

    fn config(count: i64, duration: f32, max_sparks: i64) -> SparkConfig {
        SparkConfig {
            spark_count: count,
            duration,
            max_sparks,
            ..Default::default()
        }
    }

    /// Drives frames of `step_ms` until `total_ms` of time has passed.
    fn run_frames(
        spark: &mut ClickSpark<RecordingCanvas>,
        host: &mut TestHost,
        clock: &TestClock,
        step_ms: u64,
        total_ms: u64,
    ) {
        let mut elapsed = 0;
        while elapsed < total_ms {
            clock.advance_ms(step_ms);
            elapsed += step_ms;
            let handle = spark.pending_frame().unwrap();
            assert_ne!(spark.on_frame(host, handle, clock.now()), FrameOutcome::Ignored);
        }
    }

    #[test]
    fn mount_sizes_canvas_registers_listeners_and_schedules() {
        let mut host = TestHost::new();
        let spark = ClickSpark::mount_with_seed(&mut host, &SparkConfig::default(), 1).unwrap();

        assert_eq!(spark.canvas().size, BufferSize::new(1600, 1200));
        assert!(host.listeners.is_listening(ListenerKind::PointerDown));
        assert!(host.listeners.is_listening(ListenerKind::ViewportResize));
        assert_eq!(spark.loop_state(), LoopState::Scheduled);
        assert_eq!(host.scheduler.requested.len(), 1);

        spark.unmount(&mut host);
    }

    #[test]
    fn mount_without_canvas_is_a_noop() {
        let mut host = TestHost::new();
        host.has_canvas = false;
        let spark = ClickSpark::mount(&mut host, &SparkConfig::default());
        assert!(spark.is_none());
        assert!(host.listeners.is_empty());
        assert!(host.scheduler.requested.is_empty());
    }

    #[test]
    fn click_then_full_lifetime() {
        let mut host = TestHost::new();
        let clock = TestClock::new();
        let mut spark = ClickSpark::mount_with_seed(&mut host, &config(10, 500.0, 400), 42).unwrap();

        // first frame establishes the time base
        let handle = spark.pending_frame().unwrap();
        spark.on_frame(&mut host, handle, clock.now());

        assert_eq!(spark.on_pointer_down(&PointerEvent::primary(100.0, 200.0)), 10);
        assert_eq!(spark.sparks().len(), 10);
        for s in spark.sparks() {
            assert_eq!(s.origin, Position::new(100.0, 200.0));
            assert_eq!(s.age, 0.0);
            assert_eq!(s.time_to_live, 500.0);
        }

        run_frames(&mut spark, &mut host, &clock, 20, 480);
        assert_eq!(spark.sparks().len(), 10);
        assert_eq!(spark.canvas().strokes.len(), 10);

        run_frames(&mut spark, &mut host, &clock, 20, 20);
        assert_eq!(spark.sparks().len(), 0);
        assert!(spark.canvas().strokes.is_empty());

        // once the cleared canvas was shown, empty frames need no presentation
        clock.advance_ms(20);
        let handle = spark.pending_frame().unwrap();
        assert_eq!(spark.on_frame(&mut host, handle, clock.now()), FrameOutcome::Idle);

        spark.unmount(&mut host);
    }

    #[test]
    fn strokes_are_in_buffer_pixels() {
        let mut host = TestHost::new();
        let clock = TestClock::new();
        let mut spark = ClickSpark::mount_with_seed(&mut host, &config(3, 500.0, 10), 5).unwrap();

        spark.on_pointer_down(&PointerEvent::primary(100.0, 200.0));
        let handle = spark.pending_frame().unwrap();
        spark.on_frame(&mut host, handle, clock.now());

        // at age 0 each segment starts at the origin scaled by the ratio of 2
        for (segment, _) in &spark.canvas().strokes {
            assert!((segment.from.x - 200.0).abs() < 1e-3);
            assert!((segment.from.y - 400.0).abs() < 1e-3);
        }
        spark.unmount(&mut host);
    }

    #[test]
    fn non_primary_buttons_are_ignored() {
        let mut host = TestHost::new();
        let mut spark = ClickSpark::mount_with_seed(&mut host, &SparkConfig::default(), 1).unwrap();
        for button in [
            PointerButton::Secondary,
            PointerButton::Auxiliary,
            PointerButton::Other(4),
        ] {
            let event = PointerEvent {
                position: Position::new(1.0, 1.0),
                button,
            };
            assert_eq!(spark.on_pointer_down(&event), 0);
        }
        assert_eq!(spark.sparks().len(), 0);
        spark.unmount(&mut host);
    }

    #[test]
    fn pool_never_exceeds_max_sparks() {
        let mut host = TestHost::new();
        let mut spark = ClickSpark::mount_with_seed(&mut host, &config(20, 500.0, 45), 9).unwrap();
        for i in 0..10 {
            spark.on_pointer_down(&PointerEvent::primary(i as f64, 0.0));
            assert!(spark.sparks().len() <= 45);
        }
        // the 45 newest survive: 5 from click 7 and all of clicks 8 and 9
        let oldest = spark.sparks().next().unwrap().origin.x;
        assert_eq!(oldest, 7.0);
        spark.unmount(&mut host);
    }

    #[test]
    fn resize_twice_reallocates_once() {
        let mut host = TestHost::new();
        let mut spark = ClickSpark::mount_with_seed(&mut host, &SparkConfig::default(), 1).unwrap();
        let resized = Viewport::new(Extent::new(1280.0, 720.0), 1.0);

        assert!(spark.on_resize(resized));
        assert!(!spark.on_resize(resized));
        assert_eq!(spark.canvas().size, BufferSize::new(1280, 720));
        // mount + one real resize
        assert_eq!(spark.canvas().resizes, 2);
        spark.unmount(&mut host);
    }

    #[test]
    fn unmount_releases_everything() {
        let mut host = TestHost::new();
        let clock = TestClock::new();
        let mut spark = ClickSpark::mount_with_seed(&mut host, &SparkConfig::default(), 1).unwrap();
        let handle = spark.pending_frame().unwrap();
        spark.on_frame(&mut host, handle, clock.now());
        let pending = spark.pending_frame().unwrap();

        spark.unmount(&mut host);
        assert_eq!(host.scheduler.cancelled, vec![pending]);
        assert!(host.listeners.is_empty());
    }
}
