pub mod graphics {
    pub mod canvas;
    pub mod easing;
    pub mod graphics_context;
    pub mod redraw_thread;
    pub mod render_loop;
    pub mod spark;
    pub mod viewport;
}

pub mod input {
    pub mod listeners;
    pub mod pointer;
}

pub mod utils {
    pub mod clock;
    pub mod geometry;
}

pub mod click_spark;
pub mod config;

pub(crate) mod window_host;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use winit::application::ApplicationHandler;
use winit::error::EventLoopError;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy};

use click_spark::ClickSpark;
use config::AppConfig;
use graphics::canvas::PixmapCanvas;
use graphics::graphics_context::{GraphicsContext, OverlayError};
use graphics::render_loop::FrameHandle;
use input::listeners::ListenerKind;
use input::pointer::{PointerEvent, PointerTracker};
use utils::clock::{default_clock, Clock};
use window_host::{window_viewport, WindowHost};

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Failed to create overlay: {0}")]
    OverlayError(#[from] OverlayError),
}

/// Everything that lives as long as the window.
///
/// Field order matters for drop: the GPU surface goes before the window it
/// was created from.
struct Overlay<'a> {
    gfx: GraphicsContext<'a>,
    spark: Option<ClickSpark<PixmapCanvas>>,
    pointer: PointerTracker,
    host: WindowHost,
    /// The canvas changed since it was last uploaded.
    canvas_dirty: bool,
}

impl Overlay<'_> {
    fn pointer_down(&mut self, event: PointerEvent) {
        if !self.host.is_listening(ListenerKind::PointerDown) {
            return;
        }
        if let Some(spark) = self.spark.as_mut() {
            let spawned = spark.on_pointer_down(&event);
            log::debug!("Overlay::pointer_down: {event:?} spawned {spawned}");
        }
    }

    fn viewport_changed(&mut self) {
        if !self.host.is_listening(ListenerKind::ViewportResize) {
            return;
        }
        if let Some(spark) = self.spark.as_mut() {
            spark.on_resize(window_viewport(self.gfx.window()));
            self.canvas_dirty = true;
        }
    }
}

impl Drop for Overlay<'_> {
    fn drop(&mut self) {
        if let Some(spark) = self.spark.take() {
            spark.unmount(&mut self.host);
        }
    }
}

/// Demo host: a window whose clicks spawn sparks on top of a plain backdrop.
pub struct Application<'a> {
    overlay: Option<Overlay<'a>>,
    config: AppConfig,
    seed: Option<u64>,
    clock: Arc<dyn Clock>,
    event_loop_proxy: EventLoopProxy<UserEvent>,
}

impl<'a> Application<'a> {
    pub fn new(input: RenderLoopRunArgs, event_loop_proxy: EventLoopProxy<UserEvent>) -> Self {
        Self {
            overlay: None,
            config: input.config,
            seed: input.seed,
            clock: default_clock(),
            event_loop_proxy,
        }
    }

    fn create_overlay(&self, event_loop: &ActiveEventLoop) -> Result<Overlay<'a>, ApplicationError> {
        let mut host = WindowHost::new(
            event_loop,
            &self.config.window,
            self.event_loop_proxy.clone(),
        )?;
        let window = host.window();
        let gfx = GraphicsContext::new(window.clone(), self.config.window.background_color())?;

        let spark = match self.seed {
            Some(seed) => ClickSpark::mount_with_seed(&mut host, &self.config.spark, seed),
            None => ClickSpark::mount(&mut host, &self.config.spark),
        };

        Ok(Overlay {
            gfx,
            spark,
            pointer: PointerTracker::new(window.scale_factor()),
            host,
            canvas_dirty: false,
        })
    }
}

impl ApplicationHandler<UserEvent> for Application<'_> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.overlay.is_some() {
            return;
        }
        log::info!("Application::resumed: creating overlay");
        match self.create_overlay(event_loop) {
            Ok(overlay) => self.overlay = Some(overlay),
            Err(e) => {
                log::error!("Application::resumed: {e}");
                event_loop.exit();
            }
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: UserEvent) {
        match event {
            UserEvent::Frame(handle) => {
                let Some(overlay) = self.overlay.as_mut() else {
                    return;
                };
                let Some(spark) = overlay.spark.as_mut() else {
                    return;
                };
                if spark
                    .on_frame(&mut overlay.host, handle, self.clock.now())
                    .needs_present()
                {
                    overlay.canvas_dirty = true;
                    overlay.gfx.window().request_redraw();
                }
            }
            UserEvent::Terminate => {
                log::info!("user_event: terminate");
                self.overlay = None;
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        if let WindowEvent::CloseRequested = event {
            log::info!("window_event: close requested");
            self.overlay = None;
            event_loop.exit();
            return;
        }

        let Some(overlay) = self.overlay.as_mut() else {
            return;
        };
        match event {
            WindowEvent::RedrawRequested => {
                let canvas = overlay
                    .spark
                    .as_ref()
                    .filter(|_| overlay.canvas_dirty)
                    .map(|spark| spark.canvas());
                overlay.gfx.present(canvas);
                overlay.canvas_dirty = false;
            }
            WindowEvent::CursorMoved { position, .. } => overlay.pointer.cursor_moved(position),
            WindowEvent::CursorLeft { .. } => overlay.pointer.cursor_left(),
            WindowEvent::MouseInput { state, button, .. } => {
                if let Some(event) = overlay.pointer.mouse_input(state, button) {
                    overlay.pointer_down(event);
                }
            }
            WindowEvent::Touch(touch) => {
                if let Some(event) = overlay.pointer.touch(&touch) {
                    overlay.pointer_down(event);
                }
            }
            WindowEvent::Resized(size) => {
                overlay.gfx.resize(size.into());
                overlay.viewport_changed();
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                log::info!("window_event: scale factor changed to {scale_factor}");
                overlay.pointer.set_scale_factor(scale_factor);
                overlay.viewport_changed();
            }
            _ => {}
        }
    }
}

#[derive(Debug)]
pub enum UserEvent {
    /// A frame requested through the redraw thread became due.
    Frame(FrameHandle),
    Terminate,
}

pub struct RenderEventLoop {
    pub event_loop: EventLoop<UserEvent>,
}

pub struct RenderLoopRunArgs {
    pub config: AppConfig,
    /// Seeds the spark generator for reproducible bursts.
    pub seed: Option<u64>,
}

impl fmt::Display for RenderLoopRunArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Spark: {:?}, window: {:?}, seed: {:?}",
            self.config.spark, self.config.window, self.seed
        )
    }
}

#[derive(Error, Debug)]
pub enum RenderLoopError {
    #[error("Event loop error: {0}")]
    EventLoopError(#[from] EventLoopError),
    #[error("Failed to create application: {0}")]
    ApplicationError(#[from] ApplicationError),
}

impl RenderEventLoop {
    pub fn new() -> Result<Self, RenderLoopError> {
        let event_loop = EventLoop::<UserEvent>::with_user_event().build()?;
        Ok(Self { event_loop })
    }

    pub fn run(self, input: RenderLoopRunArgs) -> Result<(), RenderLoopError> {
        log::info!("Starting RenderEventLoop: {input}");
        let proxy = self.event_loop.create_proxy();
        let mut application = Application::new(input, proxy);
        self.event_loop.run_app(&mut application).map_err(|e| {
            log::error!("Error running application: {e:?}");
            RenderLoopError::EventLoopError(e)
        })
    }
}
