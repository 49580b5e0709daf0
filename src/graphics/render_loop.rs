//! Per-frame spark animation.
//!
//! The loop is a cancellable task driven by the host's frame callbacks. Every
//! frame it ages the pool, clears the canvas and strokes each live spark:
//!
//! ```text
//! Idle -> Scheduled -> Running -> Scheduled -> ... -> Stopped
//! ```
//!
//! The host calls [`RenderLoop::begin_frame`] with the handle it was asked to
//! schedule. Handles that are no longer pending, e.g. a callback that raced a
//! cancel, are ignored.

use std::time::Instant;

use cgmath::{Point2, Vector2};

use crate::config::SparkSettings;
use crate::graphics::canvas::{LineSegment, SparkCanvas, StrokeStyle};
use crate::graphics::spark::{Spark, SparkPool};

const SPEED_JITTER_DISTANCE: f32 = 8.0;
const MIN_LINE_LENGTH: f32 = 1.0;
const MIN_ALPHA: f32 = 0.05;
const MIN_LINE_WIDTH: f32 = 0.8;

/// Identifies one requested frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Host primitive that runs a callback once on the next display refresh.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Scheduled,
    Running,
    Stopped,
}

/// What a frame callback did to the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The handle was not the pending frame, nothing ran.
    Ignored,
    /// Canvas content changed and has to be presented.
    Drawn,
    /// Canvas was empty on this frame and the previous one.
    Idle,
}

impl FrameOutcome {
    pub fn needs_present(self) -> bool {
        self == FrameOutcome::Drawn
    }
}

#[derive(Debug)]
pub struct RenderLoop {
    state: LoopState,
    pending: Option<FrameHandle>,
    last_timestamp: Option<Instant>,
    frames: u64,
    // strokes drawn by the previous frame
    last_strokes: usize,
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderLoop {
    pub fn new() -> Self {
        Self {
            state: LoopState::Idle,
            pending: None,
            last_timestamp: None,
            frames: 0,
            last_strokes: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }

    /// Number of frames rendered so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn start<S: FrameScheduler + ?Sized>(&mut self, scheduler: &mut S) {
        if self.state != LoopState::Idle {
            log::warn!("RenderLoop::start: already started ({:?})", self.state);
            return;
        }
        self.pending = Some(scheduler.request_frame());
        self.state = LoopState::Scheduled;
    }

    /// Enters `Running` for `handle` and returns the elapsed milliseconds since
    /// the previous frame (0 for the first one). Returns `None` when `handle`
    /// is not the pending frame.
    pub fn begin_frame(&mut self, handle: FrameHandle, timestamp: Instant) -> Option<f32> {
        if self.state != LoopState::Scheduled || self.pending != Some(handle) {
            log::trace!("RenderLoop::begin_frame: ignoring {handle:?} in {:?}", self.state);
            return None;
        }
        self.pending = None;
        self.state = LoopState::Running;

        let delta = match self.last_timestamp {
            Some(last) => timestamp.saturating_duration_since(last).as_secs_f32() * 1000.0,
            None => 0.0,
        };
        self.last_timestamp = Some(timestamp);
        Some(delta)
    }

    /// Leaves `Running` by scheduling the next frame.
    pub fn end_frame<S: FrameScheduler + ?Sized>(&mut self, scheduler: &mut S) {
        if self.state != LoopState::Running {
            return;
        }
        self.frames += 1;
        self.pending = Some(scheduler.request_frame());
        self.state = LoopState::Scheduled;
    }

    /// Cancels the pending frame, if any. The loop cannot be restarted.
    pub fn cancel<S: FrameScheduler + ?Sized>(&mut self, scheduler: &mut S) {
        if let Some(handle) = self.pending.take() {
            scheduler.cancel_frame(handle);
        }
        self.state = LoopState::Stopped;
    }

    /// Runs one frame: advance, clear, draw. The frame that clears the last
    /// sparks still counts as drawn, later empty frames are idle.
    pub fn run_frame<S, C>(
        &mut self,
        scheduler: &mut S,
        handle: FrameHandle,
        timestamp: Instant,
        pool: &mut SparkPool,
        canvas: &mut C,
        pixel_ratio: f32,
    ) -> FrameOutcome
    where
        S: FrameScheduler + ?Sized,
        C: SparkCanvas + ?Sized,
    {
        let Some(delta) = self.begin_frame(handle, timestamp) else {
            return FrameOutcome::Ignored;
        };
        pool.advance(delta);
        canvas.clear();
        let strokes = draw_sparks(pool, canvas, pixel_ratio);
        self.end_frame(scheduler);

        let outcome = if strokes > 0 || self.last_strokes > 0 {
            FrameOutcome::Drawn
        } else {
            FrameOutcome::Idle
        };
        self.last_strokes = strokes;
        outcome
    }
}

/// Screen geometry of one spark for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparkGeometry {
    pub segment: LineSegment,
    pub alpha: f32,
    pub width: f32,
}

/// Computes where and how `spark` is drawn. The origin is scaled into buffer
/// pixels by `pixel_ratio`, travel distance and length are not.
pub fn spark_geometry(spark: &Spark, settings: &SparkSettings, pixel_ratio: f32) -> SparkGeometry {
    let eased = settings.easing.apply(spark.progress());
    let remaining = 1.0 - eased;

    let distance = eased * (settings.radius + spark.speed_jitter * SPEED_JITTER_DISTANCE);
    let size = if settings.size_jitter {
        spark.base_size
    } else {
        settings.size
    };
    let length = (size * remaining).max(MIN_LINE_LENGTH);

    let direction = Vector2::new(spark.angle.cos(), spark.angle.sin());
    let scaled = spark.origin.scaled(pixel_ratio as f64);
    let origin = Point2::new(scaled.x as f32, scaled.y as f32);

    SparkGeometry {
        segment: LineSegment {
            from: origin + direction * distance,
            to: origin + direction * (distance + length),
        },
        alpha: remaining.max(MIN_ALPHA),
        width: (2.0 * pixel_ratio * remaining + 0.5).max(MIN_LINE_WIDTH),
    }
}

/// Strokes every live spark in insertion order. Returns the number of strokes.
pub fn draw_sparks<C: SparkCanvas + ?Sized>(
    pool: &SparkPool,
    canvas: &mut C,
    pixel_ratio: f32,
) -> usize {
    let settings = *pool.settings();
    for spark in pool.iter() {
        let geometry = spark_geometry(spark, &settings, pixel_ratio);
        canvas.stroke_line(
            &geometry.segment,
            &StrokeStyle {
                color: settings.color,
                alpha: geometry.alpha,
                width: geometry.width,
            },
        );
    }
    pool.len()
}
