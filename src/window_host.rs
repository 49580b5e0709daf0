use std::sync::Arc;

use winit::dpi::LogicalSize;
use winit::event_loop::{ActiveEventLoop, EventLoopProxy};
use winit::window::{Window, WindowAttributes};

use crate::config::WindowConfig;
use crate::graphics::canvas::PixmapCanvas;
use crate::graphics::graphics_context::{OverlayError, OverlayResult};
use crate::graphics::redraw_thread::{RedrawThread, FRAME_INTERVAL};
use crate::graphics::render_loop::{FrameHandle, FrameScheduler};
use crate::graphics::viewport::Viewport;
use crate::click_spark::HostEnvironment;
use crate::input::listeners::{ListenerHandle, ListenerKind, ListenerRegistry};
use crate::utils::geometry::{BufferSize, Extent};
use crate::UserEvent;

/// Smallest window the host accepts, in logical pixels.
const MIN_WINDOW_SIZE: f64 = 64.0;

fn get_window_attributes(config: &WindowConfig) -> WindowAttributes {
    let width = if config.width.is_finite() {
        config.width.max(MIN_WINDOW_SIZE)
    } else {
        WindowConfig::default().width
    };
    let height = if config.height.is_finite() {
        config.height.max(MIN_WINDOW_SIZE)
    } else {
        WindowConfig::default().height
    };
    WindowAttributes::default()
        .with_title(config.title.clone())
        .with_inner_size(LogicalSize::new(width, height))
        .with_min_inner_size(LogicalSize::new(MIN_WINDOW_SIZE, MIN_WINDOW_SIZE))
}

/// Current logical size and scale factor of `window`.
pub(crate) fn window_viewport(window: &Window) -> Viewport {
    let scale_factor = window.scale_factor();
    let logical = window.inner_size().to_logical::<f64>(scale_factor);
    Viewport::new(Extent::new(logical.width, logical.height), scale_factor)
}

/// The winit window seen as a [`HostEnvironment`]: frames come from a
/// [`RedrawThread`] that posts [`UserEvent::Frame`] back to the event loop.
#[derive(Debug)]
pub(crate) struct WindowHost {
    window: Arc<Window>,
    redraw_thread: RedrawThread,
    listeners: ListenerRegistry,
}

impl WindowHost {
    pub fn new(
        event_loop: &ActiveEventLoop,
        config: &WindowConfig,
        event_loop_proxy: EventLoopProxy<UserEvent>,
    ) -> OverlayResult<Self> {
        log::info!("WindowHost::new: {config:?}");
        let window = event_loop
            .create_window(get_window_attributes(config))
            .map_err(|e| {
                log::error!("WindowHost::new: failed to create window: {e:?}");
                OverlayError::WindowCreationError
            })?;

        let redraw_thread = RedrawThread::spawn(FRAME_INTERVAL, move |handle| {
            match event_loop_proxy.send_event(UserEvent::Frame(handle)) {
                Ok(()) => true,
                Err(e) => {
                    log::error!("redraw_thread: error sending frame event: {e:?}");
                    false
                }
            }
        });

        Ok(Self {
            window: Arc::new(window),
            redraw_thread,
            listeners: ListenerRegistry::new(),
        })
    }

    pub fn window(&self) -> Arc<Window> {
        self.window.clone()
    }

    pub fn is_listening(&self, kind: ListenerKind) -> bool {
        self.listeners.is_listening(kind)
    }
}

impl FrameScheduler for WindowHost {
    fn request_frame(&mut self) -> FrameHandle {
        self.redraw_thread.request_frame()
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.redraw_thread.cancel_frame(handle)
    }
}

impl HostEnvironment for WindowHost {
    type Canvas = PixmapCanvas;

    fn create_canvas(&mut self) -> Option<PixmapCanvas> {
        // sized by the viewport adapter right after mount
        Some(PixmapCanvas::new(BufferSize::default()))
    }

    fn viewport(&self) -> Viewport {
        window_viewport(&self.window)
    }

    fn add_listener(&mut self, kind: ListenerKind) -> ListenerHandle {
        self.listeners.add(kind)
    }

    fn remove_listener(&mut self, handle: ListenerHandle) {
        self.listeners.remove(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_attributes_clamp_size() {
        let config = WindowConfig {
            width: 10.0,
            height: f64::NAN,
            ..Default::default()
        };
        let attributes = get_window_attributes(&config);
        assert_eq!(attributes.title, "Click Spark");
        assert_eq!(
            attributes.inner_size,
            Some(LogicalSize::new(MIN_WINDOW_SIZE, 768.0).into())
        );
    }
}
