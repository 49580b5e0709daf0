//! Pointer-down translation from window events.

use winit::dpi::PhysicalPosition;
use winit::event::{ElementState, MouseButton, Touch, TouchPhase};

use crate::utils::geometry::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// Left mouse button, pen contact or touch.
    Primary,
    Secondary,
    Auxiliary,
    Other(u16),
}

impl From<MouseButton> for PointerButton {
    fn from(button: MouseButton) -> Self {
        match button {
            MouseButton::Left => PointerButton::Primary,
            MouseButton::Right => PointerButton::Secondary,
            MouseButton::Middle => PointerButton::Auxiliary,
            MouseButton::Back => PointerButton::Other(3),
            MouseButton::Forward => PointerButton::Other(4),
            MouseButton::Other(id) => PointerButton::Other(id),
        }
    }
}

/// A pointer-down in logical coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub position: Position,
    pub button: PointerButton,
}

impl PointerEvent {
    pub fn primary(x: f64, y: f64) -> Self {
        Self {
            position: Position::new(x, y),
            button: PointerButton::Primary,
        }
    }

    pub fn is_primary(&self) -> bool {
        self.button == PointerButton::Primary
    }
}

/// Tracks the cursor so that button presses, which carry no position, can be
/// turned into [`PointerEvent`]s.
///
/// Window events report physical pixels; positions are divided by the scale
/// factor to land in the same logical space as the drawing surface.
#[derive(Debug)]
pub struct PointerTracker {
    last_cursor_position: Option<PhysicalPosition<f64>>,
    scale_factor: f64,
}

impl PointerTracker {
    pub fn new(scale_factor: f64) -> Self {
        Self {
            last_cursor_position: None,
            scale_factor,
        }
    }

    pub fn set_scale_factor(&mut self, scale_factor: f64) {
        self.scale_factor = scale_factor;
    }

    fn to_logical(&self, position: PhysicalPosition<f64>) -> Position {
        let scale = if self.scale_factor.is_finite() && self.scale_factor > 0.0 {
            self.scale_factor
        } else {
            1.0
        };
        Position::new(position.x / scale, position.y / scale)
    }

    pub fn cursor_moved(&mut self, position: PhysicalPosition<f64>) {
        self.last_cursor_position = Some(position);
    }

    pub fn cursor_left(&mut self) {
        self.last_cursor_position = None;
    }

    /// Returns a pointer-down for a press. Releases and presses before the
    /// cursor position is known produce nothing.
    pub fn mouse_input(&self, state: ElementState, button: MouseButton) -> Option<PointerEvent> {
        if state != ElementState::Pressed {
            return None;
        }
        let position = self.last_cursor_position?;
        Some(PointerEvent {
            position: self.to_logical(position),
            button: button.into(),
        })
    }

    /// A touch starting counts as a primary pointer-down.
    pub fn touch(&mut self, touch: &Touch) -> Option<PointerEvent> {
        if touch.phase != TouchPhase::Started {
            return None;
        }
        self.last_cursor_position = Some(touch.location);
        Some(PointerEvent {
            position: self.to_logical(touch.location),
            button: PointerButton::Primary,
        })
    }
}
