use crate::graphics::canvas::SparkCanvas;
use crate::utils::geometry::{BufferSize, Extent};

/// Visible area of the host in logical pixels plus its pixel density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub logical_size: Extent,
    pub scale_factor: f64,
}

impl Viewport {
    pub fn new(logical_size: Extent, scale_factor: f64) -> Self {
        Self {
            logical_size,
            scale_factor,
        }
    }

    /// Device pixel ratio, falling back to 1 for unusable values.
    pub fn pixel_ratio(&self) -> f64 {
        if self.scale_factor.is_finite() && self.scale_factor > 0.0 {
            self.scale_factor
        } else {
            1.0
        }
    }

    /// Backing buffer dimensions, `round(logical * ratio)`.
    pub fn buffer_size(&self) -> BufferSize {
        let ratio = self.pixel_ratio();
        let scale = |value: f64| {
            if value.is_finite() && value > 0.0 {
                (value * ratio).round() as u32
            } else {
                0
            }
        };
        BufferSize::new(
            scale(self.logical_size.width),
            scale(self.logical_size.height),
        )
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(Extent::default(), 1.0)
    }
}

/// Keeps a canvas' backing buffer in sync with the viewport.
#[derive(Debug, Default)]
pub struct ViewportAdapter {
    viewport: Viewport,
    reallocations: u64,
}

impl ViewportAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.viewport.pixel_ratio()
    }

    /// How many times the backing buffer was reallocated.
    pub fn reallocations(&self) -> u64 {
        self.reallocations
    }

    /// Records `viewport` and resizes the canvas buffer only when its pixel
    /// dimensions changed. Returns whether a reallocation happened.
    pub fn apply<C: SparkCanvas + ?Sized>(&mut self, viewport: Viewport, canvas: &mut C) -> bool {
        self.viewport = viewport;
        let size = viewport.buffer_size();
        if canvas.buffer_size() == size {
            return false;
        }
        log::info!(
            "ViewportAdapter::apply: logical {:?} ratio {} -> buffer {size:?}",
            viewport.logical_size,
            viewport.pixel_ratio()
        );
        canvas.resize_buffer(size);
        self.reallocations += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::canvas::{LineSegment, StrokeStyle};

    #[derive(Default)]
    struct SizeOnlyCanvas {
        size: BufferSize,
        resizes: usize,
    }

    impl SparkCanvas for SizeOnlyCanvas {
        fn buffer_size(&self) -> BufferSize {
            self.size
        }
        fn resize_buffer(&mut self, size: BufferSize) {
            self.size = size;
            self.resizes += 1;
        }
        fn clear(&mut self) {}
        fn stroke_line(&mut self, _segment: &LineSegment, _style: &StrokeStyle) {}
    }

    #[test]
    fn buffer_size_rounds_scaled_logical_size() {
        let viewport = Viewport::new(Extent::new(800.0, 601.0), 1.5);
        assert_eq!(viewport.buffer_size(), BufferSize::new(1200, 902));

        let viewport = Viewport::new(Extent::new(333.3, 100.0), 2.0);
        assert_eq!(viewport.buffer_size(), BufferSize::new(667, 200));
    }

    #[test]
    fn invalid_ratio_falls_back_to_one() {
        for ratio in [0.0, -2.0, f64::NAN, f64::INFINITY] {
            let viewport = Viewport::new(Extent::new(100.0, 50.0), ratio);
            assert_eq!(viewport.pixel_ratio(), 1.0);
            assert_eq!(viewport.buffer_size(), BufferSize::new(100, 50));
        }
    }

    #[test]
    fn resize_is_idempotent() {
        let mut adapter = ViewportAdapter::new();
        let mut canvas = SizeOnlyCanvas::default();
        let viewport = Viewport::new(Extent::new(1024.0, 768.0), 2.0);

        assert!(adapter.apply(viewport, &mut canvas));
        assert_eq!(canvas.size, BufferSize::new(2048, 1536));
        assert!(!adapter.apply(viewport, &mut canvas));
        assert_eq!(canvas.resizes, 1);
        assert_eq!(adapter.reallocations(), 1);
    }

    #[test]
    fn ratio_change_alone_reallocates() {
        let mut adapter = ViewportAdapter::new();
        let mut canvas = SizeOnlyCanvas::default();
        adapter.apply(Viewport::new(Extent::new(100.0, 100.0), 1.0), &mut canvas);
        assert!(adapter.apply(Viewport::new(Extent::new(100.0, 100.0), 2.0), &mut canvas));
        assert_eq!(canvas.size, BufferSize::new(200, 200));
        assert_eq!(adapter.pixel_ratio(), 2.0);
    }
}
