//! Drawing surface for the sparks.
//!
//! [`SparkCanvas`] is the small slice of a 2D context the render loop needs.
//! [`PixmapCanvas`] implements it on a `tiny_skia` pixmap with additive
//! blending, so overlapping sparks add up instead of covering each other.

use cgmath::Point2;
use resvg::tiny_skia;

use crate::config::SparkColor;
use crate::utils::geometry::BufferSize;

/// Segment in backing buffer pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub from: Point2<f32>,
    pub to: Point2<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: SparkColor,
    /// Multiplied into the color's own alpha.
    pub alpha: f32,
    pub width: f32,
}

pub trait SparkCanvas {
    fn buffer_size(&self) -> BufferSize;

    /// Reallocates the backing buffer. The content is lost.
    fn resize_buffer(&mut self, size: BufferSize);

    fn clear(&mut self);

    /// Strokes `segment` with additive blending.
    fn stroke_line(&mut self, segment: &LineSegment, style: &StrokeStyle);
}

/// CPU raster canvas backed by a premultiplied RGBA pixmap.
#[derive(Debug)]
pub struct PixmapCanvas {
    size: BufferSize,
    // None while the buffer has zero area
    pixmap: Option<tiny_skia::Pixmap>,
}

impl PixmapCanvas {
    pub fn new(size: BufferSize) -> Self {
        Self {
            size,
            pixmap: tiny_skia::Pixmap::new(size.width, size.height),
        }
    }

    pub fn pixmap(&self) -> Option<&tiny_skia::Pixmap> {
        self.pixmap.as_ref()
    }
}

impl SparkCanvas for PixmapCanvas {
    fn buffer_size(&self) -> BufferSize {
        self.size
    }

    fn resize_buffer(&mut self, size: BufferSize) {
        log::debug!("PixmapCanvas::resize_buffer: {size:?}");
        self.size = size;
        self.pixmap = tiny_skia::Pixmap::new(size.width, size.height);
    }

    fn clear(&mut self) {
        if let Some(pixmap) = self.pixmap.as_mut() {
            pixmap.fill(tiny_skia::Color::TRANSPARENT);
        }
    }

    fn stroke_line(&mut self, segment: &LineSegment, style: &StrokeStyle) {
        let Some(pixmap) = self.pixmap.as_mut() else {
            return;
        };

        let mut builder = tiny_skia::PathBuilder::new();
        builder.move_to(segment.from.x, segment.from.y);
        builder.line_to(segment.to.x, segment.to.y);
        let Some(path) = builder.finish() else {
            return;
        };

        let alpha = (style.color.a as f32 / 255.0) * style.alpha.clamp(0.0, 1.0);
        let mut paint = tiny_skia::Paint::default();
        paint.set_color_rgba8(
            style.color.r,
            style.color.g,
            style.color.b,
            (alpha * 255.0).round() as u8,
        );
        paint.blend_mode = tiny_skia::BlendMode::Plus;
        paint.anti_alias = true;

        let stroke = tiny_skia::Stroke {
            width: style.width,
            ..Default::default()
        };

        pixmap.stroke_path(
            &path,
            &paint,
            &stroke,
            tiny_skia::Transform::identity(),
            None,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: SparkColor = SparkColor {
        r: 255,
        g: 0,
        b: 0,
        a: 255,
    };

    fn horizontal_line() -> LineSegment {
        LineSegment {
            from: Point2::new(2.0, 10.0),
            to: Point2::new(30.0, 10.0),
        }
    }

    fn style(alpha: f32) -> StrokeStyle {
        StrokeStyle {
            color: RED,
            alpha,
            width: 4.0,
        }
    }

    fn red_at(canvas: &PixmapCanvas, x: u32, y: u32) -> u8 {
        canvas.pixmap().unwrap().pixel(x, y).unwrap().red()
    }

    #[test]
    fn overlapping_strokes_add_up() {
        let mut canvas = PixmapCanvas::new(BufferSize::new(40, 20));
        canvas.stroke_line(&horizontal_line(), &style(0.4));
        let single = red_at(&canvas, 16, 10);
        assert!(single > 80 && single < 130, "single stroke {single}");

        canvas.stroke_line(&horizontal_line(), &style(0.4));
        let double = red_at(&canvas, 16, 10);
        assert!(double > single + 80, "double stroke {double}");
    }

    #[test]
    fn clear_resets_to_transparent() {
        let mut canvas = PixmapCanvas::new(BufferSize::new(40, 20));
        canvas.stroke_line(&horizontal_line(), &style(1.0));
        assert!(red_at(&canvas, 16, 10) > 0);
        canvas.clear();
        let pixmap = canvas.pixmap().unwrap();
        assert!(pixmap.data().iter().all(|byte| *byte == 0));
    }

    #[test]
    fn empty_buffer_ignores_drawing() {
        let mut canvas = PixmapCanvas::new(BufferSize::new(0, 0));
        assert!(canvas.pixmap().is_none());
        canvas.clear();
        canvas.stroke_line(&horizontal_line(), &style(1.0));

        canvas.resize_buffer(BufferSize::new(40, 20));
        assert_eq!(canvas.buffer_size(), BufferSize::new(40, 20));
        assert_eq!(canvas.pixmap().unwrap().width(), 40);
    }
}
