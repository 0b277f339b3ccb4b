//! Raster drawing surface used by the compositor.
//!
//! Mirrors the small slice of 2D-canvas state the capture path needs: a
//! horizontal-flip transform, a filter applied while drawing, and flat
//! fills with a blend mode.

use image::{Rgba, RgbaImage};

use crate::blend::{self, BlendMode};
use crate::filters::FilterChain;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Transform {
    #[default]
    Identity,
    /// Equivalent to `translate(width, 0) scale(-1, 1)`.
    FlipHorizontal,
}

pub struct Canvas {
    pixels: RgbaImage,
    transform: Transform,
    filter: FilterChain,
}

impl Canvas {
    /// Transparent canvas of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
            transform: Transform::Identity,
            filter: FilterChain::none(),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    pub fn reset_transform(&mut self) {
        self.transform = Transform::Identity;
    }

    pub fn set_filter(&mut self, filter: FilterChain) {
        self.filter = filter;
    }

    pub fn reset_filter(&mut self) {
        self.filter = FilterChain::none();
    }

    /// Draw `source` scaled to fill the canvas. The current filter is
    /// applied to each source sample as it is composited, and the current
    /// transform decides where it lands.
    pub fn draw_image(&mut self, source: &RgbaImage) {
        let (w, h) = self.pixels.dimensions();
        let (sw, sh) = source.dimensions();
        if w == 0 || h == 0 || sw == 0 || sh == 0 {
            return;
        }
        let same_size = sw == w && sh == h;

        for y in 0..h {
            for x in 0..w {
                let dx = match self.transform {
                    Transform::Identity => x,
                    Transform::FlipHorizontal => w - 1 - x,
                };
                let src = if same_size {
                    source.get_pixel(x, y)
                } else {
                    // Nearest-neighbour when the source does not match.
                    let sx = (u64::from(x) * u64::from(sw) / u64::from(w)) as u32;
                    let sy = (u64::from(y) * u64::from(sh) / u64::from(h)) as u32;
                    source.get_pixel(sx, sy)
                };
                let filtered = self.filter.apply_rgba(src.0);
                let dst = self.pixels.get_pixel_mut(dx, y);
                dst.0 = blend::over(dst.0, filtered);
            }
        }
    }

    /// Fill the whole canvas with a flat colour. Transform and filter do not apply.
    pub fn fill(&mut self, color: [u8; 3], opacity: f32, mode: BlendMode) {
        let src = [color[0], color[1], color[2], 255];
        for px in self.pixels.pixels_mut() {
            px.0 = blend::blend(px.0, src, mode, opacity);
        }
    }

    /// Raw pixel access, always in canvas coordinates.
    pub fn pixels_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.pixels.get_pixel(x, y)
    }

    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient() -> RgbaImage {
        RgbaImage::from_fn(4, 2, |x, y| Rgba([x as u8 * 60, y as u8 * 100, 7, 255]))
    }

    #[test]
    fn test_identity_draw_copies() {
        let mut canvas = Canvas::new(4, 2);
        canvas.draw_image(&gradient());
        assert_eq!(canvas.pixels(), &gradient());
    }

    #[test]
    fn test_flip_mirrors_columns() {
        let src = gradient();
        let mut canvas = Canvas::new(4, 2);
        canvas.set_transform(Transform::FlipHorizontal);
        canvas.draw_image(&src);
        for y in 0..2 {
            for x in 0..4 {
                assert_eq!(canvas.pixel(x, y), *src.get_pixel(3 - x, y));
            }
        }
    }

    #[test]
    fn test_filter_applies_while_drawing() {
        let mut canvas = Canvas::new(4, 2);
        canvas.set_filter("grayscale(100%)".parse().unwrap());
        canvas.draw_image(&gradient());
        for px in canvas.pixels().pixels() {
            assert_eq!(px[0], px[1]);
            assert_eq!(px[1], px[2]);
        }
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut canvas = Canvas::new(1, 1);
        canvas.set_transform(Transform::FlipHorizontal);
        canvas.set_filter("sepia(1)".parse().unwrap());
        canvas.reset_transform();
        canvas.reset_filter();
        assert_eq!(canvas.transform(), Transform::Identity);
        canvas.draw_image(&RgbaImage::from_pixel(1, 1, Rgba([0, 0, 255, 255])));
        assert_eq!(canvas.pixel(0, 0), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_scales_mismatched_source() {
        let mut canvas = Canvas::new(4, 4);
        canvas.draw_image(&RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 255])));
        assert!(canvas.pixels().pixels().all(|p| p.0 == [9, 9, 9, 255]));
    }
}
