//! Frame Compositor - One Capture, Fixed Order
//!
//! CRITICAL: the steps run in this order and no other:
//! 1. allocate a canvas at the frame's native size
//! 2. set the mirror transform for self-facing sources
//! 3. draw the frame through the capture filter
//! 4. reset transform and filter
//! 5. grain
//! 6. tint overlay
//! 7. JPEG encode
//!
//! Swapping grain and tint changes the look.

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use rand::rngs::StdRng;
use rand::Rng;
use thiserror::Error;

use crate::blend::flatten_on_black;
use crate::canvas::{Canvas, Transform};
use crate::grain::GrainSynthesizer;
use crate::recipes::Recipe;
use crate::source::{Frame, SourceFault};

/// Lossy encode quality, 0.95 on the 0-1 scale.
pub const JPEG_QUALITY: u8 = 95;

pub const JPEG_MIME: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Video source unavailable: {0}")]
    SourceUnavailable(SourceFault),

    #[error("Capture unavailable: {0}")]
    CaptureUnavailable(String),

    #[error("Encoding error: {0}")]
    Encode(#[from] image::ImageError),
}

/// Final encoded still.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    pub fn mime_type(&self) -> &'static str {
        JPEG_MIME
    }
}

pub struct FrameCompositor<R = StdRng> {
    grain: GrainSynthesizer<R>,
}

impl FrameCompositor<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(GrainSynthesizer::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(GrainSynthesizer::seeded(seed))
    }
}

impl<R: Rng> FrameCompositor<R> {
    pub fn new(grain: GrainSynthesizer<R>) -> Self {
        Self { grain }
    }

    /// Steps 1-6; the styled pixels before encoding.
    #[tracing::instrument(
        level = "debug",
        skip(self, frame, recipe),
        fields(recipe = %recipe.id, width = frame.width(), height = frame.height())
    )]
    pub fn render(
        &mut self,
        frame: &Frame,
        recipe: &Recipe,
        mirrored: bool,
    ) -> Result<RgbaImage, CaptureError> {
        if frame.is_empty() {
            return Err(CaptureError::CaptureUnavailable(format!(
                "frame has zero size ({}x{})",
                frame.width(),
                frame.height()
            )));
        }

        let mut canvas = Canvas::new(frame.width(), frame.height());

        if mirrored {
            canvas.set_transform(Transform::FlipHorizontal);
        }

        canvas.set_filter(recipe.capture_filter.clone());
        canvas.draw_image(frame.pixels());
        tracing::debug!(filter = %recipe.capture_filter, "drew frame");

        canvas.reset_transform();
        canvas.reset_filter();

        self.grain.apply(canvas.pixels_mut(), recipe.grain_intensity);
        tracing::debug!(intensity = recipe.grain_intensity, "applied grain");

        if let Some(tint) = &recipe.tint {
            canvas.fill(tint.color, tint.opacity, tint.blend);
            tracing::debug!(blend = ?tint.blend, opacity = tint.opacity, "applied tint");
        }

        Ok(canvas.into_image())
    }

    /// All seven steps.
    pub fn composite(
        &mut self,
        frame: &Frame,
        recipe: &Recipe,
        mirrored: bool,
    ) -> Result<EncodedImage, CaptureError> {
        let pixels = self.render(frame, recipe, mirrored)?;
        encode_jpeg(&pixels, JPEG_QUALITY)
    }

    /// Viewfinder image: preview filter and mirroring only. Never stored.
    pub fn preview(&self, frame: &Frame, recipe: &Recipe, mirrored: bool) -> RgbaImage {
        let mut canvas = Canvas::new(frame.width(), frame.height());
        if mirrored {
            canvas.set_transform(Transform::FlipHorizontal);
        }
        canvas.set_filter(recipe.preview_filter.clone());
        canvas.draw_image(frame.pixels());
        canvas.into_image()
    }
}

impl Default for FrameCompositor<StdRng> {
    fn default() -> Self {
        Self::from_entropy()
    }
}

/// Flatten onto black and encode as baseline JPEG.
pub fn encode_jpeg(pixels: &RgbaImage, quality: u8) -> Result<EncodedImage, CaptureError> {
    let (width, height) = pixels.dimensions();
    let rgb: Vec<u8> = pixels
        .pixels()
        .flat_map(|px| flatten_on_black(px.0))
        .collect();

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality).write_image(
        &rgb,
        width,
        height,
        ExtendedColorType::Rgb8,
    )?;

    Ok(EncodedImage { bytes, width, height })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipes::{RecipeCatalog, TintOverlay};
    use image::Rgba;

    fn frame(w: u32, h: u32) -> Frame {
        Frame::new(RgbaImage::from_fn(w, h, |x, y| {
            Rgba([(x * 40) as u8, (y * 50) as u8, 90, 255])
        }))
    }

    fn plain(grain: f32, tint: Option<TintOverlay>) -> Recipe {
        Recipe {
            id: "plain".into(),
            name: "Plain".into(),
            description: String::new(),
            preview_filter: Default::default(),
            capture_filter: Default::default(),
            grain_intensity: grain,
            tint,
        }
    }

    #[test]
    fn test_zero_size_frame_is_capture_unavailable() {
        let mut compositor = FrameCompositor::seeded(1);
        let empty = Frame::new(RgbaImage::new(0, 0));
        let err = compositor.composite(&empty, &plain(0.0, None), false).unwrap_err();
        assert!(matches!(err, CaptureError::CaptureUnavailable(_)));
    }

    #[test]
    fn test_output_keeps_native_dimensions() {
        let mut compositor = FrameCompositor::seeded(1);
        let recipe = RecipeCatalog::builtin().lookup(Some("cine")).clone();
        let encoded = compositor.composite(&frame(6, 4), &recipe, false).unwrap();
        assert_eq!((encoded.width, encoded.height), (6, 4));
        assert_eq!(&encoded.bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&encoded.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (6, 4));
    }

    #[test]
    fn test_tint_applies_after_grain() {
        // A fully opaque normal tint hides any grain underneath it.
        let tint = TintOverlay::new([10, 20, 30], 1.0);
        let mut compositor = FrameCompositor::seeded(5);
        let out = compositor.render(&frame(5, 5), &plain(1.0, Some(tint)), false).unwrap();
        assert!(out.pixels().all(|p| p.0 == [10, 20, 30, 255]));
    }

    #[test]
    fn test_preview_uses_preview_filter_without_grain() {
        let mut recipe = plain(1.0, None);
        recipe.preview_filter = "grayscale(100%)".parse().unwrap();
        let compositor = FrameCompositor::seeded(5);
        let src = frame(4, 3);
        let out = compositor.preview(&src, &recipe, true);
        for (x, y, px) in out.enumerate_pixels() {
            let expected = recipe.preview_filter.apply_rgba(src.pixels().get_pixel(3 - x, y).0);
            assert_eq!(px.0, expected);
        }
    }
}
