//! Grain Synthesizer - Luminance Noise Injection
//!
//! Every pixel receives one uniform noise sample shared by its red, green
//! and blue channels, so grain never shifts hue. Alpha is left untouched.

use image::RgbaImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Largest allowed intensity; recipes are validated to stay within [0, 1].
pub const MAX_INTENSITY: f32 = 1.0;

/// Maximum absolute per-pixel delta for an intensity.
pub fn delta_bound(intensity: f32) -> f32 {
    0.5 * intensity.clamp(0.0, MAX_INTENSITY) * 255.0
}

pub struct GrainSynthesizer<R = StdRng> {
    rng: R,
}

impl GrainSynthesizer<StdRng> {
    /// Reproducible grain for tests and `--seed` runs.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> GrainSynthesizer<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Perturb `pixels` in place.
    ///
    /// Deltas are drawn from `[-0.5, 0.5) * intensity * 255` and truncated
    /// toward zero once per pixel, so no delta exceeds [`delta_bound`]. `intensity <= 0` returns without touching the buffer or
    /// drawing from the random source.
    pub fn apply(&mut self, pixels: &mut RgbaImage, intensity: f32) {
        if intensity.is_nan() || intensity <= 0.0 {
            return;
        }
        let strength = intensity.min(MAX_INTENSITY) * 255.0;

        for px in pixels.pixels_mut() {
            let noise: f32 = self.rng.gen_range(-0.5f32..0.5f32) * strength;
            let delta = noise.trunc() as i16;
            if delta == 0 {
                continue;
            }
            for c in px.0.iter_mut().take(3) {
                *c = (i16::from(*c) + delta).clamp(0, 255) as u8;
            }
        }
    }
}

impl Default for GrainSynthesizer<StdRng> {
    fn default() -> Self {
        Self::from_entropy()
    }
}
