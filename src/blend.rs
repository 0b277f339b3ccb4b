//! Per-pixel compositing on straight (non-premultiplied) RGBA8.

use serde::{Deserialize, Serialize};

pub type Rgba8 = [u8; 4];

/// Separable blend modes available to tint overlays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    /// Plain source-over.
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    SoftLight,
}

impl BlendMode {
    /// B(cb, cs) on unit-range channels.
    fn mix(self, cb: f32, cs: f32) -> f32 {
        match self {
            BlendMode::Normal => cs,
            BlendMode::Multiply => cb * cs,
            BlendMode::Screen => cb + cs - cb * cs,
            BlendMode::Overlay => hard_light(cs, cb),
            BlendMode::SoftLight => {
                if cs <= 0.5 {
                    cb - (1.0 - 2.0 * cs) * cb * (1.0 - cb)
                } else {
                    let d = if cb <= 0.25 {
                        ((16.0 * cb - 12.0) * cb + 4.0) * cb
                    } else {
                        cb.sqrt()
                    };
                    cb + (2.0 * cs - 1.0) * (d - cb)
                }
            }
        }
    }
}

fn hard_light(cs: f32, cb: f32) -> f32 {
    if cb <= 0.5 {
        2.0 * cs * cb
    } else {
        let s = 2.0 * cb - 1.0;
        cs + s - cs * s
    }
}

/// Composite `src` over `dst` with the given blend mode and extra opacity.
pub fn blend(dst: Rgba8, src: Rgba8, mode: BlendMode, opacity: f32) -> Rgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    let a_s = src[3] as f32 / 255.0 * opacity;
    if a_s <= 0.0 {
        return dst;
    }
    let a_b = dst[3] as f32 / 255.0;
    let a_o = a_s + a_b * (1.0 - a_s);
    if a_o <= 0.0 {
        return [0, 0, 0, 0];
    }

    let mut out = [0u8; 4];
    for i in 0..3 {
        let cs = src[i] as f32 / 255.0;
        let cb = dst[i] as f32 / 255.0;
        let mixed = (1.0 - a_b) * cs + a_b * mode.mix(cb, cs);
        let co = (a_s * mixed + (1.0 - a_s) * a_b * cb) / a_o;
        out[i] = to_u8(co);
    }
    out[3] = to_u8(a_o);
    out
}

/// Source-over at full opacity.
pub fn over(dst: Rgba8, src: Rgba8) -> Rgba8 {
    blend(dst, src, BlendMode::Normal, 1.0)
}

/// Flatten onto an opaque black backdrop; used before lossy encoding.
pub fn flatten_on_black(px: Rgba8) -> [u8; 3] {
    let a = u16::from(px[3]);
    let scale = |c: u8| ((u16::from(c) * a + 127) / 255) as u8;
    [scale(px[0]), scale(px[1]), scale(px[2])]
}

fn to_u8(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn over_transparent_dst_returns_src() {
        assert_eq!(over([0, 0, 0, 0], [54, 54, 54, 255]), [54, 54, 54, 255]);
        assert_eq!(over([0, 0, 0, 0], [10, 200, 30, 128]), [10, 200, 30, 128]);
    }

    #[test]
    fn opacity_0_is_noop() {
        let dst = [1, 2, 3, 255];
        assert_eq!(blend(dst, [255, 255, 255, 255], BlendMode::Screen, 0.0), dst);
    }

    #[test]
    fn normal_tint_mixes_linearly_on_opaque_dst() {
        // rgba(255, 200, 100, 0.05) over mid gray
        let out = blend([100, 100, 100, 255], [255, 200, 100, 255], BlendMode::Normal, 0.05);
        assert_eq!(out, [108, 105, 100, 255]);
    }

    #[test]
    fn multiply_and_screen_bracket_the_backdrop() {
        let dst = [128, 128, 128, 255];
        let src = [200, 200, 200, 255];
        let m = blend(dst, src, BlendMode::Multiply, 1.0);
        let s = blend(dst, src, BlendMode::Screen, 1.0);
        assert!(m[0] < 128);
        assert!(s[0] > 128);
    }

    #[test]
    fn overlay_keeps_black_and_white_backdrops() {
        let src = [90, 90, 90, 255];
        assert_eq!(blend([0, 0, 0, 255], src, BlendMode::Overlay, 1.0)[0], 0);
        assert_eq!(blend([255, 255, 255, 255], src, BlendMode::Overlay, 1.0)[0], 255);
    }

    #[test]
    fn flatten_scales_by_alpha() {
        assert_eq!(flatten_on_black([200, 100, 50, 255]), [200, 100, 50]);
        assert_eq!(flatten_on_black([200, 100, 50, 0]), [0, 0, 0]);
    }
}
