//! Filter Expressions - Declarative Colour Filters
//!
//! A recipe describes its look as a CSS-like filter string such as
//! `sepia(20%) contrast(110%) saturate(120%)`. The string is parsed once
//! into a [`FilterChain`] and applied per pixel in sRGB, clamping to the
//! unit range after every function.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FilterParseError {
    #[error("Unknown filter function: {0}")]
    UnknownFunction(String),

    #[error("Invalid argument for {function}: {argument}")]
    InvalidArgument { function: String, argument: String },

    #[error("Negative amount for {0}")]
    NegativeAmount(String),

    #[error("Malformed filter expression: {0}")]
    Malformed(String),
}

/// A single filter function with its resolved amount.
///
/// Amounts are stored as plain factors (`110%` becomes `1.1`); hue
/// rotation is stored in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterOp {
    Grayscale(f32),
    Sepia(f32),
    Saturate(f32),
    HueRotate(f32),
    Brightness(f32),
    Contrast(f32),
    Invert(f32),
    Opacity(f32),
}

impl FilterOp {
    fn name(&self) -> &'static str {
        match self {
            FilterOp::Grayscale(_) => "grayscale",
            FilterOp::Sepia(_) => "sepia",
            FilterOp::Saturate(_) => "saturate",
            FilterOp::HueRotate(_) => "hue-rotate",
            FilterOp::Brightness(_) => "brightness",
            FilterOp::Contrast(_) => "contrast",
            FilterOp::Invert(_) => "invert",
            FilterOp::Opacity(_) => "opacity",
        }
    }

    fn parse(function: &str, argument: &str) -> Result<Self, FilterParseError> {
        let arg = argument.trim();
        let op = match function {
            "hue-rotate" => FilterOp::HueRotate(parse_angle(function, arg)?),
            "grayscale" => FilterOp::Grayscale(parse_amount(function, arg)?.min(1.0)),
            "sepia" => FilterOp::Sepia(parse_amount(function, arg)?.min(1.0)),
            "invert" => FilterOp::Invert(parse_amount(function, arg)?.min(1.0)),
            "opacity" => FilterOp::Opacity(parse_amount(function, arg)?.min(1.0)),
            "saturate" => FilterOp::Saturate(parse_amount(function, arg)?),
            "brightness" => FilterOp::Brightness(parse_amount(function, arg)?),
            "contrast" => FilterOp::Contrast(parse_amount(function, arg)?),
            other => return Err(FilterParseError::UnknownFunction(other.to_string())),
        };
        Ok(op)
    }

    /// Apply to an RGBA sample in the unit range.
    fn apply(&self, px: &mut [f32; 4]) {
        match *self {
            FilterOp::Grayscale(a) => {
                let s = 1.0 - a;
                apply_matrix(px, &[
                    [0.2126 + 0.7874 * s, 0.7152 - 0.7152 * s, 0.0722 - 0.0722 * s],
                    [0.2126 - 0.2126 * s, 0.7152 + 0.2848 * s, 0.0722 - 0.0722 * s],
                    [0.2126 - 0.2126 * s, 0.7152 - 0.7152 * s, 0.0722 + 0.9278 * s],
                ]);
            }
            FilterOp::Sepia(a) => {
                let s = 1.0 - a;
                apply_matrix(px, &[
                    [0.393 + 0.607 * s, 0.769 - 0.769 * s, 0.189 - 0.189 * s],
                    [0.349 - 0.349 * s, 0.686 + 0.314 * s, 0.168 - 0.168 * s],
                    [0.272 - 0.272 * s, 0.534 - 0.534 * s, 0.131 + 0.869 * s],
                ]);
            }
            FilterOp::Saturate(s) => {
                apply_matrix(px, &[
                    [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
                    [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
                    [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
                ]);
            }
            FilterOp::HueRotate(deg) => {
                let (sin, cos) = deg.to_radians().sin_cos();
                apply_matrix(px, &[
                    [
                        0.213 + cos * 0.787 - sin * 0.213,
                        0.715 - cos * 0.715 - sin * 0.715,
                        0.072 - cos * 0.072 + sin * 0.928,
                    ],
                    [
                        0.213 - cos * 0.213 + sin * 0.143,
                        0.715 + cos * 0.285 + sin * 0.140,
                        0.072 - cos * 0.072 - sin * 0.283,
                    ],
                    [
                        0.213 - cos * 0.213 - sin * 0.787,
                        0.715 - cos * 0.715 + sin * 0.715,
                        0.072 + cos * 0.928 + sin * 0.072,
                    ],
                ]);
            }
            FilterOp::Brightness(a) => {
                for c in px.iter_mut().take(3) {
                    *c = (*c * a).clamp(0.0, 1.0);
                }
            }
            FilterOp::Contrast(a) => {
                let intercept = 0.5 - 0.5 * a;
                for c in px.iter_mut().take(3) {
                    *c = (*c * a + intercept).clamp(0.0, 1.0);
                }
            }
            FilterOp::Invert(a) => {
                for c in px.iter_mut().take(3) {
                    *c = (a + *c * (1.0 - 2.0 * a)).clamp(0.0, 1.0);
                }
            }
            FilterOp::Opacity(a) => {
                px[3] = (px[3] * a).clamp(0.0, 1.0);
            }
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            FilterOp::HueRotate(deg) => write!(f, "hue-rotate({}deg)", deg),
            FilterOp::Grayscale(a)
            | FilterOp::Sepia(a)
            | FilterOp::Saturate(a)
            | FilterOp::Brightness(a)
            | FilterOp::Contrast(a)
            | FilterOp::Invert(a)
            | FilterOp::Opacity(a) => {
                write!(f, "{}({}%)", self.name(), (a * 100.0).round() as i64)
            }
        }
    }
}

fn apply_matrix(px: &mut [f32; 4], m: &[[f32; 3]; 3]) {
    let [r, g, b, _] = *px;
    for (row, out) in m.iter().zip(px.iter_mut()) {
        *out = (row[0] * r + row[1] * g + row[2] * b).clamp(0.0, 1.0);
    }
}

fn parse_amount(function: &str, arg: &str) -> Result<f32, FilterParseError> {
    if arg.is_empty() {
        return Ok(1.0);
    }
    let invalid = || FilterParseError::InvalidArgument {
        function: function.to_string(),
        argument: arg.to_string(),
    };
    let value = match arg.strip_suffix('%') {
        Some(pct) => pct.trim().parse::<f32>().map_err(|_| invalid())? / 100.0,
        None => arg.parse::<f32>().map_err(|_| invalid())?,
    };
    if !value.is_finite() {
        return Err(invalid());
    }
    if value < 0.0 {
        return Err(FilterParseError::NegativeAmount(function.to_string()));
    }
    Ok(value)
}

fn parse_angle(function: &str, arg: &str) -> Result<f32, FilterParseError> {
    if arg.is_empty() {
        return Ok(0.0);
    }
    let invalid = || FilterParseError::InvalidArgument {
        function: function.to_string(),
        argument: arg.to_string(),
    };
    // Order matters: "grad" and "rad" share a suffix.
    let units: [(&str, f32); 4] = [
        ("deg", 1.0),
        ("grad", 0.9),
        ("rad", 180.0 / std::f32::consts::PI),
        ("turn", 360.0),
    ];
    for (suffix, scale) in units {
        if let Some(num) = arg.strip_suffix(suffix) {
            let value = num.trim().parse::<f32>().map_err(|_| invalid())?;
            return if value.is_finite() { Ok(value * scale) } else { Err(invalid()) };
        }
    }
    match arg.parse::<f32>() {
        Ok(v) if v == 0.0 => Ok(0.0),
        _ => Err(invalid()),
    }
}

/// An ordered list of filter functions. The empty chain is `none`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FilterChain {
    ops: Vec<FilterOp>,
}

impl FilterChain {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(ops: Vec<FilterOp>) -> Self {
        Self { ops }
    }

    pub fn ops(&self) -> &[FilterOp] {
        &self.ops
    }

    pub fn is_none(&self) -> bool {
        self.ops.is_empty()
    }

    /// Run one 8-bit RGBA pixel through every function in order.
    pub fn apply_rgba(&self, px: [u8; 4]) -> [u8; 4] {
        if self.ops.is_empty() {
            return px;
        }
        let mut unit = px.map(|c| c as f32 / 255.0);
        for op in &self.ops {
            op.apply(&mut unit);
        }
        unit.map(|c| (c * 255.0).round().clamp(0.0, 255.0) as u8)
    }
}

impl FromStr for FilterChain {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == "none" {
            return Ok(Self::none());
        }

        let mut ops = vec![];
        let mut rest = trimmed;
        while !rest.is_empty() {
            let open = rest
                .find('(')
                .ok_or_else(|| FilterParseError::Malformed(rest.to_string()))?;
            let close = rest[open..]
                .find(')')
                .map(|i| open + i)
                .ok_or_else(|| FilterParseError::Malformed(rest.to_string()))?;
            let function = rest[..open].trim().to_ascii_lowercase();
            if function.is_empty() || function.contains(char::is_whitespace) {
                return Err(FilterParseError::Malformed(rest[..=close].to_string()));
            }
            ops.push(FilterOp::parse(&function, &rest[open + 1..close])?);
            rest = rest[close + 1..].trim_start();
        }
        Ok(Self { ops })
    }
}

impl TryFrom<String> for FilterChain {
    type Error = FilterParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FilterChain> for String {
    fn from(chain: FilterChain) -> Self {
        chain.to_string()
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ops.is_empty() {
            return f.write_str("none");
        }
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", op)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_percent_and_factor_forms_agree() {
        let a: FilterChain = "contrast(105%) saturate(110%)".parse().unwrap();
        let b: FilterChain = "contrast(1.05) saturate(1.1)".parse().unwrap();
        assert_eq!(a.ops().len(), 2);
        for (x, y) in a.ops().iter().zip(b.ops()) {
            match (x, y) {
                (FilterOp::Contrast(p), FilterOp::Contrast(q))
                | (FilterOp::Saturate(p), FilterOp::Saturate(q)) => assert!((p - q).abs() < 1e-6),
                _ => panic!("unexpected ops {x:?} {y:?}"),
            }
        }
    }

    #[test]
    fn test_none_is_identity() {
        let chain: FilterChain = "none".parse().unwrap();
        assert!(chain.is_none());
        assert_eq!(chain.apply_rgba([12, 200, 99, 7]), [12, 200, 99, 7]);
    }

    #[test]
    fn test_hue_rotate_units() {
        let chain: FilterChain = "hue-rotate(-10deg) hue-rotate(0.5turn) hue-rotate(0)".parse().unwrap();
        assert_eq!(chain.ops()[0], FilterOp::HueRotate(-10.0));
        assert_eq!(chain.ops()[1], FilterOp::HueRotate(180.0));
        assert_eq!(chain.ops()[2], FilterOp::HueRotate(0.0));
        assert!("hue-rotate(15)".parse::<FilterChain>().is_err());
    }

    #[test]
    fn test_rejects_unknown_and_negative() {
        assert_eq!(
            "blur(2px)".parse::<FilterChain>(),
            Err(FilterParseError::UnknownFunction("blur".into()))
        );
        assert_eq!(
            "contrast(-5%)".parse::<FilterChain>(),
            Err(FilterParseError::NegativeAmount("contrast".into()))
        );
        assert!(matches!(
            "sepia(20%".parse::<FilterChain>(),
            Err(FilterParseError::Malformed(_))
        ));
    }

    #[test]
    fn test_grayscale_equalizes_channels() {
        let chain: FilterChain = "grayscale(100%)".parse().unwrap();
        let [r, g, b, a] = chain.apply_rgba([255, 0, 0, 255]);
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert_eq!(r, 54);
        assert_eq!(a, 255);
    }

    #[test]
    fn test_brightness_and_contrast_clamp() {
        let chain: FilterChain = "brightness(200%)".parse().unwrap();
        assert_eq!(chain.apply_rgba([200, 100, 0, 255]), [255, 200, 0, 255]);

        let chain: FilterChain = "contrast(0%)".parse().unwrap();
        assert_eq!(chain.apply_rgba([0, 255, 30, 255]), [128, 128, 128, 255]);
    }

    #[test]
    fn test_opacity_only_touches_alpha() {
        let chain: FilterChain = "opacity(50%)".parse().unwrap();
        assert_eq!(chain.apply_rgba([10, 20, 30, 255]), [10, 20, 30, 128]);
    }

    #[test]
    fn test_display_round_trips_through_parser() {
        let chain: FilterChain = "sepia(30%) saturate(80%) hue-rotate(-10deg)".parse().unwrap();
        let text = chain.to_string();
        assert_eq!(text, "sepia(30%) saturate(80%) hue-rotate(-10deg)");
        assert_eq!(text.parse::<FilterChain>().unwrap(), chain);
    }

    #[test]
    fn test_serde_as_string() {
        let chain: FilterChain = serde_json::from_str(r#""grayscale(100%) contrast(130%)""#).unwrap();
        assert_eq!(chain.ops().len(), 2);
        assert!(serde_json::from_str::<FilterChain>(r#""wobble(1)""#).is_err());
    }
}
