//! Color representations and color space conversion.
//!
//! [`Color`] is the 8-bit sRGB triple the rest of the pipeline works
//! with. [`Xyz`] and [`Lab`] are derived, floating-point representations
//! used by the perceptual distance metrics in [`crate::distance`].
//!
//! All conversions assume the D65 illuminant with the 2° standard
//! observer, and XYZ is scaled so that white has `Y = 100`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An 8-bit sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color {
    /// Create a new color from its channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// The channels as an array in `[r, g, b]` order.
    #[must_use]
    pub const fn channels(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<image::Rgb<u8>> for Color {
    fn from(pixel: image::Rgb<u8>) -> Self {
        let [r, g, b] = pixel.0;
        Self { r, g, b }
    }
}

impl From<Color> for image::Rgb<u8> {
    fn from(color: Color) -> Self {
        Self(color.channels())
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.r, self.g, self.b)
    }
}

/// Error returned when parsing a [`Color`] from `R:G:B` text fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color {input:?}: expected R:G:B with each channel in 0..=255")]
pub struct ParseColorError {
    input: String,
}

impl FromStr for Color {
    type Err = ParseColorError;

    /// Parse a color written as `R:G:B`, e.g. `255:128:0`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseColorError {
            input: s.to_string(),
        };

        let mut parts = s.split(':').map(|part| part.trim().parse::<u8>());
        let (Some(Ok(r)), Some(Ok(g)), Some(Ok(b)), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(err());
        };

        Ok(Self { r, g, b })
    }
}

/// A color in CIE 1931 XYZ space, normalized to `Y = 100` for white.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Xyz {
    /// X tristimulus value.
    pub x: f64,
    /// Y tristimulus value (luminance).
    pub y: f64,
    /// Z tristimulus value.
    pub z: f64,
}

/// A color in CIE L\*a\*b\* space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lab {
    /// Lightness.
    pub l: f64,
    /// Green-red axis.
    pub a: f64,
    /// Blue-yellow axis.
    pub b: f64,
}

impl From<Color> for Lab {
    fn from(color: Color) -> Self {
        xyz_to_lab(rgb_to_xyz(color))
    }
}

/// D65 reference white, `Y = 100` normalization.
const WHITE_X: f64 = 95.047;
const WHITE_Y: f64 = 100.0;
const WHITE_Z: f64 = 108.883;

/// Convert an sRGB channel (0..=255) to linear light (0.0..=1.0).
#[must_use]
pub fn srgb_to_linear(component: u8) -> f64 {
    let c = f64::from(component) / 255.0;
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Convert an sRGB color to CIE XYZ (D65, 2° observer).
#[must_use]
pub fn rgb_to_xyz(color: Color) -> Xyz {
    let r = srgb_to_linear(color.r);
    let g = srgb_to_linear(color.g);
    let b = srgb_to_linear(color.b);

    Xyz {
        x: 0.1805f64.mul_add(b, 0.4124f64.mul_add(r, 0.3576 * g)) * 100.0,
        y: 0.0722f64.mul_add(b, 0.2126f64.mul_add(r, 0.7152 * g)) * 100.0,
        z: 0.9505f64.mul_add(b, 0.0193f64.mul_add(r, 0.1192 * g)) * 100.0,
    }
}

/// Convert CIE XYZ to CIE L\*a\*b\* relative to the D65 white point.
#[must_use]
pub fn xyz_to_lab(color: Xyz) -> Lab {
    let fx = lab_f(color.x / WHITE_X);
    let fy = lab_f(color.y / WHITE_Y);
    let fz = lab_f(color.z / WHITE_Z);

    Lab {
        l: 116.0f64.mul_add(fy, -16.0),
        a: 500.0 * (fx - fy),
        b: 200.0 * (fy - fz),
    }
}

/// The L\*a\*b\* companding function.
fn lab_f(t: f64) -> f64 {
    if t > 0.008_856 {
        t.cbrt()
    } else {
        7.787f64.mul_add(t, 16.0 / 116.0)
    }
}
