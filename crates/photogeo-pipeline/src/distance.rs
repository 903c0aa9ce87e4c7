//! Color distance metrics used by the quantizer.
//!
//! Every metric returns the **squared** form of its distance: the
//! quantizer only ranks palette entries, and squaring is monotonic for
//! non-negative distances, so the square root is never needed. Smaller
//! is more similar and every metric returns exactly `0.0` for identical
//! inputs.
//!
//! Each metric is also exposed through the [`Metric`] trait, which pairs
//! it with its working color space. The quantizer converts each pixel
//! into that space once and then compares it against a palette converted
//! up front.

use crate::color::{Color, Lab, srgb_to_linear};

/// A color distance metric paired with the color space it operates in.
pub trait Metric {
    /// The representation colors are converted to before comparison.
    type Working: Copy;

    /// Convert a color into the metric's working space.
    fn convert(&self, color: Color) -> Self::Working;

    /// Squared distance between two converted colors.
    fn distance(&self, a: &Self::Working, b: &Self::Working) -> f64;
}

/// Squared Euclidean distance on raw 0..=255 sRGB channels.
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanSrgb;

/// Squared Euclidean distance in linear RGB.
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanLinear;

/// Squared CIE76 ΔE (Euclidean distance in L\*a\*b\*).
#[derive(Debug, Clone, Copy, Default)]
pub struct Cie76;

/// Squared CIE94 ΔE with graphic-arts weighting.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cie94;

/// Squared CIEDE2000 ΔE.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ciede2000;

impl Metric for EuclideanSrgb {
    type Working = [f64; 3];

    fn convert(&self, color: Color) -> [f64; 3] {
        color.channels().map(f64::from)
    }

    fn distance(&self, a: &[f64; 3], b: &[f64; 3]) -> f64 {
        squared_distance(*a, *b)
    }
}

impl Metric for EuclideanLinear {
    type Working = [f64; 3];

    fn convert(&self, color: Color) -> [f64; 3] {
        color.channels().map(srgb_to_linear)
    }

    fn distance(&self, a: &[f64; 3], b: &[f64; 3]) -> f64 {
        squared_distance(*a, *b)
    }
}

impl Metric for Cie76 {
    type Working = Lab;

    fn convert(&self, color: Color) -> Lab {
        Lab::from(color)
    }

    fn distance(&self, a: &Lab, b: &Lab) -> f64 {
        cie76_sqr(*a, *b)
    }
}

impl Metric for Cie94 {
    type Working = Lab;

    fn convert(&self, color: Color) -> Lab {
        Lab::from(color)
    }

    fn distance(&self, a: &Lab, b: &Lab) -> f64 {
        cie94_sqr(*a, *b)
    }
}

impl Metric for Ciede2000 {
    type Working = Lab;

    fn convert(&self, color: Color) -> Lab {
        Lab::from(color)
    }

    fn distance(&self, a: &Lab, b: &Lab) -> f64 {
        ciede2000_sqr(*a, *b)
    }
}

fn squared_distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    a.iter()
        .zip(&b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

/// Squared Euclidean distance between two colors in sRGB space.
#[must_use]
pub fn euclidean_srgb_sqr(a: Color, b: Color) -> f64 {
    EuclideanSrgb.distance(&EuclideanSrgb.convert(a), &EuclideanSrgb.convert(b))
}

/// Squared Euclidean distance between two colors in linear RGB space.
#[must_use]
pub fn euclidean_linear_sqr(a: Color, b: Color) -> f64 {
    EuclideanLinear.distance(&EuclideanLinear.convert(a), &EuclideanLinear.convert(b))
}

/// Squared CIE76 ΔE.
#[must_use]
pub fn cie76_sqr(a: Lab, b: Lab) -> f64 {
    squared_distance([a.l, a.a, a.b], [b.l, b.a, b.b])
}

/// Squared CIE94 ΔE using the graphic-arts constants
/// (`k1 = 0.045`, `k2 = 0.015`, `kL = kC = kH = 1`).
#[must_use]
pub fn cie94_sqr(a: Lab, b: Lab) -> f64 {
    const K1: f64 = 0.045;
    const K2: f64 = 0.015;

    let delta_l = a.l - b.l;
    let c1 = a.a.hypot(a.b);
    let c2 = b.a.hypot(b.b);
    let delta_c = c1 - c2;
    let delta_a = a.a - b.a;
    let delta_b = a.b - b.b;

    // Rounding can push ΔH² slightly below zero for near-identical hues.
    let delta_h_sqr = delta_c.mul_add(-delta_c, delta_a.mul_add(delta_a, delta_b * delta_b));
    let delta_h = delta_h_sqr.max(0.0).sqrt();

    let s_c = K1.mul_add(c1, 1.0);
    let s_h = K2.mul_add(c1, 1.0);

    let de_l = delta_l;
    let de_c = delta_c / s_c;
    let de_h = delta_h / s_h;

    de_h.mul_add(de_h, de_l.mul_add(de_l, de_c * de_c))
}

/// `sqrt(c^7 / (c^7 + 25^7))`, shared by the G factor and `R_C`.
fn chroma_weight(c: f64) -> f64 {
    let c7 = c.powi(7);
    (c7 / (c7 + 25f64.powi(7))).sqrt()
}

/// Hue angle in degrees within `[0, 360)`; zero for achromatic input.
fn hue_degrees(b: f64, a_prime: f64) -> f64 {
    if b == 0.0 && a_prime == 0.0 {
        return 0.0;
    }
    let h = b.atan2(a_prime).to_degrees();
    if h < 0.0 { h + 360.0 } else { h }
}

/// Squared CIEDE2000 ΔE (`kL = kC = kH = 1`).
///
/// Follows Sharma, Wu & Dalal, "The CIEDE2000 Color-Difference Formula:
/// Implementation Notes, Supplementary Test Data, and Mathematical
/// Observations" (2005), including the hue wraparound and the
/// zero-chroma special cases for `Δh'` and the mean hue.
#[must_use]
pub fn ciede2000_sqr(a: Lab, b: Lab) -> f64 {
    let c1 = a.a.hypot(a.b);
    let c2 = b.a.hypot(b.b);
    let c_avg = (c1 + c2) * 0.5;

    let g = 0.5 * (1.0 - chroma_weight(c_avg));
    let a1_prime = a.a * (1.0 + g);
    let a2_prime = b.a * (1.0 + g);

    let c1_prime = a1_prime.hypot(a.b);
    let c2_prime = a2_prime.hypot(b.b);
    let h1 = hue_degrees(a.b, a1_prime);
    let h2 = hue_degrees(b.b, a2_prime);

    let chroma_product = c1_prime * c2_prime;
    let h_diff = h2 - h1;

    let delta_l = b.l - a.l;
    let delta_c = c2_prime - c1_prime;
    let delta_h_angle = if chroma_product == 0.0 {
        0.0
    } else if h_diff > 180.0 {
        h_diff - 360.0
    } else if h_diff < -180.0 {
        h_diff + 360.0
    } else {
        h_diff
    };
    let delta_h = 2.0 * chroma_product.sqrt() * (delta_h_angle * 0.5).to_radians().sin();

    let l_avg = (a.l + b.l) * 0.5;
    let c_prime_avg = (c1_prime + c2_prime) * 0.5;
    let h_sum = h1 + h2;
    let h_avg = if chroma_product == 0.0 {
        h_sum
    } else if h_diff.abs() <= 180.0 {
        h_sum * 0.5
    } else if h_sum < 360.0 {
        (h_sum + 360.0) * 0.5
    } else {
        (h_sum - 360.0) * 0.5
    };

    let t = 0.20f64.mul_add(
        -(4.0f64.mul_add(h_avg, -63.0)).to_radians().cos(),
        0.32f64.mul_add(
            (3.0f64.mul_add(h_avg, 6.0)).to_radians().cos(),
            0.24f64.mul_add(
                (2.0 * h_avg).to_radians().cos(),
                0.17f64.mul_add(-(h_avg - 30.0).to_radians().cos(), 1.0),
            ),
        ),
    );

    let l50 = (l_avg - 50.0) * (l_avg - 50.0);
    let s_l = 1.0 + 0.015 * l50 / (20.0 + l50).sqrt();
    let s_c = 0.045f64.mul_add(c_prime_avg, 1.0);
    let s_h = (0.015 * c_prime_avg).mul_add(t, 1.0);

    let h_exp = (h_avg - 275.0) / 25.0;
    let delta_theta = 30.0 * (-(h_exp * h_exp)).exp();
    let r_t = -2.0 * chroma_weight(c_prime_avg) * (2.0 * delta_theta).to_radians().sin();

    let de_l = delta_l / s_l;
    let de_c = delta_c / s_c;
    let de_h = delta_h / s_h;

    let sum = (r_t * de_c).mul_add(de_h, de_h.mul_add(de_h, de_l.mul_add(de_l, de_c * de_c)));
    sum.max(0.0)
}
