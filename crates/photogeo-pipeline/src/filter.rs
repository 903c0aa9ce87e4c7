//! Optional noise reduction applied to the image before quantization.
//!
//! Filters run in caller order, each replacing the pixel buffer. Gaussian
//! blur, the bilateral filter and the median filter wrap `imageproc`; the
//! Kuwahara filter is written here against the RGB buffer directly.

use image::{GrayImage, Rgb, RgbImage};
use imageproc::filter::bilateral::ColorDistance;
use serde::{Deserialize, Serialize};

/// Selects one pre-filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterKind {
    /// Gaussian blur with σ = [`GAUSSIAN_SIGMA`].
    GaussianBlur,
    /// Bilateral filter with [`BILATERAL_SIGMA_COLOR`] and
    /// [`BILATERAL_SIGMA_SPACE`].
    BilateralFilter,
    /// 3×3 median filter.
    MedianFilter,
    /// Kuwahara filter with quadrants of `KUWAHARA_RADIUS + 1` pixels square.
    KuwaharaFilter,
}

impl FilterKind {
    /// Every filter, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::GaussianBlur,
        Self::BilateralFilter,
        Self::MedianFilter,
        Self::KuwaharaFilter,
    ];
}

/// Standard deviation of the Gaussian blur, in pixels.
pub const GAUSSIAN_SIGMA: f32 = 1.5;

/// Color standard deviation of the bilateral filter, in channel units.
pub const BILATERAL_SIGMA_COLOR: f64 = 50.0;

/// Spatial standard deviation of the bilateral filter, in pixels.
pub const BILATERAL_SIGMA_SPACE: f64 = 5.0;

/// Median window radius (a 3×3 window).
pub const MEDIAN_RADIUS: u32 = 1;

/// Kuwahara quadrant extent; each quadrant spans `KUWAHARA_RADIUS + 1`
/// pixels on a side.
pub const KUWAHARA_RADIUS: u32 = 2;

/// Apply `filters` to `image` in order.
pub fn apply_filters(image: &mut RgbImage, filters: &[FilterKind]) {
    for &filter in filters {
        *image = apply_filter(image, filter);
        log::trace!("applied {filter:?}");
    }
}

/// Apply a single filter, returning the filtered image.
#[must_use = "returns the filtered image"]
pub fn apply_filter(image: &RgbImage, filter: FilterKind) -> RgbImage {
    match filter {
        FilterKind::GaussianBlur => gaussian_blur(image, GAUSSIAN_SIGMA),
        FilterKind::BilateralFilter => {
            bilateral_filter(image, BILATERAL_SIGMA_COLOR, BILATERAL_SIGMA_SPACE)
        }
        FilterKind::MedianFilter => imageproc::filter::median_filter(image, MEDIAN_RADIUS, MEDIAN_RADIUS),
        FilterKind::KuwaharaFilter => kuwahara_filter(image, KUWAHARA_RADIUS),
    }
}

/// Gaussian blur of an RGB image, one channel at a time.
///
/// `imageproc::filter::gaussian_blur_f32` works on single-channel images,
/// so the image is split, blurred per channel and reassembled.
/// Non-positive sigma values return the image unchanged.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &RgbImage, sigma: f32) -> RgbImage {
    if sigma <= 0.0 {
        return image.clone();
    }

    let (w, h) = image.dimensions();
    let channels: [GrayImage; 3] = std::array::from_fn(|c| {
        GrayImage::from_fn(w, h, |x, y| image::Luma([image.get_pixel(x, y).0[c]]))
    });
    let blurred: [GrayImage; 3] =
        std::array::from_fn(|c| imageproc::filter::gaussian_blur_f32(&channels[c], sigma));

    RgbImage::from_fn(w, h, |x, y| {
        Rgb([
            blurred[0].get_pixel(x, y).0[0],
            blurred[1].get_pixel(x, y).0[0],
            blurred[2].get_pixel(x, y).0[0],
        ])
    })
}

/// Bilateral color weight on the sum of absolute channel differences,
/// the measure `cv::bilateralFilter` uses for 3-channel images.
struct GaussianL1ColorDistance {
    /// `-1 / (2σ²)`.
    coeff: f64,
}

impl GaussianL1ColorDistance {
    fn new(sigma: f64) -> Self {
        Self {
            coeff: -0.5 / (sigma * sigma),
        }
    }
}

impl ColorDistance<Rgb<u8>> for GaussianL1ColorDistance {
    #[allow(clippy::cast_possible_truncation)]
    fn color_distance(&self, pixel1: &Rgb<u8>, pixel2: &Rgb<u8>) -> f32 {
        let diff: u32 = pixel1
            .0
            .iter()
            .zip(&pixel2.0)
            .map(|(&a, &b)| u32::from(a.abs_diff(b)))
            .sum();
        let diff = f64::from(diff);
        (diff * diff * self.coeff).exp() as f32
    }
}

/// Bilateral filter over a window of radius `round(1.5·σ_space)`.
///
/// Wraps `imageproc::filter::bilateral_filter` with an L1 color
/// distance.
#[must_use = "returns the filtered image"]
pub fn bilateral_filter(image: &RgbImage, sigma_color: f64, sigma_space: f64) -> RgbImage {
    if sigma_color <= 0.0 || sigma_space <= 0.0 {
        return image.clone();
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let radius = (sigma_space * 1.5).round().min(f64::from(u8::MAX)) as u8;
    #[allow(clippy::cast_possible_truncation)]
    let sigma_space = sigma_space as f32;
    imageproc::filter::bilateral_filter(
        image,
        radius,
        sigma_space,
        GaussianL1ColorDistance::new(sigma_color),
    )
}

/// Kuwahara filter: each pixel takes the mean of whichever of its four
/// surrounding `(radius + 1)²` quadrants has the lowest color variance.
///
/// Quadrant means are rounded to the nearest integer.
///
/// Quadrants overlap on the pixel's row and column. Coordinates beyond
/// the border are clamped to the edge, and the first quadrant with the
/// minimum variance wins.
#[must_use = "returns the filtered image"]
pub fn kuwahara_filter(image: &RgbImage, radius: u32) -> RgbImage {
    let (w, h) = image.dimensions();
    let radius = i64::from(radius);
    let side = radius + 1;
    #[allow(clippy::cast_precision_loss)]
    let count = (side * side) as f64;

    let sample = |x: i64, y: i64| -> [i64; 3] {
        let cx = u32::try_from(x.clamp(0, i64::from(w) - 1)).unwrap_or(0);
        let cy = u32::try_from(y.clamp(0, i64::from(h) - 1)).unwrap_or(0);
        image.get_pixel(cx, cy).0.map(i64::from)
    };

    RgbImage::from_fn(w, h, |x, y| {
        let (x, y) = (i64::from(x), i64::from(y));
        // Top-right, top-left, bottom-left, bottom-right.
        let origins = [
            (x, y - radius),
            (x - radius, y - radius),
            (x - radius, y),
            (x, y),
        ];

        let mut best = [0i64; 3];
        let mut best_variance = f64::INFINITY;
        for (ox, oy) in origins {
            let offsets = (0..side).flat_map(|dy| (0..side).map(move |dx| (dx, dy)));

            let mut total = [0i64; 3];
            for (dx, dy) in offsets.clone() {
                let px = sample(ox + dx, oy + dy);
                for (t, p) in total.iter_mut().zip(px) {
                    *t += p;
                }
            }
            let area = side * side;
            let mean = total.map(|t| (t + area / 2) / area);

            let mut variance = 0.0;
            for (dx, dy) in offsets {
                let px = sample(ox + dx, oy + dy);
                let sq: i64 = px.iter().zip(&mean).map(|(p, m)| (p - m) * (p - m)).sum();
                #[allow(clippy::cast_precision_loss)]
                let sq = sq as f64;
                variance += sq;
            }
            variance /= count;

            if variance < best_variance {
                best_variance = variance;
                best = mean;
            }
        }

        Rgb(best.map(|c| u8::try_from(c).unwrap_or(u8::MAX)))
    })
}
