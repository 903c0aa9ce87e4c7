//! Quantization: classify every pixel against the image palette.
//!
//! Each pixel is assigned to the palette entry nearest to it under the
//! selected [`QuantizationMethod`]. Pixels nearest to a layer color set
//! that layer's mask bit; pixels nearest to a background color set
//! nothing.

use serde::{Deserialize, Serialize};

use crate::distance::{Cie76, Cie94, Ciede2000, EuclideanLinear, EuclideanSrgb, Metric};
use crate::types::{Image, Mask, PipelineError, QuantizationResult};

/// Selects which color distance metric the quantizer uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QuantizationMethod {
    /// Euclidean distance on raw 8-bit sRGB channels.
    EuclideanSrgb,
    /// Euclidean distance on linearized sRGB.
    #[default]
    EuclideanLinear,
    /// CIE 1976 ΔE: Euclidean distance in L\*a\*b\*.
    Cie76,
    /// CIE 1994 ΔE with graphic-arts weights.
    Cie94,
    /// CIEDE2000 ΔE.
    Ciede2000,
}

impl QuantizationMethod {
    /// Every method, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::EuclideanSrgb,
        Self::EuclideanLinear,
        Self::Cie76,
        Self::Cie94,
        Self::Ciede2000,
    ];
}

/// Quantize `image` into one mask per layer color.
///
/// The metric is resolved once here; the per-pixel loop is monomorphized
/// for it.
///
/// # Errors
///
/// Returns [`PipelineError::Allocation`] if a layer mask cannot be
/// allocated.
pub fn quantize(
    image: &Image,
    method: QuantizationMethod,
) -> Result<QuantizationResult, PipelineError> {
    match method {
        QuantizationMethod::EuclideanSrgb => quantize_with(image, &EuclideanSrgb),
        QuantizationMethod::EuclideanLinear => quantize_with(image, &EuclideanLinear),
        QuantizationMethod::Cie76 => quantize_with(image, &Cie76),
        QuantizationMethod::Cie94 => quantize_with(image, &Cie94),
        QuantizationMethod::Ciede2000 => quantize_with(image, &Ciede2000),
    }
}

/// Quantize `image` with an explicit metric.
///
/// # Errors
///
/// Returns [`PipelineError::Allocation`] if a layer mask cannot be
/// allocated.
pub fn quantize_with<M: Metric>(
    image: &Image,
    metric: &M,
) -> Result<QuantizationResult, PipelineError> {
    let dimensions = image.dimensions();
    let background_count = image.background_colors().len();
    let palette: Vec<M::Working> = image.palette().map(|c| metric.convert(c)).collect();

    let mut masks = (0..image.layer_count())
        .map(|_| Mask::inactive(dimensions))
        .collect::<Result<Vec<_>, _>>()?;

    for (x, y, pixel) in image.pixels().enumerate_pixels() {
        let working = metric.convert((*pixel).into());
        let nearest = nearest_palette_index(metric, &working, &palette);
        if let Some(layer) = nearest.checked_sub(background_count) {
            masks[layer].set(x, y, true);
        }
    }

    for (layer, mask) in masks.iter().enumerate() {
        let active = mask.active_count();
        if active == 0 {
            log::warn!("layer {layer} has no pixels after quantization");
        } else {
            log::trace!("layer {layer}: {active} pixels");
        }
    }

    let result = QuantizationResult::new(dimensions, masks)?;
    log::debug!(
        "quantized {}x{} image into {} layers ({} active pixels)",
        dimensions.width,
        dimensions.height,
        result.layer_count(),
        result.active_pixel_count(),
    );
    Ok(result)
}

/// Index of the palette entry nearest to `color`.
///
/// Comparison is strict, so the first entry achieving the minimum wins.
/// Returns `0` for an empty palette.
pub fn nearest_palette_index<M: Metric>(
    metric: &M,
    color: &M::Working,
    palette: &[M::Working],
) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (index, entry) in palette.iter().enumerate() {
        let distance = metric.distance(color, entry);
        if distance < best_distance {
            best = index;
            best_distance = distance;
        }
    }
    best
}
