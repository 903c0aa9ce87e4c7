//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::generate`] which runs the entire pipeline in one call,
//! [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use photogeo_pipeline::{GenerationConfig, Image, Pipeline, PipelineError};
//! # fn run(image: Image) -> Result<(), PipelineError> {
//! let reduced = Pipeline::new(image, GenerationConfig::default())
//!     .filter()
//!     .quantize()?
//!     .trace()?
//!     .reduce();
//!
//! let staged = reduced.into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state
//! (or `Result` for fallible stages), carrying all previously computed
//! intermediates. The caller can inspect the current stage's output via
//! accessor methods at any point.
//!
//! # Memory
//!
//! Every stage from [`Quantized`] onward retains the layer masks, and
//! [`Reduced`] keeps both the traced and the reduced outlines. Callers
//! that only need the final outlines should prefer [`crate::generate`],
//! which drops each intermediate as soon as the next stage has consumed
//! it.

use crate::contour::ContourTracer;
use crate::types::{Dimensions, GenerationConfig, Image, PipelineError, QuantizationResult, TracingResult};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// Call [`filter`](Self::filter) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing — call .filter() to continue"]
pub struct Pending {
    config: GenerationConfig,
    image: Image,
}

impl Pending {
    /// The source image, as supplied.
    #[must_use]
    pub const fn image(&self) -> &Image {
        &self.image
    }

    /// Apply the configured pre-filters and advance to [`Filtered`].
    ///
    /// With no filters configured this is a pass-through.
    pub fn filter(mut self) -> Filtered {
        crate::filter::apply_filters(self.image.pixels_mut(), &self.config.filters);
        Filtered {
            config: self.config,
            image: self.image,
        }
    }
}

// ───────────────────────── Stage 1: Filtered ─────────────────────────

/// Pipeline state after pre-filtering.
///
/// Call [`quantize`](Self::quantize) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing — call .quantize() to continue"]
pub struct Filtered {
    config: GenerationConfig,
    image: Image,
}

impl Filtered {
    /// The filtered image.
    #[must_use]
    pub const fn filtered(&self) -> &Image {
        &self.image
    }

    /// Quantize the filtered image and advance to [`Quantized`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the configuration does
    /// not validate, and [`PipelineError::Allocation`] if a layer mask
    /// cannot be allocated.
    pub fn quantize(self) -> Result<Quantized, PipelineError> {
        self.config.validate()?;
        let quantization = crate::quantize::quantize(&self.image, self.config.quantization_method)?;
        Ok(Quantized {
            config: self.config,
            image: self.image,
            quantization,
        })
    }
}

// ───────────────────────── Stage 2: Quantized ────────────────────────

/// Pipeline state after quantization.
///
/// Call [`trace`](Self::trace) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing — call .trace() to continue"]
pub struct Quantized {
    config: GenerationConfig,
    image: Image,
    quantization: QuantizationResult,
}

impl Quantized {
    /// The filtered image that was quantized.
    #[must_use]
    pub const fn image(&self) -> &Image {
        &self.image
    }

    /// One mask per layer color.
    #[must_use]
    pub const fn quantization(&self) -> &QuantizationResult {
        &self.quantization
    }

    /// Trace every layer mask and advance to [`Traced`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Allocation`] if the tracer's node grid
    /// cannot be allocated.
    pub fn trace(self) -> Result<Traced, PipelineError> {
        let traced = self.config.tracing_method.trace(&self.quantization)?;
        Ok(Traced {
            config: self.config,
            image: self.image,
            quantization: self.quantization,
            traced,
        })
    }
}

// ───────────────────────── Stage 3: Traced ───────────────────────────

/// Pipeline state after contour tracing.
///
/// Call [`reduce`](Self::reduce) to advance to the final stage.
#[must_use = "pipeline stages are consumed by advancing — call .reduce() to continue"]
pub struct Traced {
    config: GenerationConfig,
    image: Image,
    quantization: QuantizationResult,
    traced: TracingResult,
}

impl Traced {
    /// The layer masks that were traced.
    #[must_use]
    pub const fn quantization(&self) -> &QuantizationResult {
        &self.quantization
    }

    /// The freshly traced outlines.
    #[must_use]
    pub const fn traced(&self) -> &TracingResult {
        &self.traced
    }

    /// Reduce a copy of the traced outlines and advance to [`Reduced`].
    pub fn reduce(self) -> Reduced {
        let mut reduced = self.traced.clone();
        crate::reduce::reduce(
            &mut reduced,
            self.config.reduction_method,
            &self.config.thresholds(),
        );
        Reduced {
            image: self.image,
            quantization: self.quantization,
            traced: self.traced,
            reduced,
        }
    }
}

// ───────────────────────── Stage 4: Reduced ──────────────────────────

/// Pipeline state after vertex reduction: the final stage.
///
/// Call [`into_result`](Self::into_result) to extract the
/// [`StagedResult`] containing all intermediates.
#[must_use = "call .into_result() to extract the StagedResult"]
pub struct Reduced {
    image: Image,
    quantization: QuantizationResult,
    traced: TracingResult,
    reduced: TracingResult,
}

impl Reduced {
    /// The reduced outlines.
    #[must_use]
    pub const fn reduced(&self) -> &TracingResult {
        &self.reduced
    }

    /// Image dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        self.image.dimensions()
    }

    /// Consume the pipeline and return the full [`StagedResult`].
    #[must_use]
    pub fn into_result(self) -> StagedResult {
        StagedResult {
            dimensions: self.image.dimensions(),
            filtered: self.image,
            quantization: self.quantization,
            traced: self.traced,
            reduced: self.reduced,
        }
    }
}

/// Every intermediate of a pipeline run.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// The image after pre-filtering.
    pub filtered: Image,
    /// One mask per layer color.
    pub quantization: QuantizationResult,
    /// Outlines as traced, before reduction.
    pub traced: TracingResult,
    /// Outlines after reduction; the pipeline's output.
    pub reduced: TracingResult,
    /// Image dimensions in pixels.
    pub dimensions: Dimensions,
}

// ───────────────────── Pipeline entry point ──────────────────────────

/// Incremental generation pipeline.
///
/// Created via [`Pipeline::new`], which stores the image and config
/// without doing any processing. Each stage method consumes the current
/// state and returns the next, making it a compile-time error to skip
/// stages or call them out of order.
pub struct Pipeline;

impl Pipeline {
    /// Create a new pipeline from an image and config.
    ///
    /// No processing is performed; call [`.filter()`](Pending::filter)
    /// to begin.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(image: Image, config: GenerationConfig) -> Pending {
        Pending { config, image }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::filter::FilterKind;
    use crate::reduce::ReductionMethod;
    use crate::types::RgbImage;

    const WHITE: Color = Color::new(255, 255, 255);
    const RED: Color = Color::new(255, 0, 0);

    /// A white image with a red `size`×`size` square at (2, 2).
    fn square_image(size: u32) -> Image {
        let pixels = RgbImage::from_fn(size + 4, size + 4, |x, y| {
            if (2..size + 2).contains(&x) && (2..size + 2).contains(&y) {
                RED.into()
            } else {
                WHITE.into()
            }
        });
        Image::new(pixels, vec![WHITE], vec![RED]).unwrap()
    }

    // ─────────── Typed API tests ─────────────────────────────────

    #[test]
    fn pending_exposes_source_image() {
        let pending = Pipeline::new(square_image(3), GenerationConfig::default());
        assert_eq!(pending.image().dimensions().width, 7);
    }

    #[test]
    fn filter_without_filters_is_pass_through() {
        let image = square_image(3);
        let expected = image.pixels().clone();
        let filtered = Pipeline::new(image, GenerationConfig::default()).filter();
        assert_eq!(filtered.filtered().pixels(), &expected);
    }

    #[test]
    fn filter_applies_configured_filters() {
        let config = GenerationConfig {
            filters: vec![FilterKind::MedianFilter],
            ..GenerationConfig::default()
        };
        // A single red pixel is removed by the median filter.
        let filtered = Pipeline::new(square_image(1), config).filter();
        assert_eq!(filtered.filtered().color_at(2, 2), WHITE);
    }

    #[test]
    fn quantized_exposes_masks() {
        let quantized = Pipeline::new(square_image(3), GenerationConfig::default())
            .filter()
            .quantize()
            .unwrap();
        assert_eq!(quantized.quantization().layer_count(), 1);
        assert_eq!(quantized.quantization().active_pixel_count(), 9);
    }

    #[test]
    fn quantize_rejects_invalid_config() {
        let config = GenerationConfig {
            douglas_peucker_tolerance: -2.0,
            ..GenerationConfig::default()
        };
        let result = Pipeline::new(square_image(3), config).filter().quantize();
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn traced_exposes_outlines() {
        let traced = Pipeline::new(square_image(3), GenerationConfig::default())
            .filter()
            .quantize()
            .unwrap()
            .trace()
            .unwrap();
        assert_eq!(traced.traced().outline_count(), 1);
        assert_eq!(traced.quantization().active_pixel_count(), 9);
    }

    #[test]
    fn reduced_keeps_traced_intermediate() {
        let config = GenerationConfig {
            reduction_method: ReductionMethod::VisvalingamWhyatt,
            ..GenerationConfig::default()
        };
        let staged = Pipeline::new(square_image(4), config)
            .filter()
            .quantize()
            .unwrap()
            .trace()
            .unwrap()
            .reduce()
            .into_result();

        assert_eq!(staged.dimensions.width, 8);
        assert_eq!(staged.traced.vertex_count(), 17);
        assert!(staged.reduced.vertex_count() < staged.traced.vertex_count());
        assert_eq!(staged.quantization.active_pixel_count(), 16);
    }

    #[test]
    fn staged_result_matches_generate() {
        let config = GenerationConfig {
            reduction_method: ReductionMethod::DouglasPeucker,
            ..GenerationConfig::default()
        };
        let staged = Pipeline::new(square_image(5), config.clone())
            .filter()
            .quantize()
            .unwrap()
            .trace()
            .unwrap()
            .reduce()
            .into_result();
        let direct = crate::generate(square_image(5), &config).unwrap();
        assert_eq!(staged.reduced, direct);
    }
}
