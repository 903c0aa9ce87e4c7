//! photogeo-pipeline: raster-to-polygon pipeline (sans-IO).
//!
//! Converts a photograph into closed polygonal outlines through:
//! pre-filter -> quantization -> contour tracing -> vertex reduction.
//!
//! This crate has **no I/O dependencies**: it operates on in-memory RGB
//! buffers and returns structured data. Image decoding and file output
//! live in the `photogeo` command-line crate, serialization in
//! `photogeo-export`.

pub mod color;
pub mod contour;
pub mod diagnostics;
pub mod distance;
pub mod douglas_peucker;
pub mod filter;
pub mod marching_squares;
pub mod pipeline;
pub mod quantize;
pub mod reduce;
pub mod types;
pub mod visvalingam_whyatt;

pub use color::{Color, Lab, ParseColorError, Xyz};
pub use contour::{ContourTracer, TracingMethod};
pub use diagnostics::{Clock, PipelineDiagnostics, generate_with_diagnostics};
pub use filter::FilterKind;
pub use pipeline::{Pipeline, StagedResult};
pub use quantize::{QuantizationMethod, quantize};
pub use reduce::{ReductionMethod, ReductionThresholds, reduce};
pub use types::{
    Dimensions, GenerationConfig, Image, Mask, Outline, PipelineError, QuantizationResult,
    RgbImage, TracingResult, Vertex,
};

/// Run the full generation pipeline.
///
/// Takes an image with its palette and a configuration, and produces one
/// list of closed outlines per layer color, in mesh space (pixel
/// coordinates ×2).
///
/// # Pipeline steps
///
/// 1. Pre-filter the pixels in place (optional, in configured order)
/// 2. Quantize every pixel to its nearest palette color
/// 3. Trace each layer mask with the configured tracer
/// 4. Reduce vertices and drop outlines that no longer enclose area
///
/// Each intermediate is dropped as soon as the next stage has consumed
/// it.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `config` does not validate.
/// Returns [`PipelineError::Allocation`] if a mask or node grid cannot be
/// allocated.
pub fn generate(mut image: Image, config: &GenerationConfig) -> Result<TracingResult, PipelineError> {
    config.validate()?;

    // 1. Pre-filter.
    filter::apply_filters(image.pixels_mut(), &config.filters);

    // 2. Quantization.
    let quantization = quantize::quantize(&image, config.quantization_method)?;
    drop(image);

    // 3. Contour tracing.
    let mut result = config.tracing_method.trace(&quantization)?;
    drop(quantization);

    // 4. Vertex reduction.
    reduce::reduce(&mut result, config.reduction_method, &config.thresholds());

    Ok(result)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const WHITE: Color = Color::new(255, 255, 255);
    const BLACK: Color = Color::new(0, 0, 0);
    const RED: Color = Color::new(255, 0, 0);
    const BLUE: Color = Color::new(0, 0, 255);

    #[test]
    fn generate_traces_block_in_mesh_space() {
        // 4×4 white image with a black 2×2 block at (1..=2, 1..=2).
        let pixels = RgbImage::from_fn(4, 4, |x, y| {
            if (1..=2).contains(&x) && (1..=2).contains(&y) {
                BLACK.into()
            } else {
                WHITE.into()
            }
        });
        let image = Image::new(pixels, vec![WHITE], vec![BLACK]).unwrap();
        let config = GenerationConfig {
            quantization_method: QuantizationMethod::EuclideanSrgb,
            ..GenerationConfig::default()
        };

        let result = generate(image, &config).unwrap();
        assert_eq!(result.layer_count(), 1);
        assert_eq!(result.outlines(0).len(), 1);

        let outline = &result.outlines(0)[0];
        assert!(outline.is_closed());
        // 2(w + h) + 1 entries for a w×h block.
        assert_eq!(outline.len(), 9);
        assert_eq!(result.vertex_count(), 9);
        for w in outline.vertices().windows(2) {
            let step = w[0].x.abs_diff(w[1].x) + w[0].y.abs_diff(w[1].y);
            assert_eq!(step, 2, "{:?} -> {:?}", w[0], w[1]);
        }
        let xs = outline.vertices().iter().map(|v| v.x);
        let ys = outline.vertices().iter().map(|v| v.y);
        assert_eq!(xs.clone().min(), Some(2));
        assert_eq!(xs.max(), Some(6));
        assert_eq!(ys.clone().min(), Some(2));
        assert_eq!(ys.max(), Some(6));
    }

    #[test]
    fn generate_keeps_layers_separate() {
        let pixels = RgbImage::from_fn(6, 3, |x, _| match x {
            1 => RED.into(),
            4 => BLUE.into(),
            _ => WHITE.into(),
        });
        let image = Image::new(pixels, vec![WHITE], vec![RED, BLUE]).unwrap();
        let result = generate(image, &GenerationConfig::default()).unwrap();

        assert_eq!(result.layer_count(), 2);
        assert_eq!(result.outlines(0).len(), 1);
        assert_eq!(result.outlines(1).len(), 1);
        assert!(result.outlines(0)[0].vertices().iter().all(|v| v.x <= 4));
        assert!(result.outlines(1)[0].vertices().iter().all(|v| v.x >= 7));
    }

    #[test]
    fn generate_with_no_matching_pixels_returns_empty_layer() {
        let image = Image::new(RgbImage::from_pixel(3, 3, WHITE.into()), vec![WHITE], vec![BLACK])
            .unwrap();
        let result = generate(image, &GenerationConfig::default()).unwrap();
        assert_eq!(result.layer_count(), 1);
        assert!(result.outlines(0).is_empty());
    }

    #[test]
    fn generate_rejects_invalid_config() {
        let image = Image::new(RgbImage::new(2, 2), vec![], vec![BLACK]).unwrap();
        let config = GenerationConfig {
            douglas_peucker_tolerance: f64::INFINITY,
            ..GenerationConfig::default()
        };
        assert!(matches!(
            generate(image, &config),
            Err(PipelineError::InvalidConfig(_))
        ));
    }
}
