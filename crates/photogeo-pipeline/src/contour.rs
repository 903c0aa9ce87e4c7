//! Contour tracing: extract closed outlines from binary layer masks.
//!
//! This module defines the [`ContourTracer`] trait for pluggable contour
//! tracing algorithms and the [`TracingMethod`] enum for selecting which
//! algorithm to use at runtime. The method is resolved once per call and
//! every layer of a [`QuantizationResult`] is traced with it.

use serde::{Deserialize, Serialize};

use crate::marching_squares;
use crate::types::{Mask, Outline, PipelineError, QuantizationResult, TracingResult};

/// Selects which contour tracing algorithm to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TracingMethod {
    /// Marching squares over the pixel-corner node grid, in mesh space.
    ///
    /// Produces closed loops with the layer's pixels on the right-hand
    /// side of travel, so outer boundaries run clockwise on screen and
    /// holes counter-clockwise.
    #[default]
    MarchingSquares,
}

/// Trait for contour tracing strategies.
///
/// Input: one binary mask per layer. Output: closed outlines per layer,
/// each ending with a copy of its first vertex.
pub trait ContourTracer {
    /// Trace every closed boundary of a single mask.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Allocation`] if the tracer's working
    /// buffers cannot be allocated.
    fn trace_mask(&self, mask: &Mask) -> Result<Vec<Outline>, PipelineError>;

    /// Trace every layer of a quantization result.
    ///
    /// # Errors
    ///
    /// Propagates the first error from [`ContourTracer::trace_mask`].
    fn trace(&self, quantization: &QuantizationResult) -> Result<TracingResult, PipelineError> {
        let layers = quantization
            .layers()
            .iter()
            .enumerate()
            .map(|(layer, mask)| {
                let outlines = self.trace_mask(mask)?;
                log::trace!("layer {layer}: {} outlines", outlines.len());
                Ok(outlines)
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;

        let result = TracingResult::new(layers);
        log::debug!(
            "traced {} outlines ({} vertices) across {} layers",
            result.outline_count(),
            result.vertex_count(),
            result.layer_count(),
        );
        Ok(result)
    }
}

impl ContourTracer for TracingMethod {
    fn trace_mask(&self, mask: &Mask) -> Result<Vec<Outline>, PipelineError> {
        match *self {
            Self::MarchingSquares => marching_squares::trace(mask),
        }
    }
}
