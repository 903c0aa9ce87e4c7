//! Vertex reduction: simplify traced outlines in place.
//!
//! Reduction never adds vertices. After the selected algorithm runs,
//! outlines that no longer enclose area (fewer than three distinct
//! vertices) are removed from their layer.

use serde::{Deserialize, Serialize};

use crate::types::{GenerationConfig, Outline, TracingResult};
use crate::{douglas_peucker, visvalingam_whyatt};

/// Selects which vertex reduction algorithm to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReductionMethod {
    /// Keep every traced vertex.
    #[default]
    None,
    /// Douglas-Peucker deviation-threshold splitting.
    DouglasPeucker,
    /// Visvalingam-Whyatt effective-area pruning.
    VisvalingamWhyatt,
}

impl ReductionMethod {
    /// Every method, in declaration order.
    pub const ALL: [Self; 3] = [Self::None, Self::DouglasPeucker, Self::VisvalingamWhyatt];
}

/// Threshold parameters for each reduction algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReductionThresholds {
    /// Douglas-Peucker tolerance in mesh units.
    pub douglas_peucker_tolerance: f64,
    /// Visvalingam-Whyatt doubled-area threshold in squared mesh units.
    pub visvalingam_whyatt_threshold: u64,
}

impl Default for ReductionThresholds {
    fn default() -> Self {
        Self {
            douglas_peucker_tolerance: GenerationConfig::DEFAULT_DOUGLAS_PEUCKER_TOLERANCE,
            visvalingam_whyatt_threshold: GenerationConfig::DEFAULT_VISVALINGAM_WHYATT_THRESHOLD,
        }
    }
}

/// Simplify every outline of `result` in place and drop degenerate ones.
pub fn reduce(result: &mut TracingResult, method: ReductionMethod, thresholds: &ReductionThresholds) {
    let before_vertices = result.vertex_count();
    let before_outlines = result.outline_count();

    for outlines in result.layers_mut() {
        for outline in outlines.iter_mut() {
            match method {
                ReductionMethod::None => {}
                ReductionMethod::DouglasPeucker => {
                    douglas_peucker::simplify(outline, thresholds.douglas_peucker_tolerance);
                }
                ReductionMethod::VisvalingamWhyatt => {
                    visvalingam_whyatt::simplify(outline, thresholds.visvalingam_whyatt_threshold);
                }
            }
        }
        outlines.retain(Outline::is_polygon);
    }

    log::debug!(
        "{method:?} reduction: {before_vertices} -> {} vertices, {before_outlines} -> {} outlines",
        result.vertex_count(),
        result.outline_count(),
    );
}
