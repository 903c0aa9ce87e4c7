//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! These diagnostics are permanent instrumentation for comparing metrics
//! and reduction settings. Timestamps come from a caller-supplied
//! [`Clock`], so the pipeline crate itself never reads the system time.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::contour::TracingMethod;
use crate::filter::FilterKind;
use crate::pipeline::{Pipeline, StagedResult};
use crate::quantize::QuantizationMethod;
use crate::reduce::ReductionMethod;
use crate::types::{GenerationConfig, Image, Outline, PipelineError, TracingResult};

/// Source of timestamps for stage timing.
pub trait Clock {
    /// An opaque point in time.
    type Instant;

    /// The current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 1: pre-filtering.
    pub filter: StageDiagnostics,
    /// Stage 2: quantization.
    pub quantization: StageDiagnostics,
    /// Stage 3: contour tracing.
    pub tracing: StageDiagnostics,
    /// Stage 4: vertex reduction.
    pub reduction: StageDiagnostics,
    /// Total wall-clock duration of the entire run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics (counts, sizes, etc.).
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Pre-filter metrics.
    Filter {
        /// Filters applied, in order.
        filters: Vec<FilterKind>,
    },
    /// Quantization metrics.
    Quantization {
        /// Distance metric used.
        method: QuantizationMethod,
        /// Background plus layer colors.
        palette_size: usize,
        /// Number of layer masks produced.
        layer_count: usize,
        /// Pixels assigned to any layer.
        active_pixel_count: usize,
        /// Total pixel count for computing coverage.
        total_pixel_count: usize,
    },
    /// Contour tracing metrics.
    Tracing {
        /// Tracing algorithm used.
        method: TracingMethod,
        /// Number of outlines found across all layers.
        outline_count: usize,
        /// Total vertices across all outlines.
        vertex_count: usize,
        /// Fewest vertices in any single outline.
        min_outline_vertices: usize,
        /// Most vertices in any single outline.
        max_outline_vertices: usize,
        /// Mean vertices per outline.
        mean_outline_vertices: f64,
    },
    /// Vertex reduction metrics.
    Reduction {
        /// Reduction algorithm used.
        method: ReductionMethod,
        /// Outlines before reduction.
        outlines_before: usize,
        /// Outlines after degenerate ones were removed.
        outlines_after: usize,
        /// Total vertices before reduction.
        vertices_before: usize,
        /// Total vertices after reduction.
        vertices_after: usize,
        /// Reduction ratio: `1.0 - (after / before)`.
        reduction_ratio: f64,
    },
}

/// High-level summary counts for the entire run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Number of output layers.
    pub layer_count: usize,
    /// Outlines in the final result.
    pub outline_count: usize,
    /// Vertices in the final result.
    pub vertex_count: usize,
}

impl PipelineDiagnostics {
    /// The stages in execution order, with display names.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, &StageDiagnostics); 4] {
        [
            ("Filter", &self.filter),
            ("Quantization", &self.quantization),
            ("Tracing", &self.tracing),
            ("Reduction", &self.reduction),
        ]
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels), {} layers",
            self.summary.image_width,
            self.summary.image_height,
            self.summary.pixel_count,
            self.summary.layer_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Outlines: {}  |  Vertices: {}",
            self.summary.outline_count, self.summary.vertex_count,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
pub fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Filter { filters } => {
            if filters.is_empty() {
                "none".to_string()
            } else {
                let names: Vec<String> = filters.iter().map(|f| format!("{f:?}")).collect();
                names.join(" -> ")
            }
        }
        StageMetrics::Quantization {
            method,
            palette_size,
            layer_count,
            active_pixel_count,
            total_pixel_count,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let coverage = if *total_pixel_count > 0 {
                *active_pixel_count as f64 / *total_pixel_count as f64 * 100.0
            } else {
                0.0
            };
            format!(
                "{method:?} palette={palette_size} layers={layer_count} active={active_pixel_count} ({coverage:.1}%)",
            )
        }
        StageMetrics::Tracing {
            method,
            outline_count,
            vertex_count,
            min_outline_vertices,
            max_outline_vertices,
            mean_outline_vertices,
        } => {
            format!(
                "{method:?} {outline_count} outlines, {vertex_count} vertices (min={min_outline_vertices} max={max_outline_vertices} mean={mean_outline_vertices:.1})",
            )
        }
        StageMetrics::Reduction {
            method,
            outlines_before,
            outlines_after,
            vertices_before,
            vertices_after,
            reduction_ratio,
        } => {
            format!(
                "{method:?} {vertices_before}->{vertices_after} vertices, {outlines_before}->{outlines_after} outlines ({:.1}% reduction)",
                reduction_ratio * 100.0,
            )
        }
    }
}

/// Statistics for the outlines of a tracing result.
pub(crate) struct OutlineStats {
    /// Total number of outlines.
    pub count: usize,
    /// Total number of vertices across all outlines.
    pub total: usize,
    /// Fewest vertices in any single outline.
    pub min: usize,
    /// Most vertices in any single outline.
    pub max: usize,
    /// Mean number of vertices per outline.
    pub mean: f64,
}

/// Compute outline statistics across every layer.
pub(crate) fn outline_stats(result: &TracingResult) -> OutlineStats {
    let lengths = || result.layers().iter().flatten().map(Outline::len);
    let count = result.outline_count();
    let total: usize = lengths().sum();
    let min = lengths().min().unwrap_or(0);
    let max = lengths().max().unwrap_or(0);
    #[allow(clippy::cast_precision_loss)]
    let mean = if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    };
    OutlineStats {
        count,
        total,
        min,
        max,
        mean,
    }
}

/// Run the full pipeline, timing every stage with `clock`, and keep
/// every intermediate.
///
/// # Errors
///
/// Returns every error of [`crate::generate`].
pub fn run_staged_with_diagnostics<C: Clock>(
    image: Image,
    config: &GenerationConfig,
    clock: &C,
) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
    config.validate()?;
    let dimensions = image.dimensions();
    let start = clock.now();

    let t = clock.now();
    let filtered = Pipeline::new(image, config.clone()).filter();
    let filter = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Filter {
            filters: config.filters.clone(),
        },
    };

    let t = clock.now();
    let quantized = filtered.quantize()?;
    let quantization = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Quantization {
            method: config.quantization_method,
            palette_size: quantized.image().palette().count(),
            layer_count: quantized.quantization().layer_count(),
            active_pixel_count: quantized.quantization().active_pixel_count(),
            total_pixel_count: dimensions.pixel_count(),
        },
    };

    let t = clock.now();
    let traced = quantized.trace()?;
    let tracing_duration = clock.elapsed(&t);
    let stats = outline_stats(traced.traced());
    let tracing = StageDiagnostics {
        duration: tracing_duration,
        metrics: StageMetrics::Tracing {
            method: config.tracing_method,
            outline_count: stats.count,
            vertex_count: stats.total,
            min_outline_vertices: stats.min,
            max_outline_vertices: stats.max,
            mean_outline_vertices: stats.mean,
        },
    };

    let t = clock.now();
    let reduced = traced.reduce();
    let reduction_duration = clock.elapsed(&t);
    let staged = reduced.into_result();
    let total_duration = clock.elapsed(&start);

    let vertices_after = staged.reduced.vertex_count();
    #[allow(clippy::cast_precision_loss)]
    let reduction_ratio = if stats.total > 0 {
        1.0 - vertices_after as f64 / stats.total as f64
    } else {
        0.0
    };
    let reduction = StageDiagnostics {
        duration: reduction_duration,
        metrics: StageMetrics::Reduction {
            method: config.reduction_method,
            outlines_before: stats.count,
            outlines_after: staged.reduced.outline_count(),
            vertices_before: stats.total,
            vertices_after,
            reduction_ratio,
        },
    };

    let summary = PipelineSummary {
        image_width: dimensions.width,
        image_height: dimensions.height,
        pixel_count: u64::from(dimensions.width) * u64::from(dimensions.height),
        layer_count: staged.reduced.layer_count(),
        outline_count: staged.reduced.outline_count(),
        vertex_count: vertices_after,
    };

    let diagnostics = PipelineDiagnostics {
        filter,
        quantization,
        tracing,
        reduction,
        total_duration,
        summary,
    };
    Ok((staged, diagnostics))
}

/// Run the full pipeline, timing every stage with `clock`.
///
/// Returns the same result as [`crate::generate`] along with the
/// diagnostics.
///
/// # Errors
///
/// Returns every error of [`crate::generate`].
pub fn generate_with_diagnostics<C: Clock>(
    image: Image,
    config: &GenerationConfig,
    clock: &C,
) -> Result<(TracingResult, PipelineDiagnostics), PipelineError> {
    let (staged, diagnostics) = run_staged_with_diagnostics(image, config, clock)?;
    Ok((staged.reduced, diagnostics))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::color::Color;
    use crate::types::{Dimensions, Vertex};

    /// A clock that advances one millisecond every time it is read.
    struct StepClock {
        ticks: Cell<u64>,
    }

    impl StepClock {
        const fn new() -> Self {
            Self {
                ticks: Cell::new(0),
            }
        }
    }

    impl Clock for StepClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.ticks.get();
            self.ticks.set(t + 1);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.now() - since)
        }
    }

    fn block_image() -> Image {
        let dimensions = Dimensions {
            width: 6,
            height: 6,
        };
        let white = Color::new(255, 255, 255);
        let black = Color::new(0, 0, 0);
        let colors: Vec<Color> = (0..36)
            .map(|i| {
                let (x, y) = (i % 6, i / 6);
                if (1..=4).contains(&x) && (1..=4).contains(&y) {
                    black
                } else {
                    white
                }
            })
            .collect();
        Image::from_colors(dimensions, &colors, vec![white], vec![black]).unwrap()
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let d = Duration::from_millis(1234);
        let ms = duration_ms(d);
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn outline_stats_empty() {
        let stats = outline_stats(&TracingResult::new(vec![vec![]]));
        assert_eq!(stats.count, 0);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.min, 0);
        assert_eq!(stats.max, 0);
        assert!((stats.mean - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn outline_stats_computes() {
        let square = |n: usize| {
            Outline::new((0..n).map(|i| Vertex::new(u32::try_from(i).unwrap(), 0)).collect())
        };
        let result = TracingResult::new(vec![vec![square(5)], vec![square(9), square(4)]]);
        let stats = outline_stats(&result);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.total, 18);
        assert_eq!(stats.min, 4);
        assert_eq!(stats.max, 9);
        assert!((stats.mean - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn diagnostics_match_plain_generation() {
        let config = GenerationConfig {
            reduction_method: ReductionMethod::DouglasPeucker,
            ..GenerationConfig::default()
        };
        let plain = crate::generate(block_image(), &config).unwrap();
        let (result, diagnostics) =
            generate_with_diagnostics(block_image(), &config, &StepClock::new()).unwrap();

        assert_eq!(result, plain);
        assert_eq!(diagnostics.summary.image_width, 6);
        assert_eq!(diagnostics.summary.layer_count, 1);
        assert_eq!(diagnostics.summary.outline_count, 1);
        assert_eq!(diagnostics.summary.vertex_count, result.vertex_count());

        let StageMetrics::Tracing { vertex_count, .. } = diagnostics.tracing.metrics else {
            unreachable!("tracing stage carries tracing metrics");
        };
        // Traced 4×4 block: one midpoint per border pixel edge plus the closing vertex.
        assert_eq!(vertex_count, 17);

        let StageMetrics::Reduction {
            vertices_before,
            vertices_after,
            ..
        } = diagnostics.reduction.metrics
        else {
            unreachable!("reduction stage carries reduction metrics");
        };
        assert_eq!(vertices_before, 17);
        assert_eq!(vertices_after, 5);
    }

    #[test]
    fn stage_durations_come_from_the_clock() {
        let (_, diagnostics) =
            generate_with_diagnostics(block_image(), &GenerationConfig::default(), &StepClock::new())
                .unwrap();
        for (name, stage) in diagnostics.stages() {
            assert_eq!(stage.duration, Duration::from_millis(1), "{name}");
        }
        assert!(diagnostics.total_duration > Duration::from_millis(4));
    }

    #[test]
    fn invalid_config_is_rejected_before_running() {
        let config = GenerationConfig {
            douglas_peucker_tolerance: f64::NAN,
            ..GenerationConfig::default()
        };
        let result = generate_with_diagnostics(block_image(), &config, &StepClock::new());
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn report_lists_every_stage() {
        let (_, diagnostics) =
            generate_with_diagnostics(block_image(), &GenerationConfig::default(), &StepClock::new())
                .unwrap();
        let report = diagnostics.report();
        assert!(report.contains("Pipeline Diagnostics Report"));
        for name in ["Filter", "Quantization", "Tracing", "Reduction"] {
            assert!(report.contains(name), "missing {name}");
        }
        assert!(report.contains("EuclideanLinear"));
    }

    #[test]
    fn diagnostics_serialize_durations_as_seconds() {
        let (_, diagnostics) =
            generate_with_diagnostics(block_image(), &GenerationConfig::default(), &StepClock::new())
                .unwrap();
        let json = serde_json::to_value(&diagnostics).unwrap();
        assert!((json["filter"]["duration"].as_f64().unwrap() - 0.001).abs() < 1e-12);
        let back: PipelineDiagnostics = serde_json::from_value(json).unwrap();
        assert_eq!(back.summary.vertex_count, diagnostics.summary.vertex_count);
    }
}
