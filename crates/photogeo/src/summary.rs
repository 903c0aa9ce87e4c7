//! Aggregated timing statistics across repeated runs.

use photogeo_pipeline::PipelineDiagnostics;
use photogeo_pipeline::diagnostics::duration_ms;

/// Mean and sample standard deviation of one stage's duration.
#[derive(Debug, Clone, PartialEq)]
pub struct StageSummary {
    pub name: &'static str,
    pub mean_ms: f64,
    pub std_dev_ms: f64,
}

/// Statistics over every run of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub runs: usize,
    pub total_min_ms: f64,
    pub total_mean_ms: f64,
    pub total_max_ms: f64,
    pub stages: Vec<StageSummary>,
}

impl RunSummary {
    /// Summarize `all_diagnostics`, or `None` if there are no runs.
    pub fn from_diagnostics(all_diagnostics: &[PipelineDiagnostics]) -> Option<Self> {
        let first = all_diagnostics.first()?;

        let totals: Vec<f64> = all_diagnostics
            .iter()
            .map(|d| duration_ms(d.total_duration))
            .collect();
        let total_min_ms = totals.iter().copied().reduce(f64::min).unwrap_or(0.0);
        let total_max_ms = totals.iter().copied().reduce(f64::max).unwrap_or(0.0);
        let (total_mean_ms, _) = mean_and_std_dev(&totals);

        let stages = first
            .stages()
            .iter()
            .enumerate()
            .map(|(index, &(name, _))| {
                let durations: Vec<f64> = all_diagnostics
                    .iter()
                    .map(|d| duration_ms(d.stages()[index].1.duration))
                    .collect();
                let (mean_ms, std_dev_ms) = mean_and_std_dev(&durations);
                StageSummary {
                    name,
                    mean_ms,
                    std_dev_ms,
                }
            })
            .collect();

        Some(Self {
            runs: all_diagnostics.len(),
            total_min_ms,
            total_mean_ms,
            total_max_ms,
            stages,
        })
    }

    /// Format the summary as a human-readable table.
    pub fn report(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!("Summary ({} runs)\n{}", self.runs, "=".repeat(60)));
        lines.push(format!(
            "Total duration: min={:.3}ms  mean={:.3}ms  max={:.3}ms",
            self.total_min_ms, self.total_mean_ms, self.total_max_ms,
        ));
        lines.push(String::new());
        lines.push(format!("{:<24} {:>12} {:>12}", "Stage", "Mean (ms)", "Std dev"));
        lines.push("-".repeat(50));
        for stage in &self.stages {
            lines.push(format!(
                "{:<24} {:>10.3}ms {:>10.3}ms",
                stage.name, stage.mean_ms, stage.std_dev_ms,
            ));
        }
        lines.join("\n")
    }
}

/// Mean and sample standard deviation (`n - 1` denominator). A single
/// sample has zero deviation.
#[allow(clippy::cast_precision_loss)]
fn mean_and_std_dev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, variance.sqrt())
}
