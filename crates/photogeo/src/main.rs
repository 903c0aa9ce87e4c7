//! photogeo: turn a photograph into SVG collision outlines.
//!
//! Loads an RGB image, runs the generation pipeline with the given
//! palette and methods, and writes one stroked outline group per layer
//! color to an SVG file. Per-stage diagnostics are printed after every
//! run, which makes the tool useful for:
//!
//! - Comparing color distance metrics on the same palette
//! - Tuning Douglas-Peucker and Visvalingam-Whyatt thresholds
//! - Measuring per-stage durations across repeated runs
//! - Inspecting intermediates (filtered image, masks, raw outlines)
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin photogeo -- [OPTIONS] <INPUT> <OUTPUT>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod summary;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use image::DynamicImage;
use log::{info, warn};
use photogeo_export::SvgOptions;
use photogeo_pipeline::diagnostics::run_staged_with_diagnostics;
use photogeo_pipeline::{
    Clock, Color, Dimensions, FilterKind, GenerationConfig, Image, PipelineDiagnostics,
    PipelineError, QuantizationMethod, ReductionMethod, RgbImage, StagedResult, TracingResult,
};

use crate::summary::RunSummary;

/// Generate polygonal collision outlines from a photograph.
///
/// Every pixel is matched to its nearest palette color; the pixels of
/// each foreground color are traced into closed outlines, optionally
/// simplified, and written to an SVG file.
#[derive(Parser)]
#[command(name = "photogeo", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP). Must be 8-bit RGB.
    input: PathBuf,

    /// Path of the SVG file to write.
    output: PathBuf,

    /// Background color as R:G:B. Pixels nearest to it are not traced.
    #[arg(short, long = "background", value_name = "R:G:B")]
    background: Vec<Color>,

    /// Foreground (layer) color as R:G:B. Each one produces a layer.
    #[arg(short, long = "foreground", value_name = "R:G:B")]
    foreground: Vec<Color>,

    /// Pre-filter to apply before quantization. Repeat to chain filters
    /// in the given order.
    #[arg(long = "filter", value_enum)]
    filters: Vec<Filter>,

    /// Color distance metric for quantization.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_QUANTIZATION)]
    quantization: Quantization,

    /// Vertex reduction algorithm.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_REDUCTION)]
    reduction: Reduction,

    /// Douglas-Peucker tolerance in mesh units (half pixels).
    #[arg(long, default_value_t = GenerationConfig::DEFAULT_DOUGLAS_PEUCKER_TOLERANCE)]
    dp_tolerance: f64,

    /// Visvalingam-Whyatt doubled-area threshold in squared mesh units.
    #[arg(long, default_value_t = GenerationConfig::DEFAULT_VISVALINGAM_WHYATT_THRESHOLD)]
    vw_threshold: u64,

    /// Full generation config as a JSON string.
    ///
    /// When provided, the filter, quantization, reduction and threshold
    /// flags are ignored. The JSON must be a valid `GenerationConfig`
    /// serialization; missing fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// Write the filtered image to this PNG file (first run only).
    #[arg(long, value_name = "PATH")]
    dump_filtered: Option<PathBuf>,

    /// Write the quantized layers to this PNG file (first run only).
    #[arg(long, value_name = "PATH")]
    dump_quantization: Option<PathBuf>,

    /// Write the unreduced outlines to this SVG file (first run only).
    #[arg(long, value_name = "PATH")]
    dump_tracing: Option<PathBuf>,

    /// Write `<PREFIX>_before.svg` and `<PREFIX>_after.svg` around vertex
    /// reduction (first run only).
    #[arg(long, value_name = "PREFIX")]
    dump_reduction: Option<PathBuf>,

    /// Mark every vertex with a small square in SVG output.
    #[arg(long)]
    markers: bool,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Write the timing summary (mean and standard deviation per stage)
    /// to this file.
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

/// Pre-filter selection.
#[derive(Clone, Copy, ValueEnum)]
enum Filter {
    /// Gaussian blur.
    Gaussian,
    /// Edge-preserving bilateral filter.
    Bilateral,
    /// 3×3 median filter.
    Median,
    /// Edge-preserving Kuwahara filter.
    Kuwahara,
}

/// Quantization metric selection.
#[derive(Clone, Copy, ValueEnum)]
enum Quantization {
    /// Euclidean distance on raw sRGB channels.
    EuclideanSrgb,
    /// Euclidean distance on linearized sRGB.
    EuclideanLinear,
    /// CIE 1976 ΔE.
    Cie76,
    /// CIE 1994 ΔE.
    Cie94,
    /// CIEDE2000 ΔE.
    Ciede2000,
}

/// Vertex reduction selection.
#[derive(Clone, Copy, ValueEnum)]
enum Reduction {
    /// Keep every traced vertex.
    None,
    /// Douglas-Peucker.
    DouglasPeucker,
    /// Visvalingam-Whyatt.
    VisvalingamWhyatt,
}

/// Maps a [`QuantizationMethod`] to the local CLI [`Quantization`] enum.
const fn quantization_from_pipeline(m: QuantizationMethod) -> Quantization {
    match m {
        QuantizationMethod::EuclideanSrgb => Quantization::EuclideanSrgb,
        QuantizationMethod::EuclideanLinear => Quantization::EuclideanLinear,
        QuantizationMethod::Cie76 => Quantization::Cie76,
        QuantizationMethod::Cie94 => Quantization::Cie94,
        QuantizationMethod::Ciede2000 => Quantization::Ciede2000,
    }
}

/// Maps a [`ReductionMethod`] to the local CLI [`Reduction`] enum.
const fn reduction_from_pipeline(m: ReductionMethod) -> Reduction {
    match m {
        ReductionMethod::None => Reduction::None,
        ReductionMethod::DouglasPeucker => Reduction::DouglasPeucker,
        ReductionMethod::VisvalingamWhyatt => Reduction::VisvalingamWhyatt,
    }
}

/// CLI defaults, derived from the [`GenerationConfig`] constants so the
/// two cannot silently diverge.
const CLI_DEFAULT_QUANTIZATION: Quantization =
    quantization_from_pipeline(GenerationConfig::DEFAULT_QUANTIZATION_METHOD);
const CLI_DEFAULT_REDUCTION: Reduction =
    reduction_from_pipeline(GenerationConfig::DEFAULT_REDUCTION_METHOD);

/// Errors surfaced by the command-line tool.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("error parsing --config-json: {0}")]
    ConfigJson(serde_json::Error),

    #[error("error serializing generation config: {0}")]
    ConfigMetadata(serde_json::Error),

    #[error("error serializing diagnostics: {0}")]
    Diagnostics(serde_json::Error),

    #[error("couldn't load image {}: {source}", path.display())]
    ReadImage {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error(
        "unsupported channel count: {} has {channels} channels at {bits} bits per pixel, expected 8-bit RGB (3 channels)",
        path.display()
    )]
    UnsupportedImage {
        path: PathBuf,
        channels: u8,
        bits: u16,
    },

    #[error("couldn't write image {}: {source}", path.display())]
    WriteImage {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("couldn't write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Build a [`GenerationConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual parameter flags are ignored. Otherwise, a config is
/// assembled from the individual flags.
fn config_from_cli(cli: &Cli) -> Result<GenerationConfig, CliError> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(CliError::ConfigJson);
    }

    Ok(GenerationConfig {
        filters: cli
            .filters
            .iter()
            .map(|f| match f {
                Filter::Gaussian => FilterKind::GaussianBlur,
                Filter::Bilateral => FilterKind::BilateralFilter,
                Filter::Median => FilterKind::MedianFilter,
                Filter::Kuwahara => FilterKind::KuwaharaFilter,
            })
            .collect(),
        quantization_method: match cli.quantization {
            Quantization::EuclideanSrgb => QuantizationMethod::EuclideanSrgb,
            Quantization::EuclideanLinear => QuantizationMethod::EuclideanLinear,
            Quantization::Cie76 => QuantizationMethod::Cie76,
            Quantization::Cie94 => QuantizationMethod::Cie94,
            Quantization::Ciede2000 => QuantizationMethod::Ciede2000,
        },
        reduction_method: match cli.reduction {
            Reduction::None => ReductionMethod::None,
            Reduction::DouglasPeucker => ReductionMethod::DouglasPeucker,
            Reduction::VisvalingamWhyatt => ReductionMethod::VisvalingamWhyatt,
        },
        douglas_peucker_tolerance: cli.dp_tolerance,
        visvalingam_whyatt_threshold: cli.vw_threshold,
        ..GenerationConfig::default()
    })
}

/// The config as embedded in SVG metadata; it parses back through
/// `--config-json`.
fn config_metadata(config: &GenerationConfig) -> Result<String, CliError> {
    serde_json::to_string(config).map_err(CliError::ConfigMetadata)
}

/// Load `path` as an 8-bit RGB buffer, rejecting every other layout.
fn load_rgb(path: &Path) -> Result<RgbImage, CliError> {
    let decoded = image::open(path).map_err(|source| CliError::ReadImage {
        path: path.to_path_buf(),
        source,
    })?;
    match decoded {
        DynamicImage::ImageRgb8(rgb) => Ok(rgb),
        other => Err(CliError::UnsupportedImage {
            path: path.to_path_buf(),
            channels: other.color().channel_count(),
            bits: other.color().bits_per_pixel(),
        }),
    }
}

/// Shared inputs for every SVG the tool writes.
struct SvgContext<'a> {
    layer_colors: &'a [Color],
    dimensions: Dimensions,
    title: &'a str,
    config_json: Option<&'a str>,
    markers: bool,
}

impl SvgContext<'_> {
    fn write(&self, path: &Path, result: &TracingResult) -> Result<(), CliError> {
        let options = SvgOptions {
            title: Some(self.title),
            description: None,
            config_json: self.config_json,
            markers: self.markers,
        };
        let svg = photogeo_export::to_svg(result, self.layer_colors, self.dimensions, &options);
        std::fs::write(path, &svg).map_err(|source| CliError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!("SVG written to {} ({} bytes)", path.display(), svg.len());
        Ok(())
    }
}

/// `<prefix><suffix>`, keeping the prefix's directory.
fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(prefix.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Write every requested intermediate of a run.
fn write_dumps(cli: &Cli, svg: &SvgContext<'_>, staged: &StagedResult) -> Result<(), CliError> {
    if let Some(ref path) = cli.dump_filtered {
        staged
            .filtered
            .pixels()
            .save(path)
            .map_err(|source| CliError::WriteImage {
                path: path.clone(),
                source,
            })?;
        info!("Filtered image written to {}", path.display());
    }

    if let Some(ref path) = cli.dump_quantization {
        photogeo_export::render_quantization(&staged.quantization, svg.layer_colors)
            .save(path)
            .map_err(|source| CliError::WriteImage {
                path: path.clone(),
                source,
            })?;
        info!("Quantization written to {}", path.display());
    }

    if let Some(ref path) = cli.dump_tracing {
        svg.write(path, &staged.traced)?;
    }

    if let Some(ref prefix) = cli.dump_reduction {
        svg.write(&with_suffix(prefix, "_before.svg"), &staged.traced)?;
        svg.write(&with_suffix(prefix, "_after.svg"), &staged.reduced)?;
    }

    Ok(())
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let config = config_from_cli(cli)?;
    let pixels = load_rgb(&cli.input)?;
    let image = Image::new(pixels, cli.background.clone(), cli.foreground.clone())?;

    info!(
        "Image: {} ({}x{})",
        cli.input.display(),
        image.dimensions().width,
        image.dimensions().height,
    );
    info!("Config: {config:?}");
    info!("Runs: {}", cli.runs);

    let config_json = config_metadata(&config)?;
    let title = cli
        .input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("photogeo");
    let svg = SvgContext {
        layer_colors: &cli.foreground,
        dimensions: image.dimensions(),
        title,
        config_json: Some(&config_json),
        markers: cli.markers,
    };

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            info!("Run {}/{}", run + 1, cli.runs);
        }

        let (staged, diagnostics) = run_staged_with_diagnostics(image.clone(), &config, &StdClock)?;
        print_diagnostics(&diagnostics, cli.json)?;

        // Write outputs on the first run only.
        if run == 0 {
            write_dumps(cli, &svg, &staged)?;
            svg.write(&cli.output, &staged.reduced)?;
        }

        all_diagnostics.push(diagnostics);
    }

    let Some(summary) = RunSummary::from_diagnostics(&all_diagnostics) else {
        warn!("no diagnostics to summarize");
        return Ok(());
    };

    if cli.runs > 1 {
        println!();
        println!("{}", summary.report());
    }

    if let Some(ref path) = cli.log_file {
        std::fs::write(path, summary.report() + "\n").map_err(|source| CliError::Write {
            path: path.clone(),
            source,
        })?;
        info!("Timing summary written to {}", path.display());
    }

    Ok(())
}

/// Print one run's diagnostics as JSON or as the human-readable report.
fn print_diagnostics(diagnostics: &PipelineDiagnostics, json: bool) -> Result<(), CliError> {
    if json {
        let json = serde_json::to_string_pretty(diagnostics).map_err(CliError::Diagnostics)?;
        println!("{json}");
    } else {
        println!("{}", diagnostics.report());
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("photogeo").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_match_generation_config() {
        let cli = parse(&["in.png", "out.svg", "-f", "0:0:0"]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config, GenerationConfig::default());
    }

    #[test]
    fn repeated_flags_keep_order() {
        let cli = parse(&[
            "in.png",
            "out.svg",
            "-b",
            "255:255:255",
            "-f",
            "255:0:0",
            "--foreground",
            "0:0:255",
            "--filter",
            "median",
            "--filter",
            "gaussian",
        ]);
        assert_eq!(cli.background, vec![Color::new(255, 255, 255)]);
        assert_eq!(cli.foreground, vec![Color::new(255, 0, 0), Color::new(0, 0, 255)]);

        let config = config_from_cli(&cli).unwrap();
        assert_eq!(
            config.filters,
            vec![FilterKind::MedianFilter, FilterKind::GaussianBlur]
        );
    }

    #[test]
    fn method_flags_map_to_config() {
        let cli = parse(&[
            "in.png",
            "out.svg",
            "--quantization",
            "ciede2000",
            "--reduction",
            "visvalingam-whyatt",
            "--vw-threshold",
            "12",
            "--dp-tolerance",
            "0.5",
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.quantization_method, QuantizationMethod::Ciede2000);
        assert_eq!(config.reduction_method, ReductionMethod::VisvalingamWhyatt);
        assert_eq!(config.visvalingam_whyatt_threshold, 12);
        assert!((config.douglas_peucker_tolerance - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn config_json_overrides_flags() {
        let cli = parse(&[
            "in.png",
            "out.svg",
            "--reduction",
            "visvalingam-whyatt",
            "--config-json",
            r#"{"reduction_method":"DouglasPeucker"}"#,
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.reduction_method, ReductionMethod::DouglasPeucker);
        assert_eq!(
            config.quantization_method,
            GenerationConfig::DEFAULT_QUANTIZATION_METHOD
        );
    }

    #[test]
    fn embedded_config_json_round_trips() {
        let cli = parse(&["in.png", "out.svg", "--reduction", "douglas-peucker"]);
        let config = config_from_cli(&cli).unwrap();
        let json = config_metadata(&config).unwrap();

        let again = parse(&["in.png", "out.svg", "--config-json", &json]);
        assert_eq!(config_from_cli(&again).unwrap(), config);
    }

    #[test]
    fn invalid_config_json_is_an_error() {
        let cli = parse(&["in.png", "out.svg", "--config-json", "{"]);
        assert!(matches!(config_from_cli(&cli), Err(CliError::ConfigJson(_))));
    }

    #[test]
    fn bad_color_is_rejected_by_parser() {
        let result = Cli::try_parse_from(["photogeo", "in.png", "out.svg", "-f", "1:2"]);
        assert!(result.is_err());
    }

    #[test]
    fn zero_runs_is_rejected_by_parser() {
        let result = Cli::try_parse_from(["photogeo", "in.png", "out.svg", "--runs", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn reduction_prefix_gets_suffixes() {
        let path = with_suffix(Path::new("out/stage"), "_before.svg");
        assert_eq!(path, PathBuf::from("out/stage_before.svg"));
    }

    #[test]
    fn missing_input_is_a_read_error() {
        let result = load_rgb(Path::new("definitely/not/here.png"));
        assert!(matches!(result, Err(CliError::ReadImage { .. })));
    }
}
