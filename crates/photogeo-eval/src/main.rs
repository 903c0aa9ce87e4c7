//! photogeo-eval: measure how faithfully outlines reproduce an image.
//!
//! `rasterize` fills the outlines of an SVG written by `photogeo` back
//! into a PNG and can record the document's vertex count. `compare`
//! reports the share of identical pixels between two RGB images.
//! Rasterizing a reduced SVG and comparing it with the
//! `--dump-quantization` image of the same run shows what vertex
//! reduction cost, next to how many vertices it saved.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin photogeo-eval -- rasterize [OPTIONS] <INPUT> <OUTPUT>
//! cargo run --release --bin photogeo-eval -- compare [OPTIONS] <FIRST> <SECOND>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod compare;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use image::DynamicImage;
use log::info;
use photogeo_export::ReadSvgError;
use photogeo_pipeline::RgbImage;

/// Evaluate photogeo output against raster images.
#[derive(Parser)]
#[command(name = "photogeo-eval", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fill the outlines of an SVG into a PNG.
    Rasterize(RasterizeArgs),
    /// Print the percentage of identical pixels between two images.
    Compare(CompareArgs),
}

#[derive(Args)]
struct RasterizeArgs {
    /// SVG written by `photogeo`.
    input: PathBuf,

    /// Path of the PNG file to write.
    output: PathBuf,

    /// Integer factor applied to the output size.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..=64))]
    scale: u32,

    /// Write the total vertex count of the SVG to this file.
    #[arg(long, value_name = "PATH")]
    vertex_count: Option<PathBuf>,
}

#[derive(Args)]
struct CompareArgs {
    /// First image (8-bit RGB).
    first: PathBuf,

    /// Second image (8-bit RGB), same size as the first.
    second: PathBuf,

    /// Write a `[FIRST - SECOND] : N%` line to this file.
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

/// Errors surfaced by the evaluation tool.
#[derive(Debug, thiserror::Error)]
enum EvalError {
    #[error("couldn't read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("couldn't parse SVG {}: {source}", path.display())]
    Svg {
        path: PathBuf,
        source: ReadSvgError,
    },

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

    #[error("images have different dimensions: {}x{} and {}x{}", first.0, first.1, second.0, second.1)]
    SizeMismatch { first: (u32, u32), second: (u32, u32) },

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
}

/// Load `path` as an 8-bit RGB buffer, rejecting every other layout.
fn load_rgb(path: &Path) -> Result<RgbImage, EvalError> {
    let decoded = image::open(path).map_err(|source| EvalError::ReadImage {
        path: path.to_path_buf(),
        source,
    })?;
    match decoded {
        DynamicImage::ImageRgb8(rgb) => Ok(rgb),
        other => Err(EvalError::UnsupportedImage {
            path: path.to_path_buf(),
            channels: other.color().channel_count(),
            bits: other.color().bits_per_pixel(),
        }),
    }
}

fn write_text(path: &Path, text: &str) -> Result<(), EvalError> {
    std::fs::write(path, text).map_err(|source| EvalError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn rasterize(args: &RasterizeArgs) -> Result<(), EvalError> {
    let content = std::fs::read_to_string(&args.input).map_err(|source| EvalError::Read {
        path: args.input.clone(),
        source,
    })?;
    let svg = photogeo_export::read_svg(&content).map_err(|source| EvalError::Svg {
        path: args.input.clone(),
        source,
    })?;

    let vertex_count = svg.tracing.vertex_count();
    info!(
        "{}: {} layers, {} outlines, {vertex_count} vertices",
        args.input.display(),
        svg.tracing.layer_count(),
        svg.tracing.outline_count(),
    );
    if let Some(ref path) = args.vertex_count {
        write_text(path, &vertex_count.to_string())?;
        info!("Vertex count written to {}", path.display());
    }

    let raster = photogeo_export::rasterize(&svg.tracing, &svg.layer_colors, svg.dimensions, args.scale);
    raster.save(&args.output).map_err(|source| EvalError::WriteImage {
        path: args.output.clone(),
        source,
    })?;
    info!(
        "Raster written to {} ({}x{})",
        args.output.display(),
        raster.width(),
        raster.height(),
    );
    Ok(())
}

fn compare(args: &CompareArgs) -> Result<(), EvalError> {
    let first = load_rgb(&args.first)?;
    let second = load_rgb(&args.second)?;
    let identical = compare::identical_percentage(&first, &second).ok_or_else(|| {
        EvalError::SizeMismatch {
            first: first.dimensions(),
            second: second.dimensions(),
        }
    })?;

    println!("{identical}%");
    if let Some(ref path) = args.log_file {
        let line = compare::log_line(
            &args.first.display().to_string(),
            &args.second.display().to_string(),
            identical,
        );
        write_text(path, &(line + "\n"))?;
        info!("Comparison written to {}", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Rasterize(ref args) => rasterize(args),
        Command::Compare(ref args) => compare(args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
