//! photogeo-export: Pure format serializers (sans-IO)
//!
//! Converts pipeline output into inspectable formats: SVG for traced and
//! reduced outlines, and RGB rasters for quantization masks and filled
//! outlines. SVG documents written here can be read back with
//! [`read_svg`] for evaluation.

pub mod raster;
pub mod read;
pub mod svg;

pub use raster::{rasterize, render_quantization};
pub use read::{ReadSvgError, SvgOutlines, read_svg};
pub use svg::{SvgOptions, build_path_data, to_svg};
