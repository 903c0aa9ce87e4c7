//! Shared types for the photogeo pipeline.

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::contour::TracingMethod;
use crate::filter::FilterKind;
use crate::quantize::QuantizationMethod;
use crate::reduce::{ReductionMethod, ReductionThresholds};

/// Re-export `RgbImage` so downstream crates can build and inspect
/// pixel buffers without depending on `image` directly.
pub use image::RgbImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total number of pixels (`width * height`).
    #[must_use]
    pub const fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// A source image together with the palette it is quantized against.
///
/// Background colors are always evaluated before layer colors, so a
/// background entry wins any tie against a layer entry. Every layer
/// color produces one output layer.
///
/// The constructors reject zero-sized images, mismatched pixel buffers
/// and palettes without layers, so every later stage can rely on those
/// invariants.
#[derive(Debug, Clone)]
pub struct Image {
    pixels: RgbImage,
    background_colors: Vec<Color>,
    layer_colors: Vec<Color>,
}

impl Image {
    /// Wrap an RGB pixel buffer and its palette.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ZeroDimensions`] if the image has no
    /// pixels and [`PipelineError::NoLayers`] if `layer_colors` is empty.
    pub fn new(
        pixels: RgbImage,
        background_colors: Vec<Color>,
        layer_colors: Vec<Color>,
    ) -> Result<Self, PipelineError> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(PipelineError::ZeroDimensions);
        }
        if layer_colors.is_empty() {
            return Err(PipelineError::NoLayers);
        }
        Ok(Self {
            pixels,
            background_colors,
            layer_colors,
        })
    }

    /// Build an image from a row-major slice of colors.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DimensionMismatch`] if `colors` does not
    /// hold exactly `width * height` entries, plus every error of
    /// [`Image::new`].
    pub fn from_colors(
        dimensions: Dimensions,
        colors: &[Color],
        background_colors: Vec<Color>,
        layer_colors: Vec<Color>,
    ) -> Result<Self, PipelineError> {
        if colors.len() != dimensions.pixel_count() {
            return Err(PipelineError::DimensionMismatch {
                expected: dimensions.pixel_count(),
                actual: colors.len(),
            });
        }
        let raw = colors.iter().flat_map(|c| c.channels()).collect();
        let pixels = RgbImage::from_raw(dimensions.width, dimensions.height, raw).ok_or(
            PipelineError::DimensionMismatch {
                expected: dimensions.pixel_count(),
                actual: colors.len(),
            },
        )?;
        Self::new(pixels, background_colors, layer_colors)
    }

    /// Image dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.pixels.width(),
            height: self.pixels.height(),
        }
    }

    /// The pixel buffer.
    #[must_use]
    pub const fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Mutable access to the pixel buffer, used by the pre-filter.
    ///
    /// The buffer's dimensions cannot change through this reference.
    pub const fn pixels_mut(&mut self) -> &mut RgbImage {
        &mut self.pixels
    }

    /// The color of the pixel at `(x, y)`.
    #[must_use]
    pub fn color_at(&self, x: u32, y: u32) -> Color {
        Color::from(*self.pixels.get_pixel(x, y))
    }

    /// Background colors, in evaluation order.
    #[must_use]
    pub fn background_colors(&self) -> &[Color] {
        &self.background_colors
    }

    /// Layer (foreground) colors, in evaluation order.
    #[must_use]
    pub fn layer_colors(&self) -> &[Color] {
        &self.layer_colors
    }

    /// Number of output layers.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layer_colors.len()
    }

    /// The full comparison palette: background colors, then layer colors.
    pub fn palette(&self) -> impl Iterator<Item = Color> + '_ {
        self.background_colors
            .iter()
            .chain(&self.layer_colors)
            .copied()
    }
}

/// A binary per-pixel mask, row-major.
///
/// Lookups outside the mask read as inactive, which pads the mask with
/// a one-cell inactive border for contour tracing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    dimensions: Dimensions,
    cells: Vec<bool>,
}

impl Mask {
    /// Allocate an all-inactive mask.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Allocation`] if the cell buffer cannot be
    /// allocated.
    pub fn inactive(dimensions: Dimensions) -> Result<Self, PipelineError> {
        let len = dimensions.pixel_count();
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(len)
            .map_err(|e| PipelineError::Allocation(format!("{len}-cell mask: {e}")))?;
        cells.resize(len, false);
        Ok(Self { dimensions, cells })
    }

    /// Build a mask by evaluating `f(x, y)` for every cell.
    #[must_use]
    pub fn from_fn(dimensions: Dimensions, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let cells = (0..dimensions.height)
            .flat_map(|y| (0..dimensions.width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        Self { dimensions, cells }
    }

    /// Mask dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Whether the cell at `(x, y)` is active. Out-of-range cells are
    /// inactive.
    #[must_use]
    pub fn get(&self, x: i64, y: i64) -> bool {
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return false;
        };
        if x >= self.dimensions.width || y >= self.dimensions.height {
            return false;
        }
        self.cells[self.index(x, y)]
    }

    /// Set the cell at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the mask.
    pub fn set(&mut self, x: u32, y: u32, active: bool) {
        assert!(
            x < self.dimensions.width && y < self.dimensions.height,
            "mask cell ({x}, {y}) out of range",
        );
        let index = self.index(x, y);
        self.cells[index] = active;
    }

    /// Row-major cell values.
    #[must_use]
    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    /// Number of active cells.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    const fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.dimensions.width as usize + x as usize
    }
}

/// One mask per layer color, produced by [`crate::quantize::quantize`].
///
/// At every pixel at most one mask is active: the layer whose color was
/// nearest, or none when a background color was nearest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizationResult {
    dimensions: Dimensions,
    layers: Vec<Mask>,
}

impl QuantizationResult {
    /// Assemble a result from per-layer masks of equal dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoLayers`] for an empty layer list and
    /// [`PipelineError::DimensionMismatch`] if any mask's cell count
    /// differs from `dimensions`.
    pub fn new(dimensions: Dimensions, layers: Vec<Mask>) -> Result<Self, PipelineError> {
        if layers.is_empty() {
            return Err(PipelineError::NoLayers);
        }
        if let Some(mask) = layers.iter().find(|m| m.dimensions != dimensions) {
            return Err(PipelineError::DimensionMismatch {
                expected: dimensions.pixel_count(),
                actual: mask.dimensions.pixel_count(),
            });
        }
        Ok(Self { dimensions, layers })
    }

    /// Dimensions shared by every mask.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Number of layers.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// The mask for `layer`, if it exists.
    #[must_use]
    pub fn layer(&self, layer: usize) -> Option<&Mask> {
        self.layers.get(layer)
    }

    /// All layer masks in layer order.
    #[must_use]
    pub fn layers(&self) -> &[Mask] {
        &self.layers
    }

    /// Total active pixels across all layers.
    #[must_use]
    pub fn active_pixel_count(&self) -> usize {
        self.layers.iter().map(Mask::active_count).sum()
    }
}

/// A vertex in mesh space: pixel coordinates scaled by two, so contour
/// vertices can sit on the boundary between two pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vertex {
    /// Horizontal mesh coordinate (right positive).
    pub x: u32,
    /// Vertical mesh coordinate (down positive).
    pub y: u32,
}

impl Vertex {
    /// Create a new vertex.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// A closed loop of vertices. The last vertex repeats the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline(Vec<Vertex>);

impl Outline {
    /// Create an outline from its vertices, closing duplicate included.
    #[must_use]
    pub const fn new(vertices: Vec<Vertex>) -> Self {
        Self(vertices)
    }

    /// Number of vertices, closing duplicate included.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the outline has no vertices.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a slice of all vertices.
    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.0
    }

    /// Returns `true` if the first and last vertices coincide.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        !self.0.is_empty() && self.0.first() == self.0.last()
    }

    /// Whether the loop still encloses area: at least three distinct
    /// vertices, i.e. four entries including the closing duplicate.
    #[must_use]
    pub const fn is_polygon(&self) -> bool {
        self.0.len() >= 4
    }

    pub(crate) const fn vertices_mut(&mut self) -> &mut Vec<Vertex> {
        &mut self.0
    }
}

/// Outlines for every layer, produced by contour tracing and optionally
/// simplified in place by vertex reduction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracingResult {
    layers: Vec<Vec<Outline>>,
}

impl TracingResult {
    /// Create a result from per-layer outlines.
    #[must_use]
    pub const fn new(layers: Vec<Vec<Outline>>) -> Self {
        Self { layers }
    }

    /// Number of layers.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Outlines of `layer`; empty if the layer does not exist.
    #[must_use]
    pub fn outlines(&self, layer: usize) -> &[Outline] {
        self.layers.get(layer).map_or(&[], Vec::as_slice)
    }

    /// All layers in layer order.
    #[must_use]
    pub fn layers(&self) -> &[Vec<Outline>] {
        &self.layers
    }

    /// Total number of outlines across all layers.
    #[must_use]
    pub fn outline_count(&self) -> usize {
        self.layers.iter().map(Vec::len).sum()
    }

    /// Total number of vertices across all outlines.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.layers.iter().flatten().map(Outline::len).sum()
    }

    pub(crate) fn layers_mut(&mut self) -> &mut [Vec<Outline>] {
        &mut self.layers
    }
}

/// Configuration for a full generation run.
///
/// Every field has a default; see the `DEFAULT_*` constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Pre-filters applied to the image, in order, before quantization.
    pub filters: Vec<FilterKind>,

    /// Which color distance metric the quantizer uses.
    pub quantization_method: QuantizationMethod,

    /// Which contour tracing algorithm to use.
    pub tracing_method: TracingMethod,

    /// Which vertex reduction algorithm to use.
    pub reduction_method: ReductionMethod,

    /// Douglas-Peucker tolerance in mesh units. Points closer than this
    /// to their chain's segment are removed.
    pub douglas_peucker_tolerance: f64,

    /// Visvalingam-Whyatt threshold on the doubled triangle area, in
    /// squared mesh units. Vertices at or below it are removed.
    pub visvalingam_whyatt_threshold: u64,
}

impl GenerationConfig {
    /// Default quantization metric.
    pub const DEFAULT_QUANTIZATION_METHOD: QuantizationMethod = QuantizationMethod::EuclideanLinear;
    /// Default reduction method.
    pub const DEFAULT_REDUCTION_METHOD: ReductionMethod = ReductionMethod::None;
    /// Default Douglas-Peucker tolerance (one pixel).
    pub const DEFAULT_DOUGLAS_PEUCKER_TOLERANCE: f64 = 2.0;
    /// Default Visvalingam-Whyatt doubled-area threshold.
    pub const DEFAULT_VISVALINGAM_WHYATT_THRESHOLD: u64 = 20 * 2;

    /// Check the parameters that cannot be enforced by their types.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the Douglas-Peucker
    /// tolerance is negative or not finite.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let tolerance = self.douglas_peucker_tolerance;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "douglas_peucker_tolerance must be finite and non-negative, got {tolerance}",
            )));
        }
        Ok(())
    }

    /// The reduction thresholds carried by this config.
    #[must_use]
    pub const fn thresholds(&self) -> ReductionThresholds {
        ReductionThresholds {
            douglas_peucker_tolerance: self.douglas_peucker_tolerance,
            visvalingam_whyatt_threshold: self.visvalingam_whyatt_threshold,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            quantization_method: Self::DEFAULT_QUANTIZATION_METHOD,
            tracing_method: TracingMethod::default(),
            reduction_method: Self::DEFAULT_REDUCTION_METHOD,
            douglas_peucker_tolerance: Self::DEFAULT_DOUGLAS_PEUCKER_TOLERANCE,
            visvalingam_whyatt_threshold: Self::DEFAULT_VISVALINGAM_WHYATT_THRESHOLD,
        }
    }
}

/// Errors that can occur during pipeline processing.
///
/// Degenerate geometry (empty layers, outlines removed by reduction) is
/// not an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum PipelineError {
    /// The image has zero width or height.
    #[error("image dimensions must be non-zero")]
    ZeroDimensions,

    /// A pixel or mask buffer does not match the stated dimensions.
    #[error("buffer holds {actual} pixels but the dimensions require {expected}")]
    DimensionMismatch {
        /// Pixel count implied by the dimensions.
        expected: usize,
        /// Pixel count actually supplied.
        actual: usize,
    },

    /// The palette has no layer colors, so there is nothing to trace.
    #[error("at least one layer color is required")]
    NoLayers,

    /// Generation configuration is invalid.
    #[error("invalid generation configuration: {0}")]
    InvalidConfig(String),

    /// A buffer for a stage's output could not be allocated.
    #[error("failed to allocate {0}")]
    Allocation(String),
}
