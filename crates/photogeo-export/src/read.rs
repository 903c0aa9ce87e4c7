//! SVG import of traced outlines.
//!
//! Reads documents shaped like [`to_svg`](crate::to_svg) output back into
//! pipeline types: every `<g>` is a layer and every `<path>` inside it
//! one outline. Only straight-line path commands are understood, and
//! coordinates are rounded to the nearest mesh unit.

use svg::node::Attributes;
use svg::node::element::path::{Command, Data, Position};
use svg::node::element::tag::Type;
use svg::parser::Event;

use photogeo_pipeline::{Color, Dimensions, Outline, TracingResult, Vertex};

/// Layer color for groups whose first path has no readable stroke.
const DEFAULT_COLOR: Color = Color::new(0, 0, 0);

/// Outlines read back from an SVG document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvgOutlines {
    /// Pixel dimensions, half the document's mesh-space size.
    pub dimensions: Dimensions,

    /// Stroke color of each layer's first path.
    pub layer_colors: Vec<Color>,

    /// One entry per `<g>`, in document order.
    pub tracing: TracingResult,
}

/// Errors from [`read_svg`].
#[derive(Debug, thiserror::Error)]
pub enum ReadSvgError {
    #[error("malformed SVG: {0}")]
    Malformed(String),

    #[error("missing or invalid `{0}` attribute on <svg>")]
    Dimension(&'static str),

    #[error("no <svg> element found")]
    MissingRoot,

    #[error("invalid path data {data:?}: {reason}")]
    PathData { data: String, reason: String },

    #[error("coordinate {0} is outside mesh space")]
    Coordinate(f64),
}

/// Parse an SVG document into per-layer outlines.
///
/// Paths outside a `<g>` are ignored. A path ending in `z` gets its first
/// vertex appended, so outlines written by [`to_svg`](crate::to_svg) come
/// back closed.
///
/// # Errors
///
/// Returns [`ReadSvgError`] if the XML is malformed, the root `<svg>`
/// lacks integral `width`/`height`, or a path uses curves or negative
/// coordinates.
pub fn read_svg(content: &str) -> Result<SvgOutlines, ReadSvgError> {
    let parser = svg::read(content).map_err(|e| ReadSvgError::Malformed(e.to_string()))?;

    let mut dimensions = None;
    let mut layers: Vec<Vec<Outline>> = Vec::new();
    let mut layer_colors: Vec<Option<Color>> = Vec::new();
    let mut in_layer = false;

    for event in parser {
        match event {
            Event::Error(e) => return Err(ReadSvgError::Malformed(e.to_string())),
            Event::Tag("svg", Type::Start | Type::Empty, attributes) => {
                dimensions = Some(read_dimensions(&attributes)?);
            }
            Event::Tag("g", Type::Start, _) => {
                layers.push(Vec::new());
                layer_colors.push(None);
                in_layer = true;
            }
            Event::Tag("g", Type::Empty, _) => {
                layers.push(Vec::new());
                layer_colors.push(None);
            }
            Event::Tag("g", Type::End, _) => in_layer = false,
            Event::Tag("path", Type::Start | Type::Empty, attributes) if in_layer => {
                let (Some(outlines), Some(color)) = (layers.last_mut(), layer_colors.last_mut())
                else {
                    continue;
                };
                if color.is_none() {
                    *color = Some(stroke_color(&attributes).unwrap_or(DEFAULT_COLOR));
                }
                if let Some(d) = attributes.get("d") {
                    let outline = parse_path_data(d)?;
                    if !outline.is_empty() {
                        outlines.push(outline);
                    }
                }
            }
            _ => {}
        }
    }

    let dimensions = dimensions.ok_or(ReadSvgError::MissingRoot)?;
    log::debug!(
        "read {} layers from SVG ({}x{})",
        layers.len(),
        dimensions.width,
        dimensions.height,
    );

    Ok(SvgOutlines {
        dimensions,
        layer_colors: layer_colors
            .into_iter()
            .map(|c| c.unwrap_or(DEFAULT_COLOR))
            .collect(),
        tracing: TracingResult::new(layers),
    })
}

fn read_dimensions(attributes: &Attributes) -> Result<Dimensions, ReadSvgError> {
    let read = |name: &'static str| -> Result<u32, ReadSvgError> {
        attributes
            .get(name)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .ok_or(ReadSvgError::Dimension(name))
    };
    Ok(Dimensions {
        width: read("width")? / 2,
        height: read("height")? / 2,
    })
}

/// Stroke color from a `stroke` attribute or a `stroke:` style property.
fn stroke_color(attributes: &Attributes) -> Option<Color> {
    if let Some(stroke) = attributes.get("stroke") {
        return parse_css_color(stroke);
    }
    let style = attributes.get("style")?;
    style
        .split(';')
        .filter_map(|declaration| declaration.split_once(':'))
        .find(|(property, _)| property.trim() == "stroke")
        .and_then(|(_, value)| parse_css_color(value))
}

/// Parse `rgb(r,g,b)` or `#rrggbb`.
fn parse_css_color(value: &str) -> Option<Color> {
    let value = value.trim();
    if let Some(body) = value.strip_prefix("rgb(").and_then(|v| v.strip_suffix(')')) {
        let mut channels = body.split(',').map(|c| c.trim().parse::<u8>().ok());
        let (r, g, b) = (channels.next()??, channels.next()??, channels.next()??);
        return channels.next().is_none().then_some(Color::new(r, g, b));
    }
    let hex = value.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| hex.get(i..i + 2).and_then(|h| u8::from_str_radix(h, 16).ok());
    Some(Color::new(channel(0)?, channel(2)?, channel(4)?))
}

/// Round a path coordinate to a mesh-space integer.
fn to_mesh(value: f64) -> Result<u32, ReadSvgError> {
    let rounded = value.round();
    if !(0.0..=f64::from(u32::MAX)).contains(&rounded) {
        return Err(ReadSvgError::Coordinate(value));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let mesh = rounded as u32;
    Ok(mesh)
}

fn mesh_vertex(x: f64, y: f64) -> Result<Vertex, ReadSvgError> {
    Ok(Vertex::new(to_mesh(x)?, to_mesh(y)?))
}

/// Convert a path `d` attribute into an outline.
fn parse_path_data(d: &str) -> Result<Outline, ReadSvgError> {
    let invalid = |reason: String| ReadSvgError::PathData {
        data: d.to_owned(),
        reason,
    };
    let data = Data::parse(d).map_err(|e| invalid(e.to_string()))?;

    let mut vertices: Vec<Vertex> = Vec::new();
    let (mut x, mut y) = (0.0f64, 0.0f64);

    for command in data.iter() {
        match command {
            Command::Move(position, parameters) | Command::Line(position, parameters) => {
                if parameters.len() % 2 != 0 {
                    return Err(invalid("odd number of coordinates".to_owned()));
                }
                for pair in parameters.chunks_exact(2) {
                    let (dx, dy) = (f64::from(pair[0]), f64::from(pair[1]));
                    (x, y) = match position {
                        Position::Absolute => (dx, dy),
                        Position::Relative => (x + dx, y + dy),
                    };
                    vertices.push(mesh_vertex(x, y)?);
                }
            }
            Command::HorizontalLine(position, parameters) => {
                for &value in parameters.iter() {
                    x = match position {
                        Position::Absolute => f64::from(value),
                        Position::Relative => x + f64::from(value),
                    };
                    vertices.push(mesh_vertex(x, y)?);
                }
            }
            Command::VerticalLine(position, parameters) => {
                for &value in parameters.iter() {
                    y = match position {
                        Position::Absolute => f64::from(value),
                        Position::Relative => y + f64::from(value),
                    };
                    vertices.push(mesh_vertex(x, y)?);
                }
            }
            Command::Close => {
                if let Some(&first) = vertices.first() {
                    vertices.push(first);
                    (x, y) = (f64::from(first.x), f64::from(first.y));
                }
            }
            _ => return Err(invalid("only straight-line commands are supported".to_owned())),
        }
    }

    Ok(Outline::new(vertices))
}
