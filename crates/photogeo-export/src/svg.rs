//! SVG export serializer.
//!
//! Converts a [`TracingResult`] into an SVG string using the [`svg`]
//! crate for document construction, XML escaping, and path data
//! formatting.
//!
//! The document is sized in mesh space (twice the image's pixel
//! dimensions), so vertices are emitted unscaled. Each layer becomes a
//! `<g id="layerN">` group and each outline a closed `<path>` stroked in
//! the layer's color.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Description, Element, Group, Path, Rectangle, Title};
use svg::node::{Node, Text, Value};

use photogeo_pipeline::{Color, Dimensions, Outline, TracingResult, Vertex};

/// Stroke width of outline paths, in mesh units (one pixel).
const STROKE_WIDTH: u32 = 2;

/// Side length of vertex marker squares, in mesh units.
const MARKER_SIZE: u32 = 4;

/// Color used for layers without an entry in the color list.
const FALLBACK_COLOR: Color = Color::new(0, 0, 0);

/// Options for the SVG document.
///
/// Text values are XML-escaped automatically by the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgOptions<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the source image filename (without extension).
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Serialized generation config, emitted inside a `<metadata>`
    /// element wrapped in a namespaced `<photogeo:config>` element.
    pub config_json: Option<&'a str>,

    /// Draw a small filled square centred on every vertex.
    pub markers: bool,
}

/// Build an SVG path `d` attribute string from a closed outline.
///
/// Uses `M` for the first vertex, `L` for the rest and closes with `z`;
/// the outline's closing duplicate is implied by `z` rather than
/// repeated. Returns an empty string for outlines with fewer than two
/// distinct vertices.
///
/// # Examples
///
/// ```
/// use photogeo_pipeline::{Outline, Vertex};
/// use photogeo_export::build_path_data;
///
/// let outline = Outline::new(vec![
///     Vertex::new(0, 1),
///     Vertex::new(1, 0),
///     Vertex::new(2, 1),
///     Vertex::new(1, 2),
///     Vertex::new(0, 1),
/// ]);
/// assert_eq!(build_path_data(&outline), "M0,1 L1,0 L2,1 L1,2 z");
/// ```
#[must_use]
pub fn build_path_data(outline: &Outline) -> String {
    let vertices = outline.vertices();
    let open = if outline.is_closed() {
        &vertices[..vertices.len() - 1]
    } else {
        vertices
    };
    if open.len() < 2 {
        return String::new();
    }

    let point = |v: &Vertex| (f64::from(v.x), f64::from(v.y));

    let mut data = Data::new().move_to(point(&open[0]));
    for v in &open[1..] {
        data = data.line_to(point(v));
    }
    String::from(Value::from(data.close()))
}

/// CSS `rgb()` color string.
fn css_color(color: Color) -> String {
    format!("rgb({},{},{})", color.r, color.g, color.b)
}

/// Serialize a tracing result into an SVG document string.
///
/// `layer_colors[i]` strokes layer `i`; missing entries fall back to
/// black. Empty layers still produce an (empty) group so group ids
/// always match layer indices.
#[must_use]
pub fn to_svg(
    result: &TracingResult,
    layer_colors: &[Color],
    dimensions: Dimensions,
    options: &SvgOptions<'_>,
) -> String {
    let w = dimensions.width * 2;
    let h = dimensions.height * 2;
    let mut doc = Document::new()
        .set("width", w)
        .set("height", h)
        .set("viewBox", (0, 0, w, h));

    // Optional <title> element
    if let Some(title) = options.title {
        doc = doc.add(Title::new(title));
    }

    // Optional <desc> element
    if let Some(description) = options.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    // Optional <metadata> element with the structured generation config
    if let Some(config_json) = options.config_json {
        let mut config_el = Element::new("photogeo:config");
        config_el.assign("xmlns:photogeo", "https://photogeo.dev/ns/1");
        config_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(config_el);
        doc = doc.add(metadata_el);
    }

    for (index, outlines) in result.layers().iter().enumerate() {
        let color = css_color(layer_colors.get(index).copied().unwrap_or(FALLBACK_COLOR));
        let mut group = Group::new().set("id", format!("layer{index}"));

        for outline in outlines {
            let d = build_path_data(outline);
            if d.is_empty() {
                continue;
            }
            let path = Path::new()
                .set("d", d)
                .set("fill", "none")
                .set("stroke", color.as_str())
                .set("stroke-width", STROKE_WIDTH);
            group = group.add(path);

            if options.markers {
                for v in outline.vertices() {
                    let marker = Rectangle::new()
                        .set("x", i64::from(v.x) - i64::from(MARKER_SIZE / 2))
                        .set("y", i64::from(v.y) - i64::from(MARKER_SIZE / 2))
                        .set("width", MARKER_SIZE)
                        .set("height", MARKER_SIZE)
                        .set("fill", color.as_str());
                    group = group.add(marker);
                }
            }
        }
        doc = doc.add(group);
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    fn diamond() -> Outline {
        Outline::new(vec![
            Vertex::new(0, 1),
            Vertex::new(1, 0),
            Vertex::new(2, 1),
            Vertex::new(1, 2),
            Vertex::new(0, 1),
        ])
    }

    // --- build_path_data ---

    #[test]
    fn build_path_data_empty_outline() {
        assert_eq!(build_path_data(&Outline::new(vec![])), "");
    }

    #[test]
    fn build_path_data_closed_segment_is_kept() {
        let outline = Outline::new(vec![Vertex::new(0, 0), Vertex::new(4, 0), Vertex::new(0, 0)]);
        assert_eq!(build_path_data(&outline), "M0,0 L4,0 z");
    }

    #[test]
    fn build_path_data_single_vertex_loop_is_skipped() {
        let outline = Outline::new(vec![Vertex::new(3, 3), Vertex::new(3, 3)]);
        assert_eq!(build_path_data(&outline), "");
    }

    #[test]
    fn build_path_data_drops_closing_duplicate() {
        assert_eq!(build_path_data(&diamond()), "M0,1 L1,0 L2,1 L1,2 z");
    }

    // --- Document structure ---

    #[test]
    fn empty_result_produces_valid_svg_in_mesh_space() {
        let svg = to_svg(&TracingResult::default(), &[], dims(100, 50), &SvgOptions::default());
        assert!(svg.contains(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(svg.contains(r#"width="200""#));
        assert!(svg.contains(r#"height="100""#));
        assert!(svg.contains(r#"viewBox="0 0 200 100""#));
        assert!(!svg.contains("<path"));
    }

    #[test]
    fn one_group_per_layer_including_empty_ones() {
        let result = TracingResult::new(vec![vec![diamond()], vec![], vec![diamond()]]);
        let svg = to_svg(&result, &[], dims(4, 4), &SvgOptions::default());
        assert!(svg.contains(r#"id="layer0""#));
        assert!(svg.contains(r#"id="layer1""#));
        assert!(svg.contains(r#"id="layer2""#));
        assert_eq!(svg.matches("<path").count(), 2);
    }

    #[test]
    fn paths_are_stroked_in_layer_color() {
        let result = TracingResult::new(vec![vec![diamond()], vec![diamond()]]);
        let colors = [Color::new(255, 0, 0), Color::new(0, 128, 255)];
        let svg = to_svg(&result, &colors, dims(4, 4), &SvgOptions::default());
        assert!(svg.contains(r#"stroke="rgb(255,0,0)""#));
        assert!(svg.contains(r#"stroke="rgb(0,128,255)""#));
        assert!(svg.contains(r#"fill="none""#));
        assert!(svg.contains(r#"stroke-width="2""#));
        assert!(svg.contains(r#"d="M0,1 L1,0 L2,1 L1,2 z""#));
    }

    #[test]
    fn missing_layer_color_falls_back_to_black() {
        let result = TracingResult::new(vec![vec![diamond()]]);
        let svg = to_svg(&result, &[], dims(4, 4), &SvgOptions::default());
        assert!(svg.contains(r#"stroke="rgb(0,0,0)""#));
    }

    #[test]
    fn markers_add_one_rect_per_vertex() {
        let result = TracingResult::new(vec![vec![diamond()]]);
        let options = SvgOptions {
            markers: true,
            ..SvgOptions::default()
        };
        let svg = to_svg(&result, &[], dims(4, 4), &options);
        assert_eq!(svg.matches("<rect").count(), 5);
        assert!(svg.contains(r#"x="-2""#));
        assert!(svg.contains(r#"width="4""#));
    }

    #[test]
    fn no_markers_by_default() {
        let result = TracingResult::new(vec![vec![diamond()]]);
        let svg = to_svg(&result, &[], dims(4, 4), &SvgOptions::default());
        assert!(!svg.contains("<rect"));
    }

    // --- Metadata ---

    #[test]
    fn title_and_description_are_escaped() {
        let options = SvgOptions {
            title: Some("a < b"),
            description: Some("x & y"),
            ..SvgOptions::default()
        };
        let svg = to_svg(&TracingResult::default(), &[], dims(1, 1), &options);
        assert!(svg.contains("<title>a &lt; b</title>"));
        assert!(svg.contains("x &amp; y"));
    }

    #[test]
    fn config_json_is_embedded_in_metadata() {
        let options = SvgOptions {
            config_json: Some(r#"{"reduction_method":"None"}"#),
            ..SvgOptions::default()
        };
        let svg = to_svg(&TracingResult::default(), &[], dims(1, 1), &options);
        assert!(svg.contains("<metadata>"));
        assert!(svg.contains("photogeo:config"));
        assert!(svg.contains("reduction_method"));
    }
}
