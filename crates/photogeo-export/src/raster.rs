//! Raster rendering of quantization masks and traced outlines.
//!
//! [`render_quantization`] paints every active mask cell in its layer
//! color over a white background, producing a preview of what the
//! quantizer saw. [`rasterize`] fills traced outlines back into pixels,
//! so a reduced result can be compared against that preview. In both,
//! later layers paint over earlier ones.

use photogeo_pipeline::{Color, Dimensions, QuantizationResult, RgbImage, TracingResult, Vertex};

/// Background for pixels no layer claims.
const BACKGROUND: Color = Color::new(255, 255, 255);

/// Render the layer masks as an RGB image.
///
/// `layer_colors[i]` paints layer `i`; layers without a color are
/// skipped.
#[must_use]
pub fn render_quantization(quantization: &QuantizationResult, layer_colors: &[Color]) -> RgbImage {
    let dims = quantization.dimensions();
    let mut out = RgbImage::from_pixel(dims.width, dims.height, BACKGROUND.into());

    for (mask, &color) in quantization.layers().iter().zip(layer_colors) {
        let width = dims.width as usize;
        for (i, _) in mask.cells().iter().enumerate().filter(|&(_, &active)| active) {
            #[allow(clippy::cast_possible_truncation)]
            let (x, y) = ((i % width) as u32, (i / width) as u32);
            out.put_pixel(x, y, color.into());
        }
    }

    out
}

/// Fill traced outlines into an RGB image, `scale` pixels per source pixel.
///
/// Each row is sampled along its centre line (mesh `y = 2·row + 1`) with
/// an even-odd rule over every outline of the layer, so holes traced as
/// separate outlines stay unpainted. A crossing toggles the pixel that
/// contains it, and crossings right of the image are ignored.
/// `layer_colors[i]` fills layer `i`; layers without a color are skipped.
#[must_use]
pub fn rasterize(
    result: &TracingResult,
    layer_colors: &[Color],
    dimensions: Dimensions,
    scale: u32,
) -> RgbImage {
    let width = dimensions.width.saturating_mul(scale);
    let height = dimensions.height.saturating_mul(scale);
    let mut out = RgbImage::from_pixel(width, height, BACKGROUND.into());

    let scale = f64::from(scale);
    let point = |v: Vertex| (f64::from(v.x) * scale, f64::from(v.y) * scale);
    let mut crossings = vec![false; width as usize];

    for (outlines, &color) in result.layers().iter().zip(layer_colors) {
        for y in 0..height {
            crossings.fill(false);
            let row = f64::from(y).mul_add(2.0, 1.0);

            for outline in outlines {
                for edge in outline.vertices().windows(2) {
                    let (x1, y1) = point(edge[0]);
                    let (x2, y2) = point(edge[1]);
                    if (y1 > row) == (y2 > row) {
                        continue;
                    }
                    let mesh_x = ((x2 - x1) / (y2 - y1)).mul_add(row - y1, x1);
                    let pixel = (mesh_x / 2.0).floor();
                    if pixel >= 0.0 && pixel < f64::from(width) {
                        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                        let x = pixel as usize;
                        crossings[x] = !crossings[x];
                    }
                }
            }

            let mut inside = false;
            for (x, &crossing) in (0..width).zip(&crossings) {
                inside ^= crossing;
                if inside {
                    out.put_pixel(x, y, color.into());
                }
            }
        }
    }

    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use photogeo_pipeline::{Mask, Outline};

    use super::*;

    const RED: Color = Color::new(255, 0, 0);
    const BLUE: Color = Color::new(0, 0, 255);

    fn dims() -> Dimensions {
        Dimensions {
            width: 3,
            height: 2,
        }
    }

    #[test]
    fn empty_masks_render_white() {
        let q = QuantizationResult::new(dims(), vec![Mask::inactive(dims()).unwrap()]).unwrap();
        let img = render_quantization(&q, &[RED]);
        assert_eq!(img.dimensions(), (3, 2));
        assert!(img.pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn active_cells_take_layer_color() {
        let red = Mask::from_fn(dims(), |x, _| x == 0);
        let blue = Mask::from_fn(dims(), |x, y| x == 2 && y == 1);
        let q = QuantizationResult::new(dims(), vec![red, blue]).unwrap();
        let img = render_quantization(&q, &[RED, BLUE]);

        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(0, 1).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(1, 0).0, [255, 255, 255]);
        assert_eq!(img.get_pixel(2, 1).0, [0, 0, 255]);
    }

    #[test]
    fn layer_without_color_is_skipped() {
        let mask = Mask::from_fn(dims(), |_, _| true);
        let q = QuantizationResult::new(dims(), vec![mask]).unwrap();
        let img = render_quantization(&q, &[]);
        assert!(img.pixels().all(|p| p.0 == [255, 255, 255]));
    }

    fn outline(points: &[(u32, u32)]) -> Outline {
        Outline::new(points.iter().map(|&(x, y)| Vertex::new(x, y)).collect())
    }

    /// Traced outline of a 2×2 block at the origin.
    fn block() -> Outline {
        outline(&[
            (0, 1),
            (1, 0),
            (3, 0),
            (4, 1),
            (4, 3),
            (3, 4),
            (1, 4),
            (0, 3),
            (0, 1),
        ])
    }

    fn painted(img: &RgbImage) -> Vec<(u32, u32)> {
        img.enumerate_pixels()
            .filter(|(_, _, p)| p.0 != [255, 255, 255])
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    #[test]
    fn single_pixel_diamond_fills_its_pixel() {
        let diamond = outline(&[(2, 3), (3, 2), (4, 3), (3, 4), (2, 3)]);
        let result = TracingResult::new(vec![vec![diamond]]);
        let img = rasterize(&result, &[RED], dims(), 1);
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(painted(&img), vec![(1, 1)]);
        assert_eq!(img.get_pixel(1, 1).0, [255, 0, 0]);
    }

    #[test]
    fn block_fills_exactly_its_pixels() {
        let result = TracingResult::new(vec![vec![block()]]);
        let img = rasterize(&result, &[BLUE], dims(), 1);
        assert_eq!(painted(&img), vec![(0, 0), (1, 0), (0, 1), (1, 1)]);
    }

    #[test]
    fn hole_outline_is_left_unpainted() {
        // A 3×3 ring around pixel (1, 1): the outer border plus the hole.
        let outer = outline(&[
            (0, 1),
            (1, 0),
            (3, 0),
            (5, 0),
            (6, 1),
            (6, 3),
            (6, 5),
            (5, 6),
            (3, 6),
            (1, 6),
            (0, 5),
            (0, 3),
            (0, 1),
        ]);
        let hole = outline(&[(2, 3), (3, 4), (4, 3), (3, 2), (2, 3)]);
        let result = TracingResult::new(vec![vec![outer, hole]]);
        let img = rasterize(&result, &[RED], Dimensions { width: 3, height: 3 }, 1);

        let filled = painted(&img);
        assert_eq!(filled.len(), 8);
        assert!(!filled.contains(&(1, 1)));
    }

    #[test]
    fn scale_multiplies_output_size() {
        let result = TracingResult::new(vec![vec![block()]]);
        let img = rasterize(&result, &[RED], Dimensions { width: 2, height: 2 }, 2);
        assert_eq!(img.dimensions(), (4, 4));
        // Rows away from the chamfered corners are filled edge to edge.
        for y in 1..3 {
            for x in 0..4 {
                assert_eq!(img.get_pixel(x, y).0, [255, 0, 0], "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn rasterize_layer_without_color_is_skipped() {
        let result = TracingResult::new(vec![vec![block()]]);
        let img = rasterize(&result, &[], dims(), 1);
        assert!(painted(&img).is_empty());
    }
}
