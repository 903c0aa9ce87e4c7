//! Pixel-exact image comparison.

use photogeo_pipeline::RgbImage;

/// Percentage of pixel positions whose colors match exactly.
///
/// Returns `None` if the images differ in size. Two empty images are
/// identical.
#[must_use]
pub fn identical_percentage(first: &RgbImage, second: &RgbImage) -> Option<f64> {
    if first.dimensions() != second.dimensions() {
        return None;
    }

    let total = u64::from(first.width()) * u64::from(first.height());
    if total == 0 {
        return Some(100.0);
    }
    let differing = first
        .pixels()
        .zip(second.pixels())
        .filter(|(a, b)| a != b)
        .count();

    #[allow(clippy::cast_precision_loss)]
    let differing = differing as f64 / total as f64;
    Some(differing.mul_add(-100.0, 100.0))
}

/// One line of the comparison log: `[first - second] : 97.5%`.
#[must_use]
pub fn log_line(first: &str, second: &str, identical: f64) -> String {
    format!("[{first} - {second}] : {identical}%")
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    #[test]
    fn identical_images_match_fully() {
        let img = RgbImage::from_pixel(4, 3, Rgb([10, 20, 30]));
        assert_eq!(identical_percentage(&img, &img.clone()), Some(100.0));
    }

    #[test]
    fn any_channel_difference_counts_the_pixel() {
        let a = RgbImage::from_pixel(2, 2, Rgb([0, 0, 0]));
        let mut b = a.clone();
        b.put_pixel(1, 0, Rgb([0, 0, 1]));
        let identical = identical_percentage(&a, &b).unwrap_or_default();
        assert!((identical - 75.0).abs() < 1e-9, "got {identical}");
    }

    #[test]
    fn size_mismatch_is_none() {
        let a = RgbImage::new(2, 2);
        let b = RgbImage::new(2, 3);
        assert_eq!(identical_percentage(&a, &b), None);
    }

    #[test]
    fn empty_images_are_identical() {
        assert_eq!(identical_percentage(&RgbImage::new(0, 0), &RgbImage::new(0, 0)), Some(100.0));
    }

    #[test]
    fn log_line_names_both_inputs() {
        assert_eq!(log_line("a.png", "b.png", 97.5), "[a.png - b.png] : 97.5%");
    }
}
