//! Whole-image geometric transforms and the normalized cross-correlation
//! coefficient used for symmetry scoring.

use kolam_core::{sample_bilinear_u8, GrayImage, GrayImageView};

/// Mirror around the vertical axis (left-right flip).
pub fn flip_horizontal(img: &GrayImageView<'_>) -> GrayImage {
    let mut out = GrayImage::new(img.width, img.height);
    for y in 0..img.height {
        for x in 0..img.width {
            out.set(x, y, img.at(img.width - 1 - x, y));
        }
    }
    out
}

/// Mirror around the horizontal axis (top-bottom flip).
pub fn flip_vertical(img: &GrayImageView<'_>) -> GrayImage {
    let mut out = GrayImage::new(img.width, img.height);
    for y in 0..img.height {
        for x in 0..img.width {
            out.set(x, y, img.at(x, img.height - 1 - y));
        }
    }
    out
}

/// Transpose rows and columns; output is `height x width`.
pub fn transpose(img: &GrayImageView<'_>) -> GrayImage {
    let mut out = GrayImage::new(img.height, img.width);
    for y in 0..img.height {
        for x in 0..img.width {
            out.set(y, x, img.at(x, y));
        }
    }
    out
}

/// Rotate counter-clockwise by `angle_deg` about the image center with
/// bilinear resampling. Pixels mapped from outside the source read as 0.
pub fn rotate_about_center(img: &GrayImageView<'_>, angle_deg: f32) -> GrayImage {
    let cx = (img.width / 2) as f32;
    let cy = (img.height / 2) as f32;
    let theta = angle_deg.to_radians();
    let (sin_t, cos_t) = theta.sin_cos();

    let mut out = GrayImage::new(img.width, img.height);
    for y in 0..img.height {
        let dy = y as f32 - cy;
        for x in 0..img.width {
            let dx = x as f32 - cx;
            // Inverse mapping: rotate the destination offset back by theta.
            let sx = cos_t * dx + sin_t * dy + cx;
            let sy = -sin_t * dx + cos_t * dy + cy;
            if sx >= -1.0 && sy >= -1.0 && sx < img.width as f32 && sy < img.height as f32 {
                out.set(x, y, sample_bilinear_u8(img, sx, sy));
            }
        }
    }
    out
}

/// Normalized cross-correlation coefficient between two equal-size images.
///
/// Equivalent to template matching an image against a same-size transform
/// of itself: a single coefficient in [-1, 1]. Returns 0 for mismatched
/// sizes or degenerate (constant) inputs.
pub fn ncc(a: &GrayImageView<'_>, b: &GrayImageView<'_>) -> f64 {
    if a.width != b.width || a.height != b.height || a.data.is_empty() {
        return 0.0;
    }

    let n = a.data.len() as f64;
    let mean_a = a.data.iter().map(|&v| v as f64).sum::<f64>() / n;
    let mean_b = b.data.iter().map(|&v| v as f64).sum::<f64>() / n;

    let mut cross = 0.0f64;
    let mut var_a = 0.0f64;
    let mut var_b = 0.0f64;
    for (&pa, &pb) in a.data.iter().zip(b.data.iter()) {
        let da = pa as f64 - mean_a;
        let db = pb as f64 - mean_b;
        cross += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    let denom = (var_a * var_b).sqrt();
    if denom < f64::EPSILON {
        return 0.0;
    }
    cross / denom
}

#[cfg(test)]
mod tests {
    use super::*;
    use kolam_core::GrayImage;

    fn gradient_image(w: usize, h: usize) -> GrayImage {
        let mut img = GrayImage::new(w, h);
        for y in 0..h {
            for x in 0..w {
                img.set(x, y, ((x * 13 + y * 31) % 256) as u8);
            }
        }
        img
    }

    #[test]
    fn double_flip_restores_image() {
        let img = gradient_image(7, 5);
        let back = flip_horizontal(&flip_horizontal(&img.as_view()).as_view());
        assert_eq!(img, back);
        let back = flip_vertical(&flip_vertical(&img.as_view()).as_view());
        assert_eq!(img, back);
    }

    #[test]
    fn ncc_of_identical_images_is_one() {
        let img = gradient_image(16, 16);
        let c = ncc(&img.as_view(), &img.as_view());
        assert!((c - 1.0).abs() < 1e-9, "ncc = {c}");
    }

    #[test]
    fn ncc_of_inverted_image_is_minus_one() {
        let img = gradient_image(16, 16);
        let mut inv = img.clone();
        for v in &mut inv.data {
            *v = 255 - *v;
        }
        let c = ncc(&img.as_view(), &inv.as_view());
        assert!((c + 1.0).abs() < 1e-6, "ncc = {c}");
    }

    #[test]
    fn rotation_by_zero_is_identity_away_from_border() {
        let img = gradient_image(9, 9);
        let rot = rotate_about_center(&img.as_view(), 0.0);
        for y in 1..8 {
            for x in 1..8 {
                assert_eq!(img.at(x, y), rot.at(x, y));
            }
        }
    }
}
