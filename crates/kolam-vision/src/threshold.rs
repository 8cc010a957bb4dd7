//! Global thresholding.

use kolam_core::{GrayImage, GrayImageView};

/// Which side of the threshold becomes foreground (255).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Polarity {
    /// Pixels strictly above the threshold become foreground.
    Bright,
    /// Pixels at or below the threshold become foreground.
    Dark,
}

/// Compute the Otsu threshold of a whole image.
pub fn otsu_threshold(img: &GrayImageView<'_>) -> u8 {
    if img.data.is_empty() {
        return 127;
    }

    let mut min_v = 255u8;
    let mut max_v = 0u8;
    let mut hist = [0u32; 256];
    for &v in img.data {
        min_v = min_v.min(v);
        max_v = max_v.max(v);
        hist[v as usize] += 1;
    }
    if min_v == max_v {
        return min_v;
    }

    let nonzero_bins = hist.iter().filter(|&&h| h > 0).count();
    if nonzero_bins <= 2 {
        return ((min_v as u16 + max_v as u16) / 2) as u8;
    }

    let total = img.data.len() as f64;
    let mut sum_total = 0f64;
    for (i, &h) in hist.iter().enumerate() {
        sum_total += (i as f64) * (h as f64);
    }

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = 127u8;

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }

        sum_b += (t as f64) * (h as f64);
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;

        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }

    best_t
}

/// Produce a fresh 0/255 mask from a threshold; the source is untouched.
pub fn binarize(img: &GrayImageView<'_>, threshold: u8, polarity: Polarity) -> GrayImage {
    let mut out = GrayImage::new(img.width, img.height);
    for (dst, &src) in out.data.iter_mut().zip(img.data.iter()) {
        let fg = match polarity {
            Polarity::Bright => src > threshold,
            Polarity::Dark => src <= threshold,
        };
        if fg {
            *dst = 255;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use kolam_core::GrayImage;

    #[test]
    fn bimodal_image_splits_between_modes() {
        let mut img = GrayImage::new(10, 10);
        for i in 0..50 {
            img.data[i] = 30;
        }
        for i in 50..100 {
            img.data[i] = 220;
        }
        // Add spread so the histogram has more than two bins.
        img.data[0] = 28;
        img.data[99] = 222;
        let t = otsu_threshold(&img.as_view());
        assert!(t >= 30 && t < 220, "threshold {t} outside the mode gap");
    }

    #[test]
    fn flat_image_threshold_is_its_value() {
        let img = GrayImage::filled(4, 4, 90);
        assert_eq!(90, otsu_threshold(&img.as_view()));
    }

    #[test]
    fn binarize_respects_polarity() {
        let mut img = GrayImage::new(2, 1);
        img.set(0, 0, 10);
        img.set(1, 0, 200);
        let bright = binarize(&img.as_view(), 100, Polarity::Bright);
        assert_eq!(&[0, 255], bright.data.as_slice());
        let dark = binarize(&img.as_view(), 100, Polarity::Dark);
        assert_eq!(&[255, 0], dark.data.as_slice());
    }
}
