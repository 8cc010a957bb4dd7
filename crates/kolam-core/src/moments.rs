//! Raw and central intensity moments of a grayscale image.
//!
//! Used for geometric-balance scoring: the intensity centroid offset from
//! the geometric center and the principal-axis angle derived from the
//! second-order central moments.

use crate::GrayImageView;

/// Intensity moments up to second order.
#[derive(Clone, Copy, Debug, Default)]
pub struct IntensityMoments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    pub mu20: f64,
    pub mu11: f64,
    pub mu02: f64,
}

impl IntensityMoments {
    pub fn of(img: &GrayImageView<'_>) -> Self {
        let mut m00 = 0.0f64;
        let mut m10 = 0.0f64;
        let mut m01 = 0.0f64;
        for y in 0..img.height {
            let row = &img.data[y * img.width..(y + 1) * img.width];
            for (x, &v) in row.iter().enumerate() {
                let v = v as f64;
                m00 += v;
                m10 += x as f64 * v;
                m01 += y as f64 * v;
            }
        }

        if m00 == 0.0 {
            return Self::default();
        }

        let cx = m10 / m00;
        let cy = m01 / m00;

        let mut mu20 = 0.0f64;
        let mut mu11 = 0.0f64;
        let mut mu02 = 0.0f64;
        for y in 0..img.height {
            let row = &img.data[y * img.width..(y + 1) * img.width];
            let dy = y as f64 - cy;
            for (x, &v) in row.iter().enumerate() {
                let v = v as f64;
                let dx = x as f64 - cx;
                mu20 += dx * dx * v;
                mu11 += dx * dy * v;
                mu02 += dy * dy * v;
            }
        }

        Self {
            m00,
            m10,
            m01,
            mu20,
            mu11,
            mu02,
        }
    }

    /// Intensity centroid, or `None` for an all-black image.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.m00 == 0.0 {
            return None;
        }
        Some((self.m10 / self.m00, self.m01 / self.m00))
    }

    /// Principal-axis angle in degrees from the normalized second-order
    /// central moments: `0.5 * atan2(2*mu11', mu20' - mu02')`.
    ///
    /// Returns 0 for a degenerate (isotropic or empty) distribution.
    pub fn principal_axis_deg(&self) -> f64 {
        if self.m00 == 0.0 {
            return 0.0;
        }
        let n20 = self.mu20 / self.m00;
        let n02 = self.mu02 / self.m00;
        let n11 = self.mu11 / self.m00;
        if n20 == n02 {
            return 0.0;
        }
        let theta = 0.5 * (2.0 * n11).atan2(n20 - n02);
        theta.to_degrees()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GrayImage;
    use approx::assert_relative_eq;

    #[test]
    fn centroid_of_single_bright_pixel() {
        let mut img = GrayImage::new(10, 10);
        img.set(7, 3, 255);
        let m = IntensityMoments::of(&img.as_view());
        let (cx, cy) = m.centroid().expect("non-empty");
        assert_relative_eq!(cx, 7.0, epsilon = 1e-9);
        assert_relative_eq!(cy, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn empty_image_has_no_centroid() {
        let img = GrayImage::new(8, 8);
        let m = IntensityMoments::of(&img.as_view());
        assert!(m.centroid().is_none());
        assert_eq!(0.0, m.principal_axis_deg());
    }

    #[test]
    fn principal_axis_follows_elongation() {
        // Horizontal bar: mu20 >> mu02, axis near 0 degrees.
        let mut img = GrayImage::new(21, 21);
        for x in 2..19 {
            img.set(x, 10, 255);
        }
        let m = IntensityMoments::of(&img.as_view());
        assert!(m.principal_axis_deg().abs() < 1.0);
    }
}
