//! Multi-radius ring-template matching.
//!
//! A ring template is a 1-pixel circle outline in a `(2r+1)^2` window. The
//! normalized cross-correlation against every window position reduces to a
//! sparse sum over the ring offsets plus window statistics from integral
//! images, so matching stays linear in the ring length rather than the
//! window area.

use kolam_core::GrayImageView;
use serde::{Deserialize, Serialize};

use crate::integral::IntegralImage;

/// Ring-matching parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RingTemplateParams {
    pub min_radius: u32,
    /// Hard cap on the swept radius; the effective cap is also bounded by
    /// one sixth of the smaller image dimension.
    pub max_radius_cap: u32,
    pub radius_step: u32,
    /// NCC score below which a window is not a match.
    pub match_threshold: f32,
    /// At most this many matches are kept per swept radius.
    pub max_matches_per_radius: usize,
}

impl Default for RingTemplateParams {
    fn default() -> Self {
        Self {
            min_radius: 3,
            max_radius_cap: 15,
            radius_step: 2,
            match_threshold: 0.65,
            max_matches_per_radius: 50,
        }
    }
}

/// A ring match: center position, matched radius and NCC score.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RingMatch {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub score: f32,
}

/// Midpoint-circle offsets of a radius-`r` outline, relative to the center.
fn ring_offsets(r: i32) -> Vec<(i32, i32)> {
    let mut pts = Vec::new();
    let mut x = r;
    let mut y = 0i32;
    let mut err = 1 - r;
    while x >= y {
        for &(px, py) in &[
            (x, y),
            (y, x),
            (-y, x),
            (-x, y),
            (-x, -y),
            (-y, -x),
            (y, -x),
            (x, -y),
        ] {
            pts.push((px, py));
        }
        y += 1;
        if err < 0 {
            err += 2 * y + 1;
        } else {
            x -= 1;
            err += 2 * (y - x) + 1;
        }
    }
    pts.sort_unstable();
    pts.dedup();
    pts
}

/// Slide ring templates of every swept radius over the image and collect
/// positions whose NCC score clears the threshold.
pub fn match_ring_templates(
    img: &GrayImageView<'_>,
    params: &RingTemplateParams,
) -> Vec<RingMatch> {
    let min_dim = img.width.min(img.height) as u32;
    let max_radius = params.max_radius_cap.min(min_dim / 6);
    if max_radius < params.min_radius {
        return Vec::new();
    }

    let integral = IntegralImage::of(img);
    let mut out = Vec::new();

    let mut r = params.min_radius;
    while r < max_radius {
        let ri = r as i32;
        let side = (2 * r + 1) as usize;
        if side > img.width || side > img.height {
            break;
        }

        let ring = ring_offsets(ri);
        let k = ring.len() as f64;
        let n = (side * side) as f64;
        let t_mean = 255.0 * k / n;
        // Sum of squared template deviations is constant per radius.
        let t_var_sum = k * (255.0 - t_mean).powi(2) + (n - k) * t_mean * t_mean;

        let mut matches_at_radius = 0usize;
        'rows: for y0 in 0..=(img.height - side) {
            for x0 in 0..=(img.width - side) {
                let s = integral.window_sum(x0, y0, side, side) as f64;
                let q = integral.window_sq_sum(x0, y0, side, side) as f64;
                let i_var_sum = q - s * s / n;
                // Cheap reject: flat windows can never correlate.
                if i_var_sum < 1.0 {
                    continue;
                }

                let cx = x0 as i32 + ri;
                let cy = y0 as i32 + ri;
                let mut ring_sum = 0.0f64;
                for &(dx, dy) in &ring {
                    ring_sum += img.at((cx + dx) as usize, (cy + dy) as usize) as f64;
                }

                let cross = 255.0 * ring_sum - t_mean * s;
                let denom = (t_var_sum * i_var_sum).sqrt();
                if denom < f64::EPSILON {
                    continue;
                }
                let score = (cross / denom) as f32;
                if score >= params.match_threshold {
                    out.push(RingMatch {
                        x: cx as f32,
                        y: cy as f32,
                        radius: r as f32,
                        score,
                    });
                    matches_at_radius += 1;
                    if matches_at_radius >= params.max_matches_per_radius {
                        break 'rows;
                    }
                }
            }
        }

        r += params.radius_step;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use kolam_core::GrayImage;

    fn draw_ring(img: &mut GrayImage, cx: i32, cy: i32, r: i32, value: u8) {
        for (dx, dy) in ring_offsets(r) {
            let x = cx + dx;
            let y = cy + dy;
            if x >= 0 && y >= 0 && (x as usize) < img.width && (y as usize) < img.height {
                img.set(x as usize, y as usize, value);
            }
        }
    }

    #[test]
    fn matches_a_drawn_ring_at_its_radius() {
        let mut img = GrayImage::new(120, 120);
        draw_ring(&mut img, 60, 60, 7, 255);

        let matches = match_ring_templates(&img.as_view(), &RingTemplateParams::default());
        assert!(!matches.is_empty());
        let best = matches
            .iter()
            .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap())
            .unwrap();
        assert_eq!(7.0, best.radius);
        assert!((best.x - 60.0).abs() <= 1.0);
        assert!((best.y - 60.0).abs() <= 1.0);
        assert!(best.score > 0.9);
    }

    #[test]
    fn flat_image_produces_no_matches() {
        let img = GrayImage::filled(100, 100, 180);
        let matches = match_ring_templates(&img.as_view(), &RingTemplateParams::default());
        assert!(matches.is_empty());
    }
}
