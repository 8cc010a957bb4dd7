//! Hu-moment shape descriptors and the log-scaled descriptor distance
//! used to drop near-duplicate contours from the multi-threshold fusion.

use crate::contours::PointF;

/// The seven Hu invariants of a boundary point set.
pub fn hu_moments(points: &[PointF]) -> [f64; 7] {
    let n = points.len();
    if n == 0 {
        return [0.0; 7];
    }

    let inv_n = 1.0 / n as f64;
    let mut cx = 0.0f64;
    let mut cy = 0.0f64;
    for p in points {
        cx += p.x as f64;
        cy += p.y as f64;
    }
    cx *= inv_n;
    cy *= inv_n;

    // Central moments up to third order over the point set (mu00 = n).
    let mut mu = [[0.0f64; 4]; 4];
    for p in points {
        let dx = p.x as f64 - cx;
        let dy = p.y as f64 - cy;
        let dx2 = dx * dx;
        let dy2 = dy * dy;
        mu[2][0] += dx2;
        mu[1][1] += dx * dy;
        mu[0][2] += dy2;
        mu[3][0] += dx2 * dx;
        mu[2][1] += dx2 * dy;
        mu[1][2] += dx * dy2;
        mu[0][3] += dy2 * dy;
    }

    let norm = |p: usize, q: usize| -> f64 {
        let gamma = 1.0 + (p + q) as f64 / 2.0;
        mu[p][q] / (n as f64).powf(gamma)
    };

    let n20 = norm(2, 0);
    let n02 = norm(0, 2);
    let n11 = norm(1, 1);
    let n30 = norm(3, 0);
    let n21 = norm(2, 1);
    let n12 = norm(1, 2);
    let n03 = norm(0, 3);

    let h1 = n20 + n02;
    let h2 = (n20 - n02).powi(2) + 4.0 * n11 * n11;
    let h3 = (n30 - 3.0 * n12).powi(2) + (3.0 * n21 - n03).powi(2);
    let h4 = (n30 + n12).powi(2) + (n21 + n03).powi(2);
    let h5 = (n30 - 3.0 * n12) * (n30 + n12)
        * ((n30 + n12).powi(2) - 3.0 * (n21 + n03).powi(2))
        + (3.0 * n21 - n03) * (n21 + n03) * (3.0 * (n30 + n12).powi(2) - (n21 + n03).powi(2));
    let h6 = (n20 - n02) * ((n30 + n12).powi(2) - (n21 + n03).powi(2))
        + 4.0 * n11 * (n30 + n12) * (n21 + n03);
    let h7 = (3.0 * n21 - n03) * (n30 + n12)
        * ((n30 + n12).powi(2) - 3.0 * (n21 + n03).powi(2))
        - (n30 - 3.0 * n12) * (n21 + n03) * (3.0 * (n30 + n12).powi(2) - (n21 + n03).powi(2));

    [h1, h2, h3, h4, h5, h6, h7]
}

/// Log-scaled Hu descriptor distance: `sum |1/mA_i - 1/mB_i|` over
/// `m_i = sign(h_i) * log10(|h_i|)`, skipping invariants that vanish in
/// either shape. Near-identical shapes score close to zero.
pub fn shape_distance(a: &[PointF], b: &[PointF]) -> f64 {
    hu_distance(&hu_moments(a), &hu_moments(b))
}

/// Distance between two precomputed Hu descriptors. Callers deduplicating
/// many contours cache the descriptors and compare with this directly.
pub fn hu_distance(ha: &[f64; 7], hb: &[f64; 7]) -> f64 {
    let mut dist = 0.0f64;
    for i in 0..7 {
        if ha[i].abs() < 1e-30 || hb[i].abs() < 1e-30 {
            continue;
        }
        let ma = ha[i].signum() * ha[i].abs().log10();
        let mb = hb[i].signum() * hb[i].abs().log10();
        if ma.abs() < 1e-12 || mb.abs() < 1e-12 {
            continue;
        }
        dist += (1.0 / ma - 1.0 / mb).abs();
    }
    dist
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle_points(cx: f32, cy: f32, r: f32, n: usize) -> Vec<PointF> {
        (0..n)
            .map(|i| {
                let a = i as f32 / n as f32 * std::f32::consts::TAU;
                PointF::new(cx + r * a.cos(), cy + r * a.sin())
            })
            .collect()
    }

    fn square_points(cx: f32, cy: f32, half: f32) -> Vec<PointF> {
        let mut pts = Vec::new();
        let n = 20;
        for i in 0..n {
            let t = i as f32 / n as f32 * 8.0 * half;
            // Walk the square perimeter.
            let (x, y) = if t < 2.0 * half {
                (t - half, -half)
            } else if t < 4.0 * half {
                (half, t - 3.0 * half)
            } else if t < 6.0 * half {
                (5.0 * half - t, half)
            } else {
                (-half, 7.0 * half - t)
            };
            pts.push(PointF::new(cx + x, cy + y));
        }
        pts
    }

    #[test]
    fn translated_circle_matches_itself() {
        let a = circle_points(10.0, 10.0, 8.0, 64);
        let b = circle_points(120.0, 40.0, 8.0, 64);
        assert!(shape_distance(&a, &b) < 0.05);
    }

    #[test]
    fn scaled_circle_still_matches() {
        let a = circle_points(50.0, 50.0, 8.0, 64);
        let b = circle_points(50.0, 50.0, 20.0, 64);
        assert!(shape_distance(&a, &b) < 0.1);
    }

    #[test]
    fn circle_and_square_differ() {
        let a = circle_points(50.0, 50.0, 10.0, 64);
        let b = square_points(50.0, 50.0, 10.0);
        assert!(shape_distance(&a, &b) > 0.1);
    }
}
