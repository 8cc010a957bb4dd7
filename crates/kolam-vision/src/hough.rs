//! Hough transforms: gradient circle detection plus standard and
//! probabilistic line detection over binary edge maps.

use kolam_core::GrayImageView;
use log::debug;
use serde::{Deserialize, Serialize};

/// Parameters of the gradient circle transform.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HoughCircleParams {
    /// Minimum distance between accepted circle centers.
    pub min_dist: f32,
    /// Gradient magnitude below which a pixel casts no votes.
    pub edge_threshold: f32,
    /// Minimum accumulator votes for a center candidate.
    pub accumulator_threshold: u32,
    pub min_radius: u32,
    pub max_radius: u32,
}

impl Default for HoughCircleParams {
    fn default() -> Self {
        Self {
            min_dist: 20.0,
            edge_threshold: 50.0,
            accumulator_threshold: 30,
            min_radius: 3,
            max_radius: 30,
        }
    }
}

/// A circle candidate from the accumulator.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CircleCandidate {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub votes: u32,
}

struct EdgePoint {
    x: i32,
    y: i32,
    dir_x: f32,
    dir_y: f32,
}

fn gradient_edge_points(img: &GrayImageView<'_>, threshold: f32) -> Vec<EdgePoint> {
    let w = img.width as i32;
    let h = img.height as i32;
    let mut points = Vec::new();

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let gx = (img.get(x + 1, y - 1) as f32 + 2.0 * img.get(x + 1, y) as f32
                + img.get(x + 1, y + 1) as f32)
                - (img.get(x - 1, y - 1) as f32
                    + 2.0 * img.get(x - 1, y) as f32
                    + img.get(x - 1, y + 1) as f32);
            let gy = (img.get(x - 1, y + 1) as f32 + 2.0 * img.get(x, y + 1) as f32
                + img.get(x + 1, y + 1) as f32)
                - (img.get(x - 1, y - 1) as f32
                    + 2.0 * img.get(x, y - 1) as f32
                    + img.get(x + 1, y - 1) as f32);
            let mag = (gx * gx + gy * gy).sqrt();
            if mag >= threshold {
                points.push(EdgePoint {
                    x,
                    y,
                    dir_x: gx / mag,
                    dir_y: gy / mag,
                });
            }
        }
    }
    points
}

/// Detect circles by voting along the gradient direction, then estimating
/// each center's radius from the modal edge distance.
pub fn detect_circles(img: &GrayImageView<'_>, params: &HoughCircleParams) -> Vec<CircleCandidate> {
    let w = img.width;
    let h = img.height;
    if w < 3 || h < 3 {
        return Vec::new();
    }

    let edges = gradient_edge_points(img, params.edge_threshold);
    let mut acc = vec![0u32; w * h];

    for p in &edges {
        for sign in [-1.0f32, 1.0] {
            for r in params.min_radius..=params.max_radius {
                let cx = (p.x as f32 + sign * p.dir_x * r as f32).round() as i32;
                let cy = (p.y as f32 + sign * p.dir_y * r as f32).round() as i32;
                if cx >= 0 && cy >= 0 && (cx as usize) < w && (cy as usize) < h {
                    acc[cy as usize * w + cx as usize] += 1;
                }
            }
        }
    }

    // Local maxima above the vote threshold.
    let mut candidates: Vec<(usize, usize, u32)> = Vec::new();
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let v = acc[y * w + x];
            if v < params.accumulator_threshold {
                continue;
            }
            let mut is_peak = true;
            'nbr: for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nv = acc[(y as i32 + dy) as usize * w + (x as i32 + dx) as usize];
                    if nv > v {
                        is_peak = false;
                        break 'nbr;
                    }
                }
            }
            if is_peak {
                candidates.push((x, y, v));
            }
        }
    }
    candidates.sort_by(|a, b| b.2.cmp(&a.2));
    debug!(
        "circle transform: {} edge points, {} center candidates",
        edges.len(),
        candidates.len()
    );

    // Greedy center suppression, then radius from the modal edge distance.
    let min_dist_sq = params.min_dist * params.min_dist;
    let mut out: Vec<CircleCandidate> = Vec::new();
    for (x, y, votes) in candidates {
        let close = out.iter().any(|c| {
            let dx = c.x - x as f32;
            let dy = c.y - y as f32;
            dx * dx + dy * dy < min_dist_sq
        });
        if close {
            continue;
        }

        let mut radius_hist = vec![0u32; (params.max_radius + 2) as usize];
        for p in &edges {
            let dx = (p.x - x as i32) as f32;
            let dy = (p.y - y as i32) as f32;
            let d = (dx * dx + dy * dy).sqrt().round() as u32;
            if d >= params.min_radius && d <= params.max_radius {
                radius_hist[d as usize] += 1;
            }
        }
        let (radius, support) = radius_hist
            .iter()
            .enumerate()
            .max_by_key(|&(_, &c)| c)
            .map(|(r, &c)| (r as u32, c))
            .unwrap_or((params.min_radius, 0));
        if support == 0 {
            continue;
        }

        out.push(CircleCandidate {
            x: x as f32,
            y: y as f32,
            radius: radius as f32,
            votes,
        });
    }
    out
}

/// Standard Hough line parameters (rho resolution fixed at 1 px, theta at
/// one degree, matching the usual transform call sites).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HoughLineParams {
    pub threshold: u32,
}

/// A line in polar form.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct HoughLine {
    pub rho: f32,
    pub theta: f32,
    pub votes: u32,
}

const THETA_BINS: usize = 180;

fn line_accumulator(edges: &GrayImageView<'_>) -> (Vec<u32>, usize) {
    let diag = ((edges.width * edges.width + edges.height * edges.height) as f64).sqrt() as usize + 1;
    let n_rho = 2 * diag + 1;
    let mut acc = vec![0u32; n_rho * THETA_BINS];

    let (sin_lut, cos_lut): (Vec<f64>, Vec<f64>) = (0..THETA_BINS)
        .map(|t| {
            let theta = t as f64 * std::f64::consts::PI / THETA_BINS as f64;
            (theta.sin(), theta.cos())
        })
        .unzip();

    for y in 0..edges.height {
        for x in 0..edges.width {
            if edges.at(x, y) == 0 {
                continue;
            }
            for t in 0..THETA_BINS {
                let rho = x as f64 * cos_lut[t] + y as f64 * sin_lut[t];
                let r_idx = (rho.round() as isize + diag as isize) as usize;
                acc[r_idx * THETA_BINS + t] += 1;
            }
        }
    }
    (acc, diag)
}

/// Standard Hough transform over a 0/255 edge map; returns local-maximum
/// lines with at least `threshold` votes.
pub fn hough_lines(edges: &GrayImageView<'_>, params: &HoughLineParams) -> Vec<HoughLine> {
    if edges.width == 0 || edges.height == 0 {
        return Vec::new();
    }
    let (acc, diag) = line_accumulator(edges);
    let n_rho = 2 * diag + 1;

    let mut out = Vec::new();
    for r in 0..n_rho {
        for t in 0..THETA_BINS {
            let v = acc[r * THETA_BINS + t];
            if v < params.threshold {
                continue;
            }
            // 4-neighborhood peak check in (rho, theta) space.
            let mut is_peak = true;
            if r > 0 && acc[(r - 1) * THETA_BINS + t] > v {
                is_peak = false;
            }
            if r + 1 < n_rho && acc[(r + 1) * THETA_BINS + t] > v {
                is_peak = false;
            }
            if t > 0 && acc[r * THETA_BINS + t - 1] > v {
                is_peak = false;
            }
            if t + 1 < THETA_BINS && acc[r * THETA_BINS + t + 1] > v {
                is_peak = false;
            }
            if is_peak {
                out.push(HoughLine {
                    rho: r as f32 - diag as f32,
                    theta: (t as f32).to_radians(),
                    votes: v,
                });
            }
        }
    }
    out
}

/// Probabilistic Hough line parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HoughLinePParams {
    pub threshold: u32,
    pub min_line_length: f32,
    pub max_line_gap: f32,
}

/// A detected line segment.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct LineSegment {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// Segment-producing variant: accepted polar lines are walked across the
/// image, splitting edge-pixel runs at gaps wider than `max_line_gap` and
/// keeping segments of at least `min_line_length`.
pub fn hough_lines_p(edges: &GrayImageView<'_>, params: &HoughLinePParams) -> Vec<LineSegment> {
    let lines = hough_lines(
        edges,
        &HoughLineParams {
            threshold: params.threshold,
        },
    );

    let w = edges.width as f64;
    let h = edges.height as f64;
    let step_count = (w.hypot(h)).ceil() as i64;

    let mut out = Vec::new();
    for line in lines {
        let theta = line.theta as f64;
        let rho = line.rho as f64;
        // Point on the line closest to the origin, direction along the line.
        let (px, py) = (rho * theta.cos(), rho * theta.sin());
        let (dx, dy) = (-theta.sin(), theta.cos());

        let mut run_start: Option<(f64, f64)> = None;
        let mut run_end = (0.0f64, 0.0f64);
        let mut gap = 0.0f64;

        for s in -step_count..=step_count {
            let x = px + dx * s as f64;
            let y = py + dy * s as f64;
            let inside = x >= 0.0 && y >= 0.0 && x < w && y < h;
            let hit = inside && edges.at(x as usize, y as usize) != 0;

            if hit {
                if run_start.is_none() {
                    run_start = Some((x, y));
                }
                run_end = (x, y);
                gap = 0.0;
            } else if let Some(start) = run_start {
                gap += 1.0;
                if gap > params.max_line_gap as f64 || !inside {
                    let len = (run_end.0 - start.0).hypot(run_end.1 - start.1);
                    if len >= params.min_line_length as f64 {
                        out.push(LineSegment {
                            x1: start.0 as f32,
                            y1: start.1 as f32,
                            x2: run_end.0 as f32,
                            y2: run_end.1 as f32,
                        });
                    }
                    run_start = None;
                }
            }
        }
        if let Some(start) = run_start {
            let len = (run_end.0 - start.0).hypot(run_end.1 - start.1);
            if len >= params.min_line_length as f64 {
                out.push(LineSegment {
                    x1: start.0 as f32,
                    y1: start.1 as f32,
                    x2: run_end.0 as f32,
                    y2: run_end.1 as f32,
                });
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use kolam_core::GrayImage;

    fn circle_outline(img: &mut GrayImage, cx: f32, cy: f32, r: f32) {
        let steps = (r * 12.0) as usize;
        for i in 0..steps {
            let a = i as f32 / steps as f32 * std::f32::consts::TAU;
            let x = (cx + r * a.cos()).round() as i32;
            let y = (cy + r * a.sin()).round() as i32;
            if x >= 0 && y >= 0 && (x as usize) < img.width && (y as usize) < img.height {
                img.set(x as usize, y as usize, 0);
            }
        }
    }

    #[test]
    fn detects_a_drawn_circle() {
        let mut img = GrayImage::filled(80, 80, 255);
        circle_outline(&mut img, 40.0, 40.0, 12.0);

        let found = detect_circles(&img.as_view(), &HoughCircleParams::default());
        assert!(!found.is_empty());
        let best = &found[0];
        assert!((best.x - 40.0).abs() <= 2.0, "cx = {}", best.x);
        assert!((best.y - 40.0).abs() <= 2.0, "cy = {}", best.y);
        assert!((best.radius - 12.0).abs() <= 2.0, "r = {}", best.radius);
    }

    #[test]
    fn finds_a_horizontal_line() {
        let mut edges = GrayImage::new(60, 60);
        for x in 5..55 {
            edges.set(x, 30, 255);
        }
        let lines = hough_lines(&edges.as_view(), &HoughLineParams { threshold: 40 });
        assert!(!lines.is_empty());
        // Horizontal line: theta near 90 degrees, rho near y = 30.
        let best = lines.iter().max_by_key(|l| l.votes).unwrap();
        assert!((best.theta.to_degrees() - 90.0).abs() < 2.0);
        assert!((best.rho - 30.0).abs() < 2.0);
    }

    #[test]
    fn probabilistic_variant_returns_the_segment() {
        let mut edges = GrayImage::new(60, 60);
        for x in 5..55 {
            edges.set(x, 30, 255);
        }
        let segs = hough_lines_p(
            &edges.as_view(),
            &HoughLinePParams {
                threshold: 40,
                min_line_length: 30.0,
                max_line_gap: 5.0,
            },
        );
        assert!(!segs.is_empty());
        let s = &segs[0];
        let len = (s.x2 - s.x1).hypot(s.y2 - s.y1);
        assert!(len >= 40.0, "segment length {len}");
    }
}
