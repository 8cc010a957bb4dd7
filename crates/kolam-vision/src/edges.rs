//! Gradient edge detection with non-maximum suppression and hysteresis.
//!
//! The stroke stage runs this at several sensitivity levels and fuses the
//! resulting contour sets, so the detector favors stable, 1-pixel-wide
//! edges over exhaustive recall at any single level.

use kolam_core::{GrayImage, GrayImageView};

const SOBEL_X: [[f32; 3]; 3] = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
const SOBEL_Y: [[f32; 3]; 3] = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

struct Gradients {
    gx: Vec<f32>,
    gy: Vec<f32>,
    mag: Vec<f32>,
}

fn smooth3(img: &GrayImageView<'_>) -> Vec<f32> {
    // Separable [1 2 1]/4 binomial kernel with clamped borders.
    let w = img.width;
    let h = img.height;
    let mut tmp = vec![0.0f32; w * h];
    let mut out = vec![0.0f32; w * h];

    for y in 0..h {
        for x in 0..w {
            let xm = x.saturating_sub(1);
            let xp = (x + 1).min(w - 1);
            tmp[y * w + x] = (img.at(xm, y) as f32
                + 2.0 * img.at(x, y) as f32
                + img.at(xp, y) as f32)
                / 4.0;
        }
    }
    for y in 0..h {
        let ym = y.saturating_sub(1);
        let yp = (y + 1).min(h - 1);
        for x in 0..w {
            out[y * w + x] = (tmp[ym * w + x] + 2.0 * tmp[y * w + x] + tmp[yp * w + x]) / 4.0;
        }
    }
    out
}

fn gradients(lum: &[f32], w: usize, h: usize) -> Gradients {
    let mut gx = vec![0.0f32; w * h];
    let mut gy = vec![0.0f32; w * h];
    let mut mag = vec![0.0f32; w * h];

    for y in 0..h {
        let ys = [y.saturating_sub(1), y, (y + 1).min(h - 1)];
        for x in 0..w {
            let xs = [x.saturating_sub(1), x, (x + 1).min(w - 1)];
            let mut sx = 0.0;
            let mut sy = 0.0;
            for ky in 0..3 {
                for kx in 0..3 {
                    let v = lum[ys[ky] * w + xs[kx]];
                    sx += v * SOBEL_X[ky][kx];
                    sy += v * SOBEL_Y[ky][kx];
                }
            }
            let idx = y * w + x;
            gx[idx] = sx;
            gy[idx] = sy;
            mag[idx] = (sx * sx + sy * sy).sqrt();
        }
    }

    Gradients { gx, gy, mag }
}

/// Thin edges to local gradient maxima along the quantized gradient
/// direction (4 directions, pi-periodic).
fn non_maximum_suppression(g: &Gradients, w: usize, h: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; w * h];
    for y in 1..h.saturating_sub(1) {
        for x in 1..w.saturating_sub(1) {
            let idx = y * w + x;
            let m = g.mag[idx];
            if m <= 0.0 {
                continue;
            }
            let angle = g.gy[idx].atan2(g.gx[idx]).to_degrees();
            let a = ((angle % 180.0) + 180.0) % 180.0;
            let (n1, n2) = if !(22.5..157.5).contains(&a) {
                (idx - 1, idx + 1)
            } else if a < 67.5 {
                (idx - w - 1, idx + w + 1)
            } else if a < 112.5 {
                (idx - w, idx + w)
            } else {
                (idx - w + 1, idx + w - 1)
            };
            if m >= g.mag[n1] && m >= g.mag[n2] {
                out[idx] = m;
            }
        }
    }
    out
}

/// Detect edges with dual-threshold hysteresis; returns a 0/255 edge map.
///
/// `low`/`high` are thresholds on the Sobel gradient magnitude. Weak edge
/// pixels survive only when 8-connected to a strong one.
pub fn detect_edges(img: &GrayImageView<'_>, low: f32, high: f32) -> GrayImage {
    let w = img.width;
    let h = img.height;
    let mut out = GrayImage::new(w, h);
    if w < 3 || h < 3 {
        return out;
    }

    let lum = smooth3(img);
    let g = gradients(&lum, w, h);
    let thin = non_maximum_suppression(&g, w, h);

    // Seed from strong pixels, then grow through weak ones.
    let mut stack = Vec::new();
    for (idx, &m) in thin.iter().enumerate() {
        if m >= high {
            out.data[idx] = 255;
            stack.push(idx);
        }
    }

    while let Some(idx) = stack.pop() {
        let x = (idx % w) as i32;
        let y = (idx / w) as i32;
        for dy in -1i32..=1 {
            for dx in -1i32..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = x + dx;
                let ny = y + dy;
                if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                    continue;
                }
                let nidx = ny as usize * w + nx as usize;
                if out.data[nidx] == 0 && thin[nidx] >= low {
                    out.data[nidx] = 255;
                    stack.push(nidx);
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use kolam_core::GrayImage;

    #[test]
    fn step_edge_is_detected_once() {
        let mut img = GrayImage::new(20, 20);
        for y in 0..20 {
            for x in 10..20 {
                img.set(x, y, 255);
            }
        }
        let edges = detect_edges(&img.as_view(), 50.0, 150.0);
        // Every interior row crosses the step exactly once after thinning.
        for y in 2..18 {
            let hits: usize = (0..20).filter(|&x| edges.at(x, y) > 0).count();
            assert!(hits >= 1 && hits <= 2, "row {y} had {hits} edge pixels");
        }
    }

    #[test]
    fn flat_image_has_no_edges() {
        let img = GrayImage::filled(16, 16, 128);
        let edges = detect_edges(&img.as_view(), 20.0, 80.0);
        assert!(edges.data.iter().all(|&v| v == 0));
    }
}
