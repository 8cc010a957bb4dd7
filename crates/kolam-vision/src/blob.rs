//! Connected-component blob detection tuned for small circular regions.
//!
//! Mirrors the classic simple-blob-detector contract: threshold, label
//! components, then filter by area, circularity, convexity and inertia
//! ratio. Dot markers in kolam photographs are small near-circular blobs,
//! so the defaults are tight on circularity and loose on area.

use kolam_core::GrayImageView;
use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::contours::convex_hull;
use crate::threshold::{binarize, otsu_threshold, Polarity};

/// Filtering parameters for blob detection.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlobParams {
    pub min_area: f32,
    pub max_area: f32,
    pub min_circularity: f32,
    pub min_convexity: f32,
    pub min_inertia_ratio: f32,
    /// Detect dark blobs on a bright background when true.
    pub dark_blobs: bool,
}

impl Default for BlobParams {
    fn default() -> Self {
        Self {
            min_area: 5.0,
            max_area: 1000.0,
            min_circularity: 0.6,
            min_convexity: 0.7,
            min_inertia_ratio: 0.3,
            dark_blobs: true,
        }
    }
}

/// A blob candidate: centroid, equivalent diameter and filter response.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct BlobKeypoint {
    pub x: f32,
    pub y: f32,
    pub diameter: f32,
    /// Circularity of the accepted component, in [0, 1].
    pub response: f32,
}

struct Component {
    pixels: Vec<(u32, u32)>,
    boundary: usize,
}

fn label_components(mask: &GrayImageView<'_>) -> Vec<Component> {
    let w = mask.width;
    let h = mask.height;
    let mut visited = vec![false; w * h];
    let mut components = Vec::new();

    for start in 0..w * h {
        if visited[start] || mask.data[start] == 0 {
            continue;
        }

        let mut pixels = Vec::new();
        let mut boundary = 0usize;
        let mut stack = vec![start];
        visited[start] = true;

        while let Some(idx) = stack.pop() {
            let x = (idx % w) as i32;
            let y = (idx / w) as i32;
            pixels.push((x as u32, y as u32));

            // 4-neighbor background contact marks a boundary pixel.
            let on_boundary = [(1i32, 0i32), (-1, 0), (0, 1), (0, -1)]
                .iter()
                .any(|&(dx, dy)| mask.get(x + dx, y + dy) == 0);
            if on_boundary {
                boundary += 1;
            }

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
                    if !visited[nidx] && mask.data[nidx] != 0 {
                        visited[nidx] = true;
                        stack.push(nidx);
                    }
                }
            }
        }

        components.push(Component { pixels, boundary });
    }

    components
}

fn inertia_ratio(pixels: &[(u32, u32)], cx: f32, cy: f32) -> f32 {
    let n = pixels.len() as f32;
    let mut mxx = 0.0f32;
    let mut myy = 0.0f32;
    let mut mxy = 0.0f32;
    for &(x, y) in pixels {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        mxx += dx * dx;
        myy += dy * dy;
        mxy += dx * dy;
    }
    mxx /= n;
    myy /= n;
    mxy /= n;

    // Eigenvalues of the 2x2 covariance matrix.
    let trace = mxx + myy;
    let det = mxx * myy - mxy * mxy;
    let disc = (trace * trace / 4.0 - det).max(0.0).sqrt();
    let l_max = trace / 2.0 + disc;
    let l_min = trace / 2.0 - disc;
    if l_max <= 0.0 {
        return 1.0; // single pixel: treat as perfectly isotropic
    }
    (l_min / l_max).max(0.0)
}

fn convexity(pixels: &[(u32, u32)]) -> f32 {
    if pixels.len() < 3 {
        return 1.0;
    }
    let pts: Vec<Point2<f32>> = pixels
        .iter()
        .map(|&(x, y)| Point2::new(x as f32, y as f32))
        .collect();
    let hull = convex_hull(&pts);
    if hull.len() < 3 {
        return 1.0;
    }
    let mut hull_area = 0.0f32;
    for i in 0..hull.len() {
        let a = hull[i];
        let b = hull[(i + 1) % hull.len()];
        hull_area += a.x * b.y - b.x * a.y;
    }
    let hull_area = hull_area.abs() / 2.0;
    if hull_area <= 0.0 {
        return 1.0;
    }
    (pixels.len() as f32 / hull_area).min(1.0)
}

/// Detect blob keypoints passing every enabled filter.
pub fn detect_blobs(img: &GrayImageView<'_>, params: &BlobParams) -> Vec<BlobKeypoint> {
    let t = otsu_threshold(img);
    let polarity = if params.dark_blobs {
        Polarity::Dark
    } else {
        Polarity::Bright
    };
    let mask = binarize(img, t, polarity);

    let components = label_components(&mask.as_view());
    debug!("blob detection: {} components at threshold {t}", components.len());

    let mut out = Vec::new();
    for comp in components {
        let area = comp.pixels.len() as f32;
        if area < params.min_area || area > params.max_area {
            continue;
        }

        let perimeter = comp.boundary.max(1) as f32;
        let circularity =
            (4.0 * std::f32::consts::PI * area / (perimeter * perimeter)).min(1.0);
        if circularity < params.min_circularity {
            continue;
        }

        if convexity(&comp.pixels) < params.min_convexity {
            continue;
        }

        let n = comp.pixels.len() as f32;
        let cx = comp.pixels.iter().map(|&(x, _)| x as f32).sum::<f32>() / n;
        let cy = comp.pixels.iter().map(|&(_, y)| y as f32).sum::<f32>() / n;

        if inertia_ratio(&comp.pixels, cx, cy) < params.min_inertia_ratio {
            continue;
        }

        out.push(BlobKeypoint {
            x: cx,
            y: cy,
            diameter: 2.0 * (area / std::f32::consts::PI).sqrt(),
            response: circularity.clamp(0.0, 1.0),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use kolam_core::GrayImage;

    fn fill_disc(img: &mut GrayImage, cx: i32, cy: i32, r: i32, value: u8) {
        for y in (cy - r).max(0)..=(cy + r).min(img.height as i32 - 1) {
            for x in (cx - r).max(0)..=(cx + r).min(img.width as i32 - 1) {
                let dx = x - cx;
                let dy = y - cy;
                if dx * dx + dy * dy <= r * r {
                    img.set(x as usize, y as usize, value);
                }
            }
        }
    }

    #[test]
    fn finds_dark_discs_on_bright_background() {
        let mut img = GrayImage::filled(100, 100, 230);
        fill_disc(&mut img, 25, 30, 5, 20);
        fill_disc(&mut img, 70, 60, 6, 20);

        let kps = detect_blobs(&img.as_view(), &BlobParams::default());
        assert_eq!(2, kps.len());
        let mut xs: Vec<f32> = kps.iter().map(|k| k.x).collect();
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!((xs[0] - 25.0).abs() < 1.0);
        assert!((xs[1] - 70.0).abs() < 1.0);
    }

    #[test]
    fn elongated_component_is_rejected() {
        let mut img = GrayImage::filled(80, 80, 230);
        for x in 10..70 {
            for y in 38..41 {
                img.set(x, y, 20); // 60x3 bar
            }
        }
        let kps = detect_blobs(&img.as_view(), &BlobParams::default());
        assert!(kps.is_empty());
    }

    #[test]
    fn area_window_rejects_specks() {
        let mut img = GrayImage::filled(50, 50, 230);
        img.set(25, 25, 20); // single pixel, area 1 < min_area
        let kps = detect_blobs(&img.as_view(), &BlobParams::default());
        assert!(kps.is_empty());
    }
}
