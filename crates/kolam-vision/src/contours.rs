//! Contour extraction with hole hierarchy, plus the derived scalar
//! properties the analysis stages classify on.
//!
//! Foreground components (8-connected) contribute their outer boundary;
//! enclosed background regions (4-connected, not touching the image
//! border) contribute hole boundaries whose `parent` points at the
//! enclosing outer contour. A contour with no parent is an outermost
//! boundary; downstream this is read as a "continuous" stroke.

use kolam_core::GrayImageView;
use nalgebra::Point2;

pub type PointF = Point2<f32>;

/// An ordered boundary with hierarchy info.
#[derive(Clone, Debug)]
pub struct Contour {
    pub points: Vec<PointF>,
    /// Index of the enclosing outer contour, set for hole boundaries only.
    pub parent: Option<usize>,
    pub is_hole: bool,
}

impl Contour {
    fn outer(points: Vec<PointF>) -> Self {
        Self {
            points,
            parent: None,
            is_hole: false,
        }
    }

    /// Enclosed area by the shoelace formula.
    pub fn area(&self) -> f64 {
        polygon_area(&self.points)
    }

    /// Closed polyline length.
    pub fn perimeter(&self) -> f64 {
        let n = self.points.len();
        if n < 2 {
            return 0.0;
        }
        let mut total = 0.0f64;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            total += ((b.x - a.x) as f64).hypot((b.y - a.y) as f64);
        }
        total
    }

    /// `4*pi*area / perimeter^2`; 1.0 for a perfect circle.
    pub fn circularity(&self) -> f64 {
        let p = self.perimeter();
        if p <= 0.0 {
            return 0.0;
        }
        4.0 * std::f64::consts::PI * self.area() / (p * p)
    }

    /// Area over convex-hull area; measures concavity.
    pub fn solidity(&self) -> f64 {
        let hull = convex_hull(&self.points);
        let hull_area = polygon_area(&hull);
        if hull_area <= 0.0 {
            return 0.0;
        }
        (self.area() / hull_area).min(1.0)
    }

    /// Polygon centroid; falls back to the point mean for degenerate
    /// (zero-area) boundaries.
    pub fn centroid(&self) -> PointF {
        let n = self.points.len();
        if n == 0 {
            return PointF::origin();
        }
        let mut a2 = 0.0f64;
        let mut cx = 0.0f64;
        let mut cy = 0.0f64;
        for i in 0..n {
            let p = self.points[i];
            let q = self.points[(i + 1) % n];
            let cross = p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
            a2 += cross;
            cx += (p.x + q.x) as f64 * cross;
            cy += (p.y + q.y) as f64 * cross;
        }
        if a2.abs() < 1e-9 {
            let inv = 1.0 / n as f32;
            let mut mx = 0.0f32;
            let mut my = 0.0f32;
            for p in &self.points {
                mx += p.x;
                my += p.y;
            }
            return PointF::new(mx * inv, my * inv);
        }
        PointF::new((cx / (3.0 * a2)) as f32, (cy / (3.0 * a2)) as f32)
    }

    /// Axis-aligned bounding box as `(x, y, w, h)`.
    pub fn bounding_box(&self) -> (f32, f32, f32, f32) {
        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;
        for p in &self.points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        if self.points.is_empty() {
            return (0.0, 0.0, 0.0, 0.0);
        }
        (min_x, min_y, max_x - min_x + 1.0, max_y - min_y + 1.0)
    }

    /// Bounding-box width over height.
    pub fn aspect_ratio(&self) -> f64 {
        let (_, _, w, h) = self.bounding_box();
        if h <= 0.0 {
            return 1.0;
        }
        (w / h) as f64
    }

    /// Vertex count of the closed polygon approximation at
    /// `epsilon = epsilon_frac * perimeter`.
    pub fn approx_vertex_count(&self, epsilon_frac: f64) -> usize {
        approx_poly_dp(&self.points, epsilon_frac * self.perimeter()).len()
    }
}

fn polygon_area(points: &[PointF]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut acc = 0.0f64;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        acc += a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64;
    }
    acc.abs() / 2.0
}

/// Convex hull by Andrew's monotone chain; output is in counter-clockwise
/// order without repeated endpoints.
pub fn convex_hull(points: &[PointF]) -> Vec<PointF> {
    let mut pts: Vec<PointF> = points.to_vec();
    pts.sort_by(|a, b| {
        a.x.partial_cmp(&b.x)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
    });
    pts.dedup_by(|a, b| a.x == b.x && a.y == b.y);
    let n = pts.len();
    if n < 3 {
        return pts;
    }

    let cross = |o: &PointF, a: &PointF, b: &PointF| -> f64 {
        (a.x - o.x) as f64 * (b.y - o.y) as f64 - (a.y - o.y) as f64 * (b.x - o.x) as f64
    };

    let mut lower: Vec<PointF> = Vec::with_capacity(n);
    for p in &pts {
        while lower.len() >= 2 && cross(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= 0.0
        {
            lower.pop();
        }
        lower.push(*p);
    }

    let mut upper: Vec<PointF> = Vec::with_capacity(n);
    for p in pts.iter().rev() {
        while upper.len() >= 2 && cross(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= 0.0
        {
            upper.pop();
        }
        upper.push(*p);
    }

    // The chain endpoints coincide; drop one copy from each.
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

fn point_segment_distance(p: PointF, a: PointF, b: PointF) -> f64 {
    let abx = (b.x - a.x) as f64;
    let aby = (b.y - a.y) as f64;
    let apx = (p.x - a.x) as f64;
    let apy = (p.y - a.y) as f64;
    let len_sq = abx * abx + aby * aby;
    if len_sq < 1e-12 {
        return apx.hypot(apy);
    }
    let t = ((apx * abx + apy * aby) / len_sq).clamp(0.0, 1.0);
    (apx - t * abx).hypot(apy - t * aby)
}

fn dp_simplify(points: &[PointF], epsilon: f64, out: &mut Vec<PointF>) {
    if points.len() < 3 {
        out.extend_from_slice(&points[..points.len().saturating_sub(1)]);
        return;
    }
    let first = points[0];
    let last = points[points.len() - 1];
    let mut max_dist = 0.0f64;
    let mut max_idx = 0usize;
    for (i, &p) in points.iter().enumerate().skip(1).take(points.len() - 2) {
        let d = point_segment_distance(p, first, last);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }
    if max_dist > epsilon {
        dp_simplify(&points[..=max_idx], epsilon, out);
        dp_simplify(&points[max_idx..], epsilon, out);
    } else {
        out.push(first);
    }
}

/// Douglas-Peucker simplification of a closed boundary.
pub fn approx_poly_dp(points: &[PointF], epsilon: f64) -> Vec<PointF> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    // Split the ring at the two mutually farthest anchors (index 0 and the
    // point farthest from it), simplify both open chains, then rejoin.
    let mut far = 0usize;
    let mut far_dist = -1.0f64;
    for (i, p) in points.iter().enumerate() {
        let d = ((p.x - points[0].x) as f64).hypot((p.y - points[0].y) as f64);
        if d > far_dist {
            far_dist = d;
            far = i;
        }
    }
    if far == 0 {
        return vec![points[0]];
    }

    let first_half: Vec<PointF> = points[0..=far].to_vec();
    let mut second_half: Vec<PointF> = points[far..].to_vec();
    second_half.push(points[0]);

    let mut out = Vec::new();
    dp_simplify(&first_half, epsilon, &mut out);
    dp_simplify(&second_half, epsilon, &mut out);
    out
}

const TRACE_DIRS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Moore-neighbor boundary tracing from the topmost-leftmost region pixel.
fn trace_boundary<F: Fn(i32, i32) -> bool>(
    sx: i32,
    sy: i32,
    max_steps: usize,
    in_region: F,
) -> Vec<(i32, i32)> {
    let mut boundary = vec![(sx, sy)];

    // Entry direction points back toward the previous pixel; the start's
    // virtual predecessor is its west neighbor.
    let mut cur = (sx, sy);
    let mut back_dir = 4usize; // west
    let mut first_move: Option<usize> = None;

    for _ in 0..max_steps {
        let mut moved = false;
        for k in 1..=8usize {
            let d = (back_dir + k) % 8;
            let nx = cur.0 + TRACE_DIRS[d].0;
            let ny = cur.1 + TRACE_DIRS[d].1;
            if in_region(nx, ny) {
                if cur == (sx, sy) {
                    match first_move {
                        None => first_move = Some(d),
                        Some(fm) if fm == d => return boundary, // closed the loop
                        _ => {}
                    }
                }
                cur = (nx, ny);
                back_dir = (d + 4) % 8;
                if cur == (sx, sy) {
                    // Came back to the start; the next iteration decides
                    // whether the loop is closed.
                } else {
                    boundary.push(cur);
                }
                moved = true;
                break;
            }
        }
        if !moved {
            break; // isolated pixel
        }
    }

    boundary
}

/// Extract outer and hole boundaries from a 0/255 mask.
pub fn extract_contours(mask: &GrayImageView<'_>) -> Vec<Contour> {
    let w = mask.width as i32;
    let h = mask.height as i32;
    if w == 0 || h == 0 {
        return Vec::new();
    }

    // Label 8-connected foreground components; remember the scan-order
    // first pixel of each, which is topmost-leftmost.
    let mut labels = vec![0u32; (w * h) as usize];
    let mut seeds: Vec<(i32, i32)> = Vec::new();
    let mut areas: Vec<usize> = Vec::new();
    let mut next_label = 0u32;

    for y in 0..h {
        for x in 0..w {
            let idx = (y * w + x) as usize;
            if mask.data[idx] == 0 || labels[idx] != 0 {
                continue;
            }
            next_label += 1;
            seeds.push((x, y));
            let mut area = 0usize;
            let mut stack = vec![(x, y)];
            labels[idx] = next_label;
            while let Some((px, py)) = stack.pop() {
                area += 1;
                for &(dx, dy) in &TRACE_DIRS {
                    let nx = px + dx;
                    let ny = py + dy;
                    if nx < 0 || ny < 0 || nx >= w || ny >= h {
                        continue;
                    }
                    let nidx = (ny * w + nx) as usize;
                    if mask.data[nidx] != 0 && labels[nidx] == 0 {
                        labels[nidx] = next_label;
                        stack.push((nx, ny));
                    }
                }
            }
            areas.push(area);
        }
    }

    let mut contours: Vec<Contour> = Vec::new();
    let mut outer_index: Vec<usize> = Vec::with_capacity(seeds.len());
    for (label0, &(sx, sy)) in seeds.iter().enumerate() {
        let label = label0 as u32 + 1;
        let max_steps = 4 * areas[label0] + 8;
        let pts = trace_boundary(sx, sy, max_steps, |x, y| {
            x >= 0 && y >= 0 && x < w && y < h && labels[(y * w + x) as usize] == label
        });
        outer_index.push(contours.len());
        contours.push(Contour::outer(
            pts.into_iter()
                .map(|(x, y)| PointF::new(x as f32, y as f32))
                .collect(),
        ));
    }

    // Background 4-connected components: any region not reaching the image
    // border is a hole inside some foreground component.
    let mut bg_labels = vec![0u32; (w * h) as usize];
    let mut bg_next = 0u32;
    for y in 0..h {
        for x in 0..w {
            let idx = (y * w + x) as usize;
            if mask.data[idx] != 0 || bg_labels[idx] != 0 {
                continue;
            }
            bg_next += 1;
            let mut touches_border = false;
            let mut parent_label: Option<u32> = None;
            let mut region: Vec<(i32, i32)> = Vec::new();
            let mut stack = vec![(x, y)];
            bg_labels[idx] = bg_next;
            while let Some((px, py)) = stack.pop() {
                region.push((px, py));
                if px == 0 || py == 0 || px == w - 1 || py == h - 1 {
                    touches_border = true;
                }
                for (dx, dy) in [(1i32, 0i32), (-1, 0), (0, 1), (0, -1)] {
                    let nx = px + dx;
                    let ny = py + dy;
                    if nx < 0 || ny < 0 || nx >= w || ny >= h {
                        continue;
                    }
                    let nidx = (ny * w + nx) as usize;
                    if mask.data[nidx] != 0 {
                        parent_label = Some(labels[nidx]);
                    } else if bg_labels[nidx] == 0 {
                        bg_labels[nidx] = bg_next;
                        stack.push((nx, ny));
                    }
                }
            }

            let (Some(parent), false) = (parent_label, touches_border) else {
                continue;
            };

            // Topmost-leftmost pixel of the hole region.
            let Some(&(hx, hy)) = region.iter().min_by_key(|&&(px, py)| (py, px)) else {
                continue;
            };
            let this_bg = bg_next;
            let pts = trace_boundary(hx, hy, 4 * region.len() + 8, |x, y| {
                x >= 0
                    && y >= 0
                    && x < w
                    && y < h
                    && bg_labels[(y * w + x) as usize] == this_bg
                    && mask.data[(y * w + x) as usize] == 0
            });
            contours.push(Contour {
                points: pts
                    .into_iter()
                    .map(|(x, y)| PointF::new(x as f32, y as f32))
                    .collect(),
                parent: Some(outer_index[parent as usize - 1]),
                is_hole: true,
            });
        }
    }

    contours
}

#[cfg(test)]
mod tests {
    use super::*;
    use kolam_core::GrayImage;

    fn square_mask(size: usize, x0: usize, y0: usize, side: usize) -> GrayImage {
        let mut img = GrayImage::new(size, size);
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                img.set(x, y, 255);
            }
        }
        img
    }

    #[test]
    fn filled_square_yields_one_outer_contour() {
        let mask = square_mask(30, 5, 8, 10);
        let contours = extract_contours(&mask.as_view());
        assert_eq!(1, contours.len());
        let c = &contours[0];
        assert!(c.parent.is_none());
        assert!(!c.is_hole);
        // Boundary through pixel centers of a 10x10 block encloses 9x9.
        assert!((c.area() - 81.0).abs() < 1.0, "area = {}", c.area());
        assert!((c.perimeter() - 36.0).abs() < 2.0);
        let (bx, by, bw, bh) = c.bounding_box();
        assert_eq!((5.0, 8.0, 10.0, 10.0), (bx, by, bw, bh));
    }

    #[test]
    fn ring_produces_outer_and_hole_contours() {
        // 12x12 square with a 4x4 hole in the middle.
        let mut mask = square_mask(30, 6, 6, 12);
        for y in 10..14 {
            for x in 10..14 {
                mask.set(x, y, 0);
            }
        }
        let contours = extract_contours(&mask.as_view());
        assert_eq!(2, contours.len());
        let outer = contours.iter().find(|c| !c.is_hole).expect("outer");
        let hole = contours.iter().find(|c| c.is_hole).expect("hole");
        assert!(outer.parent.is_none());
        assert_eq!(Some(0), hole.parent);
        assert!(hole.area() < outer.area());
    }

    #[test]
    fn square_approximation_has_four_vertices() {
        let mask = square_mask(40, 10, 10, 16);
        let contours = extract_contours(&mask.as_view());
        let verts = contours[0].approx_vertex_count(0.02);
        assert_eq!(4, verts);
    }

    #[test]
    fn convex_hull_of_square_corners() {
        let pts = vec![
            PointF::new(0.0, 0.0),
            PointF::new(4.0, 0.0),
            PointF::new(4.0, 4.0),
            PointF::new(0.0, 4.0),
            PointF::new(2.0, 2.0), // interior
        ];
        let hull = convex_hull(&pts);
        assert_eq!(4, hull.len());
    }

    #[test]
    fn solidity_of_convex_shape_is_near_one() {
        let mask = square_mask(30, 5, 5, 12);
        let contours = extract_contours(&mask.as_view());
        assert!(contours[0].solidity() > 0.95);
    }
}
