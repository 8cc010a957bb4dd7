//! Dot-grid detection and statistics.
//!
//! Three cheap detectors run independently over the grayscale image and
//! their candidates are fused: cap by confidence, then greedy proximity
//! dedup. The surviving keypoints seed the spatial stage and everything
//! here degrades to sentinels when too few dots are present.

use std::time::Instant;

use kiddo::{KdTree, SquaredEuclidean};
use log::{debug, info};

use kolam_vision::{detect_blobs, detect_circles, match_ring_templates};

use crate::cluster::kmeans;
use crate::error::StageError;
use crate::params::DotParams;
use crate::report::{
    round2, std_dev, ClusterPatterns, ConfidenceHistogram, DetectionMethodCounts,
    DotAdvancedMetrics, DotCharacteristics, DotRecord, DotReport, GridSpacingReport,
    KeypointSymmetryIndices, SizeHistogram, StageReport,
};
use crate::stages::{Stage, StageArtifacts, StageContext, StageKind, StageOutput};
use crate::types::Keypoint;

pub struct DotStage {
    params: DotParams,
}

impl DotStage {
    pub fn new(params: DotParams) -> Self {
        Self { params }
    }
}

impl Stage for DotStage {
    fn kind(&self) -> StageKind {
        StageKind::Dots
    }

    fn run(&self, ctx: &StageContext<'_>) -> Result<StageOutput, StageError> {
        let start = Instant::now();
        let p = &self.params;
        let view = ctx.gray.as_view();
        let (w, h) = (view.width, view.height);

        let blob_kps: Vec<Keypoint> = detect_blobs(&view, &p.blob)
            .into_iter()
            .map(|b| Keypoint::new(b.x, b.y, b.diameter, b.response))
            .collect();

        let max_radius = p.hough.max_radius.max(1) as f32;
        let hough_kps: Vec<Keypoint> = detect_circles(&view, &p.hough)
            .into_iter()
            .filter(|c| c.x >= 0.0 && c.y >= 0.0 && (c.x as usize) < w && (c.y as usize) < h)
            .map(|c| {
                Keypoint::new(c.x, c.y, c.radius * 2.0, (c.radius / max_radius).min(1.0))
            })
            .collect();

        let template_kps: Vec<Keypoint> = match_ring_templates(&view, &p.template)
            .into_iter()
            .map(|m| Keypoint::new(m.x, m.y, m.radius * 2.0, m.score))
            .collect();

        debug!(
            "dot detectors: blob={} hough={} template={}",
            blob_kps.len(),
            hough_kps.len(),
            template_kps.len()
        );

        let mut all: Vec<Keypoint> = Vec::new();
        all.extend_from_slice(&blob_kps);
        all.extend_from_slice(&hough_kps);
        all.extend_from_slice(&template_kps);
        let total_before = all.len();

        if all.len() > p.merge_cap {
            all.sort_by(|a, b| {
                b.confidence
                    .partial_cmp(&a.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            all.truncate(p.merge_cap);
        }

        let mut keypoints = dedup_keypoints(&all, p.dedup_radius);
        keypoints.truncate(p.max_dots);
        info!("dot analysis accepted {} unique dots", keypoints.len());

        let dots: Vec<DotRecord> = keypoints
            .iter()
            .enumerate()
            .map(|(i, kp)| DotRecord {
                id: i + 1,
                x: kp.x as i64,
                y: kp.y as i64,
                size: round2(kp.size as f64),
                confidence: round2(kp.confidence as f64),
                estimated_radius: round2(kp.size as f64 / 2.0),
                x_percent: round2(kp.x as f64 / w as f64 * 100.0),
                y_percent: round2(kp.y as f64 / h as f64 * 100.0),
            })
            .collect();

        let characteristics = characteristics(&keypoints, w, h, p);
        let grid_spacing = grid_spacing(&keypoints);
        let advanced_metrics = advanced_metrics(&keypoints, w, h);

        let report = DotReport {
            dots,
            detection_methods: DetectionMethodCounts {
                blob_detection: blob_kps.len(),
                hough_circles: hough_kps.len(),
                template_matching: template_kps.len(),
                total_before_filtering: total_before,
                final_unique_dots: keypoints.len(),
            },
            characteristics,
            grid_spacing,
            advanced_metrics,
            analysis_time: round2(start.elapsed().as_secs_f64()),
            error: None,
        };

        Ok(StageOutput {
            report: StageReport::Dots(report),
            artifacts: StageArtifacts {
                keypoints: Some(keypoints),
                ..StageArtifacts::default()
            },
        })
    }
}

/// Greedy proximity dedup: keep a candidate only when no already-kept
/// candidate lies within `radius` pixels. Iteration order is the incoming
/// order, so confidence-sorted input keeps the strongest representative.
/// Idempotent over an already-deduplicated set.
pub fn dedup_keypoints(candidates: &[Keypoint], radius: f32) -> Vec<Keypoint> {
    let mut kept: Vec<Keypoint> = Vec::new();
    for kp in candidates {
        let duplicate = kept.iter().any(|k| k.distance_to(kp) < radius);
        if !duplicate {
            kept.push(*kp);
        }
    }
    kept
}

fn pairwise_distances(keypoints: &[Keypoint]) -> Vec<f64> {
    let mut out = Vec::new();
    for i in 0..keypoints.len() {
        for j in i + 1..keypoints.len() {
            out.push(keypoints[i].distance_to(&keypoints[j]) as f64);
        }
    }
    out
}

/// Grid spacing from each dot's nearest-neighbor distance. On a regular
/// grid every dot's nearest neighbor sits one grid step away, so the mean
/// recovers the step and the consistency score `1/(1+std/mean)`
/// approaches 1.
fn grid_spacing(keypoints: &[Keypoint]) -> GridSpacingReport {
    if keypoints.len() < 2 {
        return GridSpacingReport::InsufficientDots;
    }

    let mut nearest: Vec<f64> = Vec::with_capacity(keypoints.len());
    for (i, kp) in keypoints.iter().enumerate() {
        let mut best = f64::MAX;
        for (j, other) in keypoints.iter().enumerate() {
            if i != j {
                best = best.min(kp.distance_to(other) as f64);
            }
        }
        nearest.push(best);
    }

    let mean = nearest.iter().sum::<f64>() / nearest.len() as f64;
    let std = std_dev(&nearest);
    let consistency = if mean > 0.0 { 1.0 / (1.0 + std / mean) } else { 0.0 };
    GridSpacingReport::Measured {
        mean_spacing: round2(mean),
        std_dev_spacing: round2(std),
        consistency_score: round2(consistency),
    }
}

fn characteristics(
    keypoints: &[Keypoint],
    w: usize,
    h: usize,
    params: &DotParams,
) -> DotCharacteristics {
    if keypoints.is_empty() {
        return DotCharacteristics::default();
    }

    let sizes: Vec<f64> = keypoints.iter().map(|k| k.size as f64).collect();

    let mut size_distribution = SizeHistogram::default();
    for &s in &sizes {
        if s < 10.0 {
            size_distribution.tiny += 1;
        } else if s < 20.0 {
            size_distribution.small += 1;
        } else if s < 40.0 {
            size_distribution.medium += 1;
        } else {
            size_distribution.large += 1;
        }
    }

    let mut confidence_distribution = ConfidenceHistogram::default();
    for kp in keypoints {
        let c = kp.confidence;
        if c > 0.7 {
            confidence_distribution.high_confidence += 1;
        } else if c >= 0.4 {
            confidence_distribution.medium_confidence += 1;
        } else {
            confidence_distribution.low_confidence += 1;
        }
    }

    let positions: Vec<[f32; 2]> = keypoints.iter().map(|k| [k.x, k.y]).collect();

    let geometric_patterns = if positions.len() > 3 {
        let k = params.max_clusters.min(positions.len() / 3);
        if k > 1 {
            kmeans(&positions, k, 10).map(|result| {
                let sizes_f: Vec<f64> = result.sizes.iter().map(|&s| s as f64).collect();
                let mean_size = sizes_f.iter().sum::<f64>() / sizes_f.len() as f64;
                let regularity = 1.0 - std_dev(&sizes_f) / mean_size.max(1.0);
                ClusterPatterns {
                    cluster_count: k,
                    cluster_sizes: result.sizes.clone(),
                    cluster_regularity: round2(regularity),
                    centroid_symmetry: round2(centroid_symmetry(&result.centers, w, h)),
                }
            })
        } else {
            None
        }
    } else {
        None
    };

    let fractal_dimension = if positions.len() > 10 {
        round2(fractal_dimension(&positions, w, h, &params.fractal_scales))
    } else {
        0.0
    };

    let pattern_regularity = if positions.len() > 2 {
        let dists = pairwise_distances(keypoints);
        let mean = dists.iter().sum::<f64>() / dists.len() as f64;
        let std = std_dev(&dists);
        round2(1.0 - (std / mean.max(1.0)).min(1.0))
    } else {
        0.0
    };

    let symmetry_indices = if positions.len() > 4 {
        Some(symmetry_indices(&positions, w, h, params))
    } else {
        None
    };

    let uniformity_score = if sizes.len() > 1 {
        let mean = sizes.iter().sum::<f64>() / sizes.len() as f64;
        let cv = if mean > 0.0 { std_dev(&sizes) / mean } else { 0.0 };
        round2((100.0 - cv * 100.0).max(0.0))
    } else {
        100.0
    };

    DotCharacteristics {
        size_distribution,
        confidence_distribution,
        geometric_patterns,
        fractal_dimension,
        pattern_regularity,
        symmetry_indices,
        uniformity_score,
    }
}

fn centroid_symmetry(centers: &[[f32; 2]], w: usize, h: usize) -> f64 {
    if centers.len() < 2 {
        return 1.0;
    }
    let cx = (w / 2) as f64;
    let cy = (h / 2) as f64;
    let dists: Vec<f64> = centers
        .iter()
        .map(|c| ((c[0] as f64 - cx).powi(2) + (c[1] as f64 - cy).powi(2)).sqrt())
        .collect();
    let mean = dists.iter().sum::<f64>() / dists.len() as f64;
    1.0 - std_dev(&dists) / mean.max(1.0)
}

/// Box-counting estimate over the configured scales: the negated slope of
/// the log-log occupancy fit. Degenerate fits fall back to 1.5, the
/// expectation for an unstructured point scatter.
fn fractal_dimension(positions: &[[f32; 2]], w: usize, h: usize, scales: &[u32; 5]) -> f64 {
    let mut log_scales = Vec::with_capacity(scales.len());
    let mut log_counts = Vec::with_capacity(scales.len());

    for &scale in scales {
        let scale = scale as usize;
        if scale == 0 || w < scale || h < scale {
            continue;
        }
        let boxes_x = (w / scale).max(1);
        let boxes_y = (h / scale).max(1);
        let mut occupied = std::collections::HashSet::new();
        for p in positions {
            let bx = ((p[0] as usize) / scale).min(boxes_x - 1);
            let by = ((p[1] as usize) / scale).min(boxes_y - 1);
            occupied.insert((bx, by));
        }
        if occupied.is_empty() {
            return 1.5;
        }
        log_scales.push((scale as f64).ln());
        log_counts.push((occupied.len() as f64).ln());
    }

    if log_scales.len() < 2 {
        return 1.5;
    }

    let n = log_scales.len() as f64;
    let mean_x = log_scales.iter().sum::<f64>() / n;
    let mean_y = log_counts.iter().sum::<f64>() / n;
    let mut num = 0.0;
    let mut den = 0.0;
    for (x, y) in log_scales.iter().zip(log_counts.iter()) {
        num += (x - mean_x) * (y - mean_y);
        den += (x - mean_x) * (x - mean_x);
    }
    if den <= 0.0 {
        return 1.5;
    }
    -(num / den)
}

fn match_fraction(tree: &KdTree<f32, 2>, targets: &[[f32; 2]], tolerance: f32) -> f64 {
    let tol_sq = tolerance * tolerance;
    let mut matches = 0usize;
    for t in targets {
        let nearest = tree.nearest_n::<SquaredEuclidean>(t, 1);
        if nearest.first().is_some_and(|nn| nn.distance <= tol_sq) {
            matches += 1;
        }
    }
    matches as f64 / targets.len().max(1) as f64
}

fn symmetry_indices(
    positions: &[[f32; 2]],
    w: usize,
    h: usize,
    params: &DotParams,
) -> KeypointSymmetryIndices {
    let cx = (w / 2) as f32;
    let cy = (h / 2) as f32;
    let tolerance = (params.symmetry_tolerance_frac * w.min(h) as f32)
        .max(params.symmetry_tolerance_min_px);

    let mut tree: KdTree<f32, 2> = KdTree::new();
    for (i, p) in positions.iter().enumerate() {
        tree.add(p, i as u64);
    }

    // Reflection about the horizontal axis (y mirrored).
    let reflected_h: Vec<[f32; 2]> = positions
        .iter()
        .map(|p| [p[0], 2.0 * cy - p[1]])
        .collect();
    // Reflection about the vertical axis (x mirrored).
    let reflected_v: Vec<[f32; 2]> = positions
        .iter()
        .map(|p| [2.0 * cx - p[0], p[1]])
        .collect();

    let rotate = |deg: f32| -> Vec<[f32; 2]> {
        let (sin_a, cos_a) = deg.to_radians().sin_cos();
        positions
            .iter()
            .map(|p| {
                let dx = p[0] - cx;
                let dy = p[1] - cy;
                [
                    dx * cos_a - dy * sin_a + cx,
                    dx * sin_a + dy * cos_a + cy,
                ]
            })
            .collect()
    };

    KeypointSymmetryIndices {
        horizontal_reflection: round2(match_fraction(&tree, &reflected_h, tolerance)),
        vertical_reflection: round2(match_fraction(&tree, &reflected_v, tolerance)),
        rot_60: round2(match_fraction(&tree, &rotate(60.0), tolerance)),
        rot_90: round2(match_fraction(&tree, &rotate(90.0), tolerance)),
        rot_120: round2(match_fraction(&tree, &rotate(120.0), tolerance)),
        rot_180: round2(match_fraction(&tree, &rotate(180.0), tolerance)),
    }
}

fn advanced_metrics(keypoints: &[Keypoint], w: usize, h: usize) -> DotAdvancedMetrics {
    if keypoints.is_empty() {
        return DotAdvancedMetrics::default();
    }

    let confidences: Vec<f64> = keypoints.iter().map(|k| k.confidence as f64).collect();
    let sizes: Vec<f64> = keypoints.iter().map(|k| k.size as f64).collect();

    let confidence_avg = confidences.iter().sum::<f64>() / confidences.len() as f64;
    let size_consistency = if sizes.len() > 1 {
        let mean = sizes.iter().sum::<f64>() / sizes.len() as f64;
        1.0 - std_dev(&sizes) / mean.max(1.0)
    } else {
        1.0
    };

    DotAdvancedMetrics {
        detection_confidence_avg: round2(confidence_avg),
        size_consistency_index: round2(size_consistency),
        spatial_entropy: round2(spatial_entropy(keypoints, w, h)),
    }
}

/// Normalized Shannon entropy of dot occupancy over an 8x8 grid.
fn spatial_entropy(keypoints: &[Keypoint], w: usize, h: usize) -> f64 {
    if keypoints.len() < 2 {
        return 0.0;
    }
    const GRID: usize = 8;
    let cell_w = (w / GRID).max(1);
    let cell_h = (h / GRID).max(1);
    let mut grid = [0usize; GRID * GRID];
    for kp in keypoints {
        let gx = ((kp.x as usize) / cell_w).min(GRID - 1);
        let gy = ((kp.y as usize) / cell_h).min(GRID - 1);
        grid[gy * GRID + gx] += 1;
    }

    let total = keypoints.len() as f64;
    let mut entropy = 0.0;
    let mut nonzero = 0usize;
    for &count in &grid {
        if count == 0 {
            continue;
        }
        nonzero += 1;
        let p = count as f64 / total;
        entropy -= p * p.log2();
    }
    if nonzero <= 1 {
        return 0.0;
    }
    entropy / ((GRID * GRID) as f64).log2()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kp(x: f32, y: f32) -> Keypoint {
        Keypoint::new(x, y, 6.0, 0.8)
    }

    #[test]
    fn dedup_drops_near_neighbors_and_is_idempotent() {
        let candidates = vec![kp(10.0, 10.0), kp(13.0, 10.0), kp(40.0, 40.0)];
        let once = dedup_keypoints(&candidates, 8.0);
        assert_eq!(2, once.len());
        let twice = dedup_keypoints(&once, 8.0);
        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(twice.iter()) {
            assert_eq!(a.x, b.x);
            assert_eq!(a.y, b.y);
        }
    }

    #[test]
    fn grid_spacing_sentinel_below_two_dots() {
        assert!(matches!(
            grid_spacing(&[kp(5.0, 5.0)]),
            GridSpacingReport::InsufficientDots
        ));
    }

    #[test]
    fn grid_spacing_of_a_perfect_pair() {
        let report = grid_spacing(&[kp(0.0, 0.0), kp(100.0, 0.0)]);
        let GridSpacingReport::Measured {
            mean_spacing,
            std_dev_spacing,
            consistency_score,
        } = report
        else {
            panic!("expected measured spacing");
        };
        assert_eq!(100.0, mean_spacing);
        assert_eq!(0.0, std_dev_spacing);
        assert_eq!(1.0, consistency_score);
    }

    #[test]
    fn symmetric_grid_scores_full_reflection_indices() {
        // 3x3 grid centered in a 400x400 image, spacing 100.
        let mut positions = Vec::new();
        for j in 0..3 {
            for i in 0..3 {
                positions.push([100.0 + i as f32 * 100.0, 100.0 + j as f32 * 100.0]);
            }
        }
        let params = DotParams::default();
        let idx = symmetry_indices(&positions, 400, 400, &params);
        assert!(idx.horizontal_reflection > 0.99);
        assert!(idx.vertical_reflection > 0.99);
        assert!(idx.rot_90 > 0.99);
        assert!(idx.rot_180 > 0.99);
    }

    #[test]
    fn fractal_dimension_of_a_filled_scatter_is_positive() {
        let mut positions = Vec::new();
        for j in 0..20 {
            for i in 0..20 {
                positions.push([i as f32 * 20.0 + 3.0, j as f32 * 20.0 + 7.0]);
            }
        }
        let fd = fractal_dimension(&positions, 400, 400, &[2, 4, 8, 16, 32]);
        assert!(fd > 0.5 && fd < 2.5, "fd = {fd}");
    }

    #[test]
    fn entropy_is_high_for_spread_and_zero_for_single_cell() {
        let spread: Vec<Keypoint> = (0..8)
            .flat_map(|j| (0..8).map(move |i| kp(i as f32 * 50.0 + 10.0, j as f32 * 50.0 + 10.0)))
            .collect();
        assert!(spatial_entropy(&spread, 400, 400) > 0.9);

        let packed = vec![kp(10.0, 10.0), kp(12.0, 11.0), kp(11.0, 13.0)];
        assert_eq!(0.0, spatial_entropy(&packed, 400, 400));
    }
}
