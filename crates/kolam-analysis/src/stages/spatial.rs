//! Spatial arrangement of dots and strokes relative to the image center:
//! density clusters, concentric (mandala) layout, cardinal/octagonal
//! orientation, quadrant balance and coverage.

use std::time::Instant;

use log::debug;
use nalgebra::Point2;

use crate::cluster::dbscan_cluster_count;
use crate::error::StageError;
use crate::params::SpatialParams;
use crate::report::{
    round2, std_dev, EnergyFlow, OrientationClass, PointXY, QuadrantBalance, QuadrantCounts,
    SpatialInsights, SpatialReport, StageReport,
};
use crate::stages::{Stage, StageContext, StageKind, StageOutput};

pub struct SpatialStage {
    params: SpatialParams,
}

impl SpatialStage {
    pub fn new(params: SpatialParams) -> Self {
        Self { params }
    }
}

const GOLDEN_RATIO: f64 = 1.618;

impl Stage for SpatialStage {
    fn kind(&self) -> StageKind {
        StageKind::Spatial
    }

    fn run(&self, ctx: &StageContext<'_>) -> Result<StageOutput, StageError> {
        let start = Instant::now();
        let p = &self.params;
        let (w, h) = (ctx.gray.width, ctx.gray.height);
        let center_x = (w / 2) as f64;
        let center_y = (h / 2) as f64;

        let dot_positions: Vec<[f64; 2]> = ctx
            .keypoints
            .iter()
            .map(|kp| [kp.x as f64, kp.y as f64])
            .collect();
        debug!(
            "spatial analysis over {} dots, {} contours",
            dot_positions.len(),
            ctx.contours.len()
        );

        let mut insights = SpatialInsights::default();
        let mut pattern_clusters = 0usize;
        let mut spread_x = 0.0f64;
        let mut spread_y = 0.0f64;
        let mut dot_centroid = PointXY::default();
        let mut avg_center_dist = 0.0f64;
        let mut center_dist_std = 0.0f64;

        if dot_positions.len() >= p.min_dots {
            let f32_positions: Vec<[f32; 2]> = dot_positions
                .iter()
                .map(|p| [p[0] as f32, p[1] as f32])
                .collect();
            pattern_clusters =
                dbscan_cluster_count(&f32_positions, p.cluster_eps, p.cluster_min_samples);

            let xs: Vec<f64> = dot_positions.iter().map(|p| p[0]).collect();
            let ys: Vec<f64> = dot_positions.iter().map(|p| p[1]).collect();
            spread_x = std_dev(&xs);
            spread_y = std_dev(&ys);
            dot_centroid = PointXY {
                x: (xs.iter().sum::<f64>() / xs.len() as f64) as i64,
                y: (ys.iter().sum::<f64>() / ys.len() as f64) as i64,
            };

            // Few distinct pairwise distances indicate a deliberately
            // constructed (sacred-geometry) layout.
            if dot_positions.len() >= 5 {
                let mut rounded: Vec<i64> = Vec::new();
                for i in 0..dot_positions.len() {
                    for j in i + 1..dot_positions.len() {
                        let dx = dot_positions[i][0] - dot_positions[j][0];
                        let dy = dot_positions[i][1] - dot_positions[j][1];
                        rounded.push((dx.hypot(dy) * 10.0).round() as i64);
                    }
                }
                rounded.sort_unstable();
                rounded.dedup();
                if rounded.len() <= 3 {
                    insights.sacred_geometry_presence = true;
                }
            }

            let center_dists: Vec<f64> = dot_positions
                .iter()
                .map(|pt| (pt[0] - center_x).hypot(pt[1] - center_y))
                .collect();
            avg_center_dist = center_dists.iter().sum::<f64>() / center_dists.len() as f64;
            center_dist_std = std_dev(&center_dists);

            if center_dist_std < avg_center_dist * p.mandala_std_frac
                && dot_positions.len() > p.mandala_min_dots
            {
                insights.mandala_structure = true;
            }

            if w > 0 && h > 0 {
                let aspect = w.max(h) as f64 / w.min(h) as f64;
                if (aspect - GOLDEN_RATIO).abs() < p.golden_ratio_tolerance {
                    insights.golden_ratio_proportions = true;
                }
            }

            if (spread_x - spread_y).abs() < spread_x.min(spread_y) * 0.2 {
                insights.cardinal_direction_alignment = true;
            }
        }

        // Contour centroids drive orientation, quadrant balance and
        // coverage; tiny fragments are ignored.
        let mut centroids: Vec<Point2<f64>> = Vec::new();
        let mut areas: Vec<f64> = Vec::new();
        for contour in ctx.contours {
            let area = contour.area();
            if area > 10.0 {
                let c = contour.centroid();
                centroids.push(Point2::new(c.x as f64, c.y as f64));
                areas.push(area);
            }
        }

        let contour_centroid = if centroids.is_empty() {
            PointXY::default()
        } else {
            PointXY {
                x: (centroids.iter().map(|c| c.x).sum::<f64>() / centroids.len() as f64) as i64,
                y: (centroids.iter().map(|c| c.y).sum::<f64>() / centroids.len() as f64) as i64,
            }
        };

        let angles: Vec<f64> = centroids
            .iter()
            .map(|c| (c.y - center_y).atan2(c.x - center_x).to_degrees())
            .collect();

        let orientation = if angles.is_empty() {
            OrientationClass::Unaligned
        } else {
            let cardinal = [0.0f64, 90.0, 180.0, 270.0, -90.0, -180.0];
            let cardinal_hits = angles
                .iter()
                .filter(|&&a| {
                    cardinal
                        .iter()
                        .any(|&c| (a - c).abs() < p.cardinal_tolerance_deg)
                })
                .count();
            let octagonal = [0.0f64, 45.0, 90.0, 135.0, 180.0, 225.0, 270.0, 315.0, -45.0,
                -90.0, -135.0, -180.0];
            let octagonal_hits = angles
                .iter()
                .filter(|&&a| {
                    octagonal
                        .iter()
                        .any(|&c| (a - c).abs() < p.octagonal_tolerance_deg)
                })
                .count();

            if cardinal_hits as f64 > angles.len() as f64 * p.cardinal_fraction {
                OrientationClass::Cardinal
            } else if octagonal_hits as f64 > angles.len() as f64 * p.octagonal_fraction {
                OrientationClass::Octagonal
            } else {
                OrientationClass::Unaligned
            }
        };

        let radial: Vec<f64> = centroids
            .iter()
            .map(|c| (c.x - center_x).hypot(c.y - center_y))
            .collect();
        let energy_flow = if radial.is_empty() {
            EnergyFlow::Unknown
        } else {
            let mean = radial.iter().sum::<f64>() / radial.len() as f64;
            let std = std_dev(&radial);
            let max = radial.iter().cloned().fold(0.0f64, f64::max);
            if std * std < mean * 0.1 {
                EnergyFlow::Concentric
            } else if max > mean * 2.0 {
                EnergyFlow::Radiating
            } else {
                EnergyFlow::Balanced
            }
        };

        // Quadrants in image coordinates: north is up (smaller y).
        let mut quadrant_counts = QuadrantCounts::default();
        for c in &centroids {
            match (c.x >= center_x, c.y < center_y) {
                (true, true) => quadrant_counts.northeast += 1,
                (false, true) => quadrant_counts.northwest += 1,
                (false, false) => quadrant_counts.southwest += 1,
                (true, false) => quadrant_counts.southeast += 1,
            }
        }
        let quadrant_balance = if centroids.len() >= p.min_centroids_for_balance {
            let counts = [
                quadrant_counts.northeast as f64,
                quadrant_counts.northwest as f64,
                quadrant_counts.southwest as f64,
                quadrant_counts.southeast as f64,
            ];
            let s = std_dev(&counts);
            let variance = s * s;
            if variance < 1.0 {
                QuadrantBalance::Perfect
            } else if variance < 4.0 {
                QuadrantBalance::Good
            } else {
                QuadrantBalance::Artistic
            }
        } else {
            QuadrantBalance::Unknown
        };

        let total_area = (w * h) as f64;
        let pattern_coverage = if total_area > 0.0 {
            (areas.iter().sum::<f64>() / total_area * 100.0).min(100.0)
        } else {
            0.0
        };

        let center_alignment =
            100.0 - (100.0f64).min(avg_center_dist / w.max(h).max(1) as f64 * 200.0);
        let distribution_uniformity = if spread_x.max(spread_y) > 0.0 {
            100.0 - (spread_x - spread_y).abs() / spread_x.max(spread_y).max(1.0) * 100.0
        } else {
            100.0
        };
        let radial_harmony = if avg_center_dist > 0.0 {
            100.0 - (100.0f64).min(center_dist_std / avg_center_dist.max(1.0) * 100.0)
        } else {
            100.0
        };

        let report = SpatialReport {
            dot_centroid,
            contour_centroid,
            pattern_clusters,
            horizontal_spread: round2(spread_x),
            vertical_spread: round2(spread_y),
            pattern_coverage: round2(pattern_coverage),
            center_alignment: round2(center_alignment),
            distribution_uniformity: round2(distribution_uniformity),
            radial_harmony: round2(radial_harmony),
            insights,
            orientation,
            energy_flow,
            quadrant_balance,
            quadrant_counts,
            analysis_time: round2(start.elapsed().as_secs_f64()),
            error: None,
        };

        Ok(StageOutput::report_only(StageReport::Spatial(report)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::PipelineParams;
    use crate::types::Keypoint;
    use kolam_core::GrayImage;
    use kolam_vision::Contour;

    fn run_stage(
        img: &GrayImage,
        keypoints: &[Keypoint],
        contours: &[Contour],
    ) -> SpatialReport {
        let stage = SpatialStage::new(PipelineParams::default().spatial);
        let ctx = StageContext {
            gray: img,
            keypoints,
            contours,
            overall_symmetry: 0.0,
        };
        let output = stage.run(&ctx).expect("spatial stage");
        match output.report {
            StageReport::Spatial(r) => r,
            other => panic!("unexpected report {:?}", other.kind()),
        }
    }

    fn ring_of_dots(cx: f32, cy: f32, r: f32, n: usize) -> Vec<Keypoint> {
        (0..n)
            .map(|i| {
                let a = i as f32 / n as f32 * std::f32::consts::TAU;
                Keypoint::new(cx + r * a.cos(), cy + r * a.sin(), 5.0, 0.9)
            })
            .collect()
    }

    #[test]
    fn below_minimum_dots_everything_degrades_to_neutral() {
        let img = GrayImage::new(200, 200);
        let dots = vec![
            Keypoint::new(50.0, 50.0, 4.0, 0.8),
            Keypoint::new(150.0, 50.0, 4.0, 0.8),
        ];
        let report = run_stage(&img, &dots, &[]);
        assert_eq!(0, report.pattern_clusters);
        assert!(!report.insights.mandala_structure);
        assert_eq!(0.0, report.horizontal_spread);
        assert_eq!(QuadrantBalance::Unknown, report.quadrant_balance);
        assert_eq!(EnergyFlow::Unknown, report.energy_flow);
        // No dot positions measured: the harmony defaults stay at 100.
        assert_eq!(100.0, report.radial_harmony);
    }

    #[test]
    fn concentric_ring_of_dots_reads_as_mandala() {
        let img = GrayImage::new(200, 200);
        let dots = ring_of_dots(100.0, 100.0, 60.0, 12);
        let report = run_stage(&img, &dots, &[]);
        assert!(report.insights.mandala_structure);
        assert!(report.radial_harmony > 95.0);
        // A single dense ring with 50 px reach clusters together.
        assert_eq!(1, report.pattern_clusters);
    }

    #[test]
    fn grid_of_dots_is_not_a_mandala() {
        let img = GrayImage::new(400, 400);
        let mut dots = Vec::new();
        for j in 0..4 {
            for i in 0..4 {
                dots.push(Keypoint::new(
                    50.0 + i as f32 * 100.0,
                    50.0 + j as f32 * 100.0,
                    5.0,
                    0.9,
                ));
            }
        }
        let report = run_stage(&img, &dots, &[]);
        assert!(!report.insights.mandala_structure);
        assert!(report.insights.cardinal_direction_alignment);
    }

    #[test]
    fn golden_ratio_canvas_is_flagged() {
        let img = GrayImage::new(324, 200); // 1.62 aspect
        let dots = ring_of_dots(100.0, 100.0, 40.0, 10);
        let report = run_stage(&img, &dots, &[]);
        assert!(report.insights.golden_ratio_proportions);
    }
}
