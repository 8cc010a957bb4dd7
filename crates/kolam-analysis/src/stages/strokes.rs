//! Stroke and contour geometry.
//!
//! Edge detection runs at five sensitivity levels; contours fused from
//! every level plus the Otsu-binarized skeleton are deduplicated by
//! Hu-descriptor distance, then classified into culturally loaded shape
//! categories. The skeleton also yields the topology metrics (cycles,
//! single-stroke traceability) kolam patterns are known for.

use std::time::Instant;

use log::{debug, info};

use kolam_vision::{
    binarize, detect_edges, extract_contours, hough_lines, hough_lines_p, hu_distance,
    hu_moments, open_rect, otsu_threshold, skeletonize, Contour, HoughLineParams,
    HoughLinePParams, Polarity,
};

use crate::error::StageError;
use crate::graph::SkeletonGraph;
use crate::params::StrokeParams;
use crate::report::{
    round2, std_dev, ArtisticFlow, ArtisticStyle, LineDetectionStats, PrecisionLevel,
    ShapeCounts, SkillLevel, StageReport, StrokeAuthenticity, StrokeBreakdown, StrokeReport,
    StrokeRhythm, TechniqueAssessment,
};
use crate::stages::{Stage, StageArtifacts, StageContext, StageKind, StageOutput};

pub struct StrokeStage {
    params: StrokeParams,
}

impl StrokeStage {
    pub fn new(params: StrokeParams) -> Self {
        Self { params }
    }
}

fn count_set(img: &kolam_core::GrayImage) -> usize {
    img.data.iter().filter(|&&v| v > 0).count()
}

impl Stage for StrokeStage {
    fn kind(&self) -> StageKind {
        StageKind::Strokes
    }

    fn run(&self, ctx: &StageContext<'_>) -> Result<StageOutput, StageError> {
        let start = Instant::now();
        let p = &self.params;
        let view = ctx.gray.as_view();
        let (w, h) = (view.width, view.height);

        let edge_maps: Vec<kolam_core::GrayImage> = p
            .edge_levels
            .iter()
            .map(|&(low, high)| detect_edges(&view, low, high))
            .collect();

        let threshold = otsu_threshold(&view);
        let binary = binarize(&view, threshold, Polarity::Bright);
        let skeleton = skeletonize(&binary.as_view());
        let topology = SkeletonGraph::from_mask(&skeleton.as_view()).metrics();

        let mut all_contours: Vec<Contour> = Vec::new();
        for map in &edge_maps {
            all_contours.extend(extract_contours(&map.as_view()));
        }
        all_contours.extend(extract_contours(&skeleton.as_view()));
        let contours_found = all_contours.len();
        debug!("fused {contours_found} raw contours across edge levels");

        // Area/perimeter window plus Hu-descriptor dedup against every
        // already-kept contour.
        let max_area = p.max_area_frac * (w * h) as f64;
        let mut kept: Vec<Contour> = Vec::new();
        let mut kept_hu: Vec<[f64; 7]> = Vec::new();
        for contour in all_contours {
            let area = contour.area();
            let perimeter = contour.perimeter();
            if area <= p.min_area || area >= max_area || perimeter <= p.min_perimeter {
                continue;
            }
            let hu = hu_moments(&contour.points);
            let duplicate = kept_hu
                .iter()
                .any(|k| hu_distance(k, &hu) < p.shape_duplicate_distance);
            if !duplicate {
                kept.push(contour);
                kept_hu.push(hu);
            }
        }

        let med_edges = edge_maps[2].as_view();
        let low_edges = edge_maps[1].as_view();
        let high_edges = edge_maps[3].as_view();
        let detection_stats = LineDetectionStats {
            edge_pixels_ultra_low: count_set(&edge_maps[0]),
            edge_pixels_low: count_set(&edge_maps[1]),
            edge_pixels_medium: count_set(&edge_maps[2]),
            edge_pixels_high: count_set(&edge_maps[3]),
            edge_pixels_ultra_high: count_set(&edge_maps[4]),
            hough_lines_standard: hough_lines(&med_edges, &HoughLineParams { threshold: 50 })
                .len(),
            hough_lines_sensitive: hough_lines(&low_edges, &HoughLineParams { threshold: 30 })
                .len(),
            houghp_long_segments: hough_lines_p(
                &med_edges,
                &HoughLinePParams {
                    threshold: 50,
                    min_line_length: 50.0,
                    max_line_gap: 10.0,
                },
            )
            .len(),
            houghp_short_segments: hough_lines_p(
                &high_edges,
                &HoughLinePParams {
                    threshold: 30,
                    min_line_length: 20.0,
                    max_line_gap: 5.0,
                },
            )
            .len(),
            houghp_gap_segments: hough_lines_p(
                &low_edges,
                &HoughLinePParams {
                    threshold: 40,
                    min_line_length: 30.0,
                    max_line_gap: 20.0,
                },
            )
            .len(),
            horizontal_line_pixels: count_set(&open_rect(&med_edges, p.morph_line_length, 1)),
            vertical_line_pixels: count_set(&open_rect(&med_edges, 1, p.morph_line_length)),
            contours_found,
            contours_after_filtering: kept.len(),
        };

        let mut breakdown = StrokeBreakdown::default();
        let mut shapes = ShapeCounts::default();
        let mut symbolic: Vec<String> = Vec::new();
        let mut complexities: Vec<f64> = Vec::new();
        let mut classified_lengths: Vec<f64> = Vec::new();
        let total_length: f64 = kept.iter().map(|c| c.perimeter()).sum();

        for contour in &kept {
            let area = contour.area();
            if area <= p.classify_min_area {
                continue;
            }
            let perimeter = contour.perimeter();
            let vertices = contour.approx_vertex_count(p.approx_epsilon_frac);
            let circularity = contour.circularity();
            let solidity = contour.solidity();
            let aspect = contour.aspect_ratio();

            if contour.parent.is_none() {
                breakdown.continuous_strokes += 1;
            } else {
                breakdown.broken_strokes += 1;
            }

            if circularity > 0.7 {
                breakdown.curved_lines += 1;
                shapes.circles += 1;
                symbolic.push("Circle: completeness and cosmic unity".to_string());
            } else if vertices <= 4 {
                breakdown.straight_lines += 1;
            }

            match vertices {
                3 => {
                    shapes.triangles += 1;
                    symbolic.push("Triangle: the divine trinity".to_string());
                }
                4 => {
                    shapes.rectangles += 1;
                    symbolic.push("Rectangle: earth element and stability".to_string());
                }
                5..=8 => {
                    shapes.polygons += 1;
                    symbolic.push(format!("{vertices}-sided polygon: sacred geometric form"));
                }
                v if v > 8 => {
                    if circularity > 0.5 {
                        shapes.mandala_rings += 1;
                        symbolic.push("Mandala ring: cosmic cycles".to_string());
                    } else {
                        shapes.complex_shapes += 1;
                    }
                }
                _ => {}
            }

            if solidity > 0.3 && solidity < 0.8 && aspect > 1.5 && aspect < 4.0 {
                shapes.lotus_petals += 1;
                symbolic.push("Lotus petal: purity and awakening".to_string());
            } else if solidity < 0.6 && aspect > 0.8 && aspect < 2.5 {
                shapes.paisley_forms += 1;
                symbolic.push("Paisley: life force and fertility".to_string());
            }

            if perimeter > 0.0 && area / perimeter > 3.0 {
                breakdown.thick_strokes += 1;
            } else {
                breakdown.thin_strokes += 1;
            }

            if area < 500.0 && vertices > 6 {
                breakdown.decorative_elements += 1;
            }

            let mut complexity = vertices as f64 + perimeter / 100.0;
            if vertices == 3 {
                complexity += 2.0;
            } else if circularity > 0.8 {
                complexity += 3.0;
            } else if vertices == 8 {
                complexity += 4.0;
            }
            complexities.push(complexity);
            classified_lengths.push(perimeter);
        }

        let stroke_count = classified_lengths.len();

        let stroke_rhythm = if classified_lengths.is_empty() {
            StrokeRhythm::default()
        } else {
            let mean = classified_lengths.iter().sum::<f64>() / classified_lengths.len() as f64;
            let std = std_dev(&classified_lengths);
            let consistency = if mean > 0.0 {
                100.0 - (100.0f64).min(std / mean * 100.0 / 2.0)
            } else {
                100.0
            };
            StrokeRhythm {
                average_stroke_length: round2(mean),
                stroke_length_variance: round2(std * std),
                rhythm_consistency: round2(consistency),
            }
        };

        let technique = if stroke_count > 0 {
            let continuous_ratio = breakdown.continuous_strokes as f64 / stroke_count as f64;
            let classical = shapes.circles + shapes.triangles;
            let traditional = shapes.lotus_petals + shapes.mandala_rings;
            TechniqueAssessment {
                precision_level: if continuous_ratio > 0.7 {
                    PrecisionLevel::High
                } else if continuous_ratio > 0.4 {
                    PrecisionLevel::Medium
                } else {
                    PrecisionLevel::FreeForm
                },
                artistic_style: if (classical as f64) > stroke_count as f64 * 0.5 {
                    ArtisticStyle::Classical
                } else {
                    ArtisticStyle::Contemporary
                },
                cultural_authenticity: if traditional > 0 {
                    StrokeAuthenticity::Traditional
                } else {
                    StrokeAuthenticity::ModernInterpretation
                },
                skill_indication: if breakdown.decorative_elements > 5
                    && stroke_rhythm.rhythm_consistency > 70.0
                {
                    SkillLevel::Expert
                } else {
                    SkillLevel::Intermediate
                },
            }
        } else {
            TechniqueAssessment::default()
        };

        let geometric_complexity = if complexities.is_empty() {
            0.0
        } else {
            round2(complexities.iter().sum::<f64>() / complexities.len() as f64)
        };
        let complexity_variance = {
            let s = std_dev(&complexities);
            s * s
        };
        let cultural_count = shapes.lotus_petals + shapes.paisley_forms + shapes.mandala_rings;

        let artistic_flow = if stroke_rhythm.rhythm_consistency > 60.0 {
            ArtisticFlow::Harmonious
        } else if stroke_rhythm.rhythm_consistency > 30.0 {
            ArtisticFlow::Varied
        } else {
            ArtisticFlow::Irregular
        };

        symbolic.truncate(10);
        info!(
            "stroke analysis: {stroke_count} strokes, {} contours kept",
            kept.len()
        );

        let report = StrokeReport {
            stroke_count,
            total_line_length: round2(total_length),
            detection_stats,
            stroke_breakdown: breakdown,
            shapes_detected: shapes,
            symbolic_elements: symbolic,
            stroke_rhythm,
            technique,
            geometric_complexity,
            pattern_uniformity: round2(100.0 - (100.0f64).min(complexity_variance * 10.0)),
            detail_density: round2(stroke_count as f64 / (w * h).max(1) as f64 * 10_000.0),
            cultural_pattern_density: round2(
                cultural_count as f64 / stroke_count.max(1) as f64 * 100.0,
            ),
            artistic_flow,
            skeleton_topology: topology,
            analysis_time: round2(start.elapsed().as_secs_f64()),
            error: None,
        };

        // Downstream stages consume the fused contour set, capped for
        // efficiency; a classified subset keeps their inputs meaningful.
        let mut artifact_contours: Vec<Contour> = kept
            .into_iter()
            .filter(|c| c.area() > p.classify_min_area)
            .collect();
        artifact_contours.truncate(p.artifact_cap);

        Ok(StageOutput {
            report: StageReport::Strokes(report),
            artifacts: StageArtifacts {
                contours: Some(artifact_contours),
                ..StageArtifacts::default()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::PipelineParams;
    use kolam_core::GrayImage;

    fn run_stage(img: &GrayImage) -> (StrokeReport, Vec<Contour>) {
        let stage = StrokeStage::new(PipelineParams::default().strokes);
        let ctx = StageContext {
            gray: img,
            keypoints: &[],
            contours: &[],
            overall_symmetry: 0.0,
        };
        let output = stage.run(&ctx).expect("stroke stage");
        let contours = output.artifacts.contours.unwrap_or_default();
        match output.report {
            StageReport::Strokes(r) => (r, contours),
            other => panic!("unexpected report {:?}", other.kind()),
        }
    }

    #[test]
    fn blank_image_reports_no_strokes_and_perfect_rhythm() {
        let img = GrayImage::filled(120, 120, 240);
        let (report, contours) = run_stage(&img);
        assert_eq!(0, report.stroke_count);
        assert!(contours.is_empty());
        assert_eq!(100.0, report.stroke_rhythm.rhythm_consistency);
        assert_eq!(PrecisionLevel::Unknown, report.technique.precision_level);
        assert!(!report.skeleton_topology.single_stroke_traceable);
    }

    #[test]
    fn filled_rectangle_is_detected_and_classified() {
        let mut img = GrayImage::filled(120, 120, 235);
        for y in 30..90 {
            for x in 25..95 {
                img.set(x, y, 25);
            }
        }
        let (report, contours) = run_stage(&img);
        assert!(report.stroke_count >= 1);
        assert!(!contours.is_empty());
        assert!(
            report.shapes_detected.rectangles >= 1,
            "shapes: {:?}",
            report.shapes_detected
        );
        assert!(report.detection_stats.edge_pixels_medium > 0);
    }

    #[test]
    fn bright_disc_yields_a_traceable_skeleton_ring() {
        // A bright ring on dark background thins to a closed loop.
        let mut img = GrayImage::new(140, 140);
        for y in 0..140 {
            for x in 0..140 {
                let dx = x as f64 - 70.0;
                let dy = y as f64 - 70.0;
                let r = (dx * dx + dy * dy).sqrt();
                if (35.0..45.0).contains(&r) {
                    img.set(x, y, 255);
                }
            }
        }
        let (report, _) = run_stage(&img);
        assert!(report.skeleton_topology.node_count > 0);
        assert!(report.skeleton_topology.cycle_count >= 1);
    }
}
