//! Whole-image symmetry quantification.
//!
//! Every score is the normalized cross-correlation between the image and
//! a geometric transform of itself, clamped to be non-negative and scaled
//! to a percentage. The `overall_symmetry` scalar is the mean of the four
//! main components and feeds the pattern stage's authenticity factor.

use std::time::Instant;

use log::debug;

use kolam_core::{GrayImage, GrayImageView, IntensityMoments};
use kolam_vision::{flip_horizontal, flip_vertical, ncc, rotate_about_center, transpose};

use crate::error::StageError;
use crate::params::SymmetryParams;
use crate::report::{
    round2, std_dev, CentroidOffset, NFoldScores, StageReport, SymmetryClass, SymmetryReport,
};
use crate::stages::{Stage, StageArtifacts, StageContext, StageKind, StageOutput};

pub struct SymmetryStage {
    params: SymmetryParams,
}

impl SymmetryStage {
    pub fn new(params: SymmetryParams) -> Self {
        Self { params }
    }
}

/// NCC against a transformed copy, clamped to [0, 1] and scaled x100.
fn similarity_pct(img: &GrayImageView<'_>, transformed: &GrayImage) -> f64 {
    round2(ncc(img, &transformed.as_view()).max(0.0) * 100.0)
}

fn crop(img: &GrayImageView<'_>, x0: usize, y0: usize, w: usize, h: usize) -> GrayImage {
    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            out.set(x, y, img.at(x0 + x, y0 + y));
        }
    }
    out
}

fn mean_abs_diff(a: &GrayImage, b: &GrayImage) -> f64 {
    if a.data.is_empty() || a.data.len() != b.data.len() {
        return 255.0;
    }
    let sum: f64 = a
        .data
        .iter()
        .zip(b.data.iter())
        .map(|(&x, &y)| (x as f64 - y as f64).abs())
        .sum();
    sum / a.data.len() as f64
}

/// Mirror the two image halves onto each other and compare pixelwise;
/// complements the global NCC score with a structural measure.
fn structural_similarity(img: &GrayImageView<'_>, vertical_axis: bool) -> f64 {
    let (w, h) = (img.width, img.height);
    if w < 2 || h < 2 {
        return 0.0;
    }

    let diff = if vertical_axis {
        let cx = w / 2;
        let half_w = cx.min(w - cx);
        let left = crop(img, cx - half_w, 0, half_w, h);
        let right = crop(img, cx, 0, half_w, h);
        let right_mirrored = flip_horizontal(&right.as_view());
        mean_abs_diff(&left, &right_mirrored)
    } else {
        let cy = h / 2;
        let half_h = cy.min(h - cy);
        let top = crop(img, 0, cy - half_h, w, half_h);
        let bottom = crop(img, 0, cy, w, half_h);
        let bottom_mirrored = flip_vertical(&bottom.as_view());
        mean_abs_diff(&top, &bottom_mirrored)
    };

    round2(100.0 - diff / 255.0 * 100.0)
}

impl Stage for SymmetryStage {
    fn kind(&self) -> StageKind {
        StageKind::Symmetry
    }

    fn run(&self, ctx: &StageContext<'_>) -> Result<StageOutput, StageError> {
        let start = Instant::now();
        let p = &self.params;
        let view = ctx.gray.as_view();
        let (w, h) = (view.width, view.height);

        let horizontal_symmetry = similarity_pct(&view, &flip_horizontal(&view));
        let vertical_symmetry = similarity_pct(&view, &flip_vertical(&view));
        let horizontal_structural_similarity = structural_similarity(&view, true);
        let vertical_structural_similarity = structural_similarity(&view, false);

        // Diagonal reflections only compare on square images, where the
        // transposed copy keeps the original shape.
        let (diagonal_main_symmetry, diagonal_anti_symmetry) = if w == h {
            let main = flip_horizontal(&transpose(&view).as_view());
            let anti = flip_vertical(&transpose(&flip_horizontal(&view).as_view()).as_view());
            (similarity_pct(&view, &main), similarity_pct(&view, &anti))
        } else {
            (0.0, 0.0)
        };

        let mut radial_scores = Vec::with_capacity(p.rotation_angles.len());
        let mut best_rotation_deg = 0.0f64;
        let mut best_score = f64::MIN;
        for &angle in &p.rotation_angles {
            let rotated = rotate_about_center(&view, angle);
            let score = ncc(&view, &rotated.as_view()).max(0.0);
            if score > best_score {
                best_score = score;
                best_rotation_deg = angle as f64;
            }
            radial_scores.push(score);
        }
        let radial_symmetry = if radial_scores.is_empty() {
            0.0
        } else {
            round2(radial_scores.iter().sum::<f64>() / radial_scores.len() as f64 * 100.0)
        };

        let fold_pct = |n: u32| -> f64 {
            let rotated = rotate_about_center(&view, 360.0 / n as f32);
            round2(ncc(&view, &rotated.as_view()).max(0.0) * 100.0)
        };
        let n_fold_symmetries = NFoldScores {
            fold_2: fold_pct(2),
            fold_3: fold_pct(3),
            fold_4: fold_pct(4),
            fold_5: fold_pct(5),
            fold_6: fold_pct(6),
            fold_8: fold_pct(8),
            fold_12: fold_pct(12),
        };

        // Exact 180-degree rotation: both flips composed, no resampling.
        let rotated_180 = flip_vertical(&flip_horizontal(&view).as_view());
        let point_symmetry = similarity_pct(&view, &rotated_180);

        let moments = IntensityMoments::of(&view);
        let center_x = (w / 2) as i64;
        let center_y = (h / 2) as i64;
        let (geometric_balance, principal_axis_deg, centroid_offset) =
            match moments.centroid() {
                Some((cx, cy)) => {
                    let offset = CentroidOffset {
                        x: cx as i64 - center_x,
                        y: cy as i64 - center_y,
                    };
                    let balance = 100.0
                        - (offset.x.abs() + offset.y.abs()) as f64 / w.max(h).max(1) as f64
                            * 100.0;
                    (
                        round2(balance),
                        round2(moments.principal_axis_deg()),
                        offset,
                    )
                }
                None => (0.0, 0.0, CentroidOffset::default()),
            };

        let components = [
            horizontal_symmetry,
            vertical_symmetry,
            radial_symmetry,
            point_symmetry,
        ];
        let overall_symmetry = round2(components.iter().sum::<f64>() / components.len() as f64);
        let symmetry_consistency = round2(100.0 - std_dev(&components));

        let (best_fold_n, best_fold_score) = n_fold_symmetries.best();
        let classification = if horizontal_symmetry.max(vertical_symmetry)
            > p.bilateral_threshold
        {
            SymmetryClass::Bilateral
        } else if radial_symmetry > p.radial_threshold {
            SymmetryClass::Radial
        } else if point_symmetry > p.point_threshold {
            SymmetryClass::Point
        } else if best_fold_score > p.fold_threshold {
            SymmetryClass::NFold { n: best_fold_n }
        } else {
            SymmetryClass::Asymmetric
        };

        debug!(
            "symmetry: h={horizontal_symmetry:.1} v={vertical_symmetry:.1} \
             radial={radial_symmetry:.1} point={point_symmetry:.1}"
        );

        let report = SymmetryReport {
            horizontal_symmetry,
            horizontal_structural_similarity,
            vertical_symmetry,
            vertical_structural_similarity,
            diagonal_main_symmetry,
            diagonal_anti_symmetry,
            radial_symmetry,
            point_symmetry,
            n_fold_symmetries,
            best_rotation_deg,
            geometric_balance,
            principal_axis_deg,
            centroid_offset,
            overall_symmetry,
            symmetry_consistency,
            classification,
            analysis_time: round2(start.elapsed().as_secs_f64()),
            error: None,
        };

        Ok(StageOutput {
            report: StageReport::Symmetry(report),
            artifacts: StageArtifacts {
                overall_symmetry: Some(overall_symmetry),
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

    fn run_stage(img: &GrayImage) -> SymmetryReport {
        let stage = SymmetryStage::new(PipelineParams::default().symmetry);
        let ctx = StageContext {
            gray: img,
            keypoints: &[],
            contours: &[],
            overall_symmetry: 0.0,
        };
        let output = stage.run(&ctx).expect("symmetry stage");
        match output.report {
            StageReport::Symmetry(r) => r,
            other => panic!("unexpected report {:?}", other.kind()),
        }
    }

    fn mirror_symmetric_image() -> GrayImage {
        // Discs mirrored exactly across both axes of a 201x201 canvas
        // (the flip maps x to 200 - x, so 60 and 140 swap places).
        let mut img = GrayImage::filled(201, 201, 235);
        let centers = [(60, 60), (140, 60), (60, 140), (140, 140), (100, 100)];
        for &(cx, cy) in &centers {
            for y in cy - 12..=cy + 12 {
                for x in cx - 12..=cx + 12 {
                    let dx = x as i32 - cx as i32;
                    let dy = y as i32 - cy as i32;
                    if dx * dx + dy * dy <= 144 {
                        img.set(x, y, 30);
                    }
                }
            }
        }
        img
    }

    #[test]
    fn mirror_symmetric_image_scores_high_reflection() {
        let report = run_stage(&mirror_symmetric_image());
        assert!(
            report.horizontal_symmetry > 95.0,
            "horizontal = {}",
            report.horizontal_symmetry
        );
        assert!(
            report.vertical_symmetry > 95.0,
            "vertical = {}",
            report.vertical_symmetry
        );
    }

    #[test]
    fn overall_is_the_mean_of_the_four_components() {
        let report = run_stage(&mirror_symmetric_image());
        let expected = (report.horizontal_symmetry
            + report.vertical_symmetry
            + report.radial_symmetry
            + report.point_symmetry)
            / 4.0;
        assert!((report.overall_symmetry - expected).abs() < 0.01);
    }

    #[test]
    fn all_percentages_stay_in_range() {
        let mut img = GrayImage::new(64, 64);
        for (i, v) in img.data.iter_mut().enumerate() {
            *v = (i * 31 % 256) as u8;
        }
        let report = run_stage(&img);
        for value in [
            report.horizontal_symmetry,
            report.vertical_symmetry,
            report.diagonal_main_symmetry,
            report.diagonal_anti_symmetry,
            report.radial_symmetry,
            report.point_symmetry,
            report.overall_symmetry,
        ] {
            assert!((0.0..=100.0).contains(&value), "out of range: {value}");
        }
    }

    #[test]
    fn balance_of_centered_mass_is_high() {
        let report = run_stage(&mirror_symmetric_image());
        assert!(report.geometric_balance > 90.0);
        assert!(report.centroid_offset.x.abs() <= 2);
        assert!(report.centroid_offset.y.abs() <= 2);
    }
}
