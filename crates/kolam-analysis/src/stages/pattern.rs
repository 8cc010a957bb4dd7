//! Regional style and cultural-authenticity scoring.
//!
//! Classifies qualifying contours into eight traditional element
//! categories, accumulates weighted style points for the four named
//! regional traditions, and fuses element density, the upstream symmetry
//! score, contour complexity and sacred-geometry presence into one
//! authenticity percentage.

use std::time::Instant;

use log::debug;

use crate::error::StageError;
use crate::params::PatternParams;
use crate::report::{
    round2, AuthenticityFactors, ComplexityLevel, ElementBreakdown, PatternReport,
    RegionalStyle, SkillLevel, StageReport, TraditionalElements,
};
use crate::stages::{Stage, StageContext, StageKind, StageOutput};

pub struct PatternStage {
    params: PatternParams,
}

impl PatternStage {
    pub fn new(params: PatternParams) -> Self {
        Self { params }
    }
}

fn intensity_peaks(gray: &kolam_core::GrayImage, peak_fraction: f64) -> Vec<u8> {
    let mut hist = [0u32; 256];
    for &v in &gray.data {
        hist[v as usize] += 1;
    }
    let max = hist.iter().copied().max().unwrap_or(0) as f64;
    let floor = max * peak_fraction;

    let mut peaks = Vec::new();
    for i in 1..255 {
        if hist[i] > hist[i - 1] && hist[i] > hist[i + 1] && hist[i] as f64 > floor {
            peaks.push(i as u8);
        }
    }
    peaks
}

impl Stage for PatternStage {
    fn kind(&self) -> StageKind {
        StageKind::Pattern
    }

    fn run(&self, ctx: &StageContext<'_>) -> Result<StageOutput, StageError> {
        let start = Instant::now();
        let p = &self.params;

        let dominant_intensities = intensity_peaks(ctx.gray, p.intensity_peak_fraction);

        let mut elements = TraditionalElements::default();
        for contour in ctx.contours {
            let area = contour.area();
            if area <= p.min_element_area {
                continue;
            }
            let solidity = contour.solidity();
            let circularity = contour.circularity();
            let aspect = contour.aspect_ratio();

            if circularity > 0.7 && solidity > 0.8 {
                if area > p.mandala_area {
                    elements.geometric_mandalas += 1;
                } else {
                    elements.lotus_patterns += 1;
                }
            } else if solidity > 0.5 && solidity < 0.8 {
                if aspect > 2.0 {
                    elements.paisley_designs += 1;
                } else {
                    elements.floral_motifs += 1;
                }
            } else if solidity < 0.5 {
                if circularity > 0.3 {
                    elements.spiral_patterns += 1;
                } else {
                    elements.peacock_patterns += 1;
                }
            } else if solidity > 0.9 && circularity < 0.3 {
                let vertices = contour.approx_vertex_count(0.02);
                if vertices > 6 {
                    elements.star_patterns += 1;
                } else {
                    elements.grid_patterns += 1;
                }
            }
        }

        // Weighted style points per regional tradition; ties resolve in
        // enumeration order.
        let mut south = 0u32;
        if elements.geometric_mandalas > 3 {
            south += 3;
        }
        if elements.grid_patterns > 2 {
            south += 2;
        }
        if ctx.contours.len() > 20 {
            south += 2;
        }

        let mut north = 0u32;
        if elements.floral_motifs > 3 {
            north += 3;
        }
        if elements.paisley_designs > 2 {
            north += 2;
        }
        if elements.peacock_patterns > 1 {
            north += 3;
        }

        let mut bengali = 0u32;
        if elements.lotus_patterns > 2 {
            bengali += 3;
        }
        if elements.floral_motifs > 2 {
            bengali += 2;
        }
        if elements.spiral_patterns > 1 {
            bengali += 2;
        }

        let mut western = 0u32;
        if elements.star_patterns > 2 {
            western += 3;
        }
        if elements.geometric_mandalas > 2 {
            western += 2;
        }

        let scored = [
            (RegionalStyle::SouthIndianKolam, south),
            (RegionalStyle::NorthIndianRangoli, north),
            (RegionalStyle::BengaliAlpona, bengali),
            (RegionalStyle::GujaratiRajasthani, western),
        ];
        let mut best = scored[0];
        for &cand in &scored[1..] {
            if cand.1 > best.1 {
                best = cand;
            }
        }
        let (regional_style, style_confidence) = if best.1 > 0 {
            (best.0, best.1 as f64 / 10.0 * 100.0)
        } else {
            (RegionalStyle::ContemporaryFusion, 50.0)
        };

        let total_elements = elements.total();
        let symmetry_value = ctx.overall_symmetry.clamp(0.0, 100.0);

        let mut sacred_geometry_score = 0.0f64;
        if elements.geometric_mandalas > 0 {
            sacred_geometry_score += 30.0;
        }
        if elements.lotus_patterns > 0 {
            sacred_geometry_score += 25.0;
        }
        if elements.star_patterns > 0 {
            sacred_geometry_score += 20.0;
        }

        let factors = AuthenticityFactors {
            pattern_density: (total_elements as f64 * 10.0).min(100.0),
            symmetry_quality: symmetry_value,
            complexity_appropriateness: (ctx.contours.len() as f64 * 2.0).min(100.0),
            sacred_geometry_presence: sacred_geometry_score.min(100.0),
        };
        let cultural_authenticity = round2(
            (factors.pattern_density
                + factors.symmetry_quality
                + factors.complexity_appropriateness
                + factors.sacred_geometry_presence)
                / 4.0,
        );

        let complexity_level = if total_elements > 20 {
            ComplexityLevel::Expert
        } else if total_elements > 10 {
            ComplexityLevel::High
        } else if total_elements > 5 {
            ComplexityLevel::Medium
        } else {
            ComplexityLevel::Simple
        };

        let skill_factors = [
            (total_elements as f64 * 5.0).min(100.0),
            symmetry_value,
            (ctx.contours.len() as f64).min(100.0),
        ];
        let avg_skill = skill_factors.iter().sum::<f64>() / skill_factors.len() as f64;
        let skill_level = if avg_skill > 75.0 {
            SkillLevel::Expert
        } else if avg_skill > 50.0 {
            SkillLevel::Intermediate
        } else if avg_skill > 25.0 {
            SkillLevel::BeginnerIntermediate
        } else {
            SkillLevel::Beginner
        };

        let mut spiritual_notes: Vec<&str> = Vec::new();
        if elements.lotus_patterns > 0 {
            spiritual_notes.push("lotus symbolism of purity");
        }
        if elements.geometric_mandalas > 0 {
            spiritual_notes.push("mandala patterns for meditation");
        }
        if symmetry_value > 60.0 {
            spiritual_notes.push("high symmetry indicating balance");
        }
        if elements.star_patterns > 0 {
            spiritual_notes.push("star patterns of divine light");
        }
        let spiritual_significance = if !spiritual_notes.is_empty() {
            format!(
                "High spiritual content with {}",
                spiritual_notes[..spiritual_notes.len().min(2)].join("; ")
            )
        } else if symmetry_value > 40.0 {
            "Moderate spiritual qualities through geometric harmony".to_string()
        } else {
            "Primarily decorative with artistic focus".to_string()
        };

        let occasion = if elements.lotus_patterns > 3 && elements.geometric_mandalas > 2 {
            "Likely for a major religious festival".to_string()
        } else if elements.floral_motifs > 3 {
            "Possibly for spring festivals or welcoming ceremonies".to_string()
        } else if complexity_level == ComplexityLevel::Expert {
            "Elaborate design for major celebrations".to_string()
        } else if complexity_level == ComplexityLevel::Simple {
            "Daily practice or casual decoration".to_string()
        } else {
            "General decorative occasion".to_string()
        };

        debug!(
            "pattern analysis: {total_elements} traditional elements, style {regional_style:?}"
        );

        let report = PatternReport {
            traditional_elements: elements,
            regional_style,
            style_confidence: round2(style_confidence),
            cultural_authenticity,
            authenticity_factors: factors,
            complexity_level,
            dominant_intensities,
            element_breakdown: ElementBreakdown {
                sacred_geometry: elements.geometric_mandalas + elements.star_patterns,
                nature_motifs: elements.lotus_patterns + elements.floral_motifs,
                cultural_symbols: elements.peacock_patterns + elements.paisley_designs,
                structural_patterns: elements.grid_patterns + elements.spiral_patterns,
            },
            skill_level,
            spiritual_significance,
            occasion,
            analysis_time: round2(start.elapsed().as_secs_f64()),
            error: None,
        };

        Ok(StageOutput::report_only(StageReport::Pattern(report)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::PipelineParams;
    use kolam_core::GrayImage;
    use kolam_vision::{extract_contours, Contour};

    fn run_stage(
        img: &GrayImage,
        contours: &[Contour],
        overall_symmetry: f64,
    ) -> PatternReport {
        let stage = PatternStage::new(PipelineParams::default().pattern);
        let ctx = StageContext {
            gray: img,
            keypoints: &[],
            contours,
            overall_symmetry,
        };
        let output = stage.run(&ctx).expect("pattern stage");
        match output.report {
            StageReport::Pattern(r) => r,
            other => panic!("unexpected report {:?}", other.kind()),
        }
    }

    fn disc_contours(radius: i32, count: usize) -> Vec<Contour> {
        // Identical solid discs, spaced out on one mask.
        let side = (radius * 2 + 10) as usize;
        let mut mask = GrayImage::new(side * count, side);
        for k in 0..count {
            let cx = (k * side) as i32 + radius + 5;
            let cy = radius + 5;
            for y in 0..side as i32 {
                for x in (k * side) as i32..((k + 1) * side) as i32 {
                    let dx = x - cx;
                    let dy = y - cy;
                    if dx * dx + dy * dy <= radius * radius {
                        mask.set(x as usize, y as usize, 255);
                    }
                }
            }
        }
        extract_contours(&mask.as_view())
    }

    #[test]
    fn empty_inputs_fall_back_to_contemporary_fusion() {
        let img = GrayImage::filled(100, 100, 200);
        let report = run_stage(&img, &[], 0.0);
        assert_eq!(0, report.traditional_elements.total());
        assert_eq!(RegionalStyle::ContemporaryFusion, report.regional_style);
        assert_eq!(50.0, report.style_confidence);
        assert_eq!(ComplexityLevel::Simple, report.complexity_level);
        assert_eq!(0.0, report.cultural_authenticity);
    }

    #[test]
    fn large_solid_discs_are_geometric_mandalas() {
        let contours = disc_contours(25, 4); // area ~1963 each
        let report = run_stage(&GrayImage::filled(50, 50, 200), &contours, 0.0);
        assert_eq!(4, report.traditional_elements.geometric_mandalas);
        // More than three mandalas scores the South Indian tradition.
        assert_eq!(RegionalStyle::SouthIndianKolam, report.regional_style);
        assert!(report.style_confidence >= 30.0);
    }

    #[test]
    fn small_solid_discs_read_as_lotus_patterns() {
        let contours = disc_contours(12, 3); // area ~452 each
        let report = run_stage(&GrayImage::filled(50, 50, 200), &contours, 0.0);
        assert_eq!(3, report.traditional_elements.lotus_patterns);
        assert!(report.authenticity_factors.sacred_geometry_presence >= 25.0);
    }

    #[test]
    fn authenticity_is_the_mean_of_its_four_factors() {
        let contours = disc_contours(25, 4);
        let report = run_stage(&GrayImage::filled(50, 50, 200), &contours, 80.0);
        let f = &report.authenticity_factors;
        let expected = (f.pattern_density
            + f.symmetry_quality
            + f.complexity_appropriateness
            + f.sacred_geometry_presence)
            / 4.0;
        assert!((report.cultural_authenticity - expected).abs() < 0.01);
        assert!(report.cultural_authenticity > 0.0);
    }
}
