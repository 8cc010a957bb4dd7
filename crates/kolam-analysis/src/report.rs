//! Report model: one fixed-schema record per stage, the tagged stage
//! union, and the composite report fused from all five.
//!
//! Every stage record carries `analysis_time` and an optional `error`.
//! The `Default` of each record is its documented fallback: when a stage
//! fails, the orchestrator emits the default record with `error` set and
//! the run stays structurally valid JSON end to end. All numbers are
//! plain floats/ints; percentages are rounded to two decimals when the
//! record is built.

use serde::Serialize;

use crate::graph::SkeletonGraphMetrics;
use crate::stages::StageKind;

/// Round to two decimals for percentage-like report fields.
pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Population standard deviation; 0 for fewer than one sample.
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

// ---------------------------------------------------------------------------
// Dot stage

/// One accepted dot with its position context.
#[derive(Clone, Debug, Serialize)]
pub struct DotRecord {
    pub id: usize,
    pub x: i64,
    pub y: i64,
    pub size: f64,
    pub confidence: f64,
    pub estimated_radius: f64,
    pub x_percent: f64,
    pub y_percent: f64,
}

/// Raw candidate counts per detector, before and after fusion.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct DetectionMethodCounts {
    pub blob_detection: usize,
    pub hough_circles: usize,
    pub template_matching: usize,
    pub total_before_filtering: usize,
    pub final_unique_dots: usize,
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct SizeHistogram {
    /// 2-10 px
    pub tiny: usize,
    /// 10-20 px
    pub small: usize,
    /// 20-40 px
    pub medium: usize,
    /// 40 px and up
    pub large: usize,
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct ConfidenceHistogram {
    pub high_confidence: usize,
    pub medium_confidence: usize,
    pub low_confidence: usize,
}

/// K-means cluster descriptors over dot positions.
#[derive(Clone, Debug, Serialize)]
pub struct ClusterPatterns {
    pub cluster_count: usize,
    pub cluster_sizes: Vec<usize>,
    pub cluster_regularity: f64,
    pub centroid_symmetry: f64,
}

/// Reflection/rotation match fractions over dot positions.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct KeypointSymmetryIndices {
    pub horizontal_reflection: f64,
    pub vertical_reflection: f64,
    #[serde(rename = "60_degree")]
    pub rot_60: f64,
    #[serde(rename = "90_degree")]
    pub rot_90: f64,
    #[serde(rename = "120_degree")]
    pub rot_120: f64,
    #[serde(rename = "180_degree")]
    pub rot_180: f64,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct DotCharacteristics {
    pub size_distribution: SizeHistogram,
    pub confidence_distribution: ConfidenceHistogram,
    pub geometric_patterns: Option<ClusterPatterns>,
    pub fractal_dimension: f64,
    pub pattern_regularity: f64,
    pub symmetry_indices: Option<KeypointSymmetryIndices>,
    pub uniformity_score: f64,
}

/// Spacing statistics over all dot pairs; a sentinel below two dots.
#[derive(Clone, Copy, Debug, Default, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GridSpacingReport {
    #[default]
    InsufficientDots,
    Measured {
        mean_spacing: f64,
        std_dev_spacing: f64,
        consistency_score: f64,
    },
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct DotAdvancedMetrics {
    pub detection_confidence_avg: f64,
    pub size_consistency_index: f64,
    pub spatial_entropy: f64,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct DotReport {
    pub dots: Vec<DotRecord>,
    pub detection_methods: DetectionMethodCounts,
    pub characteristics: DotCharacteristics,
    pub grid_spacing: GridSpacingReport,
    pub advanced_metrics: DotAdvancedMetrics,
    pub analysis_time: f64,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Symmetry stage

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct NFoldScores {
    #[serde(rename = "2_fold")]
    pub fold_2: f64,
    #[serde(rename = "3_fold")]
    pub fold_3: f64,
    #[serde(rename = "4_fold")]
    pub fold_4: f64,
    #[serde(rename = "5_fold")]
    pub fold_5: f64,
    #[serde(rename = "6_fold")]
    pub fold_6: f64,
    #[serde(rename = "8_fold")]
    pub fold_8: f64,
    #[serde(rename = "12_fold")]
    pub fold_12: f64,
}

impl NFoldScores {
    pub fn best(&self) -> (u32, f64) {
        let all = [
            (2, self.fold_2),
            (3, self.fold_3),
            (4, self.fold_4),
            (5, self.fold_5),
            (6, self.fold_6),
            (8, self.fold_8),
            (12, self.fold_12),
        ];
        let mut best = all[0];
        for &cand in &all[1..] {
            if cand.1 > best.1 {
                best = cand;
            }
        }
        best
    }
}

/// Ordered symmetry classification; reflective symmetry is checked before
/// rotational because it is the more common traditional pattern type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymmetryClass {
    Bilateral,
    Radial,
    Point,
    NFold {
        n: u32,
    },
    #[default]
    Asymmetric,
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct CentroidOffset {
    pub x: i64,
    pub y: i64,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct SymmetryReport {
    pub horizontal_symmetry: f64,
    pub horizontal_structural_similarity: f64,
    pub vertical_symmetry: f64,
    pub vertical_structural_similarity: f64,
    pub diagonal_main_symmetry: f64,
    pub diagonal_anti_symmetry: f64,
    pub radial_symmetry: f64,
    pub point_symmetry: f64,
    pub n_fold_symmetries: NFoldScores,
    pub best_rotation_deg: f64,
    pub geometric_balance: f64,
    pub principal_axis_deg: f64,
    pub centroid_offset: CentroidOffset,
    /// Mean of {horizontal, vertical, radial, point}; the one scalar the
    /// pattern stage consumes. Always present, 0 on failure.
    pub overall_symmetry: f64,
    pub symmetry_consistency: f64,
    pub classification: SymmetryClass,
    pub analysis_time: f64,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Line/stroke stage

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct LineDetectionStats {
    pub edge_pixels_ultra_low: usize,
    pub edge_pixels_low: usize,
    pub edge_pixels_medium: usize,
    pub edge_pixels_high: usize,
    pub edge_pixels_ultra_high: usize,
    pub hough_lines_standard: usize,
    pub hough_lines_sensitive: usize,
    pub houghp_long_segments: usize,
    pub houghp_short_segments: usize,
    pub houghp_gap_segments: usize,
    pub horizontal_line_pixels: usize,
    pub vertical_line_pixels: usize,
    pub contours_found: usize,
    pub contours_after_filtering: usize,
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct StrokeBreakdown {
    pub continuous_strokes: usize,
    pub broken_strokes: usize,
    pub curved_lines: usize,
    pub straight_lines: usize,
    pub thick_strokes: usize,
    pub thin_strokes: usize,
    pub decorative_elements: usize,
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct ShapeCounts {
    pub circles: usize,
    pub triangles: usize,
    pub rectangles: usize,
    pub polygons: usize,
    pub complex_shapes: usize,
    pub lotus_petals: usize,
    pub paisley_forms: usize,
    pub mandala_rings: usize,
}

/// Per-contour arc-length statistics. With zero contours, or a zero mean,
/// consistency defaults to a perfect 100.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct StrokeRhythm {
    pub average_stroke_length: f64,
    pub stroke_length_variance: f64,
    pub rhythm_consistency: f64,
}

impl Default for StrokeRhythm {
    fn default() -> Self {
        Self {
            average_stroke_length: 0.0,
            stroke_length_variance: 0.0,
            rhythm_consistency: 100.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecisionLevel {
    High,
    Medium,
    FreeForm,
    #[default]
    Unknown,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtisticStyle {
    Classical,
    Contemporary,
    #[default]
    Unknown,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrokeAuthenticity {
    Traditional,
    ModernInterpretation,
    #[default]
    Unknown,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    #[default]
    Beginner,
    BeginnerIntermediate,
    Intermediate,
    Expert,
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct TechniqueAssessment {
    pub precision_level: PrecisionLevel,
    pub artistic_style: ArtisticStyle,
    pub cultural_authenticity: StrokeAuthenticity,
    pub skill_indication: SkillLevel,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtisticFlow {
    Harmonious,
    Varied,
    #[default]
    Irregular,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct StrokeReport {
    pub stroke_count: usize,
    pub total_line_length: f64,
    pub detection_stats: LineDetectionStats,
    pub stroke_breakdown: StrokeBreakdown,
    pub shapes_detected: ShapeCounts,
    /// Symbolic reading of each detected shape category, capped at ten
    /// entries. Presentation only; counts above are the contract.
    pub symbolic_elements: Vec<String>,
    pub stroke_rhythm: StrokeRhythm,
    pub technique: TechniqueAssessment,
    pub geometric_complexity: f64,
    pub pattern_uniformity: f64,
    pub detail_density: f64,
    pub cultural_pattern_density: f64,
    pub artistic_flow: ArtisticFlow,
    pub skeleton_topology: SkeletonGraphMetrics,
    pub analysis_time: f64,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Spatial stage

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct PointXY {
    pub x: i64,
    pub y: i64,
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct SpatialInsights {
    pub sacred_geometry_presence: bool,
    pub mandala_structure: bool,
    pub cardinal_direction_alignment: bool,
    pub golden_ratio_proportions: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrientationClass {
    Cardinal,
    Octagonal,
    #[default]
    Unaligned,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyFlow {
    Concentric,
    Radiating,
    Balanced,
    #[default]
    Unknown,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuadrantBalance {
    Perfect,
    Good,
    Artistic,
    #[default]
    Unknown,
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct QuadrantCounts {
    pub northeast: usize,
    pub northwest: usize,
    pub southwest: usize,
    pub southeast: usize,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct SpatialReport {
    pub dot_centroid: PointXY,
    pub contour_centroid: PointXY,
    pub pattern_clusters: usize,
    pub horizontal_spread: f64,
    pub vertical_spread: f64,
    pub pattern_coverage: f64,
    pub center_alignment: f64,
    pub distribution_uniformity: f64,
    pub radial_harmony: f64,
    pub insights: SpatialInsights,
    pub orientation: OrientationClass,
    pub energy_flow: EnergyFlow,
    pub quadrant_balance: QuadrantBalance,
    pub quadrant_counts: QuadrantCounts,
    pub analysis_time: f64,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Pattern/cultural stage

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct TraditionalElements {
    pub lotus_patterns: usize,
    pub geometric_mandalas: usize,
    pub floral_motifs: usize,
    pub peacock_patterns: usize,
    pub paisley_designs: usize,
    pub spiral_patterns: usize,
    pub grid_patterns: usize,
    pub star_patterns: usize,
}

impl TraditionalElements {
    pub fn total(&self) -> usize {
        self.lotus_patterns
            + self.geometric_mandalas
            + self.floral_motifs
            + self.peacock_patterns
            + self.paisley_designs
            + self.spiral_patterns
            + self.grid_patterns
            + self.star_patterns
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionalStyle {
    SouthIndianKolam,
    NorthIndianRangoli,
    BengaliAlpona,
    GujaratiRajasthani,
    ContemporaryFusion,
    #[default]
    Unknown,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    #[default]
    Simple,
    Medium,
    High,
    Expert,
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct AuthenticityFactors {
    pub pattern_density: f64,
    pub symmetry_quality: f64,
    pub complexity_appropriateness: f64,
    pub sacred_geometry_presence: f64,
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct ElementBreakdown {
    pub sacred_geometry: usize,
    pub nature_motifs: usize,
    pub cultural_symbols: usize,
    pub structural_patterns: usize,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct PatternReport {
    pub traditional_elements: TraditionalElements,
    pub regional_style: RegionalStyle,
    pub style_confidence: f64,
    pub cultural_authenticity: f64,
    pub authenticity_factors: AuthenticityFactors,
    pub complexity_level: ComplexityLevel,
    pub dominant_intensities: Vec<u8>,
    pub element_breakdown: ElementBreakdown,
    pub skill_level: SkillLevel,
    pub spiritual_significance: String,
    pub occasion: String,
    pub analysis_time: f64,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Stage union and composite report

/// Tagged union of the five stage records.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageReport {
    Dots(DotReport),
    Symmetry(SymmetryReport),
    Strokes(StrokeReport),
    Spatial(SpatialReport),
    Pattern(PatternReport),
}

impl StageReport {
    pub fn kind(&self) -> StageKind {
        match self {
            StageReport::Dots(_) => StageKind::Dots,
            StageReport::Symmetry(_) => StageKind::Symmetry,
            StageReport::Strokes(_) => StageKind::Strokes,
            StageReport::Spatial(_) => StageKind::Spatial,
            StageReport::Pattern(_) => StageKind::Pattern,
        }
    }

    /// The documented fallback record for a failed stage: every domain
    /// field at its zero/neutral default, plus the error message.
    pub fn fallback(kind: StageKind, error: String) -> Self {
        match kind {
            StageKind::Dots => StageReport::Dots(DotReport {
                error: Some(error),
                ..DotReport::default()
            }),
            StageKind::Symmetry => StageReport::Symmetry(SymmetryReport {
                error: Some(error),
                ..SymmetryReport::default()
            }),
            StageKind::Strokes => StageReport::Strokes(StrokeReport {
                error: Some(error),
                ..StrokeReport::default()
            }),
            StageKind::Spatial => StageReport::Spatial(SpatialReport {
                error: Some(error),
                ..SpatialReport::default()
            }),
            StageKind::Pattern => StageReport::Pattern(PatternReport {
                error: Some(error),
                ..PatternReport::default()
            }),
        }
    }

    pub fn analysis_time(&self) -> f64 {
        match self {
            StageReport::Dots(r) => r.analysis_time,
            StageReport::Symmetry(r) => r.analysis_time,
            StageReport::Strokes(r) => r.analysis_time,
            StageReport::Spatial(r) => r.analysis_time,
            StageReport::Pattern(r) => r.analysis_time,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            StageReport::Dots(r) => r.error.as_deref(),
            StageReport::Symmetry(r) => r.error.as_deref(),
            StageReport::Strokes(r) => r.error.as_deref(),
            StageReport::Spatial(r) => r.error.as_deref(),
            StageReport::Pattern(r) => r.error.as_deref(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct ImageInfo {
    pub height: usize,
    pub width: usize,
    pub aspect_ratio: f64,
    pub total_pixels: usize,
}

/// Which feature family dominates the analyzed pattern.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredominantFeature {
    GeometricDots,
    SymmetricalLines,
    CulturalPatterns,
    ArtisticStrokes,
    #[default]
    BasicShapes,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct AnalysisSummary {
    pub overall_quality_score: f64,
    pub total_dots_detected: usize,
    pub total_strokes_detected: usize,
    pub symmetry_level: f64,
    pub cultural_authenticity: f64,
    pub predominant_feature: PredominantFeature,
    pub artistic_style: RegionalStyle,
    pub complexity_rating: ComplexityLevel,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct Recommendations {
    /// Ranked suggestions, at most three.
    pub improvement_suggestions: Vec<String>,
    pub skill_development: SkillLevel,
    pub cultural_context: String,
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct StageTimings {
    pub dots: f64,
    pub symmetry: f64,
    pub strokes: f64,
    pub spatial: f64,
    pub pattern: f64,
    pub total: f64,
}

/// The final fused report. Constructed once at the end of a run and
/// immutable thereafter.
#[derive(Clone, Debug, Serialize)]
pub struct CompositeReport {
    pub image: ImageInfo,
    pub summary: AnalysisSummary,
    pub recommendations: Recommendations,
    pub timings: StageTimings,
    pub stages: Vec<StageReport>,
}

impl CompositeReport {
    /// The single serialization boundary: everything below this value is
    /// plain JSON scalars, arrays and maps.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Fuse the five stage reports into the composite.
pub fn synthesize(
    width: usize,
    height: usize,
    dots: DotReport,
    symmetry: SymmetryReport,
    strokes: StrokeReport,
    spatial: SpatialReport,
    pattern: PatternReport,
    total_elapsed: f64,
) -> CompositeReport {
    let total_dots = dots.dots.len();
    let total_strokes = strokes.stroke_count;
    let symmetry_level = symmetry.overall_symmetry;
    let authenticity = pattern.cultural_authenticity;

    // Mean of the strictly positive quality factors; a run with nothing
    // detected scores 0 rather than averaging an empty set.
    let factors = [
        (total_dots as f64 * 2.0).min(100.0),
        symmetry_level,
        (total_strokes as f64).min(100.0),
        authenticity,
    ];
    let positive: Vec<f64> = factors.iter().copied().filter(|&f| f > 0.0).collect();
    let overall_quality = if positive.is_empty() {
        0.0
    } else {
        positive.iter().sum::<f64>() / positive.len() as f64
    };

    let feature_scores = [
        (PredominantFeature::GeometricDots, total_dots as f64),
        (
            PredominantFeature::SymmetricalLines,
            (symmetry_level / 10.0).floor(),
        ),
        (
            PredominantFeature::CulturalPatterns,
            (authenticity / 10.0).floor(),
        ),
        (PredominantFeature::ArtisticStrokes, total_strokes as f64),
    ];
    let predominant_feature = if feature_scores.iter().all(|&(_, s)| s <= 0.0) {
        PredominantFeature::BasicShapes
    } else {
        // Ties go to the earlier entry, matching the enumeration order.
        let mut best = feature_scores[0];
        for &cand in &feature_scores[1..] {
            if cand.1 > best.1 {
                best = cand;
            }
        }
        best.0
    };

    // Threshold-gated suggestions, strongest deficits first, top three.
    let mut suggestions = Vec::new();
    if symmetry_level < 50.0 {
        suggestions.push(format!(
            "Enhance symmetry (current: {symmetry_level:.2}%)"
        ));
    } else {
        suggestions.push("Excellent symmetry maintained".to_string());
    }
    if authenticity < 60.0 {
        suggestions.push(format!(
            "Add more traditional elements (authenticity: {authenticity:.2}%)"
        ));
    } else {
        suggestions.push("Strong cultural authenticity".to_string());
    }
    if total_dots < 10 {
        suggestions.push(format!("Increase dot precision (detected: {total_dots})"));
    } else {
        suggestions.push("Good dot detection".to_string());
    }
    if total_strokes < 5 {
        suggestions.push(format!(
            "Enhance stroke definition (detected: {total_strokes})"
        ));
    } else {
        suggestions.push("Well-defined strokes".to_string());
    }
    suggestions.truncate(3);

    let cultural_context = if pattern.spiritual_significance.is_empty() {
        "Traditional rangoli with cultural significance".to_string()
    } else {
        pattern.spiritual_significance.clone()
    };

    let timings = StageTimings {
        dots: dots.analysis_time,
        symmetry: symmetry.analysis_time,
        strokes: strokes.analysis_time,
        spatial: spatial.analysis_time,
        pattern: pattern.analysis_time,
        total: round2(total_elapsed),
    };

    let aspect_ratio = if height > 0 {
        round2(width as f64 / height as f64)
    } else {
        0.0
    };

    CompositeReport {
        image: ImageInfo {
            height,
            width,
            aspect_ratio,
            total_pixels: width * height,
        },
        summary: AnalysisSummary {
            overall_quality_score: round2(overall_quality),
            total_dots_detected: total_dots,
            total_strokes_detected: total_strokes,
            symmetry_level,
            cultural_authenticity: authenticity,
            predominant_feature,
            artistic_style: pattern.regional_style,
            complexity_rating: pattern.complexity_level,
        },
        recommendations: Recommendations {
            improvement_suggestions: suggestions,
            skill_development: pattern.skill_level,
            cultural_context,
        },
        timings,
        stages: vec![
            StageReport::Dots(dots),
            StageReport::Symmetry(symmetry),
            StageReport::Strokes(strokes),
            StageReport::Spatial(spatial),
            StageReport::Pattern(pattern),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_run_synthesizes_the_documented_fallback_summary() {
        let report = synthesize(
            100,
            100,
            DotReport::default(),
            SymmetryReport::default(),
            StrokeReport::default(),
            SpatialReport::default(),
            PatternReport::default(),
            0.5,
        );
        assert_eq!(0, report.summary.total_dots_detected);
        assert_eq!(0, report.summary.total_strokes_detected);
        assert_eq!(0.0, report.summary.overall_quality_score);
        assert_eq!(
            PredominantFeature::BasicShapes,
            report.summary.predominant_feature
        );
        assert_eq!(5, report.stages.len());
    }

    #[test]
    fn dot_heavy_run_is_dominated_by_geometric_dots() {
        let mut dots = DotReport::default();
        for i in 0..30 {
            dots.dots.push(DotRecord {
                id: i + 1,
                x: i as i64,
                y: 0,
                size: 4.0,
                confidence: 0.9,
                estimated_radius: 2.0,
                x_percent: 0.0,
                y_percent: 0.0,
            });
        }
        let report = synthesize(
            100,
            100,
            dots,
            SymmetryReport::default(),
            StrokeReport::default(),
            SpatialReport::default(),
            PatternReport::default(),
            1.0,
        );
        assert_eq!(
            PredominantFeature::GeometricDots,
            report.summary.predominant_feature
        );
        // Only the dot factor is positive: min(100, 2 * 30) = 60.
        assert_eq!(60.0, report.summary.overall_quality_score);
    }

    #[test]
    fn fallback_record_keeps_the_stage_tag_and_error() {
        let report = StageReport::fallback(StageKind::Symmetry, "boom".to_string());
        assert_eq!(StageKind::Symmetry, report.kind());
        assert_eq!(Some("boom"), report.error());
        let json = serde_json::to_value(&report).expect("serializes");
        assert_eq!("symmetry", json["stage"]);
        assert_eq!(0.0, json["overall_symmetry"]);
        assert_eq!("boom", json["error"]);
    }

    #[test]
    fn suggestions_are_capped_at_three() {
        let report = synthesize(
            10,
            10,
            DotReport::default(),
            SymmetryReport::default(),
            StrokeReport::default(),
            SpatialReport::default(),
            PatternReport::default(),
            0.0,
        );
        assert_eq!(3, report.recommendations.improvement_suggestions.len());
    }
}
