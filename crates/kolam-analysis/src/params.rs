//! Configuration for the pipeline and its stages.
//!
//! Every tunable is a named field with the empirically chosen default the
//! system has been calibrated around. The dedup radius, duplicate shape
//! distance and the classification cutoffs in particular are tuned values
//! without a derivation; treat them as candidates for re-calibration
//! against a labeled dataset rather than as optimal.

use serde::{Deserialize, Serialize};

use kolam_vision::{BlobParams, HoughCircleParams, RingTemplateParams};

/// Dot-stage configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DotParams {
    pub blob: BlobParams,
    pub hough: HoughCircleParams,
    pub template: RingTemplateParams,
    /// Candidate cap before dedup; the excess lowest-confidence candidates
    /// are dropped first.
    pub merge_cap: usize,
    /// Two keypoints closer than this are considered the same dot.
    pub dedup_radius: f32,
    /// Final cap on accepted dots.
    pub max_dots: usize,
    /// Keypoint-symmetry match tolerance as a fraction of min(W, H)...
    pub symmetry_tolerance_frac: f32,
    /// ...but never below this many pixels.
    pub symmetry_tolerance_min_px: f32,
    /// Box-counting scales for the fractal dimension estimate.
    pub fractal_scales: [u32; 5],
    /// Upper bound on k for cluster-pattern detection.
    pub max_clusters: usize,
}

impl Default for DotParams {
    fn default() -> Self {
        Self {
            blob: BlobParams::default(),
            hough: HoughCircleParams::default(),
            template: RingTemplateParams::default(),
            merge_cap: 500,
            dedup_radius: 8.0,
            max_dots: 300,
            symmetry_tolerance_frac: 0.05,
            symmetry_tolerance_min_px: 8.0,
            fractal_scales: [2, 4, 8, 16, 32],
            max_clusters: 8,
        }
    }
}

/// Symmetry-stage configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SymmetryParams {
    /// Angle sweep for the radial symmetry score.
    pub rotation_angles: Vec<f32>,
    /// Divisors tested for n-fold symmetry (rotation by 360/n).
    pub fold_orders: Vec<u32>,
    /// Classification cutoffs, in percent.
    pub bilateral_threshold: f64,
    pub radial_threshold: f64,
    pub point_threshold: f64,
    pub fold_threshold: f64,
}

impl Default for SymmetryParams {
    fn default() -> Self {
        Self {
            rotation_angles: vec![
                30.0, 45.0, 60.0, 72.0, 90.0, 120.0, 135.0, 144.0, 180.0, 225.0, 270.0, 315.0,
            ],
            fold_orders: vec![2, 3, 4, 5, 6, 8, 12],
            bilateral_threshold: 80.0,
            radial_threshold: 70.0,
            point_threshold: 60.0,
            fold_threshold: 60.0,
        }
    }
}

/// Line/stroke-stage configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StrokeParams {
    /// Edge detection (low, high) threshold pairs, most to least sensitive.
    pub edge_levels: [(f32, f32); 5],
    /// Contours with a Hu-descriptor distance under this are duplicates.
    pub shape_duplicate_distance: f64,
    /// Area window applied during contour fusion.
    pub min_area: f64,
    pub max_area_frac: f64,
    pub min_perimeter: f64,
    /// Minimum area for a contour to count as a classified stroke.
    pub classify_min_area: f64,
    /// Polygon-approximation epsilon as a fraction of the perimeter.
    pub approx_epsilon_frac: f64,
    /// Structuring-element length for morphological line extraction.
    pub morph_line_length: usize,
    /// Cap on contours handed to downstream stages.
    pub artifact_cap: usize,
}

impl Default for StrokeParams {
    fn default() -> Self {
        Self {
            edge_levels: [
                (20.0, 80.0),
                (30.0, 100.0),
                (50.0, 150.0),
                (100.0, 200.0),
                (150.0, 250.0),
            ],
            shape_duplicate_distance: 0.1,
            min_area: 20.0,
            max_area_frac: 0.8,
            min_perimeter: 10.0,
            classify_min_area: 50.0,
            approx_epsilon_frac: 0.02,
            morph_line_length: 25,
            artifact_cap: 200,
        }
    }
}

/// Spatial-stage configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpatialParams {
    /// DBSCAN neighborhood radius in pixels.
    pub cluster_eps: f32,
    pub cluster_min_samples: usize,
    /// Concentric-ring spread threshold as a fraction of the mean
    /// center distance.
    pub mandala_std_frac: f64,
    pub mandala_min_dots: usize,
    pub golden_ratio_tolerance: f64,
    /// Angular tolerances for the cultural orientation bins, degrees.
    pub cardinal_tolerance_deg: f64,
    pub octagonal_tolerance_deg: f64,
    /// Alignment fractions required for each orientation label.
    pub cardinal_fraction: f64,
    pub octagonal_fraction: f64,
    /// Below this many dots, clustering and layout heuristics are skipped.
    pub min_dots: usize,
    /// Minimum contour centroids for quadrant-balance assessment.
    pub min_centroids_for_balance: usize,
}

impl Default for SpatialParams {
    fn default() -> Self {
        Self {
            cluster_eps: 50.0,
            cluster_min_samples: 2,
            mandala_std_frac: 0.3,
            mandala_min_dots: 8,
            golden_ratio_tolerance: 0.1,
            cardinal_tolerance_deg: 15.0,
            octagonal_tolerance_deg: 10.0,
            cardinal_fraction: 0.5,
            octagonal_fraction: 0.4,
            min_dots: 4,
            min_centroids_for_balance: 5,
        }
    }
}

/// Pattern/cultural-stage configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PatternParams {
    /// Contours below this area are ignored by the element classifier.
    pub min_element_area: f64,
    /// Area above which a solid circular element is a mandala rather than
    /// a lotus bud.
    pub mandala_area: f64,
    /// Histogram peaks below this fraction of the tallest bin are noise.
    pub intensity_peak_fraction: f64,
}

impl Default for PatternParams {
    fn default() -> Self {
        Self {
            min_element_area: 100.0,
            mandala_area: 1000.0,
            intensity_peak_fraction: 0.1,
        }
    }
}

/// Full pipeline configuration: one parameter struct per stage.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PipelineParams {
    pub dots: DotParams,
    pub symmetry: SymmetryParams,
    pub strokes: StrokeParams,
    pub spatial: SpatialParams,
    pub pattern: PatternParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_round_trip_through_json() {
        let params = PipelineParams::default();
        let json = serde_json::to_string(&params).expect("serialize");
        let back: PipelineParams = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(params.dots.merge_cap, back.dots.merge_cap);
        assert_eq!(params.symmetry.fold_orders, back.symmetry.fold_orders);
        assert_eq!(params.strokes.edge_levels, back.strokes.edge_levels);
    }
}
