//! The five stage analyzers and their shared execution contract.

mod dots;
mod pattern;
mod spatial;
mod strokes;
mod symmetry;

pub use dots::DotStage;
pub use pattern::PatternStage;
pub use spatial::SpatialStage;
pub use strokes::StrokeStage;
pub use symmetry::SymmetryStage;

use kolam_core::GrayImage;
use kolam_vision::Contour;
use serde::Serialize;

use crate::error::StageError;
use crate::report::StageReport;
use crate::types::Keypoint;

/// Identity of a stage, used for logging, fallbacks and fault reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Dots,
    Symmetry,
    Strokes,
    Spatial,
    Pattern,
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StageKind::Dots => "dots",
            StageKind::Symmetry => "symmetry",
            StageKind::Strokes => "strokes",
            StageKind::Spatial => "spatial",
            StageKind::Pattern => "pattern",
        };
        f.write_str(name)
    }
}

/// Read-only inputs a stage sees: the immutable source image plus the
/// artifacts produced by earlier stages. A failed upstream stage leaves
/// its artifacts empty, and every stage must tolerate that.
pub struct StageContext<'a> {
    pub gray: &'a GrayImage,
    pub keypoints: &'a [Keypoint],
    pub contours: &'a [Contour],
    pub overall_symmetry: f64,
}

/// Artifacts a stage hands to the stages after it.
#[derive(Default)]
pub struct StageArtifacts {
    pub keypoints: Option<Vec<Keypoint>>,
    pub contours: Option<Vec<Contour>>,
    pub overall_symmetry: Option<f64>,
}

/// A stage run result: the report for the event stream plus any carried
/// artifacts.
pub struct StageOutput {
    pub report: StageReport,
    pub artifacts: StageArtifacts,
}

impl StageOutput {
    pub fn report_only(report: StageReport) -> Self {
        Self {
            report,
            artifacts: StageArtifacts::default(),
        }
    }
}

/// A fault-isolated analysis stage.
///
/// Stages are injected into the pipeline at construction time; a failing
/// implementation never aborts the run, it is replaced by its fallback
/// report.
pub trait Stage {
    fn kind(&self) -> StageKind;
    fn run(&self, ctx: &StageContext<'_>) -> Result<StageOutput, StageError>;
}
