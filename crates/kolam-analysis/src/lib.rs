//! Staged analysis of kolam/rangoli floor-art images.
//!
//! The pipeline detects the dot grid, quantifies whole-image symmetry,
//! extracts stroke geometry and its skeleton topology, interprets the
//! spatial layout, and scores cultural authenticity, emitting progress
//! and partial reports as a lazy event stream and finishing with one
//! composite report. Each stage is fault-isolated: a failing stage is
//! replaced by its documented fallback record and the run continues.

mod cluster;
mod error;
mod event;
mod graph;
mod params;
mod pipeline;
mod report;
mod stages;
mod types;

pub use error::{ImageLoadError, StageError};
pub use event::{AnalysisEvent, ProgressEvent};
pub use graph::{SkeletonGraph, SkeletonGraphMetrics};
pub use params::{
    DotParams, PatternParams, PipelineParams, SpatialParams, StrokeParams, SymmetryParams,
};
pub use pipeline::{AnalysisPipeline, AnalysisRun};
pub use report::{
    AnalysisSummary, ArtisticFlow, ArtisticStyle, AuthenticityFactors, CentroidOffset,
    ClusterPatterns, CompositeReport, ComplexityLevel, ConfidenceHistogram,
    DetectionMethodCounts, DotAdvancedMetrics, DotCharacteristics, DotRecord, DotReport,
    ElementBreakdown, EnergyFlow, GridSpacingReport, ImageInfo, KeypointSymmetryIndices,
    LineDetectionStats, NFoldScores, OrientationClass, PatternReport, PointXY,
    PrecisionLevel, PredominantFeature, QuadrantBalance, QuadrantCounts, Recommendations,
    RegionalStyle, ShapeCounts, SizeHistogram, SkillLevel, SpatialInsights, SpatialReport,
    StageReport, StageTimings, StrokeAuthenticity, StrokeBreakdown, StrokeReport, StrokeRhythm,
    SymmetryClass, SymmetryReport, TechniqueAssessment, TraditionalElements,
};
pub use stages::{
    DotStage, PatternStage, SpatialStage, Stage, StageArtifacts, StageContext, StageKind,
    StageOutput, StrokeStage, SymmetryStage,
};
pub use types::Keypoint;
