//! Pipeline orchestrator.
//!
//! `AnalysisPipeline` owns the five stage analyzers, injected at
//! construction time. A run is a pull-based event iterator: the caller
//! consumes progress events, per-stage partial reports and one terminal
//! record. Stages execute lazily as events are pulled, in the fixed order
//! dots, symmetry, strokes, spatial, pattern, because later stages feed
//! on artifacts from earlier ones. A failing stage is logged, replaced by
//! its fallback record, and never stops the stages after it.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{error, info};

use kolam_core::GrayImage;
use kolam_vision::{load_gray, Contour};

use crate::event::{AnalysisEvent, ProgressEvent};
use crate::params::PipelineParams;
use crate::report::{
    round2, synthesize, DotReport, PatternReport, SpatialReport, StageReport, StrokeReport,
    SymmetryReport,
};
use crate::stages::{
    DotStage, PatternStage, SpatialStage, Stage, StageContext, StrokeStage, SymmetryStage,
};
use crate::types::Keypoint;

/// The staged analysis pipeline.
pub struct AnalysisPipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl AnalysisPipeline {
    /// Build the standard five-stage pipeline from configuration.
    pub fn new(params: PipelineParams) -> Self {
        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(DotStage::new(params.dots)),
            Box::new(SymmetryStage::new(params.symmetry)),
            Box::new(StrokeStage::new(params.strokes)),
            Box::new(SpatialStage::new(params.spatial)),
            Box::new(PatternStage::new(params.pattern)),
        ];
        Self { stages }
    }

    /// Dependency-injection constructor: substitute stage implementations
    /// directly. Used by tests to inject faulting stages; the run protocol
    /// is unchanged.
    pub fn with_stages(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Analyze an image file. Decode failures surface as the single
    /// terminal error event of the returned stream.
    pub fn run_path(&self, path: impl AsRef<Path>) -> AnalysisRun<'_> {
        AnalysisRun::new(self, ImageSource::File(path.as_ref().to_path_buf()))
    }

    /// Analyze an already-loaded grayscale image.
    pub fn run_image(&self, gray: GrayImage) -> AnalysisRun<'_> {
        AnalysisRun::new(self, ImageSource::Memory(gray))
    }
}

impl Default for AnalysisPipeline {
    fn default() -> Self {
        Self::new(PipelineParams::default())
    }
}

enum ImageSource {
    File(PathBuf),
    Memory(GrayImage),
}

enum RunState {
    Start,
    Running,
    Finalize,
    Done,
}

/// One pipeline run: a lazy iterator over `AnalysisEvent`s.
///
/// The only iteration state is the stage index and the artifacts carried
/// between stages; dropping the iterator mid-run abandons the remaining
/// stages with no side effects.
pub struct AnalysisRun<'a> {
    pipeline: &'a AnalysisPipeline,
    source: Option<ImageSource>,
    state: RunState,
    queue: VecDeque<AnalysisEvent>,
    started: Instant,
    gray: Option<GrayImage>,
    keypoints: Vec<Keypoint>,
    contours: Vec<Contour>,
    overall_symmetry: f64,
    reports: Vec<StageReport>,
    stage_idx: usize,
}

impl<'a> AnalysisRun<'a> {
    fn new(pipeline: &'a AnalysisPipeline, source: ImageSource) -> Self {
        Self {
            pipeline,
            source: Some(source),
            state: RunState::Start,
            queue: VecDeque::new(),
            started: Instant::now(),
            gray: None,
            keypoints: Vec::new(),
            contours: Vec::new(),
            overall_symmetry: 0.0,
            reports: Vec::new(),
            stage_idx: 0,
        }
    }

    fn progress(&self, progress: u8, description: &str) -> AnalysisEvent {
        let fraction = progress as f64 / 100.0;
        let estimated = if fraction > 0.0 {
            round2(self.started.elapsed().as_secs_f64() * (1.0 - fraction) / fraction)
        } else {
            0.0
        };
        AnalysisEvent::Progress(ProgressEvent {
            progress,
            description: description.to_string(),
            estimated_remaining_time: estimated,
        })
    }

    fn stage_progress_pct(&self, idx: usize) -> u8 {
        const LADDER: [u8; 5] = [10, 25, 45, 65, 80];
        let n = self.pipeline.stages.len();
        if n == LADDER.len() {
            LADDER[idx]
        } else {
            (10 + idx * 85 / n.max(1)) as u8
        }
    }

    fn advance_start(&mut self) {
        self.queue
            .push_back(self.progress(1, "Starting analysis"));

        let loaded = match self.source.take() {
            Some(ImageSource::Memory(gray)) => Ok(gray),
            Some(ImageSource::File(path)) => load_gray(&path).map_err(|e| e.to_string()),
            None => Err("image source already consumed".to_string()),
        };

        match loaded {
            Ok(gray) => {
                info!("image loaded: {}x{}", gray.width, gray.height);
                self.gray = Some(gray);
                self.state = RunState::Running;
            }
            Err(message) => {
                error!("image load failed: {message}");
                self.queue.push_back(AnalysisEvent::Error { error: message });
                self.state = RunState::Done;
            }
        }
    }

    fn advance_stage(&mut self) {
        let idx = self.stage_idx;
        if idx >= self.pipeline.stages.len() {
            self.state = RunState::Finalize;
            return;
        }

        let Some(gray) = self.gray.as_ref() else {
            self.state = RunState::Done;
            return;
        };

        let stage = &self.pipeline.stages[idx];
        let kind = stage.kind();
        self.queue.push_back(self.progress(
            self.stage_progress_pct(idx),
            &format!("Running {kind} analysis"),
        ));

        let ctx = StageContext {
            gray,
            keypoints: &self.keypoints,
            contours: &self.contours,
            overall_symmetry: self.overall_symmetry,
        };
        let result = stage.run(&ctx);

        let report = match result {
            Ok(output) => {
                if let Some(keypoints) = output.artifacts.keypoints {
                    self.keypoints = keypoints;
                }
                if let Some(contours) = output.artifacts.contours {
                    self.contours = contours;
                }
                if let Some(overall) = output.artifacts.overall_symmetry {
                    self.overall_symmetry = overall;
                }
                output.report
            }
            Err(err) => {
                // Containment: downstream stages run with empty artifacts.
                error!("{err}");
                StageReport::fallback(kind, err.to_string())
            }
        };

        self.queue.push_back(AnalysisEvent::Partial {
            report_part: report.clone(),
        });
        self.reports.push(report);
        self.stage_idx = idx + 1;
    }

    fn advance_finalize(&mut self) {
        let (width, height) = self
            .gray
            .as_ref()
            .map(|g| (g.width, g.height))
            .unwrap_or((0, 0));

        let mut dots = DotReport::default();
        let mut symmetry = SymmetryReport::default();
        let mut strokes = StrokeReport::default();
        let mut spatial = SpatialReport::default();
        let mut pattern = PatternReport::default();
        for report in self.reports.drain(..) {
            match report {
                StageReport::Dots(r) => dots = r,
                StageReport::Symmetry(r) => symmetry = r,
                StageReport::Strokes(r) => strokes = r,
                StageReport::Spatial(r) => spatial = r,
                StageReport::Pattern(r) => pattern = r,
            }
        }

        let composite = synthesize(
            width,
            height,
            dots,
            symmetry,
            strokes,
            spatial,
            pattern,
            self.started.elapsed().as_secs_f64(),
        );

        self.queue.push_back(self.progress(100, "Analysis complete"));
        self.queue.push_back(AnalysisEvent::Final {
            report: Box::new(composite),
        });
        self.state = RunState::Done;
    }
}

impl Iterator for AnalysisRun<'_> {
    type Item = AnalysisEvent;

    fn next(&mut self) -> Option<AnalysisEvent> {
        loop {
            if let Some(event) = self.queue.pop_front() {
                return Some(event);
            }
            match self.state {
                RunState::Start => self.advance_start(),
                RunState::Running => self.advance_stage(),
                RunState::Finalize => self.advance_finalize(),
                RunState::Done => return None,
            }
        }
    }
}
