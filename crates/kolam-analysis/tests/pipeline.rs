//! End-to-end pipeline tests: event protocol, fault containment and the
//! synthetic-image scenarios the analysis is specified against.

use kolam_analysis::{
    AnalysisEvent, AnalysisPipeline, GridSpacingReport, PipelineParams, PredominantFeature,
    Stage, StageContext, StageError, StageKind, StageOutput, StageReport,
};
use kolam_core::GrayImage;

fn fill_disc(img: &mut GrayImage, cx: i32, cy: i32, r: i32, value: u8) {
    for y in (cy - r).max(0)..=(cy + r).min(img.height as i32 - 1) {
        for x in (cx - r).max(0)..=(cx + r).min(img.width as i32 - 1) {
            let dx = x - cx;
            let dy = y - cy;
            if dx * dx + dy * dy <= r * r {
                img.set(x as usize, y as usize, value);
            }
        }
    }
}

/// 400x400 bright canvas with 9 dark dots in a perfect 3x3 grid at
/// 100 px spacing, centered on the canvas.
fn nine_dot_grid() -> GrayImage {
    let mut img = GrayImage::filled(400, 400, 235);
    for j in 0..3 {
        for i in 0..3 {
            fill_disc(&mut img, 100 + i * 100, 100 + j * 100, 8, 25);
        }
    }
    img
}

fn collect_events(img: GrayImage) -> Vec<AnalysisEvent> {
    AnalysisPipeline::default().run_image(img).collect()
}

fn final_report(events: &[AnalysisEvent]) -> &kolam_analysis::CompositeReport {
    match events.last() {
        Some(AnalysisEvent::Final { report }) => report,
        other => panic!("expected final report, got {other:?}"),
    }
}

#[test]
fn stream_ends_with_exactly_one_terminal_event() {
    let events = collect_events(nine_dot_grid());
    let terminals = events.iter().filter(|e| e.is_terminal()).count();
    assert_eq!(1, terminals);
    assert!(events.last().expect("non-empty stream").is_terminal());
}

#[test]
fn stream_yields_progress_then_report_per_stage() {
    let events = collect_events(nine_dot_grid());

    let partials: Vec<StageKind> = events
        .iter()
        .filter_map(|e| match e {
            AnalysisEvent::Partial { report_part } => Some(report_part.kind()),
            _ => None,
        })
        .collect();
    assert_eq!(
        vec![
            StageKind::Dots,
            StageKind::Symmetry,
            StageKind::Strokes,
            StageKind::Spatial,
            StageKind::Pattern,
        ],
        partials
    );

    // First event is a progress record and progress never decreases.
    assert!(matches!(events.first(), Some(AnalysisEvent::Progress(_))));
    let mut last = 0u8;
    for e in &events {
        if let AnalysisEvent::Progress(p) = e {
            assert!(p.progress >= last, "progress went backwards");
            last = p.progress;
        }
    }
    assert_eq!(100, last);
}

#[test]
fn unreadable_path_emits_single_error_and_no_stages() {
    let pipeline = AnalysisPipeline::default();
    let events: Vec<AnalysisEvent> = pipeline.run_path("/nonexistent/kolam.png").collect();

    assert!(matches!(events.last(), Some(AnalysisEvent::Error { .. })));
    assert_eq!(1, events.iter().filter(|e| e.is_terminal()).count());
    assert!(!events
        .iter()
        .any(|e| matches!(e, AnalysisEvent::Partial { .. } | AnalysisEvent::Final { .. })));
}

#[test]
fn event_wire_shapes_match_the_protocol() {
    let events = collect_events(nine_dot_grid());
    for event in &events {
        let json = serde_json::to_value(event).expect("event serializes");
        let obj = json.as_object().expect("event is an object");
        let is_progress = obj.contains_key("progress");
        let is_partial = obj.contains_key("report_part");
        let is_final = obj.contains_key("report");
        let is_error = obj.contains_key("error");
        assert_eq!(
            1,
            [is_progress, is_partial, is_final, is_error]
                .iter()
                .filter(|&&b| b)
                .count(),
            "ambiguous event shape: {json}"
        );
    }
}

#[test]
fn blank_image_produces_the_basic_shapes_fallback_report() {
    let events = collect_events(GrayImage::filled(200, 200, 128));
    let report = final_report(&events);
    assert_eq!(0, report.summary.total_dots_detected);
    assert_eq!(0, report.summary.total_strokes_detected);
    assert_eq!(
        PredominantFeature::BasicShapes,
        report.summary.predominant_feature
    );
    assert_eq!(0.0, report.summary.overall_quality_score);
}

#[test]
fn nine_dot_grid_end_to_end_scenario() {
    let events = collect_events(nine_dot_grid());
    let report = final_report(&events);

    assert!(
        report.summary.total_dots_detected >= 9,
        "found only {} dots",
        report.summary.total_dots_detected
    );

    let dots = report
        .stages
        .iter()
        .find_map(|s| match s {
            StageReport::Dots(d) => Some(d),
            _ => None,
        })
        .expect("dot stage report present");

    let GridSpacingReport::Measured {
        mean_spacing,
        consistency_score,
        ..
    } = dots.grid_spacing
    else {
        panic!("expected measured grid spacing");
    };
    assert!(
        (mean_spacing - 100.0).abs() < 15.0,
        "mean spacing {mean_spacing}"
    );
    assert!(
        consistency_score > 0.8,
        "consistency {consistency_score}"
    );

    let indices = dots
        .characteristics
        .symmetry_indices
        .expect("enough dots for symmetry indices");
    assert!(indices.horizontal_reflection > 0.9);
    assert!(indices.vertical_reflection > 0.9);
}

// ---------------------------------------------------------------------------
// Fault containment

struct FailingStage {
    kind: StageKind,
}

impl Stage for FailingStage {
    fn kind(&self) -> StageKind {
        self.kind
    }

    fn run(&self, _ctx: &StageContext<'_>) -> Result<StageOutput, StageError> {
        Err(StageError::new(self.kind, "injected fault"))
    }
}

fn pipeline_with_fault(faulted: StageKind) -> AnalysisPipeline {
    let params = PipelineParams::default();
    let kinds = [
        StageKind::Dots,
        StageKind::Symmetry,
        StageKind::Strokes,
        StageKind::Spatial,
        StageKind::Pattern,
    ];
    let stages: Vec<Box<dyn Stage>> = kinds
        .iter()
        .map(|&kind| -> Box<dyn Stage> {
            if kind == faulted {
                Box::new(FailingStage { kind })
            } else {
                match kind {
                    StageKind::Dots => {
                        Box::new(kolam_analysis::DotStage::new(params.dots.clone()))
                    }
                    StageKind::Symmetry => {
                        Box::new(kolam_analysis::SymmetryStage::new(params.symmetry.clone()))
                    }
                    StageKind::Strokes => {
                        Box::new(kolam_analysis::StrokeStage::new(params.strokes.clone()))
                    }
                    StageKind::Spatial => {
                        Box::new(kolam_analysis::SpatialStage::new(params.spatial.clone()))
                    }
                    StageKind::Pattern => {
                        Box::new(kolam_analysis::PatternStage::new(params.pattern.clone()))
                    }
                }
            }
        })
        .collect();
    AnalysisPipeline::with_stages(stages)
}

#[test]
fn a_faulting_stage_never_stops_the_others() {
    for faulted in [
        StageKind::Dots,
        StageKind::Symmetry,
        StageKind::Strokes,
        StageKind::Spatial,
        StageKind::Pattern,
    ] {
        let pipeline = pipeline_with_fault(faulted);
        let events: Vec<AnalysisEvent> = pipeline.run_image(nine_dot_grid()).collect();

        let partials: Vec<&StageReport> = events
            .iter()
            .filter_map(|e| match e {
                AnalysisEvent::Partial { report_part } => Some(report_part),
                _ => None,
            })
            .collect();
        assert_eq!(5, partials.len(), "faulting {faulted} lost a stage");

        for part in &partials {
            if part.kind() == faulted {
                let err = part.error().expect("faulted stage carries its error");
                assert!(err.contains("injected fault"));
            } else {
                assert!(part.error().is_none(), "{faulted} leaked into {:?}", part.kind());
            }
        }

        // The composite is still produced and remains serializable.
        let report = final_report(&events);
        assert_eq!(5, report.stages.len());
        let json = report.to_json();
        assert!(json.is_object());
    }
}

#[test]
fn faulted_dot_stage_zeroes_its_composite_contribution() {
    let pipeline = pipeline_with_fault(StageKind::Dots);
    let events: Vec<AnalysisEvent> = pipeline.run_image(nine_dot_grid()).collect();
    let report = final_report(&events);
    assert_eq!(0, report.summary.total_dots_detected);
    // Downstream stages ran on empty keypoints but still reported.
    assert!(report
        .stages
        .iter()
        .any(|s| matches!(s, StageReport::Spatial(r) if r.error.is_none())));
}
