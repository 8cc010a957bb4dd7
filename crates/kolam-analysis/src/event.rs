//! The pipeline event stream.
//!
//! A run emits a lazy, ordered sequence of JSON-serializable records:
//! progress updates, one partial report per stage, and exactly one
//! terminal record (the composite report, or an error when the image
//! cannot be loaded). Consumers pull events in emission order; nothing
//! is buffered or reordered.

use serde::Serialize;

use crate::report::{CompositeReport, StageReport};

/// Advisory progress: monotonically non-decreasing percentage plus a
/// rough remaining-time extrapolation. Ephemeral, never persisted.
#[derive(Clone, Debug, Serialize)]
pub struct ProgressEvent {
    pub progress: u8,
    pub description: String,
    pub estimated_remaining_time: f64,
}

/// One record of the event stream.
///
/// Serializes untagged to exactly one of the wire shapes:
/// `{progress, description, estimated_remaining_time}`,
/// `{report_part: ...}`, `{report: ...}` or `{error: ...}`.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum AnalysisEvent {
    Progress(ProgressEvent),
    Partial { report_part: StageReport },
    Final { report: Box<CompositeReport> },
    Error { error: String },
}

impl AnalysisEvent {
    /// Terminal events end the stream: the final report or an error.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AnalysisEvent::Final { .. } | AnalysisEvent::Error { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_serializes_flat() {
        let ev = AnalysisEvent::Progress(ProgressEvent {
            progress: 42,
            description: "halfway".to_string(),
            estimated_remaining_time: 3.5,
        });
        let json = serde_json::to_value(&ev).expect("serialize");
        assert_eq!(42, json["progress"]);
        assert_eq!("halfway", json["description"]);
        assert_eq!(3.5, json["estimated_remaining_time"]);
    }

    #[test]
    fn error_event_is_terminal() {
        let ev = AnalysisEvent::Error {
            error: "bad image".to_string(),
        };
        assert!(ev.is_terminal());
        let json = serde_json::to_value(&ev).expect("serialize");
        assert_eq!("bad image", json["error"]);
    }
}
