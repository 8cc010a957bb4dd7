//! Error taxonomy of the analysis pipeline.
//!
//! Image-load failures are fatal and terminate the event stream before any
//! stage runs. Stage failures are recoverable: the orchestrator logs them,
//! substitutes the stage's documented fallback report, and continues with
//! empty artifacts.

use crate::stages::StageKind;

pub use kolam_vision::ImageLoadError;

/// A recoverable failure inside one analysis stage.
#[derive(thiserror::Error, Debug)]
#[error("{stage} stage failed: {message}")]
pub struct StageError {
    pub stage: StageKind,
    pub message: String,
}

impl StageError {
    pub fn new(stage: StageKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}
