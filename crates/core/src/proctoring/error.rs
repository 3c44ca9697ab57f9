use thiserror::Error;

use crate::capture::domain::capture_error::CaptureError;
use crate::detection::domain::model_loader::ModelLoadError;
use crate::proctoring::domain::proctoring_config::ConfigError;

/// Failures surfaced by [`ProctoringService`](super::proctoring_service::ProctoringService).
///
/// Per-frame inference failures never appear here; they are absorbed into
/// zero-face frames.
#[derive(Error, Debug)]
pub enum ProctoringError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("face detection unavailable: {0}")]
    ModelLoad(#[from] ModelLoadError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
