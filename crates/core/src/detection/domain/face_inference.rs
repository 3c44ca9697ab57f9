use thiserror::Error;

use crate::detection::domain::face_detection::FaceDetection;
use crate::shared::frame::Frame;

/// A single-frame inference failure. Recovered by the engine, never fatal.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("face inference failed: {0}")]
pub struct InferenceError(pub String);

impl InferenceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Domain interface for the face-inference oracle.
///
/// Implementations may hold mutable runtime state (sessions, buffers),
/// hence `&mut self`.
pub trait FaceInference: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceDetection>, InferenceError>;
}
