use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};

use crate::detection::domain::face_detection::FaceDetection;
use crate::detection::domain::face_inference::{FaceInference, InferenceError};
use crate::shared::frame::Frame;

/// A frame submitted for inference, tagged with the session generation
/// that requested it.
pub struct InferenceRequest {
    pub generation: u64,
    pub frame: Frame,
}

/// A finished inference, still tagged with its generation so the caller can
/// drop results that belong to a session that has since been stopped.
///
/// `frame` is the frame that was analysed, handed back so the caller can
/// snapshot exactly what was classified. It is `None` when no frame ever
/// reached the oracle.
#[derive(Debug)]
pub struct InferenceOutcome {
    pub generation: u64,
    pub frame_width: u32,
    pub frame_height: u32,
    pub frame: Option<Frame>,
    pub result: Result<Vec<FaceDetection>, InferenceError>,
}

impl InferenceOutcome {
    /// Runs one inference. A panicking backend yields an `Err` outcome for
    /// the request instead of unwinding into the caller.
    pub fn run(inference: &mut dyn FaceInference, request: InferenceRequest) -> Self {
        let result = panic::catch_unwind(AssertUnwindSafe(|| inference.detect(&request.frame)))
            .unwrap_or_else(|_| Err(InferenceError::new("inference backend panicked")));
        Self {
            generation: request.generation,
            frame_width: request.frame.width(),
            frame_height: request.frame.height(),
            frame: Some(request.frame),
            result,
        }
    }
}

/// How inference requests reach the oracle and how results come back.
///
/// `submit` never blocks on a running inference; completed outcomes are
/// collected with `try_complete`.
pub trait InferenceDispatch: Send {
    fn submit(&mut self, request: InferenceRequest) -> Result<(), InferenceError>;

    fn try_complete(&mut self) -> Option<InferenceOutcome>;
}

/// Runs inference synchronously inside `submit`.
///
/// The outcome is queued and handed out by the next `try_complete`, so the
/// caller sees the same submit/complete protocol as with a worker.
pub struct InlineDispatch {
    inference: Box<dyn FaceInference>,
    completed: VecDeque<InferenceOutcome>,
}

impl InlineDispatch {
    pub fn new(inference: Box<dyn FaceInference>) -> Self {
        Self {
            inference,
            completed: VecDeque::new(),
        }
    }
}

impl InferenceDispatch for InlineDispatch {
    fn submit(&mut self, request: InferenceRequest) -> Result<(), InferenceError> {
        let outcome = InferenceOutcome::run(self.inference.as_mut(), request);
        self.completed.push_back(outcome);
        Ok(())
    }

    fn try_complete(&mut self) -> Option<InferenceOutcome> {
        self.completed.pop_front()
    }
}
