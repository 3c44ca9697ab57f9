//! Fakes shared by the unit tests of several modules.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::capture::domain::camera_provider::{AcquireFailure, CameraProvider};
use crate::capture::domain::media_stream::{MediaStream, StreamConstraints, StreamHandle};
use crate::detection::domain::face_detection::{BoundingBox, FaceDetection};
use crate::detection::domain::face_inference::{FaceInference, InferenceError};
use crate::shared::frame::Frame;

pub const FRAME_W: u32 = 640;
pub const FRAME_H: u32 = 480;

pub struct FakeStream {
    id: String,
    live: AtomicBool,
    dims: Mutex<Option<(u32, u32)>>,
    has_frame: AtomicBool,
}

impl FakeStream {
    pub fn ready(id: &str, w: u32, h: u32) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            live: AtomicBool::new(true),
            dims: Mutex::new(Some((w, h))),
            has_frame: AtomicBool::new(true),
        })
    }

    /// Live stream whose sink has not decoded anything yet.
    pub fn pending(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            live: AtomicBool::new(true),
            dims: Mutex::new(None),
            has_frame: AtomicBool::new(false),
        })
    }

    pub fn make_ready(&self, w: u32, h: u32) {
        *self.dims.lock().unwrap() = Some((w, h));
        self.has_frame.store(true, Ordering::SeqCst);
    }

    pub fn set_dimensions_only(&self, w: u32, h: u32) {
        *self.dims.lock().unwrap() = Some((w, h));
    }
}

impl MediaStream for FakeStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        *self.dims.lock().unwrap()
    }

    fn current_frame(&self) -> Option<Frame> {
        if !self.is_live() || !self.has_frame.load(Ordering::SeqCst) {
            return None;
        }
        let (w, h) = self.dimensions()?;
        Some(Frame::solid(w, h, [90, 90, 90], 0))
    }
}

/// Camera that hands out queued results, then fresh ready streams.
pub struct FakeCamera {
    queue: Arc<Mutex<VecDeque<Result<StreamHandle, AcquireFailure>>>>,
    calls: Arc<AtomicUsize>,
    supported: bool,
}

impl FakeCamera {
    pub fn new() -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(AtomicUsize::new(0)),
            supported: true,
        }
    }

    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }

    pub fn push_stream(&self, stream: StreamHandle) {
        self.queue.lock().unwrap().push_back(Ok(stream));
    }

    pub fn push_failure(&self, failure: AcquireFailure) {
        self.queue.lock().unwrap().push_back(Err(failure));
    }
}

impl CameraProvider for FakeCamera {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn acquire(&mut self, _constraints: &StreamConstraints) -> Result<StreamHandle, AcquireFailure> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.queue.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(FakeStream::ready(&format!("camera-{n}"), FRAME_W, FRAME_H)),
        }
    }
}

pub type ScriptStep = Result<Vec<FaceDetection>, InferenceError>;

/// Inference that replays a script, then repeats `fallback` forever.
pub struct ScriptedInference {
    script: Arc<Mutex<VecDeque<ScriptStep>>>,
    fallback: Arc<Mutex<Vec<FaceDetection>>>,
    calls: Arc<AtomicUsize>,
}

#[derive(Clone)]
pub struct InferenceScript {
    script: Arc<Mutex<VecDeque<ScriptStep>>>,
    fallback: Arc<Mutex<Vec<FaceDetection>>>,
    calls: Arc<AtomicUsize>,
}

impl InferenceScript {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            fallback: Arc::new(Mutex::new(vec![centered_face(40.0, 0.95)])),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn push(&self, step: ScriptStep) {
        self.script.lock().unwrap().push_back(step);
    }

    pub fn set_fallback(&self, faces: Vec<FaceDetection>) {
        *self.fallback.lock().unwrap() = faces;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inference(&self) -> ScriptedInference {
        ScriptedInference {
            script: self.script.clone(),
            fallback: self.fallback.clone(),
            calls: self.calls.clone(),
        }
    }
}

impl FaceInference for ScriptedInference {
    fn detect(&mut self, _frame: &Frame) -> Result<Vec<FaceDetection>, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().pop_front() {
            Some(step) => step,
            None => Ok(self.fallback.lock().unwrap().clone()),
        }
    }
}

/// Face centered in a 640x480 frame, `height_pct` percent of frame height.
pub fn centered_face(height_pct: f64, confidence: f64) -> FaceDetection {
    face_at(0.0, 0.0, height_pct, confidence)
}

/// Face offset from the frame center by fractions of the frame size.
pub fn face_at(offset_x: f64, offset_y: f64, height_pct: f64, confidence: f64) -> FaceDetection {
    let w = FRAME_W as f64;
    let h = FRAME_H as f64;
    let face_h = h * height_pct / 100.0;
    let bbox = BoundingBox::centered_at(
        w / 2.0 + offset_x * w,
        h / 2.0 + offset_y * h,
        face_h * 0.8,
        face_h,
    );
    FaceDetection::new(bbox, confidence)
}
