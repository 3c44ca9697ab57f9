use std::sync::{Arc, Mutex};

use crate::detection::domain::face_detection::FaceDetection;
use crate::detection::domain::face_inference::{FaceInference, InferenceError};
use crate::detection::domain::model_loader::{ModelLoadError, ModelLoader};
use crate::shared::frame::Frame;

/// Cloneable handle to a loaded inference backend.
///
/// Every clone drives the same backend; calls are serialized by the mutex.
#[derive(Clone)]
pub struct SharedInference {
    inner: Arc<Mutex<Box<dyn FaceInference>>>,
}

impl SharedInference {
    pub fn new(inference: Box<dyn FaceInference>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(inference)),
        }
    }
}

impl FaceInference for SharedInference {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceDetection>, InferenceError> {
        let mut backend = self
            .inner
            .lock()
            .map_err(|_| InferenceError::new("inference backend poisoned by an earlier panic"))?;
        backend.detect(frame)
    }
}

/// Lazily loaded, single-flight model slot.
///
/// The first caller of [`ModelCell::get_or_load`] runs the loader while
/// holding the slot lock; callers arriving during the load wait on that lock
/// and then receive the already-loaded handle instead of loading again.
#[derive(Default)]
pub struct ModelCell {
    slot: Mutex<Option<SharedInference>>,
}

impl ModelCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(&self, loader: &dyn ModelLoader) -> Result<SharedInference, ModelLoadError> {
        let mut slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(model) = slot.as_ref() {
            return Ok(model.clone());
        }

        log::info!("Loading face inference model");
        let model = SharedInference::new(loader.load()?);
        *slot = Some(model.clone());
        Ok(model)
    }

    pub fn is_loaded(&self) -> bool {
        self.slot
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    /// Drops the cell's handle. The backend is freed once every outstanding
    /// clone has been dropped too.
    pub fn release(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.take().is_some() {
            log::info!("Released face inference model");
        }
    }
}
