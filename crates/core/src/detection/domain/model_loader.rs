use thiserror::Error;

use crate::detection::domain::face_inference::FaceInference;
use crate::shared::model_resolver::ModelResolveError;

/// The inference oracle could not be initialized. Fatal to the session.
#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("could not locate model: {0}")]
    Resolve(#[from] ModelResolveError),
    #[error("could not initialize inference runtime: {0}")]
    Runtime(String),
}

/// Produces a ready-to-use inference backend.
pub trait ModelLoader: Send + Sync {
    fn load(&self) -> Result<Box<dyn FaceInference>, ModelLoadError>;
}

impl<F> ModelLoader for F
where
    F: Fn() -> Result<Box<dyn FaceInference>, ModelLoadError> + Send + Sync,
{
    fn load(&self) -> Result<Box<dyn FaceInference>, ModelLoadError> {
        self()
    }
}
