use crate::capture::domain::media_stream::{StreamConstraints, StreamHandle};

/// A camera request failure as the platform reported it, before
/// classification. `name` carries the platform error name
/// (e.g. `NotAllowedError`).
#[derive(Clone, Debug, PartialEq)]
pub struct AcquireFailure {
    pub name: String,
    pub message: String,
}

impl AcquireFailure {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Opens camera streams.
pub trait CameraProvider: Send {
    /// Whether the platform exposes a capture API at all.
    fn is_supported(&self) -> bool {
        true
    }

    fn acquire(&mut self, constraints: &StreamConstraints) -> Result<StreamHandle, AcquireFailure>;
}
