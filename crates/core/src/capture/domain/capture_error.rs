use thiserror::Error;

use crate::capture::domain::camera_provider::AcquireFailure;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceFault {
    #[error("No camera was found. Connect a camera and try again.")]
    NotFound,
    #[error(
        "The camera is already in use by another application. \
         Close other apps or tabs using the camera and try again."
    )]
    Busy,
    #[error("The camera cannot satisfy the requested settings ({0}). Try a different camera.")]
    ConstraintsUnsatisfiable(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnvironmentFault {
    #[error("Camera access requires a secure context. Open the exam over HTTPS or localhost.")]
    InsecureContext,
    #[error("Camera capture is not supported on this platform. Use a supported device.")]
    Unsupported,
}

/// Classified camera acquisition failure with an actionable message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error(
        "Camera access was denied. Allow camera access for this application \
         in your system or browser settings and try again."
    )]
    PermissionDenied,
    #[error(transparent)]
    Device(#[from] DeviceFault),
    #[error(transparent)]
    Environment(#[from] EnvironmentFault),
    #[error("Could not start the camera: {0}")]
    Other(String),
}

/// Maps a platform failure name onto the capture error taxonomy.
///
/// Legacy names (`PermissionDeniedError`, `DevicesNotFoundError`,
/// `TrackStartError`, `ConstraintNotSatisfiedError`) map like their modern
/// equivalents. Anything else is wrapped with its original message.
pub fn classify(failure: &AcquireFailure) -> CaptureError {
    match failure.name.as_str() {
        "NotAllowedError" | "PermissionDeniedError" => CaptureError::PermissionDenied,
        "NotFoundError" | "DevicesNotFoundError" => DeviceFault::NotFound.into(),
        "NotReadableError" | "TrackStartError" | "AbortError" => DeviceFault::Busy.into(),
        "OverconstrainedError" | "ConstraintNotSatisfiedError" => {
            DeviceFault::ConstraintsUnsatisfiable(failure.message.clone()).into()
        }
        "SecurityError" => EnvironmentFault::InsecureContext.into(),
        "NotSupportedError" | "TypeError" => EnvironmentFault::Unsupported.into(),
        _ if failure.message.is_empty() => CaptureError::Other(failure.name.clone()),
        _ => CaptureError::Other(format!("{}: {}", failure.name, failure.message)),
    }
}
