pub const BLAZEFACE_MODEL_NAME: &str = "blazeface_short_range.onnx";

/// Application directory name under the platform cache/config dirs.
pub const APP_DIR_NAME: &str = "Proctor";

pub const DEFAULT_MIN_FACE_SIZE: f64 = 15.0;
pub const DEFAULT_MAX_FACE_SIZE: f64 = 70.0;
pub const DEFAULT_LOOKING_AWAY_THRESHOLD: f64 = 0.25;
pub const DEFAULT_DETECTION_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_VIOLATION_COOLDOWN_MS: u64 = 3000;

/// Readiness-retry budget before the first inference (~10 s total).
pub const DEFAULT_READINESS_RETRY_LIMIT: u32 = 50;
pub const DEFAULT_READINESS_RETRY_DELAY_MS: u64 = 200;

/// Upper bound on the post-bind wait for the sink's first frame.
pub const DEFAULT_SINK_READY_TIMEOUT_MS: u64 = 1000;

/// Offsets above this fraction of the looking-away threshold count as eye movement.
pub const EYE_MOVEMENT_FACTOR: f64 = 0.7;

/// Detection confidence below which the frame is flagged as poorly lit.
pub const POOR_LIGHTING_CONFIDENCE: f64 = 0.7;

pub const SNAPSHOT_JPEG_QUALITY: u8 = 80;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
