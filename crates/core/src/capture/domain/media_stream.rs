use std::sync::Arc;

use crate::shared::frame::Frame;

/// A live camera stream and its tracks.
///
/// Streams are shared (`Arc`) between the capture manager, the sink that
/// displays them, and the stream registry, so every method takes `&self`.
pub trait MediaStream: Send + Sync {
    fn id(&self) -> &str;

    /// True while at least one track is still delivering frames.
    fn is_live(&self) -> bool;

    /// Stops every track. Idempotent.
    fn stop(&self);

    /// Native resolution of the video track, once known.
    fn dimensions(&self) -> Option<(u32, u32)>;

    fn current_frame(&self) -> Option<Frame>;

    fn has_current_frame(&self) -> bool {
        self.current_frame().is_some()
    }
}

pub type StreamHandle = Arc<dyn MediaStream>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FacingMode {
    User,
    Environment,
}

/// What the host asks of the camera. `ideal_*` values are hints; `min_*`
/// values are hard requirements a provider must reject if it cannot meet.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub min_width: Option<u32>,
    pub min_height: Option<u32>,
    pub frame_rate: f64,
    pub facing: FacingMode,
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self {
            ideal_width: 640,
            ideal_height: 480,
            min_width: None,
            min_height: None,
            frame_rate: 30.0,
            facing: FacingMode::User,
        }
    }
}

impl StreamConstraints {
    /// Whether a stream of the given resolution meets the hard minimums.
    pub fn accepts(&self, width: u32, height: u32) -> bool {
        self.min_width.map_or(true, |min| width >= min)
            && self.min_height.map_or(true, |min| height >= min)
    }
}
