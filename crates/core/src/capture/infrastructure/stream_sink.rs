use std::sync::Mutex;

use crate::capture::domain::media_stream::StreamHandle;
use crate::capture::domain::video_sink::{ReadyState, VideoSink};
use crate::shared::frame::Frame;

/// In-process sink that samples frames straight from the attached stream.
///
/// Headless hosts use it in place of an on-screen video element.
#[derive(Default)]
pub struct StreamSink {
    stream: Mutex<Option<StreamHandle>>,
}

impl StreamSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn current(&self) -> Option<StreamHandle> {
        self.stream
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl VideoSink for StreamSink {
    fn attach(&self, stream: StreamHandle) {
        *self.stream.lock().unwrap_or_else(|p| p.into_inner()) = Some(stream);
    }

    fn detach(&self) -> Option<StreamHandle> {
        self.stream.lock().unwrap_or_else(|p| p.into_inner()).take()
    }

    fn stream(&self) -> Option<StreamHandle> {
        self.current()
    }

    fn video_dimensions(&self) -> (u32, u32) {
        self.current()
            .filter(|s| s.is_live())
            .and_then(|s| s.dimensions())
            .unwrap_or((0, 0))
    }

    fn ready_state(&self) -> ReadyState {
        match self.current() {
            Some(s) if s.is_live() && s.dimensions().is_some() => {
                if s.has_current_frame() {
                    ReadyState::HaveEnoughData
                } else {
                    ReadyState::HaveMetadata
                }
            }
            _ => ReadyState::HaveNothing,
        }
    }

    fn capture_frame(&self) -> Option<Frame> {
        self.current()
            .filter(|s| s.is_live())
            .and_then(|s| s.current_frame())
    }
}
