use crate::capture::domain::media_stream::StreamHandle;
use crate::shared::frame::Frame;

/// How much media the sink has buffered, in increasing order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

/// The on-screen element receiving the live stream for display and sampling.
///
/// Hosts keep their own handle to the sink while the engine holds another,
/// so implementations use interior mutability.
pub trait VideoSink: Send + Sync {
    fn attach(&self, stream: StreamHandle);

    /// Detaches and returns the current stream, if any.
    fn detach(&self) -> Option<StreamHandle>;

    fn stream(&self) -> Option<StreamHandle>;

    /// Native video resolution; `(0, 0)` while unknown.
    fn video_dimensions(&self) -> (u32, u32);

    fn ready_state(&self) -> ReadyState;

    fn capture_frame(&self) -> Option<Frame>;

    /// Non-zero dimensions and at least the current frame decoded.
    fn is_ready(&self) -> bool {
        let (w, h) = self.video_dimensions();
        w > 0 && h > 0 && self.ready_state() >= ReadyState::HaveCurrentData
    }
}
