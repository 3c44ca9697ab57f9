use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::capture::domain::camera_provider::CameraProvider;
use crate::capture::domain::capture_error::{classify, CaptureError, EnvironmentFault};
use crate::capture::domain::media_stream::{StreamConstraints, StreamHandle};
use crate::capture::domain::stream_registry::StreamRegistry;
use crate::capture::domain::video_sink::VideoSink;
use crate::shared::constants::DEFAULT_SINK_READY_TIMEOUT_MS;
use crate::shared::frame::Frame;

const READY_POLL_STEP: Duration = Duration::from_millis(20);

/// Where the active stream came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamOrigin {
    /// `start` was called while already capturing; nothing changed.
    AlreadyCapturing,
    /// The sink already displayed a live stream.
    Sink,
    /// A stream stashed in the registry under this session's key.
    Registry,
    /// Freshly opened from the camera provider.
    Camera,
}

/// Owns the one camera stream of a proctoring session.
///
/// Reuses a live stream when one is reachable (already on the sink, or
/// handed over through the [`StreamRegistry`]) before opening the camera.
pub struct CaptureManager {
    provider: Box<dyn CameraProvider>,
    registry: Option<StreamRegistry>,
    session_key: String,
    stream: Option<StreamHandle>,
    sink: Option<Arc<dyn VideoSink>>,
    ready_timeout: Duration,
}

impl CaptureManager {
    pub fn new(provider: Box<dyn CameraProvider>) -> Self {
        Self {
            provider,
            registry: None,
            session_key: String::new(),
            stream: None,
            sink: None,
            ready_timeout: Duration::from_millis(DEFAULT_SINK_READY_TIMEOUT_MS),
        }
    }

    /// Adopt streams stashed under `session_key` and hand streams back there.
    pub fn with_registry(mut self, registry: StreamRegistry, session_key: impl Into<String>) -> Self {
        self.set_registry(registry, session_key);
        self
    }

    pub fn set_registry(&mut self, registry: StreamRegistry, session_key: impl Into<String>) {
        self.registry = Some(registry);
        self.session_key = session_key.into();
    }

    pub fn set_ready_timeout(&mut self, timeout: Duration) {
        self.ready_timeout = timeout;
    }

    pub fn is_capturing(&self) -> bool {
        self.stream.is_some()
    }

    pub fn sink(&self) -> Option<&Arc<dyn VideoSink>> {
        self.sink.as_ref()
    }

    pub fn sink_ready(&self) -> bool {
        self.sink.as_ref().is_some_and(|s| s.is_ready())
    }

    pub fn capture_frame(&self) -> Option<Frame> {
        self.sink.as_ref().and_then(|s| s.capture_frame())
    }

    /// Binds a stream to `sink` and waits briefly for its first frame.
    ///
    /// A sink that is still not ready after the timeout does not fail the
    /// start; the scheduler keeps polling readiness afterwards.
    pub fn start(
        &mut self,
        sink: Arc<dyn VideoSink>,
        constraints: &StreamConstraints,
    ) -> Result<StreamOrigin, CaptureError> {
        if self.stream.is_some() {
            return Ok(StreamOrigin::AlreadyCapturing);
        }

        let (stream, origin) = self.obtain_stream(sink.as_ref(), constraints)?;
        if origin != StreamOrigin::Sink {
            sink.attach(stream.clone());
        }
        log::info!("Camera stream {} bound to sink ({origin:?})", stream.id());

        self.stream = Some(stream);
        self.sink = Some(sink);

        if !self.wait_for_sink_ready() {
            log::warn!(
                "Sink not ready after {}ms; detection will retry",
                self.ready_timeout.as_millis()
            );
        }
        Ok(origin)
    }

    /// Stops every track and detaches the sink. Returns whether anything was
    /// released.
    pub fn stop(&mut self) -> bool {
        if let Some(sink) = self.sink.take() {
            sink.detach();
        }
        match self.stream.take() {
            Some(stream) => {
                stream.stop();
                log::info!("Camera stream {} stopped", stream.id());
                true
            }
            None => false,
        }
    }

    /// Detaches the sink and stashes the still-live stream in the registry
    /// instead of stopping it. Falls back to [`CaptureManager::stop`] when no
    /// registry is configured.
    pub fn handoff(&mut self) -> bool {
        let Some(registry) = self.registry.clone() else {
            return self.stop();
        };
        if let Some(sink) = self.sink.take() {
            sink.detach();
        }
        match self.stream.take() {
            Some(stream) => {
                log::info!("Handing stream {} off to {}", stream.id(), self.session_key);
                registry.stash(self.session_key.clone(), stream);
                true
            }
            None => false,
        }
    }

    fn obtain_stream(
        &mut self,
        sink: &dyn VideoSink,
        constraints: &StreamConstraints,
    ) -> Result<(StreamHandle, StreamOrigin), CaptureError> {
        if let Some(existing) = sink.stream() {
            if existing.is_live() {
                return Ok((existing, StreamOrigin::Sink));
            }
            sink.detach();
        }

        if let Some(registry) = &self.registry {
            if let Some(stashed) = registry.take(&self.session_key) {
                if stashed.is_live() {
                    return Ok((stashed, StreamOrigin::Registry));
                }
                log::debug!("Discarding dead stashed stream {}", stashed.id());
            }
        }

        if !self.provider.is_supported() {
            return Err(EnvironmentFault::Unsupported.into());
        }
        let stream = self.provider.acquire(constraints).map_err(|failure| {
            log::warn!("Camera acquisition failed: {} ({})", failure.name, failure.message);
            classify(&failure)
        })?;
        Ok((stream, StreamOrigin::Camera))
    }

    fn wait_for_sink_ready(&self) -> bool {
        let deadline = Instant::now() + self.ready_timeout;
        loop {
            if self.sink_ready() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            std::thread::sleep(READY_POLL_STEP.min(deadline - now));
        }
    }
}

impl Drop for CaptureManager {
    fn drop(&mut self) {
        self.stop();
    }
}
