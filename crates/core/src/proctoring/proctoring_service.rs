use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

use crate::capture::capture_manager::{CaptureManager, StreamOrigin};
use crate::capture::domain::camera_provider::CameraProvider;
use crate::capture::domain::media_stream::StreamConstraints;
use crate::capture::domain::stream_registry::StreamRegistry;
use crate::capture::domain::video_sink::VideoSink;
use crate::detection::domain::face_inference::InferenceError;
use crate::detection::domain::inference_dispatch::{
    InferenceDispatch, InferenceOutcome, InferenceRequest, InlineDispatch,
};
use crate::detection::domain::model_loader::{ModelLoadError, ModelLoader};
use crate::detection::infrastructure::inference_worker::InferenceWorker;
use crate::detection::infrastructure::model_cell::ModelCell;
use crate::proctoring::domain::detection_scheduler::{DetectionScheduler, TickDecision};
use crate::proctoring::domain::proctoring_config::{ConfigUpdate, ProctoringConfig};
use crate::proctoring::domain::proctoring_event::{EventKind, ProctoringEvent};
use crate::proctoring::domain::statistics::ProctoringStatistics;
use crate::proctoring::domain::violation::{ProctoringStatus, Violation};
use crate::proctoring::domain::violation_aggregator::ViolationAggregator;
use crate::proctoring::domain::violation_classifier::{classify, FrameAnalysis};
use crate::proctoring::error::ProctoringError;
use crate::proctoring::event_bus::{EventBus, SubscriptionId};
use crate::proctoring::session_logger::{NullSessionLogger, SessionLogger};
use crate::proctoring::snapshot::{self, SnapshotError};
use crate::shared::clock::{Clock, SystemClock};

/// Where inference runs relative to the thread calling [`ProctoringService::poll`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DispatchMode {
    /// Synchronously inside `poll`.
    #[default]
    Inline,
    /// On a dedicated worker thread; results are picked up by later polls.
    Worker,
}

/// What one call to [`ProctoringService::poll`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Ticks whose results were classified and published.
    pub completed: usize,
    /// Results dropped because they belonged to a stopped session.
    pub discarded: usize,
}

/// One proctoring session owner: camera, detection loop, and violation state.
///
/// The host drives the loop by calling [`poll`](Self::poll) regularly, e.g.
/// every few tens of milliseconds. Everything observable is published on the
/// event bus and mirrored by the accessors.
pub struct ProctoringService {
    config: ProctoringConfig,
    capture: CaptureManager,
    loader: Arc<dyn ModelLoader>,
    models: Arc<ModelCell>,
    clock: Arc<dyn Clock>,
    mode: DispatchMode,
    dispatch: Option<Box<dyn InferenceDispatch>>,
    scheduler: DetectionScheduler,
    aggregator: ViolationAggregator,
    events: EventBus,
    logger: Box<dyn SessionLogger>,
    active: bool,
    violation_snapshots: bool,
    dispatched_at: Option<Instant>,
}

impl ProctoringService {
    pub fn new(
        config: ProctoringConfig,
        camera: Box<dyn CameraProvider>,
        loader: Arc<dyn ModelLoader>,
    ) -> Result<Self, ProctoringError> {
        config.validate()?;
        let mut capture = CaptureManager::new(camera);
        capture.set_ready_timeout(Duration::from_millis(config.sink_ready_timeout_ms));
        Ok(Self {
            scheduler: DetectionScheduler::new(
                config.detection_interval_ms,
                config.readiness_retry_limit,
                config.readiness_retry_delay_ms,
            ),
            config,
            capture,
            loader,
            models: Arc::new(ModelCell::new()),
            clock: Arc::new(SystemClock),
            mode: DispatchMode::default(),
            dispatch: None,
            aggregator: ViolationAggregator::new(),
            events: EventBus::new(),
            logger: Box::new(NullSessionLogger),
            active: false,
            violation_snapshots: false,
            dispatched_at: None,
        })
    }

    /// Share one loaded model between several services.
    pub fn with_model_cell(mut self, models: Arc<ModelCell>) -> Self {
        self.models = models;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_dispatch_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_logger(mut self, logger: Box<dyn SessionLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Attach a JPEG data URL of the classified frame to every
    /// `ViolationRecorded` event.
    pub fn with_violation_snapshots(mut self, enabled: bool) -> Self {
        self.violation_snapshots = enabled;
        self
    }

    /// Adopt a stream stashed under `session_key`, and stash ours there on
    /// [`handoff_stream`](Self::handoff_stream).
    pub fn with_stream_registry(mut self, registry: StreamRegistry, session_key: &str) -> Self {
        self.capture.set_registry(registry, session_key);
        self
    }

    /// Loads the inference model if needed. Safe to call repeatedly.
    pub fn initialize(&mut self) -> Result<(), ProctoringError> {
        if self.dispatch.is_some() {
            return Ok(());
        }
        let model = self.models.get_or_load(self.loader.as_ref())?;
        let dispatch: Box<dyn InferenceDispatch> = match self.mode {
            DispatchMode::Inline => Box::new(InlineDispatch::new(Box::new(model))),
            DispatchMode::Worker => Box::new(InferenceWorker::spawn(Box::new(model)).map_err(
                |e| ModelLoadError::Runtime(format!("could not start inference worker: {e}")),
            )?),
        };
        self.dispatch = Some(dispatch);
        Ok(())
    }

    /// Starts a session on `sink`. A call while already active is a no-op.
    pub fn start(
        &mut self,
        sink: Arc<dyn VideoSink>,
        constraints: &StreamConstraints,
    ) -> Result<StreamOrigin, ProctoringError> {
        if self.active {
            return Ok(StreamOrigin::AlreadyCapturing);
        }
        self.initialize()?;
        let origin = self.capture.start(sink, constraints)?;

        self.active = true;
        let generation = self.scheduler.begin(self.clock.now_ms());
        self.logger
            .info(&format!("Proctoring session {generation} started ({origin:?})"));
        Ok(origin)
    }

    /// Advances the detection loop: collects finished inferences, then
    /// dispatches a new one if the scheduler says it is time.
    pub fn poll(&mut self) -> PollReport {
        let mut report = PollReport::default();
        self.drain_outcomes(&mut report);

        if self.active {
            let now = self.clock.now_ms();
            if let TickDecision::Dispatch { generation } =
                self.scheduler.poll(now, self.capture.sink_ready())
            {
                self.dispatch_frame(generation);
                self.drain_outcomes(&mut report);
            }
        }
        report
    }

    fn dispatch_frame(&mut self, generation: u64) {
        let Some(dispatch) = self.dispatch.as_mut() else {
            return;
        };
        self.dispatched_at = Some(Instant::now());

        let submitted = match self.capture.capture_frame() {
            Some(frame) => dispatch.submit(InferenceRequest { generation, frame }),
            None => Err(InferenceError::new("sink produced no frame")),
        };
        if let Err(error) = submitted {
            let (w, h) = self
                .capture
                .sink()
                .map(|s| s.video_dimensions())
                .unwrap_or((0, 0));
            self.complete(InferenceOutcome {
                generation,
                frame_width: w,
                frame_height: h,
                frame: None,
                result: Err(error),
            });
        }
    }

    fn drain_outcomes(&mut self, report: &mut PollReport) {
        while let Some(outcome) = self.dispatch.as_mut().and_then(|d| d.try_complete()) {
            if self.complete(outcome) {
                report.completed += 1;
            } else {
                report.discarded += 1;
            }
        }
    }

    fn complete(&mut self, outcome: InferenceOutcome) -> bool {
        let now = self.clock.now_ms();
        if !self.scheduler.on_completed(outcome.generation, now) {
            log::debug!(
                "Discarding inference result from stale session {}",
                outcome.generation
            );
            return false;
        }
        if let Some(started) = self.dispatched_at.take() {
            self.logger
                .timing("inference", started.elapsed().as_secs_f64() * 1000.0);
        }

        let analysis = match outcome.result {
            Ok(detections) => classify(
                &detections,
                outcome.frame_width,
                outcome.frame_height,
                &self.config,
                now,
            ),
            Err(error) => {
                log::warn!("{error}; treating frame as empty");
                FrameAnalysis::no_face(now)
            }
        };

        self.logger.tick();
        self.logger.metric("faces", analysis.face_count as f64);
        let events = self
            .aggregator
            .apply(analysis, now, self.config.violation_cooldown_ms);
        let recorded_snapshot = match &outcome.frame {
            Some(frame)
                if self.violation_snapshots
                    && events
                        .iter()
                        .any(|e| matches!(e, ProctoringEvent::ViolationRecorded { .. })) =>
            {
                snapshot::encode_data_url(frame)
                    .map_err(|e| log::warn!("Could not snapshot violation frame: {e}"))
                    .ok()
            }
            _ => None,
        };
        for mut event in events {
            if let ProctoringEvent::ViolationRecorded { snapshot, .. } = &mut event {
                snapshot.clone_from(&recorded_snapshot);
            }
            self.events.publish(&event);
        }
        true
    }

    /// Ends the session: halts detection, releases the camera, and resets
    /// per-session state. History is kept. Safe to call in any state.
    pub fn stop(&mut self) {
        self.halt();
        if self.capture.stop() {
            self.logger.info("Proctoring stopped");
        }
    }

    /// Like [`stop`](Self::stop) but leaves the camera stream running in the
    /// stream registry for the next service to adopt.
    pub fn handoff_stream(&mut self) {
        self.halt();
        if self.capture.handoff() {
            self.logger.info("Proctoring stopped; camera stream handed off");
        }
    }

    fn halt(&mut self) {
        self.scheduler.halt();
        self.aggregator.reset_session();
        self.dispatched_at = None;
        if std::mem::take(&mut self.active) {
            self.logger.summary();
        }
    }

    /// Stops and releases the model and history. The service can be started
    /// again afterwards; the model is reloaded on demand.
    pub fn dispose(&mut self) {
        self.stop();
        self.dispatch = None;
        self.models.release();
        self.aggregator.clear_history();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn current_status(&self) -> ProctoringStatus {
        self.aggregator.status()
    }

    pub fn current_face_count(&self) -> usize {
        self.aggregator.face_count()
    }

    pub fn latest_violation(&self) -> Option<&Violation> {
        self.aggregator.latest()
    }

    pub fn violation_history(&self) -> &[Violation] {
        self.aggregator.history()
    }

    pub fn clear_history(&mut self) {
        self.aggregator.clear_history();
    }

    pub fn statistics(&self) -> ProctoringStatistics {
        ProctoringStatistics::from_history(self.aggregator.history(), self.aggregator.face_count())
    }

    /// Current frame as a JPEG data URL; `Ok(None)` without a frame to grab.
    pub fn take_snapshot(&self) -> Result<Option<String>, SnapshotError> {
        match self.capture.capture_frame() {
            Some(frame) => snapshot::encode_data_url(&frame).map(Some),
            None => Ok(None),
        }
    }

    pub fn config(&self) -> &ProctoringConfig {
        &self.config
    }

    /// Applies a partial update. Invalid results are rejected and leave the
    /// config unchanged.
    pub fn update_config(&mut self, update: &ConfigUpdate) -> Result<(), ProctoringError> {
        let config = self.config.merged(update);
        config.validate()?;
        self.scheduler.set_timing(
            config.detection_interval_ms,
            config.readiness_retry_limit,
            config.readiness_retry_delay_ms,
        );
        self.capture
            .set_ready_timeout(Duration::from_millis(config.sink_ready_timeout_ms));
        self.config = config;
        Ok(())
    }

    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&ProctoringEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.events.subscribe(callback)
    }

    pub fn subscribe_channel(&mut self) -> (SubscriptionId, Receiver<ProctoringEvent>) {
        self.events.subscribe_channel()
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Live violation feedback, including the `NORMAL` recovery marker.
    pub fn on_violation(
        &mut self,
        mut callback: impl FnMut(&Violation) + Send + 'static,
    ) -> SubscriptionId {
        self.events
            .subscribe_kind(EventKind::Violation, move |event| {
                if let ProctoringEvent::Violation(violation) = event {
                    callback(violation);
                }
            })
    }

    pub fn on_status_change(
        &mut self,
        mut callback: impl FnMut(ProctoringStatus) + Send + 'static,
    ) -> SubscriptionId {
        self.events
            .subscribe_kind(EventKind::StatusChanged, move |event| {
                if let ProctoringEvent::StatusChanged { current, .. } = event {
                    callback(*current);
                }
            })
    }

    /// Called after every detection tick with that tick's face count.
    pub fn on_face_count_change(
        &mut self,
        mut callback: impl FnMut(usize) + Send + 'static,
    ) -> SubscriptionId {
        self.events
            .subscribe_kind(EventKind::FaceCount, move |event| {
                if let ProctoringEvent::FaceCount(count) = event {
                    callback(*count);
                }
            })
    }
}
