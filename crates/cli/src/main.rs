mod violation_log;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;

use proctor_core::capture::domain::media_stream::StreamConstraints;
use proctor_core::capture::infrastructure::image_sequence_camera::ImageSequenceCamera;
use proctor_core::capture::infrastructure::stream_sink::StreamSink;
use proctor_core::detection::infrastructure::onnx_blazeface_inference::{
    BlazefaceModelLoader, DEFAULT_SCORE_THRESHOLD,
};
use proctor_core::proctoring::domain::proctoring_config::{ConfigUpdate, ProctoringConfig};
use proctor_core::proctoring::domain::proctoring_event::ProctoringEvent;
use proctor_core::proctoring::domain::violation::ViolationType;
use proctor_core::proctoring::proctoring_service::{DispatchMode, ProctoringService};
use proctor_core::proctoring::session_logger::StdoutSessionLogger;
use proctor_core::shared::constants::BLAZEFACE_MODEL_NAME;
use proctor_core::shared::model_resolver;

use crate::violation_log::ViolationLog;

/// How often the host loop drives the detection scheduler.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Camera-based exam proctoring over a directory of frames.
#[derive(Parser)]
#[command(name = "proctor")]
struct Cli {
    /// Directory of images played back as the camera feed.
    frames: PathBuf,

    /// Path to a BlazeFace ONNX model (skips model resolution).
    #[arg(long)]
    model: Option<PathBuf>,

    /// Download URL used when the model is not cached.
    #[arg(long)]
    model_url: Option<String>,

    /// JSON config file; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Minimum face height as a percentage of frame height.
    #[arg(long)]
    min_face_size: Option<f64>,

    /// Maximum face height as a percentage of frame height.
    #[arg(long)]
    max_face_size: Option<f64>,

    /// Face-center offset (fraction of frame) that counts as looking away.
    #[arg(long)]
    looking_away_threshold: Option<f64>,

    /// Milliseconds between detection ticks.
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Minimum milliseconds between recorded violations of one type.
    #[arg(long)]
    cooldown_ms: Option<u64>,

    /// How long each image stays on the simulated camera.
    #[arg(long, default_value = "1000")]
    frame_duration_ms: u64,

    /// Session length in seconds.
    #[arg(long, default_value = "30")]
    duration_secs: u64,

    #[arg(long, default_value = "local")]
    session_id: String,

    #[arg(long, default_value = "local")]
    assessment_id: String,

    /// Append recorded violations to this JSON-lines file.
    #[arg(long)]
    log: Option<PathBuf>,

    /// Attach a JPEG snapshot to each logged violation.
    #[arg(long)]
    snapshot_on_violation: bool,

    /// Run inference on a background thread.
    #[arg(long)]
    worker: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let config = build_config(&cli)?;
    let model_path = resolve_model(&cli)?;
    let camera = ImageSequenceCamera::new(&cli.frames);
    let constraints = constraints_for(&cli);
    let mode = if cli.worker {
        DispatchMode::Worker
    } else {
        DispatchMode::Inline
    };

    let mut service = ProctoringService::new(
        config,
        Box::new(camera),
        Arc::new(BlazefaceModelLoader::new(model_path, DEFAULT_SCORE_THRESHOLD)),
    )?
    .with_dispatch_mode(mode)
    .with_violation_snapshots(cli.snapshot_on_violation)
    .with_logger(Box::new(StdoutSessionLogger::default()));

    let (_, events) = service.subscribe_channel();
    let mut violation_log = cli
        .log
        .as_deref()
        .map(|path| ViolationLog::create(path, &cli.session_id, &cli.assessment_id))
        .transpose()?;

    let sink = Arc::new(StreamSink::new());
    let origin = service.start(sink, &constraints)?;
    log::info!("Session {} started ({origin:?})", cli.session_id);

    let deadline = Instant::now() + Duration::from_secs(cli.duration_secs);
    while Instant::now() < deadline {
        service.poll();
        for event in events.try_iter() {
            match event {
                ProctoringEvent::Violation(v) if v.kind == ViolationType::Normal => {
                    log::info!("{}", v.message);
                }
                ProctoringEvent::Violation(v) => {
                    log::debug!("[{:?}] {}", v.severity, v.message);
                }
                ProctoringEvent::ViolationRecorded {
                    violation,
                    snapshot,
                } => {
                    log::warn!("Recorded {}: {}", violation.kind, violation.message);
                    if let Some(out) = violation_log.as_mut() {
                        out.record(&violation, snapshot.as_deref())?;
                    }
                }
                ProctoringEvent::StatusChanged { previous, current } => {
                    log::info!("Status {previous:?} -> {current:?}");
                }
                ProctoringEvent::FaceCount(_) => {}
            }
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    service.stop();
    let statistics = service.statistics();
    if let Some(out) = &violation_log {
        log::info!("Wrote {} violations to the log", out.written());
    }
    println!("{}", serde_json::to_string_pretty(&statistics)?);
    Ok(())
}

fn build_config(cli: &Cli) -> Result<ProctoringConfig, Box<dyn std::error::Error>> {
    let base = match &cli.config {
        Some(path) => ProctoringConfig::from_json_file(path)?,
        None => ProctoringConfig::default(),
    };
    let config = base.merged(&ConfigUpdate {
        min_face_size: cli.min_face_size,
        max_face_size: cli.max_face_size,
        looking_away_threshold: cli.looking_away_threshold,
        detection_interval_ms: cli.interval_ms,
        violation_cooldown_ms: cli.cooldown_ms,
        ..ConfigUpdate::default()
    });
    config.validate()?;
    Ok(config)
}

/// The simulated camera holds each image for one frame period.
fn constraints_for(cli: &Cli) -> StreamConstraints {
    StreamConstraints {
        frame_rate: 1000.0 / cli.frame_duration_ms as f64,
        ..StreamConstraints::default()
    }
}

fn resolve_model(cli: &Cli) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(path) = &cli.model {
        return Ok(path.clone());
    }
    log::info!("Resolving model: {BLAZEFACE_MODEL_NAME}");
    let path = model_resolver::resolve(
        BLAZEFACE_MODEL_NAME,
        cli.model_url.as_deref(),
        Some(Path::new("models")),
        Some(Box::new(download_progress)),
    )?;
    Ok(path)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.frames.is_dir() {
        return Err(format!("Frame directory not found: {}", cli.frames.display()).into());
    }
    if let Some(model) = &cli.model {
        if !model.exists() {
            return Err(format!("Model file not found: {}", model.display()).into());
        }
    }
    if cli.frame_duration_ms == 0 {
        return Err("Frame duration must be positive".into());
    }
    if cli.duration_secs == 0 {
        return Err("Duration must be positive".into());
    }
    if cli.snapshot_on_violation && cli.log.is_none() {
        return Err("--snapshot-on-violation requires --log".into());
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}
