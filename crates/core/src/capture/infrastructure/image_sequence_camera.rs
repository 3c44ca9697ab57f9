use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::capture::domain::camera_provider::{AcquireFailure, CameraProvider};
use crate::capture::domain::media_stream::{
    FacingMode, MediaStream, StreamConstraints, StreamHandle,
};
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;

/// Camera provider that plays a directory of still images as a live feed.
///
/// Frames are shown in file-name order, looping at the end. Each frame is
/// held for one period of the requested frame rate unless a fixed duration
/// is set. The sequence stands in for a user-facing webcam. Failures are
/// reported with the same names a real camera stack uses so they flow
/// through the normal classification.
pub struct ImageSequenceCamera {
    dir: PathBuf,
    frame_duration: Option<Duration>,
    opened: u64,
}

impl ImageSequenceCamera {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            frame_duration: None,
            opened: 0,
        }
    }

    /// Holds every image for `frame_duration`, ignoring the requested rate.
    pub fn with_frame_duration(mut self, frame_duration: Duration) -> Self {
        self.frame_duration = Some(frame_duration.max(Duration::from_millis(1)));
        self
    }

    fn frame_duration_for(&self, constraints: &StreamConstraints) -> Result<Duration, AcquireFailure> {
        if let Some(duration) = self.frame_duration {
            return Ok(duration);
        }
        if !(constraints.frame_rate.is_finite() && constraints.frame_rate > 0.0) {
            return Err(AcquireFailure::new(
                "TypeError",
                format!("invalid frame rate {}", constraints.frame_rate),
            ));
        }
        Ok(Duration::from_secs_f64(1.0 / constraints.frame_rate).max(Duration::from_millis(1)))
    }

    fn load_frames(&self) -> Result<Vec<Frame>, AcquireFailure> {
        if !self.dir.is_dir() {
            return Err(AcquireFailure::new(
                "NotFoundError",
                format!("no frame directory at {}", self.dir.display()),
            ));
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.dir)
            .map_err(|e| AcquireFailure::new("NotReadableError", e.to_string()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| is_image(p))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(AcquireFailure::new(
                "NotFoundError",
                format!("no images in {}", self.dir.display()),
            ));
        }

        paths
            .iter()
            .enumerate()
            .map(|(i, path)| {
                let img = image::open(path)
                    .map_err(|e| {
                        AcquireFailure::new("NotReadableError", format!("{}: {e}", path.display()))
                    })?
                    .to_rgb8();
                let (w, h) = img.dimensions();
                Ok(Frame::new(img.into_raw(), w, h, 3, i as u64))
            })
            .collect()
    }
}

impl CameraProvider for ImageSequenceCamera {
    fn acquire(&mut self, constraints: &StreamConstraints) -> Result<StreamHandle, AcquireFailure> {
        if constraints.facing == FacingMode::Environment {
            return Err(AcquireFailure::new(
                "OverconstrainedError",
                "image sequence only provides a user-facing feed",
            ));
        }
        let frame_duration = self.frame_duration_for(constraints)?;
        let frames = self.load_frames()?;
        let (w, h) = (frames[0].width(), frames[0].height());
        if !constraints.accepts(w, h) {
            return Err(AcquireFailure::new(
                "OverconstrainedError",
                format!("sequence resolution {w}x{h} is below the required minimum"),
            ));
        }

        self.opened += 1;
        log::info!(
            "Opened image sequence {} ({} frames, {w}x{h}, {}ms per frame)",
            self.dir.display(),
            frames.len(),
            frame_duration.as_millis()
        );
        Ok(Arc::new(ImageSequenceStream {
            id: format!("sequence-{}", self.opened),
            frames,
            frame_duration,
            started: Instant::now(),
            live: AtomicBool::new(true),
        }))
    }
}

pub struct ImageSequenceStream {
    id: String,
    frames: Vec<Frame>,
    frame_duration: Duration,
    started: Instant,
    live: AtomicBool,
}

impl ImageSequenceStream {
    fn position(&self) -> u64 {
        (self.started.elapsed().as_millis() / self.frame_duration.as_millis().max(1)) as u64
    }
}

impl MediaStream for ImageSequenceStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        let frame = self.frames.get(self.position() as usize % self.frames.len())?;
        Some((frame.width(), frame.height()))
    }

    fn current_frame(&self) -> Option<Frame> {
        if !self.is_live() {
            return None;
        }
        let position = self.position();
        let frame = &self.frames[position as usize % self.frames.len()];
        Some(Frame::new(
            frame.data().to_vec(),
            frame.width(),
            frame.height(),
            frame.channels(),
            position,
        ))
    }

    fn has_current_frame(&self) -> bool {
        self.is_live()
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
