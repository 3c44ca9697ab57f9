use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::capture::domain::media_stream::StreamHandle;

/// Explicit hand-off table for live camera streams.
///
/// A component that already holds a camera (for example a pre-exam camera
/// check) stashes its stream under a session key; the proctoring capture for
/// that session takes it instead of opening a second camera session.
/// Taking a stream transfers ownership: the taker is responsible for
/// stopping it.
#[derive(Clone, Default)]
pub struct StreamRegistry {
    streams: Arc<Mutex<HashMap<String, StreamHandle>>>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `stream` under `key`. A stream previously stored under the
    /// same key is stopped, since nothing else can reach it any more.
    pub fn stash(&self, key: impl Into<String>, stream: StreamHandle) {
        let key = key.into();
        let previous = self.lock().insert(key.clone(), stream);
        if let Some(old) = previous {
            log::debug!("Replacing stashed stream {} for {key}", old.id());
            old.stop();
        }
    }

    pub fn take(&self, key: &str) -> Option<StreamHandle> {
        self.lock().remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, StreamHandle>> {
        self.streams
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
