use std::time::Instant;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::audio_models::{InputDevice, RecordingMode};
use super::config::AudioConfig;

/// Transient bookkeeping for the active recording.
///
/// Created by `start`, dropped by `stop`.
#[derive(Debug, Clone)]
pub struct RecordingSession {
    pub id: Uuid,
    pub mode: RecordingMode,
    pub config: AudioConfig,
    pub device: InputDevice,
    pub started_at: DateTime<Utc>,
    started: Instant,
    pub(crate) accumulated_bytes: u64,
}

impl RecordingSession {
    pub fn new(mode: RecordingMode, config: AudioConfig, device: InputDevice) -> Self {
        Self {
            id: Uuid::new_v4(),
            mode,
            config,
            device,
            started_at: Utc::now(),
            started: Instant::now(),
            accumulated_bytes: 0,
        }
    }

    /// Bytes captured so far, as of the last diagnostics refresh.
    pub fn accumulated_bytes(&self) -> u64 {
        self.accumulated_bytes
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}
