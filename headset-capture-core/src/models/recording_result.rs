use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::audio_models::{CaptureDiagnostics, RecordingMode};
use super::config::AudioConfig;

/// Result returned by `CaptureController::stop`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    pub session_id: Uuid,
    pub mode: RecordingMode,
    pub config: AudioConfig,
    /// Batch: every captured chunk in order. Streaming: the last captured chunk.
    pub data: Vec<u8>,
    /// Wall-clock time between start and stop.
    pub duration_secs: f64,
    pub diagnostics: CaptureDiagnostics,
}

impl RecordingResult {
    /// Playback duration of `data` under the session's config.
    pub fn audio_duration_secs(&self) -> f64 {
        self.config.duration_secs(self.data.len())
    }
}

/// Metadata stored alongside a saved recording.
///
/// Serializable for the JSON sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingMetadata {
    pub id: String,
    pub created_at: String,
    pub duration_secs: f64,
    pub file_path: String,
    pub checksum: String,
    pub sample_rate_hz: u32,
    pub channel_count: u16,
    pub bit_depth: u16,
    pub mode: RecordingMode,
    pub payload_bytes: u64,
}

impl RecordingMetadata {
    pub fn new(
        id: Uuid,
        created_at: DateTime<Utc>,
        config: &AudioConfig,
        mode: RecordingMode,
        payload_bytes: u64,
        file_path: &str,
        checksum: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            created_at: created_at.to_rfc3339(),
            duration_secs: config.duration_secs(payload_bytes as usize),
            file_path: file_path.to_string(),
            checksum: checksum.to_string(),
            sample_rate_hz: config.sample_rate_hz,
            channel_count: config.channel_count,
            bit_depth: config.bit_depth,
            mode,
            payload_bytes,
        }
    }
}
