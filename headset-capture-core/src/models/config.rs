use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::audio_models::{BitDepth, TransportType};
use super::error::CaptureError;

/// PCM format used for a capture session.
///
/// Owned by the controller and frozen while a session is recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioConfig {
    /// Sample rate in Hz (default: 44100).
    pub sample_rate_hz: u32,

    /// Number of interleaved channels (default: 1). Valid values: 1, 2.
    pub channel_count: u16,

    /// Bits per PCM sample (default: 16). Valid values: 16, 24.
    pub bit_depth: u16,
}

impl AudioConfig {
    pub fn new(sample_rate_hz: u32, channel_count: u16, bit_depth: u16) -> Self {
        Self {
            sample_rate_hz,
            channel_count,
            bit_depth,
        }
    }

    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.sample_rate_hz == 0 {
            return Err(CaptureError::InvalidConfiguration(
                "sample rate must be positive".into(),
            ));
        }
        if ![1, 2].contains(&self.channel_count) {
            return Err(CaptureError::InvalidConfiguration(format!(
                "unsupported channel count: {}",
                self.channel_count
            )));
        }
        BitDepth::from_bits(self.bit_depth)?;
        Ok(())
    }

    /// Parse a config from JSON (`{"sampleRateHz":..,"channelCount":..,"bitDepth":..}`).
    ///
    /// Missing fields fall back to the defaults; the result is validated.
    pub fn from_json_str(json: &str) -> Result<Self, CaptureError> {
        let partial: PartialAudioConfig = serde_json::from_str(json)
            .map_err(|e| CaptureError::InvalidConfiguration(format!("failed to parse config: {}", e)))?;
        let defaults = Self::default();
        let config = Self {
            sample_rate_hz: partial.sample_rate_hz.unwrap_or(defaults.sample_rate_hz),
            channel_count: partial.channel_count.unwrap_or(defaults.channel_count),
            bit_depth: partial.bit_depth.unwrap_or(defaults.bit_depth),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file.
    pub fn load(path: &Path) -> Result<Self, CaptureError> {
        let json = fs::read_to_string(path).map_err(|e| {
            CaptureError::InvalidConfiguration(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    /// Bytes per single-channel sample. Only meaningful for a validated config.
    pub fn bytes_per_sample(&self) -> usize {
        self.bit_depth as usize / 8
    }

    /// Bytes per interleaved frame (`channels * bytes_per_sample`).
    pub fn block_align(&self) -> usize {
        self.channel_count as usize * self.bytes_per_sample()
    }

    /// Bytes per second of audio.
    pub fn byte_rate(&self) -> usize {
        self.sample_rate_hz as usize * self.block_align()
    }

    /// Playback duration of `bytes` of PCM in this format.
    pub fn duration_secs(&self, bytes: usize) -> f64 {
        let rate = self.byte_rate();
        if rate == 0 {
            return 0.0;
        }
        bytes as f64 / rate as f64
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 44100,
            channel_count: 1,
            bit_depth: 16,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartialAudioConfig {
    sample_rate_hz: Option<u32>,
    channel_count: Option<u16>,
    bit_depth: Option<u16>,
}

/// Who hands streaming chunks to the buffering callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamingDelivery {
    /// The worker thread fires the callback right after each enqueue.
    Push,
    /// The consumer fires it from `poll_one`.
    Poll,
}

/// Controller behaviour that is fixed for the controller's lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerOptions {
    /// Only devices with this transport are eligible; `None` accepts the first input.
    /// Headset glasses expose their microphone as a network input.
    pub device_transport: Option<TransportType>,

    /// Streaming-mode delivery policy (default: push).
    pub streaming_delivery: StreamingDelivery,

    /// Seconds of audio kept queued in streaming mode before the oldest chunks
    /// are dropped (default: 10 s). `None` keeps everything.
    pub streaming_buffer_limit_secs: Option<f64>,
}

impl ControllerOptions {
    /// Byte limit for the streaming queue under `config`.
    pub fn streaming_buffer_limit(&self, config: &AudioConfig) -> Option<usize> {
        self.streaming_buffer_limit_secs
            .map(|secs| (secs.max(0.0) * config.byte_rate() as f64) as usize)
    }
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            device_transport: Some(TransportType::Network),
            streaming_delivery: StreamingDelivery::Push,
            streaming_buffer_limit_secs: Some(10.0),
        }
    }
}
