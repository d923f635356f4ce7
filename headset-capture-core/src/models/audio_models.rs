use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::CaptureError;

/// Supported signed PCM sample widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitDepth {
    Pcm16,
    Pcm24,
}

impl BitDepth {
    pub fn from_bits(bits: u16) -> Result<Self, CaptureError> {
        match bits {
            16 => Ok(Self::Pcm16),
            24 => Ok(Self::Pcm24),
            other => Err(CaptureError::UnsupportedFormat(other)),
        }
    }

    pub fn bits(self) -> u16 {
        match self {
            Self::Pcm16 => 16,
            Self::Pcm24 => 24,
        }
    }

    pub fn bytes_per_sample(self) -> usize {
        self.bits() as usize / 8
    }

    /// Full-scale divisor: `2^(bits - 1)`.
    pub fn full_scale(self) -> f32 {
        match self {
            Self::Pcm16 => 32768.0,
            Self::Pcm24 => 8388608.0,
        }
    }

    /// Inclusive signed integer range representable at this width.
    pub fn range(self) -> (i32, i32) {
        match self {
            Self::Pcm16 => (i16::MIN as i32, i16::MAX as i32),
            Self::Pcm24 => (-8_388_608, 8_388_607),
        }
    }
}

/// How captured audio reaches the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingMode {
    /// Accumulate everything and deliver once at stop.
    #[default]
    Batch,
    /// Deliver chunk by chunk while recording.
    Streaming,
}

impl RecordingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Batch => "batch",
            Self::Streaming => "streaming",
        }
    }
}

impl fmt::Display for RecordingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport type for an input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransportType {
    BuiltIn,
    Usb,
    Bluetooth,
    /// IP-connected input, which is how tethered glasses present their microphone.
    Network,
    Unknown,
}

/// An input device a provider can open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDevice {
    pub id: String,
    pub name: String,
    pub transport: TransportType,
    pub is_default: bool,
}

/// Counters collected by the capture worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureDiagnostics {
    pub chunks_captured: u64,
    pub bytes_captured: u64,
    pub empty_reads: u64,
    pub read_errors: u64,
    pub chunks_dropped: u64,
    pub bytes_dropped: u64,
    pub read_size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_depth_from_bits() {
        assert_eq!(BitDepth::from_bits(16), Ok(BitDepth::Pcm16));
        assert_eq!(BitDepth::from_bits(24), Ok(BitDepth::Pcm24));
        assert_eq!(BitDepth::from_bits(8), Err(CaptureError::UnsupportedFormat(8)));
        assert_eq!(BitDepth::from_bits(32), Err(CaptureError::UnsupportedFormat(32)));
    }

    #[test]
    fn mode_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RecordingMode::Streaming).unwrap(), "\"streaming\"");
        let mode: RecordingMode = serde_json::from_str("\"batch\"").unwrap();
        assert_eq!(mode, RecordingMode::Batch);
    }
}
