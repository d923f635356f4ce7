use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingMetadata;

/// Sidecar location for a recording: `capture.wav` → `capture.metadata.json`.
pub fn sidecar_path(recording_path: &Path) -> PathBuf {
    recording_path.with_extension("metadata.json")
}

/// Write recording metadata as a pretty-printed JSON sidecar.
pub fn write_metadata(metadata: &RecordingMetadata, recording_path: &Path) -> Result<(), CaptureError> {
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| CaptureError::StorageError(format!("failed to serialize metadata: {}", e)))?;
    fs::write(sidecar_path(recording_path), json)
        .map_err(|e| CaptureError::StorageError(format!("failed to write metadata: {}", e)))
}

/// Read the sidecar written by [`write_metadata`].
pub fn read_metadata(recording_path: &Path) -> Result<RecordingMetadata, CaptureError> {
    let json = fs::read_to_string(sidecar_path(recording_path))
        .map_err(|e| CaptureError::StorageError(format!("failed to read metadata: {}", e)))?;
    serde_json::from_str(&json).map_err(|e| CaptureError::StorageError(format!("failed to parse metadata: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidecar_replaces_extension() {
        assert_eq!(
            sidecar_path(Path::new("/tmp/rec/capture.wav")),
            PathBuf::from("/tmp/rec/capture.metadata.json")
        );
    }

    #[test]
    fn missing_sidecar_is_a_storage_error() {
        let path = std::env::temp_dir().join("headset_capture_missing_sidecar.wav");
        assert!(matches!(read_metadata(&path), Err(CaptureError::StorageError(_))));
    }

    #[test]
    fn sidecar_uses_camel_case_keys() {
        let json = r#"{
            "id": "abc",
            "createdAt": "2026-01-01T00:00:00+00:00",
            "durationSecs": 1.0,
            "filePath": "/tmp/a.wav",
            "checksum": "00",
            "sampleRateHz": 16000,
            "channelCount": 1,
            "bitDepth": 16,
            "mode": "streaming",
            "payloadBytes": 32000
        }"#;
        let metadata: RecordingMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.sample_rate_hz, 16000);
        assert_eq!(metadata.payload_bytes, 32000);
    }
}
