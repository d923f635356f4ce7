use std::fs::{self, File};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::models::config::AudioConfig;
use crate::models::error::CaptureError;
use crate::models::recording_result::{RecordingMetadata, RecordingResult};
use crate::processing::wav_format::{self, WAV_HEADER_SIZE};
use crate::storage::metadata::{sidecar_path, write_metadata};

/// Incremental WAV file writer.
///
/// ```text
/// [44-byte WAV header, sizes patched on close]
/// [interleaved little-endian PCM...]
/// ```
///
/// Not thread-safe; wrap in a `Mutex` to share.
pub struct WavFileWriter {
    file_path: PathBuf,
    config: AudioConfig,
    file: Option<File>,
    payload_bytes: u64,
}

impl WavFileWriter {
    pub fn new(file_path: PathBuf, config: AudioConfig) -> Self {
        Self {
            file_path,
            config,
            file: None,
            payload_bytes: 0,
        }
    }

    /// Create the file (and parent directories) and write a placeholder header.
    pub fn open(&mut self) -> Result<(), CaptureError> {
        if self.file.is_some() {
            return Ok(());
        }
        self.config.validate()?;

        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| CaptureError::StorageError(format!("failed to create directory: {}", e)))?;
        }

        let mut file = File::create(&self.file_path)
            .map_err(|e| CaptureError::StorageError(format!("failed to create file: {}", e)))?;
        file.write_all(&self.header())
            .map_err(|e| CaptureError::StorageError(format!("write failed: {}", e)))?;

        self.file = Some(file);
        self.payload_bytes = 0;
        Ok(())
    }

    /// Append raw PCM.
    pub fn write(&mut self, pcm: &[u8]) -> Result<(), CaptureError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| CaptureError::StorageError("file is not open for writing".into()))?;

        if self.payload_bytes + pcm.len() as u64 > wav_format::MAX_WAV_PAYLOAD as u64 {
            return Err(CaptureError::StorageError("recording exceeds WAV size limit".into()));
        }

        file.write_all(pcm)
            .map_err(|e| CaptureError::StorageError(format!("write failed: {}", e)))?;
        self.payload_bytes += pcm.len() as u64;
        Ok(())
    }

    /// Patch the header sizes, flush, and return the file's SHA-256 hex digest.
    pub fn close(&mut self) -> Result<String, CaptureError> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| CaptureError::StorageError("file is not open".into()))?;

        file.seek(SeekFrom::Start(0))
            .map_err(|e| CaptureError::StorageError(e.to_string()))?;
        file.write_all(&self.header())
            .map_err(|e| CaptureError::StorageError(e.to_string()))?;
        file.flush().map_err(|e| CaptureError::StorageError(e.to_string()))?;
        drop(file);

        sha256_file(&self.file_path)
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// PCM bytes written so far, excluding the header.
    pub fn payload_bytes(&self) -> u64 {
        self.payload_bytes
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn header(&self) -> [u8; WAV_HEADER_SIZE] {
        let mut header = wav_format::generate_wav_header(
            self.config.sample_rate_hz,
            self.config.bit_depth,
            self.config.channel_count,
            0,
        );
        wav_format::patch_data_size(&mut header, self.payload_bytes);
        wav_format::patch_file_size(&mut header, WAV_HEADER_SIZE as u64 + self.payload_bytes);
        header
    }
}

/// Write `result` as a WAV file at `path` plus a `.metadata.json` sidecar.
pub fn save_recording(path: &Path, result: &RecordingResult) -> Result<RecordingMetadata, CaptureError> {
    let mut writer = WavFileWriter::new(path.to_path_buf(), result.config);
    writer.open()?;
    writer.write(&result.data)?;
    let checksum = writer.close()?;

    let metadata = RecordingMetadata::new(
        result.session_id,
        Utc::now(),
        &result.config,
        result.mode,
        writer.payload_bytes(),
        &path.display().to_string(),
        &checksum,
    );
    write_metadata(&metadata, path)?;

    log::info!(
        "saved {} bytes of {} audio to {}",
        metadata.payload_bytes,
        metadata.mode,
        metadata.file_path
    );
    Ok(metadata)
}

/// SHA-256 hex digest of a file.
pub fn sha256_file(path: &Path) -> Result<String, CaptureError> {
    let data =
        fs::read(path).map_err(|e| CaptureError::StorageError(format!("failed to read file for checksum: {}", e)))?;
    Ok(hex_encode(&Sha256::digest(&data)))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::audio_models::{CaptureDiagnostics, RecordingMode};
    use crate::processing::wav_format::decode_wav;
    use crate::storage::metadata::read_metadata;
    use uuid::Uuid;

    fn temp_file_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("headset_capture_test_{}", std::process::id()))
            .join(name)
    }

    fn result(config: AudioConfig, data: Vec<u8>) -> RecordingResult {
        RecordingResult {
            session_id: Uuid::new_v4(),
            mode: RecordingMode::Batch,
            config,
            data,
            duration_secs: 0.5,
            diagnostics: CaptureDiagnostics::default(),
        }
    }

    #[test]
    fn writes_header_and_payload() {
        let path = temp_file_path("plain.wav");
        let mut writer = WavFileWriter::new(path.clone(), AudioConfig::new(48000, 2, 16));
        writer.open().unwrap();
        writer.write(&[0u8; 8]).unwrap();
        writer.write(&[1u8; 8]).unwrap();

        let checksum = writer.close().unwrap();
        assert_eq!(checksum.len(), 64);
        assert!(!writer.is_open());

        let file_data = fs::read(&path).unwrap();
        assert_eq!(file_data.len(), 44 + 16);
        assert_eq!(&file_data[0..4], b"RIFF");
        assert_eq!(&file_data[8..12], b"WAVE");

        let riff_size = u32::from_le_bytes([file_data[4], file_data[5], file_data[6], file_data[7]]);
        assert_eq!(riff_size, 36 + 16);
        let data_size = u32::from_le_bytes([file_data[40], file_data[41], file_data[42], file_data[43]]);
        assert_eq!(data_size, 16);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn write_before_open_fails() {
        let mut writer = WavFileWriter::new(temp_file_path("never.wav"), AudioConfig::default());
        assert!(matches!(writer.write(&[0; 2]), Err(CaptureError::StorageError(_))));
        assert!(matches!(writer.close(), Err(CaptureError::StorageError(_))));
    }

    #[test]
    fn open_rejects_invalid_config() {
        let mut writer = WavFileWriter::new(temp_file_path("bad.wav"), AudioConfig::new(44100, 1, 8));
        assert_eq!(writer.open(), Err(CaptureError::UnsupportedFormat(8)));
    }

    #[test]
    fn saved_recording_decodes_back_with_sidecar() {
        let path = temp_file_path("saved.wav");
        let config = AudioConfig::new(16000, 1, 24);
        let recording = result(config, vec![0x10, 0x20, 0x30, 0x40, 0x50, 0x60]);

        let metadata = save_recording(&path, &recording).unwrap();

        let decoded = decode_wav(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(decoded.pcm, recording.data);
        assert_eq!(AudioConfig::from(decoded.format), config);

        assert_eq!(metadata.id, recording.session_id.to_string());
        assert_eq!(metadata.payload_bytes, 6);
        assert_eq!(metadata.checksum, sha256_file(&path).unwrap());
        assert_eq!(read_metadata(&path).unwrap(), metadata);

        fs::remove_file(&path).ok();
        fs::remove_file(sidecar_path(&path)).ok();
    }

    #[test]
    fn empty_recording_is_a_valid_wav() {
        let path = temp_file_path("empty.wav");
        save_recording(&path, &result(AudioConfig::default(), Vec::new())).unwrap();

        let decoded = decode_wav(&fs::read(&path).unwrap()).unwrap();
        assert!(decoded.pcm.is_empty());

        fs::remove_file(&path).ok();
        fs::remove_file(sidecar_path(&path)).ok();
    }
}
