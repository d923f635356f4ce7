//! WAV container utilities.
//!
//! Builds and parses the canonical 44-byte RIFF header used for saved
//! recordings, plus patch helpers for writers that fill in sizes after the
//! payload has been streamed to disk.

use crate::models::audio_models::BitDepth;
use crate::models::config::AudioConfig;
use crate::models::error::CaptureError;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Largest payload whose RIFF chunk size still fits in 32 bits.
pub const MAX_WAV_PAYLOAD: usize = u32::MAX as usize - (WAV_HEADER_SIZE - 8);

const PCM_FORMAT_TAG: u16 = 1;
const PCM_FMT_CHUNK_SIZE: u32 = 16;

/// Format fields carried in a WAV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    pub sample_rate_hz: u32,
    pub channel_count: u16,
    pub bit_depth: u16,
}

impl WavFormat {
    /// Widened so arbitrary decoded headers cannot overflow.
    pub fn byte_rate(&self) -> u64 {
        self.sample_rate_hz as u64 * self.channel_count as u64 * self.bit_depth as u64 / 8
    }

    pub fn block_align(&self) -> u32 {
        self.channel_count as u32 * self.bit_depth as u32 / 8
    }
}

impl From<AudioConfig> for WavFormat {
    fn from(config: AudioConfig) -> Self {
        Self {
            sample_rate_hz: config.sample_rate_hz,
            channel_count: config.channel_count,
            bit_depth: config.bit_depth,
        }
    }
}

impl From<WavFormat> for AudioConfig {
    fn from(format: WavFormat) -> Self {
        AudioConfig::new(format.sample_rate_hz, format.channel_count, format.bit_depth)
    }
}

/// A parsed WAV container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedWav {
    pub format: WavFormat,
    pub pcm: Vec<u8>,
}

/// Generate a 44-byte WAV RIFF header.
///
/// Format: PCM (format code 1), little-endian.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    file size - 8 (36 + data_size)
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (PCM format code)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * bit_depth / 8
/// [32-33]  block_align = channels * bit_depth / 8
/// [34-35]  bit_depth
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn generate_wav_header(sample_rate: u32, bit_depth: u16, channels: u16, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let byte_rate = (sample_rate as u64 * channels as u64 * bit_depth as u64 / 8) as u32;
    let block_align = (channels as u32 * bit_depth as u32 / 8) as u16;
    let chunk_size = 36u32.saturating_add(data_size);

    let mut header = [0u8; WAV_HEADER_SIZE];

    // RIFF chunk descriptor
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    // fmt sub-chunk
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&PCM_FMT_CHUNK_SIZE.to_le_bytes());
    header[20..22].copy_from_slice(&PCM_FORMAT_TAG.to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bit_depth.to_le_bytes());

    // data sub-chunk
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Patch the file-size field at offset 4 (RIFF chunk size = file_size - 8).
pub fn patch_file_size(header: &mut [u8], total_file_size: u64) {
    let chunk_size = (total_file_size - 8) as u32;
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
}

/// Patch the data-size field at offset 40.
pub fn patch_data_size(header: &mut [u8], data_size: u64) {
    let data_size_u32 = data_size as u32;
    header[40..44].copy_from_slice(&data_size_u32.to_le_bytes());
}

/// Wrap raw PCM in a WAV container.
pub fn encode_wav(pcm: &[u8], sample_rate_hz: u32, channel_count: u16, bit_depth: u16) -> Result<Vec<u8>, CaptureError> {
    BitDepth::from_bits(bit_depth)?;
    if sample_rate_hz == 0 || channel_count == 0 {
        return Err(CaptureError::InvalidConfiguration(format!(
            "cannot encode WAV with {} Hz and {} channels",
            sample_rate_hz, channel_count
        )));
    }
    let format = WavFormat {
        sample_rate_hz,
        channel_count,
        bit_depth,
    };
    if format.byte_rate() > u32::MAX as u64 || format.block_align() > u16::MAX as u32 {
        return Err(CaptureError::InvalidConfiguration(format!(
            "{} Hz x {} channels overflows the WAV header",
            sample_rate_hz, channel_count
        )));
    }
    if pcm.len() > MAX_WAV_PAYLOAD {
        return Err(CaptureError::StorageError(format!(
            "payload of {} bytes exceeds the WAV size limit",
            pcm.len()
        )));
    }

    let header = generate_wav_header(sample_rate_hz, bit_depth, channel_count, pcm.len() as u32);
    let mut container = Vec::with_capacity(WAV_HEADER_SIZE + pcm.len());
    container.extend_from_slice(&header);
    container.extend_from_slice(pcm);
    Ok(container)
}

/// Parse a canonical 44-byte-header WAV container.
pub fn decode_wav(container: &[u8]) -> Result<DecodedWav, CaptureError> {
    if container.len() < WAV_HEADER_SIZE {
        return Err(malformed(format!(
            "{} bytes is shorter than the {}-byte header",
            container.len(),
            WAV_HEADER_SIZE
        )));
    }

    expect_tag(container, 0, b"RIFF")?;
    expect_tag(container, 8, b"WAVE")?;
    expect_tag(container, 12, b"fmt ")?;
    expect_tag(container, 36, b"data")?;

    let riff_size = read_u32(container, 4) as usize;
    if riff_size != container.len() - 8 {
        return Err(malformed(format!(
            "RIFF size {} does not match container length {}",
            riff_size,
            container.len()
        )));
    }

    let fmt_size = read_u32(container, 16);
    if fmt_size != PCM_FMT_CHUNK_SIZE {
        return Err(malformed(format!("unexpected fmt chunk size {}", fmt_size)));
    }
    let format_tag = read_u16(container, 20);
    if format_tag != PCM_FORMAT_TAG {
        return Err(malformed(format!("unsupported format tag {}", format_tag)));
    }

    let format = WavFormat {
        channel_count: read_u16(container, 22),
        sample_rate_hz: read_u32(container, 24),
        bit_depth: read_u16(container, 34),
    };
    BitDepth::from_bits(format.bit_depth)?;
    if format.channel_count == 0 || format.sample_rate_hz == 0 {
        return Err(malformed("zero channels or sample rate".into()));
    }

    let byte_rate = read_u32(container, 28);
    let block_align = read_u16(container, 32);
    if byte_rate as u64 != format.byte_rate() || block_align as u32 != format.block_align() {
        return Err(malformed(format!(
            "byte rate {} / block align {} inconsistent with format",
            byte_rate, block_align
        )));
    }

    let data_size = read_u32(container, 40) as usize;
    let payload = &container[WAV_HEADER_SIZE..];
    if data_size != payload.len() {
        return Err(malformed(format!(
            "data size {} does not match payload length {}",
            data_size,
            payload.len()
        )));
    }

    Ok(DecodedWav {
        format,
        pcm: payload.to_vec(),
    })
}

fn malformed(reason: String) -> CaptureError {
    CaptureError::MalformedContainer(reason)
}

fn expect_tag(container: &[u8], offset: usize, tag: &[u8; 4]) -> Result<(), CaptureError> {
    if &container[offset..offset + 4] != tag {
        return Err(malformed(format!(
            "expected {:?} at offset {}",
            String::from_utf8_lossy(tag),
            offset
        )));
    }
    Ok(())
}

fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}
