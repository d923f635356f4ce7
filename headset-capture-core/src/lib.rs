//! # headset-capture-core
//!
//! Microphone capture core for headset-class devices (smart glasses and
//! similar network-attached inputs).
//!
//! Provides PCM/float conversion, WAV I/O, a thread-safe chunk buffer, the
//! capture worker thread, and the recording state machine. Platform backends
//! implement [`CaptureProvider`] / [`CaptureDevice`] and plug into the generic
//! [`CaptureController`].
//!
//! ## Architecture
//!
//! ```text
//! headset-capture-core (this crate)
//! ├── traits/       ← CaptureProvider, CaptureDevice, CaptureDelegate
//! ├── models/       ← CaptureError, CaptureState, AudioConfig, PcmChunk, RecordingResult, etc.
//! ├── processing/   ← PCM codec, WAV encode/decode, CaptureBuffer
//! ├── session/      ← CaptureWorker (read loop), CaptureController (state machine)
//! ├── storage/      ← WavFileWriter, metadata sidecar
//! └── devices/      ← ScriptedProvider (in-memory backend, `scripted` feature)
//! ```

#[cfg(any(test, feature = "scripted"))]
pub mod devices;
pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
#[cfg(any(test, feature = "scripted"))]
pub use devices::scripted::{ReadStep, ScriptedDevice, ScriptedProvider};
pub use models::audio_models::{BitDepth, CaptureDiagnostics, InputDevice, RecordingMode, TransportType};
pub use models::chunk::PcmChunk;
pub use models::config::{AudioConfig, ControllerOptions, StreamingDelivery};
pub use models::error::CaptureError;
pub use models::recording_result::{RecordingMetadata, RecordingResult};
pub use models::session::RecordingSession;
pub use models::state::CaptureState;
pub use processing::capture_buffer::CaptureBuffer;
pub use processing::pcm_codec::{float_to_pcm, pcm_to_float};
pub use processing::wav_format::{decode_wav, encode_wav, DecodedWav, WavFormat};
pub use session::controller::{CaptureController, Completion, PendingStop, PolledChunk, StoppedCapture};
pub use session::worker::CaptureWorker;
pub use storage::wav_writer::{save_recording, WavFileWriter};
pub use traits::capture_delegate::{CaptureDelegate, ChunkCallback};
pub use traits::capture_provider::{CaptureDevice, CaptureProvider};
