use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use headset_capture_core::{AudioConfig, CaptureDiagnostics, CaptureProvider, RecordingMetadata, RecordingMode};

use crate::error::HostError;
use crate::proxy::HostProxy;

/// A host call marshalled as JSON: `{"command":"start","mode":"streaming"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum HostCommand {
    /// Missing fields keep their current value.
    Configure {
        #[serde(default)]
        sample_rate_hz: Option<u32>,
        #[serde(default)]
        channel_count: Option<u16>,
        #[serde(default)]
        bit_depth: Option<u16>,
    },
    Start {
        mode: RecordingMode,
    },
    Stop,
    IsBufferEmpty,
    DequeueOne,
    SetMicrophoneMode {
        mode: RecordingMode,
    },
    SaveLastRecording {
        path: PathBuf,
    },
    Diagnostics,
    State,
}

/// Reply to a [`HostCommand`]. Byte payloads serialize as JSON number arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum HostResponse {
    Ok,
    Bool { value: bool },
    Bytes { data: Vec<u8> },
    Saved { metadata: RecordingMetadata },
    Diagnostics { diagnostics: CaptureDiagnostics },
    State { state: String, mode: Option<RecordingMode> },
    Error { kind: String, message: String },
}

impl From<HostError> for HostResponse {
    fn from(e: HostError) -> Self {
        Self::Error {
            kind: e.kind().to_string(),
            message: e.to_string(),
        }
    }
}

impl From<Result<(), HostError>> for HostResponse {
    fn from(outcome: Result<(), HostError>) -> Self {
        match outcome {
            Ok(()) => Self::Ok,
            Err(e) => e.into(),
        }
    }
}

impl<P: CaptureProvider> HostProxy<P> {
    /// Execute one command against the proxy.
    pub fn dispatch(&self, command: HostCommand) -> HostResponse {
        log::debug!("dispatching {:?}", command);
        match command {
            HostCommand::Configure {
                sample_rate_hz,
                channel_count,
                bit_depth,
            } => {
                let current = self.config();
                let config = AudioConfig::new(
                    sample_rate_hz.unwrap_or(current.sample_rate_hz),
                    channel_count.unwrap_or(current.channel_count),
                    bit_depth.unwrap_or(current.bit_depth),
                );
                self.try_configure(config).into()
            }
            HostCommand::Start { mode } => self.try_start(mode).into(),
            HostCommand::Stop => match self.try_stop() {
                Ok(result) => HostResponse::Bytes { data: result.data },
                Err(e) => e.into(),
            },
            HostCommand::IsBufferEmpty => HostResponse::Bool {
                value: self.is_buffer_empty(),
            },
            HostCommand::DequeueOne => HostResponse::Bytes {
                data: self.dequeue_one(),
            },
            HostCommand::SetMicrophoneMode { mode } => self.try_set_microphone_mode(mode).into(),
            HostCommand::SaveLastRecording { path } => match self.save_last_recording(&path) {
                Ok(metadata) => HostResponse::Saved { metadata },
                Err(e) => e.into(),
            },
            HostCommand::Diagnostics => HostResponse::Diagnostics {
                diagnostics: self.diagnostics(),
            },
            HostCommand::State => {
                let state = self.state();
                HostResponse::State {
                    state: state.as_str().to_string(),
                    mode: state.mode(),
                }
            }
        }
    }

    /// Parse a JSON command, dispatch it, and serialize the reply.
    pub fn dispatch_json(&self, json: &str) -> String {
        let response = match serde_json::from_str::<HostCommand>(json) {
            Ok(command) => self.dispatch(command),
            Err(e) => {
                log::warn!("rejecting malformed host command: {}", e);
                HostError::InvalidCommand(e.to_string()).into()
            }
        };
        serde_json::to_string(&response).unwrap_or_else(|e| {
            serde_json::json!({ "status": "error", "kind": "serialization", "message": e.to_string() }).to_string()
        })
    }
}
