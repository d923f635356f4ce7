use headset_capture_core::CaptureError;
use thiserror::Error;

/// Errors surfaced by the host proxy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("no completed recording to save")]
    NoRecording,

    #[error("invalid command: {0}")]
    InvalidCommand(String),
}

impl HostError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Capture(e) => e.kind(),
            Self::NoRecording => "noRecording",
            Self::InvalidCommand(_) => "invalidCommand",
        }
    }
}
