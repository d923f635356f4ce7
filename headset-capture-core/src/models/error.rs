use thiserror::Error;

/// Errors that can occur during capture, conversion, and storage operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("capture permission not granted")]
    PermissionDenied,

    #[error("no matching input device found")]
    DeviceNotFound,

    #[error("unsupported bit depth: {0} (expected 16 or 24)")]
    UnsupportedFormat(u16),

    #[error("malformed WAV container: {0}")]
    MalformedContainer(String),

    #[error("cannot {operation} while {state}")]
    InvalidStateTransition {
        operation: &'static str,
        state: &'static str,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("device error: {0}")]
    Device(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

impl CaptureError {
    /// Short machine-readable name, used by host-facing surfaces.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "permissionDenied",
            Self::DeviceNotFound => "deviceNotFound",
            Self::UnsupportedFormat(_) => "unsupportedFormat",
            Self::MalformedContainer(_) => "malformedContainer",
            Self::InvalidStateTransition { .. } => "invalidStateTransition",
            Self::InvalidConfiguration(_) => "invalidConfiguration",
            Self::Device(_) => "device",
            Self::StorageError(_) => "storage",
        }
    }
}
