use super::audio_models::RecordingMode;

/// Capture controller state machine.
///
/// ```text
/// idle ──start(mode)──▶ recording { mode } ──stop()──▶ idle
/// ```
///
/// There is no terminal state; a controller can record any number of sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    Recording { mode: RecordingMode },
}

impl CaptureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording { .. })
    }

    /// Mode of the active session, if any.
    pub fn mode(&self) -> Option<RecordingMode> {
        match self {
            Self::Recording { mode } => Some(*mode),
            Self::Idle => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording { .. } => "recording",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helpers_reflect_variant() {
        let idle = CaptureState::default();
        assert!(idle.is_idle());
        assert_eq!(idle.mode(), None);

        let recording = CaptureState::Recording {
            mode: RecordingMode::Streaming,
        };
        assert!(recording.is_recording());
        assert_eq!(recording.mode(), Some(RecordingMode::Streaming));
        assert_eq!(recording.as_str(), "recording");
    }
}
