use std::sync::Arc;

use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingResult;
use crate::models::state::CaptureState;

/// Callback receiving PCM bytes (a streamed chunk or a completed recording).
pub type ChunkCallback = Arc<dyn Fn(&[u8]) + Send + Sync + 'static>;

/// Event delegate for controller notifications.
///
/// `on_read_error` is called from the worker thread; everything else from the
/// thread driving the controller.
pub trait CaptureDelegate: Send + Sync {
    /// Called after every state transition.
    fn on_state_changed(&self, state: &CaptureState);

    /// Called for each failed device read. The worker keeps reading.
    fn on_read_error(&self, error: &CaptureError);

    /// Called once per successful stop, after the completion callback.
    fn on_capture_finished(&self, result: &RecordingResult);
}
