use std::sync::Arc;

use crate::models::audio_models::{InputDevice, TransportType};
use crate::models::config::AudioConfig;
use crate::models::error::CaptureError;

/// An opened input device.
///
/// The worker thread calls `read` in a loop while the controller thread may
/// call `stop` concurrently, so implementations must be `Sync`. The controller
/// only calls `release` after the worker has been joined.
pub trait CaptureDevice: Send + Sync {
    /// Blocking read of up to `buf.len()` bytes of interleaved PCM.
    ///
    /// `Ok(0)` means no data this tick. A stopped device must return promptly.
    fn read(&self, buf: &mut [u8]) -> Result<usize, CaptureError>;

    /// Smallest read size the device can serve without underruns, if known.
    fn min_buffer_size(&self) -> Option<usize> {
        None
    }

    /// Stop the stream and unblock any pending `read`.
    fn stop(&self);

    /// Free the underlying stream. No `read` is in flight when this is called.
    fn release(&self);
}

/// Platform hook for permission checks and device discovery.
///
/// Permission prompts and enumeration policy live outside the core; a
/// provider only answers whether capture is allowed, what inputs exist, and
/// how to open one.
pub trait CaptureProvider: Send + Sync {
    /// Whether the host has granted microphone capture.
    fn has_permission(&self) -> bool;

    /// Currently attached input devices, in platform order.
    fn input_devices(&self) -> Vec<InputDevice>;

    /// Open `device` for capture with `config`.
    fn open(&self, device: &InputDevice, config: &AudioConfig) -> Result<Arc<dyn CaptureDevice>, CaptureError>;
}

/// First device whose transport matches, or the first device at all when no
/// transport is requested.
pub fn select_input_device(devices: &[InputDevice], transport: Option<TransportType>) -> Option<InputDevice> {
    devices
        .iter()
        .find(|d| transport.is_none_or(|t| d.transport == t))
        .cloned()
}
