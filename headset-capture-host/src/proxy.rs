use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use headset_capture_core::storage::wav_writer::save_recording;
use headset_capture_core::{
    AudioConfig, CaptureController, CaptureDelegate, CaptureDiagnostics, CaptureProvider, CaptureState, ControllerOptions,
    RecordingMetadata, RecordingMode, RecordingResult,
};

use crate::error::HostError;

struct ProxyState<P: CaptureProvider> {
    controller: CaptureController<P>,
    last_result: Option<RecordingResult>,
    last_error: Option<HostError>,
}

/// Host-facing handle around a [`CaptureController`].
///
/// Every method takes `&self`; share the proxy with `Arc` across host threads.
/// Failures are flattened to `false` / empty bytes at this boundary and the
/// most recent one is kept in [`last_error`](Self::last_error). The `try_*`
/// variants return the error instead.
///
/// `stop` releases the lock while it waits for the worker, and the buffering
/// and completion callbacks fire with the lock released, so they may call back
/// into the proxy. Delegate state notifications still run under the lock.
pub struct HostProxy<P: CaptureProvider> {
    state: Mutex<ProxyState<P>>,
}

impl<P: CaptureProvider> HostProxy<P> {
    pub fn new(provider: P) -> Self {
        Self::with_options(provider, ControllerOptions::default())
    }

    pub fn with_options(provider: P, options: ControllerOptions) -> Self {
        Self {
            state: Mutex::new(ProxyState {
                controller: CaptureController::with_options(provider, options),
                last_result: None,
                last_error: None,
            }),
        }
    }

    pub fn configure(&self, sample_rate_hz: u32, channel_count: u16, bit_depth: u16) -> bool {
        self.try_configure(AudioConfig::new(sample_rate_hz, channel_count, bit_depth))
            .is_ok()
    }

    pub fn try_configure(&self, config: AudioConfig) -> Result<(), HostError> {
        self.run(|state| state.controller.configure(config).map_err(HostError::from))
    }

    pub fn start(&self, mode: RecordingMode) -> bool {
        self.try_start(mode).is_ok()
    }

    pub fn try_start(&self, mode: RecordingMode) -> Result<(), HostError> {
        self.run(|state| state.controller.start(mode).map_err(HostError::from))
    }

    /// Stop recording and return the captured bytes (empty if not recording).
    pub fn stop(&self) -> Vec<u8> {
        self.try_stop().map(|result| result.data).unwrap_or_default()
    }

    pub fn try_stop(&self) -> Result<RecordingResult, HostError> {
        let pending = self.run(|state| state.controller.begin_stop().map_err(HostError::from))?;
        // unlocked: the worker's callbacks may need the proxy to wind down
        let stopped = pending.join();

        let completion = {
            let mut state = self.state.lock();
            let completion = state.controller.finish_stop(stopped);
            state.last_result = Some(completion.result().clone());
            completion
        };
        Ok(completion.deliver())
    }

    pub fn is_buffer_empty(&self) -> bool {
        self.state.lock().controller.is_buffer_empty()
    }

    /// Next queued chunk, or empty bytes when nothing is queued.
    pub fn dequeue_one(&self) -> Vec<u8> {
        let polled = self.state.lock().controller.dequeue_pending();
        polled.deliver().to_vec()
    }

    pub fn set_buffering_callback<F>(&self, callback: F)
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        self.state.lock().controller.set_buffering_callback(callback);
    }

    pub fn set_completion_callback<F>(&self, callback: F)
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        self.state.lock().controller.set_completion_callback(callback);
    }

    pub fn set_delegate(&self, delegate: Arc<dyn CaptureDelegate>) {
        self.state.lock().controller.set_delegate(delegate);
    }

    /// Select batch or streaming for the next `start_with_selected_mode`. Rejected while recording.
    pub fn set_microphone_mode(&self, mode: RecordingMode) -> bool {
        self.try_set_microphone_mode(mode).is_ok()
    }

    pub fn try_set_microphone_mode(&self, mode: RecordingMode) -> Result<(), HostError> {
        self.run(|state| state.controller.set_mode(mode).map_err(HostError::from))
    }

    pub fn start_with_selected_mode(&self) -> bool {
        self.run(|state| state.controller.start_with_current_mode().map_err(HostError::from))
            .is_ok()
    }

    /// Write the most recent `stop` result as a WAV file plus metadata sidecar.
    pub fn save_last_recording(&self, path: &Path) -> Result<RecordingMetadata, HostError> {
        self.run(|state| {
            let result = state.last_result.as_ref().ok_or(HostError::NoRecording)?;
            Ok(save_recording(path, result)?)
        })
    }

    pub fn last_error(&self) -> Option<HostError> {
        self.state.lock().last_error.clone()
    }

    pub fn diagnostics(&self) -> CaptureDiagnostics {
        self.state.lock().controller.diagnostics()
    }

    pub fn state(&self) -> CaptureState {
        self.state.lock().controller.state()
    }

    pub fn config(&self) -> AudioConfig {
        self.state.lock().controller.config()
    }

    pub fn mode(&self) -> RecordingMode {
        self.state.lock().controller.mode()
    }

    fn run<T>(&self, op: impl FnOnce(&mut ProxyState<P>) -> Result<T, HostError>) -> Result<T, HostError> {
        let mut state = self.state.lock();
        let outcome = op(&mut state);
        if let Err(ref e) = outcome {
            log::debug!("host call failed: {}", e);
            state.last_error = Some(e.clone());
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use headset_capture_core::{CaptureError, ReadStep, ScriptedProvider, StreamingDelivery};
    use std::sync::mpsc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn wait_for(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "timed out");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn batch_round_trip_through_proxy() {
        let provider = ScriptedProvider::new();
        provider.set_script(vec![ReadStep::Data(vec![1; 10]), ReadStep::Data(vec![2; 20])]);
        let proxy = HostProxy::new(provider);
        let completed = Arc::new(Mutex::new(Vec::new()));
        let c = Arc::clone(&completed);
        proxy.set_completion_callback(move |data| c.lock().push(data.len()));

        assert!(proxy.configure(44100, 1, 16));
        assert!(proxy.start(RecordingMode::Batch));
        wait_for(|| proxy.diagnostics().bytes_captured == 30);

        let data = proxy.stop();

        assert_eq!(data.len(), 30);
        assert_eq!(&data[..10], &[1; 10]);
        assert_eq!(*completed.lock(), vec![30]);
        assert!(proxy.state().is_idle());
    }

    #[test]
    fn failures_become_false_and_are_recorded() {
        let provider = ScriptedProvider::new();
        provider.set_permission(false);
        let proxy = HostProxy::new(provider.clone());

        assert!(!proxy.configure(44100, 1, 8));
        assert_eq!(proxy.last_error(), Some(HostError::Capture(CaptureError::UnsupportedFormat(8))));

        assert!(!proxy.start(RecordingMode::Batch));
        assert_eq!(proxy.last_error(), Some(HostError::Capture(CaptureError::PermissionDenied)));

        assert!(proxy.stop().is_empty());
        assert_eq!(proxy.last_error().map(|e| e.kind()), Some("invalidStateTransition"));
    }

    #[test]
    fn microphone_mode_is_rejected_while_recording() {
        let proxy = HostProxy::new(ScriptedProvider::new());

        assert!(proxy.set_microphone_mode(RecordingMode::Streaming));
        assert!(proxy.start_with_selected_mode());
        assert_eq!(proxy.mode(), RecordingMode::Streaming);

        assert!(!proxy.set_microphone_mode(RecordingMode::Batch));
        assert!(!proxy.configure(16000, 1, 16));
        assert_eq!(proxy.config(), AudioConfig::default());

        proxy.stop();
        assert!(proxy.set_microphone_mode(RecordingMode::Batch));
    }

    #[test]
    fn streaming_chunks_are_dequeued_in_order() {
        let provider = ScriptedProvider::new();
        provider.set_script(vec![ReadStep::Data(vec![1; 4]), ReadStep::Data(vec![2; 4])]);
        let options = ControllerOptions {
            streaming_delivery: StreamingDelivery::Poll,
            ..Default::default()
        };
        let proxy = HostProxy::with_options(provider, options);
        let buffered = Arc::new(Mutex::new(0usize));
        let b = Arc::clone(&buffered);
        proxy.set_buffering_callback(move |_| *b.lock() += 1);

        assert!(proxy.is_buffer_empty());
        assert!(proxy.dequeue_one().is_empty());
        assert!(proxy.start(RecordingMode::Streaming));
        wait_for(|| proxy.diagnostics().chunks_captured == 2);

        assert_eq!(proxy.dequeue_one(), vec![1; 4]);
        assert_eq!(proxy.dequeue_one(), vec![2; 4]);
        assert!(proxy.is_buffer_empty());
        assert_eq!(*buffered.lock(), 2);

        assert_eq!(proxy.stop(), vec![2; 4]);
    }

    #[test]
    fn save_requires_a_completed_recording() {
        let proxy = HostProxy::new(ScriptedProvider::new());
        let path = std::env::temp_dir().join("headset_capture_host_none.wav");

        assert_eq!(proxy.save_last_recording(&path), Err(HostError::NoRecording));
        assert_eq!(proxy.last_error(), Some(HostError::NoRecording));
    }

    #[test]
    fn saves_last_recording_as_wav() {
        let provider = ScriptedProvider::new();
        provider.set_script(vec![ReadStep::Data(vec![7; 8])]);
        let proxy = HostProxy::new(provider);
        assert!(proxy.configure(16000, 2, 16));
        assert!(proxy.start(RecordingMode::Batch));
        wait_for(|| proxy.diagnostics().bytes_captured == 8);
        proxy.stop();

        let dir = std::env::temp_dir().join(format!("headset_capture_host_{}", std::process::id()));
        let path = dir.join("last.wav");
        let metadata = proxy.save_last_recording(&path).unwrap();

        assert_eq!(metadata.payload_bytes, 8);
        assert_eq!(metadata.channel_count, 2);
        assert_eq!(std::fs::read(&path).unwrap().len(), 44 + 8);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn buffering_callback_may_query_proxy_while_stopping() {
        let provider = ScriptedProvider::new();
        let proxy = Arc::new(HostProxy::new(provider.clone()));
        let observed = Arc::new(Mutex::new(Vec::new()));
        let (entered_tx, entered_rx) = mpsc::channel();
        let entered_tx = Mutex::new(entered_tx);
        let (weak, o) = (Arc::downgrade(&proxy), Arc::clone(&observed));
        proxy.set_buffering_callback(move |data| {
            let Some(proxy) = weak.upgrade() else { return };
            entered_tx.lock().send(()).ok();
            // give stop() time to start waiting on this thread
            thread::sleep(Duration::from_millis(20));
            let empty = proxy.is_buffer_empty();
            let next = proxy.dequeue_one();
            o.lock().push((data.to_vec(), empty, next));
        });

        assert!(proxy.start(RecordingMode::Streaming));
        provider.last_device().unwrap().push(ReadStep::Data(vec![5; 4]));
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let (done_tx, done_rx) = mpsc::channel();
        let stopper = Arc::clone(&proxy);
        thread::spawn(move || done_tx.send(stopper.stop()).ok());
        let data = done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("stop did not return while the callback used the proxy");

        assert_eq!(data, vec![5; 4]);
        assert_eq!(*observed.lock(), vec![(vec![5; 4], false, vec![5; 4])]);
        assert!(proxy.state().is_idle());
        assert!(proxy.is_buffer_empty());
    }

    #[test]
    fn completion_callback_sees_idle_proxy() {
        let proxy = Arc::new(HostProxy::new(ScriptedProvider::new()));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (weak, s) = (Arc::downgrade(&proxy), Arc::clone(&seen));
        proxy.set_completion_callback(move |data| {
            if let Some(proxy) = weak.upgrade() {
                s.lock().push((data.len(), proxy.state()));
            }
        });

        assert!(proxy.start(RecordingMode::Batch));
        assert!(proxy.stop().is_empty());

        assert_eq!(*seen.lock(), vec![(0, CaptureState::Idle)]);
        assert!(proxy.start(RecordingMode::Batch));
        proxy.stop();
        assert_eq!(seen.lock().len(), 2);
    }

    #[test]
    fn poll_callback_may_query_proxy() {
        let provider = ScriptedProvider::new();
        provider.set_script(vec![ReadStep::Data(vec![1; 4]), ReadStep::Data(vec![2; 4])]);
        let options = ControllerOptions {
            streaming_delivery: StreamingDelivery::Poll,
            ..Default::default()
        };
        let proxy = Arc::new(HostProxy::with_options(provider, options));
        let remaining = Arc::new(Mutex::new(Vec::new()));
        let (weak, r) = (Arc::downgrade(&proxy), Arc::clone(&remaining));
        proxy.set_buffering_callback(move |_| {
            if let Some(proxy) = weak.upgrade() {
                r.lock().push(proxy.is_buffer_empty());
            }
        });

        assert!(proxy.start(RecordingMode::Streaming));
        wait_for(|| proxy.diagnostics().chunks_captured == 2);

        assert_eq!(proxy.dequeue_one(), vec![1; 4]);
        assert_eq!(proxy.dequeue_one(), vec![2; 4]);
        assert_eq!(*remaining.lock(), vec![false, true]);
        proxy.stop();
    }
}
