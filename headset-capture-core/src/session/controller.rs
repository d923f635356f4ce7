use std::sync::Arc;

use parking_lot::RwLock;

use crate::models::audio_models::{CaptureDiagnostics, RecordingMode};
use crate::models::chunk::{concat_chunks, PcmChunk};
use crate::models::config::{AudioConfig, ControllerOptions, StreamingDelivery};
use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingResult;
use crate::models::session::RecordingSession;
use crate::models::state::CaptureState;
use crate::processing::capture_buffer::CaptureBuffer;
use crate::session::worker::{
    normalize_read_size, CaptureWorker, ChunkSink, ErrorSink, WorkerHooks, WorkerReport,
};
use crate::traits::capture_delegate::{CaptureDelegate, ChunkCallback};
use crate::traits::capture_provider::{select_input_device, CaptureDevice, CaptureProvider};

/// Host callbacks, replaceable at any time (including mid-session).
#[derive(Default)]
struct CallbackRegistry {
    buffering: Option<ChunkCallback>,
    completion: Option<ChunkCallback>,
}

/// Resources owned by the recording session.
///
/// Dropping it shuts the session down.
struct ActiveSession {
    session: RecordingSession,
    device: Arc<dyn CaptureDevice>,
    worker: Option<CaptureWorker>,
}

impl ActiveSession {
    /// Stop order matters: clear the loop flag, unblock the read, wait for the
    /// thread, and only then release the device. `None` once already shut down.
    fn shut_down(&mut self) -> Option<WorkerReport> {
        let worker = self.worker.take()?;
        worker.signal_stop();
        self.device.stop();
        let report = worker.join();
        self.device.release();
        Some(report)
    }

    fn diagnostics(&self) -> CaptureDiagnostics {
        self.worker.as_ref().map(CaptureWorker::diagnostics).unwrap_or_default()
    }
}

impl Drop for ActiveSession {
    fn drop(&mut self) {
        if self.shut_down().is_some() {
            log::info!("capture session dropped while recording, shut down");
        }
    }
}

/// A session detached by [`CaptureController::begin_stop`].
///
/// [`join`](Self::join) needs no access to the controller, so a caller that
/// guards the controller with a lock can release it while the worker winds
/// down. Dropping the handle shuts the session down without a result.
pub struct PendingStop {
    active: ActiveSession,
}

impl PendingStop {
    /// Stop the device, wait for the worker, and release the device.
    pub fn join(mut self) -> StoppedCapture {
        let report = self.active.shut_down().unwrap_or_default();
        StoppedCapture {
            session: self.active.session.clone(),
            report,
        }
    }
}

/// A fully shut-down session, ready for [`CaptureController::finish_stop`].
pub struct StoppedCapture {
    session: RecordingSession,
    report: WorkerReport,
}

/// A finished recording whose notifications have not been delivered yet.
///
/// [`deliver`](Self::deliver) fires the completion callback and then the
/// delegate's `on_capture_finished`, on the calling thread.
#[must_use = "call deliver() to fire the completion callback"]
pub struct Completion {
    result: RecordingResult,
    callback: Option<ChunkCallback>,
    delegate: Option<Arc<dyn CaptureDelegate>>,
}

impl Completion {
    pub fn result(&self) -> &RecordingResult {
        &self.result
    }

    pub fn deliver(self) -> RecordingResult {
        if let Some(callback) = self.callback {
            callback(&self.result.data);
        }
        if let Some(delegate) = self.delegate {
            delegate.on_capture_finished(&self.result);
        }
        self.result
    }
}

/// A dequeued chunk whose buffering callback (poll delivery) has not fired yet.
#[must_use = "call deliver() to fire the buffering callback"]
pub struct PolledChunk {
    chunk: PcmChunk,
    callback: Option<ChunkCallback>,
}

impl PolledChunk {
    pub fn deliver(self) -> PcmChunk {
        if let Some(callback) = self.callback {
            callback(self.chunk.as_bytes());
        }
        self.chunk
    }
}

/// Capture lifecycle controller.
///
/// Owns the configuration, the shared [`CaptureBuffer`], and at most one
/// active session. Every control operation runs on the caller's thread; the
/// only other thread is the session's [`CaptureWorker`].
///
/// Data flow:
/// ```text
/// [CaptureDevice] → [CaptureWorker] → [CaptureBuffer] ─┬→ stop(): drain (batch) / last chunk (streaming)
///                          │                            └→ poll_one()
///                          └→ buffering callback (streaming, push delivery)
/// ```
///
/// Calls made in the wrong state return [`CaptureError::InvalidStateTransition`]
/// and change nothing.
pub struct CaptureController<P: CaptureProvider> {
    provider: P,
    options: ControllerOptions,
    config: AudioConfig,
    mode: RecordingMode,
    state: CaptureState,
    buffer: Arc<CaptureBuffer>,
    callbacks: Arc<RwLock<CallbackRegistry>>,
    delegate: Option<Arc<dyn CaptureDelegate>>,
    active: Option<ActiveSession>,
    last_diagnostics: CaptureDiagnostics,
    sessions_started: u64,
}

impl<P: CaptureProvider> CaptureController<P> {
    pub fn new(provider: P) -> Self {
        Self::with_options(provider, ControllerOptions::default())
    }

    pub fn with_options(provider: P, options: ControllerOptions) -> Self {
        Self {
            provider,
            options,
            config: AudioConfig::default(),
            mode: RecordingMode::default(),
            state: CaptureState::Idle,
            buffer: Arc::new(CaptureBuffer::new()),
            callbacks: Arc::new(RwLock::new(CallbackRegistry::default())),
            delegate: None,
            active: None,
            last_diagnostics: CaptureDiagnostics::default(),
            sessions_started: 0,
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn CaptureDelegate>) {
        self.delegate = Some(delegate);
    }

    /// Register the per-chunk streaming callback. Replaces any previous one.
    pub fn set_buffering_callback<F>(&self, callback: F)
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        self.callbacks.write().buffering = Some(Arc::new(callback));
    }

    /// Register the callback fired once per successful `stop`.
    pub fn set_completion_callback<F>(&self, callback: F)
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        self.callbacks.write().completion = Some(Arc::new(callback));
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state.is_recording()
    }

    pub fn config(&self) -> AudioConfig {
        self.config
    }

    /// Mode used by the current or most recent session, or the one chosen via `set_mode`.
    pub fn mode(&self) -> RecordingMode {
        self.mode
    }

    /// Number of sessions successfully started over the controller's lifetime.
    pub fn sessions_started(&self) -> u64 {
        self.sessions_started
    }

    /// Snapshot of the active session.
    pub fn session(&self) -> Option<RecordingSession> {
        self.active.as_ref().map(|active| {
            let mut session = active.session.clone();
            session.accumulated_bytes = active.diagnostics().bytes_captured;
            session
        })
    }

    /// Live counters while recording, otherwise those of the last session.
    pub fn diagnostics(&self) -> CaptureDiagnostics {
        match self.active {
            Some(ref active) => active.diagnostics(),
            None => self.last_diagnostics,
        }
    }

    pub fn is_buffer_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn buffered_bytes(&self) -> usize {
        self.buffer.total_bytes()
    }

    /// Replace the audio format. Idle only.
    pub fn configure(&mut self, config: AudioConfig) -> Result<(), CaptureError> {
        self.require_idle("configure")?;
        config.validate()?;

        log::debug!(
            "configured {} Hz, {} ch, {}-bit",
            config.sample_rate_hz,
            config.channel_count,
            config.bit_depth
        );
        self.config = config;
        Ok(())
    }

    /// Choose the mode used by [`start_with_current_mode`](Self::start_with_current_mode). Idle only.
    pub fn set_mode(&mut self, mode: RecordingMode) -> Result<(), CaptureError> {
        self.require_idle("change mode")?;
        self.mode = mode;
        Ok(())
    }

    pub fn start_with_current_mode(&mut self) -> Result<(), CaptureError> {
        self.start(self.mode)
    }

    /// Open the matching input device and start the capture worker.
    ///
    /// Transitions: idle → recording. On failure nothing is held and the
    /// controller stays idle.
    pub fn start(&mut self, mode: RecordingMode) -> Result<(), CaptureError> {
        self.require_idle("start")?;

        if !self.provider.has_permission() {
            log::warn!("capture permission not granted");
            return Err(CaptureError::PermissionDenied);
        }

        let devices = self.provider.input_devices();
        let Some(input) = select_input_device(&devices, self.options.device_transport) else {
            log::warn!(
                "no input device matching {:?} among {} device(s)",
                self.options.device_transport,
                devices.len()
            );
            return Err(CaptureError::DeviceNotFound);
        };

        let device = self.provider.open(&input, &self.config).inspect_err(|e| {
            log::error!("failed to open {}: {}", input.name, e);
        })?;

        self.buffer.clear();
        self.buffer.set_limit(match mode {
            RecordingMode::Batch => None,
            RecordingMode::Streaming => self.options.streaming_buffer_limit(&self.config),
        });

        let read_size = normalize_read_size(device.min_buffer_size(), &self.config);
        let worker = match CaptureWorker::spawn(
            Arc::clone(&device),
            Arc::clone(&self.buffer),
            read_size,
            self.worker_hooks(mode),
        ) {
            Ok(worker) => worker,
            Err(e) => {
                log::error!("failed to start capture worker: {}", e);
                device.stop();
                device.release();
                return Err(e);
            }
        };

        log::info!(
            "recording started on {} ({} mode, {} byte reads)",
            input.name,
            mode,
            read_size
        );

        self.mode = mode;
        self.sessions_started += 1;
        self.active = Some(ActiveSession {
            session: RecordingSession::new(mode, self.config, input),
            device,
            worker: Some(worker),
        });
        self.set_state(CaptureState::Recording { mode });
        Ok(())
    }

    /// Stop the worker, release the device, and deliver the recording.
    ///
    /// Batch sessions return every buffered chunk concatenated in capture
    /// order. Streaming sessions return only the most recently captured chunk
    /// (empty if none); chunks still queued stay available to `poll_one`
    /// until the next `start`.
    ///
    /// Transitions: recording → idle, then the completion callback fires.
    /// Blocks until the worker has exited.
    pub fn stop(&mut self) -> Result<RecordingResult, CaptureError> {
        let pending = self.begin_stop()?;
        Ok(self.finish_stop(pending.join()).deliver())
    }

    /// First half of [`stop`](Self::stop): detach the active session.
    ///
    /// The controller stays in the recording state, rejecting `start`,
    /// `configure`, and further stops, until [`finish_stop`](Self::finish_stop).
    pub fn begin_stop(&mut self) -> Result<PendingStop, CaptureError> {
        match self.active.take() {
            Some(active) => Ok(PendingStop { active }),
            None => Err(self.invalid_transition("stop")),
        }
    }

    /// Second half of [`stop`](Self::stop): build the result and return to idle.
    ///
    /// Callbacks are not fired here; call [`Completion::deliver`].
    pub fn finish_stop(&mut self, stopped: StoppedCapture) -> Completion {
        let StoppedCapture { session, report } = stopped;

        let data = match session.mode {
            RecordingMode::Batch => concat_chunks(&self.buffer.drain_all()),
            RecordingMode::Streaming => report.last_chunk.to_vec(),
        };

        let result = RecordingResult {
            session_id: session.id,
            mode: session.mode,
            config: session.config,
            data,
            duration_secs: session.elapsed_secs(),
            diagnostics: report.diagnostics,
        };
        self.last_diagnostics = report.diagnostics;

        log::info!(
            "recording stopped after {:.2}s: {} bytes returned, {} captured, {} read error(s)",
            result.duration_secs,
            result.data.len(),
            report.diagnostics.bytes_captured,
            report.diagnostics.read_errors
        );

        self.set_state(CaptureState::Idle);

        Completion {
            result,
            callback: self.callbacks.read().completion.clone(),
            delegate: self.delegate.clone(),
        }
    }

    /// Dequeue one chunk (empty when nothing is queued).
    ///
    /// In streaming mode with [`StreamingDelivery::Poll`], non-empty chunks are
    /// also handed to the buffering callback.
    pub fn poll_one(&self) -> PcmChunk {
        self.dequeue_pending().deliver()
    }

    /// [`poll_one`](Self::poll_one) without firing the callback yet.
    pub fn dequeue_pending(&self) -> PolledChunk {
        let chunk = self.buffer.dequeue_one();
        let callback = if !chunk.is_empty()
            && self.mode == RecordingMode::Streaming
            && self.options.streaming_delivery == StreamingDelivery::Poll
        {
            self.callbacks.read().buffering.clone()
        } else {
            None
        };
        PolledChunk { chunk, callback }
    }

    // --- Internal helpers ---

    fn worker_hooks(&self, mode: RecordingMode) -> WorkerHooks {
        let on_chunk = match (mode, self.options.streaming_delivery) {
            (RecordingMode::Streaming, StreamingDelivery::Push) => {
                let callbacks = Arc::clone(&self.callbacks);
                Some(Arc::new(move |chunk: &PcmChunk| {
                    // clone out of the lock so the callback may replace callbacks
                    let buffering = callbacks.read().buffering.clone();
                    if let Some(callback) = buffering {
                        callback(chunk.as_bytes());
                    }
                }) as ChunkSink)
            }
            _ => None,
        };

        let on_error = self.delegate.clone().map(|delegate| {
            Arc::new(move |error: &CaptureError| delegate.on_read_error(error)) as ErrorSink
        });

        WorkerHooks { on_chunk, on_error }
    }

    fn require_idle(&self, operation: &'static str) -> Result<(), CaptureError> {
        if self.state.is_idle() {
            Ok(())
        } else {
            Err(self.invalid_transition(operation))
        }
    }

    fn invalid_transition(&self, operation: &'static str) -> CaptureError {
        // recording with no attached session: a stop is in progress
        let state = if self.state.is_recording() && self.active.is_none() {
            "stopping"
        } else {
            self.state.as_str()
        };
        log::warn!("ignoring {} while {}", operation, state);
        CaptureError::InvalidStateTransition { operation, state }
    }

    fn set_state(&mut self, new_state: CaptureState) {
        self.state = new_state;
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(&new_state);
        }
    }
}

impl<P: CaptureProvider> Drop for CaptureController<P> {
    fn drop(&mut self) {
        if let Some(mut active) = self.active.take() {
            log::info!("controller dropped while recording, shutting down capture");
            active.shut_down();
        }
    }
}
