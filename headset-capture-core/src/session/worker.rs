use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::audio_models::CaptureDiagnostics;
use crate::models::chunk::PcmChunk;
use crate::models::config::AudioConfig;
use crate::models::error::CaptureError;
use crate::processing::capture_buffer::{CaptureBuffer, Evicted};
use crate::traits::capture_provider::CaptureDevice;

/// Upper bound for a single device read.
pub const MAX_READ_SIZE: usize = 1 << 20;

/// Pause after an empty or failed read so a misbehaving device cannot spin the loop.
const IDLE_BACKOFF: Duration = Duration::from_millis(2);

/// Invoked on the worker thread for every captured chunk, after it is queued.
pub type ChunkSink = Arc<dyn Fn(&PcmChunk) + Send + Sync + 'static>;

/// Invoked on the worker thread for every failed read.
pub type ErrorSink = Arc<dyn Fn(&CaptureError) + Send + Sync + 'static>;

/// Optional worker callbacks.
#[derive(Clone, Default)]
pub struct WorkerHooks {
    pub on_chunk: Option<ChunkSink>,
    pub on_error: Option<ErrorSink>,
}

/// Lock-free counters updated by the read loop.
#[derive(Debug, Default)]
pub struct WorkerStats {
    chunks_captured: AtomicU64,
    bytes_captured: AtomicU64,
    empty_reads: AtomicU64,
    read_errors: AtomicU64,
    chunks_dropped: AtomicU64,
    bytes_dropped: AtomicU64,
}

impl WorkerStats {
    fn record_chunk(&self, len: usize, evicted: Evicted) {
        self.chunks_captured.fetch_add(1, Ordering::Relaxed);
        self.bytes_captured.fetch_add(len as u64, Ordering::Relaxed);
        if !evicted.is_none() {
            self.chunks_dropped.fetch_add(evicted.chunks as u64, Ordering::Relaxed);
            self.bytes_dropped.fetch_add(evicted.bytes as u64, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self, read_size: usize) -> CaptureDiagnostics {
        CaptureDiagnostics {
            chunks_captured: self.chunks_captured.load(Ordering::Relaxed),
            bytes_captured: self.bytes_captured.load(Ordering::Relaxed),
            empty_reads: self.empty_reads.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
            chunks_dropped: self.chunks_dropped.load(Ordering::Relaxed),
            bytes_dropped: self.bytes_dropped.load(Ordering::Relaxed),
            read_size,
        }
    }
}

/// Pick the per-read byte count for a device.
///
/// Uses the device minimum when known, otherwise 20 ms of audio, rounded up to
/// whole frames and capped at [`MAX_READ_SIZE`]. Never smaller than one frame.
pub fn normalize_read_size(device_min: Option<usize>, config: &AudioConfig) -> usize {
    let frame = config.block_align().max(1);
    let requested = device_min
        .filter(|&n| n > 0)
        .unwrap_or_else(|| config.byte_rate() / 50);
    let max_frames = (MAX_READ_SIZE / frame).max(1);
    let frames = requested.div_ceil(frame).clamp(1, max_frames);
    frames * frame
}

/// Final state of a joined worker.
#[derive(Debug, Clone, Default)]
pub struct WorkerReport {
    pub diagnostics: CaptureDiagnostics,
    pub last_chunk: PcmChunk,
}

/// Dedicated thread that reads a device until told to stop.
///
/// Stopping is cooperative: `signal_stop` clears the loop flag and `join`
/// waits for the thread. The worker never stops or releases the device
/// itself; the owner must unblock the device read and release it after
/// `join` returns.
pub struct CaptureWorker {
    running: Arc<AtomicBool>,
    stats: Arc<WorkerStats>,
    last_chunk: Arc<Mutex<PcmChunk>>,
    read_size: usize,
    handle: Option<thread::JoinHandle<()>>,
}

impl CaptureWorker {
    pub fn spawn(
        device: Arc<dyn CaptureDevice>,
        buffer: Arc<CaptureBuffer>,
        read_size: usize,
        hooks: WorkerHooks,
    ) -> Result<Self, CaptureError> {
        let read_size = read_size.max(1);
        let running = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(WorkerStats::default());
        let last_chunk = Arc::new(Mutex::new(PcmChunk::empty()));

        let ctx = ReadLoop {
            running: Arc::clone(&running),
            stats: Arc::clone(&stats),
            last_chunk: Arc::clone(&last_chunk),
            device,
            buffer,
            hooks,
            read_size,
        };

        let handle = thread::Builder::new()
            .name("headset-capture-worker".into())
            .spawn(move || ctx.run())
            .map_err(|e| CaptureError::Device(format!("failed to spawn capture thread: {}", e)))?;

        Ok(Self {
            running,
            stats,
            last_chunk,
            read_size,
            handle: Some(handle),
        })
    }

    /// Ask the loop to exit after its current read.
    pub fn signal_stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Whether the loop has not been told to stop yet.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Whether the thread has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    pub fn read_size(&self) -> usize {
        self.read_size
    }

    pub fn diagnostics(&self) -> CaptureDiagnostics {
        self.stats.snapshot(self.read_size)
    }

    /// Most recently captured chunk (empty before the first read).
    pub fn last_chunk(&self) -> PcmChunk {
        self.last_chunk.lock().clone()
    }

    /// Stop the loop and wait for the thread to exit.
    pub fn join(mut self) -> WorkerReport {
        self.signal_stop();
        self.join_thread();
        WorkerReport {
            diagnostics: self.diagnostics(),
            last_chunk: self.last_chunk(),
        }
    }

    fn join_thread(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("capture worker panicked");
            }
        }
    }
}

impl Drop for CaptureWorker {
    fn drop(&mut self) {
        self.signal_stop();
        self.join_thread();
    }
}

struct ReadLoop {
    running: Arc<AtomicBool>,
    stats: Arc<WorkerStats>,
    last_chunk: Arc<Mutex<PcmChunk>>,
    device: Arc<dyn CaptureDevice>,
    buffer: Arc<CaptureBuffer>,
    hooks: WorkerHooks,
    read_size: usize,
}

impl ReadLoop {
    fn run(self) {
        log::debug!("capture worker started ({} byte reads)", self.read_size);
        let mut scratch = vec![0u8; self.read_size];

        while self.running.load(Ordering::Acquire) {
            match self.device.read(&mut scratch) {
                Ok(0) => {
                    self.stats.empty_reads.fetch_add(1, Ordering::Relaxed);
                    thread::sleep(IDLE_BACKOFF);
                }
                Ok(n) => self.deliver(&scratch[..n.min(scratch.len())]),
                Err(e) => {
                    self.stats.read_errors.fetch_add(1, Ordering::Relaxed);
                    log::warn!("device read failed: {}", e);
                    if let Some(ref on_error) = self.hooks.on_error {
                        on_error(&e);
                    }
                    thread::sleep(IDLE_BACKOFF);
                }
            }
        }

        log::debug!("capture worker exiting");
    }

    fn deliver(&self, bytes: &[u8]) {
        let chunk = PcmChunk::from_slice(bytes);
        let evicted = self.buffer.enqueue(chunk.clone());
        if !evicted.is_none() {
            log::debug!("capture buffer full, dropped {} oldest chunk(s)", evicted.chunks);
        }
        self.stats.record_chunk(chunk.len(), evicted);
        *self.last_chunk.lock() = chunk.clone();

        if let Some(ref on_chunk) = self.hooks.on_chunk {
            on_chunk(&chunk);
        }
    }
}
