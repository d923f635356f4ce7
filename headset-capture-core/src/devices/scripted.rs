//! Deterministic in-memory capture backend.
//!
//! `ScriptedDevice` replays a queue of read results and then blocks like a
//! real microphone until more steps are pushed or the device is stopped.
//! `ScriptedProvider` hands such devices out and lets callers flip
//! permission, swap the device list, or make the next `open` fail.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::models::audio_models::{InputDevice, TransportType};
use crate::models::config::AudioConfig;
use crate::models::error::CaptureError;
use crate::traits::capture_provider::{CaptureDevice, CaptureProvider};

/// One scripted device read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadStep {
    /// Deliver these bytes. Split across reads if larger than the read buffer.
    Data(Vec<u8>),
    /// Return `Ok(0)`.
    Empty,
    /// Fail the read with `CaptureError::Device`.
    Error(String),
}

#[derive(Debug, Default)]
struct DeviceState {
    steps: VecDeque<ReadStep>,
    stopped: bool,
    released: bool,
    pending_reads: usize,
    reads_after_release: u64,
}

/// Device that replays [`ReadStep`]s.
#[derive(Debug)]
pub struct ScriptedDevice {
    state: Mutex<DeviceState>,
    wake: Condvar,
    min_buffer_size: Option<usize>,
}

impl ScriptedDevice {
    pub fn new(steps: Vec<ReadStep>) -> Arc<Self> {
        Self::with_min_buffer_size(steps, None)
    }

    pub fn with_min_buffer_size(steps: Vec<ReadStep>, min_buffer_size: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(DeviceState {
                steps: steps.into(),
                ..Default::default()
            }),
            wake: Condvar::new(),
            min_buffer_size,
        })
    }

    /// Queue another read result and wake a blocked reader.
    pub fn push(&self, step: ReadStep) {
        self.state.lock().steps.push_back(step);
        self.wake.notify_all();
    }

    /// Whether every scripted step has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.state.lock().steps.is_empty()
    }

    /// Reads currently blocked waiting for data.
    pub fn pending_reads(&self) -> usize {
        self.state.lock().pending_reads
    }

    pub fn is_stopped(&self) -> bool {
        self.state.lock().stopped
    }

    pub fn is_released(&self) -> bool {
        self.state.lock().released
    }

    /// Reads that arrived after `release`. Always zero for a correct owner.
    pub fn reads_after_release(&self) -> u64 {
        self.state.lock().reads_after_release
    }
}

impl CaptureDevice for ScriptedDevice {
    fn read(&self, buf: &mut [u8]) -> Result<usize, CaptureError> {
        let mut state = self.state.lock();
        if state.released {
            state.reads_after_release += 1;
            return Err(CaptureError::Device("read after release".into()));
        }

        loop {
            if state.stopped {
                return Ok(0);
            }
            match state.steps.pop_front() {
                Some(ReadStep::Data(mut bytes)) => {
                    if bytes.len() > buf.len() {
                        let rest = bytes.split_off(buf.len());
                        state.steps.push_front(ReadStep::Data(rest));
                    }
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    return Ok(bytes.len());
                }
                Some(ReadStep::Empty) => return Ok(0),
                Some(ReadStep::Error(message)) => return Err(CaptureError::Device(message)),
                None => {
                    state.pending_reads += 1;
                    self.wake.wait(&mut state);
                    state.pending_reads -= 1;
                }
            }
        }
    }

    fn min_buffer_size(&self) -> Option<usize> {
        self.min_buffer_size
    }

    fn stop(&self) {
        self.state.lock().stopped = true;
        self.wake.notify_all();
    }

    fn release(&self) {
        let mut state = self.state.lock();
        state.stopped = true;
        state.released = true;
        drop(state);
        self.wake.notify_all();
    }
}

#[derive(Debug)]
struct ProviderState {
    permission: bool,
    devices: Vec<InputDevice>,
    script: Vec<ReadStep>,
    min_buffer_size: Option<usize>,
    open_error: Option<CaptureError>,
    open_count: usize,
    last_opened: Option<(InputDevice, AudioConfig, Arc<ScriptedDevice>)>,
}

/// Provider handing out [`ScriptedDevice`]s. Clones share state.
#[derive(Debug, Clone)]
pub struct ScriptedProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl ScriptedProvider {
    /// Permission granted, one network-attached glasses microphone.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ProviderState {
                permission: true,
                devices: vec![Self::glasses_device()],
                script: Vec::new(),
                min_buffer_size: None,
                open_error: None,
                open_count: 0,
                last_opened: None,
            })),
        }
    }

    pub fn glasses_device() -> InputDevice {
        InputDevice {
            id: "scripted-glasses".into(),
            name: "Scripted Glasses Microphone".into(),
            transport: TransportType::Network,
            is_default: false,
        }
    }

    pub fn set_permission(&self, granted: bool) {
        self.state.lock().permission = granted;
    }

    pub fn set_devices(&self, devices: Vec<InputDevice>) {
        self.state.lock().devices = devices;
    }

    /// Steps replayed by the device returned from the next `open`.
    pub fn set_script(&self, steps: Vec<ReadStep>) {
        self.state.lock().script = steps;
    }

    pub fn set_min_buffer_size(&self, size: Option<usize>) {
        self.state.lock().min_buffer_size = size;
    }

    /// Make the next `open` fail with `error`.
    pub fn fail_next_open(&self, error: CaptureError) {
        self.state.lock().open_error = Some(error);
    }

    /// Number of successful opens.
    pub fn open_count(&self) -> usize {
        self.state.lock().open_count
    }

    /// Device returned by the most recent successful `open`.
    pub fn last_device(&self) -> Option<Arc<ScriptedDevice>> {
        self.state.lock().last_opened.as_ref().map(|(_, _, d)| Arc::clone(d))
    }

    /// Input and config passed to the most recent successful `open`.
    pub fn last_open(&self) -> Option<(InputDevice, AudioConfig)> {
        self.state
            .lock()
            .last_opened
            .as_ref()
            .map(|(device, config, _)| (device.clone(), *config))
    }
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureProvider for ScriptedProvider {
    fn has_permission(&self) -> bool {
        self.state.lock().permission
    }

    fn input_devices(&self) -> Vec<InputDevice> {
        self.state.lock().devices.clone()
    }

    fn open(&self, device: &InputDevice, config: &AudioConfig) -> Result<Arc<dyn CaptureDevice>, CaptureError> {
        let mut state = self.state.lock();
        if let Some(error) = state.open_error.take() {
            return Err(error);
        }
        let script = std::mem::take(&mut state.script);
        let opened = ScriptedDevice::with_min_buffer_size(script, state.min_buffer_size);
        // earlier devices belong to their sessions; hold only the newest
        state.open_count += 1;
        state.last_opened = Some((device.clone(), *config, Arc::clone(&opened)));
        Ok(opened)
    }
}
