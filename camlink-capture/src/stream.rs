//! Background capture streams
//!
//! A [`CaptureStream`] owns one frame source plus a worker thread that
//! continuously refreshes a single-slot "latest frame" buffer. The worker
//! is the only writer to the slot; tool callers are readers and never
//! touch the hardware. The camera handle is not `Send`, so the worker
//! opens and releases it itself; `start` only waits for the open outcome.

use crate::backend::{CameraBackend, FrameSource};
use crate::error::{CaptureError, CaptureResult};
use crate::frame::{CameraInfo, Frame};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Capture stream lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Created but not yet polling
    Idle,
    /// Worker is polling the device
    Running,
    /// Worker has exited and the device handle is released
    Stopped,
}

/// Polling behavior for capture streams
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Pacing between read attempts
    pub poll_interval: Duration,
    /// Consecutive read failures before the stream stops itself
    pub failure_threshold: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(33),
            failure_threshold: 10,
        }
    }
}

/// State shared between the worker thread and readers
struct StreamShared {
    state: RwLock<StreamState>,
    running: AtomicBool,
    latest: RwLock<Option<Arc<Frame>>>,
}

/// One background polling session against one device
pub struct CaptureStream {
    device_id: u32,
    info: CameraInfo,
    shared: Arc<StreamShared>,
    worker: Option<thread::JoinHandle<()>>,
}

impl CaptureStream {
    /// Open the device and launch the polling worker.
    ///
    /// Returns as soon as the worker reports the open outcome; it does not
    /// wait for the first frame. On open failure no worker is left behind.
    pub fn start(
        backend: Arc<dyn CameraBackend>,
        device_id: u32,
        config: StreamConfig,
    ) -> CaptureResult<Self> {
        let shared = Arc::new(StreamShared {
            state: RwLock::new(StreamState::Idle),
            running: AtomicBool::new(true),
            latest: RwLock::new(None),
        });
        let (setup_tx, setup_rx) = mpsc::sync_channel::<CaptureResult<CameraInfo>>(1);

        let worker_shared = shared.clone();
        let worker = thread::Builder::new()
            .name(format!("camlink-stream-{device_id}"))
            .spawn(move || {
                // The camera handle lives and dies on this thread.
                let mut source = match backend.open(device_id) {
                    Ok(source) => source,
                    Err(e) => {
                        let _ = setup_tx.send(Err(e));
                        return;
                    }
                };
                let _ = setup_tx.send(Ok(source.info()));
                poll_loop(device_id, source.as_mut(), &worker_shared, &config);
                source.close();
                *worker_shared.state.write() = StreamState::Stopped;
                debug!(device_id, "stream worker exited");
            })
            .map_err(|e| CaptureError::DeviceUnavailable {
                device_id,
                reason: format!("failed to spawn capture worker: {e}"),
            })?;

        let info = match setup_rx.recv() {
            Ok(Ok(info)) => info,
            Ok(Err(e)) => {
                let _ = worker.join();
                return Err(e);
            }
            Err(_) => {
                let _ = worker.join();
                return Err(CaptureError::DeviceUnavailable {
                    device_id,
                    reason: "capture worker exited before reporting".to_string(),
                });
            }
        };

        {
            // The worker may already have stopped itself; never resurrect it.
            let mut state = shared.state.write();
            if *state == StreamState::Idle {
                *state = StreamState::Running;
            }
        }
        info!(
            device_id,
            width = info.width,
            height = info.height,
            fps = info.fps,
            "camera stream started"
        );

        Ok(Self {
            device_id,
            info,
            shared,
            worker: Some(worker),
        })
    }

    /// Device id this stream polls
    pub fn device_id(&self) -> u32 {
        self.device_id
    }

    /// Resolution and FPS captured at open
    pub fn info(&self) -> CameraInfo {
        self.info
    }

    /// Current lifecycle state
    pub fn state(&self) -> StreamState {
        *self.shared.state.read()
    }

    /// Whether the worker is still polling
    pub fn is_running(&self) -> bool {
        self.state() == StreamState::Running
    }

    /// Read the current contents of the latest-frame slot.
    ///
    /// Purely reads the slot; never touches the hardware, so it is cheap
    /// and non-blocking regardless of camera latency.
    pub fn capture_latest(&self) -> CaptureResult<Arc<Frame>> {
        match self.state() {
            StreamState::Running => self
                .shared
                .latest
                .read()
                .clone()
                .ok_or(CaptureError::NoFrameYet {
                    device_id: self.device_id,
                }),
            StreamState::Idle | StreamState::Stopped => Err(CaptureError::NotRunning {
                device_id: self.device_id,
            }),
        }
    }

    /// Signal the worker to exit and wait for it; idempotent.
    ///
    /// The worker releases the device handle before acknowledging, so the
    /// handle is closed by the time this returns.
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!(device_id = self.device_id, "capture worker panicked");
                *self.shared.state.write() = StreamState::Stopped;
            }
            info!(device_id = self.device_id, "camera stream stopped");
        }
    }
}

impl Drop for CaptureStream {
    fn drop(&mut self) {
        self.stop();
    }
}

fn poll_loop(
    device_id: u32,
    source: &mut dyn FrameSource,
    shared: &StreamShared,
    config: &StreamConfig,
) {
    let mut consecutive_failures: u32 = 0;
    while shared.running.load(Ordering::Relaxed) {
        match source.read() {
            Ok(frame) => {
                consecutive_failures = 0;
                // Swap the whole frame in one write; readers see either the
                // previous frame or this one, never a partial buffer.
                *shared.latest.write() = Some(Arc::new(frame));
            }
            Err(e) => {
                consecutive_failures += 1;
                debug!(device_id, consecutive_failures, "frame capture failed: {}", e);
                if consecutive_failures >= config.failure_threshold {
                    warn!(
                        "{}",
                        CaptureError::StreamDegraded {
                            device_id,
                            failures: consecutive_failures,
                        }
                    );
                    break;
                }
            }
        }
        if !config.poll_interval.is_zero() {
            thread::sleep(config.poll_interval);
        }
    }
}
