//! Mock camera backend for tests and unsupported platforms
//!
//! The mock keeps per-device open/close accounting so tests can verify the
//! resource discipline of streams, probes, and one-shot captures.

use crate::backend::{CameraBackend, FrameSource};
use crate::error::{CaptureError, CaptureResult};
use crate::frame::{CameraInfo, Frame};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Resolution and rate every mock device reports
pub const MOCK_WIDTH: u32 = 64;
/// Mock frame height
pub const MOCK_HEIGHT: u32 = 48;
/// Mock frame rate
pub const MOCK_FPS: u32 = 30;

/// Per-device open/close accounting shared with tests
#[derive(Debug, Default)]
pub struct MockCounters {
    counts: Mutex<HashMap<u32, DeviceCounts>>,
}

#[derive(Debug, Default, Clone, Copy)]
struct DeviceCounts {
    opens: u64,
    closes: u64,
}

impl MockCounters {
    /// Number of successful opens recorded for a device
    pub fn opens(&self, device_id: u32) -> u64 {
        self.counts.lock().get(&device_id).copied().unwrap_or_default().opens
    }

    /// Number of closes recorded for a device
    pub fn closes(&self, device_id: u32) -> u64 {
        self.counts.lock().get(&device_id).copied().unwrap_or_default().closes
    }

    fn record_open(&self, device_id: u32) {
        self.counts.lock().entry(device_id).or_default().opens += 1;
    }

    fn record_close(&self, device_id: u32) {
        self.counts.lock().entry(device_id).or_default().closes += 1;
    }
}

/// Mock camera backend with scripted devices and read behavior
#[derive(Debug, Clone)]
pub struct MockBackend {
    present: Vec<u32>,
    read_budget: Option<u64>,
    first_read_delay: Duration,
    counters: Arc<MockCounters>,
}

impl MockBackend {
    /// Backend where exactly the given device ids open successfully
    pub fn new(present: &[u32]) -> Self {
        Self {
            present: present.to_vec(),
            read_budget: None,
            first_read_delay: Duration::ZERO,
            counters: Arc::new(MockCounters::default()),
        }
    }

    /// Sources fail every read after this many successes
    pub fn with_read_budget(mut self, reads: u64) -> Self {
        self.read_budget = Some(reads);
        self
    }

    /// Sources block this long before completing their first read
    pub fn with_first_read_delay(mut self, delay: Duration) -> Self {
        self.first_read_delay = delay;
        self
    }

    /// Accounting handle, valid after the backend has been handed off
    pub fn counters(&self) -> Arc<MockCounters> {
        self.counters.clone()
    }
}

impl CameraBackend for MockBackend {
    fn open(&self, device_id: u32) -> CaptureResult<Box<dyn FrameSource>> {
        if !self.present.contains(&device_id) {
            return Err(CaptureError::DeviceUnavailable {
                device_id,
                reason: "no such device".to_string(),
            });
        }
        self.counters.record_open(device_id);
        Ok(Box::new(MockSource {
            device_id,
            reads_done: 0,
            read_budget: self.read_budget,
            first_read_delay: self.first_read_delay,
            counters: self.counters.clone(),
            closed: false,
        }))
    }
}

struct MockSource {
    device_id: u32,
    reads_done: u64,
    read_budget: Option<u64>,
    first_read_delay: Duration,
    counters: Arc<MockCounters>,
    closed: bool,
}

impl FrameSource for MockSource {
    fn read(&mut self) -> CaptureResult<Frame> {
        if self.reads_done == 0 && !self.first_read_delay.is_zero() {
            std::thread::sleep(self.first_read_delay);
        }
        if let Some(budget) = self.read_budget {
            if self.reads_done >= budget {
                return Err(CaptureError::CaptureFailed {
                    device_id: self.device_id,
                    reason: "simulated read failure".to_string(),
                });
            }
        }
        self.reads_done += 1;
        Ok(Frame::new(
            MOCK_WIDTH,
            MOCK_HEIGHT,
            pattern_pixels(MOCK_WIDTH, MOCK_HEIGHT),
        ))
    }

    fn info(&self) -> CameraInfo {
        CameraInfo {
            device_id: self.device_id,
            width: MOCK_WIDTH,
            height: MOCK_HEIGHT,
            fps: MOCK_FPS,
        }
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.counters.record_close(self.device_id);
        }
    }
}

impl Drop for MockSource {
    fn drop(&mut self) {
        self.close();
    }
}

/// Deterministic RGB gradient, usable for lossless round-trip checks
pub fn pattern_pixels(width: u32, height: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height {
        for x in 0..width {
            for channel in 0..3u32 {
                data.push(((x * 3 + y * 7 + channel * 11) % 256) as u8);
            }
        }
    }
    data
}
