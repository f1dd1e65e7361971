//! Per-device stream registry
//!
//! Process-wide mapping from device id to at most one active capture
//! stream. The registry is an owned object: constructed at server start,
//! handed to the tool façade by reference, and torn down with
//! [`StreamRegistry::shutdown`]. All start/stop/lookup operations
//! serialize through a single lock; polling workers never take it, so
//! steady-state frame refresh never contends with registry operations.

use crate::backend::CameraBackend;
use crate::enumerate::probe_devices;
use crate::error::{CaptureError, CaptureResult};
use crate::frame::{CameraInfo, Frame};
use crate::stream::{CaptureStream, StreamConfig};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of a start request
#[derive(Debug, Clone)]
pub struct StreamStart {
    /// Resolution and FPS of the (new or existing) stream
    pub info: CameraInfo,
    /// Whether the device already had a running stream
    pub already_running: bool,
}

/// Registry of active capture streams, at most one per device id
pub struct StreamRegistry {
    backend: Arc<dyn CameraBackend>,
    config: StreamConfig,
    streams: Mutex<HashMap<u32, CaptureStream>>,
}

impl StreamRegistry {
    /// Create an empty registry using the given backend for all device access
    pub fn new(backend: Arc<dyn CameraBackend>, config: StreamConfig) -> Self {
        Self {
            backend,
            config,
            streams: Mutex::new(HashMap::new()),
        }
    }

    /// Probe device indices `0..max_probe` and report which opened
    pub fn list_devices(&self, max_probe: u32) -> Vec<u32> {
        probe_devices(self.backend.as_ref(), max_probe)
    }

    /// Open the device briefly and report its resolution and FPS.
    ///
    /// Independent short-lived acquisition; shares the one-shot contention
    /// caveat with [`StreamRegistry::capture_oneshot`].
    pub fn camera_info(&self, device_id: u32) -> CaptureResult<CameraInfo> {
        let mut source = self.backend.open(device_id)?;
        let info = source.info();
        source.close();
        Ok(info)
    }

    /// Start a capture stream for the device, or report the existing one.
    ///
    /// Idempotent: a second start on a running id returns its info without
    /// acquiring a second hardware handle. On open failure nothing is
    /// inserted.
    pub fn start_stream(&self, device_id: u32) -> CaptureResult<StreamStart> {
        let mut streams = self.streams.lock();
        Self::reap_stopped(&mut streams);

        if let Some(existing) = streams.get(&device_id) {
            info!(device_id, "stream already running");
            return Ok(StreamStart {
                info: existing.info(),
                already_running: true,
            });
        }

        let stream = CaptureStream::start(self.backend.clone(), device_id, self.config.clone())?;
        let info = stream.info();
        streams.insert(device_id, stream);
        Ok(StreamStart {
            info,
            already_running: false,
        })
    }

    /// Stop the device's stream and remove it from the registry.
    ///
    /// Fails with [`CaptureError::UnknownStream`] if there is nothing to
    /// stop, so callers can distinguish "never started" from "stopped".
    pub fn stop_stream(&self, device_id: u32) -> CaptureResult<()> {
        let mut streams = self.streams.lock();
        Self::reap_stopped(&mut streams);

        match streams.remove(&device_id) {
            Some(mut stream) => {
                stream.stop();
                Ok(())
            }
            None => Err(CaptureError::UnknownStream {
                device_id,
                operation: "stop".to_string(),
            }),
        }
    }

    /// Return the latest frame captured by the device's stream
    pub fn capture_from_stream(&self, device_id: u32) -> CaptureResult<Arc<Frame>> {
        let mut streams = self.streams.lock();
        Self::reap_stopped(&mut streams);

        match streams.get(&device_id) {
            Some(stream) => stream.capture_latest(),
            None => Err(CaptureError::UnknownStream {
                device_id,
                operation: "capture_from_stream".to_string(),
            }),
        }
    }

    /// Open the device, read exactly one frame, and release it.
    ///
    /// Bypasses the registry entirely and never consults a running stream
    /// on the same id; mixing the two modes on one device contends for the
    /// hardware handle and is the caller's responsibility to avoid.
    pub fn capture_oneshot(&self, device_id: u32) -> CaptureResult<Frame> {
        if self.streams.lock().contains_key(&device_id) {
            debug!(
                device_id,
                "one-shot capture while a stream is active on the same device"
            );
        }
        let mut source = self.backend.open(device_id)?;
        let result = source.read();
        source.close();
        result
    }

    /// Device ids with a currently running stream
    pub fn active_streams(&self) -> Vec<u32> {
        let mut streams = self.streams.lock();
        Self::reap_stopped(&mut streams);
        let mut ids: Vec<u32> = streams.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Stop every stream; used at server teardown
    pub fn shutdown(&self) {
        let mut streams = self.streams.lock();
        let count = streams.len();
        for (_, mut stream) in streams.drain() {
            stream.stop();
        }
        if count > 0 {
            info!(count, "all camera streams stopped");
        }
    }

    /// Drop entries whose worker already stopped itself (degraded device).
    ///
    /// Workers never touch the registry, so removal happens lazily on the
    /// next registry operation; afterwards the id reads as unknown.
    fn reap_stopped(streams: &mut HashMap<u32, CaptureStream>) {
        streams.retain(|&device_id, stream| {
            if stream.is_running() {
                true
            } else {
                debug!(device_id, "reaping stopped stream");
                false
            }
        });
    }
}

impl Drop for StreamRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
