//! Capture error types and handling
//!
//! This module defines all error types used throughout the capture library.
//! Every registry-level error carries the device id it concerns, so the
//! tool façade can surface it to the caller without extra context.

use thiserror::Error;

/// Main error type for camera capture operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Opening the device failed (wrong id, device busy, permission denied
    /// - indistinguishable at this layer)
    #[error("camera {device_id} could not be opened: {reason}")]
    DeviceUnavailable {
        /// Device identifier
        device_id: u32,
        /// Failure reason as reported by the driver
        reason: String,
    },

    /// A single read returned no frame (disconnect mid-stream, transient
    /// driver error); callers decide retry policy
    #[error("camera {device_id} failed to capture a frame: {reason}")]
    CaptureFailed {
        /// Device identifier
        device_id: u32,
        /// Failure reason
        reason: String,
    },

    /// The stream is running but no successful read has completed yet
    #[error("no frame available yet for camera {device_id}")]
    NoFrameYet {
        /// Device identifier
        device_id: u32,
    },

    /// The stream is not running
    #[error("camera {device_id} stream is not running")]
    NotRunning {
        /// Device identifier
        device_id: u32,
    },

    /// The operation targets a device id with no registry entry
    #[error("camera {device_id} is not streaming (operation: {operation})")]
    UnknownStream {
        /// Device identifier
        device_id: u32,
        /// Operation that was attempted
        operation: String,
    },

    /// Consecutive read failures exceeded the threshold, causing auto-stop
    #[error("camera {device_id} stream degraded after {failures} consecutive read failures")]
    StreamDegraded {
        /// Device identifier
        device_id: u32,
        /// Number of consecutive failures observed
        failures: u32,
    },
}

/// Result type alias for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

impl CaptureError {
    /// Device id this error concerns
    pub fn device_id(&self) -> u32 {
        match self {
            CaptureError::DeviceUnavailable { device_id, .. } => *device_id,
            CaptureError::CaptureFailed { device_id, .. } => *device_id,
            CaptureError::NoFrameYet { device_id } => *device_id,
            CaptureError::NotRunning { device_id } => *device_id,
            CaptureError::UnknownStream { device_id, .. } => *device_id,
            CaptureError::StreamDegraded { device_id, .. } => *device_id,
        }
    }
}
