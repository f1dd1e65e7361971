//! # Camlink Capture
//!
//! Camera access primitives for the camlink tool server: frame sources,
//! per-device capture streams, and the registry that enforces at most one
//! active stream per camera. This crate owns every interaction with camera
//! hardware; the tool façade in `camlink-server` only translates registry
//! results into caller-visible payloads.
//!
//! The hardware handle behind a [`FrameSource`] is not `Send`, so each
//! capture stream opens and releases its camera on its own worker thread.
//! Tool callers never block on camera I/O when reading the latest frame;
//! they read a single synchronized slot the worker keeps refreshed.

#![warn(clippy::all)]

pub mod backend;
pub mod enumerate;
pub mod error;
pub mod frame;
pub mod mock;
pub mod registry;
pub mod stream;

// Re-export main types
pub use backend::{CameraBackend, FrameSource, NokhwaBackend};
pub use enumerate::probe_devices;
pub use error::{CaptureError, CaptureResult};
pub use frame::{CameraInfo, Frame};
pub use mock::{MockBackend, MockCounters};
pub use registry::{StreamRegistry, StreamStart};
pub use stream::{CaptureStream, StreamConfig, StreamState};
