//! Camera backend abstraction and the nokhwa-based hardware implementation
//!
//! The backend is the factory seam between the registry machinery and the
//! camera hardware: streams, one-shot captures, device probing, and tests
//! all acquire their handles through [`CameraBackend::open`]. The handle a
//! backend produces is not required to be `Send` - nokhwa's `Camera` is
//! not - so a [`FrameSource`] always stays on the thread that opened it.

use crate::error::{CaptureError, CaptureResult};
use crate::frame::{CameraInfo, Frame};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use tracing::debug;

/// An exclusive handle to one open camera device
pub trait FrameSource {
    /// Synchronously read the next frame from the device
    fn read(&mut self) -> CaptureResult<Frame>;

    /// Resolution and FPS as currently reported by the driver (0 = unknown)
    fn info(&self) -> CameraInfo;

    /// Release the device handle; idempotent
    fn close(&mut self);
}

/// Factory for frame sources, shared across streams and one-shot captures
pub trait CameraBackend: Send + Sync {
    /// Acquire an exclusive handle to the given device.
    ///
    /// Fails with [`CaptureError::DeviceUnavailable`] if the handle cannot
    /// be acquired; wrong id, device busy, and permission denied are
    /// indistinguishable at this layer.
    fn open(&self, device_id: u32) -> CaptureResult<Box<dyn FrameSource>>;
}

/// Hardware camera backend built on nokhwa
#[derive(Debug, Default)]
pub struct NokhwaBackend;

impl NokhwaBackend {
    /// Create a new hardware backend
    pub fn new() -> Self {
        Self
    }
}

impl CameraBackend for NokhwaBackend {
    fn open(&self, device_id: u32) -> CaptureResult<Box<dyn FrameSource>> {
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);
        let mut camera = Camera::new(CameraIndex::Index(device_id), requested).map_err(|e| {
            CaptureError::DeviceUnavailable {
                device_id,
                reason: e.to_string(),
            }
        })?;
        camera
            .open_stream()
            .map_err(|e| CaptureError::DeviceUnavailable {
                device_id,
                reason: e.to_string(),
            })?;
        Ok(Box::new(NokhwaSource {
            device_id,
            camera,
            open: true,
        }))
    }
}

/// Frame source backed by an open nokhwa camera
struct NokhwaSource {
    device_id: u32,
    camera: Camera,
    open: bool,
}

impl FrameSource for NokhwaSource {
    fn read(&mut self) -> CaptureResult<Frame> {
        let buffer = self
            .camera
            .frame()
            .map_err(|e| CaptureError::CaptureFailed {
                device_id: self.device_id,
                reason: e.to_string(),
            })?;
        // Decoding copies the pixels out of the driver buffer, so the
        // returned frame is never aliased with it.
        let decoded =
            buffer
                .decode_image::<RgbFormat>()
                .map_err(|e| CaptureError::CaptureFailed {
                    device_id: self.device_id,
                    reason: e.to_string(),
                })?;
        let (width, height) = (decoded.width(), decoded.height());
        Ok(Frame::new(width, height, decoded.into_raw()))
    }

    fn info(&self) -> CameraInfo {
        let resolution = self.camera.resolution();
        CameraInfo {
            device_id: self.device_id,
            width: resolution.width(),
            height: resolution.height(),
            fps: self.camera.frame_rate(),
        }
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            if let Err(e) = self.camera.stop_stream() {
                debug!(device_id = self.device_id, "stop_stream failed: {}", e);
            }
        }
    }
}

impl Drop for NokhwaSource {
    fn drop(&mut self) {
        self.close();
    }
}
