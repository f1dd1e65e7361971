//! Frame and camera metadata types

use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// One decoded image sample from a camera at a point in time.
///
/// The pixel buffer is tightly-packed RGB8, copied out of the driver's
/// buffers at read time so it is never aliased with them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Pixel data, row-major RGB8
    pub data: Vec<u8>,
    /// Capture timestamp in milliseconds since the Unix epoch
    pub timestamp_ms: u64,
}

impl Frame {
    /// Create a frame timestamped now
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
            timestamp_ms: epoch_millis(),
        }
    }

    /// Expected byte length of the pixel buffer for this resolution
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// Resolution and frame rate as currently reported by the driver.
///
/// Values of 0 mean "unknown", not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CameraInfo {
    /// Device identifier
    pub device_id: u32,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Frames per second
    pub fps: u32,
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_expected_len() {
        let frame = Frame::new(4, 2, vec![0u8; 24]);
        assert_eq!(frame.expected_len(), 24);
        assert_eq!(frame.data.len(), frame.expected_len());
    }

    #[test]
    fn test_frame_is_timestamped() {
        let frame = Frame::new(1, 1, vec![0, 0, 0]);
        assert!(frame.timestamp_ms > 0);
    }
}
