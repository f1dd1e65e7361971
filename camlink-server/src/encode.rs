//! Image encoding for tool results
//!
//! The external-collaborator contract: given a frame, produce bytes
//! losslessly representing its pixels. Frames are PNG-encoded, then
//! base64-text-encoded and tagged with a fixed MIME type, matching the
//! image-content shape the calling agent expects.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use camlink_capture::Frame;
use image::{ImageBuffer, RgbImage};
use serde::Serialize;
use std::io::Cursor;
use thiserror::Error;

/// MIME type of every image payload
pub const IMAGE_MIME_TYPE: &str = "image/png";

/// Caller-visible image payload
#[derive(Debug, Clone, Serialize)]
pub struct ImageContent {
    /// Content discriminator, always `"image"`
    #[serde(rename = "type")]
    pub content_type: &'static str,
    /// MIME type of the encoded bytes
    #[serde(rename = "mimeType")]
    pub mime_type: &'static str,
    /// Base64 text of the PNG bytes
    pub data: String,
}

/// Image encoding failures
#[derive(Error, Debug)]
pub enum EncodeError {
    /// The frame's buffer does not match its stated resolution
    #[error("frame buffer mismatch: expected {expected} bytes, got {actual}")]
    BufferMismatch {
        /// Bytes implied by width and height
        expected: usize,
        /// Bytes actually present
        actual: usize,
    },

    /// PNG encoding failed
    #[error("png encoding failed: {0}")]
    Png(#[from] image::ImageError),
}

/// Encode a frame as a PNG image payload
pub fn encode_frame(frame: &Frame) -> Result<ImageContent, EncodeError> {
    let expected = frame.expected_len();
    if frame.data.len() != expected {
        return Err(EncodeError::BufferMismatch {
            expected,
            actual: frame.data.len(),
        });
    }
    let image: RgbImage = ImageBuffer::from_raw(frame.width, frame.height, frame.data.clone())
        .ok_or(EncodeError::BufferMismatch {
            expected,
            actual: frame.data.len(),
        })?;

    let mut png = Cursor::new(Vec::new());
    image.write_to(&mut png, image::ImageFormat::Png)?;

    Ok(ImageContent {
        content_type: "image",
        mime_type: IMAGE_MIME_TYPE,
        data: STANDARD.encode(png.get_ref()),
    })
}
