//! Frame type representing a captured image with metadata.

use super::CameraError;
use chrono::{DateTime, Local};
use image::RgbImage;

/// A single captured color frame from the camera.
#[derive(Clone)]
pub struct Frame {
    /// 3-channel RGB pixel data.
    image: RgbImage,
    /// Wall clock time of capture.
    timestamp: DateTime<Local>,
    /// Monotonic sequence number.
    sequence: u64,
}

impl Frame {
    /// Creates a new frame from an RGB image.
    pub fn new(image: RgbImage, sequence: u64) -> Self {
        Self {
            image,
            timestamp: Local::now(),
            sequence,
        }
    }

    /// Creates a frame from a packed `width * height * 3` RGB buffer.
    pub fn from_rgb(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Result<Self, CameraError> {
        let len = pixels.len();
        let image = RgbImage::from_raw(width, height, pixels).ok_or_else(|| {
            CameraError::CaptureFailed(format!(
                "{len} bytes do not make a {width}x{height} RGB frame"
            ))
        })?;
        Ok(Self::new(image, sequence))
    }

    /// Returns the image.
    #[inline]
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Consumes the frame, returning the image.
    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Returns the frame width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Returns the frame height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Returns the capture timestamp.
    #[inline]
    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    /// Returns the sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("sequence", &self.sequence)
            .field("timestamp", &self.timestamp)
            .finish()
    }
}
