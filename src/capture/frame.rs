//! Frame data for captured video content

use image::RgbImage;
use std::time::Instant;

/// A single frame pulled from a frame source.
///
/// Frames are owned values: the annotator reads one by reference and the OCR
/// worker receives its own copy through the frame channel, so no frame is
/// ever mutated by more than one reader.
#[derive(Debug, Clone)]
pub struct Frame {
    /// RGB pixel data at the session resolution
    pub image: RgbImage,
    /// Timestamp when the frame was captured
    pub timestamp: Instant,
}

impl Frame {
    /// Create a new frame from decoded RGB pixels
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            timestamp: Instant::now(),
        }
    }

    /// Get frame dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}
