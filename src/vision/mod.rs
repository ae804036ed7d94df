//! Vision/OCR layer
//!
//! Text detection on captured frames plus the surrounding machinery: image
//! preprocessing, the background OCR worker, and frame annotation. The
//! detection engine itself sits behind the [`TextDetector`] trait so the
//! pipeline never depends on a particular backend.

pub mod annotate;
pub mod preprocess;
pub mod tesseract;
pub mod worker;

use image::GrayImage;
use std::time::Instant;
use thiserror::Error;

pub use annotate::{Annotated, Annotator};
pub use tesseract::TesseractDetector;
pub use worker::OcrWorker;

/// Errors produced by a detection engine
#[derive(Debug, Error)]
pub enum DetectError {
    /// The engine could not be initialized (missing language data, etc.)
    #[error("detector initialization failed: {0}")]
    Init(String),
    /// The engine failed on a single frame; the worker treats this as an
    /// empty result and keeps running
    #[error("detection failed: {0}")]
    Engine(String),
}

/// One recognized text region from a single frame
#[derive(Debug, Clone)]
pub struct Detection {
    /// Bounding quad corner points, clockwise from top-left
    pub quad: [(f32, f32); 4],
    /// Recognized text content
    pub text: String,
    /// Recognition confidence (0.0 - 1.0)
    pub confidence: f32,
}

impl Detection {
    /// Build a detection from an axis-aligned box (x1, y1, x2, y2)
    pub fn from_rect(x1: f32, y1: f32, x2: f32, y2: f32, text: String, confidence: f32) -> Self {
        Self {
            quad: [(x1, y1), (x2, y1), (x2, y2), (x1, y2)],
            text,
            confidence,
        }
    }

    /// Axis-aligned bounds as (x, y, width, height)
    pub fn bounds(&self) -> (u32, u32, u32, u32) {
        let min_x = self.quad.iter().map(|p| p.0).fold(f32::INFINITY, f32::min);
        let min_y = self.quad.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
        let max_x = self
            .quad
            .iter()
            .map(|p| p.0)
            .fold(f32::NEG_INFINITY, f32::max);
        let max_y = self
            .quad
            .iter()
            .map(|p| p.1)
            .fold(f32::NEG_INFINITY, f32::max);

        (
            min_x.max(0.0) as u32,
            min_y.max(0.0) as u32,
            (max_x - min_x).max(0.0) as u32,
            (max_y - min_y).max(0.0) as u32,
        )
    }
}

/// All detections from one frame, in engine order.
///
/// At most one unconsumed batch exists in the result channel at a time;
/// the worker drops newer batches while one is pending.
#[derive(Debug, Clone)]
pub struct DetectionBatch {
    /// Detections in the order the engine reported them
    pub detections: Vec<Detection>,
    /// Capture timestamp of the frame these came from
    pub frame_timestamp: Instant,
}

impl DetectionBatch {
    pub fn new(detections: Vec<Detection>, frame_timestamp: Instant) -> Self {
        Self {
            detections,
            frame_timestamp,
        }
    }

    /// An empty batch, published when the engine failed on a frame
    pub fn empty(frame_timestamp: Instant) -> Self {
        Self::new(Vec::new(), frame_timestamp)
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }
}

/// A text detection engine.
///
/// Implementations receive the preprocessed grayscale frame and return word
/// level detections. They run on the worker thread, hence `Send`. Engines
/// are consumed as black boxes; any internal failure surfaces as
/// [`DetectError::Engine`] and degrades to an empty batch upstream.
pub trait TextDetector: Send {
    fn detect(&mut self, image: &GrayImage) -> Result<Vec<Detection>, DetectError>;
}

/// Configuration for the vision stage
#[derive(Debug, Clone)]
pub struct VisionConfig {
    /// OCR language code (e.g. "eng")
    pub language: String,
    /// Override for the tesseract language data directory
    pub tessdata_dir: Option<std::path::PathBuf>,
    /// Preprocessing stages applied before detection
    pub preprocess: preprocess::PreprocessConfig,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            tessdata_dir: None,
            preprocess: preprocess::PreprocessConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_from_rect_corners() {
        let det = Detection::from_rect(10.0, 20.0, 110.0, 60.0, "word".into(), 0.9);
        assert_eq!(det.quad[0], (10.0, 20.0));
        assert_eq!(det.quad[2], (110.0, 60.0));
    }

    #[test]
    fn test_detection_bounds() {
        let det = Detection::from_rect(10.0, 20.0, 110.0, 60.0, "word".into(), 0.9);
        assert_eq!(det.bounds(), (10, 20, 100, 40));
    }

    #[test]
    fn test_empty_batch() {
        let batch = DetectionBatch::empty(Instant::now());
        assert!(batch.is_empty());
        assert_eq!(batch.len(), 0);
    }
}
