//! Frame acquisition layer
//!
//! All capture variants sit behind the [`FrameSource`] trait so the pipeline
//! is identical no matter where frames come from: a local webcam
//! ([`CameraSource`]) or a pre-recorded image sequence
//! ([`ImageSequenceSource`]).

pub mod frame;

use std::path::{Path, PathBuf};

use image::{imageops::FilterType, RgbImage};
use nokhwa::{
    pixel_format::RgbFormat,
    utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType},
    Camera,
};
use thiserror::Error;
use tracing::{debug, info, warn};

pub use frame::Frame;

/// Errors produced by frame sources
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The capture device could not be opened or read
    #[error("capture device error: {0}")]
    Device(String),
    /// A frame was read but could not be decoded into RGB pixels
    #[error("frame decode error: {0}")]
    Decode(String),
}

/// Frame source configuration
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Camera device index (0 = default device)
    pub device_index: u32,
    /// Session frame width; every yielded frame is resized to this
    pub width: u32,
    /// Session frame height
    pub height: u32,
    /// Yield every n-th device frame (1 = every frame). Subsampling lives
    /// here, on the source, so OCR cadence is tuned without touching the
    /// worker.
    pub frame_stride: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            width: 840,
            height: 480,
            frame_stride: 1,
        }
    }
}

/// A source of video frames.
///
/// `next_frame` returns `Ok(None)` on end-of-stream, which terminates the
/// session loop cleanly. Implementations must not block longer than one
/// device frame interval.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError>;
}

/// Information about an attached camera device
#[derive(Debug, Clone)]
pub struct CameraDevice {
    pub index: u32,
    pub name: String,
    pub description: String,
}

/// List camera devices attached to the system
pub fn list_cameras() -> Vec<CameraDevice> {
    match nokhwa::query(ApiBackend::Auto) {
        Ok(cameras) => cameras
            .into_iter()
            .map(|info| CameraDevice {
                index: match info.index() {
                    CameraIndex::Index(i) => *i,
                    CameraIndex::String(_) => 0,
                },
                name: info.human_name(),
                description: info.description().to_string(),
            })
            .collect(),
        Err(e) => {
            warn!("Camera enumeration failed: {}", e);
            Vec::new()
        }
    }
}

/// Webcam frame source backed by nokhwa
pub struct CameraSource {
    camera: Camera,
    config: CaptureConfig,
}

impl CameraSource {
    /// Open the configured camera device and start streaming
    pub fn new(config: CaptureConfig) -> Result<Self, CaptureError> {
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);

        let mut camera = Camera::new(CameraIndex::Index(config.device_index), requested)
            .map_err(|e| CaptureError::Device(e.to_string()))?;

        camera
            .open_stream()
            .map_err(|e| CaptureError::Device(e.to_string()))?;

        info!(
            "Opened camera {} ({}) at {}",
            config.device_index,
            camera.info().human_name(),
            camera.camera_format()
        );

        Ok(Self { camera, config })
    }

    /// Name of the underlying device
    pub fn name(&self) -> String {
        self.camera.info().human_name()
    }
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        // Pull and discard the frames skipped by the stride so the device
        // buffer stays current.
        for _ in 1..self.config.frame_stride.max(1) {
            let _ = self.camera.frame();
        }

        let buffer = self
            .camera
            .frame()
            .map_err(|e| CaptureError::Device(e.to_string()))?;

        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CaptureError::Decode(e.to_string()))?;

        Ok(Some(Frame::new(resize_to_session(
            decoded,
            self.config.width,
            self.config.height,
        ))))
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            debug!("Failed to stop camera stream: {}", e);
        }
    }
}

/// Frame source that replays an ordered directory of still images.
///
/// Yields end-of-stream after the last readable file. Unreadable files are
/// skipped with a warning rather than failing the stream.
pub struct ImageSequenceSource {
    files: Vec<PathBuf>,
    position: usize,
    config: CaptureConfig,
}

impl ImageSequenceSource {
    /// Build a source from all image files in `dir`, sorted by filename
    pub fn new(dir: &Path, config: CaptureConfig) -> Result<Self, CaptureError> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| CaptureError::Device(format!("{}: {}", dir.display(), e)))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_image_file(path))
            .collect();
        files.sort();

        info!("Image sequence source: {} frames in {:?}", files.len(), dir);

        Ok(Self {
            files,
            position: 0,
            config,
        })
    }

    /// Number of frames remaining in the sequence
    pub fn remaining(&self) -> usize {
        self.files.len().saturating_sub(self.position)
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        while self.position < self.files.len() {
            let path = self.files[self.position].clone();
            let stride = self.config.frame_stride.max(1) as usize;
            self.position += stride;

            match image::open(&path) {
                Ok(img) => {
                    return Ok(Some(Frame::new(resize_to_session(
                        img.to_rgb8(),
                        self.config.width,
                        self.config.height,
                    ))));
                }
                Err(e) => {
                    warn!("Skipping unreadable image {:?}: {}", path, e);
                }
            }
        }

        Ok(None)
    }
}

fn is_image_file(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("png" | "jpg" | "jpeg" | "bmp")
    )
}

/// Resize a decoded frame to the session resolution, if it differs
fn resize_to_session(image: RgbImage, width: u32, height: u32) -> RgbImage {
    if image.dimensions() == (width, height) {
        image
    } else {
        image::imageops::resize(&image, width, height, FilterType::Triangle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_default_capture_config() {
        let config = CaptureConfig::default();
        assert_eq!(config.device_index, 0);
        assert_eq!(config.width, 840);
        assert_eq!(config.height, 480);
        assert_eq!(config.frame_stride, 1);
    }

    #[test]
    fn test_resize_to_session_passthrough() {
        let img = RgbImage::new(840, 480);
        let resized = resize_to_session(img, 840, 480);
        assert_eq!(resized.dimensions(), (840, 480));
    }

    #[test]
    fn test_resize_to_session_scales() {
        let img = RgbImage::from_pixel(1280, 720, Rgb([10, 20, 30]));
        let resized = resize_to_session(img, 840, 480);
        assert_eq!(resized.dimensions(), (840, 480));
        // Uniform input stays uniform after interpolation
        assert_eq!(resized.get_pixel(400, 200), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file(Path::new("frame_001.png")));
        assert!(is_image_file(Path::new("frame_001.JPG")));
        assert!(!is_image_file(Path::new("notes.txt")));
        assert!(!is_image_file(Path::new("frame")));
    }

    #[test]
    fn test_image_sequence_source_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut source =
            ImageSequenceSource::new(dir.path(), CaptureConfig::default()).unwrap();
        assert_eq!(source.remaining(), 0);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_image_sequence_source_yields_in_order_then_ends() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.png"] {
            let img = RgbImage::new(4, 4);
            img.save(dir.path().join(name)).unwrap();
        }

        let config = CaptureConfig {
            width: 8,
            height: 8,
            ..Default::default()
        };
        let mut source = ImageSequenceSource::new(dir.path(), config).unwrap();
        assert_eq!(source.remaining(), 2);

        let first = source.next_frame().unwrap().unwrap();
        assert_eq!(first.dimensions(), (8, 8));
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_image_sequence_source_missing_dir() {
        let result = ImageSequenceSource::new(
            Path::new("/nonexistent/frames"),
            CaptureConfig::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_image_sequence_stride_skips_frames() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.png", "b.png", "c.png", "d.png"] {
            let img = RgbImage::new(4, 4);
            img.save(dir.path().join(name)).unwrap();
        }

        let config = CaptureConfig {
            width: 4,
            height: 4,
            frame_stride: 2,
            ..Default::default()
        };
        let mut source = ImageSequenceSource::new(dir.path(), config).unwrap();

        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_some());
        // Four files at stride 2 yield exactly two frames
        assert!(source.next_frame().unwrap().is_none());
    }
}
