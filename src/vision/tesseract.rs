//! Tesseract detection backend
//!
//! Word-level OCR through the `tesseract-rs` bindings. The engine receives
//! the preprocessed grayscale frame and reports one [`Detection`] per word,
//! with the bounding box widened into the quad form the annotator expects.

use std::path::PathBuf;

use image::GrayImage;
use tesseract_rs::{TessPageIteratorLevel, TesseractAPI};
use tracing::{debug, info};

use super::{DetectError, Detection, TextDetector, VisionConfig};

/// Text detector backed by Tesseract
pub struct TesseractDetector {
    api: TesseractAPI,
}

impl TesseractDetector {
    /// Initialize Tesseract with the configured language.
    ///
    /// Language data is looked up in `config.tessdata_dir` when set,
    /// otherwise in the per-OS cache directory where `tesseract-rs` keeps
    /// its downloaded data files.
    pub fn new(config: &VisionConfig) -> Result<Self, DetectError> {
        let tessdata = match &config.tessdata_dir {
            Some(dir) => dir.clone(),
            None => default_tessdata_dir()?,
        };

        let api = TesseractAPI::new();
        api.init(
            tessdata.to_str().unwrap_or_default(),
            &config.language,
        )
        .map_err(|e| {
            DetectError::Init(format!(
                "language '{}' from {:?}: {}",
                config.language, tessdata, e
            ))
        })?;

        info!(
            "Tesseract initialized (language '{}', tessdata {:?})",
            config.language, tessdata
        );

        Ok(Self { api })
    }
}

impl TextDetector for TesseractDetector {
    fn detect(&mut self, image: &GrayImage) -> Result<Vec<Detection>, DetectError> {
        let (width, height) = image.dimensions();

        self.api
            .set_image(
                image.as_raw(),
                width as i32,
                height as i32,
                1,
                width as i32,
            )
            .map_err(|e| DetectError::Engine(e.to_string()))?;

        self.api
            .recognize()
            .map_err(|e| DetectError::Engine(e.to_string()))?;

        let iter = self
            .api
            .get_iterator()
            .map_err(|e| DetectError::Engine(e.to_string()))?;

        let mut detections = Vec::new();
        while iter.next(TessPageIteratorLevel::RIL_WORD).unwrap_or(false) {
            let text = match iter.get_utf8_text(TessPageIteratorLevel::RIL_WORD) {
                Ok(text) => text.trim().to_string(),
                Err(_) => continue,
            };
            if text.is_empty() {
                continue;
            }

            if let (Ok((x1, y1, x2, y2)), Ok(confidence)) = (
                iter.get_bounding_box(TessPageIteratorLevel::RIL_WORD),
                iter.confidence(TessPageIteratorLevel::RIL_WORD),
            ) {
                detections.push(Detection::from_rect(
                    x1 as f32,
                    y1 as f32,
                    x2 as f32,
                    y2 as f32,
                    text,
                    (confidence / 100.0).clamp(0.0, 1.0),
                ));
            }
        }

        debug!("Tesseract found {} words", detections.len());
        Ok(detections)
    }
}

/// Default location of the language data that `tesseract-rs` downloads at
/// build time
fn default_tessdata_dir() -> Result<PathBuf, DetectError> {
    let base = if cfg!(target_os = "macos") {
        let home = std::env::var("HOME")
            .map_err(|_| DetectError::Init("HOME is not set".into()))?;
        PathBuf::from(home)
            .join("Library")
            .join("Application Support")
    } else if cfg!(target_os = "windows") {
        let appdata = std::env::var("APPDATA")
            .map_err(|_| DetectError::Init("APPDATA is not set".into()))?;
        PathBuf::from(appdata)
    } else {
        let home = std::env::var("HOME")
            .map_err(|_| DetectError::Init("HOME is not set".into()))?;
        PathBuf::from(home).join(".tesseract-rs")
    };

    Ok(base.join("tesseract-rs").join("tessdata"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tessdata_dir_ends_in_tessdata() {
        let dir = default_tessdata_dir().unwrap();
        assert!(dir.ends_with("tesseract-rs/tessdata") || dir.ends_with("tessdata"));
    }
}
