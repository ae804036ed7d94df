//! Image preprocessing for OCR
//!
//! Enhances a captured frame before it reaches the detection engine:
//! grayscale conversion, median denoising, histogram equalization, and Otsu
//! binarization. Each stage can be switched off from configuration; stylized
//! or low-contrast text often reads better with only a subset enabled.

use image::{DynamicImage, GrayImage, RgbImage};
use imageproc::contrast::{equalize_histogram, otsu_level, threshold, ThresholdType};
use imageproc::filter::median_filter;
use thiserror::Error;
use tracing::debug;

/// Errors produced by the preprocessing stage.
///
/// The worker treats any of these as "use the plain grayscale frame", so a
/// preprocessing fault never costs more than one unenhanced OCR pass.
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("cannot preprocess an empty frame")]
    EmptyFrame,
}

/// Preprocessing configuration
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Master switch; disabled means plain grayscale conversion only
    pub enabled: bool,
    /// 3x3 median filter to knock out sensor noise
    pub denoise: bool,
    /// Histogram equalization for low-contrast scenes
    pub equalize: bool,
    /// Otsu thresholding to a black/white image
    pub binarize: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            denoise: true,
            equalize: true,
            binarize: true,
        }
    }
}

/// Enhance a frame for OCR.
///
/// Returns the grayscale image with the configured stages applied in order:
/// denoise, equalize, binarize.
pub fn enhance(image: &RgbImage, config: &PreprocessConfig) -> Result<GrayImage, PreprocessError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(PreprocessError::EmptyFrame);
    }

    let mut gray = to_grayscale(image);

    if !config.enabled {
        debug!("Preprocessing disabled, passing grayscale through");
        return Ok(gray);
    }

    if config.denoise {
        gray = median_filter(&gray, 1, 1);
    }

    if config.equalize {
        gray = equalize_histogram(&gray);
    }

    if config.binarize {
        let level = otsu_level(&gray);
        gray = threshold(&gray, level, ThresholdType::Binary);
        debug!("Binarized at Otsu level {}", level);
    }

    Ok(gray)
}

/// Plain luminance conversion, also used as the fallback when `enhance`
/// fails
pub fn to_grayscale(image: &RgbImage) -> GrayImage {
    DynamicImage::ImageRgb8(image.clone()).to_luma8()
}
