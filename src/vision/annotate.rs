//! Frame annotation
//!
//! Draws detection overlays onto the display frame and produces the joined
//! text string for the history window. Per-detection draw faults are typed
//! and logged; one malformed box never costs the rest of the frame.

use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use thiserror::Error;
use tracing::{debug, warn};

use crate::text::SpellingCorrector;
use crate::vision::{Detection, DetectionBatch};

/// Overlay color for boxes and text
const OVERLAY_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Well-known font locations tried when none is configured
const FONT_FALLBACKS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Failure to draw a single detection overlay
#[derive(Debug, Error)]
pub enum DrawError {
    /// Opposite corners collapse to a zero-area rectangle
    #[error("degenerate bounding box")]
    DegenerateBox,
    /// The box lies entirely outside the frame
    #[error("bounding box outside frame")]
    OutOfFrame,
}

/// Annotator configuration
#[derive(Debug, Clone)]
pub struct AnnotateConfig {
    /// Minimum confidence for a detection to be shown, as an integer
    /// percentage; a detection passes when `confidence * 100` exceeds it
    pub confidence_threshold: u8,
    /// Explicit font file for the text overlay
    pub font_path: Option<PathBuf>,
    /// Text overlay size in pixels
    pub font_scale: f32,
}

impl Default for AnnotateConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 50,
            font_path: None,
            font_scale: 24.0,
        }
    }
}

/// Result of one annotation cycle
#[derive(Debug)]
pub struct Annotated {
    /// Display frame with overlays applied (or an untouched copy)
    pub frame: RgbImage,
    /// Space-joined corrected texts of the detections that passed the
    /// threshold, in engine order; empty when none did
    pub text: String,
}

/// Draws detection overlays and collects corrected text
pub struct Annotator {
    threshold: u8,
    corrector: SpellingCorrector,
    font: Option<FontVec>,
    font_scale: f32,
}

impl Annotator {
    /// Build an annotator; falls back to boxes-only rendering when no
    /// usable font is found
    pub fn new(config: &AnnotateConfig, corrector: SpellingCorrector) -> Self {
        let font = load_font(config.font_path.as_deref());
        if font.is_none() {
            warn!("No overlay font available; drawing boxes without text");
        }

        Self {
            threshold: config.confidence_threshold.min(100),
            corrector,
            font,
            font_scale: config.font_scale,
        }
    }

    /// Current confidence threshold (0-100)
    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Adjust the confidence threshold at runtime
    pub fn set_threshold(&mut self, threshold: u8) {
        self.threshold = threshold.min(100);
    }

    /// Annotate a display frame with the pending detection batch, if any.
    ///
    /// With no batch the frame passes through untouched alongside an empty
    /// string. Detections at or below the threshold are ignored entirely.
    pub fn annotate(&self, frame: &RgbImage, batch: Option<&DetectionBatch>) -> Annotated {
        let mut canvas = frame.clone();

        let Some(batch) = batch else {
            return Annotated {
                frame: canvas,
                text: String::new(),
            };
        };

        let cutoff = self.threshold as f32 / 100.0;
        let mut texts = Vec::new();

        for detection in &batch.detections {
            if detection.confidence <= cutoff {
                continue;
            }

            let corrected = self.corrector.correct_phrase(&detection.text);

            if let Err(e) = self.draw_detection(&mut canvas, detection, &corrected) {
                warn!("Skipping overlay for '{}': {}", detection.text, e);
            }

            texts.push(corrected);
        }

        debug!("Annotated {} of {} detections", texts.len(), batch.len());

        Annotated {
            frame: canvas,
            text: texts.join(" "),
        }
    }

    /// Draw one detection: hollow rectangle between opposite quad corners,
    /// corrected text anchored at the first corner
    fn draw_detection(
        &self,
        canvas: &mut RgbImage,
        detection: &Detection,
        text: &str,
    ) -> Result<(), DrawError> {
        let (x0, y0) = detection.quad[0];
        let (x2, y2) = detection.quad[2];

        let left = x0.min(x2) as i32;
        let top = y0.min(y2) as i32;
        let width = (x0 - x2).abs() as u32;
        let height = (y0 - y2).abs() as u32;

        if width == 0 || height == 0 {
            return Err(DrawError::DegenerateBox);
        }
        if left >= canvas.width() as i32 || top >= canvas.height() as i32 {
            return Err(DrawError::OutOfFrame);
        }

        draw_hollow_rect_mut(
            canvas,
            Rect::at(left, top).of_size(width, height),
            OVERLAY_COLOR,
        );

        if let Some(font) = &self.font {
            draw_text_mut(
                canvas,
                OVERLAY_COLOR,
                x0 as i32,
                y0 as i32,
                PxScale::from(self.font_scale),
                font,
                text,
            );
        }

        Ok(())
    }
}

/// Load the configured font, falling back to well-known system locations
fn load_font(configured: Option<&Path>) -> Option<FontVec> {
    let candidates: Vec<PathBuf> = configured
        .map(|p| vec![p.to_path_buf()])
        .unwrap_or_else(|| FONT_FALLBACKS.iter().map(PathBuf::from).collect());

    for path in candidates {
        match std::fs::read(&path) {
            Ok(bytes) => match FontVec::try_from_vec(bytes) {
                Ok(font) => {
                    debug!("Loaded overlay font from {:?}", path);
                    return Some(font);
                }
                Err(e) => warn!("Unusable font {:?}: {}", path, e),
            },
            Err(_) => continue,
        }
    }

    None
}
