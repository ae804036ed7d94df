//! Application configuration
//!
//! User settings and preferences stored in TOML format, with conversions
//! into the per-stage config types the pipeline consumes.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::capture::CaptureConfig;
use crate::reconcile::ReconcileConfig;
use crate::vision::annotate::AnnotateConfig;
use crate::vision::preprocess::PreprocessConfig;
use crate::vision::VisionConfig;

/// Environment variable consulted for the chat API key when the config
/// file leaves it unset
const API_KEY_ENV: &str = "TEXTLENS_API_KEY";

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Camera settings
    pub capture: CaptureSettings,
    /// OCR settings
    pub vision: VisionSettings,
    /// Overlay settings
    pub annotate: AnnotateSettings,
    /// Rolling history settings
    pub history: HistorySettings,
    /// Chat reconciliation settings
    pub reconcile: ReconcileSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            capture: CaptureSettings::default(),
            vision: VisionSettings::default(),
            annotate: AnnotateSettings::default(),
            history: HistorySettings::default(),
            reconcile: ReconcileSettings::default(),
        }
    }
}

impl AppConfig {
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            device_index: self.capture.device_index,
            width: self.capture.width,
            height: self.capture.height,
            frame_stride: self.capture.frame_stride,
        }
    }

    pub fn vision_config(&self) -> VisionConfig {
        VisionConfig {
            language: self.vision.language.clone(),
            tessdata_dir: self.vision.tessdata_dir.clone(),
            preprocess: PreprocessConfig {
                enabled: self.vision.preprocess.enabled,
                denoise: self.vision.preprocess.denoise,
                equalize: self.vision.preprocess.equalize,
                binarize: self.vision.preprocess.binarize,
            },
        }
    }

    pub fn annotate_config(&self) -> AnnotateConfig {
        AnnotateConfig {
            confidence_threshold: self.annotate.confidence_threshold,
            font_path: self.annotate.font_path.clone(),
            font_scale: self.annotate.font_scale,
        }
    }

    pub fn reconcile_config(&self) -> ReconcileConfig {
        ReconcileConfig {
            base_url: self.reconcile.base_url.clone(),
            api_key: self
                .reconcile
                .api_key
                .clone()
                .or_else(|| std::env::var(API_KEY_ENV).ok()),
            model: self.reconcile.model.clone(),
            timeout_secs: self.reconcile.timeout_secs,
        }
    }
}

/// Camera-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Camera device index (0 = default device)
    pub device_index: u32,
    /// Session frame width
    pub width: u32,
    /// Session frame height
    pub height: u32,
    /// Yield every n-th device frame
    pub frame_stride: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            device_index: 0,
            width: 840,
            height: 480,
            frame_stride: 1,
        }
    }
}

/// OCR-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionSettings {
    /// Tesseract language code
    pub language: String,
    /// Override for the language data directory
    pub tessdata_dir: Option<PathBuf>,
    /// Preprocessing stages
    pub preprocess: PreprocessSettings,
}

impl Default for VisionSettings {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            tessdata_dir: None,
            preprocess: PreprocessSettings::default(),
        }
    }
}

/// Preprocessing stage toggles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessSettings {
    pub enabled: bool,
    pub denoise: bool,
    pub equalize: bool,
    pub binarize: bool,
}

impl Default for PreprocessSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            denoise: true,
            equalize: true,
            binarize: true,
        }
    }
}

/// Overlay-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotateSettings {
    /// Confidence threshold as an integer percentage (0-100)
    pub confidence_threshold: u8,
    /// Explicit overlay font file
    pub font_path: Option<PathBuf>,
    /// Overlay text size in pixels
    pub font_scale: f32,
    /// User wordlist for spelling correction (one word per line)
    pub wordlist: Option<PathBuf>,
}

impl Default for AnnotateSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 50,
            font_path: None,
            font_scale: 24.0,
            wordlist: None,
        }
    }
}

/// Rolling history settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySettings {
    /// Number of recent readings kept for reconciliation
    pub window: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self { window: 3 }
    }
}

/// Chat endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileSettings {
    /// Endpoint base URL
    pub base_url: String,
    /// Bearer token; falls back to the TEXTLENS_API_KEY environment
    /// variable when unset
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        let defaults = ReconcileConfig::default();
        Self {
            base_url: defaults.base_url,
            api_key: None,
            model: defaults.model,
            timeout_secs: defaults.timeout_secs,
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        assert_eq!(config.capture.device_index, 0);
        assert_eq!(config.capture.width, 840);
        assert_eq!(config.capture.height, 480);
        assert_eq!(config.capture.frame_stride, 1);

        assert_eq!(config.vision.language, "eng");
        assert!(config.vision.tessdata_dir.is_none());
        assert!(config.vision.preprocess.enabled);

        assert_eq!(config.annotate.confidence_threshold, 50);
        assert!(config.annotate.font_path.is_none());

        assert_eq!(config.history.window, 3);
        assert_eq!(config.reconcile.model, "mistral-7b-instruct");
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = AppConfig::default();

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.capture.width, config.capture.width);
        assert_eq!(parsed.vision.language, config.vision.language);
        assert_eq!(
            parsed.annotate.confidence_threshold,
            config.annotate.confidence_threshold
        );
        assert_eq!(parsed.history.window, config.history.window);
        assert_eq!(parsed.reconcile.base_url, config.reconcile.base_url);
    }

    #[test]
    fn test_config_with_custom_values() {
        let mut config = AppConfig::default();
        config.capture.frame_stride = 4;
        config.vision.language = "deu".to_string();
        config.annotate.confidence_threshold = 75;

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.capture.frame_stride, 4);
        assert_eq!(parsed.vision.language, "deu");
        assert_eq!(parsed.annotate.confidence_threshold, 75);
    }

    #[test]
    fn test_save_and_load_config() {
        let config = AppConfig::default();
        let temp_file = NamedTempFile::new().unwrap();

        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(loaded.capture.width, config.capture.width);
        assert_eq!(loaded.reconcile.timeout_secs, config.reconcile.timeout_secs);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_capture_config_conversion() {
        let mut config = AppConfig::default();
        config.capture.width = 640;
        config.capture.frame_stride = 3;

        let capture = config.capture_config();
        assert_eq!(capture.width, 640);
        assert_eq!(capture.frame_stride, 3);
    }
}
