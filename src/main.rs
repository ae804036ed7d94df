//! textlens - live webcam text recognition assistant
//!
//! Captures video frames, runs OCR on a background worker, overlays the
//! detected text, and on demand asks a chat model to reconcile the last few
//! noisy readings into a single phrase.

mod app;
mod capture;
mod config;
mod pipeline;
mod reconcile;
mod storage;
mod text;
mod vision;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{unbounded, Receiver};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::app::{Cycle, Session};
use crate::capture::{list_cameras, CameraSource, FrameSource, ImageSequenceSource};
use crate::config::AppConfig;
use crate::reconcile::ChatReconciler;
use crate::text::SpellingCorrector;
use crate::vision::{Annotator, TesseractDetector};

/// textlens - live webcam text recognition
#[derive(Parser, Debug)]
#[command(name = "textlens")]
#[command(about = "Reads text from a live camera feed, with spelling correction and chat-model reconciliation")]
struct Args {
    /// Camera device index (overrides the config file)
    #[arg(short, long)]
    camera: Option<u32>,

    /// List available camera devices and exit
    #[arg(long)]
    list_cameras: bool,

    /// Replay image files from a directory instead of opening a camera
    #[arg(long)]
    images: Option<PathBuf>,

    /// Confidence threshold 0-100 (overrides the config file)
    #[arg(short, long)]
    threshold: Option<u8>,

    /// Path to an alternate config file
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    // List cameras mode
    if args.list_cameras {
        println!("Available cameras:");
        let cameras = list_cameras();
        if cameras.is_empty() {
            println!("  No cameras detected");
        } else {
            for camera in &cameras {
                println!("  [{}] {} - {}", camera.index, camera.name, camera.description);
            }
        }
        return Ok(());
    }

    info!("textlens starting...");

    let mut config = load_or_create_config(args.config.as_deref());
    if let Some(camera) = args.camera {
        config.capture.device_index = camera;
    }
    if let Some(threshold) = args.threshold {
        config.annotate.confidence_threshold = threshold.min(100);
    }

    run_session(&config, args.images.as_deref())
}

/// Load configuration from the given path, the default location, or fall
/// back to defaults
fn load_or_create_config(explicit: Option<&std::path::Path>) -> AppConfig {
    if let Some(path) = explicit {
        match config::load_config(path) {
            Ok(config) => {
                info!("Loaded configuration from {:?}", path);
                return config;
            }
            Err(e) => warn!("Failed to load {:?} ({}), using defaults", path, e),
        }
    } else if let Ok(config_dir) = storage::get_config_dir() {
        let config_path = config_dir.join("config.toml");
        if config_path.exists() {
            if let Ok(config) = config::load_config(&config_path) {
                info!("Loaded configuration from {:?}", config_path);
                return config;
            }
        }
    }
    info!("Using default configuration");
    AppConfig::default()
}

/// Console commands read from stdin while the session runs
enum Control {
    ToggleFreeze,
    SetThreshold(u8),
    Ask(String),
    Quit,
}

fn parse_control(line: &str) -> Option<Control> {
    let line = line.trim();
    match line {
        "" => None,
        "q" | "quit" => Some(Control::Quit),
        "f" | "freeze" => Some(Control::ToggleFreeze),
        _ => {
            if let Some(value) = line.strip_prefix("t ") {
                match value.trim().parse::<u8>() {
                    Ok(threshold) if threshold <= 100 => Some(Control::SetThreshold(threshold)),
                    _ => {
                        warn!("Threshold must be an integer 0-100");
                        None
                    }
                }
            } else {
                Some(Control::Ask(line.to_string()))
            }
        }
    }
}

/// Read stdin lines on a dedicated thread and forward parsed commands
fn spawn_control_thread() -> Receiver<Control> {
    let (tx, rx) = unbounded();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            line.clear();
            match stdin.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if let Some(control) = parse_control(&line) {
                        if tx.send(control).is_err() {
                            break;
                        }
                    }
                }
            }
        }
    });
    rx
}

/// Assemble the pipeline and drive it until quit or end-of-stream
fn run_session(config: &AppConfig, images: Option<&std::path::Path>) -> Result<()> {
    let capture_config = config.capture_config();
    let vision_config = config.vision_config();

    let source: Box<dyn FrameSource> = match images {
        Some(dir) => Box::new(
            ImageSequenceSource::new(dir, capture_config)
                .context("Failed to open image sequence")?,
        ),
        None => Box::new(CameraSource::new(capture_config).context("Failed to open camera")?),
    };

    let detector = TesseractDetector::new(&vision_config).context("Failed to initialize OCR")?;

    let corrector = match &config.annotate.wordlist {
        Some(path) => SpellingCorrector::from_file(path)?,
        None => SpellingCorrector::new(),
    };
    let annotator = Annotator::new(&config.annotate_config(), corrector);

    let reconcile_config = config.reconcile_config();
    let reconciler = ChatReconciler::from_config(&reconcile_config);
    // Separate client for follow-up questions after a freeze.
    let chat = ChatReconciler::from_config(&reconcile_config);

    let mut session = Session::new(
        source,
        Box::new(detector),
        Box::new(reconciler),
        annotator,
        vision_config.preprocess,
        config.history.window,
    );

    info!("Session running. Commands: f = freeze/resume, t <n> = threshold, q = quit");
    info!("While frozen, any other input line is sent to the chat model");

    let controls = spawn_control_thread();

    loop {
        while let Ok(control) = controls.try_recv() {
            match control {
                Control::Quit => {
                    session.shutdown();
                    info!("textlens shutdown complete");
                    return Ok(());
                }
                Control::ToggleFreeze => {
                    if session.is_frozen() {
                        session.resume();
                    } else {
                        let reading = session.freeze();
                        println!("Reconciled reading: {reading}");
                    }
                }
                Control::SetThreshold(threshold) => {
                    session.set_confidence_threshold(threshold);
                    info!("Confidence threshold set to {}", threshold);
                }
                Control::Ask(question) => {
                    if session.is_frozen() {
                        let context = session
                            .freeze_state()
                            .reconciled_text
                            .clone();
                        match chat.chat(&question, context.as_deref()) {
                            Ok(answer) => println!("{answer}"),
                            Err(e) => warn!("Chat request failed: {}", e),
                        }
                    } else {
                        debug!("Ignoring input while capture is running: {}", question);
                    }
                }
            }
        }

        match session.cycle()? {
            Cycle::Frame(annotated) => {
                if !annotated.text.is_empty() {
                    debug!("Detected: {}", annotated.text);
                }
            }
            Cycle::Frozen => {
                std::thread::sleep(std::time::Duration::from_millis(50));
            }
            Cycle::EndOfStream => break,
        }
    }

    let stats = session.stats();
    info!(
        "Stream ended: {} frames rendered, {} offered to OCR, {} dropped",
        stats.frames_rendered, stats.frames_offered, stats.frames_dropped
    );

    session.shutdown();
    info!("textlens shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_control_commands() {
        assert!(matches!(parse_control("q"), Some(Control::Quit)));
        assert!(matches!(parse_control("quit"), Some(Control::Quit)));
        assert!(matches!(parse_control("f"), Some(Control::ToggleFreeze)));
        assert!(matches!(
            parse_control("t 75"),
            Some(Control::SetThreshold(75))
        ));
        assert!(parse_control("").is_none());
        assert!(parse_control("   ").is_none());
    }

    #[test]
    fn test_parse_control_threshold_bounds() {
        assert!(parse_control("t 101").is_none());
        assert!(parse_control("t abc").is_none());
        assert!(matches!(
            parse_control("t 0"),
            Some(Control::SetThreshold(0))
        ));
    }

    #[test]
    fn test_parse_control_free_text_becomes_question() {
        match parse_control("what does it say?") {
            Some(Control::Ask(q)) => assert_eq!(q, "what does it say?"),
            _ => panic!("expected Ask"),
        }
    }
}
