//! Text post-processing
//!
//! Spelling correction for raw OCR output and the short rolling history of
//! accepted readings that reconciliation draws from.

pub mod history;
pub mod spelling;

pub use history::RollingHistory;
pub use spelling::SpellingCorrector;
