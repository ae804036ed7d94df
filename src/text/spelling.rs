//! Dictionary-based spelling correction for OCR output
//!
//! OCR on live video misreads a character or two per word far more often
//! than it invents whole words, so nearest-dictionary-word by edit distance
//! recovers most of them. Unknown words with no close candidate pass through
//! unchanged.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use strsim::levenshtein;

/// Wordlist compiled into the binary; a user list can replace it via
/// [`SpellingCorrector::from_file`].
const BUILTIN_WORDS: &str = include_str!("words.txt");

/// Pure word -> word corrector
pub struct SpellingCorrector {
    words: Vec<String>,
    known: HashSet<String>,
}

impl SpellingCorrector {
    /// Corrector over the built-in wordlist
    pub fn new() -> Self {
        Self::from_wordlist(BUILTIN_WORDS)
    }

    /// Corrector over a user-provided wordlist file (one word per line)
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read wordlist {:?}", path))?;
        Ok(Self::from_wordlist(&content))
    }

    fn from_wordlist(content: &str) -> Self {
        let words: Vec<String> = content
            .lines()
            .map(|line| line.trim().to_lowercase())
            .filter(|line| !line.is_empty())
            .collect();
        let known = words.iter().cloned().collect();
        Self { words, known }
    }

    /// Number of dictionary words loaded
    pub fn dictionary_size(&self) -> usize {
        self.words.len()
    }

    /// Correct a single word.
    ///
    /// Known words and words with no alphabetic content come back unchanged.
    /// Otherwise the closest dictionary word within the edit-distance budget
    /// wins; leading capitalization of the input is preserved.
    pub fn correct(&self, word: &str) -> String {
        if !word.chars().any(|c| c.is_alphabetic()) {
            return word.to_string();
        }

        let lower = word.to_lowercase();
        if self.known.contains(&lower) {
            return word.to_string();
        }

        let budget = distance_budget(lower.chars().count());
        let mut best: Option<(&str, usize)> = None;
        for candidate in &self.words {
            let distance = levenshtein(&lower, candidate);
            if distance <= budget && best.map_or(true, |(_, d)| distance < d) {
                best = Some((candidate, distance));
            }
        }

        match best {
            Some((candidate, _)) => match_capitalization(word, candidate),
            None => word.to_string(),
        }
    }

    /// Correct every whitespace-separated word in `text`
    pub fn correct_phrase(&self, text: &str) -> String {
        text.split_whitespace()
            .map(|word| self.correct(word))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for SpellingCorrector {
    fn default() -> Self {
        Self::new()
    }
}

/// Edit-distance budget grows with word length; short words get one edit
fn distance_budget(len: usize) -> usize {
    if len <= 4 {
        1
    } else {
        2
    }
}

/// Carry the input's leading capitalization over to the replacement
fn match_capitalization(original: &str, replacement: &str) -> String {
    if original.chars().next().is_some_and(|c| c.is_uppercase()) {
        let mut chars = replacement.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    } else {
        replacement.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_word_unchanged() {
        let corrector = SpellingCorrector::new();
        assert_eq!(corrector.correct("python"), "python");
        assert_eq!(corrector.correct("word"), "word");
    }

    #[test]
    fn test_near_miss_corrected() {
        let corrector = SpellingCorrector::new();
        assert_eq!(corrector.correct("pythn"), "python");
        assert_eq!(corrector.correct("wrd"), "word");
    }

    #[test]
    fn test_capitalization_preserved() {
        let corrector = SpellingCorrector::new();
        assert_eq!(corrector.correct("Pythn"), "Python");
    }

    #[test]
    fn test_gibberish_passes_through() {
        let corrector = SpellingCorrector::new();
        assert_eq!(corrector.correct("qzxjv"), "qzxjv");
    }

    #[test]
    fn test_numbers_and_punctuation_untouched() {
        let corrector = SpellingCorrector::new();
        assert_eq!(corrector.correct("1234"), "1234");
        assert_eq!(corrector.correct("--"), "--");
    }

    #[test]
    fn test_correct_phrase() {
        let corrector = SpellingCorrector::new();
        assert_eq!(corrector.correct_phrase("I am a pythn"), "I am a python");
    }

    #[test]
    fn test_phrase_whitespace_normalized() {
        let corrector = SpellingCorrector::new();
        assert_eq!(corrector.correct_phrase("  hello   world "), "hello world");
    }

    #[test]
    fn test_from_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "zebra\nxylophone").unwrap();

        let corrector = SpellingCorrector::from_file(file.path()).unwrap();
        assert_eq!(corrector.dictionary_size(), 2);
        assert_eq!(corrector.correct("zebr"), "zebra");
    }

    #[test]
    fn test_from_file_missing() {
        assert!(SpellingCorrector::from_file(Path::new("/nonexistent/words.txt")).is_err());
    }

    #[test]
    fn test_short_word_budget_is_tight() {
        let corrector = SpellingCorrector::new();
        // Two edits on a three-letter word is beyond the budget.
        assert_eq!(corrector.correct("czt"), "czt");
    }
}
