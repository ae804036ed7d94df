//! Rolling window of recent OCR readings
//!
//! Keeps the last few non-empty text strings the annotator produced. The
//! window is deliberately short: it only needs to span enough frames for the
//! reconciler to vote across per-frame OCR jitter.

use std::collections::VecDeque;

/// Default window size
pub const DEFAULT_WINDOW: usize = 3;

/// Bounded FIFO of recently accepted text strings.
///
/// Only the primary loop touches this, so no synchronization is needed.
#[derive(Debug, Clone)]
pub struct RollingHistory {
    entries: VecDeque<String>,
    capacity: usize,
}

impl RollingHistory {
    /// Create a history holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a reading, evicting the oldest entry when full
    pub fn push(&mut self, text: String) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(text);
    }

    /// Current contents, oldest first
    pub fn snapshot(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for RollingHistory {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_exceeds_capacity() {
        let mut history = RollingHistory::new(3);
        for i in 0..10 {
            history.push(format!("reading {i}"));
            assert!(history.len() <= 3);
        }
    }

    #[test]
    fn test_fifo_eviction_order() {
        let mut history = RollingHistory::new(3);
        history.push("one".into());
        history.push("two".into());
        history.push("three".into());
        history.push("four".into());

        // The first entry is gone; the rest remain in insertion order.
        assert_eq!(history.snapshot(), vec!["two", "three", "four"]);
    }

    #[test]
    fn test_zero_capacity_clamped_to_one() {
        let mut history = RollingHistory::new(0);
        history.push("only".into());
        history.push("newer".into());
        assert_eq!(history.snapshot(), vec!["newer"]);
    }

    #[test]
    fn test_clear() {
        let mut history = RollingHistory::default();
        history.push("something".into());
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.capacity(), DEFAULT_WINDOW);
    }
}
