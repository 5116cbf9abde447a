//! Bounded store of previously executed command lines with `!!` / `!N` recall.

use regex::Regex;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::LazyLock;
use thiserror::Error;

/// Number of entries retained by default.
pub const DEFAULT_CAPACITY: usize = 10;

static BANG_INDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^!([0-9]+)$").expect("static history pattern is valid"));

/// Errors produced when recalling from history.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// The reference is malformed, out of range, or points at an evicted entry.
    #[error("Invalid history command.")]
    InvalidHistoryIndex,
}

/// A single recorded command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// 1-based ordinal of the command across the whole session; never reused.
    pub sequence: u64,
    /// The line as it was executed, before tokenization.
    pub text: String,
}

/// Fixed-capacity FIFO of [`HistoryEntry`] values, oldest first.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
    total: u64,
}

impl History {
    /// Create an empty store that keeps at most `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            total: 0,
        }
    }

    /// Append `text`, evicting the oldest entry when full.
    ///
    /// Returns the sequence number assigned to the new entry.
    pub fn record(&mut self, text: impl Into<String>) -> u64 {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.total += 1;
        self.entries.push_back(HistoryEntry {
            sequence: self.total,
            text: text.into(),
        });
        self.total
    }

    /// Retained entries in chronological order.
    pub fn list(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Count of every command ever recorded, evicted ones included.
    pub fn total(&self) -> u64 {
        self.total
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

    /// Most recently recorded entry.
    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    /// Entry with sequence number `sequence`, if still retained.
    pub fn get(&self, sequence: u64) -> Option<&HistoryEntry> {
        let oldest = self.entries.front()?.sequence;
        if sequence < oldest || sequence > self.total {
            return None;
        }
        self.entries.get((sequence - oldest) as usize)
    }

    /// Resolve a bang reference (`!!` or `!N`) to the recorded text.
    pub fn resolve(&self, reference: &str) -> Result<&str, HistoryError> {
        let entry = if reference == "!!" {
            self.last()
        } else {
            BANG_INDEX
                .captures(reference)
                .and_then(|caps| caps[1].parse::<u64>().ok())
                .and_then(|sequence| self.get(sequence))
        };
        entry
            .map(|entry| entry.text.as_str())
            .ok_or(HistoryError::InvalidHistoryIndex)
    }

    /// Write the listing, one `%4d. <command>` row per retained entry.
    pub fn write_listing<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        for entry in self.list() {
            writeln!(out, "{:>4}. {}", entry.sequence, entry.text)?;
        }
        out.flush()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(n: u64) -> History {
        let mut history = History::default();
        for i in 1..=n {
            history.record(format!("cmd {}", i));
        }
        history
    }

    fn listing(history: &History) -> String {
        let mut out = Vec::new();
        history.write_listing(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_record_assigns_increasing_sequence_numbers() {
        let mut history = History::default();
        assert_eq!(history.record("pwd"), 1);
        assert_eq!(history.record("ls"), 2);
        assert_eq!(history.total(), 2);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_eviction_keeps_most_recent_window() {
        let history = filled(13);
        assert_eq!(history.len(), 10);
        assert_eq!(history.total(), 13);

        let seqs: Vec<u64> = history.list().map(|e| e.sequence).collect();
        assert_eq!(seqs, (4..=13).collect::<Vec<_>>());
        assert_eq!(history.list().next().unwrap().text, "cmd 4");
        assert_eq!(history.last().unwrap().text, "cmd 13");
    }

    #[test]
    fn test_listing_below_capacity_includes_newest() {
        let history = filled(3);
        assert_eq!(
            listing(&history),
            "   1. cmd 1\n   2. cmd 2\n   3. cmd 3\n"
        );
    }

    #[test]
    fn test_listing_above_capacity_keeps_true_numbers() {
        let history = filled(12);
        let text = listing(&history);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "   3. cmd 3");
        assert_eq!(lines[9], "  12. cmd 12");
    }

    #[test]
    fn test_listing_of_empty_history_is_empty() {
        assert_eq!(listing(&History::default()), "");
    }

    #[test]
    fn test_resolve_double_bang() {
        let history = filled(4);
        assert_eq!(history.resolve("!!"), Ok("cmd 4"));
    }

    #[test]
    fn test_resolve_double_bang_on_empty_history() {
        let history = History::default();
        assert_eq!(history.resolve("!!"), Err(HistoryError::InvalidHistoryIndex));
    }

    #[test]
    fn test_resolve_every_retained_index() {
        let history = filled(15);
        for n in 6..=15 {
            let expected = format!("cmd {}", n);
            assert_eq!(history.resolve(&format!("!{}", n)), Ok(expected.as_str()));
        }
    }

    #[test]
    fn test_resolve_evicted_index_fails() {
        let history = filled(15);
        assert_eq!(history.resolve("!5"), Err(HistoryError::InvalidHistoryIndex));
        assert_eq!(history.resolve("!1"), Err(HistoryError::InvalidHistoryIndex));
    }

    #[test]
    fn test_resolve_malformed_references() {
        let history = filled(3);
        for reference in ["!abc", "!0", "!", "!4", "!1a", "!!x", "! 1", "!-1", "!99999999", "!1 "] {
            assert_eq!(
                history.resolve(reference),
                Err(HistoryError::InvalidHistoryIndex),
                "reference {:?}",
                reference
            );
        }
    }

    #[test]
    fn test_resolve_huge_index_does_not_overflow() {
        let history = filled(3);
        assert_eq!(
            history.resolve("!99999999999999999999999999"),
            Err(HistoryError::InvalidHistoryIndex)
        );
    }

    #[test]
    fn test_failed_resolve_leaves_history_untouched() {
        let history = filled(3);
        let before = listing(&history);
        let _ = history.resolve("!abc");
        let _ = history.resolve("!99999999");
        assert_eq!(listing(&history), before);
        assert_eq!(history.total(), 3);
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            HistoryError::InvalidHistoryIndex.to_string(),
            "Invalid history command."
        );
    }
}
