//! De-duplicated, append-only state log.
//!
//! Incoming state strings are trimmed and compared against the most recently
//! appended value. Empty strings and immediate repeats are dropped; repeats
//! separated by a different value are kept.
//!
//! The log is unbounded unless constructed with [`LogState::with_max_entries`],
//! in which case the oldest entries are evicted once the bound is reached.

use std::collections::VecDeque;

/// What happened to a single incoming frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The trimmed value was appended to the log.
    Appended(String),
    /// The frame was empty after trimming.
    Empty,
    /// The frame repeated the previously appended value.
    Duplicate,
    /// The channel is closed; the frame was ignored.
    Closed,
}

/// Session-scoped log state owned by a single consumer.
#[derive(Debug, Default)]
pub struct LogState {
    last_appended: String,
    entries: VecDeque<String>,
    max_entries: Option<usize>,
    evicted: u64,
}

impl LogState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log that keeps at most `max` entries. `0` means unbounded.
    pub fn with_max_entries(max: usize) -> Self {
        Self {
            max_entries: (max > 0).then_some(max),
            ..Self::default()
        }
    }

    /// Filter one raw frame into the log.
    pub fn accept(&mut self, raw: &str) -> FrameOutcome {
        let candidate = raw.trim();
        if candidate.is_empty() {
            return FrameOutcome::Empty;
        }
        if candidate == self.last_appended {
            return FrameOutcome::Duplicate;
        }

        if let Some(max) = self.max_entries {
            while self.entries.len() >= max {
                self.entries.pop_front();
                self.evicted += 1;
            }
        }

        self.entries.push_back(candidate.to_string());
        self.last_appended = candidate.to_string();
        FrameOutcome::Appended(self.last_appended.clone())
    }

    /// The accumulated log, one entry per line, each terminated by `\n`.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(entry);
            out.push('\n');
        }
        out
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// The most recently appended value, or `""` before the first append.
    pub fn last_appended(&self) -> &str {
        &self.last_appended
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries dropped by the size bound.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}
