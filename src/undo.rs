//! Bounded linear history.
//!
//! A sequence of entries with a cursor. Pushing after stepping back discards
//! every entry past the cursor, and the oldest entries are evicted once the
//! configured length is exceeded. Backs both the per-image undo history and
//! the processed-image history.

use serde::{Deserialize, Serialize};

/// Configuration for a history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of entries to keep
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

fn default_max_history() -> usize {
    crate::constants::DEFAULT_UNDO_HISTORY
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
        }
    }
}

/// Linear history with a cursor.
///
/// Invariant: `index < entries.len()` whenever the history is non-empty.
#[derive(Debug, Clone)]
pub struct LinearHistory<T> {
    entries: Vec<T>,
    index: usize,
    config: HistoryConfig,
}

impl<T> Default for LinearHistory<T> {
    fn default() -> Self {
        Self::with_config(HistoryConfig::default())
    }
}

impl<T> LinearHistory<T> {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom configuration
    pub fn with_config(config: HistoryConfig) -> Self {
        Self {
            entries: Vec::new(),
            index: 0,
            config: HistoryConfig {
                max_history: config.max_history.max(1),
            },
        }
    }

    /// Drop every entry and start over with `entry` as the only one.
    pub fn reset(&mut self, entry: T) {
        self.entries.clear();
        self.entries.push(entry);
        self.index = 0;
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index = 0;
    }

    /// Push an entry after the cursor, discarding forward entries, and move
    /// the cursor onto it.
    pub fn push(&mut self, entry: T) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.index + 1);
        }
        self.entries.push(entry);

        let overflow = self.entries.len().saturating_sub(self.config.max_history);
        if overflow > 0 {
            self.entries.drain(..overflow);
            log::trace!("History: evicted {} oldest entries", overflow);
        }
        self.index = self.entries.len() - 1;
    }

    /// Step the cursor back. Returns the new current entry, or `None` at the
    /// start.
    pub fn undo(&mut self) -> Option<&T> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        self.entries.get(self.index)
    }

    /// Step the cursor forward. Returns the new current entry, or `None` at
    /// the head.
    pub fn redo(&mut self) -> Option<&T> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        self.entries.get(self.index)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    /// Entry under the cursor.
    pub fn current(&self) -> Option<&T> {
        self.entries.get(self.index)
    }

    pub fn current_mut(&mut self) -> Option<&mut T> {
        self.entries.get_mut(self.index)
    }

    /// Entry at an absolute position.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index)
    }

    /// Newest entry, regardless of the cursor.
    pub fn last(&self) -> Option<&T> {
        self.entries.last()
    }

    pub fn last_mut(&mut self) -> Option<&mut T> {
        self.entries.last_mut()
    }

    /// Whether the cursor is on the newest entry (or the history is empty).
    pub fn at_head(&self) -> bool {
        !self.can_redo()
    }

    /// Move the cursor to an absolute position. Returns `false` (and leaves
    /// the cursor) when out of range.
    pub fn seek(&mut self, index: usize) -> bool {
        if index >= self.entries.len() {
            return false;
        }
        self.index = index;
        true
    }

    /// Move the cursor to the newest entry without changing data.
    pub fn seek_head(&mut self) {
        self.index = self.entries.len().saturating_sub(1);
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_history(&self) -> usize {
        self.config.max_history
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.iter_mut()
    }
}
