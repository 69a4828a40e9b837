//! Selection range - the external representation of a user selection.
//!
//! The core does not own cursor or selection state; edit operations accept a
//! range (start leaf + byte offset, end leaf + byte offset, already normalized
//! to forward direction by the caller) and keep its anchors valid across the
//! splits and merges they perform.

use crate::id::LeafId;

/// A forward-ordered range across the leaf chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRange {
    pub start: LeafId,
    pub start_offset: usize,
    pub end: LeafId,
    pub end_offset: usize,
}

impl TextRange {
    pub fn new(start: LeafId, start_offset: usize, end: LeafId, end_offset: usize) -> Self {
        Self {
            start,
            start_offset,
            end,
            end_offset,
        }
    }

    /// A caret: both anchors on the same spot.
    pub fn collapsed(leaf: LeafId, offset: usize) -> Self {
        Self::new(leaf, offset, leaf, offset)
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end && self.start_offset == self.end_offset
    }

    /// Redirect anchors pointing at `from` to `to`, shifting their offsets by
    /// `base` (the content length `to` had before the merge). Called when
    /// `from` is merge-absorbed into `to`.
    pub(crate) fn reassign_leaf(&mut self, from: LeafId, to: LeafId, base: usize) {
        if self.start == from {
            self.start = to;
            self.start_offset += base;
        }
        if self.end == from {
            self.end = to;
            self.end_offset += base;
        }
    }

    /// Redirect anchors past a split point into the new tail leaf. Called
    /// when `leaf` was split at `offset` and `tail` now holds the text from
    /// `offset` on.
    pub(crate) fn reassign_split(&mut self, leaf: LeafId, offset: usize, tail: LeafId) {
        if self.start == leaf && self.start_offset >= offset {
            self.start = tail;
            self.start_offset -= offset;
        }
        if self.end == leaf && self.end_offset >= offset {
            self.end = tail;
            self.end_offset -= offset;
        }
    }
}
