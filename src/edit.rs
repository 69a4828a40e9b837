//! Range-based edit operations.
//!
//! These are the algorithms a front end drives from user input: apply an
//! inline style across a range, insert or delete text, retype blocks. Each
//! operation wraps its mutations in exactly one history step, keeps the
//! caller's range anchors valid across the splits and merges it performs, and
//! returns the adjusted range where the selection should land.

use tracing::debug;

use crate::error::{ModelError, Result};
use crate::id::LeafId;
use crate::mutation::SplitPoint;
use crate::node::NodeType;
use crate::selection::TextRange;
use crate::session::EditorSession;
use crate::style::LeafStyles;

/// A partial style change: `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct LeafStylePatch {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub strikethrough: Option<bool>,
    /// `Some(None)` clears an existing link.
    pub link: Option<Option<String>>,
}

impl LeafStylePatch {
    pub fn bold(on: bool) -> Self {
        Self {
            bold: Some(on),
            ..Self::default()
        }
    }

    pub fn italic(on: bool) -> Self {
        Self {
            italic: Some(on),
            ..Self::default()
        }
    }

    /// Apply the patch to an existing style set, producing the new set.
    pub fn apply(&self, styles: &LeafStyles) -> LeafStyles {
        let mut out = styles.clone();
        if let Some(on) = self.bold {
            out = out.with_bold(on);
        }
        if let Some(on) = self.italic {
            out = out.with_italic(on);
        }
        if let Some(on) = self.underline {
            out = out.with_underline(on);
        }
        if let Some(on) = self.strikethrough {
            out = out.with_strikethrough(on);
        }
        if let Some(link) = &self.link {
            out = out.with_link(link.clone());
        }
        out
    }
}

impl EditorSession {
    // ========================================================================
    // Inline styles
    // ========================================================================

    /// Apply `patch` to every leaf covered by `range`, splitting boundary
    /// leaves so the style change covers exactly the selected text, then
    /// merging any neighbors the change made merge-eligible. One history
    /// step; returns the adjusted range.
    pub fn apply_leaf_styles(
        &mut self,
        range: TextRange,
        patch: &LeafStylePatch,
    ) -> Result<TextRange> {
        let mut range = self.snap_to_content(range)?;
        if range.is_collapsed() {
            return Ok(range);
        }
        self.history.begin_step();
        let result = self.apply_leaf_styles_inner(&mut range, patch);
        match result {
            Ok(()) => {
                self.history.commit_step();
                Ok(range)
            }
            Err(err) => {
                self.history.abort_step();
                Err(err)
            }
        }
    }

    fn apply_leaf_styles_inner(
        &mut self,
        range: &mut TextRange,
        patch: &LeafStylePatch,
    ) -> Result<()> {
        // Split the start boundary so the first covered leaf starts exactly
        // at the range start.
        if range.start_offset > 0 && range.start_offset < self.doc.leaf(range.start)?.visible_len()
        {
            let split_at = range.start_offset;
            let leaf = range.start;
            let tail = self.split_leaf(leaf, split_at)?;
            range.reassign_split(leaf, split_at, tail);
        }
        // Split the end boundary; the head half stays covered, so the end
        // anchor (which equals the head's new length) stays put.
        if range.end_offset > 0 && range.end_offset < self.doc.leaf(range.end)?.visible_len() {
            self.split_leaf(range.end, range.end_offset)?;
        }

        let covered = self.doc.leaves_between(range.start, range.end)?;
        for leaf in &covered {
            let styles = self.doc.leaf(*leaf)?.styles.clone();
            let patched = patch.apply(&styles);
            if patched.style_hash() != styles.style_hash() {
                self.set_leaf_styles(*leaf, patched)?;
            }
        }
        debug!(leaves = covered.len(), "applied leaf styles");

        // Merge pass over every node the styled run touches.
        let mut parents = Vec::new();
        for leaf in &covered {
            if let Some(parent) = self.doc.leaf(*leaf)?.parent {
                if !parents.contains(&parent) {
                    parents.push(parent);
                }
            }
        }
        for parent in parents {
            self.merge_eligible_children(parent, range)?;
        }
        Ok(())
    }

    /// Merge every adjacent merge-eligible pair in `node`'s leaf chain,
    /// keeping `range` anchors valid.
    fn merge_eligible_children(
        &mut self,
        node: crate::id::NodeId,
        range: &mut TextRange,
    ) -> Result<()> {
        let mut cursor = self.doc.leaf_children(node)?.first().copied();
        while let Some(a) = cursor {
            if let Some(b) = self.doc.leaf(a)?.next {
                if self.leaves_merge_eligible(a, b)? {
                    self.merge_leaves(a, b, Some(range))?;
                    continue;
                }
            }
            cursor = self.doc.leaf(a)?.next;
        }
        Ok(())
    }

    // ========================================================================
    // Text editing
    // ========================================================================

    /// Insert `text` into `leaf` at byte `offset`. A zero leaf swallows the
    /// marker: inserting into it replaces the placeholder entirely. One
    /// history step; returns the caret after the inserted text.
    pub fn insert_text(&mut self, leaf: LeafId, offset: usize, text: &str) -> Result<TextRange> {
        if text.is_empty() {
            return Ok(TextRange::collapsed(leaf, offset));
        }
        self.history.begin_step();
        let result = self.insert_text_inner(leaf, offset, text);
        match result {
            Ok(caret) => {
                self.history.commit_step();
                Ok(caret)
            }
            Err(err) => {
                self.history.abort_step();
                Err(err)
            }
        }
    }

    fn insert_text_inner(&mut self, leaf: LeafId, offset: usize, text: &str) -> Result<TextRange> {
        let entry = self.doc.leaf(leaf)?;
        if entry.is_zero_leaf() {
            self.set_leaf_text(leaf, text)?;
            return Ok(TextRange::collapsed(leaf, text.len()));
        }
        let old = entry.text.clone();
        if offset > old.len() || !old.is_char_boundary(offset) {
            return Err(ModelError::OffsetOutOfBounds {
                offset,
                len: old.len(),
            });
        }
        let mut new = String::with_capacity(old.len() + text.len());
        new.push_str(&old[..offset]);
        new.push_str(text);
        new.push_str(&old[offset..]);
        self.set_leaf_text(leaf, new)?;
        Ok(TextRange::collapsed(leaf, offset + text.len()))
    }

    /// Delete the content covered by `range`. Boundary leaves are trimmed
    /// (down to the zero marker if emptied), fully covered interior leaves
    /// are unchained, and the boundary leaves are merged afterwards when
    /// eligible. One history step; returns the collapsed caret.
    pub fn delete_range(&mut self, range: TextRange) -> Result<TextRange> {
        if range.is_collapsed() {
            return Ok(range);
        }
        self.history.begin_step();
        let result = self.delete_range_inner(range);
        match result {
            Ok(caret) => {
                self.history.commit_step();
                Ok(caret)
            }
            Err(err) => {
                self.history.abort_step();
                Err(err)
            }
        }
    }

    fn delete_range_inner(&mut self, range: TextRange) -> Result<TextRange> {
        if range.start == range.end {
            let text = self.doc.leaf(range.start)?.text.clone();
            if range.end_offset > text.len()
                || !text.is_char_boundary(range.start_offset)
                || !text.is_char_boundary(range.end_offset)
            {
                return Err(ModelError::OffsetOutOfBounds {
                    offset: range.end_offset,
                    len: text.len(),
                });
            }
            let mut kept = String::new();
            kept.push_str(&text[..range.start_offset]);
            kept.push_str(&text[range.end_offset..]);
            // raw text setter turns "" into the zero marker
            self.set_leaf_text(range.start, kept)?;
            return Ok(TextRange::collapsed(range.start, range.start_offset));
        }

        let covered = self.doc.leaves_between(range.start, range.end)?;
        // Trim the boundaries.
        let start_text = self.doc.leaf(range.start)?.text.clone();
        if range.start_offset > start_text.len() || !start_text.is_char_boundary(range.start_offset)
        {
            return Err(ModelError::OffsetOutOfBounds {
                offset: range.start_offset,
                len: start_text.len(),
            });
        }
        self.set_leaf_text(range.start, start_text[..range.start_offset].to_string())?;
        let end_text = self.doc.leaf(range.end)?.text.clone();
        if range.end_offset > end_text.len() || !end_text.is_char_boundary(range.end_offset) {
            return Err(ModelError::OffsetOutOfBounds {
                offset: range.end_offset,
                len: end_text.len(),
            });
        }
        self.set_leaf_text(range.end, end_text[range.end_offset..].to_string())?;
        // Drop the fully covered interior.
        for leaf in &covered[1..covered.len() - 1] {
            self.unchain_leaf(*leaf)?;
        }

        let mut caret = TextRange::collapsed(range.start, range.start_offset);
        // Join the boundary leaves when they ended up adjacent and eligible.
        if self.doc.leaf(range.start)?.next == Some(range.end)
            && self.leaves_merge_eligible(range.start, range.end)?
        {
            self.merge_leaves(range.start, range.end, Some(&mut caret))?;
        }
        debug!(removed = covered.len().saturating_sub(2), "deleted range");
        Ok(caret)
    }

    // ========================================================================
    // Block types
    // ========================================================================

    /// Change the block type of every node whose leaves intersect `range`,
    /// shattering partially covered boundary nodes so the change applies
    /// only to the covered part. Leaf-granular: a leaf partially covered by
    /// the range counts as covered. One history step.
    pub fn set_block_type(&mut self, range: TextRange, node_type: NodeType) -> Result<()> {
        let range = self.snap_to_content(range)?;
        self.history.begin_step();
        let result = self.set_block_type_inner(range, node_type);
        match result {
            Ok(()) => {
                self.history.commit_step();
                Ok(())
            }
            Err(err) => {
                self.history.abort_step();
                Err(err)
            }
        }
    }

    fn set_block_type_inner(&mut self, range: TextRange, node_type: NodeType) -> Result<()> {
        let covered = self.doc.leaves_between(range.start, range.end)?;
        let mut nodes = Vec::new();
        for leaf in &covered {
            let parent = self.doc.leaf(*leaf)?.parent.ok_or(ModelError::Detached)?;
            if !nodes.contains(&parent) {
                nodes.push(parent);
            }
        }

        // Shatter the first node if the range starts mid-chain: the head
        // (uncovered) part keeps the old type, the tail sibling gets retyped.
        if let Some(first) = nodes.first().copied() {
            let chain = self.doc.leaf_children(first)?;
            if chain.first() != Some(&range.start) {
                let sibling = self.shatter(first, SplitPoint::AtLeaf(range.start))?;
                nodes[0] = sibling;
            }
        }
        // Shatter the last node if the range ends mid-chain: everything after
        // the end leaf moves to an untouched tail sibling.
        if let Some(last) = nodes.last().copied() {
            if let Some(after_end) = self.doc.leaf(range.end)?.next {
                if self.doc.leaf(after_end)?.parent == Some(last) {
                    self.shatter(last, SplitPoint::AtLeaf(after_end))?;
                }
            }
        }

        for node in &nodes {
            if self.doc.node(*node)?.node_type != node_type {
                self.set_node_type(*node, node_type)?;
            }
        }
        debug!(nodes = nodes.len(), "set block type");
        Ok(())
    }

    // ========================================================================
    // Range normalization
    // ========================================================================

    /// Nudge range edges off leaf boundaries: a start anchor sitting at the
    /// very end of a leaf moves to the next leaf's offset 0, an end anchor at
    /// offset 0 moves to the previous leaf's end. The covered text is
    /// unchanged; the anchors just name it canonically.
    fn snap_to_content(&self, mut range: TextRange) -> Result<TextRange> {
        if range.is_collapsed() {
            return Ok(range);
        }
        if range.start_offset >= self.doc.leaf(range.start)?.visible_len() {
            if let Some(next) = self.doc.next_leaf_in_document(range.start)? {
                range.start = next;
                range.start_offset = 0;
            }
        }
        if range.end_offset == 0 {
            if let Some(prev) = self.doc.prev_leaf_in_document(range.end)? {
                range.end = prev;
                range.end_offset = self.doc.leaf(prev)?.visible_len();
            }
        }
        Ok(range)
    }
}
