//! Leaf entity - a run of uniformly styled content.

use crate::dirty::DirtyState;
use crate::id::{LeafId, NodeId};
use crate::queue::QueueSlot;
use crate::style::LeafStyles;

/// Placeholder content for a leaf with no text. A leaf's `text` is never the
/// empty string; an "empty" leaf holds exactly this zero-width marker so the
/// view layer always has a caret anchor to render.
pub const ZERO_LEAF_MARKER: &str = "\u{200B}";

/// The kind of content a leaf carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    /// A run of styled text.
    Text,
    /// An inline image (the source is view-layer state; the core only tracks
    /// the slot in the chain).
    Image,
}

/// A run of content with uniform style, member of a doubly-linked sibling
/// chain under one node.
///
/// Links are stored as ids, not references: the chain owns the linkage, a
/// leaf does not own its neighbors, and `parent` is a weak back-reference
/// resolved through the document arena.
#[derive(Debug, Clone)]
pub struct Leaf {
    /// Unique, immutable identity.
    pub id: LeafId,
    /// Content. Never the empty string; see [`ZERO_LEAF_MARKER`].
    pub text: String,
    /// Inline styling. Replaced wholesale, never mutated in place.
    pub styles: LeafStyles,
    pub kind: LeafKind,
    pub prev: Option<LeafId>,
    pub next: Option<LeafId>,
    /// Owning node. `None` while detached (freshly created or unchained).
    pub parent: Option<NodeId>,
    /// True until the view layer confirms the first successful mount.
    pub is_new: bool,
    pub(crate) dirty: DirtyState,
    pub(crate) render_slot: Option<QueueSlot>,
}

impl Leaf {
    pub(crate) fn new(id: LeafId, text: String, styles: LeafStyles, kind: LeafKind) -> Self {
        debug_assert!(!text.is_empty(), "leaf text must use the zero marker, not \"\"");
        Self {
            id,
            text,
            styles,
            kind,
            prev: None,
            next: None,
            parent: None,
            is_new: true,
            dirty: DirtyState::Clean,
            render_slot: None,
        }
    }

    /// Whether this leaf holds only the empty-content marker.
    pub fn is_zero_leaf(&self) -> bool {
        self.text == ZERO_LEAF_MARKER
    }

    /// Content length in bytes, treating a zero leaf as length 0.
    pub fn visible_len(&self) -> usize {
        if self.is_zero_leaf() {
            0
        } else {
            self.text.len()
        }
    }

    /// Whether this leaf is currently outside any chain.
    pub fn is_detached(&self) -> bool {
        self.parent.is_none() && self.prev.is_none() && self.next.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_leaf_detection() {
        let leaf = Leaf::new(
            LeafId(1),
            ZERO_LEAF_MARKER.to_string(),
            LeafStyles::plain(),
            LeafKind::Text,
        );
        assert!(leaf.is_zero_leaf());
        assert_eq!(leaf.visible_len(), 0);

        let leaf = Leaf::new(
            LeafId(2),
            "Leaf 9".to_string(),
            LeafStyles::plain(),
            LeafKind::Text,
        );
        assert!(!leaf.is_zero_leaf());
        assert_eq!(leaf.visible_len(), 6);
    }

    #[test]
    fn fresh_leaf_is_new_and_detached() {
        let leaf = Leaf::new(
            LeafId(1),
            "x".to_string(),
            LeafStyles::plain(),
            LeafKind::Text,
        );
        assert!(leaf.is_new);
        assert!(leaf.is_detached());
        assert!(leaf.dirty.is_clean());
    }
}
