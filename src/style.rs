//! Style value objects for leaves and nodes.
//!
//! Styles are immutable by convention: every constructor and `with_*` method
//! produces a fresh value with its hash recomputed. The hash is the merge key:
//! two adjacent leaves (or two adjacent nodes holding leaf chains) can merge
//! only when their style hashes and types are identical, so the hash must be a
//! deterministic function of every styling field.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Inline text styling attached to a leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafStyles {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    /// Link target, if this run is a hyperlink.
    pub link: Option<String>,
    hash: u64,
}

impl LeafStyles {
    /// Plain, unstyled text.
    pub fn plain() -> Self {
        Self::build(false, false, false, false, None)
    }

    fn build(
        bold: bool,
        italic: bool,
        underline: bool,
        strikethrough: bool,
        link: Option<String>,
    ) -> Self {
        let mut styles = Self {
            bold,
            italic,
            underline,
            strikethrough,
            link,
            hash: 0,
        };
        styles.hash = styles.compute_hash();
        styles
    }

    /// Copy with bold toggled to `on`.
    #[must_use]
    pub fn with_bold(&self, on: bool) -> Self {
        Self::build(
            on,
            self.italic,
            self.underline,
            self.strikethrough,
            self.link.clone(),
        )
    }

    /// Copy with italic toggled to `on`.
    #[must_use]
    pub fn with_italic(&self, on: bool) -> Self {
        Self::build(
            self.bold,
            on,
            self.underline,
            self.strikethrough,
            self.link.clone(),
        )
    }

    /// Copy with underline toggled to `on`.
    #[must_use]
    pub fn with_underline(&self, on: bool) -> Self {
        Self::build(
            self.bold,
            self.italic,
            on,
            self.strikethrough,
            self.link.clone(),
        )
    }

    /// Copy with strikethrough toggled to `on`.
    #[must_use]
    pub fn with_strikethrough(&self, on: bool) -> Self {
        Self::build(
            self.bold,
            self.italic,
            self.underline,
            on,
            self.link.clone(),
        )
    }

    /// Copy with the link target replaced.
    #[must_use]
    pub fn with_link(&self, link: Option<String>) -> Self {
        Self::build(
            self.bold,
            self.italic,
            self.underline,
            self.strikethrough,
            link,
        )
    }

    /// The merge key: deterministic over all styling fields.
    pub fn style_hash(&self) -> u64 {
        self.hash
    }

    fn compute_hash(&self) -> u64 {
        let mut h = DefaultHasher::new();
        self.bold.hash(&mut h);
        self.italic.hash(&mut h);
        self.underline.hash(&mut h);
        self.strikethrough.hash(&mut h);
        self.link.hash(&mut h);
        h.finish()
    }
}

impl Default for LeafStyles {
    fn default() -> Self {
        Self::plain()
    }
}

/// Horizontal alignment of a block's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

/// Block-level styling attached to a node. Only meaningful for nodes whose
/// children are leaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStyles {
    pub alignment: Alignment,
    /// Nesting depth for indented blocks (0 = flush).
    pub indent: u8,
    hash: u64,
}

impl NodeStyles {
    pub fn new(alignment: Alignment, indent: u8) -> Self {
        let mut styles = Self {
            alignment,
            indent,
            hash: 0,
        };
        styles.hash = styles.compute_hash();
        styles
    }

    /// Copy with a different alignment.
    #[must_use]
    pub fn with_alignment(&self, alignment: Alignment) -> Self {
        Self::new(alignment, self.indent)
    }

    /// Copy with a different indent depth.
    #[must_use]
    pub fn with_indent(&self, indent: u8) -> Self {
        Self::new(self.alignment, indent)
    }

    /// The merge key: deterministic over all styling fields.
    pub fn style_hash(&self) -> u64 {
        self.hash
    }

    fn compute_hash(&self) -> u64 {
        let mut h = DefaultHasher::new();
        self.alignment.hash(&mut h);
        self.indent.hash(&mut h);
        h.finish()
    }
}

impl Default for NodeStyles {
    fn default() -> Self {
        Self::new(Alignment::Left, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_fields_equal_hash() {
        let a = LeafStyles::plain().with_bold(true);
        let b = LeafStyles::plain().with_bold(true);
        assert_eq!(a.style_hash(), b.style_hash());
    }

    #[test]
    fn different_fields_different_hash() {
        let plain = LeafStyles::plain();
        let bold = plain.with_bold(true);
        assert_ne!(plain.style_hash(), bold.style_hash());
    }

    #[test]
    fn toggle_round_trip_restores_hash() {
        let plain = LeafStyles::plain();
        let back = plain.with_italic(true).with_italic(false);
        assert_eq!(plain.style_hash(), back.style_hash());
    }

    #[test]
    fn node_styles_hash_tracks_fields() {
        let a = NodeStyles::default();
        let b = a.with_indent(1);
        assert_ne!(a.style_hash(), b.style_hash());
        assert_eq!(a.style_hash(), b.with_indent(0).style_hash());
    }
}
