//! Node entity - a block-level structural container.

use crate::dirty::DirtyState;
use crate::id::{LeafId, NodeId};
use crate::queue::QueueSlot;
use crate::style::NodeStyles;

/// Block type of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Paragraph,
    /// Heading with level 1..=6.
    Heading(u8),
    Quote,
    OrderedList,
    UnorderedList,
    ListItem,
    CodeBlock,
}

/// Head of a node's child chain.
///
/// A node's children are homogeneous: either a leaf chain or a node chain,
/// never a mix. Encoding the head as a closed variant makes the mixed case
/// unrepresentable instead of a runtime flag check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FirstChild {
    /// Empty container. Not auto-deleted; removal of empty containers is a
    /// higher-level editorial decision.
    #[default]
    None,
    /// Head of a leaf chain.
    Leaves(LeafId),
    /// Head of a nested node chain.
    Nodes(NodeId),
}

impl FirstChild {
    pub fn is_none(&self) -> bool {
        matches!(self, FirstChild::None)
    }
}

/// A block-level structural unit, member of a doubly-linked sibling chain.
#[derive(Debug, Clone)]
pub struct Node {
    /// Unique, immutable identity.
    pub id: NodeId,
    pub node_type: NodeType,
    /// Block styling. Only meaningful when children are leaves.
    pub styles: Option<NodeStyles>,
    pub first_child: FirstChild,
    pub prev: Option<NodeId>,
    pub next: Option<NodeId>,
    /// Owning node. `None` for top-level nodes, whose conceptual parent is
    /// the document root.
    pub parent: Option<NodeId>,
    /// True until the view layer confirms the first successful mount.
    pub is_new: bool,
    pub(crate) dirty: DirtyState,
    pub(crate) render_slot: Option<QueueSlot>,
}

impl Node {
    pub(crate) fn new(id: NodeId, node_type: NodeType, styles: Option<NodeStyles>) -> Self {
        Self {
            id,
            node_type,
            styles,
            first_child: FirstChild::None,
            prev: None,
            next: None,
            parent: None,
            is_new: true,
            dirty: DirtyState::Clean,
            render_slot: None,
        }
    }

    /// Merge key for adjacent node merging: the style hash, or 0 for unstyled.
    pub fn style_hash(&self) -> u64 {
        self.styles.as_ref().map_or(0, |s| s.style_hash())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_node_is_empty_container() {
        let node = Node::new(NodeId(1), NodeType::Paragraph, None);
        assert!(node.first_child.is_none());
        assert!(node.is_new);
        assert!(node.parent.is_none());
    }

    #[test]
    fn style_hash_defaults_to_zero_when_unstyled() {
        let node = Node::new(NodeId(1), NodeType::Paragraph, None);
        assert_eq!(node.style_hash(), 0);
        let styled = Node::new(
            NodeId(2),
            NodeType::Paragraph,
            Some(NodeStyles::default()),
        );
        assert_ne!(styled.style_hash(), 0);
    }
}
