//! Entity identifiers and the identity allocator.
//!
//! Every leaf and node gets a globally unique, monotonically increasing `u64`
//! id from one shared counter. Ids are never reused within a session and are
//! never persisted: reloading a document regenerates identities from 1.

use std::fmt;

/// Unique identifier for a leaf (a styled text run or inline object).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeafId(pub u64);

/// Unique identifier for a node (a block-level container).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for LeafId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "leaf#{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// A reference to any renderable entity in the tree.
///
/// Used as the key for the render queue and the view-handle registry. The
/// document root is addressable so that top-level chain changes can notify
/// the root's child-collection view like any other parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    /// The singleton document root (owns the top-level node chain).
    Root,
    /// A block-level node.
    Node(NodeId),
    /// A content leaf.
    Leaf(LeafId),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Root => write!(f, "root"),
            EntityRef::Node(id) => write!(f, "{}", id),
            EntityRef::Leaf(id) => write!(f, "{}", id),
        }
    }
}

/// Issues unique ids for every leaf and node in a document session.
///
/// One counter is shared across both entity kinds, so a leaf and a node never
/// collide even though they live in separate arenas. Owned by
/// [`DocumentModel`](crate::doc::DocumentModel) rather than being process
/// state, so independent sessions can coexist in one process.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    /// Create an allocator starting at id 1 (0 is reserved as "never issued").
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Issue the next leaf id.
    pub fn next_leaf_id(&mut self) -> LeafId {
        let id = LeafId(self.next);
        self.next += 1;
        id
    }

    /// Issue the next node id.
    pub fn next_node_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    /// Reset the counter. Only valid when the arenas are also cleared.
    pub fn reset(&mut self) {
        self.next = 1;
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_across_kinds() {
        let mut alloc = IdAllocator::new();
        let l1 = alloc.next_leaf_id();
        let n1 = alloc.next_node_id();
        let l2 = alloc.next_leaf_id();
        assert_eq!(l1, LeafId(1));
        assert_eq!(n1, NodeId(2));
        assert_eq!(l2, LeafId(3));
    }

    #[test]
    fn reset_restarts_from_one() {
        let mut alloc = IdAllocator::new();
        alloc.next_leaf_id();
        alloc.next_node_id();
        alloc.reset();
        assert_eq!(alloc.next_leaf_id(), LeafId(1));
    }
}
