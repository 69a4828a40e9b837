//! Document model - entity arenas and the singleton root.
//!
//! Leaves and nodes live in id-keyed arenas; links and parent back-references
//! are ids, never references, so the tree can be arbitrarily relinked without
//! lifetime gymnastics. The root is not an entity: it is the document itself,
//! owning the head of the top-level node chain, always "not new" (it
//! pre-exists any content).

use std::collections::HashMap;

use crate::dirty::DirtyState;
use crate::error::{ModelError, Result};
use crate::id::{EntityRef, IdAllocator, LeafId, NodeId};
use crate::leaf::{Leaf, LeafKind};
use crate::node::{FirstChild, Node, NodeType};
use crate::queue::QueueSlot;
use crate::style::{LeafStyles, NodeStyles};

/// The document: arenas of leaves and nodes, the top-level chain head, and
/// the identity allocator. One per editing session; independent sessions do
/// not share any state.
#[derive(Debug, Default)]
pub struct DocumentModel {
    leaves: HashMap<LeafId, Leaf>,
    nodes: HashMap<NodeId, Node>,
    /// Head of the top-level node chain.
    pub(crate) first_node: Option<NodeId>,
    pub(crate) root_dirty: DirtyState,
    pub(crate) root_slot: Option<QueueSlot>,
    ids: IdAllocator,
}

impl DocumentModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all content and restart identity allocation from 1.
    pub fn clear(&mut self) {
        self.leaves.clear();
        self.nodes.clear();
        self.first_node = None;
        self.root_dirty = DirtyState::Clean;
        self.root_slot = None;
        self.ids.reset();
    }

    // ========================================================================
    // Entity creation
    // ========================================================================

    /// Create a detached leaf. Linking is a separate step
    /// (`chain_leaf` / `set_parent_link`).
    pub fn create_leaf(&mut self, text: impl Into<String>, styles: LeafStyles, kind: LeafKind) -> LeafId {
        let id = self.ids.next_leaf_id();
        let text = text.into();
        debug_assert!(!text.is_empty());
        self.leaves.insert(id, Leaf::new(id, text, styles, kind));
        id
    }

    /// Create a detached node.
    pub fn create_node(&mut self, node_type: NodeType, styles: Option<NodeStyles>) -> NodeId {
        let id = self.ids.next_node_id();
        self.nodes.insert(id, Node::new(id, node_type, styles));
        id
    }

    /// Drop a detached leaf from the arena.
    ///
    /// The model never releases automatically: entities detached by merges or
    /// deletions stay in the arena for the session so history can resurrect
    /// them, even after their steps fall off the bounded past. Release is the
    /// caller's decision, normally through
    /// [`EditorSession::release_leaf`](crate::session::EditorSession::release_leaf),
    /// which also drops any pending render-queue entry. Calling this directly
    /// requires the entity to not be queued.
    pub fn release_leaf(&mut self, id: LeafId) {
        self.leaves.remove(&id);
    }

    /// Drop a detached node from the arena. Same lifecycle rules as
    /// [`release_leaf`](Self::release_leaf).
    pub fn release_node(&mut self, id: NodeId) {
        self.nodes.remove(&id);
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn leaf(&self, id: LeafId) -> Result<&Leaf> {
        self.leaves.get(&id).ok_or(ModelError::UnknownLeaf(id))
    }

    pub fn leaf_mut(&mut self, id: LeafId) -> Result<&mut Leaf> {
        self.leaves.get_mut(&id).ok_or(ModelError::UnknownLeaf(id))
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(&id).ok_or(ModelError::UnknownNode(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(&id).ok_or(ModelError::UnknownNode(id))
    }

    /// Head of the top-level node chain.
    pub fn first_node(&self) -> Option<NodeId> {
        self.first_node
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Ids of the leaf chain starting at `head`, following `next` links.
    pub fn leaf_run_from(&self, head: LeafId) -> Result<Vec<LeafId>> {
        let mut run = Vec::new();
        let mut cursor = Some(head);
        while let Some(id) = cursor {
            run.push(id);
            cursor = self.leaf(id)?.next;
        }
        Ok(run)
    }

    /// Ids of the node chain starting at `head`.
    pub fn node_run_from(&self, head: NodeId) -> Result<Vec<NodeId>> {
        let mut run = Vec::new();
        let mut cursor = Some(head);
        while let Some(id) = cursor {
            run.push(id);
            cursor = self.node(id)?.next;
        }
        Ok(run)
    }

    /// Leaf children of `node`, in chain order. Empty if the node holds nodes
    /// or nothing.
    pub fn leaf_children(&self, node: NodeId) -> Result<Vec<LeafId>> {
        match self.node(node)?.first_child {
            FirstChild::Leaves(head) => self.leaf_run_from(head),
            _ => Ok(Vec::new()),
        }
    }

    /// Node children of `node`, in chain order.
    pub fn node_children(&self, node: NodeId) -> Result<Vec<NodeId>> {
        match self.node(node)?.first_child {
            FirstChild::Nodes(head) => self.node_run_from(head),
            _ => Ok(Vec::new()),
        }
    }

    /// Top-level nodes in chain order.
    pub fn top_level_nodes(&self) -> Result<Vec<NodeId>> {
        match self.first_node {
            Some(head) => self.node_run_from(head),
            None => Ok(Vec::new()),
        }
    }

    /// Last leaf of a node's leaf chain, if any.
    pub fn last_leaf_of(&self, node: NodeId) -> Result<Option<LeafId>> {
        Ok(self.leaf_children(node)?.last().copied())
    }

    /// First leaf in document order under `node`, descending through nested
    /// node chains.
    pub fn first_leaf_under(&self, node: NodeId) -> Result<Option<LeafId>> {
        match self.node(node)?.first_child {
            FirstChild::Leaves(head) => Ok(Some(head)),
            FirstChild::Nodes(head) => {
                for child in self.node_run_from(head)? {
                    if let Some(leaf) = self.first_leaf_under(child)? {
                        return Ok(Some(leaf));
                    }
                }
                Ok(None)
            }
            FirstChild::None => Ok(None),
        }
    }

    /// The leaf following `leaf` in document order, crossing node boundaries.
    pub fn next_leaf_in_document(&self, leaf: LeafId) -> Result<Option<LeafId>> {
        if let Some(next) = self.leaf(leaf)?.next {
            return Ok(Some(next));
        }
        let mut node = self.leaf(leaf)?.parent;
        while let Some(id) = node {
            let mut sibling = self.node(id)?.next;
            while let Some(sib) = sibling {
                if let Some(next) = self.first_leaf_under(sib)? {
                    return Ok(Some(next));
                }
                sibling = self.node(sib)?.next;
            }
            node = self.node(id)?.parent;
        }
        Ok(None)
    }

    /// The leaf preceding `leaf` in document order, crossing node boundaries.
    pub fn prev_leaf_in_document(&self, leaf: LeafId) -> Result<Option<LeafId>> {
        if let Some(prev) = self.leaf(leaf)?.prev {
            return Ok(Some(prev));
        }
        let mut node = self.leaf(leaf)?.parent;
        while let Some(id) = node {
            let mut sibling = self.node(id)?.prev;
            while let Some(sib) = sibling {
                if let Some(prev) = self.last_leaf_under(sib)? {
                    return Ok(Some(prev));
                }
                sibling = self.node(sib)?.prev;
            }
            node = self.node(id)?.parent;
        }
        Ok(None)
    }

    fn last_leaf_under(&self, node: NodeId) -> Result<Option<LeafId>> {
        match self.node(node)?.first_child {
            FirstChild::Leaves(head) => Ok(self.leaf_run_from(head)?.last().copied()),
            FirstChild::Nodes(head) => {
                for child in self.node_run_from(head)?.into_iter().rev() {
                    if let Some(leaf) = self.last_leaf_under(child)? {
                        return Ok(Some(leaf));
                    }
                }
                Ok(None)
            }
            FirstChild::None => Ok(None),
        }
    }

    /// Leaves from `start` through `end` in document order (inclusive).
    pub fn leaves_between(&self, start: LeafId, end: LeafId) -> Result<Vec<LeafId>> {
        let mut out = Vec::new();
        let mut cursor = Some(start);
        while let Some(id) = cursor {
            if out.len() > self.leaf_count() {
                return Err(ModelError::BrokenChain {
                    start: start.0,
                    end: end.0,
                });
            }
            out.push(id);
            if id == end {
                return Ok(out);
            }
            cursor = self.next_leaf_in_document(id)?;
        }
        Err(ModelError::InvalidRange)
    }

    /// Concatenated visible text of a node's leaf chain.
    pub fn text_of(&self, node: NodeId) -> Result<String> {
        let mut out = String::new();
        for id in self.leaf_children(node)? {
            let leaf = self.leaf(id)?;
            if !leaf.is_zero_leaf() {
                out.push_str(&leaf.text);
            }
        }
        Ok(out)
    }

    // ========================================================================
    // Render bookkeeping (used by the render queue)
    // ========================================================================

    pub(crate) fn dirty_of(&self, entity: EntityRef) -> Result<DirtyState> {
        Ok(match entity {
            EntityRef::Root => self.root_dirty,
            EntityRef::Node(id) => self.node(id)?.dirty,
            EntityRef::Leaf(id) => self.leaf(id)?.dirty,
        })
    }

    pub(crate) fn set_dirty(&mut self, entity: EntityRef, state: DirtyState) -> Result<()> {
        match entity {
            EntityRef::Root => self.root_dirty = state,
            EntityRef::Node(id) => self.node_mut(id)?.dirty = state,
            EntityRef::Leaf(id) => self.leaf_mut(id)?.dirty = state,
        }
        Ok(())
    }

    pub(crate) fn slot_of(&self, entity: EntityRef) -> Result<Option<QueueSlot>> {
        Ok(match entity {
            EntityRef::Root => self.root_slot,
            EntityRef::Node(id) => self.node(id)?.render_slot,
            EntityRef::Leaf(id) => self.leaf(id)?.render_slot,
        })
    }

    pub(crate) fn set_slot(&mut self, entity: EntityRef, slot: Option<QueueSlot>) -> Result<()> {
        match entity {
            EntityRef::Root => self.root_slot = slot,
            EntityRef::Node(id) => self.node_mut(id)?.render_slot = slot,
            EntityRef::Leaf(id) => self.leaf_mut(id)?.render_slot = slot,
        }
        Ok(())
    }

    // ========================================================================
    // Integrity checks (exercised by the test suite)
    // ========================================================================

    /// Verify link symmetry and acyclicity for every chain in the document.
    pub fn check_chain_integrity(&self) -> Result<()> {
        for leaf in self.leaves.values() {
            if let Some(next) = leaf.next {
                let neighbor = self.leaf(next)?;
                if neighbor.prev != Some(leaf.id) || next == leaf.id {
                    return Err(ModelError::BrokenChain {
                        start: leaf.id.0,
                        end: next.0,
                    });
                }
            }
            if let Some(prev) = leaf.prev {
                let neighbor = self.leaf(prev)?;
                if neighbor.next != Some(leaf.id) {
                    return Err(ModelError::BrokenChain {
                        start: prev.0,
                        end: leaf.id.0,
                    });
                }
            }
        }
        for node in self.nodes.values() {
            if let Some(next) = node.next {
                let neighbor = self.node(next)?;
                if neighbor.prev != Some(node.id) || next == node.id {
                    return Err(ModelError::BrokenChain {
                        start: node.id.0,
                        end: next.0,
                    });
                }
            }
        }
        // Acyclicity: walking any attached chain must terminate within the
        // arena's population.
        if let Some(head) = self.first_node {
            let run = self.bounded_node_walk(head)?;
            let _ = run;
        }
        Ok(())
    }

    fn bounded_node_walk(&self, head: NodeId) -> Result<Vec<NodeId>> {
        let mut run = Vec::new();
        let mut cursor = Some(head);
        while let Some(id) = cursor {
            if run.len() > self.nodes.len() {
                return Err(ModelError::BrokenChain {
                    start: head.0,
                    end: id.0,
                });
            }
            run.push(id);
            cursor = self.node(id)?.next;
        }
        Ok(run)
    }

    /// Verify that every attached leaf/node is reachable from its parent's
    /// `first_child` and that nothing unreachable claims that parent.
    pub fn check_parent_homogeneity(&self) -> Result<()> {
        for node in self.nodes.values() {
            match node.first_child {
                FirstChild::Leaves(head) => {
                    let run = self.leaf_run_from(head)?;
                    for id in &run {
                        if self.leaf(*id)?.parent != Some(node.id) {
                            return Err(ModelError::MixedChildren);
                        }
                    }
                    // No outside leaf may claim this parent.
                    for leaf in self.leaves.values() {
                        if leaf.parent == Some(node.id) && !run.contains(&leaf.id) {
                            return Err(ModelError::MixedChildren);
                        }
                    }
                }
                FirstChild::Nodes(head) => {
                    let run = self.node_run_from(head)?;
                    for id in &run {
                        if self.node(*id)?.parent != Some(node.id) {
                            return Err(ModelError::MixedChildren);
                        }
                    }
                    for child in self.nodes.values() {
                        if child.parent == Some(node.id) && !run.contains(&child.id) {
                            return Err(ModelError::MixedChildren);
                        }
                    }
                }
                FirstChild::None => {
                    for leaf in self.leaves.values() {
                        if leaf.parent == Some(node.id) {
                            return Err(ModelError::MixedChildren);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_look_up() {
        let mut doc = DocumentModel::new();
        let leaf = doc.create_leaf("hello", LeafStyles::plain(), LeafKind::Text);
        let node = doc.create_node(NodeType::Paragraph, None);
        assert_eq!(doc.leaf(leaf).unwrap().text, "hello");
        assert_eq!(doc.node(node).unwrap().node_type, NodeType::Paragraph);
        assert!(doc.leaf(LeafId(999)).is_err());
    }

    #[test]
    fn clear_resets_identities() {
        let mut doc = DocumentModel::new();
        let first = doc.create_leaf("a", LeafStyles::plain(), LeafKind::Text);
        doc.clear();
        let again = doc.create_leaf("b", LeafStyles::plain(), LeafKind::Text);
        assert_eq!(first, again);
        assert_eq!(doc.leaf_count(), 1);
    }

    #[test]
    fn empty_document_passes_integrity() {
        let doc = DocumentModel::new();
        assert!(doc.check_chain_integrity().is_ok());
        assert!(doc.check_parent_homogeneity().is_ok());
    }
}
