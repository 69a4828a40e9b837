//! Tree mutation engine - all structural changes to the leaf/node tree.
//!
//! Every public operation here does three things in lockstep: it relinks the
//! chain(s) while preserving the invariants (link symmetry, parent
//! homogeneity, contiguity), it marks the affected parent or entity dirty at
//! the correct granularity, and it feeds the active history step the
//! descriptor that reverses it.
//!
//! The private `raw_*` layer performs the work and *returns* the inverse op;
//! the public layer records it. Undo/redo replays descriptors through the
//! same raw layer, which is what turns an applied inverse into its own
//! inverse for the mirror step.

use tracing::debug;

use crate::chain::{LeafChain, LeafNullLink, NodeChain, NodeNullLink, PhantomChain, PhantomNode};
use crate::dirty::DirtyMark;
use crate::error::{ModelError, Result};
use crate::history::{ChildRef, RevOp};
use crate::id::{EntityRef, LeafId, NodeId};
use crate::leaf::ZERO_LEAF_MARKER;
use crate::node::{FirstChild, NodeType};
use crate::selection::TextRange;
use crate::session::EditorSession;
use crate::style::{LeafStyles, NodeStyles};

/// Where a shattered node's child chain splits: the named child becomes the
/// first child of the new tail sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitPoint {
    AtLeaf(LeafId),
    AtNode(NodeId),
}

impl EditorSession {
    // ========================================================================
    // Dirty marking helpers
    // ========================================================================

    fn mark_children_of(&mut self, parent: Option<NodeId>) -> Result<()> {
        let entity = match parent {
            Some(id) => EntityRef::Node(id),
            None => EntityRef::Root,
        };
        self.queue.mark(&mut self.doc, entity, DirtyMark::Children)
    }

    fn mark_self(&mut self, entity: EntityRef) -> Result<()> {
        self.queue.mark(&mut self.doc, entity, DirtyMark::SelfOnly)
    }

    // ========================================================================
    // Attribute operations
    // ========================================================================

    /// Replace a leaf's text. `text` must not be empty; an empty edit sets
    /// the zero marker instead.
    pub fn set_leaf_text(&mut self, leaf: LeafId, text: impl Into<String>) -> Result<()> {
        let rev = self.raw_set_leaf_text(leaf, text.into())?;
        self.history.record(rev);
        Ok(())
    }

    fn raw_set_leaf_text(&mut self, leaf: LeafId, text: String) -> Result<RevOp> {
        let text = if text.is_empty() {
            ZERO_LEAF_MARKER.to_string()
        } else {
            text
        };
        let old = std::mem::replace(&mut self.leaf_entry(leaf)?.text, text);
        self.mark_self(EntityRef::Leaf(leaf))?;
        Ok(RevOp::SetLeafText { leaf, text: old })
    }

    /// Replace a leaf's style set.
    pub fn set_leaf_styles(&mut self, leaf: LeafId, styles: LeafStyles) -> Result<()> {
        let rev = self.raw_set_leaf_styles(leaf, styles)?;
        self.history.record(rev);
        Ok(())
    }

    fn raw_set_leaf_styles(&mut self, leaf: LeafId, styles: LeafStyles) -> Result<RevOp> {
        let old = std::mem::replace(&mut self.leaf_entry(leaf)?.styles, styles);
        self.mark_self(EntityRef::Leaf(leaf))?;
        Ok(RevOp::SetLeafStyles { leaf, styles: old })
    }

    /// Replace a node's style set.
    pub fn set_node_styles(&mut self, node: NodeId, styles: Option<NodeStyles>) -> Result<()> {
        let rev = self.raw_set_node_styles(node, styles)?;
        self.history.record(rev);
        Ok(())
    }

    fn raw_set_node_styles(&mut self, node: NodeId, styles: Option<NodeStyles>) -> Result<RevOp> {
        let old = std::mem::replace(&mut self.doc.node_mut(node)?.styles, styles);
        self.mark_self(EntityRef::Node(node))?;
        Ok(RevOp::SetNodeStyles { node, styles: old })
    }

    /// Change a node's block type.
    pub fn set_node_type(&mut self, node: NodeId, node_type: NodeType) -> Result<()> {
        let rev = self.raw_set_node_type(node, node_type)?;
        self.history.record(rev);
        Ok(())
    }

    fn raw_set_node_type(&mut self, node: NodeId, node_type: NodeType) -> Result<RevOp> {
        let old = std::mem::replace(&mut self.doc.node_mut(node)?.node_type, node_type);
        self.mark_self(EntityRef::Node(node))?;
        Ok(RevOp::SetNodeType {
            node,
            node_type: old,
        })
    }

    fn leaf_entry(&mut self, leaf: LeafId) -> Result<&mut crate::leaf::Leaf> {
        self.doc.leaf_mut(leaf)
    }

    // ========================================================================
    // setParentLink
    // ========================================================================

    /// Attach a detached chain head (and its whole chain) as `parent`'s first
    /// child, or as the document's top-level chain when `parent` is `None`.
    ///
    /// Preconditions: the head is detached (`parent == None`, no `prev`) and
    /// the target has no children. Callers unchain first otherwise.
    pub fn set_parent_link(&mut self, child: ChildRef, parent: Option<NodeId>) -> Result<()> {
        let rev = self.raw_attach_first_child(child, parent)?;
        self.history.record(rev);
        Ok(())
    }

    fn raw_attach_first_child(&mut self, child: ChildRef, parent: Option<NodeId>) -> Result<RevOp> {
        match child {
            ChildRef::Leaf(head) => {
                let Some(parent_id) = parent else {
                    return Err(ModelError::LeafAtRoot);
                };
                if self.doc.leaf(head)?.parent.is_some() || self.doc.leaf(head)?.prev.is_some() {
                    return Err(ModelError::AlreadyAttached);
                }
                if !self.doc.node(parent_id)?.first_child.is_none() {
                    return Err(ModelError::ParentOccupied);
                }
                let run = self.doc.leaf_run_from(head)?;
                for id in &run {
                    self.doc.leaf_mut(*id)?.parent = Some(parent_id);
                }
                self.doc.node_mut(parent_id)?.first_child = FirstChild::Leaves(head);
                debug!(%head, parent = %parent_id, members = run.len(), "set parent link (leaves)");
            }
            ChildRef::Node(head) => {
                if self.doc.node(head)?.parent.is_some() || self.doc.node(head)?.prev.is_some() {
                    return Err(ModelError::AlreadyAttached);
                }
                match parent {
                    Some(parent_id) => {
                        if !self.doc.node(parent_id)?.first_child.is_none() {
                            return Err(ModelError::ParentOccupied);
                        }
                        let run = self.doc.node_run_from(head)?;
                        if run.contains(&parent_id) {
                            return Err(ModelError::SelfReferentialLink);
                        }
                        for id in &run {
                            self.doc.node_mut(*id)?.parent = Some(parent_id);
                        }
                        self.doc.node_mut(parent_id)?.first_child = FirstChild::Nodes(head);
                        debug!(%head, parent = %parent_id, "set parent link (nodes)");
                    }
                    None => {
                        if self.doc.first_node.is_some() {
                            return Err(ModelError::ParentOccupied);
                        }
                        // Top-level nodes keep parent == None.
                        self.doc.first_node = Some(head);
                        debug!(%head, "set parent link (top level)");
                    }
                }
            }
        }
        self.mark_children_of(parent)?;
        Ok(RevOp::DetachParentLink { parent })
    }

    fn raw_detach_first_child(&mut self, parent: Option<NodeId>) -> Result<RevOp> {
        let child = match parent {
            Some(parent_id) => match self.doc.node(parent_id)?.first_child {
                FirstChild::None => return Err(ModelError::StaleDescriptor),
                FirstChild::Leaves(head) => {
                    let run = self.doc.leaf_run_from(head)?;
                    for id in &run {
                        self.doc.leaf_mut(*id)?.parent = None;
                    }
                    self.doc.node_mut(parent_id)?.first_child = FirstChild::None;
                    ChildRef::Leaf(head)
                }
                FirstChild::Nodes(head) => {
                    let run = self.doc.node_run_from(head)?;
                    for id in &run {
                        self.doc.node_mut(*id)?.parent = None;
                    }
                    self.doc.node_mut(parent_id)?.first_child = FirstChild::None;
                    ChildRef::Node(head)
                }
            },
            None => {
                let Some(head) = self.doc.first_node else {
                    return Err(ModelError::StaleDescriptor);
                };
                self.doc.first_node = None;
                ChildRef::Node(head)
            }
        };
        self.mark_children_of(parent)?;
        Ok(RevOp::AttachParentLink { child, parent })
    }

    // ========================================================================
    // chain
    // ========================================================================

    /// Insert a detached leaf immediately after an attached one, inheriting
    /// its parent.
    pub fn chain_leaf(&mut self, new_leaf: LeafId, after: LeafId) -> Result<()> {
        let rev = self.raw_chain_leaf(new_leaf, after)?;
        self.history.record(rev);
        Ok(())
    }

    fn raw_chain_leaf(&mut self, new_leaf: LeafId, after: LeafId) -> Result<RevOp> {
        if new_leaf == after {
            return Err(ModelError::SelfReferentialLink);
        }
        if !self.doc.leaf(new_leaf)?.is_detached() {
            return Err(ModelError::AlreadyAttached);
        }
        let Some(parent) = self.doc.leaf(after)?.parent else {
            return Err(ModelError::Detached);
        };
        let old_next = self.doc.leaf(after)?.next;
        {
            let leaf = self.doc.leaf_mut(new_leaf)?;
            leaf.prev = Some(after);
            leaf.next = old_next;
            leaf.parent = Some(parent);
        }
        self.doc.leaf_mut(after)?.next = Some(new_leaf);
        if let Some(next) = old_next {
            self.doc.leaf_mut(next)?.prev = Some(new_leaf);
        }
        self.mark_children_of(Some(parent))?;
        debug!(leaf = %new_leaf, %after, "chained leaf");
        Ok(RevOp::UnchainLeaves {
            start: new_leaf,
            end: new_leaf,
        })
    }

    /// Insert a detached node immediately after an attached (or top-level)
    /// one, inheriting its parent.
    pub fn chain_node(&mut self, new_node: NodeId, after: NodeId) -> Result<()> {
        let rev = self.raw_chain_node(new_node, after)?;
        self.history.record(rev);
        Ok(())
    }

    fn raw_chain_node(&mut self, new_node: NodeId, after: NodeId) -> Result<RevOp> {
        if new_node == after {
            return Err(ModelError::SelfReferentialLink);
        }
        {
            let node = self.doc.node(new_node)?;
            if node.parent.is_some() || node.prev.is_some() || node.next.is_some() {
                return Err(ModelError::AlreadyAttached);
            }
        }
        let parent = self.doc.node(after)?.parent;
        // `after` must itself be attached: either under a node or in the
        // top-level chain.
        if parent.is_none() && !self.node_is_top_level(after)? {
            return Err(ModelError::Detached);
        }
        let old_next = self.doc.node(after)?.next;
        {
            let node = self.doc.node_mut(new_node)?;
            node.prev = Some(after);
            node.next = old_next;
            node.parent = parent;
        }
        self.doc.node_mut(after)?.next = Some(new_node);
        if let Some(next) = old_next {
            self.doc.node_mut(next)?.prev = Some(new_node);
        }
        self.mark_children_of(parent)?;
        debug!(node = %new_node, %after, "chained node");
        Ok(RevOp::UnchainNodes {
            start: new_node,
            end: new_node,
        })
    }

    fn node_is_top_level(&self, node: NodeId) -> Result<bool> {
        let Some(head) = self.doc.first_node else {
            return Ok(false);
        };
        Ok(self.doc.node_run_from(head)?.contains(&node))
    }

    /// Reject a destination parent that is a run member or sits anywhere in a
    /// member's subtree: attaching there would make a node its own ancestor.
    fn ensure_destination_outside_run(
        &self,
        members: &[NodeId],
        dest_parent: Option<NodeId>,
    ) -> Result<()> {
        let mut cursor = dest_parent;
        let mut hops = 0usize;
        while let Some(id) = cursor {
            if members.contains(&id) {
                return Err(ModelError::SelfReferentialLink);
            }
            hops += 1;
            if hops > self.doc.node_count() {
                return Err(ModelError::BrokenChain {
                    start: id.0,
                    end: id.0,
                });
            }
            cursor = self.doc.node(id)?.parent;
        }
        Ok(())
    }

    // ========================================================================
    // unchain
    // ========================================================================

    /// Detach a single leaf, relinking its neighbors to each other. Returns
    /// the descriptor recording the broken linkage.
    pub fn unchain_leaf(&mut self, leaf: LeafId) -> Result<LeafChain> {
        self.unchain_leaf_run(leaf, leaf)
    }

    /// Detach the contiguous run `[start, end]` of leaves.
    pub fn unchain_leaf_run(&mut self, start: LeafId, end: LeafId) -> Result<LeafChain> {
        let chain = self.raw_unchain_leaf_run(start, end)?;
        self.history.record(RevOp::RechainLeaves(chain));
        Ok(chain)
    }

    fn raw_unchain_leaf_run(&mut self, start: LeafId, end: LeafId) -> Result<LeafChain> {
        let Some(parent) = self.doc.leaf(start)?.parent else {
            return Err(ModelError::Detached);
        };
        let members = self.leaf_run_between(start, end)?;
        let prev = self.doc.leaf(start)?.prev;
        let next = self.doc.leaf(end)?.next;
        let chain = LeafChain::new(start, end, prev, next, parent)?;
        // The gap the run leaves behind, validated before any relinking.
        let gap = if prev.is_some() || next.is_some() {
            Some(LeafNullLink::new(prev, next)?)
        } else {
            None
        };

        if let Some(prev) = gap.and_then(|g| g.prev) {
            self.doc.leaf_mut(prev)?.next = next;
        } else {
            // The run starts at the parent's chain head.
            if self.doc.node(parent)?.first_child != FirstChild::Leaves(start) {
                return Err(ModelError::BrokenChain {
                    start: start.0,
                    end: end.0,
                });
            }
            self.doc.node_mut(parent)?.first_child = match next {
                Some(next) => FirstChild::Leaves(next),
                None => FirstChild::None,
            };
        }
        if let Some(next) = next {
            self.doc.leaf_mut(next)?.prev = prev;
        }
        self.doc.leaf_mut(start)?.prev = None;
        self.doc.leaf_mut(end)?.next = None;
        for id in &members {
            self.doc.leaf_mut(*id)?.parent = None;
        }
        self.mark_children_of(Some(parent))?;
        debug!(%start, %end, parent = %parent, "unchained leaf run");
        Ok(chain)
    }

    /// Detach a single node (subtree rides along). Returns the descriptor.
    pub fn unchain_node(&mut self, node: NodeId) -> Result<NodeChain> {
        self.unchain_node_run(node, node)
    }

    /// Detach the contiguous run `[start, end]` of sibling nodes.
    pub fn unchain_node_run(&mut self, start: NodeId, end: NodeId) -> Result<NodeChain> {
        let chain = self.raw_unchain_node_run(start, end)?;
        self.history.record(RevOp::RechainNodes(chain));
        Ok(chain)
    }

    fn raw_unchain_node_run(&mut self, start: NodeId, end: NodeId) -> Result<NodeChain> {
        let parent = self.doc.node(start)?.parent;
        if parent.is_none() && !self.node_is_top_level(start)? {
            return Err(ModelError::Detached);
        }
        let members = self.node_run_between(start, end)?;
        let prev = self.doc.node(start)?.prev;
        let next = self.doc.node(end)?.next;
        let chain = NodeChain::new(start, end, prev, next, parent)?;
        let gap = if prev.is_some() || next.is_some() {
            Some(NodeNullLink::new(prev, next)?)
        } else {
            None
        };

        if let Some(prev) = gap.and_then(|g| g.prev) {
            self.doc.node_mut(prev)?.next = next;
        } else {
            match parent {
                Some(parent_id) => {
                    if self.doc.node(parent_id)?.first_child != FirstChild::Nodes(start) {
                        return Err(ModelError::BrokenChain {
                            start: start.0,
                            end: end.0,
                        });
                    }
                    self.doc.node_mut(parent_id)?.first_child = match next {
                        Some(next) => FirstChild::Nodes(next),
                        None => FirstChild::None,
                    };
                }
                None => {
                    if self.doc.first_node != Some(start) {
                        return Err(ModelError::BrokenChain {
                            start: start.0,
                            end: end.0,
                        });
                    }
                    self.doc.first_node = next;
                }
            }
        }
        if let Some(next) = next {
            self.doc.node_mut(next)?.prev = prev;
        }
        self.doc.node_mut(start)?.prev = None;
        self.doc.node_mut(end)?.next = None;
        for id in &members {
            self.doc.node_mut(*id)?.parent = None;
        }
        self.mark_children_of(parent)?;
        debug!(%start, %end, "unchained node run");
        Ok(chain)
    }

    // ========================================================================
    // rechain
    // ========================================================================

    /// Re-insert a previously detached leaf run at its recorded position.
    /// Restores parent back-references for every member. Fails with
    /// [`ModelError::StaleDescriptor`] if the recorded neighbors no longer
    /// match the live tree; nothing is applied in that case.
    pub fn rechain_leaves(&mut self, chain: LeafChain) -> Result<()> {
        self.raw_rechain_leaves(chain)?;
        self.history.record(RevOp::UnchainLeaves {
            start: chain.start,
            end: chain.end,
        });
        Ok(())
    }

    fn raw_rechain_leaves(&mut self, chain: LeafChain) -> Result<()> {
        let members = self.leaf_run_between(chain.start, chain.end)?;
        for id in &members {
            if self.doc.leaf(*id)?.parent.is_some() {
                return Err(ModelError::AlreadyAttached);
            }
        }
        // Validate the recorded linkage against the live tree before touching
        // anything.
        match chain.prev {
            Some(prev) => {
                let neighbor = self.doc.leaf(prev)?;
                if neighbor.parent != Some(chain.parent) || neighbor.next != chain.next {
                    return Err(ModelError::StaleDescriptor);
                }
            }
            None => {
                let expected = match chain.next {
                    Some(next) => FirstChild::Leaves(next),
                    None => FirstChild::None,
                };
                if self.doc.node(chain.parent)?.first_child != expected {
                    return Err(ModelError::StaleDescriptor);
                }
            }
        }
        if let Some(next) = chain.next {
            let neighbor = self.doc.leaf(next)?;
            if neighbor.parent != Some(chain.parent) || neighbor.prev != chain.prev {
                return Err(ModelError::StaleDescriptor);
            }
        }

        match chain.prev {
            Some(prev) => self.doc.leaf_mut(prev)?.next = Some(chain.start),
            None => {
                self.doc.node_mut(chain.parent)?.first_child = FirstChild::Leaves(chain.start)
            }
        }
        self.doc.leaf_mut(chain.start)?.prev = chain.prev;
        self.doc.leaf_mut(chain.end)?.next = chain.next;
        if let Some(next) = chain.next {
            self.doc.leaf_mut(next)?.prev = Some(chain.end);
        }
        for id in &members {
            self.doc.leaf_mut(*id)?.parent = Some(chain.parent);
        }
        self.mark_children_of(Some(chain.parent))?;
        debug!(start = %chain.start, end = %chain.end, "rechained leaf run");
        Ok(())
    }

    /// Re-insert a previously detached node run at its recorded position.
    pub fn rechain_nodes(&mut self, chain: NodeChain) -> Result<()> {
        self.raw_rechain_nodes(chain)?;
        self.history.record(RevOp::UnchainNodes {
            start: chain.start,
            end: chain.end,
        });
        Ok(())
    }

    fn raw_rechain_nodes(&mut self, chain: NodeChain) -> Result<()> {
        let members = self.node_run_between(chain.start, chain.end)?;
        for id in &members {
            let node = self.doc.node(*id)?;
            if node.parent.is_some() {
                return Err(ModelError::AlreadyAttached);
            }
        }
        if self.doc.node(chain.start)?.prev.is_some() {
            return Err(ModelError::AlreadyAttached);
        }
        match chain.prev {
            Some(prev) => {
                let neighbor = self.doc.node(prev)?;
                if neighbor.parent != chain.parent || neighbor.next != chain.next {
                    return Err(ModelError::StaleDescriptor);
                }
            }
            None => match chain.parent {
                Some(parent_id) => {
                    let expected = match chain.next {
                        Some(next) => FirstChild::Nodes(next),
                        None => FirstChild::None,
                    };
                    if self.doc.node(parent_id)?.first_child != expected {
                        return Err(ModelError::StaleDescriptor);
                    }
                }
                None => {
                    if self.doc.first_node != chain.next {
                        return Err(ModelError::StaleDescriptor);
                    }
                }
            },
        }
        if let Some(next) = chain.next {
            let neighbor = self.doc.node(next)?;
            if neighbor.parent != chain.parent || neighbor.prev != chain.prev {
                return Err(ModelError::StaleDescriptor);
            }
        }

        match chain.prev {
            Some(prev) => self.doc.node_mut(prev)?.next = Some(chain.start),
            None => match chain.parent {
                Some(parent_id) => {
                    self.doc.node_mut(parent_id)?.first_child = FirstChild::Nodes(chain.start)
                }
                None => self.doc.first_node = Some(chain.start),
            },
        }
        self.doc.node_mut(chain.start)?.prev = chain.prev;
        self.doc.node_mut(chain.end)?.next = chain.next;
        if let Some(next) = chain.next {
            self.doc.node_mut(next)?.prev = Some(chain.end);
        }
        for id in &members {
            self.doc.node_mut(*id)?.parent = chain.parent;
        }
        self.mark_children_of(chain.parent)?;
        debug!(start = %chain.start, end = %chain.end, "rechained node run");
        Ok(())
    }

    // ========================================================================
    // Attach at arbitrary position (internal: merges, phantom moves)
    // ========================================================================

    /// Insert a detached leaf run into `parent` after `after` (`None` =
    /// before the current chain head / as sole chain).
    fn raw_attach_leaf_run(
        &mut self,
        start: LeafId,
        end: LeafId,
        parent: NodeId,
        after: Option<LeafId>,
    ) -> Result<RevOp> {
        let members = self.leaf_run_between(start, end)?;
        for id in &members {
            if self.doc.leaf(*id)?.parent.is_some() {
                return Err(ModelError::AlreadyAttached);
            }
        }
        let next = match after {
            Some(after) => {
                if self.doc.leaf(after)?.parent != Some(parent) {
                    return Err(ModelError::Detached);
                }
                let next = self.doc.leaf(after)?.next;
                self.doc.leaf_mut(after)?.next = Some(start);
                next
            }
            None => match self.doc.node(parent)?.first_child {
                FirstChild::None => {
                    self.doc.node_mut(parent)?.first_child = FirstChild::Leaves(start);
                    None
                }
                FirstChild::Leaves(head) => {
                    self.doc.node_mut(parent)?.first_child = FirstChild::Leaves(start);
                    Some(head)
                }
                FirstChild::Nodes(_) => return Err(ModelError::MixedChildren),
            },
        };
        self.doc.leaf_mut(start)?.prev = after;
        self.doc.leaf_mut(end)?.next = next;
        if let Some(next) = next {
            self.doc.leaf_mut(next)?.prev = Some(end);
        }
        for id in &members {
            self.doc.leaf_mut(*id)?.parent = Some(parent);
        }
        self.mark_children_of(Some(parent))?;
        Ok(RevOp::UnchainLeaves { start, end })
    }

    /// Insert a detached node run under `parent` (`None` = top level) after
    /// `after` (`None` = at the head).
    fn raw_attach_node_run(
        &mut self,
        start: NodeId,
        end: NodeId,
        parent: Option<NodeId>,
        after: Option<NodeId>,
    ) -> Result<RevOp> {
        let members = self.node_run_between(start, end)?;
        for id in &members {
            if self.doc.node(*id)?.parent.is_some() {
                return Err(ModelError::AlreadyAttached);
            }
        }
        self.ensure_destination_outside_run(&members, parent)?;
        let next = match after {
            Some(after) => {
                if self.doc.node(after)?.parent != parent {
                    return Err(ModelError::Detached);
                }
                let next = self.doc.node(after)?.next;
                self.doc.node_mut(after)?.next = Some(start);
                next
            }
            None => match parent {
                Some(parent_id) => match self.doc.node(parent_id)?.first_child {
                    FirstChild::None => {
                        self.doc.node_mut(parent_id)?.first_child = FirstChild::Nodes(start);
                        None
                    }
                    FirstChild::Nodes(head) => {
                        self.doc.node_mut(parent_id)?.first_child = FirstChild::Nodes(start);
                        Some(head)
                    }
                    FirstChild::Leaves(_) => return Err(ModelError::MixedChildren),
                },
                None => {
                    let head = self.doc.first_node;
                    self.doc.first_node = Some(start);
                    head
                }
            },
        };
        self.doc.node_mut(start)?.prev = after;
        self.doc.node_mut(end)?.next = next;
        if let Some(next) = next {
            self.doc.node_mut(next)?.prev = Some(end);
        }
        for id in &members {
            self.doc.node_mut(*id)?.parent = parent;
        }
        self.mark_children_of(parent)?;
        Ok(RevOp::UnchainNodes { start, end })
    }

    // ========================================================================
    // Phantom relocation
    // ========================================================================

    /// Relocate an attached node (subtree intact) to sit after `after` under
    /// `dest_parent` (`None`/`None` = head of the top-level chain). Records a
    /// single phantom descriptor, so undo restores the original linkage in
    /// one step.
    pub fn move_node(
        &mut self,
        node: NodeId,
        dest_parent: Option<NodeId>,
        after: Option<NodeId>,
    ) -> Result<()> {
        let phantom = self.capture_phantom(node)?;
        // Reject circular destinations before the unchain, so a failed move
        // leaves the tree untouched.
        self.ensure_destination_outside_run(&[node], dest_parent)?;
        self.raw_unchain_node_run(node, node)?;
        self.raw_attach_node_run(node, node, dest_parent, after)?;
        self.history.record(RevOp::RestorePhantom(phantom));
        debug!(%node, "moved node");
        Ok(())
    }

    /// Relocate an attached sibling run `[start, end]` as one unit.
    pub fn move_node_run(
        &mut self,
        start: NodeId,
        end: NodeId,
        dest_parent: Option<NodeId>,
        after: Option<NodeId>,
    ) -> Result<()> {
        let phantom = self.capture_phantom_chain(start, end)?;
        let members = self.node_run_between(start, end)?;
        self.ensure_destination_outside_run(&members, dest_parent)?;
        self.raw_unchain_node_run(start, end)?;
        self.raw_attach_node_run(start, end, dest_parent, after)?;
        self.history.record(RevOp::RestorePhantomChain(phantom));
        debug!(%start, %end, "moved node run");
        Ok(())
    }

    fn capture_phantom(&self, node: NodeId) -> Result<PhantomNode> {
        let entry = self.doc.node(node)?;
        if entry.parent.is_none() && !self.node_is_top_level(node)? {
            return Err(ModelError::Detached);
        }
        PhantomNode::new(node, entry.prev, entry.next, entry.parent, entry.node_type)
    }

    fn capture_phantom_chain(&self, start: NodeId, end: NodeId) -> Result<PhantomChain> {
        let first = self.doc.node(start)?;
        if first.parent.is_none() && !self.node_is_top_level(start)? {
            return Err(ModelError::Detached);
        }
        self.node_run_between(start, end)?;
        PhantomChain::new(
            start,
            end,
            first.prev,
            self.doc.node(end)?.next,
            first.parent,
        )
    }

    fn raw_restore_phantom(&mut self, phantom: PhantomNode) -> Result<RevOp> {
        let mirror = self.capture_phantom(phantom.node)?;
        self.validate_phantom_target(
            phantom.prev,
            phantom.next,
            phantom.parent,
            phantom.node,
            phantom.node,
        )?;
        self.raw_unchain_node_run(phantom.node, phantom.node)?;
        self.raw_attach_node_run(phantom.node, phantom.node, phantom.parent, phantom.prev)?;
        self.doc.node_mut(phantom.node)?.node_type = phantom.node_type;
        Ok(RevOp::RestorePhantom(mirror))
    }

    fn raw_restore_phantom_chain(&mut self, phantom: PhantomChain) -> Result<RevOp> {
        let mirror = self.capture_phantom_chain(phantom.start, phantom.end)?;
        self.validate_phantom_target(
            phantom.prev,
            phantom.next,
            phantom.parent,
            phantom.start,
            phantom.end,
        )?;
        self.raw_unchain_node_run(phantom.start, phantom.end)?;
        self.raw_attach_node_run(phantom.start, phantom.end, phantom.parent, phantom.prev)?;
        Ok(RevOp::RestorePhantomChain(mirror))
    }

    /// The recorded neighbors must currently be adjacent (or separated only
    /// by the run being restored, which covers restoring to the current
    /// position). Anything else means the region was mutated independently.
    fn validate_phantom_target(
        &self,
        prev: Option<NodeId>,
        next: Option<NodeId>,
        parent: Option<NodeId>,
        run_start: NodeId,
        run_end: NodeId,
    ) -> Result<()> {
        let neighbor_next = match prev {
            Some(prev) => {
                let entry = self.doc.node(prev)?;
                if entry.parent != parent {
                    return Err(ModelError::StaleDescriptor);
                }
                entry.next
            }
            None => match parent {
                Some(parent_id) => match self.doc.node(parent_id)?.first_child {
                    FirstChild::Nodes(head) => Some(head),
                    FirstChild::None => None,
                    FirstChild::Leaves(_) => return Err(ModelError::StaleDescriptor),
                },
                None => self.doc.first_node,
            },
        };
        let adjacent = neighbor_next == next;
        let already_in_place =
            neighbor_next == Some(run_start) && self.doc.node(run_end)?.next == next;
        if !adjacent && !already_in_place {
            return Err(ModelError::StaleDescriptor);
        }
        Ok(())
    }

    // ========================================================================
    // merge
    // ========================================================================

    /// Whether two adjacent leaves may merge: identical style hash and kind,
    /// except that a zero-content leaf is always absorbed.
    pub fn leaves_merge_eligible(&self, a: LeafId, b: LeafId) -> Result<bool> {
        let first = self.doc.leaf(a)?;
        let second = self.doc.leaf(b)?;
        if first.is_zero_leaf() || second.is_zero_leaf() {
            return Ok(true);
        }
        Ok(first.kind == second.kind
            && first.styles.style_hash() == second.styles.style_hash())
    }

    /// Merge adjacent leaf `b` into `a` (`b` must be `a.next`): concatenates
    /// the text, unchains `b`, and reassigns any anchors of `range` pointing
    /// at `b` to the corresponding offset within `a`.
    pub fn merge_leaves(
        &mut self,
        a: LeafId,
        b: LeafId,
        range: Option<&mut TextRange>,
    ) -> Result<()> {
        if self.doc.leaf(a)?.next != Some(b) {
            return Err(ModelError::Detached);
        }
        if !self.leaves_merge_eligible(a, b)? {
            return Err(ModelError::MergeIneligible);
        }
        let a_len = self.doc.leaf(a)?.visible_len();
        let a_zero = self.doc.leaf(a)?.is_zero_leaf();
        let b_entry = self.doc.leaf(b)?;
        let b_zero = b_entry.is_zero_leaf();
        let b_text = b_entry.text.clone();
        let b_styles = b_entry.styles.clone();

        let merged = if b_zero {
            self.doc.leaf(a)?.text.clone()
        } else if a_zero {
            b_text
        } else {
            let mut text = self.doc.leaf(a)?.text.clone();
            text.push_str(&self.doc.leaf(b)?.text);
            text
        };
        self.set_leaf_text(a, merged)?;
        if a_zero && !b_zero {
            // The absorbed content keeps its own styling.
            self.set_leaf_styles(a, b_styles)?;
        }
        self.unchain_leaf(b)?;

        if let Some(range) = range {
            range.reassign_leaf(b, a, a_len);
        }
        debug!(%a, %b, "merged leaves");
        Ok(())
    }

    /// Whether two adjacent leaf-chain nodes may merge: identical type and
    /// style hash.
    pub fn nodes_merge_eligible(&self, a: NodeId, b: NodeId) -> Result<bool> {
        let first = self.doc.node(a)?;
        let second = self.doc.node(b)?;
        let both_leafy = matches!(first.first_child, FirstChild::Leaves(_) | FirstChild::None)
            && matches!(second.first_child, FirstChild::Leaves(_) | FirstChild::None);
        Ok(both_leafy
            && first.node_type == second.node_type
            && first.style_hash() == second.style_hash())
    }

    /// Merge adjacent node `b` into `a` (`b` must be `a.next`): `b`'s leaf
    /// chain is appended to `a`'s and `b` is unchained as an empty container.
    pub fn merge_nodes(&mut self, a: NodeId, b: NodeId) -> Result<()> {
        if self.doc.node(a)?.next != Some(b) {
            return Err(ModelError::Detached);
        }
        if !self.nodes_merge_eligible(a, b)? {
            return Err(ModelError::MergeIneligible);
        }
        if let FirstChild::Leaves(head) = self.doc.node(b)?.first_child {
            let run = self.doc.leaf_run_from(head)?;
            let end = *run.last().ok_or(ModelError::UnknownLeaf(head))?;
            let chain = self.raw_unchain_leaf_run(head, end)?;
            self.history.record(RevOp::RechainLeaves(chain));
            let tail = self.doc.last_leaf_of(a)?;
            let rev = self.raw_attach_leaf_run(head, end, a, tail)?;
            self.history.record(rev);
        }
        self.unchain_node(b)?;
        debug!(%a, %b, "merged nodes");
        Ok(())
    }

    // ========================================================================
    // split / shatter
    // ========================================================================

    /// Split a leaf's text at `offset` (a char boundary strictly inside the
    /// text), producing a new leaf with the tail content chained immediately
    /// after. Returns the new leaf's id.
    pub fn split_leaf(&mut self, leaf: LeafId, offset: usize) -> Result<LeafId> {
        let entry = self.doc.leaf(leaf)?;
        let len = entry.text.len();
        if offset == 0 || offset >= len || !entry.text.is_char_boundary(offset) {
            return Err(ModelError::OffsetOutOfBounds { offset, len });
        }
        let head = entry.text[..offset].to_string();
        let tail = entry.text[offset..].to_string();
        let styles = entry.styles.clone();
        let kind = entry.kind;
        self.set_leaf_text(leaf, head)?;
        let new_leaf = self.doc.create_leaf(tail, styles, kind);
        self.chain_leaf(new_leaf, leaf)?;
        debug!(%leaf, %new_leaf, offset, "split leaf");
        Ok(new_leaf)
    }

    /// Split `node`'s child chain at `at`, relocating the tail (the split
    /// child and everything after it) into a fresh sibling node of the same
    /// type and styles, chained immediately after `node`. The tail keeps its
    /// identities; nothing is rebuilt. Returns the new sibling's id.
    pub fn shatter(&mut self, node: NodeId, at: SplitPoint) -> Result<NodeId> {
        let node_type = self.doc.node(node)?.node_type;
        let styles = self.doc.node(node)?.styles.clone();
        match at {
            SplitPoint::AtLeaf(leaf) => {
                if self.doc.leaf(leaf)?.parent != Some(node) {
                    return Err(ModelError::Detached);
                }
                let run = self.doc.leaf_run_from(leaf)?;
                let end = *run.last().ok_or(ModelError::UnknownLeaf(leaf))?;
                self.unchain_leaf_run(leaf, end)?;
                let sibling = self.doc.create_node(node_type, styles);
                self.chain_node(sibling, node)?;
                self.set_parent_link(ChildRef::Leaf(leaf), Some(sibling))?;
                debug!(%node, %sibling, "shattered node at leaf");
                Ok(sibling)
            }
            SplitPoint::AtNode(child) => {
                if self.doc.node(child)?.parent != Some(node) {
                    return Err(ModelError::Detached);
                }
                let run = self.doc.node_run_from(child)?;
                let end = *run.last().ok_or(ModelError::UnknownNode(child))?;
                let sibling = self.doc.create_node(node_type, styles);
                self.chain_node(sibling, node)?;
                self.move_node_run(child, end, Some(sibling), None)?;
                debug!(%node, %sibling, "shattered node at child node");
                Ok(sibling)
            }
        }
    }

    // ========================================================================
    // History replay
    // ========================================================================

    /// Apply one recorded inverse through the raw layer, returning its own
    /// inverse for the mirror step.
    pub(crate) fn apply_rev_op(&mut self, op: RevOp) -> Result<RevOp> {
        match op {
            RevOp::RechainLeaves(chain) => {
                self.raw_rechain_leaves(chain)?;
                Ok(RevOp::UnchainLeaves {
                    start: chain.start,
                    end: chain.end,
                })
            }
            RevOp::UnchainLeaves { start, end } => {
                let chain = self.raw_unchain_leaf_run(start, end)?;
                Ok(RevOp::RechainLeaves(chain))
            }
            RevOp::RechainNodes(chain) => {
                self.raw_rechain_nodes(chain)?;
                Ok(RevOp::UnchainNodes {
                    start: chain.start,
                    end: chain.end,
                })
            }
            RevOp::UnchainNodes { start, end } => {
                let chain = self.raw_unchain_node_run(start, end)?;
                Ok(RevOp::RechainNodes(chain))
            }
            RevOp::RestorePhantom(phantom) => self.raw_restore_phantom(phantom),
            RevOp::RestorePhantomChain(phantom) => self.raw_restore_phantom_chain(phantom),
            RevOp::SetLeafText { leaf, text } => self.raw_set_leaf_text(leaf, text),
            RevOp::SetLeafStyles { leaf, styles } => self.raw_set_leaf_styles(leaf, styles),
            RevOp::SetNodeStyles { node, styles } => self.raw_set_node_styles(node, styles),
            RevOp::SetNodeType { node, node_type } => self.raw_set_node_type(node, node_type),
            RevOp::DetachParentLink { parent } => self.raw_detach_first_child(parent),
            RevOp::AttachParentLink { child, parent } => {
                self.raw_attach_first_child(child, parent)
            }
        }
    }

    // ========================================================================
    // Run walking
    // ========================================================================

    /// Members of the leaf run `[start, end]`, verifying contiguity.
    fn leaf_run_between(&self, start: LeafId, end: LeafId) -> Result<Vec<LeafId>> {
        let mut members = Vec::new();
        let mut cursor = Some(start);
        while let Some(id) = cursor {
            if members.len() > self.doc.leaf_count() {
                return Err(ModelError::BrokenChain {
                    start: start.0,
                    end: end.0,
                });
            }
            members.push(id);
            if id == end {
                return Ok(members);
            }
            cursor = self.doc.leaf(id)?.next;
        }
        Err(ModelError::BrokenChain {
            start: start.0,
            end: end.0,
        })
    }

    /// Members of the node run `[start, end]`, verifying contiguity.
    fn node_run_between(&self, start: NodeId, end: NodeId) -> Result<Vec<NodeId>> {
        let mut members = Vec::new();
        let mut cursor = Some(start);
        while let Some(id) = cursor {
            if members.len() > self.doc.node_count() {
                return Err(ModelError::BrokenChain {
                    start: start.0,
                    end: end.0,
                });
            }
            members.push(id);
            if id == end {
                return Ok(members);
            }
            cursor = self.doc.node(id)?.next;
        }
        Err(ModelError::BrokenChain {
            start: start.0,
            end: end.0,
        })
    }
}
