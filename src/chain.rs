//! Linkage descriptors: null-links, chain runs, and phantoms.
//!
//! These are transient, validated snapshots of a linkage (or a
//! linkage-about-to-change). The mutation engine produces them when it breaks
//! a chain; the history engine consumes them to restore exactly that linkage
//! on undo. Construction is all-or-nothing: an invalid descriptor is never
//! partially built.

use crate::error::{ModelError, Result};
use crate::id::{LeafId, NodeId};
use crate::node::NodeType;

/// A broken leaf linkage: the neighbors that used to surround something.
///
/// At least one endpoint is present, and the endpoints never reference the
/// same leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafNullLink {
    pub prev: Option<LeafId>,
    pub next: Option<LeafId>,
}

impl LeafNullLink {
    pub fn new(prev: Option<LeafId>, next: Option<LeafId>) -> Result<Self> {
        if prev.is_none() && next.is_none() {
            return Err(ModelError::EmptyNullLink);
        }
        if prev.is_some() && prev == next {
            return Err(ModelError::SelfReferentialLink);
        }
        Ok(Self { prev, next })
    }
}

/// A broken node linkage. Same rules as [`LeafNullLink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeNullLink {
    pub prev: Option<NodeId>,
    pub next: Option<NodeId>,
}

impl NodeNullLink {
    pub fn new(prev: Option<NodeId>, next: Option<NodeId>) -> Result<Self> {
        if prev.is_none() && next.is_none() {
            return Err(ModelError::EmptyNullLink);
        }
        if prev.is_some() && prev == next {
            return Err(ModelError::SelfReferentialLink);
        }
        Ok(Self { prev, next })
    }
}

/// A contiguous detached run of leaves `[start, end]` plus the external
/// neighbors and parent that bounded it before detachment.
///
/// Internal contiguity and shared parent/new-status of the members are the
/// caller's responsibility; construction only rejects null/self violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafChain {
    pub start: LeafId,
    pub end: LeafId,
    pub prev: Option<LeafId>,
    pub next: Option<LeafId>,
    /// The node that owned the run before detachment.
    pub parent: NodeId,
}

impl LeafChain {
    pub fn new(
        start: LeafId,
        end: LeafId,
        prev: Option<LeafId>,
        next: Option<LeafId>,
        parent: NodeId,
    ) -> Result<Self> {
        if prev.is_some() && prev == next {
            return Err(ModelError::SelfReferentialLink);
        }
        if prev == Some(start) || prev == Some(end) || next == Some(start) || next == Some(end) {
            return Err(ModelError::SelfReferentialLink);
        }
        Ok(Self {
            start,
            end,
            prev,
            next,
            parent,
        })
    }
}

/// A contiguous detached run of nodes `[start, end]` plus its old neighbors.
/// `parent == None` means the run sat at the top level under the document
/// root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeChain {
    pub start: NodeId,
    pub end: NodeId,
    pub prev: Option<NodeId>,
    pub next: Option<NodeId>,
    pub parent: Option<NodeId>,
}

impl NodeChain {
    pub fn new(
        start: NodeId,
        end: NodeId,
        prev: Option<NodeId>,
        next: Option<NodeId>,
        parent: Option<NodeId>,
    ) -> Result<Self> {
        if prev.is_some() && prev == next {
            return Err(ModelError::SelfReferentialLink);
        }
        if prev == Some(start) || prev == Some(end) || next == Some(start) || next == Some(end) {
            return Err(ModelError::SelfReferentialLink);
        }
        if parent == Some(start) || parent == Some(end) {
            return Err(ModelError::SelfReferentialLink);
        }
        Ok(Self {
            start,
            end,
            prev,
            next,
            parent,
        })
    }
}

/// Snapshot of a single node's pre-move linkage, used to relocate an existing
/// subtree without destroying and rebuilding it.
///
/// The caller guarantees the abandoned source region is not independently
/// mutated before the phantom is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhantomNode {
    pub node: NodeId,
    pub prev: Option<NodeId>,
    pub next: Option<NodeId>,
    pub parent: Option<NodeId>,
    pub node_type: NodeType,
}

impl PhantomNode {
    pub fn new(
        node: NodeId,
        prev: Option<NodeId>,
        next: Option<NodeId>,
        parent: Option<NodeId>,
        node_type: NodeType,
    ) -> Result<Self> {
        if prev == Some(node) || next == Some(node) || parent == Some(node) {
            return Err(ModelError::SelfReferentialLink);
        }
        if prev.is_some() && prev == next {
            return Err(ModelError::SelfReferentialLink);
        }
        Ok(Self {
            node,
            prev,
            next,
            parent,
            node_type,
        })
    }
}

/// Snapshot of a node run's pre-move linkage. The run-level analogue of
/// [`PhantomNode`], used when a whole sibling run relocates together (e.g.
/// the tail half of a shattered list).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhantomChain {
    pub start: NodeId,
    pub end: NodeId,
    pub prev: Option<NodeId>,
    pub next: Option<NodeId>,
    pub parent: Option<NodeId>,
}

impl PhantomChain {
    pub fn new(
        start: NodeId,
        end: NodeId,
        prev: Option<NodeId>,
        next: Option<NodeId>,
        parent: Option<NodeId>,
    ) -> Result<Self> {
        let chain = NodeChain::new(start, end, prev, next, parent)?;
        Ok(Self {
            start: chain.start,
            end: chain.end,
            prev: chain.prev,
            next: chain.next,
            parent: chain.parent,
        })
    }
}
