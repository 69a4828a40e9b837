//! Error types for the document model.
//!
//! Every variant here is a programming-contract violation, not a user input
//! error: the caller broke a precondition (attached an already-attached child,
//! replayed a stale history descriptor, built a link with no endpoints).
//! Callers are expected to either validate beforehand or treat the failure as
//! fatal to the in-progress edit. None of these are transient; there is no
//! retry path.

use thiserror::Error;

use crate::id::{LeafId, NodeId};

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Contract-violation errors raised by the document model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A null-link descriptor was constructed with neither a prev nor a next
    /// endpoint. At least one must be present for history to restore anything.
    #[error("null link requires at least one endpoint")]
    EmptyNullLink,

    /// A link or chain descriptor references the same entity on both sides
    /// (prev == next, or a neighbor equals a run endpoint).
    #[error("link endpoints reference the same entity")]
    SelfReferentialLink,

    /// A chain descriptor's run is not contiguous: following `next` links from
    /// `start` never reaches `end`.
    #[error("chain run from {start} to {end} is not contiguous")]
    BrokenChain { start: u64, end: u64 },

    /// A leaf id that is not (or no longer) present in the document arena.
    #[error("unknown leaf {0:?}")]
    UnknownLeaf(LeafId),

    /// A node id that is not (or no longer) present in the document arena.
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),

    /// `set_parent_link` was called for a child that still has a parent.
    /// The caller must unchain first.
    #[error("child is already attached to a parent")]
    AlreadyAttached,

    /// `set_parent_link` was called for a parent that already has children.
    #[error("parent already has a child chain")]
    ParentOccupied,

    /// An operation would give a node both leaf and node children.
    #[error("node children must be homogeneous (all leaves or all nodes)")]
    MixedChildren,

    /// A structural operation targeted a leaf or node that is currently
    /// detached (no parent, not part of any chain) where an attached entity
    /// was required, or vice versa.
    #[error("entity is detached from the tree")]
    Detached,

    /// History replayed a descriptor whose recorded neighbors no longer match
    /// the live tree. The tree was mutated outside history's knowledge; the
    /// step cannot be applied without corruption, so nothing is applied.
    #[error("stale descriptor: recorded linkage no longer matches the tree")]
    StaleDescriptor,

    /// A text offset past the end of a leaf's content.
    #[error("offset {offset} out of bounds for leaf of length {len}")]
    OffsetOutOfBounds { offset: usize, len: usize },

    /// Two leaves or nodes failed the merge-eligibility check (style hash or
    /// type mismatch).
    #[error("entities are not merge-eligible")]
    MergeIneligible,

    /// A range whose endpoints do not both sit inside the document tree.
    #[error("range endpoints are not attached to the document")]
    InvalidRange,

    /// Leaves can only live under a node; the document root holds nodes.
    #[error("leaves cannot attach at document-root level")]
    LeafAtRoot,
}
