//! Dirty-state lattice for render scheduling.
//!
//! Each entity carries a four-value dirty state forming a small lattice:
//!
//! ```text
//!            Full
//!           /    \
//!     SelfOnly  Children
//!           \    /
//!           Clean
//! ```
//!
//! Marking is a *join*, not an addition: applying the same flag twice, or any
//! flag to an already-`Full` entity, is a no-op. Invalid states are
//! unrepresentable; there is no integer arithmetic that could overflow past
//! `Full`.

/// What a single mutation wants re-rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirtyMark {
    /// The entity's own representation (style, text, type) changed.
    SelfOnly,
    /// The entity's child collection changed (chain/unchain/rechain).
    Children,
}

/// Accumulated dirty state of one entity between drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirtyState {
    /// Nothing to re-render.
    #[default]
    Clean,
    /// Only the entity's own representation needs a refresh.
    SelfOnly,
    /// Only the child collection needs re-enumeration.
    Children,
    /// Both, independently.
    Full,
}

impl DirtyState {
    /// Join a new mark into the accumulated state (idempotent, absorbing).
    #[must_use]
    pub fn join(self, mark: DirtyMark) -> DirtyState {
        match (self, mark) {
            (DirtyState::Clean, DirtyMark::SelfOnly) => DirtyState::SelfOnly,
            (DirtyState::Clean, DirtyMark::Children) => DirtyState::Children,
            (DirtyState::SelfOnly, DirtyMark::SelfOnly) => DirtyState::SelfOnly,
            (DirtyState::SelfOnly, DirtyMark::Children) => DirtyState::Full,
            (DirtyState::Children, DirtyMark::Children) => DirtyState::Children,
            (DirtyState::Children, DirtyMark::SelfOnly) => DirtyState::Full,
            (DirtyState::Full, _) => DirtyState::Full,
        }
    }

    /// Whether the "update self" signal should fire on drain.
    pub fn wants_self(self) -> bool {
        matches!(self, DirtyState::SelfOnly | DirtyState::Full)
    }

    /// Whether the "update children" signal should fire on drain.
    pub fn wants_children(self) -> bool {
        matches!(self, DirtyState::Children | DirtyState::Full)
    }

    /// Whether there is anything to do at all.
    pub fn is_clean(self) -> bool {
        matches!(self, DirtyState::Clean)
    }
}
