//! Edit history (undo/redo) for the document model.
//!
//! One [`HistoryStep`] groups every mutation performed during a single user
//! action. While a step is recording, each mutation engine operation appends
//! the descriptor that *reverses* it; undo replays those inverses in
//! reverse-recording order, so the most recent change is unwound first, and
//! collects the mirror step for redo. A fresh step committed after undos
//! clears the redo stack (linear history, no branching).

use crate::chain::{LeafChain, NodeChain, PhantomChain, PhantomNode};
use crate::id::{LeafId, NodeId};
use crate::node::NodeType;
use crate::style::{LeafStyles, NodeStyles};

/// A chain head attachable as a parent's `first_child`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildRef {
    Leaf(LeafId),
    Node(NodeId),
}

/// A single inverse operation.
///
/// Each variant carries exactly the descriptor needed to reverse one mutation
/// engine operation; applying it through the engine yields the variant that
/// reverses *it*, which is how undo produces the redo step.
#[derive(Debug, Clone)]
pub enum RevOp {
    /// Re-insert a detached leaf run at its recorded position
    /// (reverses an unchain).
    RechainLeaves(LeafChain),
    /// Detach a leaf run (reverses a chain/rechain).
    UnchainLeaves { start: LeafId, end: LeafId },
    /// Re-insert a detached node run (reverses an unchain).
    RechainNodes(NodeChain),
    /// Detach a node run (reverses a chain/rechain).
    UnchainNodes { start: NodeId, end: NodeId },
    /// Move a node back to its recorded pre-move linkage
    /// (reverses a phantom relocation).
    RestorePhantom(PhantomNode),
    /// Move a node run back to its recorded pre-move linkage.
    RestorePhantomChain(PhantomChain),
    /// Restore a leaf's text (reverses a text edit).
    SetLeafText { leaf: LeafId, text: String },
    /// Restore a leaf's styles.
    SetLeafStyles { leaf: LeafId, styles: LeafStyles },
    /// Restore a node's styles.
    SetNodeStyles {
        node: NodeId,
        styles: Option<NodeStyles>,
    },
    /// Restore a node's block type.
    SetNodeType { node: NodeId, node_type: NodeType },
    /// Detach a parent's entire child chain (reverses `set_parent_link`).
    DetachParentLink { parent: Option<NodeId> },
    /// Re-attach a chain as a parent's child chain (reverses the above).
    AttachParentLink {
        child: ChildRef,
        parent: Option<NodeId>,
    },
}

/// One reversible user action: the inverse operations recorded while it ran.
#[derive(Debug, Clone, Default)]
pub struct HistoryStep {
    ops: Vec<RevOp>,
}

impl HistoryStep {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Consume the step, yielding inverses in the order undo must apply them
    /// (reverse of recording order).
    pub(crate) fn into_replay_order(self) -> impl Iterator<Item = RevOp> {
        self.ops.into_iter().rev()
    }

    pub(crate) fn from_mirror(ops: Vec<RevOp>) -> Self {
        // Ops collected while replaying a step are already in the order the
        // mirror step must store them: reversing them again at replay time
        // reproduces the original application order.
        Self { ops }
    }
}

/// Undo/redo stacks with a bounded past.
#[derive(Debug, Default)]
pub struct History {
    past: Vec<HistoryStep>,
    future: Vec<HistoryStep>,
    recording: Option<HistoryStep>,
    max_steps: usize,
}

impl History {
    /// Create a history with the default depth bound.
    pub fn new() -> Self {
        Self::with_max_steps(1000)
    }

    /// Create a history keeping at most `max_steps` past steps.
    pub fn with_max_steps(max_steps: usize) -> Self {
        Self {
            past: Vec::new(),
            future: Vec::new(),
            recording: None,
            max_steps,
        }
    }

    /// Open a recording step. A step already recording keeps recording; user
    /// actions never nest.
    pub fn begin_step(&mut self) {
        if self.recording.is_none() {
            self.recording = Some(HistoryStep::default());
        }
    }

    /// Whether a step is currently recording.
    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    /// Append an inverse op to the recording step, if any. Mutations outside
    /// a step are not undoable.
    pub fn record(&mut self, op: RevOp) {
        if let Some(step) = self.recording.as_mut() {
            step.ops.push(op);
        }
    }

    /// Close the recording step and push it onto the past stack. A non-empty
    /// step clears the redo stack; an empty step is discarded.
    pub fn commit_step(&mut self) {
        let Some(step) = self.recording.take() else {
            return;
        };
        if step.is_empty() {
            return;
        }
        self.future.clear();
        self.past.push(step);
        while self.past.len() > self.max_steps {
            self.past.remove(0);
        }
    }

    /// Discard the recording step without committing.
    pub fn abort_step(&mut self) {
        self.recording = None;
    }

    pub(crate) fn take_undo(&mut self) -> Option<HistoryStep> {
        self.past.pop()
    }

    pub(crate) fn take_redo(&mut self) -> Option<HistoryStep> {
        self.future.pop()
    }

    pub(crate) fn push_future(&mut self, step: HistoryStep) {
        self.future.push(step);
    }

    pub(crate) fn push_past(&mut self, step: HistoryStep) {
        self.past.push(step);
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.past.len()
    }

    pub fn redo_count(&self) -> usize {
        self.future.len()
    }

    /// Clear all history.
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
        self.recording = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::LeafId;

    fn text_op(n: u64) -> RevOp {
        RevOp::SetLeafText {
            leaf: LeafId(n),
            text: format!("t{n}"),
        }
    }

    #[test]
    fn commit_clears_future() {
        let mut history = History::new();
        history.push_future(HistoryStep::from_mirror(vec![text_op(1)]));
        assert!(history.can_redo());

        history.begin_step();
        history.record(text_op(2));
        history.commit_step();
        assert!(!history.can_redo());
        assert_eq!(history.undo_count(), 1);
    }

    #[test]
    fn empty_step_is_discarded() {
        let mut history = History::new();
        history.begin_step();
        history.commit_step();
        assert!(!history.can_undo());
    }

    #[test]
    fn recording_outside_step_is_dropped() {
        let mut history = History::new();
        history.record(text_op(1));
        history.begin_step();
        history.commit_step();
        assert_eq!(history.undo_count(), 0);
    }

    #[test]
    fn max_steps_bounds_past() {
        let mut history = History::with_max_steps(2);
        for n in 0..4 {
            history.begin_step();
            history.record(text_op(n));
            history.commit_step();
        }
        assert_eq!(history.undo_count(), 2);
    }

    #[test]
    fn replay_order_is_reverse_of_recording() {
        let mut step = HistoryStep::default();
        step.ops.push(text_op(1));
        step.ops.push(text_op(2));
        let order: Vec<_> = step
            .into_replay_order()
            .map(|op| match op {
                RevOp::SetLeafText { leaf, .. } => leaf.0,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(order, vec![2, 1]);
    }
}
