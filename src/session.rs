//! Editor session - the explicit context object tying the core together.
//!
//! One session per open document. The session owns the document model, the
//! render queue, the view-handle registry, and the edit history; all mutation
//! entry points live on it so dirty marking and history recording can never
//! be skipped. Sessions are plain values: multiple independent editors can
//! coexist in one process, and tests build throwaway sessions freely.
//!
//! Everything is single-threaded and synchronous. A user action runs to
//! completion (mutations, history recording, dirty marking) before `render`
//! is called to drain the queue exactly once.

use tracing::{debug, trace};

use crate::doc::DocumentModel;
use crate::error::{ModelError, Result};
use crate::history::{History, HistoryStep};
use crate::id::{EntityRef, LeafId, NodeId};
use crate::queue::RenderQueue;
use crate::view::{ViewHandle, ViewRegistry};

/// A single editing session: document, render queue, views, history.
#[derive(Debug)]
pub struct EditorSession {
    pub doc: DocumentModel,
    pub queue: RenderQueue,
    pub views: ViewRegistry,
    pub history: History,
}

impl EditorSession {
    pub fn new() -> Self {
        Self {
            doc: DocumentModel::new(),
            queue: RenderQueue::new(),
            views: ViewRegistry::new(),
            history: History::new(),
        }
    }

    /// Reset everything for a new document (or between test scenarios).
    /// Identity allocation restarts from 1.
    pub fn clear(&mut self) {
        self.queue
            .clear(&mut self.doc)
            .ok();
        self.doc.clear();
        self.views.clear();
        self.history.clear();
    }

    // ========================================================================
    // Render drain
    // ========================================================================

    /// Drain the render queue once, notifying each dirty entity's view handle
    /// at most once per signal kind, main tier (children changes) first.
    ///
    /// Entities without a registered handle are skipped silently but still
    /// reset to clean: an unmounted entity has nothing stale to show.
    pub fn render(&mut self) -> Result<()> {
        let mut notified = 0usize;
        while let Some(entity) = self.queue.pop(&mut self.doc)? {
            let state = self.doc.dirty_of(entity)?;
            self.doc.set_dirty(entity, crate::dirty::DirtyState::Clean)?;
            let Some(handle) = self.views.get_mut(entity) else {
                trace!(%entity, "no view handle, skipping");
                continue;
            };
            if state.wants_children() {
                handle.update_children(&self.doc, entity);
            }
            if state.wants_self() {
                handle.update_self(&self.doc, entity);
            }
            notified += 1;
        }
        debug!(notified, "render drain complete");
        Ok(())
    }

    /// View-layer callback for a successful first mount: registers the handle
    /// and flips `is_new`. Must be called synchronously from the mount path.
    pub fn confirm_mount(&mut self, entity: EntityRef, handle: Box<dyn ViewHandle>) -> Result<()> {
        match entity {
            EntityRef::Root => {}
            EntityRef::Node(id) => self.doc.node_mut(id)?.is_new = false,
            EntityRef::Leaf(id) => self.doc.leaf_mut(id)?.is_new = false,
        }
        self.views.register(entity, handle);
        Ok(())
    }

    /// View-layer callback for unmount: drops the handle.
    pub fn confirm_unmount(&mut self, entity: EntityRef) {
        self.views.unregister(entity);
    }

    // ========================================================================
    // Entity release
    // ========================================================================

    /// Drop a detached leaf from the arena once history can no longer
    /// resurrect it. Dequeues any pending render entry and drops the view
    /// handle first, so a later drain never sees the released id.
    pub fn release_leaf(&mut self, leaf: LeafId) -> Result<()> {
        if !self.doc.leaf(leaf)?.is_detached() {
            return Err(ModelError::AlreadyAttached);
        }
        let entity = EntityRef::Leaf(leaf);
        self.queue.remove(&mut self.doc, entity)?;
        self.views.unregister(entity);
        self.doc.release_leaf(leaf);
        Ok(())
    }

    /// Drop a detached node from the arena. Same lifecycle rules as
    /// [`release_leaf`](Self::release_leaf).
    pub fn release_node(&mut self, node: NodeId) -> Result<()> {
        {
            let entry = self.doc.node(node)?;
            if entry.parent.is_some() || entry.prev.is_some() || entry.next.is_some() {
                return Err(ModelError::AlreadyAttached);
            }
        }
        if self.doc.first_node() == Some(node) {
            return Err(ModelError::AlreadyAttached);
        }
        let entity = EntityRef::Node(node);
        self.queue.remove(&mut self.doc, entity)?;
        self.views.unregister(entity);
        self.doc.release_node(node);
        Ok(())
    }

    // ========================================================================
    // Undo / redo
    // ========================================================================

    /// Undo the most recent committed step. Returns `false` if there was
    /// nothing to undo.
    ///
    /// A stale descriptor aborts the whole step with an error before any part
    /// of it is applied to the tree (fail fast, no heuristic repair).
    pub fn undo(&mut self) -> Result<bool> {
        let Some(step) = self.history.take_undo() else {
            return Ok(false);
        };
        debug!(ops = step.len(), "undo step");
        let mut mirror = Vec::with_capacity(step.len());
        for op in step.into_replay_order() {
            let inverse = self.apply_rev_op(op)?;
            mirror.push(inverse);
        }
        self.history.push_future(HistoryStep::from_mirror(mirror));
        Ok(true)
    }

    /// Redo the most recently undone step. Returns `false` if there was
    /// nothing to redo.
    pub fn redo(&mut self) -> Result<bool> {
        let Some(step) = self.history.take_redo() else {
            return Ok(false);
        };
        debug!(ops = step.len(), "redo step");
        let mut mirror = Vec::with_capacity(step.len());
        for op in step.into_replay_order() {
            let inverse = self.apply_rev_op(op)?;
            mirror.push(inverse);
        }
        self.history.push_past(HistoryStep::from_mirror(mirror));
        Ok(true)
    }
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new()
    }
}
