//! View-handle registry - the seam between the core and the view layer.
//!
//! The view layer registers a handle per mounted entity and must unregister
//! on unmount; the core never polls or infers mount state. The drain resolves
//! handles through this registry and silently skips entities with none (not
//! yet mounted, or unmounted mid-batch).

use std::collections::HashMap;

use crate::doc::DocumentModel;
use crate::id::EntityRef;

/// Signals a mounted view receives during a drain.
///
/// Each method is invoked at most once per drain. `update_self` means the
/// entity's own representation (text, style, type) changed; `update_children`
/// means its child collection must re-enumerate. Deciding whether an update
/// would actually change pixels is the view's concern, not the queue's.
pub trait ViewHandle {
    fn update_self(&mut self, doc: &DocumentModel, entity: EntityRef);
    fn update_children(&mut self, doc: &DocumentModel, entity: EntityRef);
}

/// Explicit entity-to-view registry with a manual lifecycle: `register` on
/// mount, `unregister` on unmount. No weak-reference magic; teardown that
/// skips `unregister` leaks the handle for the session's lifetime.
#[derive(Default)]
pub struct ViewRegistry {
    handles: HashMap<EntityRef, Box<dyn ViewHandle>>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a handle for `entity`, replacing any previous one.
    pub fn register(&mut self, entity: EntityRef, handle: Box<dyn ViewHandle>) {
        self.handles.insert(entity, handle);
    }

    /// Detach the handle for `entity`, returning it if present.
    pub fn unregister(&mut self, entity: EntityRef) -> Option<Box<dyn ViewHandle>> {
        self.handles.remove(&entity)
    }

    pub fn get_mut(&mut self, entity: EntityRef) -> Option<&mut Box<dyn ViewHandle>> {
        self.handles.get_mut(&entity)
    }

    pub fn contains(&self, entity: EntityRef) -> bool {
        self.handles.contains_key(&entity)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Drop every handle (document unload / test reset).
    pub fn clear(&mut self) {
        self.handles.clear();
    }
}

impl std::fmt::Debug for ViewRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewRegistry")
            .field("handles", &self.handles.len())
            .finish()
    }
}
