//! Render queue - two-tier dirty stack with at-most-once drain semantics.
//!
//! The main tier holds entities whose child collection must re-render
//! (`Children`/`Full`); the low tier holds `SelfOnly` entries. Draining
//! exhausts the main tier first. Within a tier the queue is LIFO: re-marking
//! an entity moves it to the tail, so the last-marked entity drains first.
//!
//! Moves and escalations leave a tombstone at the old slot instead of
//! shifting the vector; each entity remembers its own slot, so a move is
//! O(1). Tombstones are physically compacted only when a tier's logical
//! size reaches zero.

use tracing::trace;

use crate::dirty::{DirtyMark, DirtyState};
use crate::doc::DocumentModel;
use crate::error::Result;
use crate::id::EntityRef;

/// Which tier an entry sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// `Children` / `Full` entries. Drained first.
    Main,
    /// `SelfOnly` entries.
    Low,
}

/// An entity's current position in the queue, stored on the entity itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSlot {
    pub tier: Tier,
    pub index: usize,
}

fn tier_for(state: DirtyState) -> Tier {
    match state {
        DirtyState::SelfOnly => Tier::Low,
        // Clean never reaches tier selection; Children/Full go to main.
        _ => Tier::Main,
    }
}

/// The dirty queue for one editing session.
#[derive(Debug, Default)]
pub struct RenderQueue {
    main: Vec<Option<EntityRef>>,
    low: Vec<Option<EntityRef>>,
    main_live: usize,
    low_live: usize,
}

impl RenderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (non-tombstone) entries across both tiers.
    pub fn len(&self) -> usize {
        self.main_live + self.low_live
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mark `entity` dirty and (re)position it in the queue.
    ///
    /// Joins the mark into the entity's dirty state; if the entity is already
    /// queued at the tail of the right tier this is a no-op. Escalation from
    /// `SelfOnly` to `Full` migrates the entry from the low tier to the main
    /// tier. By construction `Children` entries start in the main tier, so no
    /// migration in the other direction exists.
    pub fn mark(&mut self, doc: &mut DocumentModel, entity: EntityRef, mark: DirtyMark) -> Result<()> {
        let old = doc.dirty_of(entity)?;
        let new = old.join(mark);
        doc.set_dirty(entity, new)?;
        let target = tier_for(new);

        match doc.slot_of(entity)? {
            None => {
                let slot = self.push(target, entity);
                doc.set_slot(entity, Some(slot))?;
                trace!(%entity, ?mark, ?new, "queued for render");
            }
            Some(slot) => {
                if slot.tier == target && self.is_tail(slot) {
                    // Already at the drain front of the right tier.
                    return Ok(());
                }
                self.tombstone(slot);
                let fresh = self.push(target, entity);
                doc.set_slot(entity, Some(fresh))?;
                if slot.tier != target {
                    trace!(%entity, "escalated to main tier");
                }
            }
        }
        Ok(())
    }

    /// Pop the next entity to notify: main tier first, LIFO within a tier,
    /// tombstones skipped. Clears the entity's slot.
    pub fn pop(&mut self, doc: &mut DocumentModel) -> Result<Option<EntityRef>> {
        if let Some(entity) = Self::pop_tier(&mut self.main, &mut self.main_live) {
            doc.set_slot(entity, None)?;
            return Ok(Some(entity));
        }
        if let Some(entity) = Self::pop_tier(&mut self.low, &mut self.low_live) {
            doc.set_slot(entity, None)?;
            return Ok(Some(entity));
        }
        Ok(None)
    }

    /// Drop `entity`'s pending entry, if any, clearing its slot and dirty
    /// state. Must be called before the entity leaves the arena; a drain
    /// never sees a released id.
    pub fn remove(&mut self, doc: &mut DocumentModel, entity: EntityRef) -> Result<()> {
        if let Some(slot) = doc.slot_of(entity)? {
            self.tombstone(slot);
            doc.set_slot(entity, None)?;
        }
        doc.set_dirty(entity, DirtyState::Clean)?;
        Ok(())
    }

    /// Drop every queued entry, clearing the entities' slots and dirty state.
    pub fn clear(&mut self, doc: &mut DocumentModel) -> Result<()> {
        while let Some(entity) = self.pop(doc)? {
            doc.set_dirty(entity, DirtyState::Clean)?;
        }
        Ok(())
    }

    fn push(&mut self, tier: Tier, entity: EntityRef) -> QueueSlot {
        let (vec, live) = self.tier_mut(tier);
        vec.push(Some(entity));
        *live += 1;
        QueueSlot {
            tier,
            index: vec.len() - 1,
        }
    }

    fn tombstone(&mut self, slot: QueueSlot) {
        let (vec, live) = self.tier_mut(slot.tier);
        vec[slot.index] = None;
        *live -= 1;
        // Compact only when nothing live remains in the tier.
        if *live == 0 {
            vec.clear();
        }
    }

    fn is_tail(&self, slot: QueueSlot) -> bool {
        let vec = match slot.tier {
            Tier::Main => &self.main,
            Tier::Low => &self.low,
        };
        slot.index + 1 == vec.len()
    }

    fn tier_mut(&mut self, tier: Tier) -> (&mut Vec<Option<EntityRef>>, &mut usize) {
        match tier {
            Tier::Main => (&mut self.main, &mut self.main_live),
            Tier::Low => (&mut self.low, &mut self.low_live),
        }
    }

    fn pop_tier(vec: &mut Vec<Option<EntityRef>>, live: &mut usize) -> Option<EntityRef> {
        while let Some(slot) = vec.pop() {
            if let Some(entity) = slot {
                *live -= 1;
                return Some(entity);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::NodeId;
    use crate::node::NodeType;

    fn setup() -> (DocumentModel, RenderQueue, NodeId, NodeId) {
        let mut doc = DocumentModel::new();
        let a = doc.create_node(NodeType::Paragraph, None);
        let b = doc.create_node(NodeType::Paragraph, None);
        (doc, RenderQueue::new(), a, b)
    }

    #[test]
    fn main_tier_drains_before_low_tier() {
        let (mut doc, mut queue, a, b) = setup();
        queue
            .mark(&mut doc, EntityRef::Node(a), DirtyMark::SelfOnly)
            .unwrap();
        queue
            .mark(&mut doc, EntityRef::Node(b), DirtyMark::Children)
            .unwrap();
        assert_eq!(queue.pop(&mut doc).unwrap(), Some(EntityRef::Node(b)));
        assert_eq!(queue.pop(&mut doc).unwrap(), Some(EntityRef::Node(a)));
        assert_eq!(queue.pop(&mut doc).unwrap(), None);
    }

    #[test]
    fn remark_moves_to_tail() {
        let (mut doc, mut queue, a, b) = setup();
        queue
            .mark(&mut doc, EntityRef::Node(a), DirtyMark::Children)
            .unwrap();
        queue
            .mark(&mut doc, EntityRef::Node(b), DirtyMark::Children)
            .unwrap();
        // Re-marking `a` moves it past `b`; LIFO drains `a` first.
        queue
            .mark(&mut doc, EntityRef::Node(a), DirtyMark::Children)
            .unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop(&mut doc).unwrap(), Some(EntityRef::Node(a)));
        assert_eq!(queue.pop(&mut doc).unwrap(), Some(EntityRef::Node(b)));
    }

    #[test]
    fn remark_at_tail_is_noop() {
        let (mut doc, mut queue, a, _) = setup();
        queue
            .mark(&mut doc, EntityRef::Node(a), DirtyMark::Children)
            .unwrap();
        let slot = doc.slot_of(EntityRef::Node(a)).unwrap();
        queue
            .mark(&mut doc, EntityRef::Node(a), DirtyMark::Children)
            .unwrap();
        assert_eq!(doc.slot_of(EntityRef::Node(a)).unwrap(), slot);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn escalation_migrates_low_to_main() {
        let (mut doc, mut queue, a, b) = setup();
        queue
            .mark(&mut doc, EntityRef::Node(a), DirtyMark::SelfOnly)
            .unwrap();
        queue
            .mark(&mut doc, EntityRef::Node(b), DirtyMark::SelfOnly)
            .unwrap();
        // Escalate `a`: it leaves a tombstone in the low tier and joins main.
        queue
            .mark(&mut doc, EntityRef::Node(a), DirtyMark::Children)
            .unwrap();
        assert_eq!(doc.dirty_of(EntityRef::Node(a)).unwrap(), DirtyState::Full);
        assert_eq!(queue.pop(&mut doc).unwrap(), Some(EntityRef::Node(a)));
        assert_eq!(queue.pop(&mut doc).unwrap(), Some(EntityRef::Node(b)));
        assert_eq!(queue.pop(&mut doc).unwrap(), None);
    }

    #[test]
    fn children_entries_never_leave_main_tier() {
        // An entity marked Children starts in the main tier; adding SelfOnly
        // escalates the state to Full but the entry stays in main.
        let (mut doc, mut queue, a, _) = setup();
        queue
            .mark(&mut doc, EntityRef::Node(a), DirtyMark::Children)
            .unwrap();
        let before = doc.slot_of(EntityRef::Node(a)).unwrap().unwrap();
        assert_eq!(before.tier, Tier::Main);
        queue
            .mark(&mut doc, EntityRef::Node(a), DirtyMark::SelfOnly)
            .unwrap();
        let after = doc.slot_of(EntityRef::Node(a)).unwrap().unwrap();
        assert_eq!(after.tier, Tier::Main);
        assert_eq!(doc.dirty_of(EntityRef::Node(a)).unwrap(), DirtyState::Full);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn tier_compacts_when_logical_size_hits_zero() {
        let (mut doc, mut queue, a, b) = setup();
        queue
            .mark(&mut doc, EntityRef::Node(a), DirtyMark::SelfOnly)
            .unwrap();
        queue
            .mark(&mut doc, EntityRef::Node(b), DirtyMark::SelfOnly)
            .unwrap();
        // Escalate both: low tier becomes all tombstones and compacts.
        queue
            .mark(&mut doc, EntityRef::Node(a), DirtyMark::Children)
            .unwrap();
        queue
            .mark(&mut doc, EntityRef::Node(b), DirtyMark::Children)
            .unwrap();
        assert!(queue.low.is_empty());
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn remove_drops_the_pending_entry() {
        let (mut doc, mut queue, a, b) = setup();
        queue
            .mark(&mut doc, EntityRef::Node(a), DirtyMark::SelfOnly)
            .unwrap();
        queue
            .mark(&mut doc, EntityRef::Node(b), DirtyMark::Children)
            .unwrap();
        queue.remove(&mut doc, EntityRef::Node(a)).unwrap();

        assert_eq!(doc.dirty_of(EntityRef::Node(a)).unwrap(), DirtyState::Clean);
        assert_eq!(doc.slot_of(EntityRef::Node(a)).unwrap(), None);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop(&mut doc).unwrap(), Some(EntityRef::Node(b)));
        assert_eq!(queue.pop(&mut doc).unwrap(), None);
    }

    #[test]
    fn root_is_queueable() {
        let (mut doc, mut queue, _, _) = setup();
        queue
            .mark(&mut doc, EntityRef::Root, DirtyMark::Children)
            .unwrap();
        assert_eq!(queue.pop(&mut doc).unwrap(), Some(EntityRef::Root));
    }
}
