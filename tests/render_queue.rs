//! Render queue behavior: coalescing, tier ordering, and drain semantics
//! observed through counting view handles.

mod common;

use common::*;
use vellum::{EntityRef, LeafKind, LeafStyles, NodeType};

/// Drain whatever the fixture construction queued, then start logging.
fn settled(
    specs: &[(&str, bool)],
) -> (
    vellum::EditorSession,
    vellum::NodeId,
    Vec<vellum::LeafId>,
    NotificationLog,
) {
    let (mut session, node, leaves) = session_with_leaves(specs);
    session.render().unwrap();
    let log = notification_log();
    mount_all(&mut session, node, &leaves, &log);
    (session, node, leaves, log)
}

#[test]
fn repeated_marks_notify_once_per_drain() {
    let (mut session, _node, leaves, log) = settled(&[("a", false)]);

    session.set_leaf_text(leaves[0], "one").unwrap();
    session.set_leaf_text(leaves[0], "two").unwrap();
    session.set_leaf_text(leaves[0], "three").unwrap();
    session.render().unwrap();

    assert_eq!(
        log.borrow().as_slice(),
        &[Notification::SelfOf(EntityRef::Leaf(leaves[0]))]
    );
}

#[test]
fn children_changes_drain_before_self_changes() {
    let (mut session, node, leaves, log) = settled(&[("a", false), ("b", false)]);

    // Low-tier entry first, main-tier entry second; the drain still serves
    // the structural change first.
    session.set_leaf_text(leaves[0], "edited").unwrap();
    let extra = session
        .doc
        .create_leaf("extra", LeafStyles::plain(), LeafKind::Text);
    session.chain_leaf(extra, leaves[1]).unwrap();
    session.render().unwrap();

    assert_eq!(
        log.borrow().as_slice(),
        &[
            Notification::ChildrenOf(EntityRef::Node(node)),
            Notification::SelfOf(EntityRef::Leaf(leaves[0])),
        ]
    );
}

#[test]
fn self_then_children_escalates_to_one_full_notification() {
    let (mut session, node, leaves, log) = settled(&[("a", false)]);

    session.set_node_type(node, NodeType::Quote).unwrap();
    let extra = session
        .doc
        .create_leaf("extra", LeafStyles::plain(), LeafKind::Text);
    session.chain_leaf(extra, leaves[0]).unwrap();
    session.render().unwrap();

    // One queue entry, both signals, children first.
    assert_eq!(
        log.borrow().as_slice(),
        &[
            Notification::ChildrenOf(EntityRef::Node(node)),
            Notification::SelfOf(EntityRef::Node(node)),
        ]
    );
}

#[test]
fn drain_resets_entities_to_clean() {
    let (mut session, _node, leaves, log) = settled(&[("a", false)]);

    session.set_leaf_text(leaves[0], "edited").unwrap();
    session.render().unwrap();
    assert!(session.queue.is_empty());

    log.borrow_mut().clear();
    session.render().unwrap();
    assert!(log.borrow().is_empty());
}

#[test]
fn unmounted_entities_are_skipped_but_still_cleaned() {
    let (mut session, _node, leaves) = session_with_leaves(&[("a", false)]);
    session.render().unwrap();

    session.set_leaf_text(leaves[0], "edited").unwrap();
    session.render().unwrap();
    assert!(session.queue.is_empty());

    // Mounting afterwards does not replay the missed notification.
    let log = notification_log();
    session
        .confirm_mount(EntityRef::Leaf(leaves[0]), CountingHandle::new(&log))
        .unwrap();
    session.render().unwrap();
    assert!(log.borrow().is_empty());
}

#[test]
fn mutations_before_mount_mark_entities_new() {
    let (mut session, node, leaves) = session_with_leaves(&[("a", false)]);
    assert!(session.doc.leaf(leaves[0]).unwrap().is_new);
    assert!(session.doc.node(node).unwrap().is_new);

    let log = notification_log();
    mount_all(&mut session, node, &leaves, &log);
    assert!(!session.doc.leaf(leaves[0]).unwrap().is_new);
    assert!(!session.doc.node(node).unwrap().is_new);
}

#[test]
fn unmount_stops_notifications() {
    let (mut session, _node, leaves, log) = settled(&[("a", false)]);

    session.confirm_unmount(EntityRef::Leaf(leaves[0]));
    session.set_leaf_text(leaves[0], "edited").unwrap();
    session.render().unwrap();

    assert!(log.borrow().is_empty());
}

#[test]
fn releasing_a_queued_leaf_dequeues_it() {
    let (mut session, node, leaves, log) = settled(&[("a", false), ("b", false)]);

    // Queue the leaf (low tier), then detach and release it before the drain.
    session.set_leaf_text(leaves[1], "edited").unwrap();
    session.unchain_leaf(leaves[1]).unwrap();
    session.release_leaf(leaves[1]).unwrap();
    assert!(session.doc.leaf(leaves[1]).is_err());

    session.render().unwrap();
    assert_eq!(
        log.borrow().as_slice(),
        &[Notification::ChildrenOf(EntityRef::Node(node))]
    );
    assert!(session.queue.is_empty());
}

#[test]
fn release_refuses_attached_entities() {
    let (mut session, node, leaves, _log) = settled(&[("a", false)]);
    assert!(session.release_leaf(leaves[0]).is_err());
    assert!(session.release_node(node).is_err());
    assert!(session.doc.leaf(leaves[0]).is_ok());
    assert!(session.doc.node(node).is_ok());
}

#[test]
fn root_is_notified_for_top_level_structure_changes() {
    let (mut session, first, _leaves, log) = settled(&[("a", false)]);

    let second = session.doc.create_node(NodeType::Paragraph, None);
    session.chain_node(second, first).unwrap();
    session.render().unwrap();

    assert_eq!(
        log.borrow().as_slice(),
        &[Notification::ChildrenOf(EntityRef::Root)]
    );
}
