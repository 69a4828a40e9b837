//! Shared test helpers for integration tests
//!
//! Note: Functions may appear unused because each test file compiles separately.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use vellum::{
    ChildRef, DocumentModel, EditorSession, EntityRef, LeafId, LeafKind, LeafStyles, NodeId,
    NodeType, ViewHandle, ZERO_LEAF_MARKER,
};

/// Build a session with one paragraph holding the given `(text, bold)` leaves.
pub fn session_with_leaves(specs: &[(&str, bool)]) -> (EditorSession, NodeId, Vec<LeafId>) {
    let mut session = EditorSession::new();
    let node = session.doc.create_node(NodeType::Paragraph, None);
    session
        .set_parent_link(ChildRef::Node(node), None)
        .expect("attach node at root");

    let mut leaves = Vec::new();
    for (i, (text, bold)) in specs.iter().enumerate() {
        let styles = if *bold {
            LeafStyles::plain().with_bold(true)
        } else {
            LeafStyles::plain()
        };
        let leaf = session.doc.create_leaf(*text, styles, LeafKind::Text);
        if i == 0 {
            session
                .set_parent_link(ChildRef::Leaf(leaf), Some(node))
                .expect("attach first leaf");
        } else {
            session
                .chain_leaf(leaf, leaves[i - 1])
                .expect("chain leaf");
        }
        leaves.push(leaf);
    }
    (session, node, leaves)
}

/// Build a session with one zero leaf in one paragraph.
pub fn session_with_zero_leaf() -> (EditorSession, NodeId, LeafId) {
    let (session, node, leaves) = session_with_leaves(&[(ZERO_LEAF_MARKER, false)]);
    (session, node, leaves[0])
}

/// Texts of a node's leaf chain, in order (raw, including zero markers).
pub fn leaf_texts(session: &EditorSession, node: NodeId) -> Vec<String> {
    session
        .doc
        .leaf_children(node)
        .expect("leaf children")
        .iter()
        .map(|id| session.doc.leaf(*id).expect("leaf").text.clone())
        .collect()
}

/// Bold flags of a node's leaf chain, in order.
pub fn leaf_bold_flags(session: &EditorSession, node: NodeId) -> Vec<bool> {
    session
        .doc
        .leaf_children(node)
        .expect("leaf children")
        .iter()
        .map(|id| session.doc.leaf(*id).expect("leaf").styles.bold)
        .collect()
}

/// Assert both structural invariants hold.
pub fn assert_tree_consistent(doc: &DocumentModel) {
    doc.check_chain_integrity().expect("chain integrity");
    doc.check_parent_homogeneity().expect("parent homogeneity");
}

/// One recorded view notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    SelfOf(EntityRef),
    ChildrenOf(EntityRef),
}

/// Shared log of notifications across all counting handles in a test.
pub type NotificationLog = Rc<RefCell<Vec<Notification>>>;

pub fn notification_log() -> NotificationLog {
    Rc::new(RefCell::new(Vec::new()))
}

/// A view handle that appends every signal to a shared log.
pub struct CountingHandle {
    log: NotificationLog,
}

impl CountingHandle {
    pub fn new(log: &NotificationLog) -> Box<Self> {
        Box::new(Self {
            log: Rc::clone(log),
        })
    }
}

impl ViewHandle for CountingHandle {
    fn update_self(&mut self, _doc: &DocumentModel, entity: EntityRef) {
        self.log.borrow_mut().push(Notification::SelfOf(entity));
    }

    fn update_children(&mut self, _doc: &DocumentModel, entity: EntityRef) {
        self.log.borrow_mut().push(Notification::ChildrenOf(entity));
    }
}

/// Register counting handles for the root, a node, and a set of leaves.
pub fn mount_all(
    session: &mut EditorSession,
    node: NodeId,
    leaves: &[LeafId],
    log: &NotificationLog,
) {
    session
        .confirm_mount(EntityRef::Root, CountingHandle::new(log))
        .expect("mount root");
    session
        .confirm_mount(EntityRef::Node(node), CountingHandle::new(log))
        .expect("mount node");
    for leaf in leaves {
        session
            .confirm_mount(EntityRef::Leaf(*leaf), CountingHandle::new(log))
            .expect("mount leaf");
    }
}
