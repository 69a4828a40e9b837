//! High-level editing scenarios: inline styling with boundary splits and
//! merges, zero-leaf placeholders, and range deletion.

mod common;

use common::*;
use vellum::{LeafStylePatch, TextRange};

#[test]
fn bolding_a_mid_selection_splits_styles_and_merges() {
    let (mut session, node, leaves) =
        session_with_leaves(&[("Leaf 1", false), ("Leaf 2", true), ("Leaf 3", false)]);

    // Select from inside the first leaf to inside the last: "1Leaf 2Leaf".
    let range = TextRange::new(leaves[0], 5, leaves[2], 4);
    session
        .apply_leaf_styles(range, &LeafStylePatch::bold(true))
        .unwrap();

    assert_eq!(
        leaf_texts(&session, node),
        vec!["Leaf ", "1Leaf 2Leaf", " 3"]
    );
    assert_eq!(leaf_bold_flags(&session, node), vec![false, true, false]);
    assert_tree_consistent(&session.doc);
}

#[test]
fn bold_selection_returns_anchors_on_the_merged_leaf() {
    let (mut session, _node, leaves) =
        session_with_leaves(&[("Leaf 1", false), ("Leaf 2", true), ("Leaf 3", false)]);

    let range = TextRange::new(leaves[0], 5, leaves[2], 4);
    let adjusted = session
        .apply_leaf_styles(range, &LeafStylePatch::bold(true))
        .unwrap();

    assert_eq!(adjusted.start, adjusted.end);
    assert_eq!(adjusted.start_offset, 0);
    assert_eq!(adjusted.end_offset, 11);
    assert_eq!(
        session.doc.leaf(adjusted.start).unwrap().text,
        "1Leaf 2Leaf"
    );
}

#[test]
fn bold_scenario_undo_restores_the_original_leaves() {
    let (mut session, node, leaves) =
        session_with_leaves(&[("Leaf 1", false), ("Leaf 2", true), ("Leaf 3", false)]);

    let range = TextRange::new(leaves[0], 5, leaves[2], 4);
    session
        .apply_leaf_styles(range, &LeafStylePatch::bold(true))
        .unwrap();

    assert!(session.undo().unwrap());
    assert_eq!(
        leaf_texts(&session, node),
        vec!["Leaf 1", "Leaf 2", "Leaf 3"]
    );
    assert_eq!(leaf_bold_flags(&session, node), vec![false, true, false]);
    assert_tree_consistent(&session.doc);

    assert!(session.redo().unwrap());
    assert_eq!(
        leaf_texts(&session, node),
        vec!["Leaf ", "1Leaf 2Leaf", " 3"]
    );
    assert_tree_consistent(&session.doc);
}

#[test]
fn styling_an_already_styled_leaf_records_nothing() {
    let (mut session, node, leaves) =
        session_with_leaves(&[("Leaf 1", false), ("Leaf 2", true), ("Leaf 3", false)]);

    let range = TextRange::new(leaves[1], 0, leaves[1], 6);
    session
        .apply_leaf_styles(range, &LeafStylePatch::bold(true))
        .unwrap();

    assert!(!session.history.can_undo());
    assert_eq!(
        leaf_texts(&session, node),
        vec!["Leaf 1", "Leaf 2", "Leaf 3"]
    );
}

#[test]
fn inserting_into_a_zero_leaf_replaces_the_marker() {
    let (mut session, node, leaf) = session_with_zero_leaf();
    assert!(session.doc.leaf(leaf).unwrap().is_zero_leaf());
    assert_eq!(session.doc.text_of(node).unwrap(), "");

    let caret = session.insert_text(leaf, 0, "Leaf 9").unwrap();
    assert_eq!(session.doc.leaf(leaf).unwrap().text, "Leaf 9");
    assert!(!session.doc.leaf(leaf).unwrap().is_zero_leaf());
    assert!(caret.is_collapsed());
    assert_eq!(caret.end_offset, 6);

    assert!(session.undo().unwrap());
    assert!(session.doc.leaf(leaf).unwrap().is_zero_leaf());
    assert_eq!(session.doc.text_of(node).unwrap(), "");
}

#[test]
fn insert_text_mid_leaf_round_trip() {
    let (mut session, node, leaves) = session_with_leaves(&[("Leaf 1", false)]);

    let caret = session.insert_text(leaves[0], 4, "X").unwrap();
    assert_eq!(leaf_texts(&session, node), vec!["LeafX 1"]);
    assert_eq!(caret.end_offset, 5);

    assert!(session.undo().unwrap());
    assert_eq!(leaf_texts(&session, node), vec!["Leaf 1"]);
}

#[test]
fn insert_text_rejects_non_boundary_offsets() {
    let (mut session, _node, leaves) = session_with_leaves(&[("héllo", false)]);
    // Offset 2 lands inside the two-byte 'é'.
    assert!(session.insert_text(leaves[0], 2, "x").is_err());
    assert!(!session.history.can_undo());
}

#[test]
fn delete_within_a_single_leaf() {
    let (mut session, node, leaves) = session_with_leaves(&[("Leaf 1", false)]);

    let caret = session
        .delete_range(TextRange::new(leaves[0], 2, leaves[0], 4))
        .unwrap();
    assert_eq!(leaf_texts(&session, node), vec!["Le 1"]);
    assert_eq!(caret, TextRange::collapsed(leaves[0], 2));

    assert!(session.undo().unwrap());
    assert_eq!(leaf_texts(&session, node), vec!["Leaf 1"]);
}

#[test]
fn delete_across_leaves_unchains_and_merges() {
    let (mut session, node, leaves) =
        session_with_leaves(&[("Leaf 1", false), ("Leaf 2", false), ("Leaf 3", false)]);

    session
        .delete_range(TextRange::new(leaves[0], 4, leaves[2], 4))
        .unwrap();
    assert_eq!(session.doc.text_of(node).unwrap(), "Leaf 3");
    assert_eq!(session.doc.leaf_children(node).unwrap().len(), 1);
    assert_tree_consistent(&session.doc);

    assert!(session.undo().unwrap());
    assert_eq!(
        leaf_texts(&session, node),
        vec!["Leaf 1", "Leaf 2", "Leaf 3"]
    );
    assert_tree_consistent(&session.doc);
}

#[test]
fn deleting_everything_leaves_a_zero_leaf() {
    let (mut session, node, leaves) =
        session_with_leaves(&[("Leaf 1", false), ("Leaf 2", false)]);

    session
        .delete_range(TextRange::new(leaves[0], 0, leaves[1], 6))
        .unwrap();

    let children = session.doc.leaf_children(node).unwrap();
    assert_eq!(children.len(), 1);
    assert!(session.doc.leaf(children[0]).unwrap().is_zero_leaf());
    assert_eq!(session.doc.text_of(node).unwrap(), "");
    assert_tree_consistent(&session.doc);

    assert!(session.undo().unwrap());
    assert_eq!(leaf_texts(&session, node), vec!["Leaf 1", "Leaf 2"]);
}

#[test]
fn unstyling_merges_back_with_plain_neighbors() {
    let (mut session, node, leaves) =
        session_with_leaves(&[("ab", false), ("cd", true), ("ef", false)]);

    let range = TextRange::new(leaves[1], 0, leaves[1], 2);
    session
        .apply_leaf_styles(range, &LeafStylePatch::bold(false))
        .unwrap();

    assert_eq!(leaf_texts(&session, node), vec!["abcdef"]);
    assert_eq!(leaf_bold_flags(&session, node), vec![false]);
    assert_tree_consistent(&session.doc);
}
