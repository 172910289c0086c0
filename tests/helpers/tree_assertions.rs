//! Structural assertions on parsed trees.

use arbor::{Parser, TextSize, Tree};
use arbor::syntax::Subtree;

/// Assert the tree is well-formed and its leaves spell out `text`.
pub fn assert_covers(tree: &Tree, text: &str) {
    assert_eq!(
        tree.len(),
        TextSize::of(text),
        "tree length differs from text {:?}",
        text
    );
    if let Err(message) = tree.check_invariants() {
        panic!("invariant violated for {:?}: {}\n{}", text, message, tree.to_sexp());
    }
    let joined: String = tree
        .leaves()
        .iter()
        .map(|leaf| {
            leaf.utf8_text(text)
                .unwrap_or_else(|| panic!("leaf {:?} outside {:?}", leaf, text))
        })
        .collect();
    assert_eq!(joined, text, "leaves do not spell out the text");
}

/// Assert an incremental result has the same structure as a fresh parse.
pub fn assert_matches_fresh_parse(parser: &Parser, tree: &Tree, text: &str) {
    let fresh = parser.parse(text).unwrap();
    assert_eq!(
        tree.to_sexp(),
        fresh.to_sexp(),
        "incremental parse of {:?} differs from a fresh parse",
        text
    );
    assert_covers(tree, text);
}

/// Whether `target` appears, by identity, anywhere below `root`.
pub fn shares_subtree(root: &Subtree, target: &Subtree) -> bool {
    root.ptr_eq(target) || root.children().iter().any(|child| shares_subtree(child, target))
}
