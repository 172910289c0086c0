//! The syntax tree produced by a parse.

use std::fmt;
use std::sync::Arc;

use text_size::TextSize;

use super::{Node, Subtree, TreeCursor};
use crate::base::Point;
use crate::grammar::{Grammar, Symbol};

/// A concrete syntax tree and the grammar it was built against.
///
/// Trees are immutable. Editing one produces a new tree that shares every
/// subtree the edit did not touch, so old and new trees coexist cheaply.
#[derive(Clone)]
pub struct Tree {
    root: Subtree,
    grammar: Arc<Grammar>,
}

impl Tree {
    pub(crate) fn new(root: Subtree, grammar: Arc<Grammar>) -> Self {
        Self { root, grammar }
    }

    pub fn root_node(&self) -> Node<'_> {
        Node::new(self, &self.root, TextSize::new(0), Point::ZERO)
    }

    pub fn root_subtree(&self) -> &Subtree {
        &self.root
    }

    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    /// Length of the text the tree covers.
    pub fn len(&self) -> TextSize {
        self.root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// A cursor at the root.
    pub fn walk(&self) -> TreeCursor<'_> {
        self.root_node().walk()
    }

    /// Whether an edit has been applied since the tree was parsed.
    pub fn has_changes(&self) -> bool {
        self.root.has_changes()
    }

    pub fn has_error(&self) -> bool {
        self.root.has_error()
    }

    pub fn to_sexp(&self) -> String {
        self.root_node().to_sexp()
    }

    /// All leaves in source order. Ambiguity nodes contribute their first
    /// alternative only.
    pub fn leaves(&self) -> Vec<Node<'_>> {
        let mut leaves = Vec::new();
        let mut stack = vec![self.root_node()];
        while let Some(node) = stack.pop() {
            if node.is_ambiguous() {
                stack.extend(node.child(0));
            } else if node.child_count() == 0 {
                if node.is_leaf() {
                    leaves.push(node);
                }
            } else {
                let children: Vec<_> = node.children().collect();
                stack.extend(children.into_iter().rev());
            }
        }
        leaves
    }

    /// Check the structural invariants of the tree.
    ///
    /// Every internal node spans exactly its children, and the alternatives
    /// of an ambiguity node all span the same bytes.
    pub fn check_invariants(&self) -> Result<(), String> {
        check_subtree(&self.grammar, &self.root, TextSize::new(0))
    }
}

fn check_subtree(grammar: &Grammar, subtree: &Subtree, start: TextSize) -> Result<(), String> {
    let children = subtree.children();
    if subtree.is_ambiguity() {
        for alternative in children {
            if alternative.len() != subtree.len() || alternative.extent() != subtree.extent() {
                return Err(format!(
                    "alternative {} at {:?} does not span its ambiguity node",
                    grammar.symbol_name(alternative.symbol()),
                    start
                ));
            }
            check_subtree(grammar, alternative, start)?;
        }
        return Ok(());
    }
    if children.is_empty() {
        return Ok(());
    }

    let mut offset = start;
    let mut extent = Point::ZERO;
    let mut has_error = subtree.symbol() == Symbol::ERROR;
    for child in children {
        check_subtree(grammar, child, offset)?;
        offset += child.len();
        extent = extent + child.extent();
        has_error |= child.has_error();
    }
    if offset - start != subtree.len() {
        return Err(format!(
            "{} at {:?} has length {:?} but its children cover {:?}",
            grammar.symbol_name(subtree.symbol()),
            start,
            subtree.len(),
            offset - start
        ));
    }
    if extent != subtree.extent() {
        return Err(format!(
            "{} at {:?} has extent {} but its children cover {}",
            grammar.symbol_name(subtree.symbol()),
            start,
            subtree.extent(),
            extent
        ));
    }
    if has_error != subtree.has_error() {
        return Err(format!(
            "{} at {:?} has a stale error flag",
            grammar.symbol_name(subtree.symbol()),
            start
        ));
    }
    Ok(())
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("grammar", self.grammar.id())
            .field("root", &self.to_sexp())
            .finish()
    }
}
