//! Borrowed node handles with absolute positions.

use std::fmt;

use text_size::{TextRange, TextSize};

use super::{Subtree, Tree, TreeCursor};
use crate::base::{Point, PointRange};
use crate::grammar::Symbol;

/// A node of a [`Tree`], positioned in the source.
///
/// Handles are cheap to copy. They borrow the tree, so they can never outlive
/// it, and two trees derived from the same source can be read from different
/// threads at the same time.
#[derive(Clone, Copy)]
pub struct Node<'t> {
    tree: &'t Tree,
    subtree: &'t Subtree,
    start: TextSize,
    start_point: Point,
}

/// Stable identity of a node: equal for equivalent parses of the same text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub symbol: Symbol,
    pub range: TextRange,
}

impl<'t> Node<'t> {
    pub(crate) fn new(
        tree: &'t Tree,
        subtree: &'t Subtree,
        start: TextSize,
        start_point: Point,
    ) -> Self {
        Self {
            tree,
            subtree,
            start,
            start_point,
        }
    }

    pub fn tree(&self) -> &'t Tree {
        self.tree
    }

    pub fn subtree(&self) -> &'t Subtree {
        self.subtree
    }

    // ========================================================================
    // Kind and flags
    // ========================================================================

    pub fn symbol(&self) -> Symbol {
        self.subtree.symbol()
    }

    /// The grammar name of the node's symbol.
    pub fn kind(&self) -> &'t str {
        self.tree.grammar().symbol_name(self.subtree.symbol())
    }

    pub fn id(&self) -> NodeId {
        NodeId {
            symbol: self.symbol(),
            range: self.byte_range(),
        }
    }

    pub fn is_named(&self) -> bool {
        self.subtree.is_named()
    }

    pub fn is_extra(&self) -> bool {
        self.subtree.is_extra()
    }

    pub fn is_error(&self) -> bool {
        self.subtree.is_error()
    }

    pub fn is_missing(&self) -> bool {
        self.subtree.is_missing()
    }

    pub fn is_ambiguous(&self) -> bool {
        self.subtree.is_ambiguity()
    }

    pub fn is_leaf(&self) -> bool {
        self.subtree.is_leaf()
    }

    pub fn has_error(&self) -> bool {
        self.subtree.has_error()
    }

    pub fn has_changes(&self) -> bool {
        self.subtree.has_changes()
    }

    // ========================================================================
    // Position
    // ========================================================================

    pub fn start_byte(&self) -> TextSize {
        self.start
    }

    pub fn end_byte(&self) -> TextSize {
        self.start + self.subtree.len()
    }

    pub fn byte_range(&self) -> TextRange {
        TextRange::at(self.start, self.subtree.len())
    }

    pub fn start_position(&self) -> Point {
        self.start_point
    }

    pub fn end_position(&self) -> Point {
        self.start_point + self.subtree.extent()
    }

    pub fn point_range(&self) -> PointRange {
        PointRange::new(self.start_position(), self.end_position())
    }

    /// The source text this node spans, if `source` is the text it was parsed from.
    pub fn utf8_text<'s>(&self, source: &'s str) -> Option<&'s str> {
        source.get(std::ops::Range::<usize>::from(self.byte_range()))
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub fn child_count(&self) -> usize {
        self.subtree.children().len()
    }

    pub fn children(&self) -> Children<'t> {
        Children {
            tree: self.tree,
            parent: self.subtree,
            index: 0,
            start: self.start,
            point: self.start_point,
        }
    }

    pub fn child(&self, index: usize) -> Option<Node<'t>> {
        self.children().nth(index)
    }

    pub fn named_children(&self) -> impl Iterator<Item = Node<'t>> + 't {
        self.children().filter(|child| child.is_named())
    }

    pub fn named_child_count(&self) -> usize {
        self.named_children().count()
    }

    pub fn named_child(&self, index: usize) -> Option<Node<'t>> {
        self.named_children().nth(index)
    }

    /// The first child that ends after `byte`.
    pub fn first_child_for_byte(&self, byte: TextSize) -> Option<Node<'t>> {
        self.children().find(|child| child.end_byte() > byte)
    }

    /// The node's parent, found by searching down from the root.
    pub fn parent(&self) -> Option<Node<'t>> {
        let root = self.tree.root_node();
        if self.same_node(&root) {
            return None;
        }
        root.find_parent_of(self)
    }

    fn find_parent_of(&self, target: &Node<'t>) -> Option<Node<'t>> {
        for child in self.children() {
            if child.same_node(target) {
                return Some(*self);
            }
            if child.start_byte() <= target.start_byte() && target.end_byte() <= child.end_byte() {
                if let Some(parent) = child.find_parent_of(target) {
                    return Some(parent);
                }
            }
        }
        None
    }

    pub fn next_sibling(&self) -> Option<Node<'t>> {
        let parent = self.parent()?;
        let mut children = parent.children();
        children.find(|child| child.same_node(self))?;
        children.next()
    }

    pub fn prev_sibling(&self) -> Option<Node<'t>> {
        let parent = self.parent()?;
        let mut previous = None;
        for child in parent.children() {
            if child.same_node(self) {
                return previous;
            }
            previous = Some(child);
        }
        None
    }

    /// The smallest node that spans `range`.
    pub fn descendant_for_byte_range(&self, range: TextRange) -> Option<Node<'t>> {
        if !self.byte_range().contains_range(range) {
            return None;
        }
        let mut node = *self;
        loop {
            let next = node.children().find(|child| {
                let span = child.byte_range();
                if range.is_empty() {
                    span.start() <= range.start() && range.start() < span.end()
                } else {
                    span.contains_range(range)
                }
            });
            match next {
                Some(child) => node = child,
                None => return Some(node),
            }
        }
    }

    /// A cursor starting at this node. The cursor cannot move above it.
    pub fn walk(&self) -> TreeCursor<'t> {
        TreeCursor::new(*self)
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// S-expression of the named structure below this node.
    ///
    /// Anonymous tokens are left out; missing tokens print as
    /// `(MISSING name)` and alternative parses as `(AMBIGUITY ...)`.
    pub fn to_sexp(&self) -> String {
        let mut out = String::new();
        self.write_sexp(&mut out, true);
        out
    }

    fn write_sexp(&self, out: &mut String, is_root: bool) {
        let visible = is_root
            || self.is_named()
            || self.is_missing()
            || self.is_ambiguous()
            || self.symbol() == Symbol::ERROR;
        if visible {
            if !out.is_empty() && !out.ends_with('(') {
                out.push(' ');
            }
            out.push('(');
            if self.is_missing() {
                out.push_str("MISSING ");
            }
            out.push_str(self.kind());
        }
        for child in self.children() {
            child.write_sexp(out, false);
        }
        if visible {
            out.push(')');
        }
    }

    fn same_node(&self, other: &Node<'_>) -> bool {
        self.start == other.start && self.subtree.ptr_eq(other.subtree)
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.same_node(other)
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{:?} [{} - {}]",
            self.kind(),
            self.byte_range(),
            self.start_position(),
            self.end_position()
        )
    }
}

/// Iterator over the children of a node with their absolute positions.
///
/// Alternatives of an ambiguity node all start where the node starts.
#[derive(Clone)]
pub struct Children<'t> {
    tree: &'t Tree,
    parent: &'t Subtree,
    index: usize,
    start: TextSize,
    point: Point,
}

impl<'t> Iterator for Children<'t> {
    type Item = Node<'t>;

    fn next(&mut self) -> Option<Node<'t>> {
        let child = self.parent.children().get(self.index)?;
        let node = Node::new(self.tree, child, self.start, self.point);
        if !self.parent.is_ambiguity() {
            self.start += child.len();
            self.point = self.point + child.extent();
        }
        self.index += 1;
        Some(node)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.parent.children().len() - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Children<'_> {}
