//! Depth-first traversal without parent lookups.

use text_size::TextSize;

use super::Node;

#[derive(Clone, Copy)]
struct Frame<'t> {
    node: Node<'t>,
    /// Index of `node` among its parent's children.
    index: usize,
}

/// A mutable position in a tree.
///
/// The cursor keeps the chain of ancestors it walked through, so moving to
/// the parent or to the next sibling is constant time. A cursor created from a
/// node treats that node as its root.
#[derive(Clone)]
pub struct TreeCursor<'t> {
    stack: Vec<Frame<'t>>,
}

impl<'t> TreeCursor<'t> {
    pub(crate) fn new(node: Node<'t>) -> Self {
        Self {
            stack: vec![Frame { node, index: 0 }],
        }
    }

    fn top(&self) -> &Frame<'t> {
        // The stack always holds the cursor's root frame.
        &self.stack[self.stack.len() - 1]
    }

    /// The node the cursor is on.
    pub fn node(&self) -> Node<'t> {
        self.top().node
    }

    /// Distance from the node the cursor was created at.
    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }

    /// Move to the first child. Returns `false` at a leaf.
    pub fn goto_first_child(&mut self) -> bool {
        match self.node().children().next() {
            Some(child) => {
                self.stack.push(Frame {
                    node: child,
                    index: 0,
                });
                true
            }
            None => false,
        }
    }

    /// Move to the last child. Returns `false` at a leaf.
    pub fn goto_last_child(&mut self) -> bool {
        let children = self.node().children();
        let count = children.len();
        match children.last() {
            Some(child) => {
                self.stack.push(Frame {
                    node: child,
                    index: count - 1,
                });
                true
            }
            None => false,
        }
    }

    /// Move to the next sibling. Returns `false` at the last child or at the
    /// cursor's root.
    pub fn goto_next_sibling(&mut self) -> bool {
        if self.stack.len() < 2 {
            return false;
        }
        let parent = self.stack[self.stack.len() - 2].node;
        let current = *self.top();
        let Some(subtree) = parent.subtree().children().get(current.index + 1) else {
            return false;
        };
        let (start, point) = if parent.is_ambiguous() {
            (parent.start_byte(), parent.start_position())
        } else {
            (current.node.end_byte(), current.node.end_position())
        };
        let last = self.stack.len() - 1;
        self.stack[last] = Frame {
            node: Node::new(parent.tree(), subtree, start, point),
            index: current.index + 1,
        };
        true
    }

    /// Move to the parent. Returns `false` at the cursor's root.
    pub fn goto_parent(&mut self) -> bool {
        if self.stack.len() < 2 {
            return false;
        }
        self.stack.pop();
        true
    }

    /// Move to the first child that ends after `byte`, returning its index.
    pub fn goto_first_child_for_byte(&mut self, byte: TextSize) -> Option<usize> {
        let (index, child) = self
            .node()
            .children()
            .enumerate()
            .find(|(_, child)| child.end_byte() > byte)?;
        self.stack.push(Frame { node: child, index });
        Some(index)
    }

    /// Make `node` the cursor's new root.
    pub fn reset(&mut self, node: Node<'t>) {
        self.stack.clear();
        self.stack.push(Frame { node, index: 0 });
    }
}
