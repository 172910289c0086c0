//! Walk over the previous tree in text order, offering subtrees for reuse.

use text_size::TextSize;

use crate::grammar::ScannerState;
use crate::syntax::Subtree;

#[derive(Debug, Clone)]
struct Entry {
    subtree: Subtree,
    start: TextSize,
    child_index: usize,
}

/// Position in the old tree: the current subtree is the leftmost node that
/// starts at or after everything already consumed.
#[derive(Debug, Clone)]
pub(crate) struct ReusableNode {
    stack: Vec<Entry>,
    /// External scanner state the old parse had before the current subtree.
    scanner: ScannerState,
}

impl ReusableNode {
    pub(crate) fn new(root: Subtree) -> Self {
        Self {
            stack: vec![Entry {
                subtree: root,
                start: TextSize::new(0),
                child_index: 0,
            }],
            scanner: ScannerState::default(),
        }
    }

    /// The current candidate and its start offset.
    pub(crate) fn current(&self) -> Option<(&Subtree, TextSize)> {
        self.stack.last().map(|entry| (&entry.subtree, entry.start))
    }

    pub(crate) fn scanner_state(&self) -> &ScannerState {
        &self.scanner
    }

    /// Move past the current subtree to the next one in text order.
    pub(crate) fn advance(&mut self) {
        let Some(last) = self.stack.last() else {
            return;
        };
        let next_start = last.start + last.subtree.len();
        if let Some(state) = last.subtree.scanner_state() {
            self.scanner = state.clone();
        }
        while let Some(popped) = self.stack.pop() {
            let Some(parent) = self.stack.last() else {
                return;
            };
            // Alternatives of an ambiguity cover the same bytes; only the
            // first one is walked.
            if parent.subtree.is_ambiguity() {
                continue;
            }
            let index = popped.child_index + 1;
            if let Some(sibling) = parent.subtree.children().get(index) {
                let sibling = sibling.clone();
                self.stack.push(Entry {
                    subtree: sibling,
                    start: next_start,
                    child_index: index,
                });
                return;
            }
        }
    }

    /// Move to the first child of the current subtree. Returns false for leaves.
    pub(crate) fn descend(&mut self) -> bool {
        let Some(last) = self.stack.last() else {
            return false;
        };
        let Some(first) = last.subtree.children().first() else {
            return false;
        };
        let entry = Entry {
            subtree: first.clone(),
            start: last.start,
            child_index: 0,
        };
        self.stack.push(entry);
        true
    }

    /// Descend if possible, otherwise advance.
    pub(crate) fn step_in(&mut self) {
        if !self.descend() {
            self.advance();
        }
    }
}
