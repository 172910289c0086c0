//! Parse stack versions.
//!
//! Each version is a persistent singly linked stack: cloning a version is an
//! `Arc` bump, and versions forked at a conflict share everything below the
//! fork. Extras (whitespace, comments, error nodes) sit on the stack like
//! any other entry but never change the parse state.
//!
//! Every entry also records the external scanner state after it, so popping
//! entries rolls the scanner back along with the parse state.

use std::cmp::Ordering;
use std::sync::Arc;

use text_size::TextSize;

use crate::grammar::{Action, ScannerState, StateId};
use crate::syntax::Subtree;

#[derive(Debug)]
struct StackEntry {
    state: StateId,
    /// `None` only for the bottom entry.
    subtree: Option<Subtree>,
    extra: bool,
    /// Byte offset after this entry.
    position: TextSize,
    scanner: ScannerState,
    prev: Option<Arc<StackEntry>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Status {
    Active,
    /// No action for the lookahead; waiting for recovery or removal.
    Halted,
    Accepted,
}

/// The entries removed by a reduction.
pub(crate) struct Popped {
    pub(crate) children: Vec<Subtree>,
    /// Extras that sat above the popped children, bottom first.
    pub(crate) trailing: Vec<Subtree>,
}

/// One parse stack plus the bookkeeping needed to rank it.
#[derive(Debug, Clone)]
pub(crate) struct Version {
    top: Arc<StackEntry>,
    pub(crate) status: Status,
    pub(crate) error_cost: u32,
    pub(crate) dynamic_precedence: i32,
    /// Action chosen at a split, applied before looking at the table again.
    pub(crate) pending: Option<Action>,
    /// Reductions performed since the last shift.
    pub(crate) reductions: usize,
    /// Where a missing token was last inserted.
    pub(crate) missing_at: Option<TextSize>,
    /// Recoveries that skipped no input, and where they happened.
    pub(crate) stalls: (TextSize, u32),
}

impl Version {
    pub(crate) fn new(state: StateId) -> Self {
        Self {
            top: Arc::new(StackEntry {
                state,
                subtree: None,
                extra: false,
                position: TextSize::new(0),
                scanner: ScannerState::default(),
                prev: None,
            }),
            status: Status::Active,
            error_cost: 0,
            dynamic_precedence: 0,
            pending: None,
            reductions: 0,
            missing_at: None,
            stalls: (TextSize::new(0), 0),
        }
    }

    pub(crate) fn state(&self) -> StateId {
        self.top.state
    }

    pub(crate) fn position(&self) -> TextSize {
        self.top.position
    }

    pub(crate) fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    /// External scanner state after everything on the stack.
    pub(crate) fn scanner_state(&self) -> &ScannerState {
        &self.top.scanner
    }

    pub(crate) fn push(&mut self, state: StateId, subtree: Subtree, extra: bool) {
        self.top = stacked(state, subtree, extra, self.top.clone());
    }

    /// Pop `count` non-extra entries for a reduction.
    ///
    /// Extras between the popped entries become children; extras above them
    /// are returned separately so they can be pushed back on top of the new
    /// node. Returns `None` if the stack is too shallow, leaving it untouched.
    pub(crate) fn pop(&mut self, count: usize) -> Option<Popped> {
        if count == 0 {
            // Empty productions go on top, after any extras.
            return Some(Popped {
                children: Vec::new(),
                trailing: Vec::new(),
            });
        }
        let mut entry = self.top.clone();
        let mut trailing = Vec::new();
        while entry.extra {
            trailing.push(entry.subtree.clone()?);
            entry = entry.prev.clone()?;
        }
        trailing.reverse();

        let mut children = Vec::new();
        let mut taken = 0;
        while taken < count {
            let subtree = entry.subtree.clone()?;
            if !entry.extra {
                taken += 1;
            }
            children.push(subtree);
            entry = entry.prev.clone()?;
        }
        // Extras below the first child stay with the enclosing node.
        children.reverse();
        self.top = entry;
        Some(Popped { children, trailing })
    }

    /// Pop entries until `depth` non-extra entries are gone, returning every
    /// popped subtree in text order.
    pub(crate) fn pop_depth(&mut self, depth: usize) -> Option<Vec<Subtree>> {
        let mut entry = self.top.clone();
        let mut popped = Vec::new();
        let mut taken = 0;
        while taken < depth {
            popped.push(entry.subtree.clone()?);
            if !entry.extra {
                taken += 1;
            }
            entry = entry.prev.clone()?;
        }
        popped.reverse();
        self.top = entry;
        Some(popped)
    }

    /// The state exposed after popping 0, 1, 2, ... non-extra entries, up to
    /// `max_depth` pops or the bottom of the stack.
    pub(crate) fn states_by_depth(&self, max_depth: usize) -> Vec<StateId> {
        let mut states = vec![self.top.state];
        let mut entry = self.top.clone();
        while states.len() <= max_depth {
            while entry.extra {
                match entry.prev.clone() {
                    Some(prev) => entry = prev,
                    None => return states,
                }
            }
            let Some(prev) = entry.prev.clone() else {
                return states;
            };
            entry = prev;
            states.push(entry.state);
        }
        states
    }

    /// Every subtree on the stack, bottom first, with its extra flag.
    pub(crate) fn entries(&self) -> Vec<(Subtree, bool)> {
        let mut entries = Vec::new();
        let mut entry = Some(&self.top);
        while let Some(current) = entry {
            if let Some(subtree) = &current.subtree {
                entries.push((subtree.clone(), current.extra));
            }
            entry = current.prev.as_ref();
        }
        entries.reverse();
        entries
    }

    /// The topmost non-extra entry and the extras above it.
    fn core(&self) -> (&Arc<StackEntry>, Vec<&Subtree>) {
        let mut entry = &self.top;
        let mut extras = Vec::new();
        while entry.extra {
            match (&entry.subtree, &entry.prev) {
                (Some(subtree), Some(prev)) => {
                    extras.push(subtree);
                    entry = prev;
                }
                _ => break,
            }
        }
        (entry, extras)
    }

    /// Whether two versions reached the same configuration by different
    /// routes and can be folded into one.
    pub(crate) fn can_merge(&self, other: &Version) -> bool {
        if self.status != other.status
            || self.state() != other.state()
            || self.position() != other.position()
            || self.scanner_state() != other.scanner_state()
        {
            return false;
        }
        let (core, extras) = self.core();
        let (other_core, other_extras) = other.core();
        if extras.len() != other_extras.len()
            || !extras
                .iter()
                .zip(&other_extras)
                .all(|(a, b)| same_extra(a, b))
        {
            return false;
        }
        if Arc::ptr_eq(core, other_core) {
            return true;
        }
        match (&core.prev, &other_core.prev, &core.subtree, &other_core.subtree) {
            (Some(prev), Some(other_prev), Some(_), Some(_)) => Arc::ptr_eq(prev, other_prev),
            _ => false,
        }
    }

    /// Fold an equally good version into this one, recording both parses of
    /// the top entry in an ambiguity node.
    pub(crate) fn merge_ambiguous(&mut self, other: &Version) {
        let (core, extras) = self.core();
        let (other_core, _) = other.core();
        if Arc::ptr_eq(core, other_core) {
            return;
        }
        let (Some(subtree), Some(other_subtree)) = (&core.subtree, &other_core.subtree) else {
            return;
        };
        let alternatives = Subtree::ambiguity(vec![subtree.clone(), other_subtree.clone()]);
        let extras: Vec<Subtree> = extras.into_iter().rev().cloned().collect();
        let mut top = Arc::new(StackEntry {
            state: core.state,
            subtree: Some(alternatives),
            extra: false,
            position: core.position,
            scanner: core.scanner.clone(),
            prev: core.prev.clone(),
        });
        for extra in extras {
            top = stacked(top.state, extra, true, top);
        }
        self.top = top;
    }

    /// Ranking used for merges and for the version cap: lower error cost
    /// first, then higher dynamic precedence.
    pub(crate) fn compare(&self, other: &Version) -> Ordering {
        self.error_cost
            .cmp(&other.error_cost)
            .then_with(|| other.dynamic_precedence.cmp(&self.dynamic_precedence))
    }
}

fn stacked(state: StateId, subtree: Subtree, extra: bool, prev: Arc<StackEntry>) -> Arc<StackEntry> {
    let scanner = subtree
        .scanner_state()
        .cloned()
        .unwrap_or_else(|| prev.scanner.clone());
    Arc::new(StackEntry {
        state,
        position: prev.position + subtree.len(),
        subtree: Some(subtree),
        extra,
        scanner,
        prev: Some(prev),
    })
}

fn same_extra(a: &Subtree, b: &Subtree) -> bool {
    a.ptr_eq(b) || (a.is_leaf() && b.is_leaf() && a.symbol() == b.symbol() && a.len() == b.len())
}
