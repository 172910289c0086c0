//! Applying text edits to a tree.
//!
//! [`Tree::edit`] is pure position bookkeeping: it rebuilds the nodes along
//! the paths that touch the edit with remapped sizes and marks them as
//! changed. Everything else is shared with the old tree. The reparse that
//! follows decides what can actually be reused.

use text_size::{TextRange, TextSize};
use thiserror::Error;

use super::{Subtree, Tree};
use crate::base::{LineIndex, Point};

/// One contiguous replacement, in both byte and row/column coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputEdit {
    pub start_byte: TextSize,
    pub old_end_byte: TextSize,
    pub new_end_byte: TextSize,
    pub start_position: Point,
    pub old_end_position: Point,
    pub new_end_position: Point,
}

/// Errors that can occur when applying an edit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// The replaced range extends past the end of the tree.
    #[error("edit ends at {end:?} but the tree is only {len:?} bytes long")]
    OutOfBounds { end: TextSize, len: TextSize },

    /// The edit disagrees with itself.
    #[error("inconsistent edit: {0}")]
    Inconsistent(&'static str),

    /// The edit's coordinates do not describe the tree's text, which happens
    /// when edits are applied out of order.
    #[error("edit position {found} at byte {offset:?} does not match the tree (expected {expected})")]
    InvalidSequence {
        offset: TextSize,
        expected: String,
        found: Point,
    },
}

impl InputEdit {
    /// Describe replacing `range` of `old_text` with `new_text`.
    pub fn replace(old_text: &str, range: TextRange, new_text: &str) -> Self {
        let index = LineIndex::new(old_text);
        let start_position = index.point(range.start());
        Self {
            start_byte: range.start(),
            old_end_byte: range.end(),
            new_end_byte: range.start() + TextSize::of(new_text),
            start_position,
            old_end_position: index.point(range.end()),
            new_end_position: start_position + Point::extent_of(new_text),
        }
    }

    /// Describe inserting `new_text` at `offset`.
    pub fn insert(old_text: &str, offset: TextSize, new_text: &str) -> Self {
        Self::replace(old_text, TextRange::empty(offset), new_text)
    }

    /// Describe deleting `range`.
    pub fn delete(old_text: &str, range: TextRange) -> Self {
        Self::replace(old_text, range, "")
    }

    /// Bytes added (positive) or removed (negative) by the edit.
    pub fn delta(&self) -> i64 {
        i64::from(u32::from(self.new_end_byte)) - i64::from(u32::from(self.old_end_byte))
    }

    /// Where a byte offset of the old text ends up in the new text.
    ///
    /// Offsets before the edit stay, offsets after it shift, and offsets
    /// inside the replaced range collapse to the end of the inserted text.
    /// An offset equal to the start of a pure insertion stays, so text
    /// inserted between two nodes belongs to the one after it.
    pub fn map_offset(&self, offset: TextSize) -> TextSize {
        if offset <= self.start_byte {
            offset
        } else if offset >= self.old_end_byte {
            offset - self.old_end_byte + self.new_end_byte
        } else {
            self.new_end_byte
        }
    }

    /// [`map_offset`](Self::map_offset) for the point that goes with `offset`.
    pub fn map_point(&self, offset: TextSize, point: Point) -> Point {
        if offset <= self.start_byte {
            point
        } else if offset >= self.old_end_byte {
            self.new_end_position + (point - self.old_end_position)
        } else {
            self.new_end_position
        }
    }

    /// Whether this edit inserts text exactly at `offset` without replacing any.
    fn inserts_at(&self, offset: TextSize) -> bool {
        self.start_byte == self.old_end_byte && self.start_byte == offset
    }

    fn validate_shape(&self) -> Result<(), EditError> {
        if self.start_byte > self.old_end_byte || self.start_byte > self.new_end_byte {
            return Err(EditError::Inconsistent("edit ends before it starts"));
        }
        if self.start_position > self.old_end_position
            || self.start_position > self.new_end_position
        {
            return Err(EditError::Inconsistent("edit position ends before it starts"));
        }
        if (self.start_byte == self.old_end_byte) != (self.start_position == self.old_end_position)
        {
            return Err(EditError::Inconsistent(
                "replaced bytes and replaced positions disagree",
            ));
        }
        if (self.start_byte == self.new_end_byte) != (self.start_position == self.new_end_position)
        {
            return Err(EditError::Inconsistent(
                "inserted bytes and inserted positions disagree",
            ));
        }
        let replaced = u32::from(self.old_end_byte - self.start_byte);
        let inserted = u32::from(self.new_end_byte - self.start_byte);
        let old_extent = self.old_end_position - self.start_position;
        let new_extent = self.new_end_position - self.start_position;
        if old_extent.row == 0 && old_extent.column != replaced
            || new_extent.row == 0 && new_extent.column != inserted
        {
            return Err(EditError::Inconsistent(
                "single-line extent does not match its byte length",
            ));
        }
        Ok(())
    }
}

/// What the tree knows about the point at some byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PointBound {
    Exact(Point),
    /// Inside a multi-line token: only the row range is known.
    Rows(u32, u32),
}

impl PointBound {
    fn admits(self, point: Point) -> bool {
        match self {
            PointBound::Exact(expected) => expected == point,
            PointBound::Rows(first, last) => first <= point.row && point.row <= last,
        }
    }

    fn describe(self) -> String {
        match self {
            PointBound::Exact(point) => point.to_string(),
            PointBound::Rows(first, last) => format!("a point on rows {}..={}", first, last),
        }
    }
}

impl Tree {
    /// Apply an edit, producing a tree whose positions match the new text.
    ///
    /// Nodes whose byte range, extended by the bytes the lexer looked at past
    /// their end, touches the replaced range are rebuilt and flagged
    /// `has_changes`. All other nodes are shared with `self`.
    pub fn edit(&self, edit: &InputEdit) -> Result<Tree, EditError> {
        edit.validate_shape()?;
        let len = self.len();
        if edit.old_end_byte > len {
            return Err(EditError::OutOfBounds {
                end: edit.old_end_byte,
                len,
            });
        }
        for (offset, point) in [
            (edit.start_byte, edit.start_position),
            (edit.old_end_byte, edit.old_end_position),
        ] {
            let bound = self.point_bound(offset);
            if !bound.admits(point) {
                return Err(EditError::InvalidSequence {
                    offset,
                    expected: bound.describe(),
                    found: point,
                });
            }
        }

        let root = edit_subtree(self.root_subtree(), TextSize::new(0), Point::ZERO, true, edit);
        tracing::trace!(
            start = u32::from(edit.start_byte),
            old_end = u32::from(edit.old_end_byte),
            new_end = u32::from(edit.new_end_byte),
            "edited tree"
        );
        Ok(Tree::new(root, self.grammar().clone()))
    }

    /// The point of `offset` as far as the tree can tell.
    fn point_bound(&self, offset: TextSize) -> PointBound {
        if offset >= self.len() {
            return PointBound::Exact(self.root_node().end_position());
        }
        let mut node = self.root_node();
        loop {
            let child = node
                .children()
                .find(|child| child.start_byte() <= offset && offset < child.end_byte());
            match child {
                Some(child) => node = child,
                None => break,
            }
        }
        let start = node.start_position();
        if offset == node.start_byte() {
            return PointBound::Exact(start);
        }
        let end = node.end_position();
        if start.row == end.row {
            PointBound::Exact(Point::new(
                start.row,
                start.column + u32::from(offset - node.start_byte()),
            ))
        } else {
            PointBound::Rows(start.row, end.row)
        }
    }
}

/// Rebuild `subtree` (starting at `start`) if the edit touches it.
///
/// `last` marks the nodes on the right edge of the tree. Text appended at
/// the very end has no node after it, so those nodes absorb it instead.
fn edit_subtree(
    subtree: &Subtree,
    start: TextSize,
    point: Point,
    last: bool,
    edit: &InputEdit,
) -> Subtree {
    let end = start + subtree.len();
    let dependency_end = end + TextSize::new(subtree.lookahead_bytes());
    if edit.start_byte > dependency_end || edit.old_end_byte < start {
        return subtree.clone();
    }

    let end_point = point + subtree.extent();
    let new_start = edit.map_offset(start);
    let new_start_point = edit.map_point(start, point);
    let (new_end, new_end_point) = if last && edit.inserts_at(end) {
        (edit.new_end_byte, edit.new_end_position)
    } else {
        (edit.map_offset(end), edit.map_point(end, end_point))
    };

    let ambiguous = subtree.is_ambiguity();
    let child_count = subtree.children().len();
    let mut child_start = start;
    let mut child_point = point;
    let children = subtree
        .children()
        .iter()
        .enumerate()
        .map(|(index, child)| {
            let child_last = last && (ambiguous || index + 1 == child_count);
            let edited = edit_subtree(child, child_start, child_point, child_last, edit);
            if !ambiguous {
                child_start += child.len();
                child_point = child_point + child.extent();
            }
            edited
        })
        .collect();

    subtree.edited(new_end - new_start, new_end_point - new_start_point, children)
}
