//! Offset to row/column conversion.

use super::Point;
use text_size::TextSize;

/// Maps byte offsets of a text to [`Point`]s.
///
/// Built once per text; lookups are a binary search over line starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    line_starts: Vec<TextSize>,
    len: TextSize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![TextSize::new(0)];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(idx, _)| TextSize::new(idx as u32 + 1)),
        );
        Self {
            line_starts,
            len: TextSize::of(text),
        }
    }

    /// Number of lines (a trailing newline opens an empty last line).
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Total length of the indexed text.
    pub fn len(&self) -> TextSize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == TextSize::new(0)
    }

    /// Convert a byte offset to a point. Offsets past the end clamp to the end.
    pub fn point(&self, offset: TextSize) -> Point {
        let offset = offset.min(self.len);
        let row = match self.line_starts.binary_search(&offset) {
            Ok(row) => row,
            Err(next) => next - 1,
        };
        let column = offset - self.line_starts[row];
        Point::new(row as u32, column.into())
    }

    /// Convert a point back to a byte offset, if the point is inside the text.
    pub fn offset(&self, point: Point) -> Option<TextSize> {
        let line_start = *self.line_starts.get(point.row as usize)?;
        let line_end = self
            .line_starts
            .get(point.row as usize + 1)
            .copied()
            .unwrap_or(self.len);
        let offset = line_start + TextSize::new(point.column);
        (offset <= line_end).then_some(offset)
    }
}
