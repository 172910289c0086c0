//! Row/column positions for syntax nodes
//!
//! Byte offsets are the authoritative unit of position. Points are derived
//! from them and carried alongside so that editors can talk in rows and
//! columns. Columns count bytes, not characters.

use std::fmt;
use std::ops::{Add, Sub};

/// A position in source code (0-indexed row, byte column)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Point {
    pub row: u32,
    pub column: u32,
}

/// A span of points in source code (0-indexed, end exclusive)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PointRange {
    pub start: Point,
    pub end: Point,
}

impl Point {
    pub const ZERO: Point = Point { row: 0, column: 0 };

    pub fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// The extent covered by `text` when it starts at column zero.
    pub fn extent_of(text: &str) -> Self {
        let mut row = 0;
        let mut line_start = 0;
        for (idx, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                row += 1;
                line_start = idx + 1;
            }
        }
        Self {
            row,
            column: (text.len() - line_start) as u32,
        }
    }

    /// Whether this extent spans at least one line break.
    pub fn is_multiline(&self) -> bool {
        self.row > 0
    }
}

/// Appending an extent to a position.
impl Add for Point {
    type Output = Point;

    fn add(self, extent: Point) -> Point {
        if extent.row > 0 {
            Point::new(self.row + extent.row, extent.column)
        } else {
            Point::new(self.row, self.column + extent.column)
        }
    }
}

/// The extent between two positions. Saturates when `rhs` is after `self`.
impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        if self.row > rhs.row {
            Point::new(self.row - rhs.row, self.column)
        } else if self.row == rhs.row {
            Point::new(0, self.column.saturating_sub(rhs.column))
        } else {
            Point::ZERO
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.column)
    }
}

impl PointRange {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Create a range from row/column coordinates
    pub fn from_coords(start_row: u32, start_col: u32, end_row: u32, end_col: u32) -> Self {
        Self {
            start: Point::new(start_row, start_col),
            end: Point::new(end_row, end_col),
        }
    }

    /// Check if a point falls within this range (both ends inclusive)
    pub fn contains(&self, point: Point) -> bool {
        self.start <= point && point <= self.end
    }
}
