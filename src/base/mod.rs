//! Foundation types for the arbor engine.
//!
//! This module provides fundamental types used throughout the engine:
//! - [`TextRange`], [`TextSize`] - Source positions (byte offsets)
//! - [`Point`], [`PointRange`] - Row/column positions derived from offsets
//! - [`LineIndex`] - Offset to row/column conversion
//!
//! This module has NO dependencies on other arbor modules.

mod line_index;
mod position;

pub use line_index::LineIndex;
pub use position::{Point, PointRange};

// Re-export text-size types for convenience
pub use text_size;
pub use text_size::{TextRange, TextSize};
