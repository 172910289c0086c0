//! Table-driven incremental GLR parser
//!
//! ## Architecture
//!
//! ```text
//! Source Text
//!     ↓
//! Lexer (per-state lex modes) → Tokens with Symbol
//!     ↓
//! Parse Engine (GLR stack versions) → Subtree
//!     ↓
//! Tree (persistent, shared subtrees) → Node / TreeCursor / rowan export
//! ```
//!
//! ## Incremental Reparsing
//!
//! When text changes, callers:
//! 1. Apply the edit to the old tree with [`Tree::edit`](crate::syntax::Tree::edit)
//! 2. Call [`Parser::reparse`] with the new text
//! 3. The parser shifts every unchanged subtree whole, and only relexes and
//!    reparses around the edit

pub mod errors;
mod lexer;
mod options;
#[allow(clippy::module_inception)]
mod parser;
mod recovery;
mod reuse;
mod stack;

pub use errors::{ErrorCode, RelatedInfo, Severity, SyntaxError};
pub use lexer::{LexError, Lexer, Token};
pub use options::ParseOptions;
pub use parser::{ParseError, Parser};
pub use recovery::{
    ERROR_COST_PER_MISSING_TREE, ERROR_COST_PER_RECOVERY, ERROR_COST_PER_SKIPPED_CHAR,
    ERROR_COST_PER_SKIPPED_LINE, ERROR_COST_PER_SKIPPED_TREE,
};
