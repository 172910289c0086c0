//! # arbor-base
//!
//! Incremental, table-driven GLR parsing: load a grammar table, parse text
//! into a persistent syntax tree, apply edits and reparse reusing everything
//! the edit did not touch.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! parser    → Lexer, GLR engine, error recovery, subtree reuse, diagnostics
//!   ↓
//! syntax    → Subtree/Tree store, Node, TreeCursor, InputEdit, rowan export
//!   ↓
//! grammar   → Grammar artifacts, parse tables, lex modes, registry
//!   ↓
//! base      → Primitives (Point, LineIndex, TextRange)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use arbor::{Grammar, InputEdit, Parser};
//!
//! let grammar = Arc::new(Grammar::from_file("assign.json")?);
//! let parser = Parser::new(grammar);
//!
//! let old_text = "a = 1;";
//! let tree = parser.parse(old_text)?;
//!
//! let edit = InputEdit::insert(old_text, 4.into(), "4");
//! let new_text = "a = 41;";
//! let edited = tree.edit(&edit)?;
//! let tree = parser.reparse(&edited, new_text)?;
//! println!("{}", tree.to_sexp());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// ============================================================================
// MODULES (dependency order: base → grammar → syntax → parser)
// ============================================================================

/// Foundation types: Point, LineIndex, TextRange
pub mod base;

/// Grammar artifacts: symbols, productions, parse tables, lex modes
pub mod grammar;

/// Tree store: subtrees, trees, nodes, cursors, edits
pub mod syntax;

/// Lexer, parse engine, recovery, reuse and diagnostics
pub mod parser;

// Re-export foundation types
pub use base::{LineIndex, Point, PointRange, TextRange, TextSize};
pub use grammar::{Grammar, GrammarBuilder, GrammarError, GrammarId, GrammarRegistry, Symbol};
pub use parser::{ParseError, ParseOptions, Parser, SyntaxError};
pub use syntax::{EditError, InputEdit, Node, NodeId, Tree, TreeCursor};
