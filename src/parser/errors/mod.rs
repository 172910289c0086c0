//! Syntax diagnostics
//!
//! Parsing never fails on malformed input; errors live in the tree as
//! `ERROR` nodes, error tokens and `MISSING` leaves. This module turns them
//! into coded diagnostics:
//! - Categorized error codes for filtering and documentation
//! - Hints for inserted tokens
//! - Related ranges (what a missing token should have followed, the
//!   alternatives of an ambiguity)

mod codes;
mod diagnostics;
mod error;

pub use codes::ErrorCode;
pub use error::{RelatedInfo, Severity, SyntaxError, SyntaxErrorBuilder};
