//! Error code definitions for syntax diagnostics
//!
//! Error codes follow a naming convention: E{category}{number}
//! - E01xx: Lexical errors (input no token rule matches)
//! - E02xx: Missing input (tokens inserted by recovery)
//! - E03xx: Unexpected input (tokens skipped by recovery)
//! - E09xx: Ambiguity

use std::fmt;

use super::error::Severity;

/// Error codes for syntax diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // E01xx: Lexical errors
    // =========================================================================
    /// Character that starts no token
    E0101,

    // =========================================================================
    // E02xx: Missing input
    // =========================================================================
    /// Token inserted by recovery
    E0201,

    // =========================================================================
    // E03xx: Unexpected input
    // =========================================================================
    /// Input skipped by recovery
    E0301,
    /// Input left over when the end of the text was reached
    E0302,

    // =========================================================================
    // E09xx: Ambiguity
    // =========================================================================
    /// Several equally good parses of the same text
    E0901,
}

impl ErrorCode {
    /// Get the string representation of the error code (e.g., "E0201")
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::E0101 => "E0101",
            Self::E0201 => "E0201",
            Self::E0301 => "E0301",
            Self::E0302 => "E0302",
            Self::E0901 => "E0901",
        }
    }

    pub fn category_description(&self) -> &'static str {
        match self {
            Self::E0101 => "lexical error",
            Self::E0201 => "missing input",
            Self::E0301 | Self::E0302 => "unexpected input",
            Self::E0901 => "ambiguity",
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            Self::E0101 => "invalid character",
            Self::E0201 => "missing token",
            Self::E0301 => "unexpected input",
            Self::E0302 => "unparsed input at end of text",
            Self::E0901 => "ambiguous parse",
        }
    }

    /// Ambiguities are reported as hints; everything else is an error.
    pub fn default_severity(&self) -> Severity {
        match self {
            Self::E0901 => Severity::Hint,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
