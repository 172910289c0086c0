//! Error types for grammar loading.

use smol_str::SmolStr;
use thiserror::Error;

use super::GrammarId;

/// Errors that can occur while loading and validating a grammar table.
///
/// All of these are fatal for the grammar being loaded and for nothing else.
#[derive(Debug, Error)]
pub enum GrammarError {
    /// The table was produced for an incompatible engine.
    #[error("grammar table version {found} is not supported (expected {min}..={max})")]
    VersionMismatch { found: u32, min: u32, max: u32 },

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error while reading a table artifact.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Two symbols share a name.
    #[error("duplicate symbol `{0}`")]
    DuplicateSymbol(SmolStr),

    /// A user symbol uses a name reserved for builtin symbols.
    #[error("symbol name `{0}` is reserved")]
    ReservedName(SmolStr),

    /// Reference to a symbol that was never declared.
    #[error("unknown symbol `{name}` in {context}")]
    UnknownSymbol { name: SmolStr, context: String },

    /// A symbol was used where a different kind of symbol is required.
    #[error("symbol `{name}` cannot be used in {context}")]
    WrongSymbolKind { name: SmolStr, context: String },

    /// Token rule does not compile.
    #[error("invalid pattern for token `{token}`: {message}")]
    InvalidPattern { token: SmolStr, message: String },

    /// Token rule matches the empty string, which would stall the lexer.
    #[error("token `{0}` can match the empty string")]
    EmptyMatch(SmolStr),

    /// Malformed production.
    #[error("invalid production {production}: {message}")]
    InvalidProduction { production: u32, message: String },

    /// Malformed parse state.
    #[error("invalid state {state}: {message}")]
    InvalidState { state: u32, message: String },

    /// The table has no states at all.
    #[error("grammar `{0}` has no parse states")]
    Empty(SmolStr),

    /// A registry loader produced a different grammar than was asked for.
    #[error("expected grammar {expected} but the artifact is {found}")]
    IdentityMismatch { expected: GrammarId, found: GrammarId },
}

impl GrammarError {
    /// Create an unknown symbol error.
    pub fn unknown(name: &str, context: impl Into<String>) -> Self {
        Self::UnknownSymbol {
            name: name.into(),
            context: context.into(),
        }
    }

    /// Create a wrong symbol kind error.
    pub fn wrong_kind(name: &str, context: impl Into<String>) -> Self {
        Self::WrongSymbolKind {
            name: name.into(),
            context: context.into(),
        }
    }

    /// Create an invalid state error.
    pub fn state(state: usize, message: impl Into<String>) -> Self {
        Self::InvalidState {
            state: state as u32,
            message: message.into(),
        }
    }
}
