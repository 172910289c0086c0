//! Hand-written scanning for tokens that regular expressions cannot describe.
//!
//! A grammar lists its external tokens by name; an [`ExternalScanner`]
//! attached with [`Grammar::with_external_scanner`](super::Grammar::with_external_scanner)
//! recognizes them. Indentation-sensitive languages are the usual case: an
//! `indent` token depends on the indentation of every enclosing block, which
//! the scanner carries from token to token as a [`ScannerState`].
//!
//! The scanner is a pure function of its input. The lexer hands it the
//! serialized state left by the previous external token, and the scanner
//! answers with the token it found and the state after it. That state is
//! stored on the token's leaf, so a reparse can tell whether an old subtree
//! was scanned from the same state it would be scanned from now.

use std::fmt;
use std::sync::Arc;

/// Serialized state of an external scanner. Empty at the start of the text.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ScannerState(Option<Arc<[u8]>>);

impl ScannerState {
    pub fn new(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            Self(None)
        } else {
            Self(Some(Arc::from(bytes)))
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_deref().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

impl From<Vec<u8>> for ScannerState {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(&bytes)
    }
}

impl fmt::Debug for ScannerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScannerState({:?})", self.as_bytes())
    }
}

/// What the lexer hands an external scanner.
#[derive(Debug, Clone, Copy)]
pub struct ScanInput<'a> {
    pub text: &'a str,
    /// Byte offset to scan from.
    pub offset: usize,
    /// Which external tokens the parser can use here, by their index in the
    /// grammar's external list. Every entry is set during error recovery.
    pub valid: &'a [bool],
    /// State left by the previous external token.
    pub state: &'a [u8],
}

impl ScanInput<'_> {
    /// Whether the external token at `index` is acceptable here.
    pub fn is_valid(&self, index: usize) -> bool {
        self.valid.get(index).copied().unwrap_or(false)
    }

    /// Whether every external token is acceptable, which only happens while
    /// the parser recovers from an error.
    pub fn is_error_recovery(&self) -> bool {
        !self.valid.is_empty() && self.valid.iter().all(|valid| *valid)
    }

    /// The text from the scan offset on.
    pub fn rest(&self) -> &str {
        &self.text[self.offset..]
    }
}

/// A token recognized by an external scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalMatch {
    /// Index in the grammar's external list.
    pub token: usize,
    /// Token length in bytes. Zero-width tokens must change the state.
    pub len: usize,
    /// Bytes examined from the scan offset, the token itself included.
    /// Looking at the end of the text counts as one byte.
    pub inspected: usize,
    /// State after the token.
    pub state: Vec<u8>,
}

/// Recognizes a grammar's external tokens.
///
/// Implementations must be deterministic: the same input gives the same
/// answer, which is what makes subtrees scanned from equal states reusable.
pub trait ExternalScanner: fmt::Debug + Send + Sync {
    /// Scan one token at `input.offset`, or `None` to let the regular token
    /// rules handle the position.
    fn scan(&self, input: &ScanInput<'_>) -> Option<ExternalMatch>;
}
