//! State-dependent lexer over a grammar's token rules.
//!
//! The parser asks for one token at a time, naming the lex mode of its
//! current state. Only the token rules of that mode compete, longest match
//! first. If none of them matches, every rule of the grammar gets a try, and
//! if that fails too the lexer emits a one-code-point error token so the
//! parser always makes progress.
//!
//! Grammars with external tokens get their scanner consulted first, with the
//! external tokens the mode allows and the state left by the previous
//! external token.

use text_size::{TextRange, TextSize};
use thiserror::Error;

use crate::grammar::{ExternalMatch, Grammar, LexModeId, ScanInput, ScannerState, Symbol};

/// A token with its symbol, position and the lexer state that produced it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    pub symbol: Symbol,
    pub range: TextRange,
    /// The lex mode that was requested; lexing again in this mode at the
    /// same offset yields the same token.
    pub lex_mode: LexModeId,
    /// Bytes past the token end the lexer inspected. End of input counts as
    /// one byte.
    pub lookahead_bytes: u32,
    /// Scanner state after the token, for tokens from the external scanner.
    pub scanner_state: Option<ScannerState>,
}

impl Token {
    pub fn start(&self) -> TextSize {
        self.range.start()
    }

    pub fn end(&self) -> TextSize {
        self.range.end()
    }

    pub fn len(&self) -> TextSize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn is_end(&self) -> bool {
        self.symbol == Symbol::END
    }

    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.range]
    }
}

/// Errors for lexer calls that do not describe a position in the text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("offset {offset:?} is past the end of the text ({len:?} bytes)")]
    OutOfBounds { offset: TextSize, len: TextSize },

    #[error("offset {0:?} is not on a character boundary")]
    NotCharBoundary(TextSize),

    #[error("grammar has no lex mode {0}")]
    UnknownMode(LexModeId),

    #[error("text of {0} bytes exceeds the 4 GiB limit")]
    TextTooLong(usize),

    #[error("lexer failure: {0}")]
    Engine(String),
}

/// Tokenizer for one grammar
#[derive(Debug, Clone, Copy)]
pub struct Lexer<'g> {
    grammar: &'g Grammar,
}

impl<'g> Lexer<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self { grammar }
    }

    /// Lex the token starting at `offset`, using the token rules of `mode`.
    ///
    /// At the end of the text this returns a zero-width `END` token. An
    /// external scanner, if any, starts from its initial state.
    pub fn next_token(
        &self,
        text: &str,
        offset: TextSize,
        mode: LexModeId,
    ) -> Result<Token, LexError> {
        self.next_token_after(text, offset, mode, &ScannerState::default())
    }

    /// [`next_token`](Self::next_token) with the external scanner resuming
    /// from `state`.
    pub fn next_token_after(
        &self,
        text: &str,
        offset: TextSize,
        mode: LexModeId,
        state: &ScannerState,
    ) -> Result<Token, LexError> {
        let len = u32::try_from(text.len()).map_err(|_| LexError::TextTooLong(text.len()))?;
        let at = usize::from(offset);
        if at > text.len() {
            return Err(LexError::OutOfBounds {
                offset,
                len: TextSize::new(len),
            });
        }
        if !text.is_char_boundary(at) {
            return Err(LexError::NotCharBoundary(offset));
        }
        let primary = self
            .grammar
            .lex_mode(mode)
            .ok_or(LexError::UnknownMode(mode))?;

        if let Some(found) = self.scan_external(text, at, mode, state) {
            let end = at + found.len;
            let symbol = self.grammar.externals()[found.token];
            return Ok(Token {
                symbol,
                range: TextRange::new(offset, size(end)),
                lex_mode: mode,
                lookahead_bytes: size(found.inspected.saturating_sub(found.len)).into(),
                scanner_state: Some(ScannerState::from(found.state)),
            });
        }

        if at == text.len() {
            return Ok(Token {
                symbol: Symbol::END,
                range: TextRange::empty(offset),
                lex_mode: mode,
                lookahead_bytes: 1,
                scanner_state: None,
            });
        }

        let scan = primary.scan(text, at).map_err(LexError::Engine)?;
        let mut consumed = scan.consumed;
        let mut matched = scan.matched;

        let error_mode = self.grammar.error_lex_mode();
        if matched.is_none() && mode != error_mode {
            let fallback = self
                .grammar
                .lex_mode(error_mode)
                .ok_or(LexError::UnknownMode(error_mode))?;
            let scan = fallback.scan(text, at).map_err(LexError::Engine)?;
            consumed = consumed.max(scan.consumed);
            matched = scan.matched;
        }

        let (symbol, end) = match matched {
            Some(found) => found,
            None => {
                let width = text[at..].chars().next().map_or(1, char::len_utf8);
                tracing::trace!(offset = at, "no token rule matches");
                (Symbol::ERROR_TOKEN, at + width)
            }
        };
        Ok(Token {
            symbol,
            range: TextRange::new(offset, size(end)),
            lex_mode: mode,
            lookahead_bytes: size((at + consumed).saturating_sub(end)).into(),
            scanner_state: None,
        })
    }

    /// Ask the external scanner for a token, discarding answers that name an
    /// invalid token, end off a character boundary, or make no progress.
    fn scan_external(
        &self,
        text: &str,
        at: usize,
        mode: LexModeId,
        state: &ScannerState,
    ) -> Option<ExternalMatch> {
        let scanner = self.grammar.external_scanner()?;
        let valid = self.grammar.valid_externals(mode);
        if !valid.iter().any(|valid| *valid) {
            return None;
        }
        let found = scanner.scan(&ScanInput {
            text,
            offset: at,
            valid,
            state: state.as_bytes(),
        })?;
        let end = at.checked_add(found.len)?;
        let accepted = valid.get(found.token).copied().unwrap_or(false)
            && end <= text.len()
            && text.is_char_boundary(end)
            && (found.len > 0 || found.state.as_slice() != state.as_bytes());
        if !accepted {
            tracing::trace!(offset = at, token = found.token, "external scanner answer rejected");
            return None;
        }
        Some(found)
    }

    /// Tokenize the whole text in one mode. The final `END` token is not included.
    pub fn tokenize(&self, text: &str, mode: LexModeId) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        let mut offset = TextSize::new(0);
        let mut state = ScannerState::default();
        loop {
            let token = self.next_token_after(text, offset, mode, &state)?;
            if token.is_end() {
                return Ok(tokens);
            }
            offset = token.end();
            if let Some(after) = &token.scanner_state {
                state = after.clone();
            }
            tokens.push(token);
        }
    }
}

/// Offsets are checked against the 4 GiB limit before any token is built.
fn size(offset: usize) -> TextSize {
    TextSize::new(u32::try_from(offset).unwrap_or(u32::MAX))
}
