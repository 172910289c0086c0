//! Token rules and their compiled lex modes.
//!
//! Every lex mode is one anchored multi-pattern DFA. The scanner steps it a
//! byte at a time so that it knows both the longest match and how many bytes
//! it looked at to decide on it. The count may exceed the strict minimum by
//! one byte, never fall short of it.

use regex_automata::dfa::{Automaton, StartKind, dense};
use regex_automata::{Anchored, Input, MatchKind};
use smol_str::SmolStr;

use super::{GrammarError, Symbol};

/// A compiled lexical rule for one terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRule {
    pub symbol: Symbol,
    pub name: SmolStr,
    /// Regular expression; literals are stored escaped.
    pub pattern: String,
    pub precedence: i32,
}

impl TokenRule {
    /// Check that the pattern parses and cannot match the empty string.
    pub(crate) fn validate(&self) -> Result<(), GrammarError> {
        let hir = regex_syntax::parse(&self.pattern).map_err(|e| GrammarError::InvalidPattern {
            token: self.name.clone(),
            message: e.to_string(),
        })?;
        match hir.properties().minimum_len() {
            Some(0) => Err(GrammarError::EmptyMatch(self.name.clone())),
            // `None` means the pattern never matches, which is legal if odd.
            _ => Ok(()),
        }
    }
}

/// Result of running one lex mode at an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Scan {
    /// Best matching terminal and the end byte of its match.
    pub(crate) matched: Option<(Symbol, usize)>,
    /// Bytes consumed from the start offset, plus one if end of input was seen.
    pub(crate) consumed: usize,
}

/// A set of token rules compiled together.
#[derive(Debug, Clone)]
pub(crate) struct LexMode {
    /// Pattern index to (symbol, precedence).
    rules: Vec<(Symbol, i32)>,
    dfa: Option<dense::DFA<Vec<u32>>>,
}

impl LexMode {
    pub(crate) fn compile(tokens: &[&TokenRule]) -> Result<Self, GrammarError> {
        let rules = tokens.iter().map(|t| (t.symbol, t.precedence)).collect();
        if tokens.is_empty() {
            return Ok(Self { rules, dfa: None });
        }
        let patterns: Vec<&str> = tokens.iter().map(|t| t.pattern.as_str()).collect();
        let dfa = dense::Builder::new()
            .configure(
                dense::Config::new()
                    .match_kind(MatchKind::All)
                    .start_kind(StartKind::Anchored),
            )
            .build_many(&patterns)
            .map_err(|e| GrammarError::InvalidPattern {
                token: tokens
                    .iter()
                    .map(|t| t.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
                    .into(),
                message: e.to_string(),
            })?;
        Ok(Self {
            rules,
            dfa: Some(dfa),
        })
    }

    pub(crate) fn symbols(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.rules.iter().map(|(symbol, _)| *symbol)
    }

    /// Longest match starting at `offset`.
    ///
    /// Equal-length matches go to the higher precedence, then to the lower
    /// symbol (earlier declaration).
    pub(crate) fn scan(&self, text: &str, offset: usize) -> Result<Scan, String> {
        let Some(dfa) = &self.dfa else {
            return Ok(Scan {
                matched: None,
                consumed: 0,
            });
        };
        let input = Input::new(text)
            .span(offset..text.len())
            .anchored(Anchored::Yes);
        let mut sid = dfa.start_state_forward(&input).map_err(|e| e.to_string())?;
        let bytes = text.as_bytes();
        let mut matched = None;
        let mut consumed = 0;
        let mut at = offset;
        let mut dead = false;

        while at < bytes.len() {
            sid = dfa.next_state(sid, bytes[at]);
            consumed += 1;
            // Matches are reported one byte late: this state says whether
            // text[offset..at] matched.
            if dfa.is_match_state(sid) && at > offset {
                matched = self.best_in_state(dfa, sid, at).or(matched);
            }
            if dfa.is_dead_state(sid) || dfa.is_quit_state(sid) {
                dead = true;
                break;
            }
            at += 1;
        }
        if !dead {
            sid = dfa.next_eoi_state(sid);
            consumed += 1;
            if dfa.is_match_state(sid) && bytes.len() > offset {
                matched = self.best_in_state(dfa, sid, bytes.len()).or(matched);
            }
        }
        Ok(Scan { matched, consumed })
    }

    fn best_in_state(
        &self,
        dfa: &dense::DFA<Vec<u32>>,
        sid: regex_automata::util::primitives::StateID,
        end: usize,
    ) -> Option<(Symbol, usize)> {
        (0..dfa.match_len(sid))
            .filter_map(|i| self.rules.get(dfa.match_pattern(sid, i).as_usize()))
            .min_by_key(|(symbol, precedence)| (-(*precedence as i64), *symbol))
            .map(|(symbol, _)| (*symbol, end))
    }
}
