//! GLR parse engine.
//!
//! The parser keeps a small set of stack versions. Versions advance in
//! rounds: each round processes every version sitting at the lowest byte
//! offset, so versions meet again at the same offset and can be merged.
//! A table cell with several actions forks the version. When every version
//! is stuck the best one is handed to error recovery.
//!
//! Reparsing walks the previous (edited) tree alongside the input and shifts
//! whole unchanged subtrees instead of re-lexing and re-reducing them.

use std::sync::Arc;

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use text_size::{TextRange, TextSize};
use thiserror::Error;
use tracing::{debug, trace, warn};

use super::lexer::{LexError, Lexer, Token};
use super::options::ParseOptions;
use super::recovery::Recovery;
use super::reuse::ReusableNode;
use super::stack::{Status, Version};
use crate::grammar::{
    Action, Grammar, GrammarId, LexModeId, ProductionId, ScannerState, StateId,
};
use crate::syntax::{Reduction, Subtree, Tree};

/// Failures that prevent a parse from producing a tree.
///
/// Syntax errors are never reported here; they become `ERROR` and `MISSING`
/// nodes in the tree.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("text is {found:?} bytes but the edited tree covers {expected:?}")]
    TextLengthMismatch { expected: TextSize, found: TextSize },

    #[error("tree was built with grammar {found}, parser uses {expected}")]
    GrammarMismatch { expected: GrammarId, found: GrammarId },

    #[error("text of {0} bytes exceeds the 4 GiB limit")]
    TextTooLong(usize),

    #[error("parser stopped without producing a tree")]
    NoTree,
}

/// Parses text with one grammar.
///
/// A parser is cheap to clone and can be shared between threads; every call
/// builds its own parse state.
#[derive(Debug, Clone)]
pub struct Parser {
    grammar: Arc<Grammar>,
    options: ParseOptions,
}

impl Parser {
    pub fn new(grammar: Arc<Grammar>) -> Self {
        Self::with_options(grammar, ParseOptions::default())
    }

    pub fn with_options(grammar: Arc<Grammar>, options: ParseOptions) -> Self {
        Self { grammar, options }
    }

    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: ParseOptions) {
        self.options = options;
    }

    /// Parse `text` from scratch.
    pub fn parse(&self, text: &str) -> Result<Tree, ParseError> {
        check_len(text)?;
        let root = Engine::new(&self.grammar, &self.options, text, None).run()?;
        Ok(Tree::new(root, self.grammar.clone()))
    }

    /// Parse `text`, reusing unchanged subtrees of `old`.
    ///
    /// `old` must already have every edit applied with [`Tree::edit`], so
    /// that it describes `text`. The result is the same tree a fresh parse
    /// of `text` would give.
    pub fn reparse(&self, old: &Tree, text: &str) -> Result<Tree, ParseError> {
        let found = check_len(text)?;
        if !Arc::ptr_eq(old.grammar(), &self.grammar) && old.grammar().id() != self.grammar.id()
        {
            return Err(ParseError::GrammarMismatch {
                expected: self.grammar.id().clone(),
                found: old.grammar().id().clone(),
            });
        }
        if old.len() != found {
            return Err(ParseError::TextLengthMismatch {
                expected: old.len(),
                found,
            });
        }
        let reusable = ReusableNode::new(old.root_subtree().clone());
        let root = Engine::new(&self.grammar, &self.options, text, Some(reusable)).run()?;
        Ok(Tree::new(root, self.grammar.clone()))
    }

    /// Parse several independent texts in parallel.
    pub fn parse_many<T: AsRef<str> + Sync>(&self, texts: &[T]) -> Vec<Result<Tree, ParseError>> {
        texts
            .par_iter()
            .map(|text| self.parse(text.as_ref()))
            .collect()
    }
}

fn check_len(text: &str) -> Result<TextSize, ParseError> {
    u32::try_from(text.len())
        .map(TextSize::new)
        .map_err(|_| ParseError::TextTooLong(text.len()))
}

// ============================================================================
// Engine
// ============================================================================

/// What the parser looks at next: a freshly lexed token, a token leaf taken
/// from the old tree, or a whole subtree of the old tree.
enum Lookahead {
    Token(Token, Option<Subtree>),
    Node(Subtree),
}

/// A version that reached the end of the input.
struct Finished {
    root: Subtree,
    error_cost: u32,
    dynamic_precedence: i32,
}

/// State of one parse call.
pub(super) struct Engine<'a> {
    pub(super) grammar: &'a Grammar,
    pub(super) options: &'a ParseOptions,
    pub(super) text: &'a str,
    lexer: Lexer<'a>,
    tokens: FxHashMap<(TextSize, LexModeId, ScannerState), Token>,
    reusable: Option<ReusableNode>,
    reused_leaf: Option<(TextSize, LexModeId, ScannerState, Subtree)>,
    /// Furthest offset at which more than one version was alive or recovery
    /// ran. Nodes starting at or before it are marked fragile.
    unstable_at: Option<TextSize>,
    reused: usize,
}

impl<'a> Engine<'a> {
    fn new(
        grammar: &'a Grammar,
        options: &'a ParseOptions,
        text: &'a str,
        reusable: Option<ReusableNode>,
    ) -> Self {
        Self {
            grammar,
            options,
            text,
            lexer: Lexer::new(grammar),
            tokens: FxHashMap::default(),
            reusable,
            reused_leaf: None,
            unstable_at: None,
            reused: 0,
        }
    }

    fn run(mut self) -> Result<Subtree, ParseError> {
        let mut versions = vec![Version::new(StateId::new(0))];
        let mut finished: Vec<Finished> = Vec::new();
        let mut peak = 1;

        while let Some(position) = versions.iter().map(Version::position).min() {
            if versions.len() > 1 {
                self.mark_unstable(position);
            }
            let mut index = 0;
            while index < versions.len() {
                if versions[index].is_active() && versions[index].position() == position {
                    self.advance(&mut versions, index)?;
                }
                index += 1;
            }
            peak = peak.max(versions.len());

            let stuck = versions.iter().all(|v| v.status == Status::Halted);
            if stuck && finished.is_empty() {
                let Some(best) = best_version(&versions) else {
                    break;
                };
                let mut version = versions.swap_remove(best);
                versions.clear();
                version.status = Status::Active;
                self.mark_unstable(version.position());
                match self.recover(&mut version)? {
                    Recovery::Resumed => versions.push(version),
                    Recovery::Finished(root) => finished.push(Finished {
                        root,
                        error_cost: version.error_cost,
                        dynamic_precedence: version.dynamic_precedence,
                    }),
                }
                continue;
            }

            versions.retain(|v| v.status != Status::Halted);
            self.condense(&mut versions);
            let (accepted, active): (Vec<Version>, Vec<Version>) = versions
                .into_iter()
                .partition(|v| v.status == Status::Accepted);
            versions = active;
            finished.extend(accepted.iter().map(|version| self.finish(version)));
            if let Some(best_cost) = finished.iter().map(|f| f.error_cost).min() {
                versions.retain(|v| v.error_cost <= best_cost);
            }
        }

        let mut best: Option<Finished> = None;
        for candidate in finished {
            let better = best.as_ref().is_none_or(|current| {
                candidate.error_cost < current.error_cost
                    || (candidate.error_cost == current.error_cost
                        && candidate.dynamic_precedence > current.dynamic_precedence)
            });
            if better {
                best = Some(candidate);
            }
        }
        let best = best.ok_or(ParseError::NoTree)?;
        debug!(
            grammar = %self.grammar.id(),
            len = self.text.len(),
            peak_versions = peak,
            reused = self.reused,
            error_cost = best.error_cost,
            "parse finished"
        );
        Ok(best.root)
    }

    /// Run one version until it shifts, accepts or halts.
    ///
    /// Forks created at conflicts are appended to `versions` and advanced
    /// later in the same round.
    fn advance(&mut self, versions: &mut Vec<Version>, index: usize) -> Result<(), ParseError> {
        let grammar = self.grammar;
        let table = grammar.table();
        let mut version = versions[index].clone();
        let mut forks = Vec::new();

        loop {
            let state = version.state();
            let position = version.position();
            let may_reuse = versions.len() == 1 && forks.is_empty() && version.pending.is_none();
            let scanner = version.scanner_state().clone();
            let (token, reused_leaf) = match self.lookahead(position, state, &scanner, may_reuse)? {
                Lookahead::Node(node) => {
                    let Some(next) = table.goto(state, node.symbol()) else {
                        version.status = Status::Halted;
                        break;
                    };
                    trace!(state = %state, symbol = node.symbol().raw(), len = ?node.len(), "reuse");
                    version.dynamic_precedence += node.dynamic_precedence();
                    version.push(next, node, false);
                    version.reductions = 0;
                    break;
                }
                Lookahead::Token(token, leaf) => (token, leaf),
            };

            if version.pending.is_none() && self.grammar.is_extra(token.symbol) {
                let leaf = reused_leaf.unwrap_or_else(|| self.leaf(&token, state));
                version.push(state, leaf, true);
                break;
            }

            let action = match version.pending.take() {
                Some(action) => action,
                None => {
                    let actions = table.actions(state, token.symbol);
                    let Some((&first, rest)) = actions.split_first() else {
                        trace!(state = %state, symbol = token.symbol.raw(), "no action");
                        version.status = Status::Halted;
                        break;
                    };
                    for &alternative in rest {
                        let mut fork = version.clone();
                        fork.pending = Some(alternative);
                        forks.push(fork);
                    }
                    if !rest.is_empty() {
                        trace!(state = %state, symbol = token.symbol.raw(), forks = rest.len(), "split");
                        self.mark_unstable(position);
                    }
                    first
                }
            };

            match action {
                Action::Shift(next) => {
                    let leaf = match reused_leaf {
                        Some(leaf) => leaf.with_parse_state(state),
                        None => self.leaf(&token, state),
                    };
                    trace!(state = %state, next = %next, symbol = token.symbol.raw(), "shift");
                    version.push(next, leaf, false);
                    version.reductions = 0;
                    break;
                }
                Action::Reduce(production) => {
                    version.reductions += 1;
                    if version.reductions > self.options.max_reductions_per_token
                        || !self.reduce(&mut version, production, &token)
                    {
                        version.status = Status::Halted;
                        break;
                    }
                }
                Action::Accept => {
                    version.status = Status::Accepted;
                    break;
                }
            }
        }

        versions[index] = version;
        versions.extend(forks);
        Ok(())
    }

    /// Apply a reduction. Returns false, leaving the version untouched, if
    /// the stack cannot take it.
    pub(super) fn reduce(
        &self,
        version: &mut Version,
        production: ProductionId,
        follow: &Token,
    ) -> bool {
        let Some(rule) = self.grammar.production(production) else {
            return false;
        };
        let mut reduced = version.clone();
        let Some(popped) = reduced.pop(rule.child_count()) else {
            return false;
        };
        let below = reduced.state();
        let Some(next) = self.grammar.table().goto(below, rule.lhs) else {
            return false;
        };
        let start = reduced.position();
        let node = Subtree::node(
            self.grammar,
            rule.lhs,
            popped.children,
            Reduction {
                production,
                parse_state: below,
                follow: follow.symbol,
                follow_mode: follow.lex_mode,
                dynamic_precedence: rule.dynamic_precedence,
                fragile: self.unstable_at.is_some_and(|at| at >= start),
            },
        );
        trace!(production = %production, symbol = rule.lhs.raw(), next = %next, "reduce");
        reduced.dynamic_precedence += rule.dynamic_precedence;
        reduced.push(next, node, false);
        for extra in popped.trailing {
            reduced.push(next, extra, true);
        }
        *version = reduced;
        true
    }

    /// Merge versions that reached the same configuration, then enforce the
    /// version cap.
    fn condense(&self, versions: &mut Vec<Version>) {
        let mut i = 0;
        while i < versions.len() {
            let mut j = i + 1;
            while j < versions.len() {
                if !versions[i].can_merge(&versions[j]) {
                    j += 1;
                    continue;
                }
                let other = versions.remove(j);
                match versions[i].compare(&other) {
                    std::cmp::Ordering::Less => {}
                    std::cmp::Ordering::Greater => versions[i] = other,
                    std::cmp::Ordering::Equal => {
                        trace!(position = ?other.position(), "merge ambiguous versions");
                        versions[i].merge_ambiguous(&other);
                    }
                }
            }
            i += 1;
        }

        let max = self.options.max_versions.max(1);
        if versions.len() > max {
            let mut ranked: Vec<usize> = (0..versions.len()).collect();
            ranked.sort_by(|a, b| versions[*a].compare(&versions[*b]).then(a.cmp(b)));
            let mut keep = vec![false; versions.len()];
            for &index in &ranked[..max] {
                keep[index] = true;
            }
            warn!(
                alive = versions.len(),
                max_versions = max,
                "too many parse versions; dropping the worst"
            );
            let mut index = 0;
            versions.retain(|_| {
                let kept = keep[index];
                index += 1;
                kept
            });
        }
    }

    /// Build the root of an accepted version.
    ///
    /// Extras before and after the start symbol node become its first and
    /// last children.
    fn finish(&self, version: &Version) -> Finished {
        let entries = version.entries();
        let main = entries.iter().rposition(|(_, extra)| !extra);
        let root = match main {
            Some(index) if entries.len() == 1 => entries[index].0.clone(),
            Some(index) => {
                let before: Vec<Subtree> = entries[..index].iter().map(|(s, _)| s.clone()).collect();
                let after: Vec<Subtree> =
                    entries[index + 1..].iter().map(|(s, _)| s.clone()).collect();
                splice(&entries[index].0, &before, &after)
            }
            None => Subtree::error(
                entries.into_iter().map(|(s, _)| s).collect(),
                0,
                StateId::default(),
            ),
        };
        Finished {
            root,
            error_cost: version.error_cost,
            dynamic_precedence: version.dynamic_precedence,
        }
    }

    fn lookahead(
        &mut self,
        position: TextSize,
        state: StateId,
        scanner: &ScannerState,
        may_reuse: bool,
    ) -> Result<Lookahead, ParseError> {
        let mode = self.grammar.table().lex_mode(state);
        if may_reuse {
            if let Some((at, leaf_mode, leaf_scanner, leaf)) = &self.reused_leaf {
                if *at == position && *leaf_mode == mode && leaf_scanner == scanner {
                    let token = leaf_token(leaf, position);
                    return Ok(Lookahead::Token(token, Some(leaf.clone())));
                }
            }
            if let Some(found) = self.take_reusable(position, state, mode, scanner)? {
                return Ok(found);
            }
        }
        let token = self.lex(position, mode, scanner)?;
        Ok(Lookahead::Token(token, None))
    }

    /// Find a subtree of the old tree that starts at `position` and can be
    /// used as is.
    ///
    /// Nothing is reused where the old parse reached `position` with a
    /// different external scanner state.
    fn take_reusable(
        &mut self,
        position: TextSize,
        state: StateId,
        mode: LexModeId,
        scanner: &ScannerState,
    ) -> Result<Option<Lookahead>, ParseError> {
        let Some(mut reusable) = self.reusable.take() else {
            return Ok(None);
        };
        let found = loop {
            let Some((subtree, start)) = reusable.current() else {
                break None;
            };
            let subtree = subtree.clone();
            let end = start + subtree.len();
            if start > position {
                break None;
            }
            if end <= position && (start < position || subtree.is_empty()) {
                reusable.advance();
                continue;
            }
            if start < position {
                reusable.step_in();
                continue;
            }
            if reusable.scanner_state() != scanner {
                trace!(offset = ?position, "scanner state changed; no reuse");
                break None;
            }
            let after = subtree
                .scanner_state()
                .unwrap_or(reusable.scanner_state())
                .clone();
            if !self.can_reuse(&subtree, end, state, mode, after)? {
                if self.reduces_first(&subtree, position, state, mode, scanner)? {
                    // Keep the node; it may fit once the pending reductions ran.
                    break None;
                }
                reusable.step_in();
                continue;
            }
            reusable.advance();
            self.reused += 1;
            if subtree.is_leaf() {
                let token = leaf_token(&subtree, position);
                self.reused_leaf = Some((position, mode, scanner.clone(), subtree.clone()));
                break Some(Lookahead::Token(token, Some(subtree)));
            }
            break Some(Lookahead::Node(subtree));
        };
        self.reusable = Some(reusable);
        Ok(found)
    }

    /// `scanner` is the external scanner state after `subtree`.
    fn can_reuse(
        &mut self,
        subtree: &Subtree,
        end: TextSize,
        state: StateId,
        mode: LexModeId,
        mut scanner: ScannerState,
    ) -> Result<bool, ParseError> {
        if subtree.has_changes()
            || subtree.has_error()
            || subtree.is_fragile()
            || subtree.is_error()
            || subtree.is_ambiguity()
        {
            return Ok(false);
        }
        if subtree.is_leaf() {
            return Ok(subtree.lex_mode() == mode);
        }
        if subtree.parse_state() != state
            || self.grammar.table().goto(state, subtree.symbol()).is_none()
        {
            return Ok(false);
        }
        // The reductions that closed this node depended on the token after it.
        let mut at = end;
        loop {
            let token = self.lex(at, subtree.lex_mode(), &scanner)?;
            if !token.is_end() && self.grammar.is_extra(token.symbol) {
                at = token.end();
                if let Some(after) = token.scanner_state {
                    scanner = after;
                }
                continue;
            }
            return Ok(token.symbol == subtree.follow_symbol());
        }
    }

    /// Whether an otherwise reusable node only fails because the parser
    /// still has to reduce before it.
    fn reduces_first(
        &mut self,
        subtree: &Subtree,
        position: TextSize,
        state: StateId,
        mode: LexModeId,
        scanner: &ScannerState,
    ) -> Result<bool, ParseError> {
        if subtree.is_leaf()
            || subtree.parse_state() == state
            || subtree.has_changes()
            || subtree.has_error()
            || subtree.is_fragile()
            || subtree.is_error()
            || subtree.is_ambiguity()
        {
            return Ok(false);
        }
        let token = self.lex(position, mode, scanner)?;
        Ok(matches!(
            self.grammar.table().actions(state, token.symbol),
            [Action::Reduce(_)]
        ))
    }

    pub(super) fn lex(
        &mut self,
        at: TextSize,
        mode: LexModeId,
        scanner: &ScannerState,
    ) -> Result<Token, ParseError> {
        let key = (at, mode, scanner.clone());
        if let Some(token) = self.tokens.get(&key) {
            return Ok(token.clone());
        }
        let token = self.lexer.next_token_after(self.text, at, mode, scanner)?;
        self.tokens.insert(key, token.clone());
        Ok(token)
    }

    pub(super) fn leaf(&self, token: &Token, state: StateId) -> Subtree {
        Subtree::leaf(
            self.grammar,
            token.symbol,
            token.text(self.text),
            token.lex_mode,
            token.lookahead_bytes,
            token.scanner_state.clone(),
            state,
        )
    }

    pub(super) fn mark_unstable(&mut self, position: TextSize) {
        self.unstable_at = Some(self.unstable_at.map_or(position, |at| at.max(position)));
    }
}

/// Index of the lowest-cost version; the earliest one on ties.
fn best_version(versions: &[Version]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (index, version) in versions.iter().enumerate() {
        match best {
            Some(current) if version.compare(&versions[current]).is_ge() => {}
            _ => best = Some(index),
        }
    }
    best
}

fn leaf_token(leaf: &Subtree, position: TextSize) -> Token {
    Token {
        symbol: leaf.symbol(),
        range: TextRange::at(position, leaf.len()),
        lex_mode: leaf.lex_mode(),
        lookahead_bytes: leaf.lookahead_bytes(),
        scanner_state: leaf.scanner_state().cloned(),
    }
}

fn splice(main: &Subtree, before: &[Subtree], after: &[Subtree]) -> Subtree {
    if main.is_ambiguity() {
        return Subtree::ambiguity(
            main.children()
                .iter()
                .map(|alternative| splice(alternative, before, after))
                .collect(),
        );
    }
    let mut children = Vec::with_capacity(before.len() + main.children().len() + after.len());
    children.extend(before.iter().cloned());
    children.extend(main.children().iter().cloned());
    children.extend(after.iter().cloned());
    main.with_children(children).mark_fragile()
}

