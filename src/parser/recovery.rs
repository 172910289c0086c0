//! Error recovery.
//!
//! Recovery runs on the single best version once every version is stuck.
//! Strategies are tried in order:
//!
//! 1. insert one zero-width `MISSING` token, if the real lookahead can follow it
//! 2. skip tokens and/or pop stack entries into an `ERROR` node, choosing the
//!    cheapest combination that leaves the lookahead actionable
//! 3. skip the lookahead token alone
//!
//! At the end of the input with nothing else possible, the whole stack is
//! wrapped into an `ERROR` root.

use text_size::{TextRange, TextSize};
use tracing::debug;

use super::parser::{Engine, ParseError};
use super::stack::Version;
use crate::grammar::{Action, ScannerState, StateId, Symbol};
use crate::parser::lexer::Token;
use crate::syntax::Subtree;

/// Cost of one recovery that skips or pops.
pub const ERROR_COST_PER_RECOVERY: u32 = 500;
/// Cost of inserting one missing token.
pub const ERROR_COST_PER_MISSING_TREE: u32 = 110;
/// Cost of each skipped token or popped stack entry.
pub const ERROR_COST_PER_SKIPPED_TREE: u32 = 100;
/// Cost of each line break inside skipped input.
pub const ERROR_COST_PER_SKIPPED_LINE: u32 = 30;
/// Cost of each skipped byte.
pub const ERROR_COST_PER_SKIPPED_CHAR: u32 = 1;

/// Recoveries in a row at one offset that may skip nothing.
const MAX_STALLS: u32 = 3;

pub(super) enum Recovery {
    Resumed,
    /// The input ended; the stack became an `ERROR` root.
    Finished(Subtree),
}

#[derive(Debug, Clone, Copy)]
struct SkipPlan {
    /// Non-extra stack entries to pop.
    depth: usize,
    /// Where parsing resumes after the skipped tokens.
    resume: TextSize,
    cost: u32,
}

impl Engine<'_> {
    pub(super) fn recover(&mut self, version: &mut Version) -> Result<Recovery, ParseError> {
        let position = version.position();
        let state = version.state();
        let scanner = version.scanner_state().clone();
        let lookahead = self.lex(position, self.grammar.table().lex_mode(state), &scanner)?;
        if version.stalls.0 != position {
            version.stalls = (position, 0);
        }

        if version.missing_at != Some(position) {
            if let Some(repaired) = self.insert_missing(version, &lookahead)? {
                *version = repaired;
                version.missing_at = Some(position);
                version.error_cost += ERROR_COST_PER_MISSING_TREE;
                debug!(offset = ?position, "recovered by inserting a missing token");
                return Ok(Recovery::Resumed);
            }
        }

        let allow_stall = version.stalls.1 < MAX_STALLS;
        if let Some(plan) = self.plan_skip(version, position, allow_stall)? {
            self.apply_skip(version, position, plan)?;
            if plan.resume == position {
                version.stalls.1 += 1;
            }
            debug!(
                offset = ?position,
                resume = ?plan.resume,
                popped = plan.depth,
                cost = plan.cost,
                "recovered by skipping"
            );
            return Ok(Recovery::Resumed);
        }

        if lookahead.is_end() {
            let root = self.wrap_stack(version);
            debug!(cost = version.error_cost, "input ended inside an error");
            return Ok(Recovery::Finished(root));
        }

        // Nothing fits: drop the lookahead and try again after it.
        let skipped = self.lex(position, self.grammar.error_lex_mode(), &scanner)?;
        let cost = self.skip_cost(TextRange::new(position, skipped.end()), 1);
        let leaf = self.leaf(&skipped, version.state());
        let error = Subtree::error(vec![leaf], cost, version.state());
        version.push(version.state(), error, true);
        version.error_cost += cost;
        debug!(offset = ?position, cost, "recovered by dropping the lookahead");
        Ok(Recovery::Resumed)
    }

    /// Try each terminal, in symbol order, as a zero-width token at the
    /// current offset. The first one that can be shifted and leaves the real
    /// lookahead actionable wins.
    fn insert_missing(
        &mut self,
        version: &Version,
        lookahead: &Token,
    ) -> Result<Option<Version>, ParseError> {
        let grammar = self.grammar;
        let table = grammar.table();
        let position = version.position();
        let candidates: Vec<Symbol> = self
            .grammar
            .terminals()
            .filter(|symbol| !self.grammar.is_extra(*symbol))
            .filter(|symbol| table.has_action(version.state(), *symbol))
            .collect();

        for symbol in candidates {
            let missing = Token {
                symbol,
                range: TextRange::empty(position),
                lex_mode: lookahead.lex_mode,
                lookahead_bytes: 0,
                scanner_state: None,
            };
            let mut trial = version.clone();
            let mut reductions = 0;
            let shifted = loop {
                match table.actions(trial.state(), symbol).first().copied() {
                    Some(Action::Shift(next)) => {
                        let leaf = Subtree::missing(
                            self.grammar,
                            symbol,
                            trial.state(),
                            lookahead.lex_mode,
                            ERROR_COST_PER_MISSING_TREE,
                        );
                        trial.push(next, leaf, false);
                        break true;
                    }
                    Some(Action::Reduce(production)) => {
                        reductions += 1;
                        if reductions > self.options.max_reductions_per_token
                            || !self.reduce(&mut trial, production, &missing)
                        {
                            break false;
                        }
                    }
                    Some(Action::Accept) | None => break false,
                }
            };
            if !shifted {
                continue;
            }
            let next = self.lex(position, table.lex_mode(trial.state()), trial.scanner_state())?;
            if table.has_action(trial.state(), next.symbol) {
                return Ok(Some(trial));
            }
        }
        Ok(None)
    }

    /// Search skip counts and pop depths for the cheapest way to continue.
    ///
    /// Popped entries stay in front of the skipped text, so the skipped
    /// tokens are scanned from the state at the top of the stack.
    fn plan_skip(
        &mut self,
        version: &Version,
        position: TextSize,
        allow_stall: bool,
    ) -> Result<Option<SkipPlan>, ParseError> {
        let grammar = self.grammar;
        let table = grammar.table();
        let error_mode = self.grammar.error_lex_mode();
        let states = version.states_by_depth(self.options.max_pop_depth);
        let text_len = TextSize::of(self.text);

        let mut best: Option<SkipPlan> = None;
        let mut resume = position;
        let mut scanner = version.scanner_state().clone();
        for skipped in 0..=self.options.max_skipped_tokens {
            let floor = ERROR_COST_PER_RECOVERY + ERROR_COST_PER_SKIPPED_TREE * skipped as u32;
            if best.is_some_and(|plan| floor > plan.cost) {
                break;
            }
            for (depth, state) in states.iter().enumerate() {
                if skipped == 0 && (depth == 0 || !allow_stall) {
                    continue;
                }
                let token = self.lex(resume, table.lex_mode(*state), &scanner)?;
                if self.grammar.is_extra(token.symbol) || !table.has_action(*state, token.symbol) {
                    continue;
                }
                let cost = self.skip_cost(TextRange::new(position, resume), skipped + depth);
                if best.is_none_or(|plan| cost < plan.cost) {
                    best = Some(SkipPlan {
                        depth,
                        resume,
                        cost,
                    });
                }
            }
            if resume >= text_len {
                break;
            }
            let token = self.lex(resume, error_mode, &scanner)?;
            let end = token.end();
            if let Some(after) = token.scanner_state {
                scanner = after;
            }
            (resume, scanner) = self.skip_extras(end, scanner)?;
        }
        Ok(best)
    }

    fn apply_skip(
        &mut self,
        version: &mut Version,
        position: TextSize,
        plan: SkipPlan,
    ) -> Result<(), ParseError> {
        let mut scanner = version.scanner_state().clone();
        let mut children = version.pop_depth(plan.depth).unwrap_or_default();
        let state = version.state();
        let error_mode = self.grammar.error_lex_mode();
        let mut at = position;
        while at < plan.resume {
            let token = self.lex(at, error_mode, &scanner)?;
            children.push(self.leaf(&token, state));
            at = token.end();
            if let Some(after) = token.scanner_state {
                scanner = after;
            }
        }
        let error = Subtree::error(children, plan.cost, state);
        version.push(state, error, true);
        version.error_cost += plan.cost;
        Ok(())
    }

    /// Offset and scanner state after any extras starting at `at`, lexed in
    /// the error mode.
    fn skip_extras(
        &mut self,
        mut at: TextSize,
        mut scanner: ScannerState,
    ) -> Result<(TextSize, ScannerState), ParseError> {
        let error_mode = self.grammar.error_lex_mode();
        loop {
            let token = self.lex(at, error_mode, &scanner)?;
            if token.is_end() || !self.grammar.is_extra(token.symbol) {
                return Ok((at, scanner));
            }
            at = token.end();
            if let Some(after) = token.scanner_state {
                scanner = after;
            }
        }
    }

    fn skip_cost(&self, skipped: TextRange, trees: usize) -> u32 {
        let text = &self.text[skipped];
        let lines = text.bytes().filter(|b| *b == b'\n').count() as u32;
        ERROR_COST_PER_RECOVERY
            + ERROR_COST_PER_SKIPPED_CHAR * u32::from(skipped.len())
            + ERROR_COST_PER_SKIPPED_LINE * lines
            + ERROR_COST_PER_SKIPPED_TREE * trees as u32
    }

    /// Wrap every stack entry into one `ERROR` root.
    fn wrap_stack(&self, version: &mut Version) -> Subtree {
        let entries = version.entries();
        let trees = entries.iter().filter(|(_, extra)| !extra).count();
        let cost = ERROR_COST_PER_RECOVERY + ERROR_COST_PER_SKIPPED_TREE * trees as u32;
        version.error_cost += cost;
        Subtree::error(
            entries.into_iter().map(|(subtree, _)| subtree).collect(),
            cost,
            StateId::default(),
        )
    }
}
