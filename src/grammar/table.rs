//! Parse table: actions, gotos and lex modes per state.

use rustc_hash::FxHashMap;

use super::{Associativity, LexModeId, Production, ProductionId, StateId, Symbol};

/// A parser action for a (state, lookahead) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Shift(StateId),
    Reduce(ProductionId),
    Accept,
}

/// The actions of one table cell.
///
/// Cells hold a single action unless the state declared the lookahead a
/// conflict, in which case every action is explored.
#[derive(Debug, Clone, Default)]
pub(crate) struct ActionCell {
    pub(crate) actions: Vec<Action>,
    pub(crate) conflict: bool,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct StateRow {
    pub(crate) actions: FxHashMap<Symbol, ActionCell>,
    /// Lookaheads with actions, in declaration order.
    pub(crate) lookaheads: Vec<Symbol>,
    pub(crate) gotos: FxHashMap<Symbol, StateId>,
    pub(crate) lex_mode: LexModeId,
}

/// The LR automaton of a grammar.
#[derive(Debug, Clone, Default)]
pub struct ParseTable {
    pub(crate) states: Vec<StateRow>,
}

impl ParseTable {
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Actions for `symbol` in `state`; empty when the pair is an error.
    pub fn actions(&self, state: StateId, symbol: Symbol) -> &[Action] {
        self.states
            .get(state.index())
            .and_then(|row| row.actions.get(&symbol))
            .map(|cell| cell.actions.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_action(&self, state: StateId, symbol: Symbol) -> bool {
        !self.actions(state, symbol).is_empty()
    }

    /// Whether the cell is explored by splitting the stack.
    pub fn is_conflict(&self, state: StateId, symbol: Symbol) -> bool {
        self.states
            .get(state.index())
            .and_then(|row| row.actions.get(&symbol))
            .is_some_and(|cell| cell.conflict)
    }

    pub fn goto(&self, state: StateId, symbol: Symbol) -> Option<StateId> {
        self.states
            .get(state.index())
            .and_then(|row| row.gotos.get(&symbol))
            .copied()
    }

    pub fn lex_mode(&self, state: StateId) -> LexModeId {
        self.states
            .get(state.index())
            .map(|row| row.lex_mode)
            .unwrap_or_default()
    }

    /// Lookahead symbols that have actions in `state`, in declaration order.
    pub fn lookaheads(&self, state: StateId) -> &[Symbol] {
        self.states
            .get(state.index())
            .map(|row| row.lookaheads.as_slice())
            .unwrap_or(&[])
    }
}

// ============================================================================
// Static conflict resolution
// ============================================================================

/// Collapse an undeclared multi-action cell into a single action.
///
/// The highest precedence wins (a shift carries its own precedence, a
/// reduction its production's). Within the winning precedence level `Accept`
/// beats everything, a shift/reduce pair reduces only when the production is
/// left-associative, and among reductions the lowest production id wins.
pub(crate) fn resolve(
    candidates: &[(Action, i32)],
    productions: &[Production],
) -> Result<Action, String> {
    let Some(top) = candidates.iter().map(|(_, prec)| *prec).max() else {
        return Err("empty action cell".to_string());
    };
    let winners: Vec<Action> = candidates
        .iter()
        .filter(|(_, prec)| *prec == top)
        .map(|(action, _)| *action)
        .collect();

    if winners.contains(&Action::Accept) {
        return Ok(Action::Accept);
    }

    let mut shift = None;
    for action in &winners {
        if let Action::Shift(target) = action {
            match shift {
                Some(existing) if existing != *target => {
                    return Err(format!(
                        "conflicting shifts to states {} and {}",
                        existing, target
                    ));
                }
                _ => shift = Some(*target),
            }
        }
    }
    let reduce = winners
        .iter()
        .filter_map(|action| match action {
            Action::Reduce(id) => Some(*id),
            _ => None,
        })
        .min();

    match (shift, reduce) {
        (Some(target), Some(production)) => {
            let associativity = productions
                .get(production.index())
                .map(|p| p.associativity)
                .unwrap_or_default();
            if associativity == Associativity::Left {
                Ok(Action::Reduce(production))
            } else {
                Ok(Action::Shift(target))
            }
        }
        (Some(target), None) => Ok(Action::Shift(target)),
        (None, Some(production)) => Ok(Action::Reduce(production)),
        (None, None) => Err("empty action cell".to_string()),
    }
}
