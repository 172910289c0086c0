//! Grammar tables.
//!
//! A [`Grammar`] is the immutable, validated form of a grammar table artifact
//! ([`GrammarSource`]): symbol metadata, token rules compiled into lex modes,
//! productions and the LR automaton ([`ParseTable`]). Grammars are loaded once
//! and shared as `Arc<Grammar>`; see [`GrammarRegistry`] for the process-wide
//! cache.
//!
//! ## Symbol numbering
//!
//! | Range | Symbols |
//! |-------|---------|
//! | 0..4 | builtins: `end`, `ERROR`, error token, ambiguity |
//! | 4.. | terminals in token declaration order |
//! | then | external tokens in declaration order |
//! | then | rules in declaration order |

mod error;
mod external;
mod lexical;
pub mod registry;
mod source;
mod table;


use std::fmt;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

pub use error::GrammarError;
pub use external::{ExternalMatch, ExternalScanner, ScanInput, ScannerState};
use lexical::LexMode;
pub use lexical::TokenRule;
pub use registry::GrammarRegistry;
pub use source::{
    ActionSource, Associativity, ExternalSource, GrammarBuilder, GrammarSource, ProductionSource,
    StateBuilder, StateSource, TokenSource,
};
pub use table::{Action, ParseTable};
use table::{ActionCell, StateRow};

/// Oldest table format this engine understands.
pub const MIN_TABLE_VERSION: u32 = 1;
/// Newest table format this engine understands.
pub const MAX_TABLE_VERSION: u32 = 1;

// ============================================================================
// Identifiers
// ============================================================================

/// A grammar symbol (terminal, nonterminal or builtin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u16);

impl Symbol {
    /// End of input.
    pub const END: Symbol = Symbol(0);
    /// A node wrapping input the parser could not fit into the grammar.
    pub const ERROR: Symbol = Symbol(1);
    /// A leaf for one code point no token rule matched.
    pub const ERROR_TOKEN: Symbol = Symbol(2);
    /// A node holding alternative parses of the same input.
    pub const AMBIGUITY: Symbol = Symbol(3);

    pub(crate) const BUILTIN_COUNT: u16 = 4;

    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn is_builtin(self) -> bool {
        self.0 < Self::BUILTIN_COUNT
    }
}

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident($repr:ty)) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name($repr);

        impl $name {
            pub const fn new(raw: $repr) -> Self {
                Self(raw)
            }

            pub const fn raw(self) -> $repr {
                self.0
            }

            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// A parser state.
    StateId(u32)
);
id_type!(
    /// A production (reduction rule).
    ProductionId(u32)
);
id_type!(
    /// A lex mode: the set of token rules valid in some parser states.
    LexModeId(u16)
);

/// Identity of a loaded grammar.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GrammarId {
    pub name: SmolStr,
    pub version: u32,
}

impl GrammarId {
    pub fn new(name: impl Into<SmolStr>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

impl fmt::Display for GrammarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

// ============================================================================
// Metadata
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Builtin,
    Terminal,
    Nonterminal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInfo {
    pub name: SmolStr,
    pub kind: SymbolKind,
    /// Named symbols show up in `to_sexp` and named-child iteration.
    pub named: bool,
    /// Trivia, allowed between any two tokens.
    pub extra: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    pub id: ProductionId,
    pub lhs: Symbol,
    pub rhs: Vec<Symbol>,
    pub precedence: i32,
    pub associativity: Associativity,
    pub dynamic_precedence: i32,
}

impl Production {
    /// Number of non-extra children a reduction pops.
    pub fn child_count(&self) -> usize {
        self.rhs.len()
    }
}

// ============================================================================
// Grammar
// ============================================================================

/// A validated grammar table.
#[derive(Debug)]
pub struct Grammar {
    id: GrammarId,
    start: Symbol,
    symbols: Vec<SymbolInfo>,
    by_name: FxHashMap<SmolStr, Symbol>,
    tokens: Vec<TokenRule>,
    /// External token symbols, by scanner index.
    externals: Vec<Symbol>,
    productions: Vec<Production>,
    table: ParseTable,
    lex_modes: Vec<LexMode>,
    /// Per lex mode, which external tokens are valid.
    mode_externals: Vec<Vec<bool>>,
    error_mode: LexModeId,
    resources: IndexMap<SmolStr, Arc<str>>,
    scanner: Option<Arc<dyn ExternalScanner>>,
}

const BUILTIN_NAMES: [&str; Symbol::BUILTIN_COUNT as usize] =
    ["end", "ERROR", "ERROR_TOKEN", "AMBIGUITY"];

impl Grammar {
    /// Load and validate a JSON grammar artifact.
    pub fn from_json(json: &str) -> Result<Self, GrammarError> {
        Self::from_source(GrammarSource::from_json(json)?)
    }

    /// Load and validate a grammar artifact from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GrammarError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Validate an artifact and compile its lex modes.
    pub fn from_source(source: GrammarSource) -> Result<Self, GrammarError> {
        if !(MIN_TABLE_VERSION..=MAX_TABLE_VERSION).contains(&source.version) {
            return Err(GrammarError::VersionMismatch {
                found: source.version,
                min: MIN_TABLE_VERSION,
                max: MAX_TABLE_VERSION,
            });
        }
        let name = SmolStr::from(source.name.as_str());
        if source.states.is_empty() {
            return Err(GrammarError::Empty(name));
        }

        // Symbols
        let mut symbols: Vec<SymbolInfo> = BUILTIN_NAMES
            .iter()
            .map(|builtin| SymbolInfo {
                name: SmolStr::new_static(*builtin),
                kind: SymbolKind::Builtin,
                named: *builtin == "ERROR",
                extra: false,
            })
            .collect();
        let mut by_name: FxHashMap<SmolStr, Symbol> = FxHashMap::default();
        by_name.insert(SmolStr::new_static("end"), Symbol::END);

        let mut tokens = Vec::with_capacity(source.tokens.len());
        for token in &source.tokens {
            let symbol = declare(symbols.len(), &mut by_name, &token.name)?;
            let (pattern, named) = match (&token.pattern, &token.literal) {
                (Some(pattern), None) => (pattern.clone(), token.named.unwrap_or(true)),
                (None, Some(literal)) => {
                    (regex_syntax::escape(literal), token.named.unwrap_or(false))
                }
                _ => {
                    return Err(GrammarError::InvalidPattern {
                        token: token.name.as_str().into(),
                        message: "exactly one of `pattern` and `literal` is required".into(),
                    });
                }
            };
            symbols.push(SymbolInfo {
                name: token.name.as_str().into(),
                kind: SymbolKind::Terminal,
                named,
                extra: token.extra,
            });
            let rule = TokenRule {
                symbol,
                name: token.name.as_str().into(),
                pattern,
                precedence: token.precedence,
            };
            rule.validate()?;
            tokens.push(rule);
        }
        let mut externals = Vec::with_capacity(source.externals.len());
        for external in &source.externals {
            let symbol = declare(symbols.len(), &mut by_name, &external.name)?;
            symbols.push(SymbolInfo {
                name: external.name.as_str().into(),
                kind: SymbolKind::Terminal,
                named: external.named.unwrap_or(true),
                extra: external.extra,
            });
            externals.push(symbol);
        }
        for rule in &source.rules {
            declare(symbols.len(), &mut by_name, rule)?;
            symbols.push(SymbolInfo {
                name: rule.as_str().into(),
                kind: SymbolKind::Nonterminal,
                named: !rule.starts_with('_'),
                extra: false,
            });
        }

        let lookup = |name: &str, context: &str| -> Result<Symbol, GrammarError> {
            by_name
                .get(name)
                .copied()
                .ok_or_else(|| GrammarError::unknown(name, context))
        };
        let is_rule = |symbol: Symbol| symbols[symbol.index()].kind == SymbolKind::Nonterminal;

        let start = lookup(&source.start, "start")?;
        if !is_rule(start) {
            return Err(GrammarError::wrong_kind(&source.start, "start (not a rule)"));
        }

        // Productions
        let mut productions = Vec::with_capacity(source.productions.len());
        for (index, production) in source.productions.iter().enumerate() {
            let context = format!("production {}", index);
            let lhs = lookup(&production.lhs, &context)?;
            if !is_rule(lhs) {
                return Err(GrammarError::wrong_kind(&production.lhs, context));
            }
            let rhs = production
                .rhs
                .iter()
                .map(|name| {
                    let symbol = lookup(name, &context)?;
                    if symbol.is_builtin() || symbols[symbol.index()].extra {
                        return Err(GrammarError::wrong_kind(name, context.clone()));
                    }
                    Ok(symbol)
                })
                .collect::<Result<Vec<_>, _>>()?;
            productions.push(Production {
                id: ProductionId::new(index as u32),
                lhs,
                rhs,
                precedence: production.precedence,
                associativity: production.associativity,
                dynamic_precedence: production.dynamic_precedence,
            });
        }

        // States
        let state_count = source.states.len();
        let mut rows = Vec::with_capacity(state_count);
        for (index, state) in source.states.iter().enumerate() {
            let context = format!("state {}", index);
            let conflicts = state
                .conflicts
                .iter()
                .map(|name| lookup(name, &context))
                .collect::<Result<FxHashSet<_>, _>>()?;

            let mut row = StateRow::default();
            for (lookahead_name, sources) in &state.actions {
                let lookahead = lookup(lookahead_name, &context)?;
                let info = &symbols[lookahead.index()];
                if lookahead != Symbol::END
                    && (info.kind != SymbolKind::Terminal || info.extra)
                {
                    return Err(GrammarError::wrong_kind(lookahead_name, context));
                }
                let mut candidates = Vec::with_capacity(sources.len());
                for action in sources {
                    let resolved = match (action.shift, action.reduce, action.accept) {
                        (Some(target), None, false) => {
                            if target as usize >= state_count {
                                return Err(GrammarError::state(
                                    index,
                                    format!("shift to missing state {}", target),
                                ));
                            }
                            (Action::Shift(StateId::new(target)), action.precedence)
                        }
                        (None, Some(production), false) => {
                            let Some(p) = productions.get(production as usize) else {
                                return Err(GrammarError::state(
                                    index,
                                    format!("reduce by missing production {}", production),
                                ));
                            };
                            (Action::Reduce(p.id), p.precedence)
                        }
                        (None, None, true) => (Action::Accept, action.precedence),
                        _ => {
                            return Err(GrammarError::state(
                                index,
                                format!("malformed action on `{}`", lookahead_name),
                            ));
                        }
                    };
                    if !candidates.iter().any(|(a, _)| *a == resolved.0) {
                        candidates.push(resolved);
                    }
                }
                if candidates.is_empty() {
                    continue;
                }
                let conflict = conflicts.contains(&lookahead) && candidates.len() > 1;
                let actions = if candidates.len() == 1 || conflict {
                    candidates.into_iter().map(|(action, _)| action).collect()
                } else {
                    let action = table::resolve(&candidates, &productions)
                        .map_err(|message| GrammarError::state(index, message))?;
                    vec![action]
                };
                row.lookaheads.push(lookahead);
                row.actions.insert(lookahead, ActionCell { actions, conflict });
            }
            for (rule_name, target) in &state.gotos {
                let symbol = lookup(rule_name, &context)?;
                if !is_rule(symbol) {
                    return Err(GrammarError::wrong_kind(rule_name, context));
                }
                if *target as usize >= state_count {
                    return Err(GrammarError::state(
                        index,
                        format!("goto to missing state {}", target),
                    ));
                }
                row.gotos.insert(symbol, StateId::new(*target));
            }
            rows.push(row);
        }

        // Lex modes: one per distinct set of valid terminals, plus the error mode.
        let extras: Vec<Symbol> = symbols
            .iter()
            .enumerate()
            .filter(|(_, info)| info.kind == SymbolKind::Terminal && info.extra)
            .map(|(index, _)| Symbol::new(index as u16))
            .collect();
        let mut mode_ids: FxHashMap<Vec<Symbol>, LexModeId> = FxHashMap::default();
        let mut lex_modes = Vec::new();
        let mut mode_externals = Vec::new();
        for row in &mut rows {
            let mut valid: Vec<Symbol> = row
                .lookaheads
                .iter()
                .copied()
                .filter(|s| *s != Symbol::END)
                .chain(extras.iter().copied())
                .collect();
            valid.sort();
            valid.dedup();
            let next = LexModeId::new(lex_modes.len() as u16);
            let id = *mode_ids.entry(valid.clone()).or_insert(next);
            if id == next {
                let rules: Vec<&TokenRule> = tokens
                    .iter()
                    .filter(|t| valid.binary_search(&t.symbol).is_ok())
                    .collect();
                lex_modes.push(LexMode::compile(&rules)?);
                mode_externals.push(
                    externals
                        .iter()
                        .map(|symbol| valid.binary_search(symbol).is_ok())
                        .collect(),
                );
            }
            row.lex_mode = id;
        }
        let error_mode = LexModeId::new(lex_modes.len() as u16);
        lex_modes.push(LexMode::compile(&tokens.iter().collect::<Vec<_>>())?);
        mode_externals.push(vec![true; externals.len()]);

        let resources = source
            .resources
            .iter()
            .map(|(name, text)| (SmolStr::from(name.as_str()), Arc::from(text.as_str())))
            .collect();

        tracing::debug!(
            grammar = %name,
            symbols = symbols.len(),
            states = rows.len(),
            lex_modes = lex_modes.len(),
            "loaded grammar"
        );

        Ok(Self {
            id: GrammarId {
                name,
                version: source.version,
            },
            start,
            symbols,
            by_name,
            tokens,
            externals,
            productions,
            table: ParseTable { states: rows },
            lex_modes,
            mode_externals,
            error_mode,
            resources,
            scanner: None,
        })
    }

    /// Attach the scanner for this grammar's external tokens.
    ///
    /// Without one, external tokens are never produced and only the regular
    /// token rules run.
    pub fn with_external_scanner(mut self, scanner: Arc<dyn ExternalScanner>) -> Self {
        self.scanner = Some(scanner);
        self
    }

    pub fn external_scanner(&self) -> Option<&Arc<dyn ExternalScanner>> {
        self.scanner.as_ref()
    }

    /// External token symbols, indexed the way the scanner refers to them.
    pub fn externals(&self) -> &[Symbol] {
        &self.externals
    }

    /// Which external tokens are valid in a lex mode.
    pub fn valid_externals(&self, id: LexModeId) -> &[bool] {
        self.mode_externals
            .get(id.index())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn id(&self) -> &GrammarId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn start_symbol(&self) -> Symbol {
        self.start
    }

    pub fn table(&self) -> &ParseTable {
        &self.table
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// Metadata for `symbol`, if it belongs to this grammar.
    pub fn symbol_info(&self, symbol: Symbol) -> Option<&SymbolInfo> {
        self.symbols.get(symbol.index())
    }

    /// Display name of `symbol`; `"?"` for foreign symbols.
    pub fn symbol_name(&self, symbol: Symbol) -> &str {
        self.symbol_info(symbol)
            .map(|info| info.name.as_str())
            .unwrap_or("?")
    }

    pub fn symbol_for_name(&self, name: &str) -> Option<Symbol> {
        self.by_name.get(name).copied()
    }

    pub fn is_terminal(&self, symbol: Symbol) -> bool {
        self.symbol_info(symbol)
            .is_some_and(|info| info.kind == SymbolKind::Terminal)
    }

    pub fn is_extra(&self, symbol: Symbol) -> bool {
        self.symbol_info(symbol).is_some_and(|info| info.extra)
    }

    pub fn is_named(&self, symbol: Symbol) -> bool {
        self.symbol_info(symbol).is_some_and(|info| info.named)
    }

    /// Terminals in symbol order, external tokens included.
    pub fn terminals(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.tokens
            .iter()
            .map(|t| t.symbol)
            .chain(self.externals.iter().copied())
    }

    pub fn tokens(&self) -> &[TokenRule] {
        &self.tokens
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub fn production(&self, id: ProductionId) -> Option<&Production> {
        self.productions.get(id.index())
    }

    pub fn lex_mode_count(&self) -> usize {
        self.lex_modes.len()
    }

    /// The lex mode holding every token rule, used when a state's own mode fails.
    pub fn error_lex_mode(&self) -> LexModeId {
        self.error_mode
    }

    pub(crate) fn lex_mode(&self, id: LexModeId) -> Option<&LexMode> {
        self.lex_modes.get(id.index())
    }

    /// Terminals a lex mode recognizes, external tokens last.
    pub fn lex_mode_symbols(&self, id: LexModeId) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self
            .lex_mode(id)
            .map(|mode| mode.symbols().collect())
            .unwrap_or_default();
        symbols.extend(
            self.externals
                .iter()
                .zip(self.valid_externals(id))
                .filter(|(_, valid)| **valid)
                .map(|(symbol, _)| *symbol),
        );
        symbols
    }

    /// A named text blob shipped with the table.
    pub fn resource(&self, name: &str) -> Option<&str> {
        self.resources.get(name).map(|text| &**text)
    }

    pub fn resource_names(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(|name| name.as_str())
    }
}

/// Register a user symbol name, returning the symbol it will get.
fn declare(
    next: usize,
    by_name: &mut FxHashMap<SmolStr, Symbol>,
    name: &str,
) -> Result<Symbol, GrammarError> {
    if BUILTIN_NAMES.contains(&name) {
        return Err(GrammarError::ReservedName(name.into()));
    }
    let symbol = Symbol::new(next as u16);
    if by_name.insert(name.into(), symbol).is_some() {
        return Err(GrammarError::DuplicateSymbol(name.into()));
    }
    Ok(symbol)
}
