//! The serialized grammar table artifact and a builder for assembling one in code.
//!
//! A grammar artifact is a JSON document:
//!
//! ```json
//! {
//!   "name": "sum",
//!   "version": 1,
//!   "start": "expression",
//!   "tokens": [
//!     { "name": "number", "pattern": "[0-9]+" },
//!     { "name": "+", "literal": "+" },
//!     { "name": "whitespace", "pattern": "\\s+", "extra": true }
//!   ],
//!   "rules": ["expression"],
//!   "productions": [
//!     { "lhs": "expression", "rhs": ["expression", "+", "expression"] },
//!     { "lhs": "expression", "rhs": ["number"] }
//!   ],
//!   "states": [
//!     { "actions": { "number": [{ "shift": 2 }] }, "gotos": { "expression": 1 } }
//!   ]
//! }
//! ```
//!
//! The artifact is plain data; [`crate::grammar::Grammar::from_source`] is
//! where it gets validated.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{Grammar, GrammarError, MAX_TABLE_VERSION};

/// Root of a grammar table artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GrammarSource {
    pub name: String,
    pub version: u32,
    pub start: String,
    #[serde(default)]
    pub tokens: Vec<TokenSource>,
    /// Tokens recognized by an external scanner, in the order the scanner
    /// refers to them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub externals: Vec<ExternalSource>,
    #[serde(default)]
    pub rules: Vec<String>,
    #[serde(default)]
    pub productions: Vec<ProductionSource>,
    #[serde(default)]
    pub states: Vec<StateSource>,
    /// Named text blobs shipped alongside the table (highlight queries and the like).
    #[serde(default)]
    pub resources: IndexMap<String, String>,
}

/// A lexical token rule. Exactly one of `pattern` and `literal` must be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenSource {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,
    /// Trivia such as whitespace and comments, allowed between any two tokens.
    #[serde(default)]
    pub extra: bool,
    /// Defaults to `true` for patterns and `false` for literals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub named: Option<bool>,
    #[serde(default)]
    pub precedence: i32,
}

/// A token produced by the grammar's external scanner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalSource {
    pub name: String,
    #[serde(default)]
    pub extra: bool,
    /// Defaults to `true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub named: Option<bool>,
}

/// Operator associativity used when resolving shift/reduce conflicts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Associativity {
    #[default]
    None,
    Left,
    Right,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductionSource {
    pub lhs: String,
    #[serde(default)]
    pub rhs: Vec<String>,
    #[serde(default)]
    pub precedence: i32,
    #[serde(default)]
    pub associativity: Associativity,
    #[serde(default)]
    pub dynamic_precedence: i32,
}

/// One parse state: actions by lookahead name, gotos by rule name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateSource {
    #[serde(default)]
    pub actions: IndexMap<String, Vec<ActionSource>>,
    #[serde(default)]
    pub gotos: IndexMap<String, u32>,
    /// Lookaheads whose multi-action cells are explored by splitting the stack.
    #[serde(default)]
    pub conflicts: Vec<String>,
}

/// A single table action. Exactly one of `shift`, `reduce` and `accept` must be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shift: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reduce: Option<u32>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub accept: bool,
    /// Precedence of a shift; reductions take theirs from the production.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub precedence: i32,
}

fn is_zero(value: &i32) -> bool {
    *value == 0
}

impl ActionSource {
    pub fn shift(state: u32) -> Self {
        Self {
            shift: Some(state),
            ..Self::default()
        }
    }

    pub fn reduce(production: u32) -> Self {
        Self {
            reduce: Some(production),
            ..Self::default()
        }
    }

    pub fn accept() -> Self {
        Self {
            accept: true,
            ..Self::default()
        }
    }
}

impl GrammarSource {
    /// Parse an artifact from JSON without validating it.
    pub fn from_json(json: &str) -> Result<Self, GrammarError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, GrammarError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Assembles a [`GrammarSource`] in code.
///
/// ```ignore
/// let grammar = GrammarBuilder::new("sum")
///     .start("expression")
///     .token("number", "[0-9]+")
///     .literal("+")
///     .extra("whitespace", r"\s+")
///     .rule("expression")
///     .production("expression", &["expression", "+", "expression"])
///     .production("expression", &["number"])
///     .state(StateBuilder::new().shift("number", 2).goto("expression", 1))
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct GrammarBuilder {
    source: GrammarSource,
}

impl GrammarBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            source: GrammarSource {
                name: name.into(),
                version: MAX_TABLE_VERSION,
                ..GrammarSource::default()
            },
        }
    }

    pub fn version(mut self, version: u32) -> Self {
        self.source.version = version;
        self
    }

    pub fn start(mut self, rule: impl Into<String>) -> Self {
        self.source.start = rule.into();
        self
    }

    /// A named token matched by a regular expression.
    pub fn token(self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.token_source(TokenSource {
            name: name.into(),
            pattern: Some(pattern.into()),
            ..TokenSource::default()
        })
    }

    /// An anonymous token named by its own text.
    pub fn literal(self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.token_source(TokenSource {
            name: text.clone(),
            literal: Some(text),
            ..TokenSource::default()
        })
    }

    /// A trivia token matched by a regular expression.
    pub fn extra(self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.token_source(TokenSource {
            name: name.into(),
            pattern: Some(pattern.into()),
            extra: true,
            ..TokenSource::default()
        })
    }

    pub fn token_source(mut self, token: TokenSource) -> Self {
        self.source.tokens.push(token);
        self
    }

    /// A named token left to the external scanner.
    pub fn external(self, name: impl Into<String>) -> Self {
        self.external_source(ExternalSource {
            name: name.into(),
            ..ExternalSource::default()
        })
    }

    pub fn external_source(mut self, external: ExternalSource) -> Self {
        self.source.externals.push(external);
        self
    }

    pub fn rule(mut self, name: impl Into<String>) -> Self {
        self.source.rules.push(name.into());
        self
    }

    pub fn production(self, lhs: impl Into<String>, rhs: &[&str]) -> Self {
        self.production_source(ProductionSource {
            lhs: lhs.into(),
            rhs: rhs.iter().map(|s| s.to_string()).collect(),
            ..ProductionSource::default()
        })
    }

    pub fn production_source(mut self, production: ProductionSource) -> Self {
        self.source.productions.push(production);
        self
    }

    pub fn state(mut self, state: StateBuilder) -> Self {
        self.source.states.push(state.finish());
        self
    }

    pub fn resource(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.source.resources.insert(name.into(), text.into());
        self
    }

    /// The assembled artifact, unvalidated.
    pub fn into_source(self) -> GrammarSource {
        self.source
    }

    /// Validate and compile the assembled artifact.
    pub fn build(self) -> Result<Grammar, GrammarError> {
        Grammar::from_source(self.source)
    }
}

/// Assembles one [`StateSource`].
#[derive(Debug, Clone, Default)]
pub struct StateBuilder {
    state: StateSource,
}

impl StateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shift(self, lookahead: &str, state: u32) -> Self {
        self.action(lookahead, ActionSource::shift(state))
    }

    pub fn reduce(self, lookahead: &str, production: u32) -> Self {
        self.action(lookahead, ActionSource::reduce(production))
    }

    /// Accept on end of input.
    pub fn accept(self) -> Self {
        self.action("end", ActionSource::accept())
    }

    pub fn action(mut self, lookahead: &str, action: ActionSource) -> Self {
        self.state
            .actions
            .entry(lookahead.to_string())
            .or_default()
            .push(action);
        self
    }

    pub fn goto(mut self, rule: &str, state: u32) -> Self {
        self.state.gotos.insert(rule.to_string(), state);
        self
    }

    /// Mark the cell for `lookahead` as a conflict to explore with stack splitting.
    pub fn conflict(mut self, lookahead: &str) -> Self {
        self.state.conflicts.push(lookahead.to_string());
        self
    }

    pub fn finish(self) -> StateSource {
        self.state
    }
}
