//! Immutable, shared tree nodes.
//!
//! A [`Subtree`] stores only relative sizes: its byte length and its
//! row/column extent. Absolute positions are computed while walking down from
//! the root, which is what lets an edited tree share every untouched subtree
//! with the tree it came from.

use std::fmt;
use std::sync::Arc;

use text_size::TextSize;

use crate::base::Point;
use crate::grammar::{Grammar, LexModeId, ProductionId, ScannerState, StateId, Symbol};

/// A reference-counted syntax tree node.
#[derive(Clone)]
pub struct Subtree(Arc<SubtreeData>);

#[derive(Debug, Clone)]
pub(crate) struct SubtreeData {
    pub(crate) symbol: Symbol,
    pub(crate) len: TextSize,
    pub(crate) extent: Point,
    pub(crate) children: Vec<Subtree>,
    pub(crate) flags: Flags,
    /// State the parser was in when the node started: the state below the
    /// node for reductions, the state that shifted it for leaves.
    pub(crate) parse_state: StateId,
    /// Leaves: the mode the token was lexed in. Internal nodes: the mode of
    /// the lookahead token that triggered the reduction.
    pub(crate) lex_mode: LexModeId,
    /// Internal nodes: the lookahead symbol that triggered the reduction.
    pub(crate) follow: Symbol,
    /// Bytes past the end of the node the lexer inspected while building it.
    pub(crate) lookahead_bytes: u32,
    /// External scanner state after the last external token in the node.
    pub(crate) scanner_state: Option<ScannerState>,
    pub(crate) production: Option<ProductionId>,
    pub(crate) error_cost: u32,
    pub(crate) dynamic_precedence: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Flags {
    pub(crate) named: bool,
    pub(crate) extra: bool,
    pub(crate) missing: bool,
    pub(crate) fragile: bool,
    pub(crate) has_changes: bool,
    pub(crate) has_error: bool,
}

/// How an internal node came to be.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Reduction {
    pub(crate) production: ProductionId,
    pub(crate) parse_state: StateId,
    pub(crate) follow: Symbol,
    pub(crate) follow_mode: LexModeId,
    pub(crate) dynamic_precedence: i32,
    pub(crate) fragile: bool,
}

impl Subtree {
    fn from_data(data: SubtreeData) -> Self {
        Self(Arc::new(data))
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// A token leaf.
    pub(crate) fn leaf(
        grammar: &Grammar,
        symbol: Symbol,
        text: &str,
        lex_mode: LexModeId,
        lookahead_bytes: u32,
        scanner_state: Option<ScannerState>,
        parse_state: StateId,
    ) -> Self {
        let is_error = symbol == Symbol::ERROR_TOKEN;
        Self::from_data(SubtreeData {
            symbol,
            len: TextSize::of(text),
            extent: Point::extent_of(text),
            children: Vec::new(),
            flags: Flags {
                named: grammar.is_named(symbol),
                extra: grammar.is_extra(symbol),
                has_error: is_error,
                ..Flags::default()
            },
            parse_state,
            lex_mode,
            follow: Symbol::END,
            lookahead_bytes,
            scanner_state,
            production: None,
            error_cost: 0,
            dynamic_precedence: 0,
        })
    }

    /// A zero-width token inserted by error recovery.
    pub(crate) fn missing(
        grammar: &Grammar,
        symbol: Symbol,
        parse_state: StateId,
        lex_mode: LexModeId,
        cost: u32,
    ) -> Self {
        Self::from_data(SubtreeData {
            symbol,
            len: TextSize::new(0),
            extent: Point::ZERO,
            children: Vec::new(),
            flags: Flags {
                named: grammar.is_named(symbol),
                missing: true,
                fragile: true,
                has_error: true,
                ..Flags::default()
            },
            parse_state,
            lex_mode,
            follow: Symbol::END,
            lookahead_bytes: 0,
            scanner_state: None,
            production: None,
            error_cost: cost,
            dynamic_precedence: 0,
        })
    }

    /// An internal node built by a reduction.
    pub(crate) fn node(
        grammar: &Grammar,
        symbol: Symbol,
        children: Vec<Subtree>,
        reduction: Reduction,
    ) -> Self {
        let mut data = Self::composite(symbol, children);
        data.flags.named = grammar.is_named(symbol);
        data.flags.fragile = reduction.fragile;
        data.parse_state = reduction.parse_state;
        data.lex_mode = reduction.follow_mode;
        data.follow = reduction.follow;
        data.production = Some(reduction.production);
        data.dynamic_precedence += reduction.dynamic_precedence;
        Self::from_data(data)
    }

    /// A node wrapping input that recovery skipped or popped.
    pub(crate) fn error(children: Vec<Subtree>, cost: u32, parse_state: StateId) -> Self {
        let mut data = Self::composite(Symbol::ERROR, children);
        data.flags.named = true;
        data.flags.fragile = true;
        data.flags.has_error = true;
        data.parse_state = parse_state;
        data.error_cost += cost;
        Self::from_data(data)
    }

    /// Alternative parses of the same bytes, in the order they were found.
    ///
    /// Alternatives that are themselves ambiguity nodes are flattened.
    pub(crate) fn ambiguity(alternatives: Vec<Subtree>) -> Self {
        let mut flat = Vec::with_capacity(alternatives.len());
        for alternative in alternatives {
            if alternative.is_ambiguity() {
                flat.extend(alternative.children().iter().cloned());
            } else if !flat.iter().any(|a: &Subtree| a.ptr_eq(&alternative)) {
                flat.push(alternative);
            }
        }
        let lookahead_bytes = flat.iter().map(|a| a.lookahead_bytes()).max().unwrap_or(0);
        let has_error = flat.iter().any(|a| a.has_error());
        let error_cost = flat.iter().map(|a| a.error_cost()).min().unwrap_or(0);
        let scanner_state = flat.first().and_then(|first| first.0.scanner_state.clone());
        let (len, extent, parse_state, lex_mode, follow, dynamic_precedence) = match flat.first() {
            Some(first) => (
                first.0.len,
                first.0.extent,
                first.0.parse_state,
                first.0.lex_mode,
                first.0.follow,
                first.0.dynamic_precedence,
            ),
            None => (
                TextSize::new(0),
                Point::ZERO,
                StateId::default(),
                LexModeId::default(),
                Symbol::END,
                0,
            ),
        };
        Self::from_data(SubtreeData {
            symbol: Symbol::AMBIGUITY,
            len,
            extent,
            children: flat,
            flags: Flags {
                named: true,
                fragile: true,
                has_error,
                ..Flags::default()
            },
            parse_state,
            lex_mode,
            follow,
            lookahead_bytes,
            scanner_state,
            production: None,
            error_cost,
            dynamic_precedence,
        })
    }

    /// Sizes, lookahead and error summary of a node over `children`.
    fn composite(symbol: Symbol, children: Vec<Subtree>) -> SubtreeData {
        let mut len = TextSize::new(0);
        let mut extent = Point::ZERO;
        let mut dependency_end = TextSize::new(0);
        let mut has_error = false;
        let mut error_cost = 0;
        let mut dynamic_precedence = 0;
        let mut scanner_state = None;
        for child in &children {
            len += child.len();
            extent = extent + child.extent();
            dependency_end = dependency_end.max(len + TextSize::new(child.lookahead_bytes()));
            has_error |= child.has_error();
            error_cost += child.error_cost();
            dynamic_precedence += child.dynamic_precedence();
            if let Some(state) = &child.0.scanner_state {
                scanner_state = Some(state.clone());
            }
        }
        SubtreeData {
            symbol,
            len,
            extent,
            children,
            flags: Flags {
                has_error,
                ..Flags::default()
            },
            parse_state: StateId::default(),
            lex_mode: LexModeId::default(),
            follow: Symbol::END,
            lookahead_bytes: u32::from(dependency_end.checked_sub(len).unwrap_or_default()),
            scanner_state,
            production: None,
            error_cost,
            dynamic_precedence,
        }
    }

    /// Copy of this node with a different set of children of the same total size.
    pub(crate) fn with_children(&self, children: Vec<Subtree>) -> Self {
        let mut data = Self::composite(self.symbol(), children);
        let has_error = data.flags.has_error || self.symbol() == Symbol::ERROR;
        data.flags = Flags {
            has_error,
            ..self.0.flags
        };
        data.parse_state = self.0.parse_state;
        data.lex_mode = self.0.lex_mode;
        data.follow = self.0.follow;
        data.production = self.0.production;
        data.error_cost = self.0.error_cost;
        data.dynamic_precedence = self.0.dynamic_precedence;
        Self::from_data(data)
    }

    /// Copy of this leaf recorded as shifted from `state`.
    pub(crate) fn with_parse_state(&self, state: StateId) -> Self {
        if self.0.parse_state == state {
            return self.clone();
        }
        let mut data = (*self.0).clone();
        data.parse_state = state;
        Self::from_data(data)
    }

    pub(crate) fn mark_fragile(&self) -> Self {
        if self.0.flags.fragile {
            return self.clone();
        }
        let mut data = (*self.0).clone();
        data.flags.fragile = true;
        Self::from_data(data)
    }

    /// Copy of this node with new sizes, flagged as touched by an edit.
    pub(crate) fn edited(&self, len: TextSize, extent: Point, children: Vec<Subtree>) -> Self {
        let mut data = (*self.0).clone();
        data.len = len;
        data.extent = extent;
        data.children = children;
        data.flags.has_changes = true;
        Self::from_data(data)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn symbol(&self) -> Symbol {
        self.0.symbol
    }

    pub fn len(&self) -> TextSize {
        self.0.len
    }

    pub fn is_empty(&self) -> bool {
        self.0.len == TextSize::new(0)
    }

    /// Rows and columns spanned, as an offset from the node's start point.
    pub fn extent(&self) -> Point {
        self.0.extent
    }

    pub fn children(&self) -> &[Subtree] {
        &self.0.children
    }

    pub fn is_leaf(&self) -> bool {
        self.0.children.is_empty() && self.0.production.is_none() && !self.is_composite_builtin()
    }

    fn is_composite_builtin(&self) -> bool {
        matches!(self.0.symbol, Symbol::ERROR | Symbol::AMBIGUITY)
    }

    pub fn is_named(&self) -> bool {
        self.0.flags.named
    }

    pub fn is_extra(&self) -> bool {
        self.0.flags.extra
    }

    pub fn is_missing(&self) -> bool {
        self.0.flags.missing
    }

    /// `ERROR` nodes and error token leaves.
    pub fn is_error(&self) -> bool {
        matches!(self.0.symbol, Symbol::ERROR | Symbol::ERROR_TOKEN)
    }

    pub fn is_ambiguity(&self) -> bool {
        self.0.symbol == Symbol::AMBIGUITY
    }

    pub fn is_fragile(&self) -> bool {
        self.0.flags.fragile
    }

    pub fn has_changes(&self) -> bool {
        self.0.flags.has_changes
    }

    /// Whether this node or any descendant is an error or missing node.
    pub fn has_error(&self) -> bool {
        self.0.flags.has_error
    }

    pub fn parse_state(&self) -> StateId {
        self.0.parse_state
    }

    pub fn lex_mode(&self) -> LexModeId {
        self.0.lex_mode
    }

    pub fn follow_symbol(&self) -> Symbol {
        self.0.follow
    }

    pub fn lookahead_bytes(&self) -> u32 {
        self.0.lookahead_bytes
    }

    /// External scanner state after this node, if it contains an external token.
    pub fn scanner_state(&self) -> Option<&ScannerState> {
        self.0.scanner_state.as_ref()
    }

    pub fn production(&self) -> Option<ProductionId> {
        self.0.production
    }

    pub fn error_cost(&self) -> u32 {
        self.0.error_cost
    }

    pub fn dynamic_precedence(&self) -> i32 {
        self.0.dynamic_precedence
    }

    /// Whether both handles point at the same allocation.
    pub fn ptr_eq(&self, other: &Subtree) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Subtree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subtree")
            .field("symbol", &self.0.symbol)
            .field("len", &self.0.len)
            .field("children", &self.0.children.len())
            .field("flags", &self.0.flags)
            .finish()
    }
}
