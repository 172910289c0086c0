//! Diagnostics derived from a parsed tree.

use text_size::{TextRange, TextSize};

use super::{ErrorCode, SyntaxError};
use crate::grammar::{Grammar, Symbol};
use crate::syntax::{Subtree, Tree};

impl Tree {
    /// Diagnostics for every error, missing and ambiguity node, in document
    /// order.
    ///
    /// Within an ambiguity only the first alternative is inspected.
    pub fn diagnostics(&self) -> Vec<SyntaxError> {
        let mut out = Vec::new();
        let root = self.root_subtree();
        if root.symbol() == Symbol::ERROR {
            out.push(error_node(self.grammar(), root, TextSize::new(0), ErrorCode::E0302));
            collect_children(self.grammar(), root, TextSize::new(0), &mut out);
        } else {
            collect(self.grammar(), root, TextSize::new(0), None, &mut out);
        }
        out
    }
}

fn collect(
    grammar: &Grammar,
    subtree: &Subtree,
    start: TextSize,
    previous: Option<TextRange>,
    out: &mut Vec<SyntaxError>,
) {
    if !subtree.has_error() && !subtree.is_fragile() {
        return;
    }
    let range = TextRange::at(start, subtree.len());
    if subtree.is_ambiguity() {
        let alternatives = subtree.children();
        let name = alternatives
            .first()
            .map_or("?", |first| grammar.symbol_name(first.symbol()));
        let mut error = SyntaxError::builder(ErrorCode::E0901)
            .message(format!("ambiguous `{name}`: {} parses", alternatives.len()))
            .range(range);
        for (index, alternative) in alternatives.iter().enumerate() {
            error = error.related(
                format!(
                    "alternative {}: {}",
                    index + 1,
                    alternative_summary(grammar, alternative)
                ),
                range,
            );
        }
        out.push(error.build());
        if let Some(first) = alternatives.first() {
            collect(grammar, first, start, previous, out);
        }
        return;
    }
    if subtree.symbol() == Symbol::ERROR {
        out.push(error_node(grammar, subtree, start, ErrorCode::E0301));
        collect_children(grammar, subtree, start, out);
        return;
    }
    if subtree.symbol() == Symbol::ERROR_TOKEN {
        out.push(SyntaxError::new(
            ErrorCode::E0101.default_message(),
            range,
            ErrorCode::E0101,
        ));
        return;
    }
    if subtree.is_missing() {
        let name = grammar.symbol_name(subtree.symbol());
        let mut error = SyntaxError::at_offset(format!("missing `{name}`"), start, ErrorCode::E0201)
            .with_hint(format!("insert `{name}` here"));
        if let Some(previous) = previous {
            error = error.with_related(super::RelatedInfo::new("expected after this", previous));
        }
        out.push(error);
        return;
    }
    collect_children(grammar, subtree, start, out);
}

fn collect_children(grammar: &Grammar, subtree: &Subtree, start: TextSize, out: &mut Vec<SyntaxError>) {
    let mut offset = start;
    let mut previous = None;
    for child in subtree.children() {
        collect(grammar, child, offset, previous, out);
        if !child.is_extra() && !child.is_empty() {
            previous = Some(TextRange::at(offset, child.len()));
        }
        offset += child.len();
    }
}

/// Diagnostic for an `ERROR` node, covering its content without the
/// surrounding extras.
fn error_node(grammar: &Grammar, subtree: &Subtree, start: TextSize, code: ErrorCode) -> SyntaxError {
    let mut offset = start;
    let mut content: Option<TextRange> = None;
    let mut symbols = Vec::new();
    for child in subtree.children() {
        let range = TextRange::at(offset, child.len());
        if !child.is_extra() || child.symbol() == Symbol::ERROR {
            content = Some(content.map_or(range, |c| c.cover(range)));
            symbols.push(child.symbol());
        }
        offset += child.len();
    }
    let range = content.unwrap_or_else(|| TextRange::at(start, subtree.len()));
    let message = match symbols.as_slice() {
        [single] if *single != Symbol::ERROR_TOKEN && *single != Symbol::ERROR => {
            format!("unexpected `{}`", grammar.symbol_name(*single))
        }
        _ => code.default_message().to_string(),
    };
    SyntaxError::new(message, range, code)
}

fn alternative_summary(grammar: &Grammar, alternative: &Subtree) -> String {
    let children: Vec<&str> = alternative
        .children()
        .iter()
        .filter(|child| !child.is_extra())
        .map(|child| grammar.symbol_name(child.symbol()))
        .collect();
    format!(
        "{} -> {}",
        grammar.symbol_name(alternative.symbol()),
        children.join(" ")
    )
}
