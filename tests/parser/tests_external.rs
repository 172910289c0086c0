//! External scanners, through an indentation-sensitive grammar.

use std::sync::Arc;

use rstest::rstest;

use arbor::grammar::{
    ExternalMatch, ExternalScanner, GrammarBuilder, ScanInput, ScannerState, StateBuilder,
    StateId,
};
use arbor::parser::Lexer;
use arbor::{Grammar, Node, Parser, Symbol, TextRange, TextSize, Tree};

use crate::helpers::edit_helpers::{edit_and_reparse, find};
use crate::helpers::tree_assertions::{assert_covers, assert_matches_fresh_parse, shares_subtree};

const NEWLINE: usize = 0;
const INDENT: usize = 1;
const DEDENT: usize = 2;

/// Blocks opened by `name:` and an indented line. The state is the
/// indentation of the current line followed by the open block indentations.
#[derive(Debug)]
struct Indentation;

impl ExternalScanner for Indentation {
    fn scan(&self, input: &ScanInput<'_>) -> Option<ExternalMatch> {
        let (pending, mut stack) = match input.state.split_first() {
            Some((pending, stack)) => (*pending, stack.to_vec()),
            None => (0, Vec::new()),
        };
        let top = stack.last().copied().unwrap_or(0);
        let rest = input.rest();
        if rest.starts_with('\n') {
            let (len, indent) = line_break(rest);
            if input.is_valid(INDENT) && indent > top {
                stack.push(indent);
                return Some(found(INDENT, len, indent, &stack));
            }
            if input.is_valid(NEWLINE) {
                return Some(found(NEWLINE, len, indent, &stack));
            }
            return None;
        }
        if input.is_valid(DEDENT) && pending < top {
            stack.pop();
            return Some(found(DEDENT, 0, pending, &stack));
        }
        None
    }
}

/// Length of the line breaks and indentation before the next non-blank
/// line, and that line's indentation. The end of the text has none.
fn line_break(rest: &str) -> (usize, u8) {
    let bytes = rest.as_bytes();
    let mut len = 0;
    loop {
        len += 1;
        let spaces = bytes[len..].iter().take_while(|b| **b == b' ').count();
        len += spaces;
        match bytes.get(len) {
            Some(b'\n') => continue,
            Some(_) => return (len, spaces as u8),
            None => return (len, 0),
        }
    }
}

fn found(token: usize, len: usize, pending: u8, stack: &[u8]) -> ExternalMatch {
    let mut state = vec![pending];
    state.extend_from_slice(stack);
    ExternalMatch {
        token,
        len,
        inspected: len + 1,
        state,
    }
}

/// Scanner that always gives the same answer and keeps its state.
#[derive(Debug)]
struct Fixed {
    token: usize,
    len: usize,
}

impl ExternalScanner for Fixed {
    fn scan(&self, input: &ScanInput<'_>) -> Option<ExternalMatch> {
        Some(ExternalMatch {
            token: self.token,
            len: self.len,
            inspected: self.len,
            state: input.state.to_vec(),
        })
    }
}

/// ```text
/// module -> _items
/// _items -> _items item | ε
/// item   -> identifier newline | identifier ":" indent _items dedent
/// ```
fn blocks(scanner: Arc<dyn ExternalScanner>) -> Grammar {
    GrammarBuilder::new("blocks")
        .start("module")
        .token("identifier", "[a-z]+")
        .literal(":")
        .extra("whitespace", "[ ]+")
        .external("newline")
        .external("indent")
        .external("dedent")
        .rule("module")
        .rule("_items")
        .rule("item")
        .production("module", &["_items"])
        .production("_items", &["_items", "item"])
        .production("_items", &[])
        .production("item", &["identifier", "newline"])
        .production("item", &["identifier", ":", "indent", "_items", "dedent"])
        .state(
            StateBuilder::new()
                .reduce("identifier", 2)
                .reduce("end", 2)
                .goto("_items", 1)
                .goto("module", 2),
        )
        .state(
            StateBuilder::new()
                .reduce("end", 0)
                .shift("identifier", 3)
                .goto("item", 4),
        )
        .state(StateBuilder::new().accept())
        .state(StateBuilder::new().shift("newline", 5).shift(":", 6))
        .state(
            StateBuilder::new()
                .reduce("identifier", 1)
                .reduce("end", 1)
                .reduce("dedent", 1),
        )
        .state(
            StateBuilder::new()
                .reduce("identifier", 3)
                .reduce("end", 3)
                .reduce("dedent", 3),
        )
        .state(StateBuilder::new().shift("indent", 7))
        .state(
            StateBuilder::new()
                .reduce("identifier", 2)
                .reduce("dedent", 2)
                .goto("_items", 8),
        )
        .state(
            StateBuilder::new()
                .shift("dedent", 9)
                .shift("identifier", 3)
                .goto("item", 4),
        )
        .state(
            StateBuilder::new()
                .reduce("identifier", 4)
                .reduce("end", 4)
                .reduce("dedent", 4),
        )
        .build()
        .unwrap()
        .with_external_scanner(scanner)
}

fn parser() -> Parser {
    Parser::new(Arc::new(blocks(Arc::new(Indentation))))
}

fn collect<'t>(node: Node<'t>, kind: &str, out: &mut Vec<Node<'t>>) {
    if node.kind() == kind {
        out.push(node);
    }
    for child in node.children() {
        collect(child, kind, out);
    }
}

fn scanner_states(tree: &Tree) -> Vec<(String, Option<ScannerState>)> {
    tree.leaves()
        .iter()
        .map(|leaf| (leaf.kind().to_string(), leaf.subtree().scanner_state().cloned()))
        .collect()
}

#[rstest]
#[case("a\n", "(module (item (identifier) (newline)))")]
#[case(
    "a:\n  b\n",
    "(module (item (identifier) (indent) (item (identifier) (newline)) (dedent)))"
)]
#[case(
    "a:\n  b\nc\n",
    "(module (item (identifier) (indent) (item (identifier) (newline)) (dedent)) (item (identifier) (newline)))"
)]
#[case(
    "a:\n  b:\n    c\nd\n",
    "(module (item (identifier) (indent) (item (identifier) (indent) (item (identifier) (newline)) (dedent)) (dedent)) (item (identifier) (newline)))"
)]
#[case(
    "a:\n\n  b\n",
    "(module (item (identifier) (indent) (item (identifier) (newline)) (dedent)))"
)]
fn test_blocks_follow_indentation(#[case] text: &str, #[case] expected: &str) {
    let tree = parser().parse(text).unwrap();
    assert!(!tree.has_error(), "{}", tree.to_sexp());
    assert_eq!(tree.to_sexp(), expected);
    assert_covers(&tree, text);
}

#[test]
fn test_external_leaves_carry_the_scanner_state() {
    let tree = parser().parse("a:\n  b\nc\n").unwrap();
    let states = scanner_states(&tree);
    let external: Vec<_> = states
        .iter()
        .filter(|(_, state)| state.is_some())
        .map(|(kind, state)| (kind.as_str(), state.clone().unwrap_or_default()))
        .collect();
    assert_eq!(
        external,
        vec![
            ("indent", ScannerState::new(&[2, 2])),
            ("newline", ScannerState::new(&[0, 2])),
            ("dedent", ScannerState::new(&[0])),
            ("newline", ScannerState::new(&[0])),
        ]
    );
    assert!(states
        .iter()
        .filter(|(kind, _)| kind == "identifier")
        .all(|(_, state)| state.is_none()));
}

#[test]
fn test_dedent_is_zero_width() {
    let text = "a:\n  b\nc\n";
    let tree = parser().parse(text).unwrap();
    let mut dedents = Vec::new();
    collect(tree.root_node(), "dedent", &mut dedents);
    assert_eq!(dedents.len(), 1);
    assert_eq!(dedents[0].byte_range(), TextRange::empty(find(text, "c").start()));
}

#[rstest]
#[case::indent_a_line("a:\n  b\nc\n", TextRange::empty(TextSize::new(7)), "  ")]
#[case::outdent_a_line("a:\n  b\n  c\n", TextRange::new(7.into(), 9.into()), "")]
#[case::open_a_block("a\nb\n", TextRange::new(1.into(), 2.into()), ":\n  ")]
#[case::close_a_block("a:\n  b\n", TextRange::new(1.into(), 5.into()), "\n")]
#[case::deepen_a_block("a:\n  b\n  c\n", TextRange::new(2.into(), 5.into()), "\n    ")]
fn test_indentation_edits_match_a_fresh_parse(
    #[case] text: &str,
    #[case] range: TextRange,
    #[case] replacement: &str,
) {
    let parser = parser();
    let tree = parser.parse(text).unwrap();
    let result = edit_and_reparse(&parser, &tree, text, range, replacement);
    assert_matches_fresh_parse(&parser, &result.tree, &result.text);
    assert_eq!(
        scanner_states(&result.tree),
        scanner_states(&parser.parse(&result.text).unwrap())
    );
}

#[test]
fn test_reuse_requires_the_same_scanner_state() {
    let parser = parser();
    let text = "a:\n    b\n    c\n";
    let tree = parser.parse(text).unwrap();
    let mut items = Vec::new();
    collect(tree.root_node(), "item", &mut items);
    let old_c = items
        .iter()
        .find(|item| item.utf8_text(text) == Some("c\n"))
        .map(|item| item.subtree().clone())
        .unwrap();

    // `c` keeps its bytes and parse state, but its line is now deeper than
    // the block, which only the scanner state records.
    let result = edit_and_reparse(&parser, &tree, text, TextRange::new(3.into(), 5.into()), "");
    assert_eq!(result.text, "a:\n  b\n    c\n");
    assert!(!shares_subtree(result.tree.root_subtree(), &old_c));
    assert_eq!(
        scanner_states(&result.tree),
        scanner_states(&parser.parse(&result.text).unwrap())
    );
}

#[test]
fn test_unchanged_blocks_are_reused() {
    let parser = parser();
    let text = "a:\n  b\nc\nd\n";
    let tree = parser.parse(text).unwrap();
    let mut items = Vec::new();
    collect(tree.root_node(), "item", &mut items);
    let block = items[0].subtree().clone();
    assert_eq!(items[0].utf8_text(text), Some("a:\n  b\n"));

    let result = edit_and_reparse(&parser, &tree, text, find(text, "d"), "e");
    assert_matches_fresh_parse(&parser, &result.tree, &result.text);
    assert!(shares_subtree(result.tree.root_subtree(), &block));
}

#[test]
fn test_recovery_keeps_scanning_blocks() {
    let parser = parser();
    let text = "a:\n  b c\nd\n";
    let tree = parser.parse(text).unwrap();
    assert!(tree.has_error());
    assert_covers(&tree, text);
}

#[rstest]
#[case::no_progress(NEWLINE, 0, 3, ":", Some(":"))]
#[case::invalid_here(NEWLINE, 1, 6, "\nb", None)]
#[case::inside_a_character(INDENT, 1, 6, "é", None)]
#[case::past_the_end(INDENT, 5, 6, "\n", None)]
fn test_lexer_discards_unusable_answers(
    #[case] token: usize,
    #[case] len: usize,
    #[case] state: u32,
    #[case] text: &str,
    #[case] expected: Option<&str>,
) {
    let grammar = blocks(Arc::new(Fixed { token, len }));
    let lexer = Lexer::new(&grammar);
    let mode = grammar.table().lex_mode(StateId::new(state));
    let found = lexer
        .next_token_after(text, TextSize::new(0), mode, &ScannerState::new(&[1]))
        .unwrap();
    let expected = match expected {
        Some(name) => grammar.symbol_for_name(name).unwrap(),
        None => Symbol::ERROR_TOKEN,
    };
    assert_eq!(found.symbol, expected);
    assert!(found.scanner_state.is_none());
}

#[test]
fn test_lexer_keeps_what_the_scanner_inspected() {
    let grammar = blocks(Arc::new(Indentation));
    let lexer = Lexer::new(&grammar);
    let mode = grammar.table().lex_mode(StateId::new(6));
    assert_eq!(grammar.valid_externals(mode), &[false, true, false]);
    let token = lexer
        .next_token_after("\n  b", TextSize::new(0), mode, &ScannerState::default())
        .unwrap();
    assert_eq!(grammar.symbol_name(token.symbol), "indent");
    assert_eq!(token.len(), TextSize::new(3));
    assert_eq!(token.lookahead_bytes, 1);
    assert_eq!(token.scanner_state, Some(ScannerState::new(&[2, 2])));
}

#[test]
fn test_error_mode_offers_every_external_token() {
    let grammar = blocks(Arc::new(Indentation));
    assert_eq!(grammar.valid_externals(grammar.error_lex_mode()), &[true; 3]);
    let names: Vec<_> = grammar
        .externals()
        .iter()
        .map(|symbol| grammar.symbol_name(*symbol))
        .collect();
    assert_eq!(names, vec!["newline", "indent", "dedent"]);
}
