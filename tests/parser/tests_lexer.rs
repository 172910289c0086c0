//! Lexer behavior through the public API.

use arbor::grammar::{LexModeId, StateId};
use arbor::parser::{LexError, Lexer};
use arbor::{TextRange, TextSize};

use crate::helpers::fixtures::{ASSIGN, SUM};

#[test]
fn test_tokens_tile_the_text() {
    let grammar = &**ASSIGN;
    let lexer = Lexer::new(grammar);
    let text = "# c\nname = \"value\";\nn = 12;";
    let tokens = lexer.tokenize(text, grammar.error_lex_mode()).unwrap();

    let mut offset = TextSize::new(0);
    for token in &tokens {
        assert_eq!(token.start(), offset);
        assert!(!token.is_empty());
        offset = token.end();
    }
    assert_eq!(offset, TextSize::of(text));
    let string = tokens
        .iter()
        .find(|token| grammar.symbol_name(token.symbol) == "string")
        .unwrap();
    assert_eq!(string.text(text), "\"value\"");
}

#[test]
fn test_longest_match_wins() {
    let grammar = &**SUM;
    let lexer = Lexer::new(grammar);
    let token = lexer
        .next_token("12345+6", TextSize::new(0), grammar.error_lex_mode())
        .unwrap();
    assert_eq!(grammar.symbol_name(token.symbol), "number");
    assert_eq!(token.range, TextRange::new(0.into(), 5.into()));
}

#[test]
fn test_relexing_in_the_recorded_mode_is_stable() {
    let grammar = &**ASSIGN;
    let lexer = Lexer::new(grammar);
    let text = "value = 7;";
    let mode = grammar.table().lex_mode(StateId::new(4));
    let first = lexer.next_token(text, TextSize::new(8), mode).unwrap();
    let again = lexer.next_token(text, first.start(), first.lex_mode).unwrap();
    assert_eq!(first, again);
}

#[test]
fn test_offset_past_the_end() {
    let grammar = &**ASSIGN;
    let lexer = Lexer::new(grammar);
    assert!(matches!(
        lexer.next_token("a", TextSize::new(5), grammar.error_lex_mode()),
        Err(LexError::OutOfBounds { .. })
    ));
}

#[test]
fn test_offset_inside_a_character() {
    let grammar = &**ASSIGN;
    let lexer = Lexer::new(grammar);
    assert!(matches!(
        lexer.next_token("é", TextSize::new(1), grammar.error_lex_mode()),
        Err(LexError::NotCharBoundary(_))
    ));
}

#[test]
fn test_unknown_mode() {
    let grammar = &**ASSIGN;
    let lexer = Lexer::new(grammar);
    let mode = LexModeId::new(u16::MAX);
    assert_eq!(
        lexer.next_token("a", TextSize::new(0), mode),
        Err(LexError::UnknownMode(mode))
    );
}
