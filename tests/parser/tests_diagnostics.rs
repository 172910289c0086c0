//! Coded diagnostics derived from trees.

use rstest::rstest;

use arbor::parser::{ErrorCode, Severity};
use arbor::{TextRange, TextSize};

use crate::helpers::fixtures::{assign_parser, long_program, sum_parser};

#[test]
fn test_valid_program_has_no_diagnostics() {
    let tree = assign_parser().parse(&long_program(20)).unwrap();
    assert!(tree.diagnostics().is_empty());
}

#[rstest]
#[case::missing_semicolon("a = 1\n", ErrorCode::E0201)]
#[case::unlexable("a = @;", ErrorCode::E0101)]
#[case::unexpected_token("a = = 1;", ErrorCode::E0301)]
fn test_first_diagnostic_code(#[case] text: &str, #[case] code: ErrorCode) {
    let tree = assign_parser().parse(text).unwrap();
    let diagnostics = tree.diagnostics();
    assert!(
        diagnostics.iter().any(|d| d.code == code),
        "{:?} gave {:?}",
        text,
        diagnostics.iter().map(|d| d.code).collect::<Vec<_>>()
    );
    assert!(diagnostics.iter().all(|d| d.severity.is_error()));
}

#[test]
fn test_diagnostics_are_in_document_order() {
    let text = "a = ;\nb = 1\nc = @;";
    let tree = assign_parser().parse(text).unwrap();
    let diagnostics = tree.diagnostics();

    assert!(diagnostics.len() >= 3);
    for pair in diagnostics.windows(2) {
        assert!(pair[0].range.start() <= pair[1].range.start());
    }
    let len = TextSize::of(text);
    assert!(diagnostics.iter().all(|d| d.range.end() <= len));
}

#[test]
fn test_unparsed_tail_at_the_end() {
    let text = "123";
    let tree = assign_parser().parse(text).unwrap();
    let codes: Vec<ErrorCode> = tree.diagnostics().iter().map(|d| d.code).collect();
    assert!(
        codes.contains(&ErrorCode::E0301) || codes.contains(&ErrorCode::E0302),
        "{:?}",
        codes
    );
}

#[test]
fn test_ambiguity_hint_lists_alternatives() {
    let tree = sum_parser().parse("1+2+3").unwrap();
    let diagnostics = tree.diagnostics();

    assert_eq!(diagnostics.len(), 1);
    let hint = &diagnostics[0];
    assert_eq!(hint.severity, Severity::Hint);
    assert!(!hint.severity.is_error());
    assert_eq!(hint.range, TextRange::up_to(5.into()));
    assert!(hint.has_related());
    assert!(!hint.has_hint());
    assert_eq!(hint.related.len(), 2);
    assert!(hint.related.iter().all(|related| related.range == hint.range));
}

#[test]
fn test_formatted_output() {
    let tree = assign_parser().parse("a = @;").unwrap();
    let formatted: Vec<String> = tree.diagnostics().iter().map(|d| d.format()).collect();
    assert!(formatted.iter().any(|line| line.starts_with("error E0101")));
    assert_eq!(ErrorCode::E0101.to_string(), "E0101");
}

#[test]
fn test_missing_token_carries_a_hint() {
    let tree = assign_parser().parse("a = 1\nb = 2;").unwrap();
    let diagnostics = tree.diagnostics();
    let missing = diagnostics
        .iter()
        .find(|d| d.code == ErrorCode::E0201)
        .unwrap();
    assert!(missing.has_hint());
    assert!(missing.has_related());
    assert!(missing.format().contains("hint: insert `;` here"));
}
