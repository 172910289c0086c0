//! Error recovery on malformed input.

use rstest::rstest;

use arbor::parser::{ERROR_COST_PER_MISSING_TREE, ERROR_COST_PER_RECOVERY};
use arbor::{ParseOptions, Parser, TextSize};

use crate::helpers::fixtures::{ASSIGN, assign_parser, sum_parser};
use crate::helpers::tree_assertions::assert_covers;

#[rstest]
#[case::only_operators("= ; =")]
#[case::missing_value("a = ;")]
#[case::missing_name("= 1;")]
#[case::double_equals("a == 1;")]
#[case::unterminated_string("a = \"abc")]
#[case::stray_quote_mid_program("a = 1;\n\"\nb = 2;")]
#[case::number_as_name("1 = 2;")]
#[case::non_ascii("a = ñ;")]
#[case::emoji("a = 🦀;")]
#[case::comment_only_broken("# hi\n=")]
fn test_malformed_assignments_still_cover_the_text(#[case] text: &str) {
    let tree = assign_parser().parse(text).unwrap();
    assert!(tree.has_error(), "{:?} parsed cleanly: {}", text, tree.to_sexp());
    assert_covers(&tree, text);
}

#[rstest]
#[case("1 +")]
#[case("+ 1")]
#[case("1 + + 2 + 3")]
#[case("12 34")]
#[case("x")]
fn test_malformed_sums_still_cover_the_text(#[case] text: &str) {
    let tree = sum_parser().parse(text).unwrap();
    assert!(tree.has_error());
    assert_covers(&tree, text);
}

#[test]
fn test_recovery_is_deterministic() {
    let parser = assign_parser();
    let text = "a = = 1;\nb = ;\nc 3;";
    let first = parser.parse(text).unwrap();
    let second = parser.parse(text).unwrap();
    assert_eq!(first.to_sexp(), second.to_sexp());
    assert_eq!(first.diagnostics(), second.diagnostics());
}

#[test]
fn test_missing_leaf_is_zero_width() {
    let text = "a = 1\n";
    let tree = assign_parser().parse(text).unwrap();
    let missing: Vec<_> = tree
        .leaves()
        .into_iter()
        .filter(|leaf| leaf.is_missing())
        .collect();

    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].kind(), ";");
    assert!(missing[0].byte_range().is_empty());
    assert_eq!(missing[0].subtree().error_cost(), ERROR_COST_PER_MISSING_TREE);
    assert_covers(&tree, text);
}

#[test]
fn test_valid_statements_survive_a_broken_one() {
    let text = "a = 1;\nb = = 2;\nc = 3;";
    let tree = assign_parser().parse(text).unwrap();

    for name in ["a = 1;", "c = 3;"] {
        let start = TextSize::new(text.find(name).unwrap() as u32);
        let range = arbor::TextRange::at(start, TextSize::of(name));
        let node = tree.root_node().descendant_for_byte_range(range).unwrap();
        assert_eq!(node.kind(), "assignment", "{:?} was not kept", name);
        assert!(!node.has_error());
    }
}

#[test]
fn test_error_cost_of_a_skip() {
    let tree = assign_parser().parse("b = \"oops;").unwrap();
    let token = tree
        .root_node()
        .descendant_for_byte_range(arbor::TextRange::new(4.into(), 5.into()))
        .unwrap();
    assert!(token.is_error());
    assert_eq!(token.kind(), "ERROR_TOKEN");

    let error = token.parent().unwrap();
    assert_eq!(error.kind(), "ERROR");
    assert!(error.subtree().error_cost() >= ERROR_COST_PER_RECOVERY);
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(4)]
fn test_skip_limits_still_cover_the_text(#[case] max_skipped_tokens: usize) {
    let options = ParseOptions::default()
        .with_max_skipped_tokens(max_skipped_tokens)
        .with_max_pop_depth(2);
    let parser = Parser::with_options(ASSIGN.clone(), options);
    let text = "a = 1 2 3 4 5 6;\nb = 2;";
    let tree = parser.parse(text).unwrap();
    assert!(tree.has_error());
    assert_covers(&tree, text);
}

#[test]
fn test_single_version_recovery() {
    let options = ParseOptions::default().with_max_versions(1);
    let parser = Parser::with_options(ASSIGN.clone(), options);
    let text = "a = ; b = 2;";
    let tree = parser.parse(text).unwrap();
    assert!(tree.has_error());
    assert_covers(&tree, text);
}

#[test]
fn test_one_corrupted_token_gives_one_error_node() {
    let text = "a = 1;\nb = \"oops;\nc = 3;";
    let tree = assign_parser().parse(text).unwrap();
    assert_covers(&tree, text);

    let mut errors = Vec::new();
    let mut stack = vec![tree.root_node()];
    while let Some(node) = stack.pop() {
        if node.kind() == "ERROR" {
            errors.push(node);
        }
        stack.extend(node.children());
    }
    assert_eq!(errors.len(), 1, "{}", tree.to_sexp());
    let quote = TextSize::new(text.find('"').unwrap() as u32);
    assert!(errors[0].byte_range().contains(quote));
}
