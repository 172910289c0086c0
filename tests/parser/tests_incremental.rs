//! Incremental reparsing through the public API.

use rstest::rstest;

use arbor::syntax::Subtree;
use arbor::{InputEdit, Node, TextRange, TextSize, Tree};

use crate::helpers::edit_helpers::{edit_and_reparse, find};
use crate::helpers::fixtures::{assign_parser, long_program, sum_parser};
use crate::helpers::tree_assertions::{assert_covers, assert_matches_fresh_parse, shares_subtree};

fn collect<'t>(node: Node<'t>, kind: &str, out: &mut Vec<Node<'t>>) {
    if node.kind() == kind {
        out.push(node);
    }
    for child in node.children() {
        collect(child, kind, out);
    }
}

fn assignments(tree: &Tree) -> Vec<Subtree> {
    let mut nodes = Vec::new();
    collect(tree.root_node(), "assignment", &mut nodes);
    nodes.into_iter().map(|node| node.subtree().clone()).collect()
}

#[test]
fn test_edit_in_the_middle_of_a_long_program() {
    let parser = assign_parser();
    let text = long_program(30);
    let tree = parser.parse(&text).unwrap();
    assert!(!tree.has_error());

    let statement = find(&text, "x15 = 15;");
    let value = TextRange::at(statement.start() + TextSize::new(6), TextSize::new(2));
    let result = edit_and_reparse(&parser, &tree, &text, value, "999");
    assert_matches_fresh_parse(&parser, &result.tree, &result.text);

    let old = assignments(&tree);
    let reused = old
        .iter()
        .filter(|assignment| shares_subtree(result.tree.root_subtree(), assignment))
        .count();
    assert_eq!(old.len(), 30);
    assert!(
        reused >= old.len() - 2,
        "only {} of {} statements were reused",
        reused,
        old.len()
    );
}

#[test]
fn test_appending_statements() {
    let parser = assign_parser();
    let mut text = String::from("a = 1;");
    let mut tree = parser.parse(&text).unwrap();

    for statement in ["\nb = 2;", "\nc = a;", " # done"] {
        let end = TextRange::empty(TextSize::of(text.as_str()));
        let result = edit_and_reparse(&parser, &tree, &text, end, statement);
        assert_matches_fresh_parse(&parser, &result.tree, &result.text);
        text = result.text;
        tree = result.tree;
    }
    assert!(!tree.has_error());
    assert_eq!(assignments(&tree).len(), 3);
}

#[test]
fn test_deleting_a_statement() {
    let parser = assign_parser();
    let text = "a = 1;\nb = 2;\nc = 3;\n";
    let tree = parser.parse(text).unwrap();

    let result = edit_and_reparse(&parser, &tree, text, find(text, "b = 2;\n"), "");
    assert_eq!(result.text, "a = 1;\nc = 3;\n");
    assert_matches_fresh_parse(&parser, &result.tree, &result.text);
    assert_eq!(assignments(&result.tree).len(), 2);
}

#[test]
fn test_edit_inside_a_comment() {
    let parser = assign_parser();
    let text = "a = 1; # first\nb = 2;";
    let tree = parser.parse(text).unwrap();

    let result = edit_and_reparse(&parser, &tree, text, find(text, "first"), "second");
    assert_matches_fresh_parse(&parser, &result.tree, &result.text);

    let comment = result
        .tree
        .root_node()
        .descendant_for_byte_range(find(&result.text, "# second"))
        .unwrap();
    assert_eq!(comment.kind(), "comment");
    assert!(comment.is_extra());
}

#[test]
fn test_edit_at_the_start() {
    let parser = assign_parser();
    let text = "a = 1;\nb = 2;";
    let tree = parser.parse(text).unwrap();

    let result = edit_and_reparse(&parser, &tree, text, TextRange::empty(0.into()), "z = 0;\n");
    assert_matches_fresh_parse(&parser, &result.tree, &result.text);
    assert_eq!(assignments(&result.tree).len(), 3);
}

#[test]
fn test_breaking_and_closing_a_string() {
    let parser = assign_parser();
    let text = "a = \"x\";\nb = 2;";
    let tree = parser.parse(text).unwrap();

    let broken = edit_and_reparse(&parser, &tree, text, find(text, "\";"), ";");
    assert!(broken.tree.has_error());
    assert_covers(&broken.tree, &broken.text);

    let closing = find(&broken.text, "x;");
    let fixed = edit_and_reparse(
        &parser,
        &broken.tree,
        &broken.text,
        TextRange::empty(closing.start() + TextSize::new(1)),
        "\"",
    );
    assert_eq!(fixed.text, text);
    assert!(!fixed.tree.has_error());
    assert_matches_fresh_parse(&parser, &fixed.tree, &fixed.text);
}

#[test]
fn test_changed_ranges_follow_the_edit() {
    let parser = assign_parser();
    let text = long_program(12);
    let tree = parser.parse(&text).unwrap();

    let previous = find(&text, "z5 = x3;");
    let result = edit_and_reparse(&parser, &tree, &text, find(&text, "x6"), "renamed");
    let ranges = Tree::changed_ranges(&result.edited, &result.tree);

    assert!(!ranges.is_empty());
    let renamed = find(&result.text, "renamed");
    assert!(ranges.iter().any(|range| range.contains_range(renamed)));
    // Only the edited statement and the tokens right before it can differ.
    assert!(ranges.iter().all(|range| range.start() >= previous.start()));
}

#[test]
fn test_ambiguous_tree_reparses() {
    let parser = sum_parser();
    let text = "1+2+3";
    let tree = parser.parse(text).unwrap();
    assert!(tree.root_node().is_ambiguous());

    let result = edit_and_reparse(&parser, &tree, text, find(text, "3"), "30");
    assert_matches_fresh_parse(&parser, &result.tree, &result.text);
    assert!(result.tree.root_node().is_ambiguous());
}

#[test]
fn test_insert_at_the_start_shifts_every_leaf() {
    let parser = assign_parser();
    let text = "a = 1;\nb = 2;";
    let tree = parser.parse(text).unwrap();

    let inserted = "   ";
    let edit = InputEdit::insert(text, 0.into(), inserted);
    let edited = tree.edit(&edit).unwrap();
    assert_eq!(edited.to_sexp(), tree.to_sexp());

    let shift = TextSize::of(inserted);
    let before = tree.leaves();
    let after = edited.leaves();
    assert_eq!(before.len(), after.len());
    // The first leaf absorbs the insertion; every later one moves by it.
    assert_eq!(after[0].start_byte(), before[0].start_byte());
    for (old, new) in before.iter().zip(&after).skip(1) {
        assert_eq!(new.byte_range(), old.byte_range() + shift);
        assert_eq!(new.kind(), old.kind());
    }

    let new_text = format!("{inserted}{text}");
    let reparsed = parser.reparse(&edited, &new_text).unwrap();
    assert_matches_fresh_parse(&parser, &reparsed, &new_text);
}

#[rstest]
#[case("")]
#[case("a = 1;")]
#[case("a = 1;\n")]
#[case("a = 1; # note")]
fn test_append_at_the_end(#[case] text: &str) {
    let parser = assign_parser();
    let tree = parser.parse(text).unwrap();

    let end = TextRange::empty(TextSize::of(text));
    let result = edit_and_reparse(&parser, &tree, text, end, "b = 2;");
    assert_eq!(result.edited.len(), TextSize::of(result.text.as_str()));
    assert_matches_fresh_parse(&parser, &result.tree, &result.text);
    assert!(!result.tree.has_error());
}

#[test]
fn test_typing_a_statement_at_the_end() {
    let parser = assign_parser();
    let mut text = String::from("a = 1;\n");
    let mut tree = parser.parse(&text).unwrap();

    for typed in "b = 22;".chars() {
        let end = TextRange::empty(TextSize::of(text.as_str()));
        let result = edit_and_reparse(&parser, &tree, &text, end, &typed.to_string());
        assert_matches_fresh_parse(&parser, &result.tree, &result.text);
        text = result.text;
        tree = result.tree;
    }
    assert!(!tree.has_error());
    assert_eq!(assignments(&tree).len(), 2);
}
