//! Tree traversal with cursors.

use arbor::{Node, TextRange, TextSize, Tree, TreeCursor};

use crate::helpers::fixtures::{assign_parser, long_program};

fn preorder<'t>(cursor: &mut TreeCursor<'t>) -> Vec<Node<'t>> {
    let mut nodes = Vec::new();
    'walk: loop {
        nodes.push(cursor.node());
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                continue 'walk;
            }
            if !cursor.goto_parent() {
                break 'walk;
            }
        }
    }
    nodes
}

fn recursive<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
    out.push(node);
    for child in node.children() {
        recursive(child, out);
    }
}

fn program() -> (String, Tree) {
    let text = long_program(15);
    let tree = assign_parser().parse(&text).unwrap();
    (text, tree)
}

#[test]
fn test_cursor_and_children_agree() {
    let (_, tree) = program();
    let walked = preorder(&mut tree.walk());
    let mut expected = Vec::new();
    recursive(tree.root_node(), &mut expected);
    assert_eq!(walked, expected);
}

#[test]
fn test_cursor_depth_matches_parent_chain() {
    let (_, tree) = program();
    let mut cursor = tree.walk();
    while cursor.goto_last_child() {
        let mut depth = 0;
        let mut node = cursor.node();
        while let Some(parent) = node.parent() {
            node = parent;
            depth += 1;
        }
        assert_eq!(cursor.depth(), depth);
    }
    assert!(cursor.node().is_leaf());
    assert_eq!(cursor.node().end_byte(), tree.len());
}

#[test]
fn test_descending_by_byte_finds_the_leaf() {
    let (text, tree) = program();
    for offset in (0..text.len()).step_by(7) {
        let offset = TextSize::new(offset as u32);
        let mut cursor = tree.walk();
        while cursor.goto_first_child_for_byte(offset).is_some() {}

        let leaf = cursor.node();
        assert!(leaf.byte_range().contains(offset) || leaf.byte_range().is_empty());
        let expected = tree
            .root_node()
            .descendant_for_byte_range(TextRange::empty(offset))
            .unwrap();
        assert_eq!(leaf.byte_range(), expected.byte_range());
    }
}

#[test]
fn test_cursor_on_a_subtree() {
    let (text, tree) = program();
    let start = TextSize::new(text.find("x3 = 3;").unwrap() as u32);
    let statement = tree
        .root_node()
        .descendant_for_byte_range(TextRange::at(start, TextSize::of("x3 = 3;")))
        .unwrap();
    assert_eq!(statement.kind(), "assignment");

    let nodes = preorder(&mut statement.walk());
    assert_eq!(nodes[0], statement);
    assert!(nodes.iter().all(|node| statement.byte_range().contains_range(node.byte_range())));
    let kinds: Vec<&str> = nodes
        .iter()
        .filter(|node| node.is_named())
        .map(|node| node.kind())
        .collect();
    assert_eq!(kinds, ["assignment", "identifier", "expression", "number"]);
}

#[test]
fn test_reset_moves_the_root() {
    let (_, tree) = program();
    let mut cursor = tree.walk();
    assert!(cursor.goto_first_child());
    assert!(cursor.goto_first_child());
    let inner = cursor.node();

    cursor.reset(inner);
    assert_eq!(cursor.depth(), 0);
    assert!(!cursor.goto_parent());
    assert_eq!(cursor.node(), inner);
}
