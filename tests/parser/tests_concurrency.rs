//! Sharing grammars, parsers and trees across threads.

use std::sync::Arc;
use std::thread;

use rayon::prelude::*;

use arbor::grammar::{GrammarId, GrammarSource};
use arbor::{GrammarRegistry, Node, Parser, Tree, TreeCursor};

use crate::helpers::fixtures::{ASSIGN, assign_parser, fixture_path, long_program};
use crate::helpers::tree_assertions::assert_covers;

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn test_public_types_are_thread_safe() {
    assert_send_sync::<Tree>();
    assert_send_sync::<Parser>();
    assert_send_sync::<Node<'static>>();
    assert_send_sync::<TreeCursor<'static>>();
    assert_send_sync::<GrammarRegistry>();
}

#[test]
fn test_parse_many_keeps_input_order() {
    let parser = assign_parser();
    let texts: Vec<String> = (1..40).map(long_program).collect();
    let trees = parser.parse_many(&texts);

    assert_eq!(trees.len(), texts.len());
    for (text, tree) in texts.iter().zip(trees) {
        let tree = tree.unwrap();
        assert_covers(&tree, text);
        assert!(!tree.has_error());
    }
}

#[test]
fn test_one_tree_read_from_many_threads() {
    let text = long_program(50);
    let tree = assign_parser().parse(&text).unwrap();
    let expected = tree.to_sexp();

    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                assert_eq!(tree.to_sexp(), expected);
                assert_covers(&tree, &text);
            });
        }
    });
}

#[test]
fn test_parser_shared_by_threads() {
    let parser = Arc::new(Parser::new(ASSIGN.clone()));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let parser = Arc::clone(&parser);
            thread::spawn(move || {
                let text = long_program(10 + i);
                let tree = parser.parse(&text).unwrap();
                tree.root_node().named_child_count()
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap() > 0);
    }
}

#[test]
fn test_registry_loads_once_under_contention() {
    let registry = GrammarRegistry::new();
    let id = GrammarId::new("assign", 1);
    let json = std::fs::read_to_string(fixture_path("assign.json")).unwrap();

    let grammars: Vec<_> = (0..16)
        .into_par_iter()
        .map(|_| {
            registry
                .get_or_load(&id, || GrammarSource::from_json(&json))
                .unwrap()
        })
        .collect();

    assert_eq!(registry.len(), 1);
    let first = &grammars[0];
    assert!(grammars.iter().all(|grammar| Arc::ptr_eq(grammar, first)));
}

fn walk(tree: &Tree) -> Vec<(String, arbor::TextRange)> {
    let mut cursor = tree.walk();
    let mut seen = Vec::new();
    'walk: loop {
        let node = cursor.node();
        seen.push((node.kind().to_string(), node.byte_range()));
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
    seen
}

#[test]
fn test_cursors_on_related_trees_in_parallel() {
    let parser = assign_parser();
    let text = long_program(40);
    let original = parser.parse(&text).unwrap();

    let edit = arbor::InputEdit::insert(&text, 0.into(), "first = 0;\n");
    let new_text = format!("first = 0;\n{text}");
    let derived = parser
        .reparse(&original.edit(&edit).unwrap(), &new_text)
        .unwrap();

    let expected = (walk(&original), walk(&derived));
    let (left, right) = thread::scope(|scope| {
        let left = scope.spawn(|| walk(&original));
        let right = scope.spawn(|| walk(&derived));
        (left.join().unwrap(), right.join().unwrap())
    });
    assert_eq!((left, right), expected);
}
