//! Export to a lossless rowan tree.
//!
//! Grammar symbols are used directly as rowan kinds. Ambiguity nodes export
//! their first alternative, so the exported tree is always a plain tree.

use rowan::{GreenNode, GreenNodeBuilder};
use text_size::{TextRange, TextSize};

use super::{Subtree, Tree};
use crate::grammar::Symbol;

/// Language definition for Rowan
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArborLanguage {}

impl rowan::Language for ArborLanguage {
    type Kind = Symbol;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        Symbol::new(raw.0)
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        rowan::SyntaxKind(kind.raw())
    }
}

pub type SyntaxNode = rowan::SyntaxNode<ArborLanguage>;
pub type SyntaxToken = rowan::SyntaxToken<ArborLanguage>;
pub type SyntaxElement = rowan::SyntaxElement<ArborLanguage>;

impl Tree {
    /// Build a rowan green tree over `text`.
    ///
    /// Returns `None` if `text` is not the text this tree describes.
    pub fn to_green(&self, text: &str) -> Option<GreenNode> {
        if TextSize::of(text) != self.len() {
            return None;
        }
        let mut builder = GreenNodeBuilder::new();
        let mut root = self.root_subtree();
        while root.is_ambiguity() {
            root = root.children().first()?;
        }
        if root.is_leaf() {
            builder.start_node(rowan::SyntaxKind(Symbol::ERROR.raw()));
            push_subtree(&mut builder, root, TextSize::new(0), text)?;
            builder.finish_node();
        } else {
            push_subtree(&mut builder, root, TextSize::new(0), text)?;
        }
        Some(builder.finish())
    }

    /// A rowan syntax tree over `text`; see [`Tree::to_green`].
    pub fn to_syntax_node(&self, text: &str) -> Option<SyntaxNode> {
        self.to_green(text).map(SyntaxNode::new_root)
    }
}

fn push_subtree(
    builder: &mut GreenNodeBuilder<'static>,
    subtree: &Subtree,
    start: TextSize,
    text: &str,
) -> Option<()> {
    let kind = rowan::SyntaxKind(subtree.symbol().raw());
    if subtree.is_ambiguity() {
        return push_subtree(builder, subtree.children().first()?, start, text);
    }
    if subtree.is_leaf() {
        let range = TextRange::at(start, subtree.len());
        builder.token(kind, text.get(std::ops::Range::<usize>::from(range))?);
        return Some(());
    }
    builder.start_node(kind);
    let mut offset = start;
    for child in subtree.children() {
        push_subtree(builder, child, offset, text)?;
        offset += child.len();
    }
    builder.finish_node();
    Some(())
}
