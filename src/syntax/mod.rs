//! Tree store: persistent syntax trees, node handles and cursors.
//!
//! - [`Subtree`] - immutable, `Arc`-shared node with relative sizes
//! - [`Tree`] - a root subtree plus the grammar it was built against
//! - [`Node`] - borrowed handle with absolute byte and row/column positions
//! - [`TreeCursor`] - depth-first traversal state
//! - [`InputEdit`] - a text edit, applied with [`Tree::edit`]

mod changes;
mod cursor;
mod edit;
mod green;
mod node;
mod subtree;
mod tree;

pub use cursor::TreeCursor;
pub use edit::{EditError, InputEdit};
pub use green::{ArborLanguage, SyntaxElement, SyntaxNode, SyntaxToken};
pub use node::{Children, Node, NodeId};
pub use subtree::Subtree;
pub(crate) use subtree::Reduction;
pub use tree::Tree;
