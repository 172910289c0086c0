//! Ranges whose syntactic structure differs between two trees.

use text_size::{TextRange, TextSize};

use super::{Subtree, Tree};

impl Tree {
    /// Byte ranges of `new` whose structure differs from `old`.
    ///
    /// `old` must be the edited tree that `new` was reparsed from, so that
    /// both use the coordinates of the new text. The result is sorted and
    /// non-overlapping.
    pub fn changed_ranges(old: &Tree, new: &Tree) -> Vec<TextRange> {
        let mut ranges = Vec::new();
        compare(
            old.root_subtree(),
            new.root_subtree(),
            TextSize::new(0),
            &mut ranges,
        );
        ranges.sort_by_key(|range| (range.start(), range.end()));

        let mut merged: Vec<TextRange> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(last) if range.start() <= last.end() => *last = last.cover(range),
                _ => merged.push(range),
            }
        }
        merged
    }
}

fn compare(old: &Subtree, new: &Subtree, start: TextSize, out: &mut Vec<TextRange>) {
    if old.ptr_eq(new) && !old.has_changes() {
        return;
    }
    let same_shape = old.symbol() == new.symbol()
        && old.len() == new.len()
        && old.children().len() == new.children().len()
        && !new.is_ambiguity();
    if !same_shape {
        out.push(TextRange::at(start, old.len().max(new.len())));
        return;
    }
    if new.children().is_empty() {
        // Equal-looking leaves still differ when the edit went through them.
        if old.has_changes() {
            out.push(TextRange::at(start, new.len()));
        }
        return;
    }
    let mut offset = start;
    for (old_child, new_child) in old.children().iter().zip(new.children()) {
        if old_child.len() != new_child.len() {
            // Children shifted: everything from here to the end differs.
            out.push(TextRange::new(offset, start + new.len().max(old.len())));
            return;
        }
        compare(old_child, new_child, offset, out);
        offset += new_child.len();
    }
}
