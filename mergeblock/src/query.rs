use std::cmp::Ordering;

use crate::block::{Block, Selection};

/// Orders blocks by start position.
pub fn by_position(a: &Block, b: &Block) -> Ordering {
    a.start_position().cmp(&b.start_position())
}

/// Orders blocks by length, shortest first.
pub fn by_length(a: &Block, b: &Block) -> Ordering {
    a.length().cmp(&b.length())
}

/// Returns the innermost block containing `position`, i.e. the shortest one.
/// Among equally short blocks the first in `blocks` wins.
pub fn find_innermost_containing<'a, I>(blocks: I, position: usize) -> Option<&'a Block>
where
    I: IntoIterator<Item = &'a Block>,
{
    blocks
        .into_iter()
        .filter(|block| block.contains(position))
        .min_by(|a, b| by_length(a, b))
}

/// Selection range of the first block named exactly `name`.
pub fn select_by_name<'a, I>(blocks: I, name: &str) -> Option<Selection>
where
    I: IntoIterator<Item = &'a Block>,
{
    blocks
        .into_iter()
        .find(|block| block.name() == name)
        .map(Block::selection)
}
