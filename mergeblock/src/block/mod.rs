pub mod tree;

use crate::field::Field;
use crate::marker::{BLOCK_END_PREFIX, BLOCK_START_PREFIX, Marker};
use crate::parser::error::BlockError;
use crate::snapshot::TargetStore;

/// Index of a block inside a [`tree::BlockTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub(crate) usize);

impl BlockId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A document range to highlight for a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub start: usize,
    pub length: usize,
}

/// A named region delimited by a `BlockStart_<name>` / `BlockEnd_<name>` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub start: Marker,
    pub end: Marker,
    /// Merge fields inside this block but not inside a child block.
    pub fields: Vec<Field>,
    /// Nested blocks, in document order.
    pub children: Vec<BlockId>,
    /// The enclosing block. `None` for top-level and flattened blocks.
    pub parent: Option<BlockId>,
}

impl Block {
    /// A block with no fields, children or parent.
    pub fn new(start: Marker, end: Marker) -> Self {
        Block {
            start,
            end,
            fields: Vec::new(),
            children: Vec::new(),
            parent: None,
        }
    }

    /// The block name, taken from the start marker.
    pub fn name(&self) -> &str {
        &self.start.name
    }

    pub fn start_position(&self) -> usize {
        self.start.position
    }

    pub fn end_position(&self) -> usize {
        self.end.position
    }

    /// Distance between the start and end markers.
    pub fn length(&self) -> usize {
        self.end.position.saturating_sub(self.start.position)
    }

    /// Checks if a text position lies between the start and end markers (inclusive).
    pub fn contains(&self, position: usize) -> bool {
        position >= self.start.position && position <= self.end.position
    }

    pub fn selection(&self) -> Selection {
        Selection {
            start: self.start_position(),
            length: self.length(),
        }
    }

    /// Rename the block, rewriting both marker targets in `store`.
    ///
    /// Both targets are checked before either is written.
    pub fn rename<S: TargetStore + ?Sized>(
        &mut self,
        store: &mut S,
        new_name: &str,
    ) -> Result<(), BlockError> {
        if new_name.is_empty() {
            return Err(BlockError::InvalidBlockName);
        }
        for target in [self.start.target, self.end.target] {
            if store.target_name(target).is_none() {
                return Err(BlockError::UnknownTarget(target));
            }
        }

        store.set_target_name(self.start.target, format!("{BLOCK_START_PREFIX}{new_name}"))?;
        store.set_target_name(self.end.target, format!("{BLOCK_END_PREFIX}{new_name}"))?;
        self.start.name = new_name.to_string();
        self.end.name = new_name.to_string();

        tracing::debug!(name = new_name, "renamed block");
        Ok(())
    }
}
