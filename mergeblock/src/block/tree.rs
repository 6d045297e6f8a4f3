use std::ops::Index;

use crate::block::{Block, BlockId};
use crate::parser::error::BlockError;
use crate::query;
use crate::snapshot::TargetStore;

/// Blocks of a document, stored in an arena and linked by [`BlockId`].
///
/// Children are owned through the arena; `Block::parent` is a plain index
/// back to the enclosing block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockTree {
    blocks: Vec<Block>,
    roots: Vec<BlockId>,
}

impl BlockTree {
    pub fn new() -> Self {
        BlockTree::default()
    }

    pub(crate) fn insert(&mut self, block: Block) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(block);
        id
    }

    pub(crate) fn push_root(&mut self, id: BlockId) {
        self.roots.push(id);
    }

    pub(crate) fn set_parent(&mut self, child: BlockId, parent: BlockId) {
        self.blocks[child.0].parent = Some(parent);
    }

    /// The block `id`, or `None` if `id` came from a different tree.
    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Ids of the top-level blocks, in document order.
    pub fn root_ids(&self) -> &[BlockId] {
        &self.roots
    }

    pub fn roots(&self) -> impl Iterator<Item = &Block> {
        self.roots.iter().map(|id| &self.blocks[id.0])
    }

    /// Direct children of `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this tree; see [`BlockTree::get`].
    pub fn children(&self, id: BlockId) -> impl Iterator<Item = &Block> {
        self.blocks[id.0]
            .children
            .iter()
            .map(|child| &self.blocks[child.0])
    }

    /// # Panics
    ///
    /// Panics if `id` does not belong to this tree.
    pub fn parent(&self, id: BlockId) -> Option<&Block> {
        self.blocks[id.0].parent.map(|p| &self.blocks[p.0])
    }

    /// Enclosing blocks of `id`, innermost first. Panics if `id` does not
    /// belong to this tree.
    pub fn ancestors(&self, id: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        std::iter::successors(self.blocks[id.0].parent, |p| self.blocks[p.0].parent)
    }

    /// Nesting depth of `id`; top-level blocks have depth 0. Panics if `id`
    /// does not belong to this tree.
    pub fn depth(&self, id: BlockId) -> usize {
        self.ancestors(id).count()
    }

    /// Pre-order walk over all blocks: each block before its children,
    /// siblings in document order.
    pub fn iter_depth_first(&self) -> DepthFirst<'_> {
        DepthFirst {
            tree: self,
            stack: self.roots.iter().rev().copied().collect(),
        }
    }

    /// Copies of all blocks without parent/child links, sorted by start position.
    pub fn flatten(&self) -> Vec<Block> {
        let mut flat: Vec<Block> = self
            .iter_depth_first()
            .map(|(_, block)| Block {
                children: Vec::new(),
                parent: None,
                ..block.clone()
            })
            .collect();
        flat.sort_by(query::by_position);
        flat
    }

    /// The innermost block containing `position`.
    pub fn find_innermost_containing(&self, position: usize) -> Option<BlockId> {
        self.iter_depth_first()
            .filter(|(_, block)| block.contains(position))
            .min_by_key(|(_, block)| block.length())
            .map(|(id, _)| id)
    }

    /// First block, in document order, named exactly `name`.
    pub fn find_by_name(&self, name: &str) -> Option<BlockId> {
        self.iter_depth_first()
            .find(|(_, block)| block.name() == name)
            .map(|(id, _)| id)
    }

    /// Rename block `id` and both of its marker targets in `store`.
    pub fn rename<S: TargetStore + ?Sized>(
        &mut self,
        id: BlockId,
        store: &mut S,
        new_name: &str,
    ) -> Result<(), BlockError> {
        let block = self
            .blocks
            .get_mut(id.0)
            .ok_or(BlockError::UnknownBlock(id))?;
        block.rename(store, new_name)
    }
}

impl Index<BlockId> for BlockTree {
    type Output = Block;

    fn index(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }
}

/// Iterator returned by [`BlockTree::iter_depth_first`].
pub struct DepthFirst<'a> {
    tree: &'a BlockTree,
    stack: Vec<BlockId>,
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = (BlockId, &'a Block);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let block = &self.tree.blocks[id.0];
        self.stack.extend(block.children.iter().rev().copied());
        Some((id, block))
    }
}
