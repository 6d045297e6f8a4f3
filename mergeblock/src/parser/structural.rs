use crate::block::tree::BlockTree;
use crate::block::{Block, BlockId};
use crate::field::{FieldCandidate, classify_fields};
use crate::marker::{Marker, MarkerKind};
use crate::parser::error::BlockError;
use crate::query;

// ---------------------------------------------------------------------------
// Tree construction
// ---------------------------------------------------------------------------

/// Build the block tree from position-ordered markers. Run
/// [`validate_nesting`](super::validate::validate_nesting) first; this only
/// reports the first structural problem it trips over.
pub fn build_tree(
    markers: &[Marker],
    candidates: &[FieldCandidate],
) -> Result<BlockTree, BlockError> {
    let mut tree = BlockTree::new();
    let mut cursor = 0;

    while cursor < markers.len() {
        let (root, next) = build_block(markers, cursor, candidates, &mut tree)?;
        tree.push_root(root);
        cursor = next;
    }

    tracing::debug!(
        blocks = tree.len(),
        top_level = tree.root_ids().len(),
        "built block tree"
    );
    Ok(tree)
}

/// A block whose start marker has been seen but not its end marker.
struct OpenBlock<'m> {
    start: &'m Marker,
    children: Vec<BlockId>,
}

impl<'m> OpenBlock<'m> {
    fn new(start: &'m Marker) -> Self {
        OpenBlock {
            start,
            children: Vec::new(),
        }
    }
}

/// Build the block opened by `markers[cursor]`, including its children.
/// Returns the block and the cursor just past its end marker.
///
/// Nested blocks are kept on an explicit stack, so nesting depth is bounded
/// by memory rather than by the call stack.
fn build_block(
    markers: &[Marker],
    cursor: usize,
    candidates: &[FieldCandidate],
    tree: &mut BlockTree,
) -> Result<(BlockId, usize), BlockError> {
    let first = &markers[cursor];
    if first.kind != MarkerKind::Start {
        return Err(BlockError::ExpectedBlockStart {
            found: first.name.clone(),
            target: first.target,
        });
    }

    let mut enclosing: Vec<OpenBlock<'_>> = Vec::new();
    let mut current = OpenBlock::new(first);
    let mut cursor = cursor + 1;

    loop {
        let Some(marker) = markers.get(cursor) else {
            return Err(BlockError::TruncatedBlockStructure {
                open: current.start.name.clone(),
                target: current.start.target,
            });
        };
        cursor += 1;

        if marker.is_start() {
            enclosing.push(std::mem::replace(&mut current, OpenBlock::new(marker)));
            continue;
        }

        let id = close_block(current, marker, candidates, tree)?;
        match enclosing.pop() {
            Some(mut parent) => {
                parent.children.push(id);
                current = parent;
            }
            None => return Ok((id, cursor)),
        }
    }
}

/// Close `open` with `end`, attach its fields and link its children.
fn close_block(
    open: OpenBlock<'_>,
    end: &Marker,
    candidates: &[FieldCandidate],
    tree: &mut BlockTree,
) -> Result<BlockId, BlockError> {
    let start = open.start;
    if !end.pairs_with(&start.name) {
        return Err(BlockError::EndMarkerMismatch {
            expected: start.name.clone(),
            found: end.name.clone(),
            target: end.target,
        });
    }

    let fields = {
        let child_blocks: Vec<&Block> = open.children.iter().map(|id| &tree[*id]).collect();
        classify_fields(start.position, end.position, candidates, &child_blocks)
    };

    let id = tree.insert(Block {
        start: start.clone(),
        end: end.clone(),
        fields,
        children: open.children.clone(),
        parent: None,
    });
    for child in open.children {
        tree.set_parent(child, id);
    }

    tracing::trace!(name = %start.name, start = start.position, end = end.position, "block");
    Ok(id)
}

// ---------------------------------------------------------------------------
// Flat construction
// ---------------------------------------------------------------------------

/// Build every block as a standalone [`Block`] (no parent, children or
/// fields), sorted by start position. Expects validated markers.
pub fn build_flattened(markers: &[Marker]) -> Result<Vec<Block>, BlockError> {
    let mut open: Vec<&Marker> = Vec::new();
    let mut blocks = Vec::new();

    for marker in markers {
        match marker.kind {
            MarkerKind::Start => open.push(marker),
            MarkerKind::End => {
                let Some(start) = open.pop() else {
                    return Err(BlockError::UnmatchedEndMarker {
                        name: marker.name.clone(),
                        target: marker.target,
                    });
                };
                blocks.push(Block::new(start.clone(), marker.clone()));
            }
        }
    }

    blocks.sort_by(query::by_position);
    tracing::debug!(blocks = blocks.len(), "built flattened blocks");
    Ok(blocks)
}
