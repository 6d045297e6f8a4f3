pub mod error;
mod structural;
mod validate;

pub use error::BlockError;
pub use structural::{build_flattened, build_tree};
pub use validate::validate_nesting;

use crate::block::Block;
use crate::block::tree::BlockTree;
use crate::marker::{Marker, collect_markers};
use crate::snapshot::{FieldSource, MarkerSource};

/// Parser entry point over a document snapshot.
pub struct BlockParser<'a, S: ?Sized> {
    snapshot: &'a S,
}

impl<'a, S: MarkerSource + ?Sized> BlockParser<'a, S> {
    pub fn new(snapshot: &'a S) -> Self {
        BlockParser { snapshot }
    }

    /// Block markers of the snapshot, ordered by position.
    pub fn markers(&self) -> Vec<Marker> {
        collect_markers(self.snapshot)
    }

    /// Validate marker nesting and return the ordered markers on success.
    pub fn validate(&self) -> Result<Vec<Marker>, BlockError> {
        let markers = self.markers();
        validate_nesting(&markers)?;
        Ok(markers)
    }

    /// Validate, then list every block flat and sorted by start position.
    pub fn parse_flattened(&self) -> Result<Vec<Block>, BlockError> {
        let markers = self.validate()?;
        build_flattened(&markers)
    }
}

impl<'a, S: MarkerSource + FieldSource + ?Sized> BlockParser<'a, S> {
    /// Validate, then build the block tree with each block's direct fields.
    pub fn parse_tree(&self) -> Result<BlockTree, BlockError> {
        let markers = self.validate()?;
        let candidates = self.snapshot.field_candidates();
        build_tree(&markers, &candidates)
    }
}
