pub mod block;
pub mod field;
pub mod marker;
pub mod parser;
pub mod query;
pub mod snapshot;

pub use block::tree::BlockTree;
pub use block::{Block, BlockId, Selection};
pub use field::{Field, FieldCandidate, MERGE_FIELD_TYPE};
pub use marker::{BLOCK_END_PREFIX, BLOCK_START_PREFIX, Marker, MarkerKind};
pub use parser::{BlockError, BlockParser};
pub use snapshot::{FieldSource, MarkerSource, Snapshot, Target, TargetId, TargetStore};
