use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label};

use crate::block::BlockId;
use crate::snapshot::TargetId;

/// Structural errors in a document's block markers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockError {
    #[error("marker `BlockEnd_{found}` appears where a block start was expected")]
    ExpectedBlockStart { found: String, target: TargetId },

    #[error("block `{expected}` is closed by end marker `BlockEnd_{found}`")]
    EndMarkerMismatch {
        expected: String,
        found: String,
        target: TargetId,
    },

    #[error("block `{open}` ends before its end marker")]
    TruncatedBlockStructure { open: String, target: TargetId },

    #[error("invalid block end marker `BlockEnd_{name}`")]
    UnmatchedEndMarker { name: String, target: TargetId },

    #[error("block nesting invalid after block start marker `BlockStart_{expected}` (found `BlockEnd_{found}`)")]
    MismatchedBlockName {
        expected: String,
        found: String,
        target: TargetId,
    },

    #[error("block start marker `BlockStart_{name}` is never closed")]
    UnclosedBlock { name: String, target: TargetId },

    #[error("block name must not be empty")]
    InvalidBlockName,

    #[error("no document target {0}")]
    UnknownTarget(TargetId),

    #[error("no block with index {} in this tree", .0.index())]
    UnknownBlock(BlockId),
}

impl BlockError {
    /// The target the error points at, if any.
    pub fn target(&self) -> Option<TargetId> {
        match self {
            BlockError::ExpectedBlockStart { target, .. }
            | BlockError::EndMarkerMismatch { target, .. }
            | BlockError::TruncatedBlockStructure { target, .. }
            | BlockError::UnmatchedEndMarker { target, .. }
            | BlockError::MismatchedBlockName { target, .. }
            | BlockError::UnclosedBlock { target, .. } => Some(*target),
            BlockError::UnknownTarget(target) => Some(*target),
            BlockError::InvalidBlockName | BlockError::UnknownBlock(_) => None,
        }
    }

    fn note(&self) -> Option<&'static str> {
        match self {
            BlockError::MismatchedBlockName { .. } | BlockError::EndMarkerMismatch { .. } => {
                Some("each `BlockEnd_<name>` must close the most recently opened `BlockStart_<name>`")
            }
            BlockError::UnclosedBlock { .. } | BlockError::TruncatedBlockStructure { .. } => {
                Some("add a matching `BlockEnd_<name>` marker after the block's content")
            }
            BlockError::UnmatchedEndMarker { .. } | BlockError::ExpectedBlockStart { .. } => {
                Some("no block is open at this marker")
            }
            BlockError::InvalidBlockName
            | BlockError::UnknownTarget(_)
            | BlockError::UnknownBlock(_) => None,
        }
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    /// `span_of` maps a target to its byte range in file `file_id`.
    pub fn to_diagnostic(
        &self,
        file_id: usize,
        span_of: impl Fn(TargetId) -> Option<Range<usize>>,
    ) -> Diagnostic<usize> {
        let labels = self
            .target()
            .and_then(span_of)
            .map(|span| vec![Label::primary(file_id, span)])
            .unwrap_or_default();

        Diagnostic::error()
            .with_message(self.to_string())
            .with_labels(labels)
            .with_notes(self.note().map(str::to_string).into_iter().collect())
    }
}
