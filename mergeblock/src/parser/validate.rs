use crate::marker::{Marker, MarkerKind};
use crate::parser::error::BlockError;

/// Check that ordered markers nest properly: every end marker closes the
/// most recently opened block of the same name, and nothing is left open.
/// Stops at the first problem.
pub fn validate_nesting(markers: &[Marker]) -> Result<(), BlockError> {
    let mut open: Vec<&Marker> = Vec::new();

    for marker in markers {
        match marker.kind {
            MarkerKind::Start => open.push(marker),
            MarkerKind::End => match open.pop() {
                None => {
                    return Err(BlockError::UnmatchedEndMarker {
                        name: marker.name.clone(),
                        target: marker.target,
                    });
                }
                Some(start) if !start.pairs_with(&marker.name) => {
                    return Err(BlockError::MismatchedBlockName {
                        expected: start.name.clone(),
                        found: marker.name.clone(),
                        target: marker.target,
                    });
                }
                Some(_) => {}
            },
        }
    }

    if let Some(start) = open.last() {
        return Err(BlockError::UnclosedBlock {
            name: start.name.clone(),
            target: start.target,
        });
    }

    tracing::trace!(markers = markers.len(), "block nesting valid");
    Ok(())
}
