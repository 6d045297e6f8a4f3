use crate::block::Block;

/// Type tag of the only field kind attached to blocks.
pub const MERGE_FIELD_TYPE: &str = "MERGEFIELD";

/// A positioned, typed field as the document model reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCandidate {
    pub name: String,
    pub type_name: String,
    pub start: usize,
    pub length: usize,
}

impl FieldCandidate {
    pub fn new(
        name: impl Into<String>,
        type_name: impl Into<String>,
        start: usize,
        length: usize,
    ) -> Self {
        FieldCandidate {
            name: name.into(),
            type_name: type_name.into(),
            start,
            length,
        }
    }

    pub fn merge_field(name: impl Into<String>, start: usize, length: usize) -> Self {
        FieldCandidate::new(name, MERGE_FIELD_TYPE, start, length)
    }

    /// End offset, saturating at `usize::MAX`.
    pub fn end(&self) -> usize {
        self.start.saturating_add(self.length)
    }

    pub fn is_merge_field(&self) -> bool {
        self.type_name == MERGE_FIELD_TYPE
    }

    /// True if this candidate lies within `[start, end]`.
    pub fn lies_within(&self, start: usize, end: usize) -> bool {
        self.start >= start && self.end() <= end
    }
}

/// A merge field directly inside a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub start: usize,
    pub length: usize,
}

impl Field {
    /// Adapt a candidate, or `None` if it is not a merge field.
    pub fn from_candidate(candidate: &FieldCandidate) -> Option<Self> {
        candidate.is_merge_field().then(|| Field {
            name: candidate.name.clone(),
            start: candidate.start,
            length: candidate.length,
        })
    }

    pub fn end(&self) -> usize {
        self.start.saturating_add(self.length)
    }
}

/// Check if a candidate lies inside any of `blocks`.
pub fn is_inside<'a, I>(candidate: &FieldCandidate, blocks: I) -> bool
where
    I: IntoIterator<Item = &'a Block>,
{
    blocks
        .into_iter()
        .any(|block| candidate.lies_within(block.start_position(), block.end_position()))
}

/// Fields inside `[start, end]` that are not inside one of `children`,
/// in candidate order. Non-merge-field candidates are skipped.
pub fn classify_fields(
    start: usize,
    end: usize,
    candidates: &[FieldCandidate],
    children: &[&Block],
) -> Vec<Field> {
    candidates
        .iter()
        .filter(|c| c.lies_within(start, end))
        .filter_map(|c| Field::from_candidate(c).map(|field| (c, field)))
        .filter(|(c, _)| !is_inside(c, children.iter().copied()))
        .map(|(_, field)| field)
        .collect()
}
