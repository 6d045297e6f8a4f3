use std::fmt;

use crate::field::FieldCandidate;
use crate::parser::error::BlockError;

/// Identity of a named target inside a document snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub usize);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named, positioned target as the document model reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub id: TargetId,
    /// Raw target name, including any `BlockStart_`/`BlockEnd_` prefix.
    pub name: String,
    /// Text position of the target in the document.
    pub position: usize,
}

/// Supplies every named target of a document snapshot, in any order.
pub trait MarkerSource {
    fn targets(&self) -> Vec<Target>;
}

/// Supplies every positioned, typed field of a document snapshot.
pub trait FieldSource {
    fn field_candidates(&self) -> Vec<FieldCandidate>;
}

/// Write access to target names, used when a block is renamed.
///
/// Callers hold `&mut` for the whole rename, so no other parse of the same
/// snapshot can observe a half-renamed block.
pub trait TargetStore {
    fn target_name(&self, id: TargetId) -> Option<&str>;
    fn set_target_name(&mut self, id: TargetId, name: String) -> Result<(), BlockError>;
}

/// An in-memory document snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    targets: Vec<Target>,
    fields: Vec<FieldCandidate>,
}

impl Snapshot {
    pub fn new() -> Self {
        Snapshot::default()
    }

    /// Add a named target and return its id. Ids are assigned in insertion order.
    pub fn add_target(&mut self, name: impl Into<String>, position: usize) -> TargetId {
        let id = TargetId(self.targets.len());
        self.targets.push(Target {
            id,
            name: name.into(),
            position,
        });
        id
    }

    pub fn add_field(&mut self, candidate: FieldCandidate) {
        self.fields.push(candidate);
    }

    pub fn with_target(mut self, name: impl Into<String>, position: usize) -> Self {
        self.add_target(name, position);
        self
    }

    pub fn with_field(mut self, candidate: FieldCandidate) -> Self {
        self.add_field(candidate);
        self
    }

    pub fn target(&self, id: TargetId) -> Option<&Target> {
        self.targets.get(id.0)
    }

    pub fn all_targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn fields(&self) -> &[FieldCandidate] {
        &self.fields
    }
}

impl MarkerSource for Snapshot {
    fn targets(&self) -> Vec<Target> {
        self.targets.clone()
    }
}

impl FieldSource for Snapshot {
    fn field_candidates(&self) -> Vec<FieldCandidate> {
        self.fields.clone()
    }
}

impl TargetStore for Snapshot {
    fn target_name(&self, id: TargetId) -> Option<&str> {
        self.targets.get(id.0).map(|t| t.name.as_str())
    }

    fn set_target_name(&mut self, id: TargetId, name: String) -> Result<(), BlockError> {
        let target = self
            .targets
            .get_mut(id.0)
            .ok_or(BlockError::UnknownTarget(id))?;
        target.name = name;
        Ok(())
    }
}
