use crate::snapshot::{MarkerSource, Target, TargetId};

pub const BLOCK_START_PREFIX: &str = "BlockStart_";
pub const BLOCK_END_PREFIX: &str = "BlockEnd_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Start,
    End,
}

/// A block start or end marker read from a document target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    /// The target this marker was read from.
    pub target: TargetId,
    pub position: usize,
    /// Block name, with the start/end prefix stripped.
    pub name: String,
    pub kind: MarkerKind,
}

impl Marker {
    /// Classify a target by its name prefix (ASCII case-insensitive).
    /// Returns `None` for targets outside the block naming convention.
    pub fn from_target(target: &Target) -> Option<Self> {
        let name = target.name.as_str();
        let (kind, rest) = if let Some(rest) = strip_prefix_ignore_case(name, BLOCK_START_PREFIX) {
            (MarkerKind::Start, rest)
        } else if let Some(rest) = strip_prefix_ignore_case(name, BLOCK_END_PREFIX) {
            (MarkerKind::End, rest)
        } else {
            return None;
        };

        Some(Marker {
            target: target.id,
            position: target.position,
            name: rest.to_string(),
            kind,
        })
    }

    pub fn is_start(&self) -> bool {
        self.kind == MarkerKind::Start
    }

    pub fn is_end(&self) -> bool {
        self.kind == MarkerKind::End
    }

    /// The canonical target name for this marker, prefix included.
    pub fn target_name(&self) -> String {
        match self.kind {
            MarkerKind::Start => format!("{BLOCK_START_PREFIX}{}", self.name),
            MarkerKind::End => format!("{BLOCK_END_PREFIX}{}", self.name),
        }
    }

    /// Whether this marker pairs with a marker named `other` (case-insensitive).
    pub fn pairs_with(&self, other: &str) -> bool {
        names_match(&self.name, other)
    }
}

pub(crate) fn names_match(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

fn strip_prefix_ignore_case<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    let head = name.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&name[prefix.len()..])
    } else {
        None
    }
}

/// Collect the block markers of a snapshot, ordered by position.
/// Markers at the same position keep the order the source reported them in.
pub fn collect_markers<S: MarkerSource + ?Sized>(source: &S) -> Vec<Marker> {
    let targets = source.targets();
    let mut markers: Vec<Marker> = targets.iter().filter_map(Marker::from_target).collect();
    markers.sort_by_key(|m| m.position);

    tracing::debug!(
        targets = targets.len(),
        markers = markers.len(),
        "collected block markers"
    );
    markers
}
