use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use toml::Spanned;
use toml_edit::{Item, Value};

use mergeblock::{FieldCandidate, MERGE_FIELD_TYPE, Snapshot, TargetId};

/// On-disk form of a document snapshot.
///
/// ```toml
/// [[targets]]
/// name = "BlockStart_Invoice"
/// position = 0
///
/// [[fields]]
/// name = "CustomerName"
/// type = "MERGEFIELD"
/// start = 6
/// length = 12
/// ```
#[derive(Debug, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    targets: Vec<TargetEntry>,
    #[serde(default)]
    fields: Vec<FieldEntry>,
}

#[derive(Debug, Deserialize)]
struct TargetEntry {
    name: Spanned<String>,
    position: usize,
}

#[derive(Debug, Deserialize)]
struct FieldEntry {
    name: String,
    #[serde(rename = "type", default = "default_field_type")]
    type_name: String,
    start: usize,
    #[serde(default)]
    length: usize,
}

fn default_field_type() -> String {
    MERGE_FIELD_TYPE.to_string()
}

/// A snapshot read from a TOML file, with the source kept for diagnostics.
pub struct LoadedSnapshot {
    pub path: PathBuf,
    pub source: String,
    pub snapshot: Snapshot,
    /// Byte span of each target's name, indexed by target id.
    spans: Vec<Range<usize>>,
}

impl LoadedSnapshot {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read '{}'", path.display()))?;
        Self::parse(path, source)
    }

    pub fn parse(path: &Path, source: String) -> anyhow::Result<Self> {
        let file: SnapshotFile = toml::from_str(&source)
            .with_context(|| format!("invalid snapshot file '{}'", path.display()))?;

        let mut snapshot = Snapshot::new();
        let mut spans = Vec::with_capacity(file.targets.len());
        for target in file.targets {
            spans.push(target.name.span());
            snapshot.add_target(target.name.into_inner(), target.position);
        }
        for field in file.fields {
            snapshot.add_field(FieldCandidate::new(
                field.name,
                field.type_name,
                field.start,
                field.length,
            ));
        }

        tracing::debug!(
            path = %path.display(),
            targets = spans.len(),
            fields = snapshot.fields().len(),
            "loaded snapshot"
        );

        Ok(LoadedSnapshot {
            path: path.to_path_buf(),
            source,
            snapshot,
            spans,
        })
    }

    pub fn span_of(&self, id: TargetId) -> Option<Range<usize>> {
        self.spans.get(id.0).cloned()
    }

    /// The source text with each `[[targets]]` name replaced by the current
    /// snapshot's name for that target. Only changed names are rewritten;
    /// every other key, comment and table is kept as written.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        let mut doc = self
            .source
            .parse::<toml_edit::DocumentMut>()
            .with_context(|| format!("invalid snapshot file '{}'", self.path.display()))?;

        let targets = self.snapshot.all_targets();
        match doc.get_mut("targets") {
            Some(Item::ArrayOfTables(entries)) => {
                for (entry, target) in entries.iter_mut().zip(targets) {
                    if entry.get("name").and_then(|n| n.as_str()) != Some(target.name.as_str()) {
                        entry.insert("name", toml_edit::value(target.name.as_str()));
                    }
                }
            }
            Some(Item::Value(Value::Array(entries))) => {
                for (entry, target) in entries.iter_mut().zip(targets) {
                    let Some(entry) = entry.as_inline_table_mut() else {
                        continue;
                    };
                    if entry.get("name").and_then(|n| n.as_str()) != Some(target.name.as_str()) {
                        entry.insert("name", Value::from(target.name.as_str()));
                    }
                }
            }
            _ => {}
        }

        Ok(doc.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mergeblock::{BlockParser, TargetStore};

    const CASE: &str = r#"# invoice layout
description = "nested block becomes a child"

[[targets]]
name = "BlockStart_A" # outer
position = 0

[[targets]]
name = "Bookmark1"
position = 2

[[targets]]
name = "BlockEnd_A"
position = 15

[[fields]]
name = "Total"
start = 4
length = 3

[expect]
outline = ["A [0, 15]", "  - Total"]
"#;

    fn load(source: &str) -> LoadedSnapshot {
        LoadedSnapshot::parse(Path::new("case.test.toml"), source.to_string()).unwrap()
    }

    fn rename_first_block(loaded: &mut LoadedSnapshot, new_name: &str) {
        let mut blocks = BlockParser::new(&loaded.snapshot).parse_flattened().unwrap();
        blocks[0].rename(&mut loaded.snapshot, new_name).unwrap();
    }

    #[test]
    fn test_unchanged_snapshot_writes_source_verbatim() {
        let loaded = load(CASE);
        assert_eq!(loaded.to_toml().unwrap(), CASE);
    }

    #[test]
    fn test_rename_keeps_other_keys_and_comments() {
        let mut loaded = load(CASE);
        rename_first_block(&mut loaded, "Z");

        let written = loaded.to_toml().unwrap();
        assert!(written.starts_with("# invoice layout\n"));
        assert!(written.contains(r#"description = "nested block becomes a child""#));
        assert!(written.contains("[expect]"));
        assert!(written.contains(r#"outline = ["A [0, 15]", "  - Total"]"#));
        assert!(written.contains("Bookmark1"));
        assert!(!written.contains("BlockStart_A"));

        let reloaded = load(&written);
        let names: Vec<&str> = reloaded
            .snapshot
            .all_targets()
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["BlockStart_Z", "Bookmark1", "BlockEnd_Z"]);
        assert_eq!(reloaded.snapshot.fields(), loaded.snapshot.fields());
    }

    #[test]
    fn test_rename_inline_target_array() {
        let source = r#"targets = [
    { name = "BlockStart_Row", position = 0 },
    { name = "BlockEnd_Row", position = 8 },
]
"#;
        let mut loaded = load(source);
        rename_first_block(&mut loaded, "Line");

        let reloaded = load(&loaded.to_toml().unwrap());
        assert_eq!(
            reloaded.snapshot.target_name(TargetId(0)),
            Some("BlockStart_Line")
        );
        assert_eq!(
            reloaded.snapshot.target_name(TargetId(1)),
            Some("BlockEnd_Line")
        );
    }

    #[test]
    fn test_spans_point_at_target_names() {
        let loaded = load(CASE);
        let span = loaded.span_of(TargetId(2)).unwrap();
        assert!(CASE[span].contains("BlockEnd_A"));
        assert!(loaded.span_of(TargetId(3)).is_none());
    }
}
