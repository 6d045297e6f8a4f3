use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use mergeblock::BlockParser;
use mergeblock::query::find_innermost_containing;

use crate::render::{flat_lines, outline_lines};
use crate::snapshot_file::LoadedSnapshot;

const CASE_SUFFIX: &str = ".test.toml";

#[derive(Debug, Deserialize)]
pub struct InnermostQuery {
    pub position: usize,
    /// Expected block name; absent means no block contains the position.
    #[serde(default)]
    pub block: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Expectations {
    /// Expected structural error — the error's Display string must contain this substring.
    #[serde(default)]
    pub error: Option<String>,

    /// Expected outline of the block tree, fields included.
    #[serde(default)]
    pub outline: Option<Vec<String>>,

    /// Expected flattened block list.
    #[serde(default)]
    pub flat: Option<Vec<String>>,

    #[serde(default)]
    pub innermost: Vec<InnermostQuery>,
}

/// The non-snapshot part of a `.test.toml` case. The `targets` and `fields`
/// tables of the same file are read as a snapshot.
#[derive(Debug, Deserialize)]
pub struct CaseHeader {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub expect: Expectations,
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

fn run_single_test(path: &Path) -> TestResult {
    let fail = |description: Option<String>, reason: String| TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Fail(reason),
    };

    // 1. Read file
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return fail(None, format!("cannot read file: {}", e)),
    };

    // 2. Parse the case header and the snapshot
    let header: CaseHeader = match toml::from_str(&content) {
        Ok(h) => h,
        Err(e) => return fail(None, format!("TOML parse error: {}", e)),
    };
    let description = header.description.clone();
    let loaded = match LoadedSnapshot::parse(path, content) {
        Ok(l) => l,
        Err(e) => return fail(description, format!("{:#}", e)),
    };

    // 3. Build blocks
    let parser = BlockParser::new(&loaded.snapshot);
    let parsed = parser
        .parse_tree()
        .and_then(|tree| parser.parse_flattened().map(|flat| (tree, flat)));

    let expect = &header.expect;
    let (tree, flat) = match (&expect.error, parsed) {
        (Some(expected_err), Err(err)) => {
            let err_str = err.to_string();
            return if err_str.contains(expected_err.as_str()) {
                TestResult {
                    path: path.to_path_buf(),
                    description,
                    outcome: TestOutcome::Pass,
                }
            } else {
                fail(
                    description,
                    format!(
                        "expected error containing \"{}\", got: {}",
                        expected_err, err_str
                    ),
                )
            };
        }
        (Some(expected_err), Ok(_)) => {
            return fail(
                description,
                format!(
                    "expected error containing \"{}\", but parsing succeeded",
                    expected_err
                ),
            );
        }
        (None, Err(err)) => return fail(description, format!("unexpected error: {}", err)),
        (None, Ok(pair)) => pair,
    };

    // 4. Compare structure
    if let Some(expected) = &expect.outline {
        if let Some(reason) = compare_lines("outline", expected, &outline_lines(&tree, true)) {
            return fail(description, reason);
        }
    }
    if let Some(expected) = &expect.flat {
        if let Some(reason) = compare_lines("flat", expected, &flat_lines(&flat)) {
            return fail(description, reason);
        }
    }

    // 5. Innermost lookups
    for query in &expect.innermost {
        let actual = find_innermost_containing(&flat, query.position).map(|b| b.name());
        if actual != query.block.as_deref() {
            return fail(
                description,
                format!(
                    "innermost block at {}: expected {}, got {}",
                    query.position,
                    query.block.as_deref().unwrap_or("(none)"),
                    actual.unwrap_or("(none)")
                ),
            );
        }
    }

    TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Pass,
    }
}

/// Compare rendered lines. Returns `Some(reason)` on mismatch.
fn compare_lines(what: &str, expected: &[String], actual: &[String]) -> Option<String> {
    if expected == actual {
        return None;
    }
    let indent = |lines: &[String]| -> String {
        if lines.is_empty() {
            "    (none)".to_string()
        } else {
            lines
                .iter()
                .map(|l| format!("    {}", l))
                .collect::<Vec<_>>()
                .join("\n")
        }
    };
    Some(format!(
        "{} mismatch\n  expected:\n{}\n  actual:\n{}",
        what,
        indent(expected),
        indent(actual)
    ))
}

/// Discover `.test.toml` files grouped by category (subfolder relative to root).
/// Files directly in `root` get category "" (uncategorized).
/// Returns a BTreeMap so categories are sorted alphabetically.
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.ends_with(CASE_SUFFIX) {
                let category = path
                    .parent()
                    .and_then(|p| p.strip_prefix(root).ok())
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_default();
                out.entry(category).or_default().push(path);
            }
        }
    }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no {} files found in {}", CASE_SUFFIX, path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        let label = if cat.is_empty() { "(root)" } else { cat.as_str() };
        eprintln!("  {} ({} tests)", label, files.len());
    }
}

fn pass_label(no_color: bool) -> &'static str {
    if no_color { "PASS" } else { "\x1b[32mPASS\x1b[0m" }
}

fn fail_label(no_color: bool) -> &'static str {
    if no_color { "FAIL" } else { "\x1b[31mFAIL\x1b[0m" }
}

fn bold(s: &str, no_color: bool) -> String {
    if no_color {
        s.to_string()
    } else {
        format!("\x1b[1m{}\x1b[0m", s)
    }
}

fn result_label(result: &TestResult) -> &str {
    result.description.as_deref().unwrap_or_else(|| {
        result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .and_then(|s| s.strip_suffix(CASE_SUFFIX))
            .unwrap_or("?")
    })
}

fn print_failures(failures: &[TestResult]) {
    eprintln!();
    eprintln!("failures:");
    for f in failures {
        eprintln!();
        eprintln!("  --- {} ---", f.path.display());
        if let TestOutcome::Fail(reason) = &f.outcome {
            for line in reason.lines() {
                eprintln!("  {}", line);
            }
        }
    }
}

fn print_summary(passed: usize, failed: usize, no_color: bool) {
    eprintln!();
    if failed == 0 {
        let ok = if no_color { "ok" } else { "\x1b[32mok\x1b[0m" };
        eprintln!("test result: {}. {} passed, 0 failed", ok, passed);
    } else {
        let bad = if no_color { "FAILED" } else { "\x1b[31mFAILED\x1b[0m" };
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            bad,
            passed,
            failed,
            passed + failed
        );
    }
}

/// Run all `.test.toml` files under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let run_categories: BTreeMap<String, Vec<PathBuf>> = if path.is_file() {
        // Single file mode — ignore categories
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        let all_categories = discover_categorized(path);
        if all_categories.is_empty() {
            eprintln!("no {} files found in {}", CASE_SUFFIX, path.display());
            return 1;
        }
        filter_categories(all_categories, categories)
    };

    if run_categories.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (cat, files) in &run_categories {
        let header = if cat.is_empty() { "(root)" } else { cat.as_str() };
        eprintln!();
        eprintln!("{}", bold(header, no_color));

        for file in files {
            let result = run_single_test(file);
            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", pass_label(no_color), result_label(&result));
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", fail_label(no_color), result_label(&result));
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        print_failures(&failures);
    }
    print_summary(passed, failures.len(), no_color);

    if failures.is_empty() { 0 } else { 1 }
}

fn filter_categories(
    all_categories: BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<String, Vec<PathBuf>> {
    if requested.is_empty() {
        return all_categories;
    }

    let mut filtered = BTreeMap::new();
    for requested in requested {
        let req = requested.trim_matches('/');
        let mut found = false;
        for (cat, files) in &all_categories {
            if cat == req || cat.starts_with(&format!("{}/", req)) {
                filtered.insert(cat.clone(), files.clone());
                found = true;
            }
        }
        if !found {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                all_categories
                    .keys()
                    .map(|k| if k.is_empty() { "(root)" } else { k.as_str() })
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    filtered
}
