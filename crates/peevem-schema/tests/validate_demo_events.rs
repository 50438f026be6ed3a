//! Integration test: validate every demo NDJSON file against the repo's
//! PEEVEM schemas.
//!
//! This matches the behavior of `peevem events --schemas schemas demos/*.ndjson`.
//! It loads the `schemas/` directory, builds the standard classifier table,
//! and validates each file under `demos/`.

use peevem_schema::{audit_schemas, BatchValidator, ClassifierRules, SchemaRegistry};
use std::path::PathBuf;

const CORE_SCHEMA_ID: &str = "https://peevem.org/schemas/core";

/// Find the repository root.
fn repo_root() -> PathBuf {
    let mut dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    dir.pop(); // crates/
    dir.pop(); // repo root
    dir
}

/// All `.ndjson` files under a directory, sorted.
fn find_ndjson_files(dir: &std::path::Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .expect("demos directory should exist")
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "ndjson"))
        .collect();
    files.sort();
    files
}

#[test]
fn test_repo_schemas_load_cleanly() {
    let outcome = SchemaRegistry::load(repo_root().join("schemas")).unwrap();
    assert!(
        outcome.skipped.is_empty(),
        "schema files failed to load: {:?}",
        outcome.skipped
    );
    assert_eq!(outcome.registry.len(), 4);
    for id in ["core", "event", "bookmark", "contact"] {
        let uri = format!("https://peevem.org/schemas/{id}");
        assert!(
            outcome.registry.get(&uri).is_some(),
            "missing schema {uri}"
        );
    }
}

#[test]
fn test_repo_schemas_pass_audit() {
    let registry = SchemaRegistry::load(repo_root().join("schemas"))
        .unwrap()
        .registry;
    let report = audit_schemas(&registry);
    assert!(
        report.findings.is_empty(),
        "schema audit findings:\n{}",
        report
            .findings
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    );
}

#[test]
fn test_all_demo_files_validate() {
    let root = repo_root();
    let registry = SchemaRegistry::load(root.join("schemas")).unwrap().registry;
    let rules = ClassifierRules::standard(&registry).unwrap();
    let mut batch = BatchValidator::new(&registry, &rules, CORE_SCHEMA_ID).unwrap();

    let files = find_ndjson_files(&root.join("demos"));
    assert!(!files.is_empty(), "no demo NDJSON files found");

    let mut failed = Vec::new();
    for file in &files {
        let report = batch.validate_file(file).unwrap();
        if !report.is_clean() {
            for outcome in &report.errors {
                failed.push(format!(
                    "{}:{} ({:?})",
                    report.file_path, outcome.line, outcome.detail
                ));
            }
        }
    }

    assert!(
        failed.is_empty(),
        "{} invalid demo event lines:\n{}",
        failed.len(),
        failed.join("\n")
    );
}

#[test]
fn test_mixed_demo_counts() {
    let root = repo_root();
    let registry = SchemaRegistry::load(root.join("schemas")).unwrap().registry;
    let rules = ClassifierRules::standard(&registry).unwrap();
    let mut batch = BatchValidator::new(&registry, &rules, CORE_SCHEMA_ID).unwrap();

    let report = batch.validate_file(root.join("demos/mixed.ndjson")).unwrap();
    // mixed.ndjson: bookmark, generic app_opened, untyped heartbeat,
    // one blank line, contact_created.
    assert_eq!(report.total_events, 4);
    assert_eq!(report.valid_count, 4);
    assert_eq!(report.invalid_count, 0);
    assert_eq!(report.no_schema_count, 1);
}

#[test]
fn test_standard_rules_resolve_against_repo_schemas() {
    let registry = SchemaRegistry::load(repo_root().join("schemas"))
        .unwrap()
        .registry;
    let rules = ClassifierRules::standard(&registry).unwrap();
    rules.resolve_against(&registry).unwrap();
    assert_eq!(rules.generic_schema_id, "https://peevem.org/schemas/event");
}
