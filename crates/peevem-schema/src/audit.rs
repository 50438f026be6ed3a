//! # Schema Audit
//!
//! Checks the schema documents themselves: every loaded schema must be a
//! valid JSON Schema (meta-schema validation), and every cross-schema
//! `$ref` under the PEEVEM URI prefix must resolve to a schema in the
//! registry. External references outside `json-schema.org` are surfaced
//! as warnings since they may fail to resolve at validation time.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::registry::{SchemaRegistry, SCHEMA_URI_PREFIX};

/// How serious an audit finding is for the exit contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The schema set is unusable or inconsistent.
    Error,
    /// Suspicious but not disqualifying.
    Warning,
}

/// One audit finding against a named schema.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    /// Identifier of the schema the finding is about.
    pub schema: String,
    /// Finding severity.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "[{tag}] {}: {}", self.schema, self.message)
    }
}

/// Aggregate result of auditing a registry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaAuditReport {
    /// Number of schemas examined.
    pub schema_count: usize,
    /// All findings, in registry load order.
    pub findings: Vec<Finding>,
}

impl SchemaAuditReport {
    /// True if any error-severity finding exists.
    pub fn has_errors(&self) -> bool {
        self.findings
            .iter()
            .any(|f| f.severity == Severity::Error)
    }
}

/// Audit every schema in the registry: meta-schema validity plus `$ref`
/// resolution.
pub fn audit_schemas(registry: &SchemaRegistry) -> SchemaAuditReport {
    let mut findings = Vec::new();

    for identifier in registry.identifiers() {
        let schema = match registry.get(identifier) {
            Some(schema) => schema,
            None => continue,
        };

        if let Err(e) = jsonschema::meta::validate(schema) {
            findings.push(Finding {
                schema: identifier.to_string(),
                severity: Severity::Error,
                message: format!("not a valid JSON Schema: {e}"),
            });
            continue;
        }

        for reference in collect_refs(schema) {
            findings.extend(check_reference(registry, identifier, &reference));
        }
    }

    SchemaAuditReport {
        schema_count: registry.len(),
        findings,
    }
}

/// Classify one `$ref` target.
fn check_reference(
    registry: &SchemaRegistry,
    identifier: &str,
    reference: &str,
) -> Option<Finding> {
    // Internal pointers are resolved by the validation engine.
    if reference.starts_with('#') {
        return None;
    }

    if let Some(target) = reference.strip_prefix(SCHEMA_URI_PREFIX) {
        // Strip any fragment before lookup.
        let target = target.split('#').next().unwrap_or(target);
        let uri = format!("{SCHEMA_URI_PREFIX}{target}");
        if registry.get(&uri).is_none() && registry.get(target).is_none() {
            return Some(Finding {
                schema: identifier.to_string(),
                severity: Severity::Error,
                message: format!("references schema not in registry: {reference}"),
            });
        }
        return None;
    }

    if !reference.starts_with("https://json-schema.org/") {
        return Some(Finding {
            schema: identifier.to_string(),
            severity: Severity::Warning,
            message: format!("external reference may not resolve: {reference}"),
        });
    }

    None
}

/// Recursively collect every `$ref` string in a schema document.
fn collect_refs(value: &Value) -> Vec<String> {
    let mut refs = Vec::new();
    collect_refs_into(value, &mut refs);
    refs
}

fn collect_refs_into(value: &Value, refs: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get("$ref") {
                refs.push(reference.clone());
            }
            for child in map.values() {
                collect_refs_into(child, refs);
            }
        }
        Value::Array(items) => {
            for child in items {
                collect_refs_into(child, refs);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_schema(dir: &Path, name: &str, value: &Value) {
        fs::write(dir.join(name), serde_json::to_string_pretty(value).unwrap()).unwrap();
    }

    fn load(dir: &Path) -> SchemaRegistry {
        SchemaRegistry::load(dir).unwrap().registry
    }

    #[test]
    fn test_clean_registry_has_no_findings() {
        let tmp = TempDir::new().unwrap();
        write_schema(
            tmp.path(),
            "core.json",
            &json!({
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "$id": "https://peevem.org/schemas/core",
                "type": "object"
            }),
        );
        write_schema(
            tmp.path(),
            "event.json",
            &json!({
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "$id": "https://peevem.org/schemas/event",
                "allOf": [{ "$ref": "https://peevem.org/schemas/core" }]
            }),
        );
        let report = audit_schemas(&load(tmp.path()));
        assert_eq!(report.schema_count, 2);
        assert!(report.findings.is_empty());
        assert!(!report.has_errors());
    }

    #[test]
    fn test_dangling_peevem_ref_is_an_error() {
        let tmp = TempDir::new().unwrap();
        write_schema(
            tmp.path(),
            "event.json",
            &json!({
                "$id": "https://peevem.org/schemas/event",
                "allOf": [{ "$ref": "https://peevem.org/schemas/missing" }]
            }),
        );
        let report = audit_schemas(&load(tmp.path()));
        assert!(report.has_errors());
        assert!(report.findings[0].message.contains("missing"));
    }

    #[test]
    fn test_foreign_external_ref_is_a_warning() {
        let tmp = TempDir::new().unwrap();
        write_schema(
            tmp.path(),
            "event.json",
            &json!({
                "$id": "https://peevem.org/schemas/event",
                "properties": {
                    "extra": { "$ref": "https://example.com/other-schema" }
                }
            }),
        );
        let report = audit_schemas(&load(tmp.path()));
        assert!(!report.has_errors());
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].severity, Severity::Warning);
    }

    #[test]
    fn test_internal_and_metaschema_refs_are_ignored() {
        let tmp = TempDir::new().unwrap();
        write_schema(
            tmp.path(),
            "core.json",
            &json!({
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "$id": "https://peevem.org/schemas/core",
                "$defs": { "name": { "type": "string" } },
                "properties": {
                    "name": { "$ref": "#/$defs/name" }
                }
            }),
        );
        let report = audit_schemas(&load(tmp.path()));
        assert!(report.findings.is_empty());
    }

    #[test]
    fn test_invalid_schema_fails_meta_validation() {
        let tmp = TempDir::new().unwrap();
        write_schema(
            tmp.path(),
            "bad.json",
            &json!({
                "$id": "https://peevem.org/schemas/bad",
                "type": "not-a-real-type"
            }),
        );
        let report = audit_schemas(&load(tmp.path()));
        assert!(report.has_errors());
        assert!(report.findings[0].message.contains("not a valid JSON Schema"));
    }
}
