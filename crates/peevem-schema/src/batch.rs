//! # Batch NDJSON Validation
//!
//! Streams a newline-delimited JSON file one line at a time, validating
//! each event record against the core schema and then its classified
//! schema, and accumulates a structured [`BatchReport`].
//!
//! ## Failure Semantics
//!
//! Per-line failures (malformed JSON, schema violations) are local: they
//! are recorded in the report and never abort the batch. Only I/O-level
//! failures (file not found, read error mid-stream) surface as
//! [`BatchError`] and abort the operation.
//!
//! Memory use is O(1) in file size aside from the accumulated error list:
//! lines are consumed lazily and event values are dropped once validated,
//! except for invalid events, which are retained in their outcome for
//! reporting.

use std::collections::HashMap;
use std::fmt;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use jsonschema::Validator;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::classify::ClassifierRules;
use crate::registry::{SchemaLoadError, SchemaRegistry};

/// Fatal error during batch validation. Everything else is recorded
/// per-line in the [`BatchReport`].
#[derive(Error, Debug)]
pub enum BatchError {
    /// The events file could not be opened or read.
    #[error("cannot read events file '{path}': {source}")]
    Io {
        /// Path to the events file.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The core schema could not be resolved or compiled.
    #[error(transparent)]
    Schema(#[from] SchemaLoadError),
}

/// A single constraint violation reported by the validation engine.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// JSON Pointer path to the violating field in the event.
    pub instance_path: String,
    /// JSON Pointer path within the schema that triggered the error.
    pub schema_path: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.instance_path, self.message)
        }
    }
}

/// Why a line was recorded as invalid.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OutcomeDetail {
    /// The line was not valid JSON, or the target schema was unusable.
    Message {
        /// Human-readable description.
        message: String,
    },
    /// The event failed validation against the named schema.
    Violations {
        /// Structured constraint violations.
        errors: Vec<Violation>,
    },
}

/// One invalid line in the batch: line number (1-based), the schema that
/// rejected it (absent for parse failures), the parsed event when one
/// exists, and the failure detail.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidOutcome {
    /// 1-based line number in the input file.
    pub line: usize,
    /// Identifier of the schema that produced the failure, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,
    /// The parsed event, when the line was at least valid JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<Value>,
    /// Failure detail: a message or a violation list.
    #[serde(flatten)]
    pub detail: OutcomeDetail,
}

/// Aggregate result of validating one NDJSON file.
///
/// Valid events are summarized by count only; invalid events are retained
/// in order in `errors`. Blank lines count toward nothing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// Path (or label) of the validated input.
    pub file_path: String,
    /// Number of non-blank lines processed.
    pub total_events: usize,
    /// Events that passed all applicable schema checks.
    pub valid_count: usize,
    /// Events that failed parsing or validation.
    pub invalid_count: usize,
    /// Valid events for which no specific schema applied (core only).
    pub no_schema_count: usize,
    /// Invalid outcomes, in input order.
    pub errors: Vec<InvalidOutcome>,
}

impl BatchReport {
    fn new(file_path: String) -> Self {
        BatchReport {
            file_path,
            total_events: 0,
            valid_count: 0,
            invalid_count: 0,
            no_schema_count: 0,
            errors: Vec::new(),
        }
    }

    /// True when every processed event was valid.
    pub fn is_clean(&self) -> bool {
        self.invalid_count == 0
    }
}

/// Validates NDJSON event streams against a registry snapshot.
///
/// The core validator is compiled eagerly — a registry in which the core
/// schema does not resolve is unusable for batch validation. Validators
/// for classified schemas are compiled on first use and cached for the
/// lifetime of this value.
pub struct BatchValidator<'a> {
    registry: &'a SchemaRegistry,
    rules: &'a ClassifierRules,
    core_schema_id: String,
    core: Validator,
    compiled: HashMap<String, Validator>,
}

impl<'a> BatchValidator<'a> {
    /// Create a batch validator over `registry` using the given rule table
    /// and core schema identifier.
    ///
    /// # Errors
    ///
    /// Fails if the core schema is not present in the registry or cannot
    /// be compiled.
    pub fn new(
        registry: &'a SchemaRegistry,
        rules: &'a ClassifierRules,
        core_schema_id: &str,
    ) -> Result<Self, SchemaLoadError> {
        let core = registry.build_validator(core_schema_id)?;
        Ok(BatchValidator {
            registry,
            rules,
            core_schema_id: core_schema_id.to_string(),
            core,
            compiled: HashMap::new(),
        })
    }

    /// Identifier of the baseline schema every event is checked against.
    pub fn core_schema_id(&self) -> &str {
        &self.core_schema_id
    }

    /// Validate an NDJSON file, returning the accumulated report.
    ///
    /// # Errors
    ///
    /// Only I/O failures abort; per-line problems land in the report.
    pub fn validate_file(&mut self, path: impl AsRef<Path>) -> Result<BatchReport, BatchError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| BatchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.validate_reader(BufReader::new(file), &path.display().to_string())
            .map_err(|source| BatchError::Io {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Validate NDJSON from any buffered reader. `label` stands in for the
    /// file path in the report.
    pub fn validate_reader(
        &mut self,
        reader: impl BufRead,
        label: &str,
    ) -> Result<BatchReport, std::io::Error> {
        let mut report = BatchReport::new(label.to_string());

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            self.check_line(index + 1, &line, &mut report);
        }

        Ok(report)
    }

    /// Validate one non-blank line and record its outcome.
    fn check_line(&mut self, line_number: usize, line: &str, report: &mut BatchReport) {
        report.total_events += 1;

        let event: Value = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                report.invalid_count += 1;
                report.errors.push(InvalidOutcome {
                    line: line_number,
                    schema_id: None,
                    event: None,
                    detail: OutcomeDetail::Message {
                        message: format!("Invalid JSON: {e}"),
                    },
                });
                return;
            }
        };

        // Baseline check: every event must satisfy the core envelope
        // before any type-specific schema runs.
        let core_violations = collect_violations(&self.core, &event);
        if !core_violations.is_empty() {
            report.invalid_count += 1;
            report.errors.push(InvalidOutcome {
                line: line_number,
                schema_id: Some(self.core_schema_id.clone()),
                event: Some(event),
                detail: OutcomeDetail::Violations {
                    errors: core_violations,
                },
            });
            return;
        }

        let Some(schema_id) = self.rules.classify(&event).map(str::to_string) else {
            // Core passed and no specific schema applies. Valid, but
            // surfaced for visibility.
            report.valid_count += 1;
            report.no_schema_count += 1;
            return;
        };

        let validator = match self.compiled.entry(schema_id.clone()) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                match self.registry.build_validator(&schema_id) {
                    Ok(validator) => entry.insert(validator),
                    Err(e) => {
                        report.invalid_count += 1;
                        report.errors.push(InvalidOutcome {
                            line: line_number,
                            schema_id: Some(schema_id),
                            event: Some(event),
                            detail: OutcomeDetail::Message {
                                message: format!("Schema unusable: {e}"),
                            },
                        });
                        return;
                    }
                }
            }
        };

        let violations = collect_violations(validator, &event);
        if violations.is_empty() {
            report.valid_count += 1;
        } else {
            report.invalid_count += 1;
            report.errors.push(InvalidOutcome {
                line: line_number,
                schema_id: Some(schema_id),
                event: Some(event),
                detail: OutcomeDetail::Violations { errors: violations },
            });
        }
    }
}

/// Run a compiled validator and collect every violation.
fn collect_violations(validator: &Validator, event: &Value) -> Vec<Violation> {
    validator
        .iter_errors(event)
        .map(|e| Violation {
            instance_path: e.instance_path.to_string(),
            schema_path: e.schema_path.to_string(),
            message: e.to_string(),
        })
        .collect()
}
