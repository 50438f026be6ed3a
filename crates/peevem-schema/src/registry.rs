//! # Schema Registry
//!
//! Loads a directory of JSON Schema (Draft 2020-12) documents and indexes
//! each by its declared `$id`, falling back to the filename when a schema
//! declares none.
//!
//! ## Loading Policy
//!
//! Loading is best-effort: a malformed schema file is skipped and recorded
//! in the [`LoadOutcome`], never aborting the load of unrelated schemas.
//! Only an unreadable directory is fatal.
//!
//! ## Determinism
//!
//! Directory entries are sorted by filename before indexing, so identifier
//! iteration order — and therefore [`SchemaRegistry::find_by_event_type`] —
//! is identical across platforms and filesystems. Loading the same
//! directory twice yields the same registry.
//!
//! ## Schema Resolution
//!
//! PEEVEM schemas use `$id` URIs of the form:
//!   `https://peevem.org/schemas/<name>`
//!
//! Cross-schema `$ref` URIs use the same pattern. A local retriever maps
//! these URIs back to loaded schemas so the jsonschema crate never makes
//! network requests. Internal `#/...` refs are resolved by the crate
//! natively.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use jsonschema::{Retrieve, Uri, ValidationOptions, Validator};
use serde_json::Value;
use thiserror::Error;

/// URI prefix shared by all PEEVEM schema identifiers.
pub const SCHEMA_URI_PREFIX: &str = "https://peevem.org/schemas/";

/// Error while loading a schema file or resolving a schema identifier.
#[derive(Error, Debug)]
pub enum SchemaLoadError {
    /// The schema directory could not be read at all.
    #[error("cannot read schema directory '{path}': {source}")]
    DirectoryUnreadable {
        /// Directory that failed to open.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// A schema file could not be read from disk.
    #[error("cannot read schema file '{file}': {reason}")]
    FileUnreadable {
        /// Filename of the schema.
        file: String,
        /// Reason the file could not be read.
        reason: String,
    },

    /// A schema file is not valid JSON.
    #[error("schema file '{file}' is not valid JSON: {reason}")]
    InvalidJson {
        /// Filename of the schema.
        file: String,
        /// Parser message.
        reason: String,
    },

    /// Two schema files declare the same identifier.
    #[error("schema file '{file}' duplicates identifier '{identifier}' (first defined by '{first_file}')")]
    DuplicateIdentifier {
        /// Filename of the offending schema.
        file: String,
        /// The duplicated identifier.
        identifier: String,
        /// Filename of the schema that defined the identifier first.
        first_file: String,
    },

    /// An identifier was not found in the registry.
    #[error("schema '{identifier}' not found in registry loaded from '{schema_dir}'")]
    NotFound {
        /// The identifier that failed to resolve.
        identifier: String,
        /// Directory the registry was loaded from.
        schema_dir: String,
    },

    /// The compiled validator could not be built (e.g., invalid schema).
    #[error("cannot build validator for schema '{identifier}': {reason}")]
    ValidatorBuild {
        /// The schema identifier.
        identifier: String,
        /// Reason the validator could not be compiled.
        reason: String,
    },
}

/// Result of loading a schema directory: the registry that was built plus
/// the per-file errors for every schema that had to be skipped.
///
/// Skips are deliberate, not silent: each one is also logged at `warn`
/// level, and callers that need strict loading can inspect `skipped`.
#[derive(Debug)]
pub struct LoadOutcome {
    /// The registry built from all loadable schemas.
    pub registry: SchemaRegistry,
    /// Errors for schema files that could not be loaded or indexed.
    pub skipped: Vec<SchemaLoadError>,
}

/// Local retriever that resolves `$ref` URIs to schemas loaded in memory.
///
/// All cross-schema references resolve locally from the registry snapshot;
/// unresolved URIs (e.g. draft metaschemas) fall back to a permissive
/// schema so validation proceeds without network requests.
struct LocalSchemaRetriever {
    schemas_by_uri: HashMap<String, Value>,
}

impl Retrieve for LocalSchemaRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri_str = uri.as_str();

        if let Some(value) = self.schemas_by_uri.get(uri_str) {
            return Ok(value.clone());
        }

        // Fall back to the last URI segment under the canonical prefix,
        // then to the bare name.
        let name = uri_str.rsplit('/').next().unwrap_or(uri_str);
        let prefixed = format!("{SCHEMA_URI_PREFIX}{name}");
        if let Some(value) = self.schemas_by_uri.get(&prefixed) {
            return Ok(value.clone());
        }
        if let Some(value) = self.schemas_by_uri.get(name) {
            return Ok(value.clone());
        }

        Ok(serde_json::json!({}))
    }
}

/// An immutable index of JSON Schema documents keyed by identifier.
///
/// Built once from a directory snapshot via [`SchemaRegistry::load`] and
/// read-only thereafter. `SchemaRegistry` is `Send + Sync`; one instance
/// may back any number of concurrent batch validations.
#[derive(Debug)]
pub struct SchemaRegistry {
    /// Directory the schemas were loaded from.
    schema_dir: PathBuf,
    /// Identifiers in sorted-filename insertion order.
    order: Vec<String>,
    /// Identifier -> parsed schema document.
    schemas: HashMap<String, Value>,
    /// Identifier -> filename it was loaded from.
    sources: HashMap<String, String>,
}

impl SchemaRegistry {
    /// Load every `*.json` file in `dir` and index it by `$id` (filename
    /// fallback), in sorted filename order.
    ///
    /// Malformed files and duplicate identifiers are skipped and recorded
    /// in the returned [`LoadOutcome`]; only an unreadable directory is an
    /// error.
    pub fn load(dir: impl AsRef<Path>) -> Result<LoadOutcome, SchemaLoadError> {
        let schema_dir = dir.as_ref().to_path_buf();

        let entries = std::fs::read_dir(&schema_dir).map_err(|source| {
            SchemaLoadError::DirectoryUnreadable {
                path: schema_dir.clone(),
                source,
            }
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension().and_then(|e| e.to_str()) == Some("json") && path.is_file()
            })
            .collect();
        // Sorted load order keeps identifier iteration deterministic
        // regardless of filesystem enumeration order.
        paths.sort();

        let mut registry = SchemaRegistry {
            schema_dir,
            order: Vec::new(),
            schemas: HashMap::new(),
            sources: HashMap::new(),
        };
        let mut skipped = Vec::new();

        for path in paths {
            let file = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();

            let content = match std::fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    let err = SchemaLoadError::FileUnreadable {
                        file,
                        reason: e.to_string(),
                    };
                    tracing::warn!("skipping schema: {err}");
                    skipped.push(err);
                    continue;
                }
            };

            let value: Value = match serde_json::from_str(&content) {
                Ok(value) => value,
                Err(e) => {
                    let err = SchemaLoadError::InvalidJson {
                        file,
                        reason: e.to_string(),
                    };
                    tracing::warn!("skipping schema: {err}");
                    skipped.push(err);
                    continue;
                }
            };

            let identifier = value
                .get("$id")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| file.clone());

            if let Some(first_file) = registry.sources.get(&identifier) {
                let err = SchemaLoadError::DuplicateIdentifier {
                    file,
                    identifier: identifier.clone(),
                    first_file: first_file.clone(),
                };
                tracing::warn!("skipping schema: {err}");
                skipped.push(err);
                continue;
            }

            registry.order.push(identifier.clone());
            registry.sources.insert(identifier.clone(), file);
            registry.schemas.insert(identifier, value);
        }

        Ok(LoadOutcome { registry, skipped })
    }

    /// Returns the directory this registry was loaded from.
    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    /// Number of loaded schemas.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True if no schemas were loaded.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Identifiers in load (sorted-filename) order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    /// Exact-match lookup by identifier.
    pub fn get(&self, identifier: &str) -> Option<&Value> {
        self.schemas.get(identifier)
    }

    /// Filename a schema was loaded from, by identifier.
    pub fn source_file(&self, identifier: &str) -> Option<&str> {
        self.sources.get(identifier).map(|s| s.as_str())
    }

    /// Heuristic lookup: the first identifier (in load order) containing
    /// `event_type` as a substring. Load order is sorted, so the result is
    /// stable for a given directory snapshot.
    pub fn find_by_event_type(&self, event_type: &str) -> Option<&str> {
        if event_type.is_empty() {
            return None;
        }
        self.order
            .iter()
            .find(|id| id.contains(event_type))
            .map(|s| s.as_str())
    }

    /// Build `ValidationOptions` with every loaded schema registered for
    /// `$ref` resolution under its `$id`, its canonical-prefix URI, and
    /// its bare filename.
    fn build_options(&self) -> ValidationOptions {
        let mut opts = jsonschema::options();
        opts.with_draft(jsonschema::Draft::Draft202012);

        let mut schemas_by_uri: HashMap<String, Value> = HashMap::new();
        for (identifier, value) in &self.schemas {
            schemas_by_uri.insert(identifier.clone(), value.clone());

            if let Some(file) = self.sources.get(identifier) {
                schemas_by_uri.insert(file.clone(), value.clone());
                schemas_by_uri.insert(format!("{SCHEMA_URI_PREFIX}{file}"), value.clone());
                // $id URIs carry no .json suffix; register the stem too.
                if let Some(stem) = file.strip_suffix(".json") {
                    schemas_by_uri.insert(format!("{SCHEMA_URI_PREFIX}{stem}"), value.clone());
                }
            }
        }

        opts.with_retriever(LocalSchemaRetriever { schemas_by_uri });
        opts
    }

    /// Compile a validator for the schema named by `identifier`, with all
    /// other loaded schemas available for `$ref` resolution.
    pub fn build_validator(&self, identifier: &str) -> Result<Validator, SchemaLoadError> {
        let schema = self
            .schemas
            .get(identifier)
            .ok_or_else(|| SchemaLoadError::NotFound {
                identifier: identifier.to_string(),
                schema_dir: self.schema_dir.display().to_string(),
            })?;

        let opts = self.build_options();
        opts.build(schema)
            .map_err(|e| SchemaLoadError::ValidatorBuild {
                identifier: identifier.to_string(),
                reason: e.to_string(),
            })
    }
}
