//! # peevem-schema — PEEVEM Event Stream Validation
//!
//! Validates PEEVEM NDJSON event streams against their JSON Schema
//! (Draft 2020-12) definitions. The crate is organized around three
//! pieces, leaves first:
//!
//! - [`registry`] — loads a directory of schema documents into an
//!   immutable [`SchemaRegistry`] indexed by `$id` (filename fallback),
//!   with deterministic sorted load order and local `$ref` resolution.
//! - [`classify`] — an ordered, declarative rule table
//!   ([`ClassifierRules`]) mapping event types to schema identifiers,
//!   with a generic fallback for any record carrying an `event` field.
//! - [`batch`] — [`BatchValidator`] streams an NDJSON file line by line,
//!   validates each record against the core schema and then its
//!   classified schema, and accumulates a [`BatchReport`].
//!
//! [`audit`] additionally checks the schema documents themselves:
//! meta-schema validity and `$ref` cross-reference resolution.
//!
//! ## Crate Policy
//!
//! - The registry is built once from a directory snapshot and never
//!   mutated; it is `Send + Sync` and may back concurrent validations.
//! - Per-item failures (one malformed schema file, one bad NDJSON line)
//!   are accumulated into reports, never thrown past the batch boundary.
//!   Only I/O-level failures propagate as errors.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod audit;
pub mod batch;
pub mod classify;
pub mod registry;

pub use audit::{audit_schemas, Finding, SchemaAuditReport, Severity};
pub use batch::{BatchError, BatchReport, BatchValidator, InvalidOutcome, OutcomeDetail, Violation};
pub use classify::{ClassifierError, ClassifierRules, Rule};
pub use registry::{LoadOutcome, SchemaLoadError, SchemaRegistry, SCHEMA_URI_PREFIX};
