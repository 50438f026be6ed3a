//! # peevem-cli — PEEVEM Validation Command-Line Interface
//!
//! Wraps `peevem-schema` in a clap-based CLI for CI and local use.
//!
//! ## Subcommands
//!
//! - `events` — Validate NDJSON event files against the schema registry
//! - `schemas` — Audit the schema files themselves (meta-schema + `$ref`s)
//!
//! ## Crate Policy
//!
//! - CLI construction (argument parsing) is separated from the validation
//!   logic, which lives entirely in `peevem-schema`.
//! - Each handler returns whether the run was clean; `main` owns the
//!   exit-code contract: 0 only when zero invalid events/schemas were
//!   found across all inputs, 1 otherwise.

pub mod events;
pub mod schemas;
