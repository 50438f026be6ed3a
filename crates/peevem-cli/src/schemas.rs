//! # Schemas Subcommand
//!
//! Audits the schema files themselves: meta-schema validation plus
//! cross-reference (`$ref`) resolution checks over the loaded registry.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use peevem_schema::{audit_schemas, SchemaRegistry, Severity};

/// Arguments for the schemas subcommand.
#[derive(Args, Debug)]
pub struct SchemasArgs {
    /// Directory containing the JSON Schema documents.
    #[arg(long, default_value = "schemas")]
    pub schemas: PathBuf,

    /// Emit the audit report as JSON instead of human-readable text.
    #[arg(long)]
    pub json: bool,
}

/// Run the schemas subcommand. Returns `true` when the audit was clean.
pub fn run(args: &SchemasArgs) -> anyhow::Result<bool> {
    let outcome = SchemaRegistry::load(&args.schemas)
        .with_context(|| format!("loading schemas from {}", args.schemas.display()))?;
    let mut clean = outcome.skipped.is_empty();

    let report = audit_schemas(&outcome.registry);
    clean &= !report.has_errors();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(clean);
    }

    println!(
        "Audited {} schemas from {}",
        report.schema_count,
        args.schemas.display()
    );
    for err in &outcome.skipped {
        println!("[error] {err}");
    }
    for finding in &report.findings {
        println!("{finding}");
    }
    let error_count = outcome.skipped.len()
        + report
            .findings
            .iter()
            .filter(|f| f.severity == Severity::Error)
            .count();
    let warning_count = report
        .findings
        .iter()
        .filter(|f| f.severity == Severity::Warning)
        .count();
    println!("{error_count} error(s), {warning_count} warning(s)");

    Ok(clean)
}
