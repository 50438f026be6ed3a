//! # Events Subcommand
//!
//! Validates one or more NDJSON event files against the schema registry.
//! Preserves the report contract of the original `validate.js` tool:
//! summary counts per file plus a per-line detail dump for every invalid
//! line.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use peevem_schema::{
    BatchReport, BatchValidator, ClassifierRules, OutcomeDetail, SchemaRegistry,
};

/// Default identifier of the baseline schema every event must satisfy.
pub const DEFAULT_CORE_SCHEMA_ID: &str = "https://peevem.org/schemas/core";

/// Arguments for the events subcommand.
#[derive(Args, Debug)]
pub struct EventsArgs {
    /// Directory containing the JSON Schema documents.
    #[arg(long, default_value = "schemas")]
    pub schemas: PathBuf,

    /// Optional JSON file with a custom classification rule table.
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Identifier of the core (baseline) schema.
    #[arg(long, default_value = DEFAULT_CORE_SCHEMA_ID)]
    pub core: String,

    /// Emit the batch reports as JSON instead of human-readable text.
    #[arg(long)]
    pub json: bool,

    /// NDJSON event files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// Run the events subcommand. Returns `true` when the whole run was clean.
pub fn run(args: &EventsArgs) -> anyhow::Result<bool> {
    let outcome = SchemaRegistry::load(&args.schemas)
        .with_context(|| format!("loading schemas from {}", args.schemas.display()))?;
    tracing::info!(
        count = outcome.registry.len(),
        dir = %args.schemas.display(),
        "loaded schemas"
    );
    // Skipped schema files fail the run but do not block validation.
    let mut clean = outcome.skipped.is_empty();

    let rules = match &args.rules {
        Some(path) => ClassifierRules::from_file(path)
            .with_context(|| format!("loading rule table from {}", path.display()))?,
        None => ClassifierRules::standard(&outcome.registry)
            .context("building standard classification rules")?,
    };
    rules
        .resolve_against(&outcome.registry)
        .context("resolving rule table against loaded schemas")?;

    let mut batch = BatchValidator::new(&outcome.registry, &rules, &args.core)
        .context("compiling core schema")?;

    let mut reports = Vec::with_capacity(args.files.len());
    for file in &args.files {
        let report = batch
            .validate_file(file)
            .with_context(|| format!("validating {}", file.display()))?;
        clean &= report.is_clean();
        reports.push(report);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            print_report(report);
        }
    }

    Ok(clean)
}

/// Render one batch report in the summary-plus-details format.
fn print_report(report: &BatchReport) {
    println!("\nValidation Summary:");
    println!("File: {}", report.file_path);
    println!("Total Events: {}", report.total_events);
    println!("Valid Events: {}", report.valid_count);
    println!("Invalid Events: {}", report.invalid_count);
    if report.no_schema_count > 0 {
        println!(
            "Events with no specific schema (core only): {}",
            report.no_schema_count
        );
    }

    if report.errors.is_empty() {
        return;
    }

    println!("\nErrors:");
    for outcome in &report.errors {
        println!("\nLine {}:", outcome.line);
        if let Some(schema_id) = &outcome.schema_id {
            println!("Schema: {schema_id}");
        }
        match &outcome.detail {
            OutcomeDetail::Message { message } => println!("{message}"),
            OutcomeDetail::Violations { errors } => {
                for violation in errors {
                    println!("  {violation}");
                }
            }
        }
    }
}
