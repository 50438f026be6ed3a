//! # peevem CLI Entry Point
//!
//! Assembles subcommands, dispatches to handler modules, and owns the
//! exit-code contract: 0 when zero invalid events/schemas across all
//! inputs, 1 otherwise.

use std::process::ExitCode;

use clap::Parser;

/// PEEVEM validation toolchain.
///
/// Validates NDJSON event streams against the PEEVEM JSON Schemas and
/// audits the schema files themselves.
#[derive(Parser, Debug)]
#[command(name = "peevem", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Validate NDJSON event files against the schema registry.
    Events(peevem_cli::events::EventsArgs),
    /// Audit schema files: meta-schema validity and $ref resolution.
    Schemas(peevem_cli::schemas::SchemasArgs),
}

fn main() -> anyhow::Result<ExitCode> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let clean = match cli.command {
        Commands::Events(args) => peevem_cli::events::run(&args)?,
        Commands::Schemas(args) => peevem_cli::schemas::run(&args)?,
    };

    Ok(if clean {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
