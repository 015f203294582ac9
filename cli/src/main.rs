//! ossa-migrate: migrate and validate OSSA agent manifests.
//!
//! Usage:
//!   ossa-migrate migrate agent.yaml
//!   ossa-migrate migrate agent.yaml --in-place --target v0.2.2
//!   ossa-migrate validate agent.migrated.yaml --json
//!   ossa-migrate detect agent.yaml
//!   ossa-migrate info agent.yaml
//!   ossa-migrate batch manifests/ --jobs 8
//!   ossa-migrate versions

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ossa_contracts::error::OssaError;

// ── CLI definition ────────────────────────────────────────────────────────────

/// Migrate OSSA agent manifests to the current schema version.
///
/// Documents are detected, migrated one version step at a time, and validated
/// against the target version before anything is written.
#[derive(Parser)]
#[command(
    name = "ossa-migrate",
    version,
    about = "Migrate and validate OSSA agent manifests",
    long_about = "Detects the schema version of OSSA agent manifests (YAML or JSON),\n\
                  migrates them forward through every intermediate version, and\n\
                  validates the result against the target version's schema."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Migrate one manifest and write the result.
    Migrate(MigrateArgs),
    /// Validate a manifest against its detected (or a named) version.
    Validate(ValidateArgs),
    /// Print the detected schema version of a manifest.
    Detect {
        path: PathBuf,
    },
    /// Show a manifest's name, kind, version, model, and tool count.
    Info(InfoArgs),
    /// Migrate every manifest under a directory concurrently.
    Batch(BatchArgs),
    /// Print the version table and the migration path to current.
    Versions,
}

#[derive(clap::Args)]
struct MigrateArgs {
    /// Manifest to migrate (.yaml, .yml, or .json).
    source: PathBuf,
    /// Where to write the result. Defaults to `<stem>.migrated.<ext>`.
    #[arg(short, long, conflicts_with = "in_place")]
    output: Option<PathBuf>,
    /// Overwrite the source file.
    #[arg(long)]
    in_place: bool,
    /// Print the migrated document instead of writing it.
    #[arg(long)]
    dry_run: bool,
    #[command(flatten)]
    rules: RuleArgs,
    #[command(flatten)]
    schemas: SchemaArgs,
    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
struct ValidateArgs {
    path: PathBuf,
    /// Version to validate against. Defaults to the detected version.
    #[arg(long = "version", value_name = "VERSION")]
    schema_version: Option<String>,
    #[command(flatten)]
    schemas: SchemaArgs,
    /// Print the result as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
struct InfoArgs {
    path: PathBuf,
    /// Print the details as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
struct BatchArgs {
    /// Directory searched recursively for manifests.
    dir: PathBuf,
    /// Report what would change without writing anything.
    #[arg(long)]
    dry_run: bool,
    /// Worker threads.
    #[arg(long, default_value_t = 4)]
    jobs: usize,
    #[command(flatten)]
    rules: RuleArgs,
    #[command(flatten)]
    schemas: SchemaArgs,
}

/// Options shared by every command that migrates.
#[derive(clap::Args)]
struct RuleArgs {
    /// Target version id or apiVersion. Defaults to the config's target.
    #[arg(long)]
    target: Option<String>,
    /// TOML file with rule defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Options shared by every command that validates.
#[derive(clap::Args)]
struct SchemaArgs {
    /// Directory of `<version>.json` bundles that replace the built-in ones.
    #[arg(long, value_name = "DIR")]
    schema_dir: Option<PathBuf>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug for pipeline diagnostics on stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate(args) => commands::migrate(args),
        Command::Validate(args) => commands::validate(args),
        Command::Detect { path } => commands::detect(&path),
        Command::Info(args) => commands::info(args),
        Command::Batch(args) => commands::batch(args),
        Command::Versions => commands::versions(),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            report_error(&e);
            std::process::exit(1);
        }
    }
}

fn report_error(error: &OssaError) {
    eprintln!("error: {}", error);
    if let OssaError::ValidationFailure { issues, .. } = error {
        for issue in issues {
            eprintln!("  - {}", issue);
        }
    }
}
