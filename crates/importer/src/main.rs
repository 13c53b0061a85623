//! `mudclub-importer` -- import club members from a CSV file.
//!
//! Every row is reconciled against the canonical person table and bound to
//! a role-record of the chosen kind.
//!
//! # Environment variables
//!
//! | Variable                   | Required | Default  | Description                    |
//! |----------------------------|----------|----------|--------------------------------|
//! | `DATABASE_URL`             | yes*     | --       | PostgreSQL connection string   |
//! | `DATABASE_MAX_CONNECTIONS` | no       | `20`     | Pool size                      |
//! | `IMPORT_ROLE`              | no       | `player` | player, coach, parent or user  |
//! | `IMPORT_ON_ERROR`          | no       | `skip`   | skip or abort                  |
//! | `IMPORT_HAS_HEADERS`       | no       | `true`   | First line is a header         |
//!
//! \* not needed with `--dry-run`.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mudclub_core::import::{ImportSummary, OnError};
use mudclub_core::observer::TracingObserver;
use mudclub_core::role::RoleKind;
use mudclub_importer::config::ImportConfig;
use mudclub_importer::{reader, runner};

#[derive(Parser)]
#[command(name = "mudclub-importer")]
#[command(about = "Import club members from a CSV file", long_about = None)]
struct Cli {
    /// CSV file with columns dni, name, surname, nickname, birthday,
    /// address, email, phone, sex and an optional record id
    file: PathBuf,

    /// Role every row is imported as
    #[arg(long)]
    role: Option<RoleKind>,

    /// What to do after a failed row (skip or abort)
    #[arg(long)]
    on_error: Option<OnError>,

    /// Treat the first line as data
    #[arg(long)]
    no_headers: bool,

    /// Mark imported records active
    #[arg(long, conflicts_with = "inactive")]
    active: bool,

    /// Mark imported records inactive
    #[arg(long)]
    inactive: bool,

    /// Validate and reconcile against an in-memory store only
    #[arg(long)]
    dry_run: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mudclub_importer=info,mudclub_db=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = ImportConfig::from_env().context("invalid import configuration")?;
    if let Some(role) = cli.role {
        config.role = role;
    }
    if let Some(on_error) = cli.on_error {
        config.on_error = on_error;
    }
    if cli.no_headers {
        config.has_headers = false;
    }
    if cli.active || cli.inactive {
        config.active = Some(cli.active);
    }
    config.dry_run = cli.dry_run;

    let rows = reader::read_path(&cli.file, config.has_headers)
        .with_context(|| format!("Failed to read CSV file: {}", cli.file.display()))?;
    tracing::info!(
        file = %cli.file.display(),
        rows = rows.len(),
        role = %config.role,
        dry_run = config.dry_run,
        "Loaded import file",
    );

    let summary = runner::run(&config, rows, &TracingObserver).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    Ok(if summary.failed.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_summary(summary: &ImportSummary) {
    println!("Processed: {}", summary.processed());
    println!("  Created: {}", summary.created);
    println!("  Linked:  {}", summary.linked);
    println!("  Failed:  {}", summary.failed.len());
    for failure in &summary.failed {
        println!("    line {}: {}", failure.line, failure.error);
    }
    if summary.aborted {
        println!("Import aborted at the first failed row");
    }
}
