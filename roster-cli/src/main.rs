//! roster: reconcile teacher-to-class staffing from a spreadsheet export.
//!
//! # Usage
//!
//! ```text
//! roster config show|set <key> <value>|path
//! roster preview <rows.csv> [--json]
//! roster catalog [--colegio <id>] [--token <t>] [--json]
//! roster sync <rows.csv> [--colegio <id>] [--dry-run] [--remove-missing] [--json] [--report <path>]
//! roster report [--json]
//! ```

mod commands;
mod sheet;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    catalog::CatalogArgs, config::ConfigCommand, preview::PreviewArgs, report::ReportArgs,
    sync::SyncArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "roster",
    version,
    about = "Reconcile teacher class assignments with a school's remote roster",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Inspect or edit the connection profile.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Show the desired assignments read from an input file, offline.
    Preview(PreviewArgs),

    /// List the school's classes and which names were not understood.
    Catalog(CatalogArgs),

    /// Reconcile levels, activation and class staff against an input file.
    Sync(SyncArgs),

    /// Show the most recent run report.
    Report(ReportArgs),
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Config { command } => commands::config::run(command),
        Commands::Preview(args) => args.run(),
        Commands::Catalog(args) => args.run(),
        Commands::Sync(args) => args.run(),
        Commands::Report(args) => args.run(),
    }
}
