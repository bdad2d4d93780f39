//! `roster sync`: reconcile a school's class staffing against an input file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use roster_sync::{normalize_rows, pipeline, report, Event, EventSink, RunOptions};

use super::RemoteArgs;
use crate::sheet;

/// Arguments for `roster sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// CSV export with one row per teacher.
    pub input: PathBuf,

    #[command(flatten)]
    pub remote: RemoteArgs,

    /// Plan and narrate every action without changing anything remotely.
    #[arg(long)]
    pub dry_run: bool,

    /// Also remove teachers who are on a matched class but not in the file.
    #[arg(long)]
    pub remove_missing: bool,

    /// Print the run result as JSON instead of the live narration.
    #[arg(long)]
    pub json: bool,

    /// Also write the run result to this path.
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

/// Prints log events as they arrive.
struct ConsoleSink {
    prefix: &'static str,
    quiet: bool,
}

impl EventSink for ConsoleSink {
    fn emit(&mut self, event: Event) {
        match event {
            Event::Log { text } if !self.quiet => println!("{}{text}", self.prefix),
            Event::Progress {
                phase,
                current,
                total,
                message,
            } => tracing::debug!("[{phase} {current}/{total}] {message}"),
            _ => {}
        }
    }
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let profile = super::load_profile(&home)?;
        let conn = self.remote.resolve(&profile)?;
        let rows = sheet::read_rows(&self.input)?;
        let desired = normalize_rows(&rows);

        let options = RunOptions {
            colegio_id: conn.scope.colegio_id,
            dry_run: self.dry_run,
            remove_missing: self.remove_missing,
            level_ids: profile.level_ids.clone(),
        };
        let api = conn.client();
        let mut sink = ConsoleSink {
            prefix: if self.dry_run { "[dry-run] " } else { "" },
            quiet: self.json,
        };
        let result = pipeline::run(&api, &desired, &options, &mut sink)
            .with_context(|| format!("sync failed for colegio {}", options.colegio_id))?;

        if !self.dry_run {
            let path = report::save_at(&home, &result).context("failed to save run report")?;
            if !self.json {
                println!("{} {}", "Reporte:".dimmed(), path.display());
            }
        }
        if let Some(path) = &self.report {
            report::write_to(path, &result)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            super::print_result(&result);
        }
        Ok(())
    }
}
