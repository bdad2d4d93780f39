//! `roster report`: show the most recent saved run.

use anyhow::{Context, Result};
use clap::Args;

use roster_sync::report;

/// Arguments for `roster report`.
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Emit the stored result as JSON.
    #[arg(long)]
    pub json: bool,
}

impl ReportArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let Some((path, result)) =
            report::latest_at(&home).context("failed to read ~/.roster/reports")?
        else {
            println!("No hay reportes todavía. Ejecuta `roster sync` sin --dry-run.");
            return Ok(());
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
            return Ok(());
        }
        println!("{}", path.display());
        println!(
            "inicio {}  fin {}",
            result.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            result
                .finished_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "-".to_string())
        );
        super::print_result(&result);
        Ok(())
    }
}
