pub mod catalog;
pub mod config;
pub mod preview;
pub mod report;
pub mod sync;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use roster_api::{HttpSchoolApi, Scope};
use roster_core::Profile;
use roster_sync::{ActionError, ExecutionResult};

pub fn home() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

pub fn load_profile(home: &std::path::Path) -> Result<Profile> {
    roster_core::config::load_at(home).context("failed to load ~/.roster/config.yaml")
}

/// Connection flags shared by every command that talks to the service.
///
/// Each value resolves flag → environment → profile → built-in default.
#[derive(Args, Debug, Default)]
pub struct RemoteArgs {
    /// School (colegio) id to reconcile.
    #[arg(long)]
    pub colegio: Option<u64>,

    /// Bearer token for the school API.
    #[arg(long, env = "ROSTER_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Override the profile base URL.
    #[arg(long)]
    pub base_url: Option<String>,
}

/// Fully resolved connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub base_url: String,
    pub token: String,
    pub scope: Scope,
    pub timeout: Duration,
}

impl RemoteArgs {
    pub fn resolve(&self, profile: &Profile) -> Result<Connection> {
        let token = self
            .token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| profile.token.clone())
            .context(
                "no API token: pass --token, set ROSTER_TOKEN or run `roster config set token <value>`",
            )?;
        let colegio_id = self.colegio.or(profile.colegio_id).context(
            "no colegio id: pass --colegio or run `roster config set colegio_id <id>`",
        )?;
        let base_url = self
            .base_url
            .as_deref()
            .unwrap_or(&profile.base_url)
            .trim_end_matches('/')
            .to_string();
        Ok(Connection {
            base_url,
            token,
            scope: Scope {
                empresa_id: profile.empresa_id,
                ciclo_id: profile.ciclo_id,
                colegio_id,
            },
            timeout: Duration::from_secs(profile.timeout_secs),
        })
    }
}

impl Connection {
    pub fn client(&self) -> HttpSchoolApi {
        HttpSchoolApi::new(&self.base_url, &self.token, self.scope, self.timeout)
    }
}

#[derive(Tabled)]
struct CounterRow {
    #[tabled(rename = "counter")]
    name: &'static str,
    #[tabled(rename = "value")]
    value: usize,
}

/// Warnings, a counters table and the error list of one run.
pub fn print_result(result: &ExecutionResult) {
    let c = &result.counters;
    let rows = [
        ("procesados", c.processed),
        ("invalidos", c.invalid),
        ("sin niveles", c.skipped),
        ("sin coincidencia", c.unmatched),
        ("coincidencias", c.matched),
        ("agregados", c.added),
        ("omitidos", c.omitted),
        ("eliminados", c.removed),
        ("niveles asignados", c.levels_assigned),
        ("activados", c.activated),
        ("desactivados", c.deactivated),
        ("clases ignoradas", c.ignored_classes),
        ("errores", c.errors),
    ]
    .map(|(name, value)| CounterRow { name, value });

    if !result.warnings.is_empty() {
        println!();
        println!("{}", "Advertencias:".yellow().bold());
        for warning in &result.warnings {
            println!("  {}", warning.yellow());
        }
    }

    println!();
    let mode = if result.dry_run { "dry-run" } else { "aplicado" };
    println!(
        "{} colegio {} ({mode})",
        "Resumen".bold(),
        result.colegio_id
    );
    println!("{}", Table::new(rows).with(Style::rounded()));

    if result.errors.is_empty() {
        println!("{}", "✓ sin errores".green());
        return;
    }
    println!("{}", format!("Errores ({}):", result.errors.len()).red().bold());
    for error in &result.errors {
        println!("  {}", describe_error(error).red());
    }
}

fn describe_error(error: &ActionError) -> String {
    let mut target = Vec::new();
    if let Some(persona) = error.persona_id {
        target.push(format!("personaId={persona}"));
    }
    if let Some(class) = error.class_id {
        target.push(format!("clase={class}"));
    }
    if let Some(level) = error.level_id {
        target.push(format!("nivel={level}"));
    }
    format!("[{}] {}: {}", error.kind, target.join(" "), error.message)
}
