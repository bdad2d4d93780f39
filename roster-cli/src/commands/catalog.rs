//! `roster catalog`: list the school's classes as the matcher sees them.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use roster_core::ClassDescriptor;
use roster_sync::Catalog;

use super::RemoteArgs;

/// Arguments for `roster catalog`.
#[derive(Args, Debug)]
pub struct CatalogArgs {
    #[command(flatten)]
    pub remote: RemoteArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct ClassRow {
    id: u64,
    #[tabled(rename = "nombre")]
    name: String,
    #[tabled(rename = "base")]
    base: String,
    #[tabled(rename = "nivel")]
    level: String,
    #[tabled(rename = "grado")]
    grade: u8,
    #[tabled(rename = "sección")]
    section: char,
}

impl From<&ClassDescriptor> for ClassRow {
    fn from(c: &ClassDescriptor) -> Self {
        Self {
            id: c.id.0,
            name: c.display_name.clone(),
            base: c.base_name.clone(),
            level: c.level.to_string(),
            grade: c.grade,
            section: c.section,
        }
    }
}

impl CatalogArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let profile = super::load_profile(&home)?;
        let conn = self.remote.resolve(&profile)?;
        let api = conn.client();
        let catalog = Catalog::fetch(&api)
            .with_context(|| format!("colegio {}", conn.scope.colegio_id))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&catalog)?);
            return Ok(());
        }

        let rows: Vec<ClassRow> = catalog.classes.iter().map(Into::into).collect();
        println!("{}", Table::new(rows).with(Style::rounded()));
        println!("{} clases reconocidas", catalog.classes.len());
        if !catalog.ignored.is_empty() {
            println!(
                "{}",
                format!("Ignoradas por sufijo no reconocido ({}):", catalog.ignored.len())
                    .yellow()
            );
            for class in &catalog.ignored {
                println!("  {}\t{}", class.id, class.name);
            }
        }
        Ok(())
    }
}
