//! `roster preview`: normalize an input file offline.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use roster_core::DesiredAssignment;
use roster_sync::normalize_rows;

use crate::sheet;

/// Arguments for `roster preview`.
#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// CSV export with one row per teacher.
    pub input: PathBuf,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct AssignmentRow {
    #[tabled(rename = "fila")]
    row: usize,
    #[tabled(rename = "personaId")]
    persona: String,
    #[tabled(rename = "nombre")]
    name: String,
    #[tabled(rename = "curso")]
    course: String,
    #[tabled(rename = "niveles")]
    levels: String,
    #[tabled(rename = "estado")]
    estado: String,
}

impl From<&DesiredAssignment> for AssignmentRow {
    fn from(a: &DesiredAssignment) -> Self {
        Self {
            row: a.source_row,
            persona: a.persona_id.to_string(),
            name: a.display_name.clone(),
            course: a.course_name.clone(),
            levels: a.level_description(),
            estado: a.desired_active.map(|s| s.to_string()).unwrap_or_default(),
        }
    }
}

#[derive(Serialize)]
struct PreviewJson<'a> {
    rows_read: usize,
    invalid: usize,
    assignments: &'a [DesiredAssignment],
    warnings: &'a [String],
}

impl PreviewArgs {
    pub fn run(self) -> Result<()> {
        let rows = sheet::read_rows(&self.input)?;
        let desired = normalize_rows(&rows);

        if self.json {
            let out = PreviewJson {
                rows_read: desired.rows_read,
                invalid: desired.invalid,
                assignments: &desired.assignments,
                warnings: &desired.warnings,
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
            return Ok(());
        }

        if desired.assignments.is_empty() {
            println!("No se encontraron docentes validos en el Excel.");
        } else {
            let table: Vec<AssignmentRow> = desired.assignments.iter().map(Into::into).collect();
            println!("{}", Table::new(table).with(Style::rounded()));
        }
        println!(
            "{} filas leídas, {} asignaciones, {} inválidas",
            desired.rows_read,
            desired.assignments.len(),
            desired.invalid
        );
        for warning in &desired.warnings {
            println!("{}", warning.yellow());
        }
        Ok(())
    }
}
