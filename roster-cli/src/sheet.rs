//! CSV adapter: a spreadsheet export → canonical [`SheetRow`]s.
//!
//! The delimiter is sniffed from the header line (`,` `;` or tab), a UTF-8
//! BOM is dropped, and headers go through the alias table in
//! `roster_core::columns`. Row numbers follow the spreadsheet (header = 1).

use std::path::Path;

use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;

use roster_core::columns::canonicalize_headers;
use roster_core::{Column, SheetRow};

const DELIMITERS: [u8; 3] = [b',', b';', b'\t'];

/// Read and canonicalize every row of a CSV file.
pub fn read_rows(path: &Path) -> Result<Vec<SheetRow>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read input file {}", path.display()))?;
    parse_rows(&text).with_context(|| format!("invalid CSV in {}", path.display()))
}

pub fn parse_rows(text: &str) -> Result<Vec<SheetRow>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = ReaderBuilder::new()
        .delimiter(sniff_delimiter(text))
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let columns = canonicalize_headers(&headers);
    if !columns.contains(&Some(Column::PersonaId)) || !columns.contains(&Some(Column::Course)) {
        bail!("header must name a personaId column and a CURSO column");
    }

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let row_number = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 2);
        let mut row = SheetRow::new(row_number);
        for (column, cell) in columns.iter().zip(record.iter()) {
            if let Some(column) = column {
                row = row.with(*column, cell);
            }
        }
        rows.push(row);
    }
    tracing::debug!("read {} rows", rows.len());
    Ok(rows)
}

/// Most frequent candidate delimiter on the header line; `,` on ties.
fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    let mut best = b',';
    let mut best_count = 0;
    for delimiter in DELIMITERS {
        let count = header.bytes().filter(|b| *b == delimiter).count();
        if count > best_count {
            best = delimiter;
            best_count = count;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use roster_core::Level;

    use super::*;

    #[test]
    fn semicolon_export_with_bom() {
        let text = "\u{feff}personaId;CURSO;Primaria;Estado\n500;Matemática;SI;Activo\n";
        let rows = parse_rows(text).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row_number, 2);
        assert_eq!(rows[0].get(Column::PersonaId), "500");
        assert_eq!(rows[0].get(Column::LevelFlag(Level::Primaria)), "SI");
        assert_eq!(rows[0].get(Column::Estado), "Activo");
    }

    #[test]
    fn tab_delimiter_and_grade_columns() {
        let text = "id\tAsignatura\tS1\tS2\n600\tArte\tx\t\n";
        let rows = parse_rows(text).unwrap();
        assert_eq!(rows[0].get(Column::Course), "Arte");
        assert_eq!(rows[0].get(Column::GradeFlag(Level::Secundaria, 1)), "x");
    }

    #[test]
    fn duplicate_and_unknown_headers_ignored() {
        let text = "personaId,CURSO,Curso,Observaciones\n5,Arte,Música,nada\n";
        let rows = parse_rows(text).unwrap();
        assert_eq!(rows[0].get(Column::Course), "Arte");
        assert_eq!(rows[0].cells.len(), 2);
    }

    #[test]
    fn quoted_course_list_keeps_commas() {
        let text = "personaId,CURSO\n5,\"Arte, Música\"\n6,Historia\n";
        let rows = parse_rows(text).unwrap();
        assert_eq!(rows[0].get(Column::Course), "Arte, Música");
        assert_eq!(rows[1].row_number, 3);
    }

    #[test]
    fn missing_required_headers_rejected() {
        let err = parse_rows("nombre,estado\nAna,Activo\n").unwrap_err();
        assert!(err.to_string().contains("personaId"));
    }
}
