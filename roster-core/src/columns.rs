//! Canonical spreadsheet columns and the header alias table.
//!
//! Spreadsheet readers map each raw header through [`Column::from_header`]
//! and hand the engine [`SheetRow`]s keyed by canonical column. Cell type
//! coercion stays with the reader; every cell arrives as text.

use std::collections::BTreeMap;
use std::fmt;

use crate::text::normalize_header;
use crate::types::Level;

/// A column the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    Course,
    PersonaId,
    /// Level-general flag (Inicial / Primaria / Secundaria).
    LevelFlag(Level),
    /// Grade flag such as `P3`.
    GradeFlag(Level, u8),
    Sections,
    Estado,
    Nombre,
    ApellidoPaterno,
    ApellidoMaterno,
}

impl Column {
    /// Resolve a raw header through the alias table.
    pub fn from_header(header: &str) -> Option<Column> {
        let key = normalize_header(header);
        let column = match key.as_str() {
            "curso" | "asignatura" | "materia" | "clase" | "clases" | "class" => Column::Course,
            "personaid" | "idpersona" | "id" => Column::PersonaId,
            "inicial" => Column::LevelFlag(Level::Inicial),
            "primaria" => Column::LevelFlag(Level::Primaria),
            "secundaria" => Column::LevelFlag(Level::Secundaria),
            "secciones" | "seccion" => Column::Sections,
            "estado" => Column::Estado,
            "nombre" | "nombres" => Column::Nombre,
            "apellidopaterno" => Column::ApellidoPaterno,
            "apellidomaterno" => Column::ApellidoMaterno,
            other => return grade_flag(other),
        };
        Some(column)
    }
}

fn grade_flag(key: &str) -> Option<Column> {
    let mut chars = key.chars();
    let level = Level::from_letter(chars.next()?)?;
    let grade = chars.next()?.to_digit(10)?;
    if chars.next().is_some() {
        return None;
    }
    let grade = u8::try_from(grade).ok()?;
    level
        .grades()
        .contains(&grade)
        .then_some(Column::GradeFlag(level, grade))
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Column::Course => write!(f, "CURSO"),
            Column::PersonaId => write!(f, "personaId"),
            Column::LevelFlag(level) => write!(f, "{level}"),
            Column::GradeFlag(level, grade) => write!(f, "{}{grade}", level.letter()),
            Column::Sections => write!(f, "Secciones"),
            Column::Estado => write!(f, "Estado"),
            Column::Nombre => write!(f, "Nombre"),
            Column::ApellidoPaterno => write!(f, "Apellido Paterno"),
            Column::ApellidoMaterno => write!(f, "Apellido Materno"),
        }
    }
}

/// Map raw headers to canonical columns by position.
///
/// The first header claiming a canonical column wins; later duplicates and
/// unknown headers map to `None`.
pub fn canonicalize_headers<S: AsRef<str>>(headers: &[S]) -> Vec<Option<Column>> {
    let mut claimed = Vec::new();
    headers
        .iter()
        .map(|h| {
            let column = Column::from_header(h.as_ref())?;
            if claimed.contains(&column) {
                return None;
            }
            claimed.push(column);
            Some(column)
        })
        .collect()
}

/// One spreadsheet row with cells keyed by canonical column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetRow {
    /// Spreadsheet row number (header = 1, first data row = 2).
    pub row_number: usize,
    pub cells: BTreeMap<Column, String>,
}

impl SheetRow {
    pub fn new(row_number: usize) -> Self {
        Self {
            row_number,
            cells: BTreeMap::new(),
        }
    }

    /// Builder-style insert, convenient in tests and adapters.
    pub fn with(mut self, column: Column, value: impl Into<String>) -> Self {
        self.cells.insert(column, value.into());
        self
    }

    /// Trimmed cell text, empty when the column is absent.
    pub fn get(&self, column: Column) -> &str {
        self.cells.get(&column).map(|s| s.trim()).unwrap_or("")
    }

    /// True when every cell is empty after trimming.
    pub fn is_blank(&self) -> bool {
        self.cells.values().all(|v| v.trim().is_empty())
    }
}
