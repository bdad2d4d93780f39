//! Text normalization and cell vocabularies.
//!
//! All comparisons in the engine go through these functions so that
//! `Matemática`, `MATEMATICA` and `matematica ` are the same course.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::types::{DesiredActive, PersonaId};

/// Values accepted as "checked" in level and grade flag columns.
pub const TRUTHY_VALUES: &[&str] = &["SI", "S", "1", "X", "TRUE", "VERDADERO", "YES"];

const ACTIVE_VALUES: &[&str] = &["ACTIVO", "ACTIVA", "A"];
const INACTIVE_VALUES: &[&str] = &[
    "INACTIVO", "INACTIVA", "I", "NO", "N", "0", "FALSE", "FALSO",
];

/// NFD-decompose and drop combining marks (`á` → `a`, `ñ` → `n`).
pub fn strip_diacritics(value: &str) -> String {
    value.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Course-name normalization: strip diacritics, collapse every run of
/// non-alphanumeric characters to one space, uppercase, trim.
pub fn normalize_course(value: &str) -> String {
    let stripped = strip_diacritics(value);
    let mut out = String::with_capacity(stripped.len());
    let mut pending_space = false;
    for c in stripped.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c.to_ascii_uppercase());
        } else {
            pending_space = true;
        }
    }
    out
}

/// Header key: diacritics stripped, non-alphanumerics removed, lowercase.
pub fn normalize_header(value: &str) -> String {
    strip_diacritics(value)
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Cell value as compared against vocabularies: trimmed, diacritics
/// stripped, uppercased.
pub fn normalize_value(value: &str) -> String {
    strip_diacritics(value.trim()).trim().to_uppercase()
}

pub fn is_truthy(value: &str) -> bool {
    let key = normalize_value(value);
    TRUTHY_VALUES.contains(&key.as_str())
}

/// Outcome of reading an Estado cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstadoValue {
    Blank,
    Desired(DesiredActive),
    Unrecognized,
}

pub fn parse_estado(value: &str) -> EstadoValue {
    let key = normalize_value(value);
    if key.is_empty() {
        return EstadoValue::Blank;
    }
    if ACTIVE_VALUES.contains(&key.as_str()) || TRUTHY_VALUES.contains(&key.as_str()) {
        return EstadoValue::Desired(DesiredActive::Activate);
    }
    if INACTIVE_VALUES.contains(&key.as_str()) {
        return EstadoValue::Desired(DesiredActive::Deactivate);
    }
    EstadoValue::Unrecognized
}

/// Persona id from a cell: every non-digit is dropped (`"ID-500"` → 500,
/// `"500.0"` → 500). Zero and empty yield `None`.
pub fn parse_persona_id(value: &str) -> Option<PersonaId> {
    let trimmed = value.trim();
    // Spreadsheet exports render integers as floats.
    let integral = trimmed
        .strip_suffix(".0")
        .filter(|head| !head.is_empty() && head.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(trimmed);
    let digits: String = integral.chars().filter(char::is_ascii_digit).collect();
    match digits.parse::<u64>() {
        Ok(0) | Err(_) => None,
        Ok(id) => Some(PersonaId(id)),
    }
}

/// Split a course cell on `,` / `;`, trimming and dropping empty tokens.
pub fn split_courses(value: &str) -> Vec<String> {
    value
        .split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
