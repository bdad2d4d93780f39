//! Domain types shared by the reconciliation engine.
//!
//! Remote identifiers are newtypes so that a class id can never be passed
//! where a persona id is expected. Everything here is created fresh per run;
//! nothing in this module touches the filesystem or the network.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Remote identifier of a person (teacher).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonaId(pub u64);

impl fmt::Display for PersonaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for PersonaId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Remote identifier of a class (`geClaseId`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(pub u64);

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for ClassId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Remote identifier of a level (`nivelId`), e.g. `39` for Primaria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelId(pub u64);

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for LevelId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// School level. Each level has its own grade range and activation roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    Inicial,
    Primaria,
    Secundaria,
}

impl Level {
    pub fn all() -> &'static [Level] {
        &[Level::Inicial, Level::Primaria, Level::Secundaria]
    }

    /// Single-letter code used in class names and grade columns.
    pub fn letter(self) -> char {
        match self {
            Level::Inicial => 'I',
            Level::Primaria => 'P',
            Level::Secundaria => 'S',
        }
    }

    /// Case-insensitive inverse of [`Level::letter`].
    pub fn from_letter(c: char) -> Option<Level> {
        match c.to_ascii_uppercase() {
            'I' => Some(Level::Inicial),
            'P' => Some(Level::Primaria),
            'S' => Some(Level::Secundaria),
            _ => None,
        }
    }

    /// Valid grades for this level.
    pub fn grades(self) -> RangeInclusive<u8> {
        match self {
            Level::Inicial => 1..=5,
            Level::Primaria => 1..=6,
            Level::Secundaria => 1..=5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Level::Inicial => "Inicial",
            Level::Primaria => "Primaria",
            Level::Secundaria => "Secundaria",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Grades desired within one level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GradeSelection {
    /// Every grade of the level (level-general column was marked).
    Wildcard,
    /// Only these grades (grade columns or sections were given).
    Grades(BTreeSet<u8>),
}

impl GradeSelection {
    pub fn contains(&self, grade: u8) -> bool {
        match self {
            GradeSelection::Wildcard => true,
            GradeSelection::Grades(grades) => grades.contains(&grade),
        }
    }

    /// Concrete grade list, expanding a wildcard to the level's range.
    pub fn expand(&self, level: Level) -> BTreeSet<u8> {
        match self {
            GradeSelection::Wildcard => level.grades().collect(),
            GradeSelection::Grades(grades) => grades.clone(),
        }
    }
}

/// Desired activation state from the Estado column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredActive {
    Activate,
    Deactivate,
}

impl DesiredActive {
    pub fn as_bool(self) -> bool {
        matches!(self, DesiredActive::Activate)
    }
}

impl fmt::Display for DesiredActive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DesiredActive::Activate => write!(f, "activo"),
            DesiredActive::Deactivate => write!(f, "inactivo"),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// An exact `(level, grade, section)` triple, e.g. Primaria 3 A.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SectionKey {
    pub level: Level,
    pub grade: u8,
    pub section: char,
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.grade, self.level.letter(), self.section)
    }
}

/// One desired (persona, course) pair produced from a spreadsheet row.
///
/// A row with several course tokens yields several assignments that share
/// every field except `course_name` / `course_norm`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DesiredAssignment {
    pub persona_id: PersonaId,
    /// Course text as written in the sheet.
    pub course_name: String,
    /// Normalized course text compared against class base names.
    pub course_norm: String,
    pub desired_by_level: BTreeMap<Level, GradeSelection>,
    /// Empty means no section restriction.
    pub section_filter: BTreeSet<SectionKey>,
    pub desired_active: Option<DesiredActive>,
    /// Display name assembled from the name columns, if any.
    pub display_name: String,
    /// Spreadsheet row number (header = 1).
    pub source_row: usize,
}

impl DesiredAssignment {
    /// True when at least one level carries an explicit grade set.
    pub fn is_grade_specific(&self) -> bool {
        self.desired_by_level
            .values()
            .any(|sel| matches!(sel, GradeSelection::Grades(_)))
    }

    /// Levels named by this assignment, in level order.
    pub fn levels(&self) -> impl Iterator<Item = Level> + '_ {
        self.desired_by_level.keys().copied()
    }

    /// Compact description such as `P:* S:1,2` with sections appended.
    pub fn level_description(&self) -> String {
        if self.desired_by_level.is_empty() {
            return "sin niveles".to_string();
        }
        let mut parts: Vec<String> = self
            .desired_by_level
            .iter()
            .map(|(level, sel)| match sel {
                GradeSelection::Wildcard => format!("{}:*", level.letter()),
                GradeSelection::Grades(grades) => {
                    let list: Vec<String> = grades.iter().map(u8::to_string).collect();
                    format!("{}:{}", level.letter(), list.join(","))
                }
            })
            .collect();
        if !self.section_filter.is_empty() {
            let sections: Vec<String> =
                self.section_filter.iter().map(SectionKey::to_string).collect();
            parts.push(format!("[{}]", sections.join(",")));
        }
        parts.join(" ")
    }
}

/// A catalog class whose name carries a parseable `<grade><level><section>` suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassDescriptor {
    pub id: ClassId,
    pub display_name: String,
    /// Display name without the trailing suffix token.
    pub base_name: String,
    /// Normalized `base_name`, the key the matcher compares.
    pub base_norm: String,
    pub level: Level,
    pub grade: u8,
    pub section: char,
}

impl ClassDescriptor {
    pub fn section_key(&self) -> SectionKey {
        SectionKey {
            level: self.level,
            grade: self.grade,
            section: self.section,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
