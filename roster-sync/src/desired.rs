//! Desired-state normalizer: canonical spreadsheet rows → [`DesiredAssignment`]s.

use std::collections::{BTreeMap, BTreeSet};

use roster_core::grammar::{parse_section_tokens, SectionToken};
use roster_core::text::{
    is_truthy, normalize_course, parse_estado, parse_persona_id, split_courses, EstadoValue,
};
use roster_core::{
    Column, DesiredActive, DesiredAssignment, GradeSelection, Level, PersonaId, SectionKey,
    SheetRow,
};

/// Output of [`normalize_rows`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredState {
    pub assignments: Vec<DesiredAssignment>,
    /// Row-level problems, in row order.
    pub warnings: Vec<String>,
    /// Rows rejected as invalid.
    pub invalid: usize,
    /// Rows read before the end of the table.
    pub rows_read: usize,
}

/// Per-persona target derived from all of its assignments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonaTarget {
    pub levels: BTreeSet<Level>,
    pub active: Option<DesiredActive>,
}

impl DesiredState {
    /// Union of desired levels and the first specified Estado per persona.
    pub fn persona_targets(&self) -> BTreeMap<PersonaId, PersonaTarget> {
        let mut targets: BTreeMap<PersonaId, PersonaTarget> = BTreeMap::new();
        for assignment in &self.assignments {
            let target = targets.entry(assignment.persona_id).or_default();
            target.levels.extend(assignment.levels());
            if target.active.is_none() {
                target.active = assignment.desired_active;
            }
        }
        targets
    }
}

/// Normalize rows in order. An entirely blank row ends the table.
pub fn normalize_rows(rows: &[SheetRow]) -> DesiredState {
    let mut state = DesiredState::default();
    let mut first_estado: BTreeMap<PersonaId, (DesiredActive, usize)> = BTreeMap::new();

    for row in rows {
        if row.is_blank() {
            tracing::debug!("blank row {} ends the table", row.row_number);
            break;
        }
        state.rows_read += 1;
        let n = row.row_number;

        let persona = parse_persona_id(row.get(Column::PersonaId));
        let courses: Vec<(String, String)> = split_courses(row.get(Column::Course))
            .into_iter()
            .map(|c| {
                let norm = normalize_course(&c);
                (c, norm)
            })
            .filter(|(_, norm)| !norm.is_empty())
            .collect();
        let Some(persona_id) = persona.filter(|_| !courses.is_empty()) else {
            state.warnings.push(format!("Fila {n}: falta personaId o CURSO."));
            state.invalid += 1;
            continue;
        };

        let mut desired_by_level = flagged_levels(row);
        let mut section_filter = BTreeSet::new();
        let sections = row.get(Column::Sections);
        if !sections.is_empty() {
            match resolve_sections(sections, &desired_by_level) {
                Ok((filter, dropped)) => {
                    if !dropped.is_empty() {
                        state.warnings.push(format!(
                            "Fila {n}: secciones fuera de los grados marcados: {}; se ignoran.",
                            dropped.join(", ")
                        ));
                    }
                    if filter.is_empty() {
                        state.warnings.push(format!(
                            "Fila {n}: secciones '{sections}' sin niveles marcados."
                        ));
                        state.invalid += 1;
                        continue;
                    }
                    desired_by_level = levels_from_sections(&filter);
                    section_filter = filter;
                }
                Err(bad) => {
                    state.warnings.push(format!(
                        "Fila {n}: secciones no reconocidas: {}.",
                        bad.join(", ")
                    ));
                    state.invalid += 1;
                    continue;
                }
            }
        }

        let mut desired_active = match parse_estado(row.get(Column::Estado)) {
            EstadoValue::Blank => None,
            EstadoValue::Desired(value) => Some(value),
            EstadoValue::Unrecognized => {
                state.warnings.push(format!(
                    "Fila {n}: Estado '{}' no reconocido; se ignora.",
                    row.get(Column::Estado)
                ));
                None
            }
        };
        if let Some(value) = desired_active {
            match first_estado.get(&persona_id) {
                Some((first, first_row)) if *first != value => {
                    state.warnings.push(format!(
                        "personaId {persona_id}: Estado en conflicto (fila {first_row}: {first}, fila {n}: {value}); se usa {first}."
                    ));
                    desired_active = Some(*first);
                }
                Some(_) => {}
                None => {
                    first_estado.insert(persona_id, (value, n));
                }
            }
        }

        let display_name = display_name(row);
        for (course_name, course_norm) in courses {
            state.assignments.push(DesiredAssignment {
                persona_id,
                course_name,
                course_norm,
                desired_by_level: desired_by_level.clone(),
                section_filter: section_filter.clone(),
                desired_active,
                display_name: display_name.clone(),
                source_row: n,
            });
        }
    }
    state
}

/// Grade columns win over level columns: if any grade flag is set the row is
/// grade-specific, otherwise each checked level desires all its grades.
fn flagged_levels(row: &SheetRow) -> BTreeMap<Level, GradeSelection> {
    let mut grades: BTreeMap<Level, BTreeSet<u8>> = BTreeMap::new();
    for (column, value) in &row.cells {
        if let Column::GradeFlag(level, grade) = column {
            if is_truthy(value) {
                grades.entry(*level).or_default().insert(*grade);
            }
        }
    }
    if !grades.is_empty() {
        return grades
            .into_iter()
            .map(|(level, set)| (level, GradeSelection::Grades(set)))
            .collect();
    }
    Level::all()
        .iter()
        .filter(|level| is_truthy(row.get(Column::LevelFlag(**level))))
        .map(|level| (*level, GradeSelection::Wildcard))
        .collect()
}

/// A bare letter applies to every desired `(level, grade)`. Exact triples
/// narrow a flagged row and are dropped (returned second) when outside its
/// flags; on a row with no flags they define the levels on their own.
fn resolve_sections(
    value: &str,
    desired: &BTreeMap<Level, GradeSelection>,
) -> Result<(BTreeSet<SectionKey>, Vec<String>), Vec<String>> {
    let tokens = parse_section_tokens(value)?;
    let mut filter = BTreeSet::new();
    let mut dropped = Vec::new();
    for token in tokens {
        match token {
            SectionToken::Exact(key) => {
                let flagged = desired.is_empty()
                    || desired
                        .get(&key.level)
                        .is_some_and(|selection| selection.contains(key.grade));
                if flagged {
                    filter.insert(key);
                } else {
                    dropped.push(key.to_string());
                }
            }
            SectionToken::Letter(section) => {
                for (level, selection) in desired {
                    for grade in selection.expand(*level) {
                        filter.insert(SectionKey {
                            level: *level,
                            grade,
                            section,
                        });
                    }
                }
            }
        }
    }
    Ok((filter, dropped))
}

fn levels_from_sections(filter: &BTreeSet<SectionKey>) -> BTreeMap<Level, GradeSelection> {
    let mut grades: BTreeMap<Level, BTreeSet<u8>> = BTreeMap::new();
    for key in filter {
        grades.entry(key.level).or_default().insert(key.grade);
    }
    grades
        .into_iter()
        .map(|(level, set)| (level, GradeSelection::Grades(set)))
        .collect()
}

fn display_name(row: &SheetRow) -> String {
    [Column::Nombre, Column::ApellidoPaterno, Column::ApellidoMaterno]
        .into_iter()
        .map(|c| row.get(c))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
