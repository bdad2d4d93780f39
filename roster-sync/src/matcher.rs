//! Desired assignment → catalog classes.

use roster_core::{ClassDescriptor, DesiredAssignment};

use crate::catalog::Catalog;

/// True when `class` satisfies every filter of `assignment`:
/// exact normalized base name, desired level, desired grade (when
/// grade-specific) and section (when a section filter is present).
pub fn matches(assignment: &DesiredAssignment, class: &ClassDescriptor) -> bool {
    if assignment.course_norm.is_empty() || class.base_norm != assignment.course_norm {
        return false;
    }
    let Some(selection) = assignment.desired_by_level.get(&class.level) else {
        return false;
    };
    if !selection.contains(class.grade) {
        return false;
    }
    assignment.section_filter.is_empty() || assignment.section_filter.contains(&class.section_key())
}

/// Every catalog class matching `assignment`, in catalog order.
pub fn match_classes<'c>(
    assignment: &DesiredAssignment,
    catalog: &'c Catalog,
) -> Vec<&'c ClassDescriptor> {
    catalog
        .classes
        .iter()
        .filter(|class| matches(assignment, class))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use roster_api::RemoteClass;
    use roster_core::{GradeSelection, Level, PersonaId, SectionKey};

    use super::*;

    fn catalog(names: &[&str]) -> Catalog {
        Catalog::resolve(
            names
                .iter()
                .enumerate()
                .map(|(i, n)| RemoteClass {
                    ge_clase_id: i as u64 + 1,
                    ge_clase: Some(n.to_string()),
                    ge_clase_clave: None,
                })
                .collect(),
        )
    }

    fn assignment(course: &str, levels: &[(Level, GradeSelection)]) -> DesiredAssignment {
        DesiredAssignment {
            persona_id: PersonaId(500),
            course_name: course.to_string(),
            course_norm: roster_core::text::normalize_course(course),
            desired_by_level: levels.iter().cloned().collect::<BTreeMap<_, _>>(),
            section_filter: BTreeSet::new(),
            desired_active: None,
            display_name: String::new(),
            source_row: 2,
        }
    }

    fn names<'a>(found: &[&'a ClassDescriptor]) -> Vec<&'a str> {
        found.iter().map(|c| c.display_name.as_str()).collect()
    }

    #[test]
    fn wildcard_matches_every_grade_of_level() {
        let cat = catalog(&["Matemática 3PA", "Matemática 5PB", "Matemática 1SA", "Arte 3PA"]);
        let a = assignment("MATEMATICA", &[(Level::Primaria, GradeSelection::Wildcard)]);
        assert_eq!(names(&match_classes(&a, &cat)), vec!["Matemática 3PA", "Matemática 5PB"]);
    }

    #[test]
    fn base_name_must_match_exactly() {
        let cat = catalog(&["Matemática Avanzada 3PA", "Matemática 3PA"]);
        let a = assignment("Matemática", &[(Level::Primaria, GradeSelection::Wildcard)]);
        assert_eq!(names(&match_classes(&a, &cat)), vec!["Matemática 3PA"]);
    }

    #[test]
    fn grade_specific_filters_grades() {
        let cat = catalog(&["Arte 3PA", "Arte 4PA"]);
        let a = assignment(
            "arte",
            &[(Level::Primaria, GradeSelection::Grades([4].into_iter().collect()))],
        );
        assert_eq!(names(&match_classes(&a, &cat)), vec!["Arte 4PA"]);
    }

    #[test]
    fn section_filter_restricts_to_exact_triples() {
        let cat = catalog(&["Arte 3PA", "Arte 3PB"]);
        let mut a = assignment(
            "Arte",
            &[(Level::Primaria, GradeSelection::Grades([3].into_iter().collect()))],
        );
        a.section_filter.insert(SectionKey {
            level: Level::Primaria,
            grade: 3,
            section: 'B',
        });
        assert_eq!(names(&match_classes(&a, &cat)), vec!["Arte 3PB"]);
    }

    #[test]
    fn no_levels_no_match() {
        let cat = catalog(&["Arte 3PA"]);
        let a = assignment("Arte", &[]);
        assert!(match_classes(&a, &cat).is_empty());
    }

    #[test]
    fn every_match_is_sound() {
        let cat = catalog(&[
            "Arte 1PA", "Arte 2PB", "Arte 1SA", "Arte 5SC", "Arte 2IA", "Música 1PA",
        ]);
        let selections = [
            vec![(Level::Primaria, GradeSelection::Wildcard)],
            vec![(Level::Secundaria, GradeSelection::Grades([5].into_iter().collect()))],
            vec![
                (Level::Inicial, GradeSelection::Wildcard),
                (Level::Primaria, GradeSelection::Grades([2].into_iter().collect())),
            ],
        ];
        for levels in &selections {
            let a = assignment("Arte", levels);
            for class in match_classes(&a, &cat) {
                assert_eq!(class.base_norm, a.course_norm);
                let sel = a.desired_by_level.get(&class.level).expect("level desired");
                assert!(sel.contains(class.grade));
            }
        }
    }
}
