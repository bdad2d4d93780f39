//! End-to-end reconciliation scenarios against the in-memory API.

mod support;

use std::collections::BTreeSet;

use roster_core::{ClassId, Column, DesiredActive, Level, LevelIdMap, PersonaId};
use roster_sync::events::log_lines;
use roster_sync::pipeline::prepare;
use roster_sync::{
    normalize_rows, run, ErrorKind, Event, Phase, RunOptions, SyncError,
};

use support::{primaria, row, Call, FakeApi, PRIMARIA};

fn options(dry_run: bool, remove_missing: bool) -> RunOptions {
    RunOptions {
        colegio_id: 4321,
        dry_run,
        remove_missing,
        level_ids: LevelIdMap::default(),
    }
}

fn personas(ids: &[u64]) -> BTreeSet<PersonaId> {
    ids.iter().copied().map(PersonaId).collect()
}

fn math_catalog() -> FakeApi {
    FakeApi::new()
        .class(1, "Matemática 3PA")
        .class(2, "Matemática 3PB")
}

#[test]
fn scenario_a_two_adds_no_removals() {
    let api = math_catalog();
    let desired = normalize_rows(&[primaria(row(2, "500", "Matemática"))]);
    let mut events: Vec<Event> = Vec::new();

    let (result, plan) = prepare(&api, &desired, &options(false, false), &mut events).unwrap();

    assert_eq!(plan.staff_to_add.get(&ClassId(1)), Some(&personas(&[500])));
    assert_eq!(plan.staff_to_add.get(&ClassId(2)), Some(&personas(&[500])));
    assert!(plan.staff_to_remove.is_empty());
    assert_eq!(result.counters.matched, 2);
    assert_eq!(result.counters.omitted, 0);
    assert_eq!(api.mutations(), 0, "planning never writes");
}

#[test]
fn scenario_b_existing_assignment_is_omitted() {
    let api = math_catalog().staff(1, &[500]);
    let desired = normalize_rows(&[primaria(row(2, "500", "Matemática"))]);
    let mut events: Vec<Event> = Vec::new();

    let (result, plan) = prepare(&api, &desired, &options(false, false), &mut events).unwrap();

    assert_eq!(plan.staff_to_add.len(), 1);
    assert_eq!(plan.staff_to_add.get(&ClassId(2)), Some(&personas(&[500])));
    assert_eq!(result.counters.omitted, 1);
    assert!(log_lines(&events)
        .iter()
        .any(|l| l.contains("Matemática 3PA") && l.ends_with("=> ya asignado")));
}

#[test]
fn scenario_c_surplus_staff_removed_from_matched_class_only() {
    let api = math_catalog()
        .class(3, "Arte 3PA")
        .staff(1, &[999])
        .staff(3, &[777]);
    let desired = normalize_rows(&[primaria(row(2, "500", "Matemática"))]);
    let mut events: Vec<Event> = Vec::new();

    let result = run(&api, &desired, &options(false, true), &mut events).unwrap();

    assert_eq!(result.counters.removed, 1);
    assert!(api.calls().contains(&Call::RemoveStaff(ClassId(1), PersonaId(999))));
    assert_eq!(api.roster(1), personas(&[500]));
    assert_eq!(api.roster(3), personas(&[777]), "unmatched class untouched");
    assert_eq!(api.count(|c| *c == Call::ClassStaff(ClassId(3))), 0);
}

#[test]
fn removal_disabled_keeps_surplus() {
    let api = math_catalog().staff(1, &[999]);
    let desired = normalize_rows(&[primaria(row(2, "500", "Matemática"))]);
    let result = run(&api, &desired, &options(false, false), &mut Vec::<Event>::new()).unwrap();
    assert_eq!(result.counters.removed, 0);
    assert!(api.roster(1).contains(&PersonaId(999)));
}

#[test]
fn scenario_d_estado_change_then_converged() {
    let api = math_catalog().level(PRIMARIA, &[(500, true)]);
    let desired = normalize_rows(&[primaria(row(2, "500", "Matemática"))
        .with(Column::Estado, "Inactivo")]);

    let (_, plan) = prepare(&api, &desired, &options(false, false), &mut Vec::<Event>::new()).unwrap();
    assert_eq!(plan.estado_changes.len(), 1);
    let change = &plan.estado_changes[0];
    assert_eq!(change.persona_id, PersonaId(500));
    assert_eq!(change.level_id, PRIMARIA);
    assert_eq!(change.desired, DesiredActive::Deactivate);
    assert_eq!(change.observed, Some(true));
    assert!(plan.niveles_to_assign.is_empty(), "persona already holds Primaria");

    let result = run(&api, &desired, &options(false, false), &mut Vec::<Event>::new()).unwrap();
    assert_eq!(result.counters.deactivated, 1);
    assert_eq!(api.active(PRIMARIA, 500), Some(false));

    let (_, again) = prepare(&api, &desired, &options(false, false), &mut Vec::<Event>::new()).unwrap();
    assert!(again.estado_changes.is_empty());
}

#[test]
fn unknown_activation_state_always_emits() {
    let api = math_catalog();
    let desired = normalize_rows(&[primaria(row(2, "500", "Matemática"))
        .with(Column::Estado, "Activo")]);
    let (_, plan) = prepare(&api, &desired, &options(false, false), &mut Vec::<Event>::new()).unwrap();
    assert_eq!(plan.estado_changes.len(), 1);
    assert_eq!(plan.estado_changes[0].observed, None);
    assert_eq!(
        plan.niveles_to_assign.get(&PersonaId(500)),
        Some(&[PRIMARIA].into_iter().collect())
    );
}

#[test]
fn levels_are_granted_before_estado_and_classes() {
    let api = math_catalog();
    let desired = normalize_rows(&[primaria(row(2, "500", "Matemática"))
        .with(Column::Estado, "SI")]);
    run(&api, &desired, &options(false, false), &mut Vec::<Event>::new()).unwrap();

    let mutations: Vec<Call> = api.calls().into_iter().filter(Call::is_mutation).collect();
    assert!(matches!(mutations[0], Call::AssignLevels(..)));
    assert!(matches!(mutations[1], Call::SetActive(_, _, true)));
    assert!(matches!(mutations[2], Call::AddStaff(..)));
    assert!(matches!(mutations[3], Call::AddStaff(..)));
    assert_eq!(mutations.len(), 4);
}

#[test]
fn catalog_failure_is_fatal() {
    let mut api = math_catalog();
    api.fail_catalog = true;
    let desired = normalize_rows(&[primaria(row(2, "500", "Matemática"))]);
    let err = run(&api, &desired, &options(false, false), &mut Vec::<Event>::new()).unwrap_err();
    assert!(matches!(err, SyncError::Catalog(_)));
    assert_eq!(api.calls(), vec![Call::ListClasses]);
}

#[test]
fn failed_add_is_recorded_and_batch_continues() {
    let mut api = math_catalog();
    api.failing_adds.insert((ClassId(1), PersonaId(500)));
    let desired = normalize_rows(&[primaria(row(2, "500", "Matemática"))]);
    let mut events: Vec<Event> = Vec::new();

    let result = run(&api, &desired, &options(false, false), &mut events).unwrap();

    assert_eq!(result.counters.added, 1);
    assert_eq!(result.counters.errors, 1);
    let error = &result.errors[0];
    assert_eq!(error.kind, ErrorKind::AsignarProfesor);
    assert_eq!(error.class_id, Some(ClassId(1)));
    assert_eq!(error.persona_id, Some(PersonaId(500)));
    assert_eq!(error.message, "Clase cerrada");
    assert!(api.roster(2).contains(&PersonaId(500)));
    assert!(log_lines(&events).iter().any(|l| l.ends_with("=> error: Clase cerrada")));
}

#[test]
fn staff_read_failure_recorded_once_and_class_skipped() {
    let mut api = math_catalog();
    api.failing_staff_reads.insert(ClassId(1));
    let desired = normalize_rows(&[
        primaria(row(2, "500", "Matemática")),
        primaria(row(3, "501", "Matemática")),
    ]);

    let result = run(&api, &desired, &options(false, true), &mut Vec::<Event>::new()).unwrap();

    let staff_errors: Vec<_> = result
        .errors
        .iter()
        .filter(|e| e.kind == ErrorKind::ListarStaff)
        .collect();
    assert_eq!(staff_errors.len(), 1);
    assert_eq!(staff_errors[0].class_id, Some(ClassId(1)));
    assert_eq!(api.count(|c| *c == Call::ClassStaff(ClassId(1))), 1);
    assert_eq!(api.count(|c| matches!(c, Call::AddStaff(ClassId(1), _))), 0);
    assert_eq!(result.counters.added, 2, "both personas added to 3PB");
}

#[test]
fn level_read_failure_recorded_once_and_treated_as_unknown() {
    let mut api = math_catalog();
    api.failing_level_reads.insert(PRIMARIA);
    let desired = normalize_rows(&[primaria(row(2, "500", "Matemática"))
        .with(Column::Estado, "Activo")]);

    let (result, plan) = prepare(&api, &desired, &options(false, false), &mut Vec::<Event>::new()).unwrap();

    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, ErrorKind::ListarNivel);
    assert_eq!(result.errors[0].level_id, Some(PRIMARIA));
    assert!(plan.niveles_to_assign.contains_key(&PersonaId(500)));
    assert_eq!(plan.estado_changes.len(), 1);
}

#[test]
fn unmatched_and_levelless_rows_are_counted_not_errors() {
    let api = math_catalog();
    let desired = normalize_rows(&[
        primaria(row(2, "500", "Historia")),
        row(3, "501", "Matemática"),
        row(4, "", "Matemática"),
    ]);

    let mut events: Vec<Event> = Vec::new();
    let result = run(&api, &desired, &options(true, false), &mut events).unwrap();

    assert_eq!(result.counters.processed, 2);
    assert_eq!(result.counters.unmatched, 1);
    assert_eq!(result.counters.skipped, 1);
    assert_eq!(result.counters.invalid, 1);
    assert_eq!(result.counters.errors, 0);
    let lines = log_lines(&events);
    assert!(lines.contains(&"  - Sin clases que coincidan."));
    assert!(lines.contains(&"  - Sin niveles/grados marcados. Se omite."));
}

#[test]
fn ignored_catalog_names_are_counted_and_named() {
    let api = math_catalog().class(9, "Tutoría General");
    let desired = normalize_rows(&[primaria(row(2, "500", "Matemática"))]);
    let result = run(&api, &desired, &options(true, false), &mut Vec::<Event>::new()).unwrap();
    assert_eq!(result.counters.ignored_classes, 1);
    assert!(result
        .warnings
        .iter()
        .any(|w| w.contains("9 'Tutoría General'")));
}

#[test]
fn progress_reported_after_each_action() {
    let api = math_catalog();
    let desired = normalize_rows(&[primaria(row(2, "500", "Matemática"))]);
    let mut events: Vec<Event> = Vec::new();
    run(&api, &desired, &options(true, false), &mut events).unwrap();

    let assign_progress: Vec<(usize, usize)> = events
        .iter()
        .filter_map(|e| match e {
            Event::Progress {
                phase: Phase::Assign,
                current,
                total,
                ..
            } => Some((*current, *total)),
            _ => None,
        })
        .collect();
    assert_eq!(assign_progress, vec![(1, 2), (2, 2)]);
    let reports = events
        .iter()
        .filter(|e| matches!(e, Event::Action(r) if r.dry_run && r.error.is_none()))
        .count();
    assert_eq!(reports, 3, "one level assignment and two additions");
}

#[test]
fn empty_input_warns() {
    let api = math_catalog();
    let desired = normalize_rows(&[]);
    let result = run(&api, &desired, &options(true, false), &mut Vec::<Event>::new()).unwrap();
    assert!(result
        .warnings
        .iter()
        .any(|w| w == "No se encontraron docentes validos en el Excel."));
    assert!(result.finished_at.is_some());
}

#[test]
fn sections_never_widen_flagged_grades() {
    let api = FakeApi::new()
        .class(1, "Arte 3PA")
        .class(2, "Arte 4PA")
        .class(3, "Arte 1SA");
    let desired = normalize_rows(&[row(2, "500", "Arte")
        .with(Column::GradeFlag(Level::Primaria, 3), "SI")
        .with(Column::Sections, "3PA, 4PA, 1SA")]);
    let mut events: Vec<Event> = Vec::new();

    let (result, plan) = prepare(&api, &desired, &options(true, false), &mut events).unwrap();

    assert_eq!(plan.staff_to_add.keys().copied().collect::<Vec<_>>(), vec![ClassId(1)]);
    assert_eq!(
        plan.niveles_to_assign.get(&PersonaId(500)),
        Some(&[PRIMARIA].into_iter().collect())
    );
    assert_eq!(result.counters.matched, 1);
    assert!(result.warnings.iter().any(|w| w.contains("4PA, 1SA")));
}
