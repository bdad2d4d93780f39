//! Reconciler: desired state + observed rosters → [`ReconciliationPlan`].
//!
//! Planning performs every read of the run and no writes. Phases run in a
//! fixed order so that the removal phase sees the complete desired
//! footprint, including classes that only gain staff in this run:
//!
//! 1. level sync (one `assign niveles` per persona, if any desired level is
//!    missing from the observed rosters)
//! 2. estado sync (one change per `(persona, level)` whose observed flag
//!    differs from the desired one or is unknown)
//! 3. class assignment (add when neither on the roster nor already queued)
//! 4. removal, when enabled (surplus staff of classes matched this run)

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use roster_api::{ApiError, SchoolApi};
use roster_core::{ClassId, DesiredActive, Level, LevelId, LevelIdMap, PersonaId};

use crate::catalog::Catalog;
use crate::context::{LevelRoster, ReconciliationContext, StaffRoster};
use crate::desired::{DesiredState, PersonaTarget};
use crate::events::{log, Event, EventSink, Phase};
use crate::matcher::match_classes;
use crate::result::{ActionError, ErrorKind, ExecutionResult};

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// One mutating remote call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    AssignLevels {
        persona_id: PersonaId,
        level_ids: BTreeSet<LevelId>,
    },
    SetActive {
        persona_id: PersonaId,
        level: Level,
        level_id: LevelId,
        desired: DesiredActive,
        /// `None` when the level roster was unavailable or did not list
        /// the persona.
        observed: Option<bool>,
    },
    AddStaff {
        class_id: ClassId,
        class_name: String,
        persona_id: PersonaId,
    },
    RemoveStaff {
        class_id: ClassId,
        class_name: String,
        persona_id: PersonaId,
    },
}

impl Action {
    pub fn phase(&self) -> Phase {
        match self {
            Action::AssignLevels { .. } => Phase::Levels,
            Action::SetActive { .. } => Phase::Estado,
            Action::AddStaff { .. } => Phase::Assign,
            Action::RemoveStaff { .. } => Phase::Remove,
        }
    }

    pub fn error_kind(&self) -> ErrorKind {
        match self {
            Action::AssignLevels { .. } => ErrorKind::AsignarNivel,
            Action::SetActive { .. } => ErrorKind::ActivarInactivar,
            Action::AddStaff { .. } => ErrorKind::AsignarProfesor,
            Action::RemoveStaff { .. } => ErrorKind::EliminarProfesor,
        }
    }

    pub fn persona_id(&self) -> PersonaId {
        match self {
            Action::AssignLevels { persona_id, .. }
            | Action::SetActive { persona_id, .. }
            | Action::AddStaff { persona_id, .. }
            | Action::RemoveStaff { persona_id, .. } => *persona_id,
        }
    }

    /// Error record for a failed attempt at this action.
    pub fn failure(&self, error: &ApiError) -> ActionError {
        let (class_id, level_id) = match self {
            Action::AssignLevels { .. } => (None, None),
            Action::SetActive { level_id, .. } => (None, Some(*level_id)),
            Action::AddStaff { class_id, .. } | Action::RemoveStaff { class_id, .. } => {
                (Some(*class_id), None)
            }
        };
        ActionError {
            kind: self.error_kind(),
            persona_id: Some(self.persona_id()),
            class_id,
            level_id,
            message: error.to_string(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::AssignLevels {
                persona_id,
                level_ids,
            } => {
                let ids: Vec<String> = level_ids.iter().map(LevelId::to_string).collect();
                write!(f, "asignar niveles [{}] a personaId={persona_id}", ids.join(", "))
            }
            Action::SetActive {
                persona_id,
                level,
                level_id,
                desired,
                observed,
            } => {
                let observed = match observed {
                    Some(true) => "activo",
                    Some(false) => "inactivo",
                    None => "desconocido",
                };
                write!(
                    f,
                    "personaId={persona_id} {level} ({level_id}): {observed} -> {desired}"
                )
            }
            Action::AddStaff {
                class_id,
                class_name,
                persona_id,
            } => write!(f, "asignar personaId={persona_id} a {class_id}\t{class_name}"),
            Action::RemoveStaff {
                class_id,
                class_name,
                persona_id,
            } => write!(f, "eliminar personaId={persona_id} de {class_id}\t{class_name}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// Desired-vs-observed estado difference for one `(persona, level)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EstadoChange {
    pub persona_id: PersonaId,
    pub level: Level,
    pub level_id: LevelId,
    pub desired: DesiredActive,
    pub observed: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationPlan {
    pub niveles_to_assign: BTreeMap<PersonaId, BTreeSet<LevelId>>,
    pub estado_changes: Vec<EstadoChange>,
    pub staff_to_add: BTreeMap<ClassId, BTreeSet<PersonaId>>,
    /// Only classes that matched at least one desired assignment.
    pub staff_to_remove: BTreeMap<ClassId, BTreeSet<PersonaId>>,
    /// Display names of every matched class.
    pub class_names: BTreeMap<ClassId, String>,
}

impl ReconciliationPlan {
    /// Every action in execution order.
    pub fn actions(&self) -> Vec<Action> {
        let mut actions = Vec::with_capacity(self.len());
        for (persona_id, level_ids) in &self.niveles_to_assign {
            actions.push(Action::AssignLevels {
                persona_id: *persona_id,
                level_ids: level_ids.clone(),
            });
        }
        for change in &self.estado_changes {
            actions.push(Action::SetActive {
                persona_id: change.persona_id,
                level: change.level,
                level_id: change.level_id,
                desired: change.desired,
                observed: change.observed,
            });
        }
        for (class_id, personas) in &self.staff_to_add {
            for persona_id in personas {
                actions.push(Action::AddStaff {
                    class_id: *class_id,
                    class_name: self.class_name(*class_id),
                    persona_id: *persona_id,
                });
            }
        }
        for (class_id, personas) in &self.staff_to_remove {
            for persona_id in personas {
                actions.push(Action::RemoveStaff {
                    class_id: *class_id,
                    class_name: self.class_name(*class_id),
                    persona_id: *persona_id,
                });
            }
        }
        actions
    }

    pub fn len(&self) -> usize {
        self.niveles_to_assign.len()
            + self.estado_changes.len()
            + self.staff_to_add.values().map(BTreeSet::len).sum::<usize>()
            + self.staff_to_remove.values().map(BTreeSet::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn class_name(&self, class_id: ClassId) -> String {
        self.class_names.get(&class_id).cloned().unwrap_or_default()
    }
}

/// Caller-controlled reconciliation switches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanOptions {
    /// Queue removals of staff not desired on matched classes.
    pub remove_missing: bool,
    pub level_ids: LevelIdMap,
}

/// Build the plan for `desired` against `catalog`, reading rosters through
/// `ctx`. Counters, warnings and read failures are recorded in `result`.
pub fn reconcile<A: SchoolApi + ?Sized>(
    desired: &DesiredState,
    catalog: &Catalog,
    ctx: &mut ReconciliationContext<'_, A>,
    options: &PlanOptions,
    result: &mut ExecutionResult,
    sink: &mut dyn EventSink,
) -> ReconciliationPlan {
    let mut plan = ReconciliationPlan::default();
    let targets = desired.persona_targets();

    plan_levels(&targets, ctx, options, &mut plan, result, sink);
    plan_estado(&targets, ctx, options, &mut plan, result, sink);
    let desired_by_class = plan_assignments(desired, catalog, ctx, &mut plan, result, sink);
    if options.remove_missing {
        plan_removals(&desired_by_class, ctx, &mut plan, result, sink);
    }
    tracing::debug!("plan: {} actions", plan.len());
    plan
}

fn plan_levels<A: SchoolApi + ?Sized>(
    targets: &BTreeMap<PersonaId, PersonaTarget>,
    ctx: &mut ReconciliationContext<'_, A>,
    options: &PlanOptions,
    plan: &mut ReconciliationPlan,
    result: &mut ExecutionResult,
    sink: &mut dyn EventSink,
) {
    for (persona, target) in targets {
        if target.levels.is_empty() {
            continue;
        }
        let wanted: BTreeSet<LevelId> = target
            .levels
            .iter()
            .map(|level| options.level_ids.id(*level))
            .collect();
        let mut missing = false;
        for level_id in &wanted {
            let present = level_roster(ctx, *level_id, result, sink)
                .is_some_and(|roster| roster.contains_key(persona));
            missing |= !present;
        }
        if missing {
            plan.niveles_to_assign.insert(*persona, wanted);
        } else {
            tracing::debug!("persona {persona} already holds levels {wanted:?}");
        }
    }
}

fn plan_estado<A: SchoolApi + ?Sized>(
    targets: &BTreeMap<PersonaId, PersonaTarget>,
    ctx: &mut ReconciliationContext<'_, A>,
    options: &PlanOptions,
    plan: &mut ReconciliationPlan,
    result: &mut ExecutionResult,
    sink: &mut dyn EventSink,
) {
    for (persona, target) in targets {
        let Some(desired) = target.active else {
            continue;
        };
        if target.levels.is_empty() {
            result.warn(format!(
                "personaId {persona}: Estado '{desired}' sin niveles marcados; se omite."
            ));
            continue;
        }
        for level in &target.levels {
            let level_id = options.level_ids.id(*level);
            let observed = level_roster(ctx, level_id, result, sink)
                .and_then(|roster| roster.get(persona).copied());
            if observed == Some(desired.as_bool()) {
                continue;
            }
            plan.estado_changes.push(EstadoChange {
                persona_id: *persona,
                level: *level,
                level_id,
                desired,
                observed,
            });
        }
    }
}

/// Match every assignment and queue additions. Returns the desired
/// personas of every matched class.
fn plan_assignments<A: SchoolApi + ?Sized>(
    desired: &DesiredState,
    catalog: &Catalog,
    ctx: &mut ReconciliationContext<'_, A>,
    plan: &mut ReconciliationPlan,
    result: &mut ExecutionResult,
    sink: &mut dyn EventSink,
) -> BTreeMap<ClassId, BTreeSet<PersonaId>> {
    let mut desired_by_class: BTreeMap<ClassId, BTreeSet<PersonaId>> = BTreeMap::new();
    let total = desired.assignments.len();

    for (index, assignment) in desired.assignments.iter().enumerate() {
        let persona = assignment.persona_id;
        result.counters.processed += 1;
        log(sink, "");
        log(
            sink,
            format!(
                "Docente personaId={persona} curso='{}' niveles={} (fila {})",
                assignment.course_name,
                assignment.level_description(),
                assignment.source_row
            ),
        );
        let label = format!("{persona} {}", assignment.course_name);

        if assignment.desired_by_level.is_empty() {
            result.counters.skipped += 1;
            log(sink, "  - Sin niveles/grados marcados. Se omite.");
            match_progress(sink, index + 1, total, &label);
            continue;
        }
        let matches = match_classes(assignment, catalog);
        if matches.is_empty() {
            result.counters.unmatched += 1;
            log(sink, "  - Sin clases que coincidan.");
            match_progress(sink, index + 1, total, &label);
            continue;
        }
        result.counters.matched += matches.len();

        for class in &matches {
            desired_by_class.entry(class.id).or_default().insert(persona);
            plan.class_names
                .entry(class.id)
                .or_insert_with(|| class.display_name.clone());
        }

        for class in matches {
            let info = format!(
                "{}\t{} (nivel={} grado={} seccion={})",
                class.id,
                class.display_name,
                class.level.letter(),
                class.grade,
                class.section
            );
            let Some(roster) = staff_roster(ctx, class.id, Some(persona), result, sink) else {
                log(sink, format!("  - match {info} => sin roster; se omite"));
                continue;
            };
            let queued = plan
                .staff_to_add
                .get(&class.id)
                .is_some_and(|personas| personas.contains(&persona));
            if roster.contains(&persona) || queued {
                result.counters.omitted += 1;
                log(sink, format!("  - match {info} => ya asignado"));
                continue;
            }
            plan.staff_to_add.entry(class.id).or_default().insert(persona);
            log(sink, format!("  - match {info} => por asignar"));
        }
        match_progress(sink, index + 1, total, &label);
    }
    desired_by_class
}

fn match_progress(sink: &mut dyn EventSink, current: usize, total: usize, label: &str) {
    sink.emit(Event::Progress {
        phase: Phase::Match,
        current,
        total,
        message: label.to_string(),
    });
}

fn plan_removals<A: SchoolApi + ?Sized>(
    desired_by_class: &BTreeMap<ClassId, BTreeSet<PersonaId>>,
    ctx: &mut ReconciliationContext<'_, A>,
    plan: &mut ReconciliationPlan,
    result: &mut ExecutionResult,
    sink: &mut dyn EventSink,
) {
    log(sink, "");
    log(sink, "Eliminaciones (profesores fuera del Excel):");
    for (class_id, wanted) in desired_by_class {
        let Some(roster) = staff_roster(ctx, *class_id, None, result, sink) else {
            continue;
        };
        let surplus: BTreeSet<PersonaId> = roster.difference(wanted).copied().collect();
        if surplus.is_empty() {
            continue;
        }
        let name = plan.class_name(*class_id);
        for persona in &surplus {
            log(sink, format!("  - {class_id}\t{name} => por eliminar {persona}"));
        }
        plan.staff_to_remove.insert(*class_id, surplus);
    }
}

/// Cached class roster; a failed first fetch is recorded once.
fn staff_roster<'c, A: SchoolApi + ?Sized>(
    ctx: &'c mut ReconciliationContext<'_, A>,
    class_id: ClassId,
    persona: Option<PersonaId>,
    result: &mut ExecutionResult,
    sink: &mut dyn EventSink,
) -> Option<&'c StaffRoster> {
    let lookup = ctx.class_staff(class_id);
    match lookup.value {
        Ok(roster) => Some(roster),
        Err(error) => {
            if lookup.fetched {
                log(sink, format!("  - {class_id} => error staff: {error}"));
                tracing::warn!("listing staff of class {class_id} failed: {error}");
                result.record_error(ActionError {
                    kind: ErrorKind::ListarStaff,
                    persona_id: persona,
                    class_id: Some(class_id),
                    level_id: None,
                    message: error.to_string(),
                });
            }
            None
        }
    }
}

/// Cached level roster; a failed first fetch is recorded once.
fn level_roster<'c, A: SchoolApi + ?Sized>(
    ctx: &'c mut ReconciliationContext<'_, A>,
    level_id: LevelId,
    result: &mut ExecutionResult,
    sink: &mut dyn EventSink,
) -> Option<&'c LevelRoster> {
    let lookup = ctx.level_roster(level_id);
    match lookup.value {
        Ok(roster) => Some(roster),
        Err(error) => {
            if lookup.fetched {
                log(sink, format!("  - nivel {level_id} => error listado: {error}"));
                tracing::warn!("listing roster of level {level_id} failed: {error}");
                result.record_error(ActionError {
                    kind: ErrorKind::ListarNivel,
                    persona_id: None,
                    class_id: None,
                    level_id: Some(level_id),
                    message: error.to_string(),
                });
            }
            None
        }
    }
}
