//! Shared reconciliation entrypoint used by the CLI.

use std::collections::{BTreeMap, BTreeSet};

use roster_api::SchoolApi;
use roster_core::{Level, LevelIdMap, PersonaId};

use crate::catalog::Catalog;
use crate::context::ReconciliationContext;
use crate::desired::DesiredState;
use crate::error::SyncError;
use crate::events::{log, EventSink};
use crate::executor::execute;
use crate::matcher::match_classes;
use crate::plan::{reconcile, PlanOptions, ReconciliationPlan};
use crate::result::ExecutionResult;

/// Parameters of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub colegio_id: u64,
    pub dry_run: bool,
    pub remove_missing: bool,
    pub level_ids: LevelIdMap,
}

/// Run a full reconciliation: catalog → match → plan → execute.
///
/// Only a catalog failure is returned as `Err`; every other failure is
/// recorded in the returned [`ExecutionResult`].
pub fn run<A: SchoolApi + ?Sized>(
    api: &A,
    desired: &DesiredState,
    options: &RunOptions,
    sink: &mut dyn EventSink,
) -> Result<ExecutionResult, SyncError> {
    let (mut result, plan) = prepare(api, desired, options, sink)?;
    execute(api, &plan, options.dry_run, &mut result, sink);
    if result.counters.processed == 0 {
        result.warn("No se encontraron docentes validos en el Excel.");
    }
    result.finish();
    Ok(result)
}

/// Read phase only: fetch the catalog, read rosters and build the plan.
pub fn prepare<A: SchoolApi + ?Sized>(
    api: &A,
    desired: &DesiredState,
    options: &RunOptions,
    sink: &mut dyn EventSink,
) -> Result<(ExecutionResult, ReconciliationPlan), SyncError> {
    let mut result = ExecutionResult::new(options.colegio_id, options.dry_run);
    result.counters.invalid = desired.invalid;
    result.warnings.extend(desired.warnings.iter().cloned());

    let catalog = Catalog::fetch(api)?;
    narrate_catalog(&catalog, &mut result, sink);
    narrate_match_groups(desired, &catalog, sink);

    let mut ctx = ReconciliationContext::new(api);
    let plan_options = PlanOptions {
        remove_missing: options.remove_missing,
        level_ids: options.level_ids.clone(),
    };
    let plan = reconcile(desired, &catalog, &mut ctx, &plan_options, &mut result, sink);
    tracing::debug!(
        "reads: {} class rosters, {} level rosters",
        ctx.staff_fetches(),
        ctx.level_fetches()
    );
    Ok((result, plan))
}

fn narrate_catalog(catalog: &Catalog, result: &mut ExecutionResult, sink: &mut dyn EventSink) {
    log(sink, "Cursos disponibles (id, nombre):");
    for class in &catalog.classes {
        log(sink, format!("{}\t{}", class.id, class.display_name));
    }
    result.counters.ignored_classes = catalog.ignored.len();
    if !catalog.ignored.is_empty() {
        let names: Vec<String> = catalog
            .ignored
            .iter()
            .map(|c| format!("{} '{}'", c.id, c.name))
            .collect();
        result.warn(format!(
            "Clases ignoradas por sufijo no reconocido: {} ({}).",
            catalog.ignored.len(),
            names.join(", ")
        ));
    }
}

/// `course level+grade => [personas]`, grouped before sections.
fn narrate_match_groups(desired: &DesiredState, catalog: &Catalog, sink: &mut dyn EventSink) {
    let mut groups: BTreeMap<(String, Level, u8), (String, BTreeSet<PersonaId>)> = BTreeMap::new();
    for assignment in &desired.assignments {
        for class in match_classes(assignment, catalog) {
            let key = (assignment.course_norm.clone(), class.level, class.grade);
            groups
                .entry(key)
                .or_insert_with(|| (assignment.course_name.clone(), BTreeSet::new()))
                .1
                .insert(assignment.persona_id);
        }
    }
    if groups.is_empty() {
        return;
    }
    log(sink, "");
    log(sink, "Match por curso/grado (sin seccion):");
    for ((_, level, grade), (course, personas)) in &groups {
        let ids: Vec<String> = personas.iter().map(PersonaId::to_string).collect();
        log(
            sink,
            format!("{course} {}{grade} => [{}]", level.letter(), ids.join(", ")),
        );
    }
}
