//! Executor: applies a [`ReconciliationPlan`] phase by phase.
//!
//! Every action is independent. A failed call is recorded as an
//! [`ActionError`](crate::ActionError) and the batch continues. In dry-run
//! mode no remote call is made and each action counts as applied.

use roster_api::{ApiError, SchoolApi};
use roster_core::DesiredActive;

use crate::events::{log, ActionReport, Event, EventSink, Phase};
use crate::plan::{Action, ReconciliationPlan};
use crate::result::ExecutionResult;

const PHASES: [(Phase, &str); 4] = [
    (Phase::Levels, "Niveles:"),
    (Phase::Estado, "Estado:"),
    (Phase::Assign, "Asignaciones:"),
    (Phase::Remove, "Eliminaciones:"),
];

pub fn execute<A: SchoolApi + ?Sized>(
    api: &A,
    plan: &ReconciliationPlan,
    dry_run: bool,
    result: &mut ExecutionResult,
    sink: &mut dyn EventSink,
) {
    let actions = plan.actions();
    for (phase, heading) in PHASES {
        let batch: Vec<&Action> = actions.iter().filter(|a| a.phase() == phase).collect();
        if batch.is_empty() {
            continue;
        }
        log(sink, "");
        log(sink, heading);
        let total = batch.len();
        for (index, action) in batch.into_iter().enumerate() {
            let outcome = if dry_run { Ok(()) } else { apply(api, action) };
            match &outcome {
                Ok(()) => {
                    count(result, action);
                    if dry_run {
                        tracing::info!("[dry-run] {action}");
                        log(sink, format!("  - {action} => ok (dry-run)"));
                    } else {
                        tracing::info!("{action}");
                        log(sink, format!("  - {action} => ok"));
                    }
                }
                Err(error) => {
                    tracing::warn!("{action} failed: {error}");
                    result.record_error(action.failure(error));
                    log(sink, format!("  - {action} => error: {error}"));
                }
            }
            sink.emit(Event::Action(ActionReport {
                action: action.clone(),
                dry_run,
                error: outcome.err().map(|e| e.to_string()),
            }));
            sink.emit(Event::Progress {
                phase,
                current: index + 1,
                total,
                message: action.to_string(),
            });
        }
    }
}

fn apply<A: SchoolApi + ?Sized>(api: &A, action: &Action) -> Result<(), ApiError> {
    match action {
        Action::AssignLevels {
            persona_id,
            level_ids,
        } => api.assign_levels(*persona_id, level_ids),
        Action::SetActive {
            persona_id,
            level_id,
            desired,
            ..
        } => api.set_level_active(*persona_id, *level_id, desired.as_bool()),
        Action::AddStaff {
            class_id,
            persona_id,
            ..
        } => api.add_class_staff(*class_id, *persona_id),
        Action::RemoveStaff {
            class_id,
            persona_id,
            ..
        } => api.remove_class_staff(*class_id, *persona_id),
    }
}

fn count(result: &mut ExecutionResult, action: &Action) {
    let counters = &mut result.counters;
    match action {
        Action::AssignLevels { .. } => counters.levels_assigned += 1,
        Action::SetActive {
            desired: DesiredActive::Activate,
            ..
        } => counters.activated += 1,
        Action::SetActive { .. } => counters.deactivated += 1,
        Action::AddStaff { .. } => counters.added += 1,
        Action::RemoveStaff { .. } => counters.removed += 1,
    }
}
