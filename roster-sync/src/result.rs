//! Run summary: counters, warnings and per-action error records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use roster_core::{ClassId, LevelId, PersonaId};

/// Typed category of a failed remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    AsignarNivel,
    ActivarInactivar,
    AsignarProfesor,
    EliminarProfesor,
    ListarStaff,
    ListarNivel,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::AsignarNivel => "asignar_nivel",
            ErrorKind::ActivarInactivar => "activar_inactivar",
            ErrorKind::AsignarProfesor => "asignar_profesor",
            ErrorKind::EliminarProfesor => "eliminar_profesor",
            ErrorKind::ListarStaff => "listar_staff",
            ErrorKind::ListarNivel => "listar_nivel",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed remote call. The run continues after recording it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionError {
    pub kind: ErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona_id: Option<PersonaId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<ClassId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_id: Option<LevelId>,
    pub message: String,
}

/// Summary counters of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Counters {
    /// Desired assignments examined by the matcher.
    pub processed: usize,
    /// Spreadsheet rows rejected by the normalizer.
    pub invalid: usize,
    /// Assignments without any level or grade marked.
    pub skipped: usize,
    /// Assignments with levels but no matching class.
    pub unmatched: usize,
    /// (assignment, class) matches.
    pub matched: usize,
    pub added: usize,
    /// Matches already on the roster or already queued this run.
    pub omitted: usize,
    pub removed: usize,
    pub levels_assigned: usize,
    pub activated: usize,
    pub deactivated: usize,
    /// Catalog names whose suffix did not parse.
    pub ignored_classes: usize,
    pub errors: usize,
}

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub colegio_id: u64,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    pub counters: Counters,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub errors: Vec<ActionError>,
}

impl ExecutionResult {
    pub fn new(colegio_id: u64, dry_run: bool) -> Self {
        Self {
            colegio_id,
            dry_run,
            started_at: Utc::now(),
            finished_at: None,
            counters: Counters::default(),
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn record_error(&mut self, error: ActionError) {
        self.counters.errors += 1;
        self.errors.push(error);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Number of mutating actions applied (or simulated in dry-run).
    pub fn mutations(&self) -> usize {
        let c = &self.counters;
        c.added + c.removed + c.levels_assigned + c.activated + c.deactivated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::ActivarInactivar).unwrap();
        assert_eq!(json, "\"activar_inactivar\"");
        assert_eq!(ErrorKind::ListarStaff.to_string(), "listar_staff");
    }

    #[test]
    fn record_error_bumps_counter() {
        let mut result = ExecutionResult::new(1, true);
        result.record_error(ActionError {
            kind: ErrorKind::AsignarProfesor,
            persona_id: Some(PersonaId(5)),
            class_id: Some(ClassId(9)),
            level_id: None,
            message: "HTTP 500".into(),
        });
        assert_eq!(result.counters.errors, 1);
        let json = serde_json::to_value(&result.errors[0]).unwrap();
        assert!(json.get("level_id").is_none());
        assert_eq!(json["kind"], "asignar_profesor");
    }
}
