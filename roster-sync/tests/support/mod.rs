//! In-memory `SchoolApi` that records every call.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use roster_api::{ApiError, RemoteClass, SchoolApi};
use roster_core::{ClassId, Column, Level, LevelId, PersonaId, SheetRow};

pub const PRIMARIA: LevelId = LevelId(39);
pub const SECUNDARIA: LevelId = LevelId(40);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListClasses,
    ClassStaff(ClassId),
    AddStaff(ClassId, PersonaId),
    RemoveStaff(ClassId, PersonaId),
    LevelRoster(LevelId),
    SetActive(PersonaId, LevelId, bool),
    AssignLevels(PersonaId, BTreeSet<LevelId>),
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::AddStaff(..) | Call::RemoveStaff(..) | Call::SetActive(..) | Call::AssignLevels(..)
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeApi {
    classes: Vec<RemoteClass>,
    staff: RefCell<BTreeMap<ClassId, BTreeSet<PersonaId>>>,
    levels: RefCell<BTreeMap<LevelId, BTreeMap<PersonaId, bool>>>,
    pub fail_catalog: bool,
    pub failing_staff_reads: BTreeSet<ClassId>,
    pub failing_level_reads: BTreeSet<LevelId>,
    pub failing_adds: BTreeSet<(ClassId, PersonaId)>,
    calls: RefCell<Vec<Call>>,
}

/// Route engine `log` output through the test harness (`RUST_LOG=debug`).
pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn rejected(message: &str) -> ApiError {
    ApiError::Protocol {
        status: Some(500),
        message: Some(message.to_string()),
    }
}

impl FakeApi {
    pub fn new() -> Self {
        init_logs();
        Self::default()
    }

    pub fn class(mut self, id: u64, name: &str) -> Self {
        self.classes.push(RemoteClass {
            ge_clase_id: id,
            ge_clase: Some(name.to_string()),
            ge_clase_clave: None,
        });
        self
    }

    pub fn staff(self, class: u64, personas: &[u64]) -> Self {
        self.staff
            .borrow_mut()
            .insert(ClassId(class), personas.iter().copied().map(PersonaId).collect());
        self
    }

    pub fn level(self, level: LevelId, entries: &[(u64, bool)]) -> Self {
        self.levels.borrow_mut().insert(
            level,
            entries.iter().map(|(p, a)| (PersonaId(*p), *a)).collect(),
        );
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| pred(c)).count()
    }

    pub fn mutations(&self) -> usize {
        self.count(Call::is_mutation)
    }

    pub fn roster(&self, class: u64) -> BTreeSet<PersonaId> {
        self.staff
            .borrow()
            .get(&ClassId(class))
            .cloned()
            .unwrap_or_default()
    }

    pub fn active(&self, level: LevelId, persona: u64) -> Option<bool> {
        self.levels
            .borrow()
            .get(&level)
            .and_then(|r| r.get(&PersonaId(persona)).copied())
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl SchoolApi for FakeApi {
    fn list_classes(&self) -> Result<Vec<RemoteClass>, ApiError> {
        self.record(Call::ListClasses);
        if self.fail_catalog {
            return Err(ApiError::Transport {
                endpoint: "clases".into(),
                message: "connection refused".into(),
            });
        }
        Ok(self.classes.clone())
    }

    fn class_staff(&self, class: ClassId) -> Result<BTreeSet<PersonaId>, ApiError> {
        self.record(Call::ClassStaff(class));
        if self.failing_staff_reads.contains(&class) {
            return Err(rejected("staff no disponible"));
        }
        Ok(self.staff.borrow().get(&class).cloned().unwrap_or_default())
    }

    fn add_class_staff(&self, class: ClassId, persona: PersonaId) -> Result<(), ApiError> {
        self.record(Call::AddStaff(class, persona));
        if self.failing_adds.contains(&(class, persona)) {
            return Err(rejected("Clase cerrada"));
        }
        self.staff.borrow_mut().entry(class).or_default().insert(persona);
        Ok(())
    }

    fn remove_class_staff(&self, class: ClassId, persona: PersonaId) -> Result<(), ApiError> {
        self.record(Call::RemoveStaff(class, persona));
        self.staff.borrow_mut().entry(class).or_default().remove(&persona);
        Ok(())
    }

    fn level_roster(&self, level: LevelId) -> Result<BTreeMap<PersonaId, bool>, ApiError> {
        self.record(Call::LevelRoster(level));
        if self.failing_level_reads.contains(&level) {
            return Err(rejected("nivel no disponible"));
        }
        Ok(self.levels.borrow().get(&level).cloned().unwrap_or_default())
    }

    fn set_level_active(
        &self,
        persona: PersonaId,
        level: LevelId,
        active: bool,
    ) -> Result<(), ApiError> {
        self.record(Call::SetActive(persona, level, active));
        self.levels
            .borrow_mut()
            .entry(level)
            .or_default()
            .insert(persona, active);
        Ok(())
    }

    fn assign_levels(
        &self,
        persona: PersonaId,
        levels: &BTreeSet<LevelId>,
    ) -> Result<(), ApiError> {
        self.record(Call::AssignLevels(persona, levels.clone()));
        let mut rosters = self.levels.borrow_mut();
        for level in levels {
            rosters.entry(*level).or_default().entry(persona).or_insert(false);
        }
        Ok(())
    }
}

/// Spreadsheet row builder: persona, course, then flag columns.
pub fn row(n: usize, persona: &str, course: &str) -> SheetRow {
    SheetRow::new(n)
        .with(Column::PersonaId, persona)
        .with(Column::Course, course)
}

pub fn primaria(row: SheetRow) -> SheetRow {
    row.with(Column::LevelFlag(Level::Primaria), "SI")
}
