//! Run-scoped roster cache.
//!
//! A [`ReconciliationContext`] is created at the start of a run and dropped
//! at its end. Each class staff roster and each level roster is requested
//! from the remote service at most once per run, failures included, so the
//! number of reads is bounded by the distinct classes and levels touched.

use std::collections::{BTreeMap, BTreeSet};

use roster_api::{ApiError, SchoolApi};
use roster_core::{ClassId, LevelId, PersonaId};

pub type StaffRoster = BTreeSet<PersonaId>;

/// `persona → active` for one level.
pub type LevelRoster = BTreeMap<PersonaId, bool>;

/// Result of a cached lookup.
#[derive(Debug)]
pub struct Lookup<'c, T> {
    pub value: Result<&'c T, &'c ApiError>,
    /// True when this call reached the remote service.
    pub fetched: bool,
}

pub struct ReconciliationContext<'a, A: SchoolApi + ?Sized> {
    api: &'a A,
    staff: BTreeMap<ClassId, Result<StaffRoster, ApiError>>,
    levels: BTreeMap<LevelId, Result<LevelRoster, ApiError>>,
}

impl<'a, A: SchoolApi + ?Sized> ReconciliationContext<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            staff: BTreeMap::new(),
            levels: BTreeMap::new(),
        }
    }

    /// Teacher roster of `class`, fetched on first reference.
    pub fn class_staff(&mut self, class: ClassId) -> Lookup<'_, StaffRoster> {
        let api = self.api;
        let fetched = !self.staff.contains_key(&class);
        let entry = self.staff.entry(class).or_insert_with(|| {
            tracing::debug!("fetching staff of class {class}");
            api.class_staff(class)
        });
        if !fetched {
            tracing::debug!("staff of class {class} served from cache");
        }
        Lookup {
            value: entry.as_ref(),
            fetched,
        }
    }

    /// Activation roster of `level`, fetched on first reference.
    pub fn level_roster(&mut self, level: LevelId) -> Lookup<'_, LevelRoster> {
        let api = self.api;
        let fetched = !self.levels.contains_key(&level);
        let entry = self.levels.entry(level).or_insert_with(|| {
            tracing::debug!("fetching roster of level {level}");
            api.level_roster(level)
        });
        Lookup {
            value: entry.as_ref(),
            fetched,
        }
    }

    pub fn staff_fetches(&self) -> usize {
        self.staff.len()
    }

    pub fn level_fetches(&self) -> usize {
        self.levels.len()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use roster_api::RemoteClass;

    use super::*;

    /// Counts reads; class 13 and level 99 always fail.
    #[derive(Default)]
    struct CountingApi {
        staff_reads: Cell<usize>,
        level_reads: Cell<usize>,
    }

    fn refused() -> ApiError {
        ApiError::Protocol {
            status: Some(503),
            message: None,
        }
    }

    impl SchoolApi for CountingApi {
        fn list_classes(&self) -> Result<Vec<RemoteClass>, ApiError> {
            Ok(Vec::new())
        }
        fn class_staff(&self, class: ClassId) -> Result<BTreeSet<PersonaId>, ApiError> {
            self.staff_reads.set(self.staff_reads.get() + 1);
            if class == ClassId(13) {
                return Err(refused());
            }
            Ok([PersonaId(class.0 * 10)].into_iter().collect())
        }
        fn add_class_staff(&self, _: ClassId, _: PersonaId) -> Result<(), ApiError> {
            Ok(())
        }
        fn remove_class_staff(&self, _: ClassId, _: PersonaId) -> Result<(), ApiError> {
            Ok(())
        }
        fn level_roster(&self, level: LevelId) -> Result<BTreeMap<PersonaId, bool>, ApiError> {
            self.level_reads.set(self.level_reads.get() + 1);
            if level == LevelId(99) {
                return Err(refused());
            }
            Ok([(PersonaId(1), true)].into_iter().collect())
        }
        fn set_level_active(&self, _: PersonaId, _: LevelId, _: bool) -> Result<(), ApiError> {
            Ok(())
        }
        fn assign_levels(&self, _: PersonaId, _: &BTreeSet<LevelId>) -> Result<(), ApiError> {
            Ok(())
        }
    }

    #[test]
    fn staff_fetched_once_per_class() {
        let api = CountingApi::default();
        let mut ctx = ReconciliationContext::new(&api);

        let first = ctx.class_staff(ClassId(2));
        assert!(first.fetched);
        assert!(first.value.unwrap().contains(&PersonaId(20)));
        assert!(!ctx.class_staff(ClassId(2)).fetched);
        ctx.class_staff(ClassId(3));

        assert_eq!(api.staff_reads.get(), 2);
        assert_eq!(ctx.staff_fetches(), 2);
    }

    #[test]
    fn failures_are_cached_too() {
        let api = CountingApi::default();
        let mut ctx = ReconciliationContext::new(&api);

        assert!(ctx.class_staff(ClassId(13)).value.is_err());
        let again = ctx.class_staff(ClassId(13));
        assert!(!again.fetched);
        assert!(again.value.is_err());
        assert_eq!(api.staff_reads.get(), 1);

        assert!(ctx.level_roster(LevelId(99)).value.is_err());
        assert!(ctx.level_roster(LevelId(99)).value.is_err());
        assert_eq!(api.level_reads.get(), 1);
    }

    #[test]
    fn level_roster_fetched_once_per_level() {
        let api = CountingApi::default();
        let mut ctx = ReconciliationContext::new(&api);
        for _ in 0..3 {
            let lookup = ctx.level_roster(LevelId(39));
            assert_eq!(lookup.value.unwrap().get(&PersonaId(1)), Some(&true));
        }
        ctx.level_roster(LevelId(40));
        assert_eq!(api.level_reads.get(), 2);
        assert_eq!(ctx.level_fetches(), 2);
    }
}
