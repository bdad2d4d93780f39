//! Roster core library: domain types, naming grammar, text normalization,
//! spreadsheet columns, profile persistence, errors.
//!
//! - [`types`]: newtypes and domain structs
//! - [`grammar`]: class-name suffix and section tokens
//! - [`text`]: course/header normalization and cell vocabularies
//! - [`columns`]: canonical columns and [`SheetRow`]
//! - [`config`]: `~/.roster/config.yaml` load / save
//! - [`error`]: [`ConfigError`]

pub mod columns;
pub mod config;
pub mod error;
pub mod grammar;
pub mod text;
pub mod types;

pub use columns::{Column, SheetRow};
pub use config::{LevelIdMap, Profile};
pub use error::ConfigError;
pub use types::{
    ClassDescriptor, ClassId, DesiredActive, DesiredAssignment, GradeSelection, Level, LevelId,
    PersonaId, SectionKey,
};
