//! # roster-sync
//!
//! Reconciliation engine: desired staffing from spreadsheet rows against
//! the live state of the remote school service.
//!
//! Call [`pipeline::run`] with a [`SchoolApi`](roster_api::SchoolApi), the
//! output of [`desired::normalize_rows`] and an [`EventSink`]. The run
//! returns an [`ExecutionResult`] or, when the class catalog cannot be
//! fetched, a [`SyncError`].

pub mod catalog;
pub mod context;
pub mod desired;
pub mod error;
pub mod events;
pub mod executor;
pub mod matcher;
pub mod pipeline;
pub mod plan;
pub mod report;
pub mod result;

pub use catalog::{Catalog, IgnoredClass};
pub use context::ReconciliationContext;
pub use desired::{normalize_rows, DesiredState};
pub use error::SyncError;
pub use events::{ActionReport, Event, EventSink, Phase};
pub use pipeline::{run, RunOptions};
pub use plan::{Action, PlanOptions, ReconciliationPlan};
pub use result::{ActionError, Counters, ErrorKind, ExecutionResult};
