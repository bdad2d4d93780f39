//! Roster API library: the remote school-administration service.
//!
//! - [`client`]: [`SchoolApi`] trait, [`Scope`], [`HttpSchoolApi`] over ureq
//! - [`envelope`]: `{success, message, data}` decoding and payload shapes
//! - [`error`]: [`ApiError`]

pub mod client;
pub mod envelope;
pub mod error;

pub use client::{Endpoints, HttpSchoolApi, SchoolApi, Scope, TEACHER_ROLE};
pub use envelope::RemoteClass;
pub use error::ApiError;
