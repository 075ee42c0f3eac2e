//! # formix
//!
//! Serialization of nested model forms over a JSON wire format. A form
//! group combines a main form, child formsets, and one-to-one satellite
//! forms into a single `{contents, schema, order}` payload, and reads
//! the same shape back for validation and persistence.
//!
//! This is the meta-crate that re-exports all sub-crates for convenient
//! access. Depend on `formix` for the whole stack, or on individual
//! crates for finer-grained control.

/// Core types: errors, validation errors, and logging setup.
pub use formix_core as core;

/// Model metadata, runtime records, SQL compilation, and executors.
pub use formix_db as db;

/// Forms, formsets, form groups, and field schemas.
#[cfg(feature = "forms")]
pub use formix_forms as forms;

/// The class-based view serving a form group over HTTP.
#[cfg(feature = "views")]
pub use formix_views as views;
