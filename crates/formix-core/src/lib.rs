//! # formix-core
//!
//! Shared error types and logging setup for the formix workspace.

pub mod error;
pub mod logging;

pub use error::{FormixError, FormixResult, ValidationError};
