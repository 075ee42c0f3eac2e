//! # formix-db
//!
//! The persistence substrate under the formix form layer: a backend-agnostic
//! [`Value`](value::Value) type, field metadata
//! ([`FieldDef`](fields::FieldDef) / [`FieldType`](fields::FieldType)),
//! runtime records ([`Instance`](model::Instance) described by a
//! [`ModelMeta`](model::ModelMeta)), and async instance CRUD over the
//! [`DbExecutor`](executor::DbExecutor) trait.
//!
//! This is deliberately not a query engine. It carries exactly the
//! operations the form-group pipeline needs: save, load by primary key,
//! filter/count by a single column, and delete.

pub mod executor;
pub mod fields;
pub mod model;
pub mod sql;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod value;

pub use executor::{
    count_instances, delete_instance, filter_instances, get_instance, save_instance, DbExecutor,
};
pub use fields::{FieldDef, FieldType};
pub use model::{Instance, ModelMeta, Row};
pub use value::Value;
