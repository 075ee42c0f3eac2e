//! Model-backed forms, formsets, and the form-group aggregator.
//!
//! The crate turns database-backed records into a JSON contract a
//! frontend can render and submit:
//!
//! - [`schema`] extracts per-field schema descriptions;
//! - [`convert`] moves whole records to and from JSON maps;
//! - [`form`] binds, validates, and saves a single record;
//! - [`formset`] manages a collection of child records with management
//!   counters and prefix-flattened data;
//! - [`group`] composes a main form, child formsets, and one-to-one
//!   satellite forms into one serialize/deserialize/validate/save unit.

pub mod convert;
pub mod dates;
pub mod fields;
pub mod form;
pub mod formset;
pub mod group;
pub mod schema;

pub use convert::{dict_to_instance, instance_to_dict, ConvertOpts};
pub use fields::{clean_field_value, generate_form_fields, FormFieldDef, FormFieldType};
pub use form::{FieldOverride, FormConfig, ModelForm};
pub use formset::{FormSetConfig, FormSetPartition, ModelFormSet};
pub use group::{ChildBinding, FormGroup, SatelliteBinding};
pub use schema::{ChoiceEntry, FieldSchema};
