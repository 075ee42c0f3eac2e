//! Per-field schema extraction for the frontend wire contract.
//!
//! A [`FieldSchema`] is the JSON description of one form field: its class
//! tag, presentation attributes, and (for choice fields) the ordered
//! `{pk, text}` choice list. Absent attributes are omitted from the
//! output rather than serialized as null.

use serde::Serialize;

use crate::fields::{FormFieldDef, FormFieldType};

/// One selectable choice in a schema, as `{pk, text}`.
#[derive(Debug, Clone, Serialize)]
pub struct ChoiceEntry {
    /// The stored value.
    pub pk: serde_json::Value,
    /// The display label.
    pub text: String,
}

/// The JSON schema for a single form field.
///
/// `name` and `hidden` are annotations owned by the enclosing form and
/// stay unset until the form schema builder fills them in.
#[derive(Debug, Clone, Serialize)]
pub struct FieldSchema {
    /// The field class tag (e.g. "CharField").
    pub class: String,
    /// The field name; set by the form schema builder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whether the field is hidden; set by the form schema builder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    /// Help text.
    pub help_text: String,
    /// Whether the field is disabled.
    pub disabled: bool,
    /// Display label.
    pub label: String,
    /// Label suffix, when configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_suffix: Option<String>,
    /// Initial value, when configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial: Option<serde_json::Value>,
    /// Whether a value must be submitted.
    pub required: bool,
    /// Upper bound for numeric fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<serde_json::Value>,
    /// Lower bound for numeric fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<serde_json::Value>,
    /// Maximum length for character fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Choice list for choice fields; omitted when empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<ChoiceEntry>>,
    /// Entry kind tag; always "field" here.
    pub type_: String,
}

impl FieldSchema {
    /// Builds the schema for a single form field definition.
    pub fn from_field(field: &FormFieldDef) -> Self {
        let (max_value, min_value, max_length, choices) = match &field.field_type {
            FormFieldType::Char { max_length } => (None, None, *max_length, None),
            FormFieldType::Integer {
                min_value,
                max_value,
            } => (
                max_value.map(|v| serde_json::json!(v)),
                min_value.map(|v| serde_json::json!(v)),
                None,
                None,
            ),
            FormFieldType::Float {
                min_value,
                max_value,
            } => (
                max_value.map(|v| serde_json::json!(v)),
                min_value.map(|v| serde_json::json!(v)),
                None,
                None,
            ),
            FormFieldType::Choice { choices } if !choices.is_empty() => (
                None,
                None,
                None,
                Some(
                    choices
                        .iter()
                        .map(|(pk, text)| ChoiceEntry {
                            pk: pk.to_json(),
                            text: text.clone(),
                        })
                        .collect(),
                ),
            ),
            _ => (None, None, None, None),
        };

        Self {
            class: field.field_type.class_name().to_string(),
            name: None,
            hidden: None,
            help_text: field.help_text.clone(),
            disabled: field.disabled,
            label: field.label.clone(),
            label_suffix: field.label_suffix.clone(),
            initial: field.initial.as_ref().map(formix_db::Value::to_json),
            required: field.required,
            max_value,
            min_value,
            max_length,
            choices,
            type_: "field".to_string(),
        }
    }

    /// Serializes to a JSON object.
    pub fn to_json(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}
