//! Model-backed forms.
//!
//! A [`ModelForm`] is built from a [`FormConfig`], optionally bound to an
//! existing record and to submitted JSON data, then validated field by
//! field and saved. Its [`ModelForm::schema`] output is the per-form part
//! of the wire contract: every field's schema annotated with `name` and
//! `hidden`, static entries appended disabled, and the `order_` list.

use std::collections::BTreeMap;

use formix_core::{FormixError, FormixResult, ValidationError};
use formix_db::executor::{save_instance, DbExecutor};
use formix_db::{Instance, ModelMeta, Value};

use crate::fields::{clean_field_value, generate_form_fields, FormFieldDef};
use crate::schema::FieldSchema;

type JsonMap = serde_json::Map<String, serde_json::Value>;

/// A declarative adjustment applied to one generated form field.
#[derive(Debug, Clone)]
pub enum FieldOverride {
    /// Replaces the choice list (choice fields only).
    Choices(Vec<(Value, String)>),
    /// Overrides the required flag.
    Required(bool),
    /// Overrides the label.
    Label(String),
    /// Overrides the help text.
    HelpText(String),
    /// Overrides the disabled flag.
    Disabled(bool),
    /// Overrides the initial value.
    Initial(Value),
}

impl FieldOverride {
    fn apply(&self, field: &mut FormFieldDef) {
        match self {
            Self::Choices(choices) => field.set_choices(choices.clone()),
            Self::Required(required) => field.required = *required,
            Self::Label(label) => field.label = label.clone(),
            Self::HelpText(text) => field.help_text = text.clone(),
            Self::Disabled(disabled) => field.disabled = *disabled,
            Self::Initial(value) => field.initial = Some(value.clone()),
        }
    }
}

/// Configuration for a model-backed form: which model, which fields, in
/// which order, plus presentation adjustments.
#[derive(Debug, Clone)]
pub struct FormConfig {
    /// The model this form edits.
    pub meta: &'static ModelMeta,
    /// The fields exposed by the form, in schema order.
    pub fields: Vec<&'static str>,
    /// Fields rendered as hidden inputs.
    pub hidden: Vec<&'static str>,
    /// Extra schema entries rendered always-disabled, keyed by name.
    /// These carry display-only data the form never binds or saves.
    pub static_data: Vec<(String, JsonMap)>,
    /// Adjustments applied to generated fields at construction.
    pub overrides: Vec<(&'static str, FieldOverride)>,
}

impl FormConfig {
    /// Creates a config exposing the given fields of a model.
    pub fn new(meta: &'static ModelMeta, fields: Vec<&'static str>) -> Self {
        Self {
            meta,
            fields,
            hidden: Vec::new(),
            static_data: Vec::new(),
            overrides: Vec::new(),
        }
    }

    /// Marks fields as hidden in the schema.
    #[must_use]
    pub fn hidden(mut self, hidden: Vec<&'static str>) -> Self {
        self.hidden = hidden;
        self
    }

    /// Appends a static (display-only) schema entry.
    #[must_use]
    pub fn static_field(mut self, name: impl Into<String>, schema: JsonMap) -> Self {
        self.static_data.push((name.into(), schema));
        self
    }

    /// Adds a field override.
    #[must_use]
    pub fn override_field(mut self, name: &'static str, adjustment: FieldOverride) -> Self {
        self.overrides.push((name, adjustment));
        self
    }
}

/// A form bound to a model, and optionally to an instance and submitted
/// data.
#[derive(Debug)]
pub struct ModelForm {
    config: FormConfig,
    fields: Vec<FormFieldDef>,
    instance: Option<Instance>,
    data: Option<JsonMap>,
    errors: BTreeMap<String, Vec<String>>,
    cleaned: BTreeMap<String, Value>,
    validated: bool,
}

impl ModelForm {
    /// Builds a form from its configuration, applying configured
    /// overrides.
    ///
    /// # Errors
    ///
    /// [`FormixError::ImproperlyConfigured`] when the config names a
    /// field the model does not have.
    pub fn new(config: FormConfig) -> FormixResult<Self> {
        let mut fields = generate_form_fields(config.meta, &config.fields)?;
        for (name, adjustment) in &config.overrides {
            if let Some(field) = fields.iter_mut().find(|f| f.name == *name) {
                adjustment.apply(field);
            }
        }
        Ok(Self {
            config,
            fields,
            instance: None,
            data: None,
            errors: BTreeMap::new(),
            cleaned: BTreeMap::new(),
            validated: false,
        })
    }

    /// Attaches an existing record; saving will update it.
    #[must_use]
    pub fn with_instance(mut self, instance: Instance) -> Self {
        self.instance = Some(instance);
        self
    }

    /// Applies per-request overrides on top of the configured ones.
    pub fn apply_overrides(&mut self, overrides: &[(&str, FieldOverride)]) {
        for (name, adjustment) in overrides {
            if let Some(field) = self.fields.iter_mut().find(|f| f.name == *name) {
                adjustment.apply(field);
            }
        }
    }

    /// Binds submitted data to the form. Keys the form does not declare
    /// are ignored.
    pub fn bind(&mut self, data: &JsonMap) {
        self.data = Some(data.clone());
        self.validated = false;
        self.errors.clear();
        self.cleaned.clear();
    }

    /// Returns `true` if the form has been bound to data.
    pub const fn is_bound(&self) -> bool {
        self.data.is_some()
    }

    /// Returns the attached record, if any.
    pub const fn instance(&self) -> Option<&Instance> {
        self.instance.as_ref()
    }

    /// Returns the form's field definitions.
    pub fn fields(&self) -> &[FormFieldDef] {
        &self.fields
    }

    /// Validates every field against the bound data.
    ///
    /// An unbound form is invalid. Errors accumulate per field; disabled
    /// fields are skipped.
    pub async fn is_valid(&mut self) -> bool {
        let Some(data) = self.data.clone() else {
            return false;
        };
        self.errors.clear();
        self.cleaned.clear();

        for field in &self.fields {
            if field.disabled {
                continue;
            }
            match clean_field_value(field, data.get(&field.name)) {
                Ok(value) => {
                    self.cleaned.insert(field.name.clone(), value);
                }
                Err(field_errors) => {
                    self.errors.insert(field.name.clone(), field_errors);
                }
            }
        }
        self.validated = true;
        self.errors.is_empty()
    }

    /// Per-field error messages from the last validation.
    pub const fn errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    /// Errors as a JSON map of `field -> [messages]`.
    pub fn errors_json(&self) -> JsonMap {
        self.errors
            .iter()
            .map(|(name, msgs)| {
                (
                    name.clone(),
                    serde_json::Value::Array(
                        msgs.iter().map(|m| serde_json::Value::String(m.clone())).collect(),
                    ),
                )
            })
            .collect()
    }

    /// Cleaned values from the last successful validation.
    pub const fn cleaned_data(&self) -> &BTreeMap<String, Value> {
        &self.cleaned
    }

    /// Merges the cleaned data into a record without touching the
    /// database. Relation values land on the `<name>_id` column.
    ///
    /// # Errors
    ///
    /// [`FormixError::ValidationError`] when called before a passing
    /// validation.
    pub fn to_instance(&self) -> FormixResult<Instance> {
        if !self.validated || !self.errors.is_empty() {
            return Err(FormixError::ValidationError(ValidationError::new(
                "The form did not pass validation.",
                "invalid",
            )));
        }
        let mut instance = self
            .instance
            .clone()
            .unwrap_or_else(|| Instance::new(self.config.meta));
        for field in &self.fields {
            let Some(value) = self.cleaned.get(&field.name) else {
                continue;
            };
            let column = self
                .config
                .meta
                .field(&field.name)
                .map_or_else(|| field.name.clone(), formix_db::FieldDef::attname);
            instance.set(column, value.clone());
        }
        Ok(instance)
    }

    /// Saves the form's record.
    ///
    /// With `commit` false the merged record is returned unsaved; the
    /// caller takes over persistence.
    pub async fn save(&mut self, db: &dyn DbExecutor, commit: bool) -> FormixResult<Instance> {
        let mut instance = self.to_instance()?;
        if commit {
            save_instance(db, &mut instance).await?;
        }
        self.instance = Some(instance.clone());
        Ok(instance)
    }

    /// Builds the form schema: each field's schema annotated with its
    /// name and hidden flag, static entries appended disabled, and the
    /// field order under `order_`.
    pub fn schema(&self) -> JsonMap {
        let mut result = JsonMap::new();
        for field in &self.fields {
            let mut field_schema = FieldSchema::from_field(field);
            field_schema.name = Some(field.name.clone());
            field_schema.hidden = Some(self.config.hidden.contains(&field.name.as_str()));
            result.insert(
                field.name.clone(),
                serde_json::Value::Object(field_schema.to_json()),
            );
        }
        for (name, static_schema) in &self.config.static_data {
            let mut entry = static_schema.clone();
            entry.insert("disabled".to_string(), serde_json::Value::Bool(true));
            result.insert(name.clone(), serde_json::Value::Object(entry));
        }
        result.insert(
            "order_".to_string(),
            serde_json::Value::Array(
                self.fields
                    .iter()
                    .map(|f| serde_json::Value::String(f.name.clone()))
                    .collect(),
            ),
        );
        result
    }

    /// The ordered field names of this form.
    pub fn field_order(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// The model this form edits.
    pub const fn meta(&self) -> &'static ModelMeta {
        self.config.meta
    }
}
