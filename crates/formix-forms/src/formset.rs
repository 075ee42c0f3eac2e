//! Formsets: collections of same-typed child records managed together.
//!
//! A [`ModelFormSet`] binds a JSON list of child objects by flattening it
//! into `prefix-INDEX-field` keys plus `prefix-TOTAL_FORMS` and
//! `prefix-INITIAL_FORMS` management counters, then classifies members
//! positionally: indexes below the initial count are pre-existing
//! children (updates, or deletions when flagged), the rest are new.
//!
//! The `id` and `DELETE` keys of each member are management values, not
//! form fields.

use formix_core::{FormixError, FormixResult};
use formix_db::{Instance, Value};

use crate::form::{FormConfig, ModelForm};
use crate::schema::FieldSchema;

type JsonMap = serde_json::Map<String, serde_json::Value>;

const TOTAL_FORMS: &str = "TOTAL_FORMS";
const INITIAL_FORMS: &str = "INITIAL_FORMS";
const ID_KEY: &str = "id";
const DELETE_KEY: &str = "DELETE";

/// Configuration for a formset over one child form.
#[derive(Debug, Clone)]
pub struct FormSetConfig {
    /// The per-member form configuration.
    pub form: FormConfig,
    /// Key prefix for flattened data; defaults to the child model name.
    pub prefix: Option<String>,
    /// Minimum number of surviving members.
    pub min_num: usize,
    /// Maximum number of surviving members.
    pub max_num: usize,
    /// Whether members may be flagged for deletion.
    pub can_delete: bool,
}

impl FormSetConfig {
    /// Creates a formset config with permissive count limits and
    /// deletion enabled.
    pub const fn new(form: FormConfig) -> Self {
        Self {
            form,
            prefix: None,
            min_num: 0,
            max_num: 1000,
            can_delete: true,
        }
    }

    /// Sets the data prefix.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Sets the minimum member count.
    #[must_use]
    pub const fn min_num(mut self, min_num: usize) -> Self {
        self.min_num = min_num;
        self
    }

    /// Sets the maximum member count.
    #[must_use]
    pub const fn max_num(mut self, max_num: usize) -> Self {
        self.max_num = max_num;
        self
    }

    /// Enables or disables deletion flags.
    #[must_use]
    pub const fn can_delete(mut self, can_delete: bool) -> Self {
        self.can_delete = can_delete;
        self
    }

    /// The effective prefix: configured, or the child model's name.
    pub fn effective_prefix(&self) -> String {
        self.prefix
            .clone()
            .unwrap_or_else(|| self.form.meta.model_name.to_string())
    }
}

/// Result of positionally classifying a bound formset's members.
#[derive(Debug, Default)]
pub struct FormSetPartition {
    /// Members to insert (no primary key yet).
    pub new: Vec<Instance>,
    /// Pre-existing members to update.
    pub changed: Vec<Instance>,
    /// Pre-existing members to delete (primary key only).
    pub deleted: Vec<Instance>,
}

#[derive(Debug)]
struct FormEntry {
    form: ModelForm,
    id: Option<serde_json::Value>,
    delete: bool,
}

/// A bound collection of child forms with management counters.
#[derive(Debug)]
pub struct ModelFormSet {
    config: FormSetConfig,
    prefix: String,
    entries: Vec<FormEntry>,
    total_forms: usize,
    initial_forms: usize,
    non_form_errors: Vec<String>,
    is_bound: bool,
}

impl ModelFormSet {
    /// Creates an unbound formset whose counters reflect `existing`
    /// pre-existing children. Used on the serialize path, where only the
    /// schema is needed.
    pub fn unbound(config: FormSetConfig, existing: usize) -> Self {
        let prefix = config.effective_prefix();
        Self {
            config,
            prefix,
            entries: Vec::new(),
            total_forms: existing,
            initial_forms: existing,
            non_form_errors: Vec::new(),
            is_bound: false,
        }
    }

    /// Binds a JSON list of member objects.
    ///
    /// Flattens the list into `prefix-INDEX-field` keys plus the
    /// management counters, then parses the flat map back into member
    /// forms. `initial_forms` must be the number of children currently
    /// linked to the parent: the positional classification in
    /// [`Self::partition`] depends on it.
    pub fn from_json(
        config: FormSetConfig,
        data: &[JsonMap],
        initial_forms: usize,
    ) -> FormixResult<Self> {
        let prefix = config.effective_prefix();
        let mut flat = JsonMap::new();
        for (i, member) in data.iter().enumerate() {
            for (key, value) in member {
                flat.insert(format!("{prefix}-{i}-{key}"), value.clone());
            }
        }
        flat.insert(
            format!("{prefix}-{TOTAL_FORMS}"),
            serde_json::json!(data.len()),
        );
        flat.insert(
            format!("{prefix}-{INITIAL_FORMS}"),
            serde_json::json!(initial_forms),
        );
        Self::bind_flat(config, &flat)
    }

    /// Binds prefix-flattened data directly.
    ///
    /// # Errors
    ///
    /// [`FormixError::BadRequest`] when the management counters are
    /// missing or malformed.
    pub fn bind_flat(config: FormSetConfig, flat: &JsonMap) -> FormixResult<Self> {
        let prefix = config.effective_prefix();
        let total_forms = read_counter(flat, &prefix, TOTAL_FORMS)?;
        let initial_forms = read_counter(flat, &prefix, INITIAL_FORMS)?;

        let mut entries = Vec::with_capacity(total_forms);
        for i in 0..total_forms {
            let member_prefix = format!("{prefix}-{i}-");
            let mut member = JsonMap::new();
            for (key, value) in flat {
                if let Some(field) = key.strip_prefix(&member_prefix) {
                    member.insert(field.to_string(), value.clone());
                }
            }

            let id = member.remove(ID_KEY).filter(|v| !v.is_null());
            let delete = config.can_delete
                && member
                    .remove(DELETE_KEY)
                    .is_some_and(|v| v.as_bool() == Some(true));

            let mut form = ModelForm::new(config.form.clone())?;
            form.bind(&member);
            entries.push(FormEntry { form, id, delete });
        }

        Ok(Self {
            config,
            prefix,
            entries,
            total_forms,
            initial_forms,
            non_form_errors: Vec::new(),
            is_bound: true,
        })
    }

    /// Number of member forms.
    pub fn total_form_count(&self) -> usize {
        self.total_forms
    }

    /// Number of members classified as pre-existing.
    pub const fn initial_form_count(&self) -> usize {
        self.initial_forms
    }

    /// Returns `true` if the formset has been bound to data.
    pub const fn is_bound(&self) -> bool {
        self.is_bound
    }

    /// The data prefix in use.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The child model's metadata.
    pub const fn meta(&self) -> &'static formix_db::ModelMeta {
        self.config.form.meta
    }

    /// Validates every member form plus the formset-level count rules.
    ///
    /// Members flagged for deletion are not validated; a record on its
    /// way out does not need clean data.
    pub async fn is_valid(&mut self) -> bool {
        if !self.is_bound {
            return false;
        }
        self.non_form_errors.clear();

        let mut all_valid = true;
        for entry in &mut self.entries {
            if entry.delete {
                continue;
            }
            if !entry.form.is_valid().await {
                all_valid = false;
            }
        }

        let surviving = self.entries.iter().filter(|e| !e.delete).count();
        if surviving < self.config.min_num {
            self.non_form_errors
                .push(format!("Please submit at least {} forms.", self.config.min_num));
            all_valid = false;
        }
        if surviving > self.config.max_num {
            self.non_form_errors
                .push(format!("Please submit at most {} forms.", self.config.max_num));
            all_valid = false;
        }

        all_valid
    }

    /// Formset-level (non-form) errors.
    pub fn non_form_errors(&self) -> &[String] {
        &self.non_form_errors
    }

    /// Per-member error maps, in member order. Valid members contribute
    /// an empty map.
    pub fn errors(&self) -> Vec<JsonMap> {
        self.entries.iter().map(|e| e.form.errors_json()).collect()
    }

    /// Classifies members into new, changed, and deleted records.
    ///
    /// Classification is positional: members with an index below the
    /// initial-forms counter are pre-existing (their `id` becomes the
    /// primary key; a `DELETE` flag with an id marks them for removal),
    /// the rest are new inserts. A delete flag on a new member simply
    /// drops it.
    ///
    /// No database work happens here; the caller performs the writes.
    pub fn partition(&self) -> FormixResult<FormSetPartition> {
        let mut partition = FormSetPartition::default();
        for (i, entry) in self.entries.iter().enumerate() {
            let existing = i < self.initial_forms;
            if entry.delete {
                if existing {
                    if let Some(id) = &entry.id {
                        let mut doomed = Instance::new(self.config.form.meta);
                        doomed.set_pk(Value::from_json(id))?;
                        partition.deleted.push(doomed);
                    }
                }
                continue;
            }

            let mut instance = entry.form.to_instance()?;
            if existing {
                if let Some(id) = &entry.id {
                    instance.set_pk(Value::from_json(id))?;
                }
                partition.changed.push(instance);
            } else {
                partition.new.push(instance);
            }
        }
        Ok(partition)
    }

    /// Builds the formset schema: the member form's field schemas, the
    /// ordered field list, the management counters, and the formset tag.
    pub fn schema(&self) -> FormixResult<JsonMap> {
        let template = ModelForm::new(self.config.form.clone())?;

        let mut form_schema = JsonMap::new();
        for field in template.fields() {
            let mut field_schema = FieldSchema::from_field(field);
            field_schema.name = Some(field.name.clone());
            form_schema.insert(
                field.name.clone(),
                serde_json::Value::Object(field_schema.to_json()),
            );
        }

        let mut result = JsonMap::new();
        result.insert("prefix".to_string(), serde_json::json!(self.prefix));
        result.insert("form".to_string(), serde_json::Value::Object(form_schema));
        result.insert(
            "fields".to_string(),
            serde_json::json!(template.field_order()),
        );
        result.insert("total_forms".to_string(), serde_json::json!(self.total_forms));
        result.insert(
            "initial_forms".to_string(),
            serde_json::json!(self.initial_forms),
        );
        result.insert(
            "max_num_forms".to_string(),
            serde_json::json!(self.config.max_num),
        );
        result.insert(
            "min_num_forms".to_string(),
            serde_json::json!(self.config.min_num),
        );
        result.insert("type_".to_string(), serde_json::json!("formset"));
        Ok(result)
    }
}

fn read_counter(flat: &JsonMap, prefix: &str, name: &str) -> FormixResult<usize> {
    let key = format!("{prefix}-{name}");
    let value = flat
        .get(&key)
        .ok_or_else(|| FormixError::BadRequest(format!("missing management value '{key}'")))?;
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.parse::<u64>().ok(),
        _ => None,
    };
    parsed
        .map(|n| n as usize)
        .ok_or_else(|| FormixError::BadRequest(format!("malformed management value '{key}'")))
}
