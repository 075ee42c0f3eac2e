//! Model metadata and runtime record instances.
//!
//! [`ModelMeta`] captures the static description of a record type (table
//! name, field definitions). [`Instance`] is a runtime record — a meta
//! reference plus a value map. The form-group aggregator composes records
//! of heterogeneous types chosen at configuration time, so records are
//! dynamic rather than a compile-time trait.

use std::collections::BTreeMap;

use crate::fields::FieldDef;
use crate::value::Value;
use formix_core::{FormixError, FormixResult};

/// Static metadata about a record type.
#[derive(Debug)]
pub struct ModelMeta {
    /// The application label (e.g. "billing").
    pub app_label: &'static str,
    /// The model name in lowercase (e.g. "invoice").
    pub model_name: &'static str,
    /// The database table name.
    pub db_table: String,
    /// Human-readable singular name.
    pub verbose_name: String,
    /// Field definitions for this model.
    pub fields: Vec<FieldDef>,
}

impl ModelMeta {
    /// Looks up a field definition by attribute name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the primary key field definition.
    ///
    /// Every concrete model declares exactly one primary key; metadata
    /// without one is a construction bug.
    pub fn pk_field(&self) -> FormixResult<&FieldDef> {
        self.fields.iter().find(|f| f.primary_key).ok_or_else(|| {
            FormixError::ImproperlyConfigured(format!(
                "model '{}' has no primary key field",
                self.model_name
            ))
        })
    }

    /// Iterates the concrete (non many-to-many) fields.
    pub fn concrete_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields
            .iter()
            .filter(|f| !matches!(f.field_type, crate::fields::FieldType::ManyToManyField { .. }))
    }

    /// Iterates the many-to-many fields.
    pub fn many_to_many_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields
            .iter()
            .filter(|f| matches!(f.field_type, crate::fields::FieldType::ManyToManyField { .. }))
    }
}

/// A database row: ordered column names and values.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a new `Row` from parallel column and value vectors.
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Returns the value for the given column, if present.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// Returns the column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

/// A runtime record: model metadata plus a column-value map.
///
/// Values are keyed by column name (the field's `attname`, so forward
/// relations appear as `<name>_id`). An instance without a primary key
/// value is unsaved; [`save_instance`](crate::executor::save_instance)
/// assigns the key on INSERT.
#[derive(Debug, Clone)]
pub struct Instance {
    meta: &'static ModelMeta,
    values: BTreeMap<String, Value>,
}

impl Instance {
    /// Creates a new, empty (unsaved) instance of the given type.
    pub fn new(meta: &'static ModelMeta) -> Self {
        Self {
            meta,
            values: BTreeMap::new(),
        }
    }

    /// Creates an instance with initial values.
    pub fn with_values(
        meta: &'static ModelMeta,
        values: impl IntoIterator<Item = (String, Value)>,
    ) -> Self {
        Self {
            meta,
            values: values.into_iter().collect(),
        }
    }

    /// Returns the model metadata for this instance.
    pub const fn meta(&self) -> &'static ModelMeta {
        self.meta
    }

    /// Returns the primary key value, or `None` if unsaved.
    pub fn pk(&self) -> Option<&Value> {
        let pk_field = self.meta.fields.iter().find(|f| f.primary_key)?;
        match self.values.get(pk_field.name) {
            Some(Value::Null) | None => None,
            Some(v) => Some(v),
        }
    }

    /// Sets the primary key value (used after INSERT).
    pub fn set_pk(&mut self, value: Value) -> FormixResult<()> {
        let pk_field = self.meta.pk_field()?;
        self.values.insert(pk_field.name.to_string(), value);
        Ok(())
    }

    /// Returns the value stored under the given column name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    /// Sets a column value.
    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        self.values.insert(column.into(), value);
    }

    /// Iterates the stored column-value pairs in column order.
    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the stored column-value pairs excluding the primary key.
    /// Used for INSERT, where the key is database-generated.
    pub fn non_pk_values(&self) -> Vec<(String, Value)> {
        let pk_name = self
            .meta
            .fields
            .iter()
            .find(|f| f.primary_key)
            .map(|f| f.name);
        self.values
            .iter()
            .filter(|(k, _)| Some(k.as_str()) != pk_name)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Constructs an instance from a database row.
    ///
    /// Every row column becomes a stored value; columns unknown to the
    /// metadata are carried verbatim.
    pub fn from_row(meta: &'static ModelMeta, row: &Row) -> FormixResult<Self> {
        let mut instance = Self::new(meta);
        for column in row.columns() {
            let value = row
                .get(column)
                .cloned()
                .ok_or_else(|| FormixError::DatabaseError(format!("missing column '{column}'")))?;
            instance.values.insert(column.clone(), value);
        }
        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{FieldDef, FieldType};
    use std::sync::LazyLock;

    static NOTE_META: LazyLock<ModelMeta> = LazyLock::new(|| ModelMeta {
        app_label: "test",
        model_name: "note",
        db_table: "test_note".to_string(),
        verbose_name: "note".to_string(),
        fields: vec![
            FieldDef::new("id", FieldType::AutoField).primary_key(),
            FieldDef::new("body", FieldType::TextField),
            FieldDef::new(
                "author",
                FieldType::ForeignKey {
                    to: "author",
                    related_name: "notes",
                },
            ),
        ],
    });

    #[test]
    fn test_meta_field_lookup() {
        assert!(NOTE_META.field("body").is_some());
        assert!(NOTE_META.field("missing").is_none());
        assert_eq!(NOTE_META.pk_field().unwrap().name, "id");
    }

    #[test]
    fn test_concrete_fields_exclude_m2m() {
        let names: Vec<&str> = NOTE_META.concrete_fields().map(|f| f.name).collect();
        assert_eq!(names, vec!["id", "body", "author"]);
    }

    #[test]
    fn test_instance_pk_lifecycle() {
        let mut inst = Instance::new(&NOTE_META);
        assert!(inst.pk().is_none());
        inst.set_pk(Value::Int(7)).unwrap();
        assert_eq!(inst.pk(), Some(&Value::Int(7)));
    }

    #[test]
    fn test_instance_null_pk_is_unsaved() {
        let mut inst = Instance::new(&NOTE_META);
        inst.set("id", Value::Null);
        assert!(inst.pk().is_none());
    }

    #[test]
    fn test_non_pk_values() {
        let mut inst = Instance::new(&NOTE_META);
        inst.set_pk(Value::Int(1)).unwrap();
        inst.set("body", Value::String("hi".into()));
        let non_pk = inst.non_pk_values();
        assert_eq!(non_pk, vec![("body".to_string(), Value::String("hi".into()))]);
    }

    #[test]
    fn test_from_row() {
        let row = Row::new(
            vec!["id".to_string(), "body".to_string(), "author_id".to_string()],
            vec![Value::Int(3), Value::String("hello".into()), Value::Int(9)],
        );
        let inst = Instance::from_row(&NOTE_META, &row).unwrap();
        assert_eq!(inst.pk(), Some(&Value::Int(3)));
        assert_eq!(inst.get("author_id"), Some(&Value::Int(9)));
    }

    #[test]
    fn test_row_get() {
        let row = Row::new(
            vec!["a".to_string(), "b".to_string()],
            vec![Value::Int(1), Value::Int(2)],
        );
        assert_eq!(row.get("b"), Some(&Value::Int(2)));
        assert_eq!(row.get("c"), None);
    }
}
