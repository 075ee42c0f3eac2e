//! Field type definitions for model metadata.
//!
//! [`FieldType`] enumerates the column types the form-group pipeline works
//! with, and [`FieldDef`] captures all metadata about a single model field.
//! Relational fields declare their reverse-relation name explicitly via
//! `related_name` instead of discovering it at runtime.

use crate::value::Value;

/// The type of a model field, determining its SQL column type and behavior.
///
/// Relational fields (`ForeignKey`, `OneToOneField`, `ManyToManyField`)
/// carry the target model name and the explicit reverse-relation name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// Auto-incrementing 64-bit integer primary key.
    AutoField,
    /// Variable-length string with a max length.
    CharField,
    /// Unlimited-length text.
    TextField,
    /// 64-bit signed integer.
    IntegerField,
    /// 64-bit floating-point number.
    FloatField,
    /// Boolean (true/false).
    BooleanField,
    /// Date without time.
    DateField,
    /// Date and time.
    DateTimeField,
    /// JSON data.
    JsonField,
    /// Many-to-one relationship.
    ForeignKey {
        /// The target model name (e.g. "account").
        to: &'static str,
        /// The name used for the reverse relation on the target.
        related_name: &'static str,
    },
    /// One-to-one relationship (unique foreign key).
    OneToOneField {
        /// The target model name.
        to: &'static str,
        /// The name used for the reverse relation on the target.
        related_name: &'static str,
    },
    /// Many-to-many relationship (via intermediate table).
    ManyToManyField {
        /// The target model name.
        to: &'static str,
        /// The name used for the reverse relation on the target.
        related_name: &'static str,
    },
}

/// Complete definition of a model field, including metadata and constraints.
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// The attribute name of this field.
    pub name: &'static str,
    /// The type of this field.
    pub field_type: FieldType,
    /// Whether this field is the primary key.
    pub primary_key: bool,
    /// Whether NULL is allowed in the database.
    pub null: bool,
    /// Whether the field may be left blank in forms.
    pub blank: bool,
    /// Default value for new instances.
    pub default: Option<Value>,
    /// Whether a UNIQUE constraint is applied.
    pub unique: bool,
    /// Maximum character length (for CharField and similar).
    pub max_length: Option<usize>,
    /// Human-readable help text.
    pub help_text: String,
    /// Human-readable name for the field.
    pub verbose_name: String,
    /// Allowed values as (value, display_label) pairs.
    pub choices: Option<Vec<(Value, String)>>,
    /// Whether the field is editable in forms.
    pub editable: bool,
}

impl FieldDef {
    /// Creates a new `FieldDef` with sensible defaults.
    ///
    /// Only the field name and type are required. All other attributes take
    /// their default values (non-null, no constraint, editable).
    pub fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            primary_key: false,
            null: false,
            blank: false,
            default: None,
            unique: false,
            max_length: None,
            help_text: String::new(),
            verbose_name: name.replace('_', " "),
            choices: None,
            editable: true,
        }
    }

    /// Marks this field as the primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Allows NULL values in the database.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.null = true;
        self
    }

    /// Allows the field to be left blank in forms.
    #[must_use]
    pub const fn blank(mut self) -> Self {
        self.blank = true;
        self
    }

    /// Sets the maximum character length.
    #[must_use]
    pub const fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Marks this field as having a UNIQUE constraint.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the default value for this field.
    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the verbose (human-readable) name.
    #[must_use]
    pub fn verbose_name(mut self, name: impl Into<String>) -> Self {
        self.verbose_name = name.into();
        self
    }

    /// Sets the help text.
    #[must_use]
    pub fn help_text(mut self, text: impl Into<String>) -> Self {
        self.help_text = text.into();
        self
    }

    /// Sets the allowed choices.
    #[must_use]
    pub fn choices(mut self, choices: Vec<(Value, String)>) -> Self {
        self.choices = Some(choices);
        self
    }

    /// Marks this field as non-editable.
    #[must_use]
    pub const fn not_editable(mut self) -> Self {
        self.editable = false;
        self
    }

    /// Returns `true` if this field represents a relational field.
    pub const fn is_relation(&self) -> bool {
        matches!(
            self.field_type,
            FieldType::ForeignKey { .. }
                | FieldType::OneToOneField { .. }
                | FieldType::ManyToManyField { .. }
        )
    }

    /// Returns `true` if this is a forward single-valued relation
    /// (foreign key or one-to-one).
    pub const fn is_forward_relation(&self) -> bool {
        matches!(
            self.field_type,
            FieldType::ForeignKey { .. } | FieldType::OneToOneField { .. }
        )
    }

    /// Returns `true` if this field is date-typed.
    pub const fn is_date(&self) -> bool {
        matches!(
            self.field_type,
            FieldType::DateField | FieldType::DateTimeField
        )
    }

    /// Returns the database column name for this field.
    ///
    /// Forward relations store the raw foreign-key id under `<name>_id`,
    /// matching the convention the dict converter uses.
    pub fn attname(&self) -> String {
        if self.is_forward_relation() {
            format!("{}_id", self.name)
        } else {
            self.name.to_string()
        }
    }

    /// Returns the reverse-relation name declared on this field, if it is
    /// a relation.
    pub const fn related_name(&self) -> Option<&'static str> {
        match self.field_type {
            FieldType::ForeignKey { related_name, .. }
            | FieldType::OneToOneField { related_name, .. }
            | FieldType::ManyToManyField { related_name, .. } => Some(related_name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_def_defaults() {
        let f = FieldDef::new("title", FieldType::CharField);
        assert_eq!(f.name, "title");
        assert!(!f.primary_key);
        assert!(!f.null);
        assert!(f.editable);
        assert_eq!(f.verbose_name, "title");
    }

    #[test]
    fn test_builder_chain() {
        let f = FieldDef::new("due_date", FieldType::DateField)
            .nullable()
            .blank()
            .verbose_name("Due date")
            .help_text("When the task is due");
        assert!(f.null);
        assert!(f.blank);
        assert_eq!(f.verbose_name, "Due date");
        assert_eq!(f.help_text, "When the task is due");
    }

    #[test]
    fn test_is_relation() {
        let fk = FieldDef::new(
            "account",
            FieldType::ForeignKey {
                to: "account",
                related_name: "entries",
            },
        );
        assert!(fk.is_relation());
        assert!(fk.is_forward_relation());
        assert!(!FieldDef::new("name", FieldType::CharField).is_relation());

        let m2m = FieldDef::new(
            "tags",
            FieldType::ManyToManyField {
                to: "tag",
                related_name: "items",
            },
        );
        assert!(m2m.is_relation());
        assert!(!m2m.is_forward_relation());
    }

    #[test]
    fn test_attname() {
        let fk = FieldDef::new(
            "account",
            FieldType::ForeignKey {
                to: "account",
                related_name: "entries",
            },
        );
        assert_eq!(fk.attname(), "account_id");
        assert_eq!(FieldDef::new("name", FieldType::CharField).attname(), "name");
    }

    #[test]
    fn test_related_name() {
        let o2o = FieldDef::new(
            "profile",
            FieldType::OneToOneField {
                to: "profile",
                related_name: "owner",
            },
        );
        assert_eq!(o2o.related_name(), Some("owner"));
        assert_eq!(FieldDef::new("x", FieldType::TextField).related_name(), None);
    }

    #[test]
    fn test_is_date() {
        assert!(FieldDef::new("d", FieldType::DateField).is_date());
        assert!(FieldDef::new("dt", FieldType::DateTimeField).is_date());
        assert!(!FieldDef::new("n", FieldType::IntegerField).is_date());
    }
}
