//! Form field definitions and field-level cleaning.
//!
//! [`FormFieldDef`] describes a single form field; [`clean_field_value`]
//! coerces and validates one raw JSON value against it. Form fields are
//! usually derived from model metadata via [`generate_form_fields`].

use formix_core::{FormixError, FormixResult};
use formix_db::fields::FieldType;
use formix_db::{ModelMeta, Value};

use crate::dates::{parse_date_permissive, parse_datetime_permissive};

/// Defines the type of a form field, including type-specific parameters.
///
/// [`clean_field_value`] dispatches on this enum to perform type coercion
/// and type-level validation.
#[derive(Debug, Clone)]
pub enum FormFieldType {
    /// A character (string) field.
    Char {
        /// Maximum length (characters).
        max_length: Option<usize>,
    },
    /// An integer field.
    Integer {
        /// Minimum allowed value.
        min_value: Option<i64>,
        /// Maximum allowed value.
        max_value: Option<i64>,
    },
    /// A floating-point field.
    Float {
        /// Minimum allowed value.
        min_value: Option<f64>,
        /// Maximum allowed value.
        max_value: Option<f64>,
    },
    /// A boolean field.
    Boolean,
    /// A date field.
    Date,
    /// A date-time field.
    DateTime,
    /// A single-choice field, as rendered for relations and choice sets.
    ///
    /// An empty choice list means the allowed set is open (membership is
    /// not validated); relation fields start this way until a choice
    /// override or queryset populates them.
    Choice {
        /// Available choices as `(value, display_label)` pairs.
        choices: Vec<(Value, String)>,
    },
    /// A JSON field accepting any structured value.
    Json,
}

impl FormFieldType {
    /// Returns the class tag used in the wire schema.
    pub const fn class_name(&self) -> &'static str {
        match self {
            Self::Char { .. } => "CharField",
            Self::Integer { .. } => "IntegerField",
            Self::Float { .. } => "FloatField",
            Self::Boolean => "BooleanField",
            Self::Date => "DateField",
            Self::DateTime => "DateTimeField",
            Self::Choice { .. } => "ChoiceField",
            Self::Json => "JSONField",
        }
    }
}

/// Complete definition of a form field.
#[derive(Debug, Clone)]
pub struct FormFieldDef {
    /// The field name.
    pub name: String,
    /// The field type, controlling coercion and validation.
    pub field_type: FormFieldType,
    /// Whether this field is required.
    pub required: bool,
    /// Initial value presented to the frontend.
    pub initial: Option<Value>,
    /// Help text displayed alongside the field.
    pub help_text: String,
    /// Human-readable label.
    pub label: String,
    /// Suffix appended to the label when rendered.
    pub label_suffix: Option<String>,
    /// Whether the field is rendered but not editable.
    pub disabled: bool,
}

impl FormFieldDef {
    /// Creates a new `FormFieldDef` with sensible defaults.
    pub fn new(name: impl Into<String>, field_type: FormFieldType) -> Self {
        let name = name.into();
        let label = name.replace('_', " ");
        Self {
            name,
            field_type,
            required: true,
            initial: None,
            help_text: String::new(),
            label,
            label_suffix: None,
            disabled: false,
        }
    }

    /// Sets whether this field is required.
    #[must_use]
    pub const fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Sets the initial value.
    #[must_use]
    pub fn initial(mut self, value: Value) -> Self {
        self.initial = Some(value);
        self
    }

    /// Sets the help text.
    #[must_use]
    pub fn help_text(mut self, text: impl Into<String>) -> Self {
        self.help_text = text.into();
        self
    }

    /// Sets the label.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the label suffix.
    #[must_use]
    pub fn label_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.label_suffix = Some(suffix.into());
        self
    }

    /// Sets whether this field is disabled.
    #[must_use]
    pub const fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Replaces the choice list when this is a choice field; a no-op
    /// otherwise.
    pub fn set_choices(&mut self, new_choices: Vec<(Value, String)>) {
        if let FormFieldType::Choice { choices } = &mut self.field_type {
            *choices = new_choices;
        }
    }
}

/// Derives form fields from model metadata for the named fields.
///
/// Relation fields become [`FormFieldType::Choice`] (choices come from the
/// field definition when declared, otherwise empty). A field is required
/// when the model field is neither nullable nor blank and has no default.
///
/// # Errors
///
/// [`FormixError::ImproperlyConfigured`] for names missing from the
/// metadata.
pub fn generate_form_fields(
    meta: &ModelMeta,
    field_names: &[&str],
) -> FormixResult<Vec<FormFieldDef>> {
    let mut fields = Vec::with_capacity(field_names.len());
    for name in field_names {
        let model_field = meta.field(name).ok_or_else(|| {
            FormixError::ImproperlyConfigured(format!(
                "unknown field '{name}' on model '{}'",
                meta.model_name
            ))
        })?;

        let field_type = if model_field.is_relation() {
            FormFieldType::Choice {
                choices: model_field.choices.clone().unwrap_or_default(),
            }
        } else if let Some(choices) = &model_field.choices {
            FormFieldType::Choice {
                choices: choices.clone(),
            }
        } else {
            match &model_field.field_type {
                FieldType::AutoField | FieldType::IntegerField => FormFieldType::Integer {
                    min_value: None,
                    max_value: None,
                },
                FieldType::CharField => FormFieldType::Char {
                    max_length: model_field.max_length,
                },
                FieldType::TextField => FormFieldType::Char { max_length: None },
                FieldType::FloatField => FormFieldType::Float {
                    min_value: None,
                    max_value: None,
                },
                FieldType::BooleanField => FormFieldType::Boolean,
                FieldType::DateField => FormFieldType::Date,
                FieldType::DateTimeField => FormFieldType::DateTime,
                FieldType::JsonField => FormFieldType::Json,
                FieldType::ForeignKey { .. }
                | FieldType::OneToOneField { .. }
                | FieldType::ManyToManyField { .. } => unreachable!("handled above"),
            }
        };

        let required = !model_field.null
            && !model_field.blank
            && model_field.default.is_none()
            && !model_field.primary_key;

        let mut field = FormFieldDef::new(model_field.name, field_type)
            .required(required)
            .label(model_field.verbose_name.clone())
            .help_text(model_field.help_text.clone());
        field.initial = model_field.default.clone();
        fields.push(field);
    }
    Ok(fields)
}

fn is_empty_input(raw: Option<&serde_json::Value>) -> bool {
    match raw {
        None | Some(serde_json::Value::Null) => true,
        Some(serde_json::Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Cleans (coerces and validates) a raw JSON value against a field.
///
/// Missing keys, JSON null, and the empty string all count as empty:
/// an error for required fields, `Value::Null` otherwise. Numeric fields
/// accept JSON numbers or numeric strings, date fields parse permissively,
/// and choice membership is enforced only when the choice list is
/// non-empty.
///
/// Returns the cleaned `Value` or the list of error messages.
pub fn clean_field_value(
    field: &FormFieldDef,
    raw: Option<&serde_json::Value>,
) -> Result<Value, Vec<String>> {
    if is_empty_input(raw) {
        if field.required {
            return Err(vec!["This field is required.".to_string()]);
        }
        return Ok(Value::Null);
    }
    // is_empty_input returned false, so raw is present
    let Some(raw) = raw else {
        return Ok(Value::Null);
    };

    let mut errors = Vec::new();
    let cleaned = match &field.field_type {
        FormFieldType::Char { max_length } => {
            let text = match raw {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                _ => {
                    errors.push("Enter a valid string.".to_string());
                    String::new()
                }
            };
            if let Some(max) = max_length {
                if text.chars().count() > *max {
                    errors.push(format!(
                        "Ensure this value has at most {max} characters (it has {}).",
                        text.chars().count()
                    ));
                }
            }
            Value::String(text)
        }
        FormFieldType::Integer {
            min_value,
            max_value,
        } => {
            let parsed = match raw {
                serde_json::Value::Number(n) => n.as_i64(),
                serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            match parsed {
                Some(n) => {
                    if let Some(min) = min_value {
                        if n < *min {
                            errors.push(format!(
                                "Ensure this value is greater than or equal to {min}."
                            ));
                        }
                    }
                    if let Some(max) = max_value {
                        if n > *max {
                            errors.push(format!(
                                "Ensure this value is less than or equal to {max}."
                            ));
                        }
                    }
                    Value::Int(n)
                }
                None => {
                    errors.push("Enter a whole number.".to_string());
                    Value::Null
                }
            }
        }
        FormFieldType::Float {
            min_value,
            max_value,
        } => {
            let parsed = match raw {
                serde_json::Value::Number(n) => n.as_f64(),
                serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            match parsed {
                Some(n) => {
                    if let Some(min) = min_value {
                        if n < *min {
                            errors.push(format!(
                                "Ensure this value is greater than or equal to {min}."
                            ));
                        }
                    }
                    if let Some(max) = max_value {
                        if n > *max {
                            errors.push(format!(
                                "Ensure this value is less than or equal to {max}."
                            ));
                        }
                    }
                    Value::Float(n)
                }
                None => {
                    errors.push("Enter a number.".to_string());
                    Value::Null
                }
            }
        }
        FormFieldType::Boolean => match raw {
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) if n.as_i64() == Some(0) => Value::Bool(false),
            serde_json::Value::Number(n) if n.as_i64() == Some(1) => Value::Bool(true),
            serde_json::Value::String(s) => match s.to_lowercase().as_str() {
                "true" | "1" => Value::Bool(true),
                "false" | "0" => Value::Bool(false),
                _ => {
                    errors.push("Enter a valid boolean value.".to_string());
                    Value::Null
                }
            },
            _ => {
                errors.push("Enter a valid boolean value.".to_string());
                Value::Null
            }
        },
        FormFieldType::Date => match raw.as_str().and_then(parse_date_permissive) {
            Some(date) => Value::Date(date),
            None => {
                errors.push("Enter a valid date.".to_string());
                Value::Null
            }
        },
        FormFieldType::DateTime => match raw.as_str().and_then(parse_datetime_permissive) {
            Some(dt) => Value::DateTime(dt),
            None => {
                errors.push("Enter a valid date/time.".to_string());
                Value::Null
            }
        },
        FormFieldType::Choice { choices } => {
            let value = Value::from_json(raw);
            if !choices.is_empty() && !choices.iter().any(|(pk, _)| *pk == value) {
                errors.push(format!(
                    "Select a valid choice. {value} is not one of the available choices."
                ));
            }
            value
        }
        FormFieldType::Json => Value::Json(raw.clone()),
    };

    if errors.is_empty() {
        Ok(cleaned)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formix_db::fields::FieldDef;

    fn char_field() -> FormFieldDef {
        FormFieldDef::new(
            "title",
            FormFieldType::Char {
                max_length: Some(5),
            },
        )
    }

    #[test]
    fn test_required_missing() {
        let errs = clean_field_value(&char_field(), None).unwrap_err();
        assert_eq!(errs, vec!["This field is required."]);
    }

    #[test]
    fn test_required_empty_string() {
        let raw = serde_json::json!("");
        assert!(clean_field_value(&char_field(), Some(&raw)).is_err());
    }

    #[test]
    fn test_optional_null_cleans_to_null() {
        let field = char_field().required(false);
        let raw = serde_json::Value::Null;
        assert_eq!(clean_field_value(&field, Some(&raw)).unwrap(), Value::Null);
    }

    #[test]
    fn test_char_max_length() {
        let raw = serde_json::json!("too long value");
        let errs = clean_field_value(&char_field(), Some(&raw)).unwrap_err();
        assert!(errs[0].contains("at most 5 characters"));
    }

    #[test]
    fn test_integer_from_string() {
        let field = FormFieldDef::new(
            "count",
            FormFieldType::Integer {
                min_value: None,
                max_value: None,
            },
        );
        let raw = serde_json::json!("42");
        assert_eq!(clean_field_value(&field, Some(&raw)).unwrap(), Value::Int(42));
    }

    #[test]
    fn test_integer_bounds() {
        let field = FormFieldDef::new(
            "count",
            FormFieldType::Integer {
                min_value: Some(1),
                max_value: Some(10),
            },
        );
        let raw = serde_json::json!(0);
        let errs = clean_field_value(&field, Some(&raw)).unwrap_err();
        assert!(errs[0].contains("greater than or equal to 1"));
    }

    #[test]
    fn test_integer_rejects_garbage() {
        let field = FormFieldDef::new(
            "count",
            FormFieldType::Integer {
                min_value: None,
                max_value: None,
            },
        );
        let raw = serde_json::json!("forty-two");
        let errs = clean_field_value(&field, Some(&raw)).unwrap_err();
        assert_eq!(errs, vec!["Enter a whole number."]);
    }

    #[test]
    fn test_boolean_coercions() {
        let field = FormFieldDef::new("flag", FormFieldType::Boolean);
        for (raw, expected) in [
            (serde_json::json!(true), true),
            (serde_json::json!("true"), true),
            (serde_json::json!(1), true),
            (serde_json::json!("0"), false),
        ] {
            assert_eq!(
                clean_field_value(&field, Some(&raw)).unwrap(),
                Value::Bool(expected)
            );
        }
    }

    #[test]
    fn test_date_permissive() {
        let field = FormFieldDef::new("due", FormFieldType::Date);
        let raw = serde_json::json!("03/15/2024");
        assert!(matches!(
            clean_field_value(&field, Some(&raw)).unwrap(),
            Value::Date(_)
        ));
    }

    #[test]
    fn test_date_invalid() {
        let field = FormFieldDef::new("due", FormFieldType::Date);
        let raw = serde_json::json!("soon");
        let errs = clean_field_value(&field, Some(&raw)).unwrap_err();
        assert_eq!(errs, vec!["Enter a valid date."]);
    }

    #[test]
    fn test_choice_membership() {
        let field = FormFieldDef::new(
            "status",
            FormFieldType::Choice {
                choices: vec![
                    (Value::Int(1), "Open".to_string()),
                    (Value::Int(2), "Closed".to_string()),
                ],
            },
        );
        assert!(clean_field_value(&field, Some(&serde_json::json!(2))).is_ok());
        assert!(clean_field_value(&field, Some(&serde_json::json!(3))).is_err());
    }

    #[test]
    fn test_empty_choices_accept_anything() {
        let field = FormFieldDef::new("owner", FormFieldType::Choice { choices: vec![] });
        let raw = serde_json::json!(999);
        assert_eq!(clean_field_value(&field, Some(&raw)).unwrap(), Value::Int(999));
    }

    #[test]
    fn test_json_passthrough() {
        let field = FormFieldDef::new("meta", FormFieldType::Json);
        let raw = serde_json::json!({"a": [1, 2]});
        assert_eq!(
            clean_field_value(&field, Some(&raw)).unwrap(),
            Value::Json(raw.clone())
        );
    }

    #[test]
    fn test_generate_form_fields() {
        use std::sync::LazyLock;
        static META: LazyLock<ModelMeta> = LazyLock::new(|| ModelMeta {
            app_label: "test",
            model_name: "ticket",
            db_table: "test_ticket".to_string(),
            verbose_name: "ticket".to_string(),
            fields: vec![
                FieldDef::new("id", FieldType::AutoField).primary_key(),
                FieldDef::new("title", FieldType::CharField).max_length(80),
                FieldDef::new("notes", FieldType::TextField).blank(),
                FieldDef::new(
                    "assignee",
                    FieldType::ForeignKey {
                        to: "user",
                        related_name: "tickets",
                    },
                )
                .nullable(),
            ],
        });

        let fields = generate_form_fields(&META, &["title", "notes", "assignee"]).unwrap();
        assert_eq!(fields.len(), 3);
        assert!(fields[0].required);
        assert!(matches!(
            fields[0].field_type,
            FormFieldType::Char {
                max_length: Some(80)
            }
        ));
        assert!(!fields[1].required);
        assert!(!fields[2].required);
        assert!(matches!(fields[2].field_type, FormFieldType::Choice { .. }));

        let err = generate_form_fields(&META, &["missing"]).unwrap_err();
        assert!(matches!(err, FormixError::ImproperlyConfigured(_)));
    }
}
