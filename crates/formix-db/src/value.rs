//! Backend-agnostic value types.
//!
//! The [`Value`] enum is the type used throughout formix to represent field
//! values, query parameters, and results. It supports the SQL types the
//! form layer produces and provides conversions from standard Rust types
//! and from JSON wire values.

use std::fmt;

/// A backend-agnostic representation of a database value.
///
/// `Value` is the universal type used to pass data between the form layer
/// and database backends, and it knows how to cross the JSON boundary both
/// ways ([`Value::to_json`] / [`Value::from_json`]).
///
/// # Examples
///
/// ```
/// use formix_db::value::Value;
///
/// let v = Value::from(42_i64);
/// assert_eq!(v, Value::Int(42));
///
/// let v = Value::from("hello");
/// assert_eq!(v, Value::String("hello".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// SQL NULL.
    Null,
    /// A boolean value.
    Bool(bool),
    /// A 64-bit signed integer.
    Int(i64),
    /// A 64-bit floating-point number.
    Float(f64),
    /// A UTF-8 string.
    String(String),
    /// A date without time.
    Date(chrono::NaiveDate),
    /// A date and time without timezone.
    DateTime(chrono::NaiveDateTime),
    /// A UUID value.
    Uuid(uuid::Uuid),
    /// A JSON value.
    Json(serde_json::Value),
    /// A list of values (reverse many-to-many pk lists, IN clauses).
    List(Vec<Value>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Date(d) => write!(f, "{d}"),
            Self::DateTime(dt) => write!(f, "{dt}"),
            Self::Uuid(u) => write!(f, "{u}"),
            Self::Json(j) => write!(f, "{j}"),
            Self::List(vals) => {
                write!(f, "[")?;
                for (i, v) in vals.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}

// ── From implementations ───────────────────────────────────────────────

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<chrono::NaiveDate> for Value {
    fn from(v: chrono::NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<chrono::NaiveDateTime> for Value {
    fn from(v: chrono::NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl From<uuid::Uuid> for Value {
    fn from(v: uuid::Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Self::Null,
        }
    }
}

impl Value {
    /// Returns `true` if this value is `Null`.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Attempts to extract a boolean value.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to extract an integer value.
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Attempts to extract a float value.
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Attempts to extract a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Converts this value to its plain JSON wire representation.
    ///
    /// Dates, datetimes, and UUIDs become ISO strings; `Json` unwraps to
    /// the inner value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::json!(i),
            Self::Float(v) => serde_json::json!(v),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Date(d) => serde_json::Value::String(d.to_string()),
            Self::DateTime(dt) => {
                serde_json::Value::String(dt.format("%Y-%m-%dT%H:%M:%S").to_string())
            }
            Self::Uuid(u) => serde_json::Value::String(u.to_string()),
            Self::Json(j) => j.clone(),
            Self::List(vals) => {
                serde_json::Value::Array(vals.iter().map(Self::to_json).collect())
            }
        }
    }

    /// Converts a plain JSON wire value into a `Value` without type context.
    ///
    /// Used where no field metadata is available; typed coercion (dates,
    /// foreign keys) lives in the form layer.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => n.as_i64().map_or_else(
                || Self::Float(n.as_f64().unwrap_or(0.0)),
                Self::Int,
            ),
            serde_json::Value::String(s) => Self::String(s.clone()),
            other => Self::Json(other.clone()),
        }
    }

    /// Converts a JSON wire value into a `Value` using the field's
    /// declared type to disambiguate representations the untyped
    /// conversion cannot (integer booleans, ISO date strings).
    pub fn from_json_typed(field_type: &crate::fields::FieldType, json: &serde_json::Value) -> Self {
        Self::from_json(json).coerce(field_type)
    }

    /// Normalizes a stored value to its declared field type.
    ///
    /// SQLite has no boolean, date, or JSON column types, so booleans
    /// come back as integers and dates and JSON documents as text; this
    /// maps them onto the typed variants. Values that do not match the
    /// expected representation pass through unchanged.
    #[must_use]
    pub fn coerce(self, field_type: &crate::fields::FieldType) -> Self {
        use crate::fields::FieldType;
        match (field_type, self) {
            (FieldType::BooleanField, Self::Int(i)) => Self::Bool(i != 0),
            (FieldType::DateField, Self::String(s)) => {
                chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                    .map_or_else(|_| Self::String(s), Self::Date)
            }
            (FieldType::DateTimeField, Self::String(s)) => {
                chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S")
                    .or_else(|_| chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S"))
                    .map_or_else(|_| Self::String(s), Self::DateTime)
            }
            (FieldType::JsonField, Self::String(s)) => serde_json::from_str(&s)
                .map_or_else(|_| Self::String(s), Self::Json),
            (_, value) => value,
        }
    }
}
