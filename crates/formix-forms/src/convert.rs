//! Record <-> JSON map conversion.
//!
//! [`instance_to_dict`] renders a record as the flat JSON map the
//! frontend consumes; forward relations appear under the field name with
//! the raw foreign key id unless an explicit recurse entry asks for the
//! related record to be inlined. [`dict_to_instance`] is the inverse for
//! submitted data, applying the `<name>_id` column convention and
//! permissive date parsing.

use std::future::Future;
use std::pin::Pin;

use formix_db::executor::{get_instance, DbExecutor};
use formix_db::fields::FieldType;
use formix_db::{Instance, ModelMeta, Value};
use formix_core::{FormixError, FormixResult};

use crate::dates::{parse_date_permissive, parse_datetime_permissive};

type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Conversion options: allow list, deny list, and recursion into
/// relations.
///
/// Recursion entries are explicit `(field name, target metadata, nested
/// options)` triples; a relation without an entry serializes as its raw
/// foreign key id. Cycle avoidance is the caller's responsibility.
#[derive(Debug, Clone, Default)]
pub struct ConvertOpts {
    /// When set, only the named fields are included.
    pub fields: Option<Vec<&'static str>>,
    /// Fields excluded even when named in `fields`.
    pub exclude: Option<Vec<&'static str>>,
    /// Relations to inline recursively.
    pub recurse: Vec<(&'static str, &'static ModelMeta, ConvertOpts)>,
}

impl ConvertOpts {
    fn includes(&self, name: &str) -> bool {
        if let Some(fields) = &self.fields {
            if !fields.contains(&name) {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude {
            if exclude.contains(&name) {
                return false;
            }
        }
        true
    }

    fn recurse_entry(&self, name: &str) -> Option<(&'static ModelMeta, &Self)> {
        self.recurse
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|(_, meta, opts)| (*meta, opts))
    }
}

/// Renders a record as a JSON map suitable for the frontend.
///
/// Scalar fields are copied by value; forward relations yield the raw
/// foreign key id (or the inlined related record when a recurse entry is
/// configured); many-to-many fields yield their list of target ids.
pub async fn instance_to_dict(
    db: &dyn DbExecutor,
    instance: &Instance,
    opts: &ConvertOpts,
) -> FormixResult<JsonMap> {
    convert(db, instance, opts).await
}

// Boxed for async recursion through recurse entries.
fn convert<'a>(
    db: &'a dyn DbExecutor,
    instance: &'a Instance,
    opts: &'a ConvertOpts,
) -> Pin<Box<dyn Future<Output = FormixResult<JsonMap>> + Send + 'a>> {
    Box::pin(async move {
        let meta = instance.meta();
        let mut data = JsonMap::new();

        for field in meta.concrete_fields() {
            if !opts.includes(field.name) {
                continue;
            }
            if field.is_forward_relation() {
                let fk = instance.get(&field.attname()).cloned().unwrap_or(Value::Null);
                if let Some((target_meta, nested)) = opts.recurse_entry(field.name) {
                    let value = if fk.is_null() {
                        serde_json::Value::Null
                    } else {
                        let related = get_instance(db, target_meta, fk).await?;
                        serde_json::Value::Object(convert(db, &related, nested).await?)
                    };
                    data.insert(field.name.to_string(), value);
                } else {
                    data.insert(field.name.to_string(), fk.to_json());
                }
            } else {
                let value = instance.get(field.name).cloned().unwrap_or(Value::Null);
                // Stored values come back from SQLite untyped (booleans as
                // integers, dates as text); coerce before crossing to JSON.
                data.insert(
                    field.name.to_string(),
                    value.coerce(&field.field_type).to_json(),
                );
            }
        }

        for field in meta.many_to_many_fields() {
            if !opts.includes(field.name) {
                continue;
            }
            let ids = match instance.get(field.name) {
                Some(Value::List(ids)) => ids.clone(),
                _ => Vec::new(),
            };
            if let Some((target_meta, nested)) = opts.recurse_entry(field.name) {
                let mut items = Vec::with_capacity(ids.len());
                for id in ids {
                    let related = get_instance(db, target_meta, id).await?;
                    items.push(serde_json::Value::Object(convert(db, &related, nested).await?));
                }
                data.insert(field.name.to_string(), serde_json::Value::Array(items));
            } else {
                data.insert(
                    field.name.to_string(),
                    serde_json::Value::Array(ids.iter().map(Value::to_json).collect()),
                );
            }
        }

        Ok(data)
    })
}

/// Builds an unsaved record from a JSON map.
///
/// For each editable concrete field present in the data: relation values
/// that are plain ids land on the `<name>_id` column; date-typed string
/// values go through the permissive parser; everything else converts via
/// [`Value::from_json_typed`].
///
/// # Errors
///
/// [`FormixError::ParseError`] when a date-typed string cannot be parsed.
pub fn dict_to_instance(meta: &'static ModelMeta, data: &JsonMap) -> FormixResult<Instance> {
    let mut instance = Instance::new(meta);
    for field in meta.concrete_fields() {
        let Some(raw) = data.get(field.name) else {
            continue;
        };
        if !field.editable {
            continue;
        }

        if field.is_forward_relation() && !raw.is_object() {
            instance.set(field.attname(), Value::from_json(raw));
        } else if field.is_date() {
            match raw {
                serde_json::Value::String(s) if !s.is_empty() => {
                    let value = match field.field_type {
                        FieldType::DateField => {
                            parse_date_permissive(s).map(Value::Date)
                        }
                        _ => parse_datetime_permissive(s).map(Value::DateTime),
                    };
                    let value = value.ok_or_else(|| {
                        FormixError::ParseError(format!(
                            "invalid date value {s:?} for field '{}'",
                            field.name
                        ))
                    })?;
                    instance.set(field.name, value);
                }
                _ => instance.set(field.name, Value::from_json(raw)),
            }
        } else {
            instance.set(field.name, Value::from_json_typed(&field.field_type, raw));
        }
    }
    Ok(instance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use formix_db::fields::FieldDef;
    use formix_db::sql::create_table_sql;
    use formix_db::sqlite::SqliteBackend;
    use std::sync::LazyLock;

    static AUTHOR_META: LazyLock<ModelMeta> = LazyLock::new(|| ModelMeta {
        app_label: "press",
        model_name: "author",
        db_table: "press_author".to_string(),
        verbose_name: "author".to_string(),
        fields: vec![
            FieldDef::new("id", FieldType::AutoField).primary_key(),
            FieldDef::new("name", FieldType::CharField).max_length(60),
        ],
    });

    static BOOK_META: LazyLock<ModelMeta> = LazyLock::new(|| ModelMeta {
        app_label: "press",
        model_name: "book",
        db_table: "press_book".to_string(),
        verbose_name: "book".to_string(),
        fields: vec![
            FieldDef::new("id", FieldType::AutoField).primary_key(),
            FieldDef::new("title", FieldType::CharField).max_length(120),
            FieldDef::new("published", FieldType::DateField).nullable(),
            FieldDef::new("in_print", FieldType::BooleanField).nullable(),
            FieldDef::new(
                "author",
                FieldType::ForeignKey {
                    to: "author",
                    related_name: "books",
                },
            ),
        ],
    });

    async fn seed() -> SqliteBackend {
        let db = SqliteBackend::memory().unwrap();
        db.execute(&create_table_sql(&AUTHOR_META), &[]).await.unwrap();
        db.execute(&create_table_sql(&BOOK_META), &[]).await.unwrap();
        db.execute(
            "INSERT INTO \"press_author\" (\"name\") VALUES (?)",
            &[Value::from("Le Guin")],
        )
        .await
        .unwrap();
        db
    }

    fn sample_book() -> Instance {
        let mut book = Instance::new(&BOOK_META);
        book.set("id", Value::Int(7));
        book.set("title", Value::from("The Dispossessed"));
        book.set("author_id", Value::Int(1));
        book
    }

    #[tokio::test]
    async fn test_relation_yields_raw_fk() {
        let db = seed().await;
        let data = instance_to_dict(&db, &sample_book(), &ConvertOpts::default())
            .await
            .unwrap();
        assert_eq!(data["title"], "The Dispossessed");
        assert_eq!(data["author"], 1);
        assert!(!data.contains_key("author_id"));
    }

    #[tokio::test]
    async fn test_recurse_inlines_related_record() {
        let db = seed().await;
        let opts = ConvertOpts {
            recurse: vec![("author", &AUTHOR_META, ConvertOpts::default())],
            ..ConvertOpts::default()
        };
        let data = instance_to_dict(&db, &sample_book(), &opts).await.unwrap();
        assert_eq!(data["author"]["name"], "Le Guin");
        assert_eq!(data["author"]["id"], 1);
    }

    #[tokio::test]
    async fn test_fields_filter_and_exclude() {
        let db = seed().await;
        let opts = ConvertOpts {
            fields: Some(vec!["id", "title"]),
            exclude: Some(vec!["id"]),
            recurse: vec![],
        };
        let data = instance_to_dict(&db, &sample_book(), &opts).await.unwrap();
        assert_eq!(data.len(), 1);
        assert!(data.contains_key("title"));
    }

    #[tokio::test]
    async fn test_stored_values_serialize_typed() {
        let db = seed().await;
        db.execute(
            "INSERT INTO \"press_book\" (\"title\", \"published\", \"in_print\", \"author_id\") \
             VALUES (?, ?, ?, ?)",
            &[
                Value::from("The Dispossessed"),
                Value::from("1974-05-01"),
                Value::Int(1),
                Value::Int(1),
            ],
        )
        .await
        .unwrap();

        let book = get_instance(&db, &BOOK_META, Value::Int(1)).await.unwrap();
        let data = instance_to_dict(&db, &book, &ConvertOpts::default())
            .await
            .unwrap();
        assert_eq!(data["in_print"], serde_json::json!(true));
        assert_eq!(data["published"], serde_json::json!("1974-05-01"));
    }

    #[test]
    fn test_dict_to_instance_fk_convention() {
        let data = serde_json::json!({
            "title": "Always Coming Home",
            "author": 3,
        });
        let inst = dict_to_instance(&BOOK_META, data.as_object().unwrap()).unwrap();
        assert_eq!(inst.get("author_id"), Some(&Value::Int(3)));
        assert_eq!(inst.get("author"), None);
        assert!(inst.pk().is_none());
    }

    #[test]
    fn test_dict_to_instance_parses_dates() {
        let data = serde_json::json!({
            "title": "x",
            "published": "1974-05-01",
        });
        let inst = dict_to_instance(&BOOK_META, data.as_object().unwrap()).unwrap();
        assert!(matches!(inst.get("published"), Some(Value::Date(_))));
    }

    #[test]
    fn test_dict_to_instance_bad_date_is_parse_error() {
        let data = serde_json::json!({"published": "sometime"});
        let err = dict_to_instance(&BOOK_META, data.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, FormixError::ParseError(_)));
    }

    #[test]
    fn test_dict_to_instance_ignores_unknown_keys() {
        let data = serde_json::json!({"title": "x", "formsets": {"chapter": []}});
        let inst = dict_to_instance(&BOOK_META, data.as_object().unwrap()).unwrap();
        assert_eq!(inst.get("formsets"), None);
    }
}
