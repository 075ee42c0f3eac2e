//! SQL statement builders.
//!
//! Statements are compiled to `?` placeholders with a parallel parameter
//! vector, matching the SQLite backend. The builders cover the narrow set
//! of operations the record layer needs: single-table INSERT, UPDATE and
//! DELETE by primary key, and single-column equality SELECT.

use crate::fields::FieldType;
use crate::model::ModelMeta;
use crate::value::Value;

/// Quotes an identifier for embedding in SQL.
fn quote(ident: &str) -> String {
    format!("\"{ident}\"")
}

/// Compiles an INSERT statement for the given columns.
pub fn compile_insert(table: &str, columns: &[(String, Value)]) -> (String, Vec<Value>) {
    let names: Vec<String> = columns.iter().map(|(c, _)| quote(c)).collect();
    let placeholders: Vec<&str> = columns.iter().map(|_| "?").collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote(table),
        names.join(", "),
        placeholders.join(", ")
    );
    let params = columns.iter().map(|(_, v)| v.clone()).collect();
    (sql, params)
}

/// Compiles an UPDATE statement keyed on the primary key column.
pub fn compile_update_by_pk(
    table: &str,
    columns: &[(String, Value)],
    pk_column: &str,
    pk: Value,
) -> (String, Vec<Value>) {
    let assignments: Vec<String> = columns.iter().map(|(c, _)| format!("{} = ?", quote(c))).collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        quote(table),
        assignments.join(", "),
        quote(pk_column)
    );
    let mut params: Vec<Value> = columns.iter().map(|(_, v)| v.clone()).collect();
    params.push(pk);
    (sql, params)
}

/// Compiles a DELETE statement keyed on the primary key column.
pub fn compile_delete_by_pk(table: &str, pk_column: &str, pk: Value) -> (String, Vec<Value>) {
    let sql = format!("DELETE FROM {} WHERE {} = ?", quote(table), quote(pk_column));
    (sql, vec![pk])
}

/// Compiles a SELECT of all columns filtered by equality on one column,
/// ordered by the primary key for stable results.
pub fn compile_select_by_column(
    table: &str,
    column: &str,
    value: Value,
    pk_column: &str,
) -> (String, Vec<Value>) {
    let sql = format!(
        "SELECT * FROM {} WHERE {} = ? ORDER BY {}",
        quote(table),
        quote(column),
        quote(pk_column)
    );
    (sql, vec![value])
}

/// Compiles a COUNT filtered by equality on one column.
pub fn compile_count_by_column(table: &str, column: &str, value: Value) -> (String, Vec<Value>) {
    let sql = format!(
        "SELECT COUNT(*) AS n FROM {} WHERE {} = ?",
        quote(table),
        quote(column)
    );
    (sql, vec![value])
}

/// Generates a CREATE TABLE statement for a model's concrete fields.
///
/// Only the SQLite dialect is targeted; the statement is intended for
/// tests and small deployments rather than a migration system.
pub fn create_table_sql(meta: &ModelMeta) -> String {
    let mut columns = Vec::new();
    for field in meta.concrete_fields() {
        let column_type = match &field.field_type {
            FieldType::AutoField => "INTEGER",
            FieldType::IntegerField | FieldType::BooleanField => "INTEGER",
            FieldType::FloatField => "REAL",
            FieldType::CharField
            | FieldType::TextField
            | FieldType::DateField
            | FieldType::DateTimeField
            | FieldType::JsonField => "TEXT",
            FieldType::ForeignKey { .. } | FieldType::OneToOneField { .. } => "INTEGER",
            FieldType::ManyToManyField { .. } => continue,
        };
        let mut column = format!("{} {column_type}", quote(&field.attname()));
        if field.primary_key {
            column.push_str(" PRIMARY KEY");
            if matches!(field.field_type, FieldType::AutoField) {
                column.push_str(" AUTOINCREMENT");
            }
        } else if !field.null {
            column.push_str(" NOT NULL");
        }
        if field.unique && !field.primary_key {
            column.push_str(" UNIQUE");
        }
        columns.push(column);
    }
    format!(
        "CREATE TABLE {} ({})",
        quote(&meta.db_table),
        columns.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldDef;

    fn order_meta() -> ModelMeta {
        ModelMeta {
            app_label: "shop",
            model_name: "order",
            db_table: "shop_order".to_string(),
            verbose_name: "order".to_string(),
            fields: vec![
                FieldDef::new("id", FieldType::AutoField).primary_key(),
                FieldDef::new("ref", FieldType::CharField).max_length(32).unique(),
                FieldDef::new(
                    "customer",
                    FieldType::ForeignKey {
                        to: "customer",
                        related_name: "orders",
                    },
                )
                .nullable(),
            ],
        }
    }

    #[test]
    fn test_compile_insert() {
        let (sql, params) = compile_insert(
            "shop_order",
            &[
                ("ref".to_string(), Value::from("A1")),
                ("customer_id".to_string(), Value::Int(4)),
            ],
        );
        assert_eq!(
            sql,
            "INSERT INTO \"shop_order\" (\"ref\", \"customer_id\") VALUES (?, ?)"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_compile_update_by_pk() {
        let (sql, params) = compile_update_by_pk(
            "shop_order",
            &[("ref".to_string(), Value::from("B2"))],
            "id",
            Value::Int(9),
        );
        assert_eq!(
            sql,
            "UPDATE \"shop_order\" SET \"ref\" = ? WHERE \"id\" = ?"
        );
        assert_eq!(params, vec![Value::from("B2"), Value::Int(9)]);
    }

    #[test]
    fn test_compile_delete_by_pk() {
        let (sql, params) = compile_delete_by_pk("shop_order", "id", Value::Int(3));
        assert_eq!(sql, "DELETE FROM \"shop_order\" WHERE \"id\" = ?");
        assert_eq!(params, vec![Value::Int(3)]);
    }

    #[test]
    fn test_compile_select_by_column() {
        let (sql, _) = compile_select_by_column("shop_order", "customer_id", Value::Int(4), "id");
        assert_eq!(
            sql,
            "SELECT * FROM \"shop_order\" WHERE \"customer_id\" = ? ORDER BY \"id\""
        );
    }

    #[test]
    fn test_create_table_sql() {
        let sql = create_table_sql(&order_meta());
        assert!(sql.starts_with("CREATE TABLE \"shop_order\""));
        assert!(sql.contains("\"id\" INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(sql.contains("\"ref\" TEXT NOT NULL UNIQUE"));
        assert!(sql.contains("\"customer_id\" INTEGER"));
        assert!(!sql.contains("\"customer\" "));
    }
}
