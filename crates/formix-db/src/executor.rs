//! Database executor trait and record-level CRUD helpers.
//!
//! [`DbExecutor`] is the seam between the record layer and a concrete
//! backend: raw SQL in, rows out. The free functions on top of it move
//! whole [`Instance`] records, using the `attname` column convention so
//! forward relations read and write as `<name>_id`.

use async_trait::async_trait;

use crate::model::{Instance, ModelMeta, Row};
use crate::sql;
use crate::value::Value;
use formix_core::{FormixError, FormixResult};

/// Executes SQL against a concrete database backend.
///
/// Implementations run statements with `?` placeholders and positional
/// parameters. All methods are async; blocking drivers are expected to
/// wrap their work in `tokio::task::spawn_blocking`.
#[async_trait]
pub trait DbExecutor: Send + Sync {
    /// Executes a statement and returns the number of affected rows.
    async fn execute(&self, sql: &str, params: &[Value]) -> FormixResult<u64>;

    /// Runs a query and returns all result rows.
    async fn query(&self, sql: &str, params: &[Value]) -> FormixResult<Vec<Row>>;

    /// Runs a query expected to return exactly one row.
    ///
    /// # Errors
    ///
    /// [`FormixError::DoesNotExist`] for zero rows,
    /// [`FormixError::MultipleObjectsReturned`] for more than one.
    async fn query_one(&self, sql: &str, params: &[Value]) -> FormixResult<Row> {
        let rows = self.query(sql, params).await?;
        let mut iter = rows.into_iter();
        match (iter.next(), iter.next()) {
            (Some(row), None) => Ok(row),
            (None, _) => Err(FormixError::DoesNotExist("no rows returned".to_string())),
            (Some(_), Some(_)) => Err(FormixError::MultipleObjectsReturned(
                "expected 1 row, got several".to_string(),
            )),
        }
    }

    /// Executes an INSERT and returns the database-assigned row id.
    async fn insert_returning_id(&self, sql: &str, params: &[Value]) -> FormixResult<Value>;

    /// Opens a transaction.
    async fn begin_transaction(&self) -> FormixResult<()>;

    /// Commits the current transaction.
    async fn commit(&self) -> FormixResult<()>;

    /// Rolls back the current transaction.
    async fn rollback(&self) -> FormixResult<()>;
}

/// Saves an instance: UPDATE when it has a primary key, INSERT otherwise.
///
/// On INSERT the database-assigned id is written back into the instance,
/// so a freshly saved record can immediately serve as a foreign key
/// target.
pub async fn save_instance(db: &dyn DbExecutor, instance: &mut Instance) -> FormixResult<()> {
    let meta = instance.meta();
    let pk_field = meta.pk_field()?;
    let columns = instance.non_pk_values();

    if let Some(pk) = instance.pk().cloned() {
        let (stmt, params) = sql::compile_update_by_pk(&meta.db_table, &columns, pk_field.name, pk);
        db.execute(&stmt, &params).await?;
    } else {
        let (stmt, params) = sql::compile_insert(&meta.db_table, &columns);
        let id = db.insert_returning_id(&stmt, &params).await?;
        instance.set_pk(id)?;
    }
    Ok(())
}

/// Fetches a single instance by primary key.
///
/// # Errors
///
/// [`FormixError::DoesNotExist`] when no row matches.
pub async fn get_instance(
    db: &dyn DbExecutor,
    meta: &'static ModelMeta,
    pk: Value,
) -> FormixResult<Instance> {
    let pk_field = meta.pk_field()?;
    let (stmt, params) =
        sql::compile_select_by_column(&meta.db_table, pk_field.name, pk, pk_field.name);
    let row = db.query_one(&stmt, &params).await.map_err(|e| match e {
        FormixError::DoesNotExist(_) => FormixError::DoesNotExist(format!(
            "{} matching query does not exist",
            meta.model_name
        )),
        other => other,
    })?;
    Instance::from_row(meta, &row)
}

/// Fetches all instances where `column = value`, ordered by primary key.
pub async fn filter_instances(
    db: &dyn DbExecutor,
    meta: &'static ModelMeta,
    column: &str,
    value: Value,
) -> FormixResult<Vec<Instance>> {
    let pk_field = meta.pk_field()?;
    let (stmt, params) = sql::compile_select_by_column(&meta.db_table, column, value, pk_field.name);
    let rows = db.query(&stmt, &params).await?;
    rows.iter().map(|row| Instance::from_row(meta, row)).collect()
}

/// Counts instances where `column = value`.
pub async fn count_instances(
    db: &dyn DbExecutor,
    meta: &ModelMeta,
    column: &str,
    value: Value,
) -> FormixResult<u64> {
    let (stmt, params) = sql::compile_count_by_column(&meta.db_table, column, value);
    let row = db.query_one(&stmt, &params).await?;
    match row.get("n") {
        Some(Value::Int(n)) => Ok((*n).max(0) as u64),
        other => Err(FormixError::DatabaseError(format!(
            "unexpected COUNT result: {other:?}"
        ))),
    }
}

/// Deletes an instance by its primary key. Unsaved instances are a no-op.
pub async fn delete_instance(db: &dyn DbExecutor, instance: &Instance) -> FormixResult<u64> {
    let Some(pk) = instance.pk().cloned() else {
        return Ok(0);
    };
    let meta = instance.meta();
    let pk_field = meta.pk_field()?;
    let (stmt, params) = sql::compile_delete_by_pk(&meta.db_table, pk_field.name, pk);
    db.execute(&stmt, &params).await
}
