use std::error::Error;

use chrono::NaiveDateTime;
use deadpool_postgres::Transaction;
use deadpool_postgres::{Config as PgConfig, Object};
use serde_json::Value as JsonValue;
use tokio_postgres::{
    NoTls, Statement,
    types::{IsNull, ToSql, Type, to_sql_checked},
};
use tokio_util::bytes;

use crate::batch::{BatchAccumulator, RowSource};
use crate::error::SqlFluentError;
use crate::named::{PlaceholderStyle, transform_named};
use crate::pool::{FluentDb, FluentPool};
use crate::results::ResultSet;
use crate::types::{DatabaseType, SqlValue, UpdateResult};

impl FluentDb {
    /// Initialize a `PostgreSQL` pool from a deadpool config.
    ///
    /// # Errors
    /// Returns `SqlFluentError::ConfigError` if a required field (dbname,
    /// host, port, user, password) is missing, or
    /// `SqlFluentError::ConnectionError` if the pool cannot be created.
    pub async fn new_postgres(pg_config: PgConfig) -> Result<Self, SqlFluentError> {
        if pg_config.dbname.is_none() {
            return Err(SqlFluentError::ConfigError("dbname is required".to_string()));
        }
        if pg_config.host.is_none() {
            return Err(SqlFluentError::ConfigError("host is required".to_string()));
        }
        if pg_config.port.is_none() {
            return Err(SqlFluentError::ConfigError("port is required".to_string()));
        }
        if pg_config.user.is_none() {
            return Err(SqlFluentError::ConfigError("user is required".to_string()));
        }
        if pg_config.password.is_none() {
            return Err(SqlFluentError::ConfigError(
                "password is required".to_string(),
            ));
        }

        let pg_pool = pg_config
            .create_pool(Some(deadpool_postgres::Runtime::Tokio1), NoTls)
            .map_err(|e| {
                SqlFluentError::ConnectionError(format!("Failed to create Postgres pool: {e}"))
            })?;

        Ok(FluentDb {
            pool: FluentPool::Postgres(pg_pool),
            db_type: DatabaseType::Postgres,
        })
    }
}

/// Container for Postgres parameters with lifetime tracking.
pub struct Params<'a> {
    references: Vec<&'a (dyn ToSql + Sync)>,
}

impl<'a> Params<'a> {
    /// Bind a slice of middleware values as Postgres parameters.
    ///
    /// # Errors
    /// Infallible today; kept fallible to match the other backends'
    /// converters.
    pub fn convert(params: &'a [SqlValue]) -> Result<Params<'a>, SqlFluentError> {
        let references: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        Ok(Params { references })
    }

    /// Get a reference to the underlying parameter array.
    #[must_use]
    pub fn as_refs(&self) -> &[&'a (dyn ToSql + Sync)] {
        &self.references
    }
}

impl ToSql for SqlValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            SqlValue::Int(i) => (*i).to_sql(ty, out),
            SqlValue::Float(f) => (*f).to_sql(ty, out),
            SqlValue::Text(s) => s.to_sql(ty, out),
            SqlValue::Bool(b) => (*b).to_sql(ty, out),
            SqlValue::Timestamp(dt) => dt.to_sql(ty, out),
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Json(jsval) => jsval.to_sql(ty, out),
            SqlValue::Blob(bytes) => bytes.to_sql(ty, out),
        }
    }

    fn accepts(ty: &Type) -> bool {
        match *ty {
            Type::INT2 | Type::INT4 | Type::INT8 => true,
            Type::FLOAT4 | Type::FLOAT8 => true,
            Type::TEXT | Type::VARCHAR | Type::CHAR | Type::NAME => true,
            Type::BOOL => true,
            Type::TIMESTAMP | Type::TIMESTAMPTZ | Type::DATE => true,
            Type::JSON | Type::JSONB => true,
            Type::BYTEA => true,
            _ => false,
        }
    }

    to_sql_checked!();
}

/// Run a prepared SELECT inside a transaction and collect every row.
///
/// # Errors
/// Returns `SqlFluentError::PostgresError` if the query or a value
/// extraction fails.
pub async fn build_result_set(
    stmt: &Statement,
    params: &[&(dyn ToSql + Sync)],
    transaction: &Transaction<'_>,
) -> Result<ResultSet, SqlFluentError> {
    let rows = transaction.query(stmt, params).await?;

    let column_names: Vec<String> = stmt
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();

    let mut result_set = ResultSet::with_capacity(rows.len());
    let column_names = std::sync::Arc::new(column_names);
    result_set.set_column_names(column_names.clone());

    for row in rows {
        let mut values = Vec::with_capacity(column_names.len());
        for i in 0..column_names.len() {
            values.push(extract_value(&row, i)?);
        }
        result_set.add_row_values(values);
    }

    Ok(result_set)
}

fn extract_value(row: &tokio_postgres::Row, idx: usize) -> Result<SqlValue, SqlFluentError> {
    let type_name = row.columns()[idx].type_().name();

    if type_name == "int2" || type_name == "int4" || type_name == "int8" {
        let val: Option<i64> = row.try_get(idx)?;
        Ok(val.map_or(SqlValue::Null, SqlValue::Int))
    } else if type_name == "float4" || type_name == "float8" {
        let val: Option<f64> = row.try_get(idx)?;
        Ok(val.map_or(SqlValue::Null, SqlValue::Float))
    } else if type_name == "bool" {
        let val: Option<bool> = row.try_get(idx)?;
        Ok(val.map_or(SqlValue::Null, SqlValue::Bool))
    } else if type_name == "timestamp" || type_name == "timestamptz" {
        let val: Option<NaiveDateTime> = row.try_get(idx)?;
        Ok(val.map_or(SqlValue::Null, SqlValue::Timestamp))
    } else if type_name == "json" || type_name == "jsonb" {
        let val: Option<JsonValue> = row.try_get(idx)?;
        Ok(val.map_or(SqlValue::Null, SqlValue::Json))
    } else if type_name == "bytea" {
        let val: Option<Vec<u8>> = row.try_get(idx)?;
        Ok(val.map_or(SqlValue::Null, SqlValue::Blob))
    } else {
        // everything else reads back as text
        let val: Option<String> = row.try_get(idx)?;
        Ok(val.map_or(SqlValue::Null, SqlValue::Text))
    }
}

/// Execute a multi-statement script within a transaction.
///
/// # Errors
/// Returns `SqlFluentError::PostgresError` if any statement fails.
pub async fn execute_batch(pg_client: &mut Object, script: &str) -> Result<(), SqlFluentError> {
    let tx = pg_client.transaction().await?;
    tx.batch_execute(script).await?;
    tx.commit().await?;
    Ok(())
}

/// Execute a SELECT with positional parameters.
///
/// # Errors
/// Returns `SqlFluentError::PostgresError` if the query fails.
pub async fn execute_select(
    pg_client: &mut Object,
    query: &str,
    params: &[SqlValue],
) -> Result<ResultSet, SqlFluentError> {
    let params = Params::convert(params)?;
    let tx = pg_client.transaction().await?;
    let stmt = tx.prepare(query).await?;
    let result_set = build_result_set(&stmt, params.as_refs(), &tx).await?;
    tx.commit().await?;
    Ok(result_set)
}

/// Execute a DML statement with positional parameters, in a transaction.
///
/// # Errors
/// Returns `SqlFluentError::PostgresError` if execution fails.
pub async fn execute_dml(
    pg_client: &mut Object,
    query: &str,
    params: &[SqlValue],
) -> Result<usize, SqlFluentError> {
    let params = Params::convert(params)?;
    let tx = pg_client.transaction().await?;
    let stmt = tx.prepare(query).await?;
    let rows = tx.execute(&stmt, params.as_refs()).await?;
    tx.commit().await?;
    Ok(rows as usize)
}

/// Batch engine for Postgres. The statement is prepared once per call and
/// dropped with the scope on every exit path; flushes run each pending row
/// through it sequentially.
///
/// # Errors
/// Returns `SqlFluentError::ParameterError` for a named row missing a
/// required value, or `SqlFluentError::PostgresError` if prepare or a flush
/// fails. Chunks flushed before the failure remain applied.
pub async fn execute_batch_rows(
    pg_client: &mut Object,
    sql: &str,
    mut source: RowSource,
    batch_size: Option<usize>,
) -> Result<Vec<UpdateResult>, SqlFluentError> {
    let transformed = if source.is_named() {
        Some(transform_named(sql, PlaceholderStyle::Postgres))
    } else {
        None
    };
    let (sql_text, names) = match &transformed {
        Some(t) => (t.positional_sql.as_str(), Some(t.placeholders.as_slice())),
        None => (sql, None),
    };

    let stmt = pg_client.prepare(sql_text).await?;
    let mut batch: BatchAccumulator<Vec<SqlValue>> = BatchAccumulator::new(batch_size);
    while let Some(ordered) = source.next_ordered(names)? {
        batch.append(ordered);
        if batch.flush_due() {
            run_pending(pg_client, &stmt, &mut batch).await?;
        }
    }
    run_pending(pg_client, &stmt, &mut batch).await?;
    Ok(batch.into_results())
}

async fn run_pending(
    pg_client: &Object,
    stmt: &Statement,
    batch: &mut BatchAccumulator<Vec<SqlValue>>,
) -> Result<(), SqlFluentError> {
    let pending = batch.take_pending();
    if pending.is_empty() {
        return Ok(());
    }
    let rows = pending.len();
    for row in &pending {
        let params = Params::convert(row)?;
        let rows_affected = pg_client.execute(stmt, params.as_refs()).await?;
        batch.record(UpdateResult { rows_affected });
    }
    tracing::debug!(rows, flush = batch.flushes(), "flushed postgres batch chunk");
    Ok(())
}
