use deadpool_sqlite::{Config as DeadpoolSqliteConfig, Object, Runtime, rusqlite};
use rusqlite::Statement;
use rusqlite::ToSql;
use rusqlite::types::Value;

use crate::batch::{BatchAccumulator, RowSource};
use crate::error::SqlFluentError;
use crate::named::{PlaceholderStyle, transform_named};
use crate::pool::{FluentDb, FluentPool};
use crate::results::ResultSet;
use crate::types::{DatabaseType, SqlValue, UpdateResult};

impl FluentDb {
    /// Initialize a `SQLite` pool for the given path (or `file:` URI).
    ///
    /// # Errors
    /// Returns `SqlFluentError::ConnectionError` if the pool cannot be
    /// created, or a pool/driver error if the initial pragma setup fails.
    pub async fn new_sqlite(db_path: String) -> Result<Self, SqlFluentError> {
        let cfg: DeadpoolSqliteConfig = DeadpoolSqliteConfig::new(db_path);

        let pool = cfg.create_pool(Runtime::Tokio1).map_err(|e| {
            SqlFluentError::ConnectionError(format!("Failed to create SQLite pool: {e}"))
        })?;

        {
            let conn = pool.get().await.map_err(SqlFluentError::PoolErrorSqlite)?;
            conn.interact(|conn| {
                conn.execute_batch("PRAGMA journal_mode = WAL;")
                    .map_err(SqlFluentError::SqliteError)
            })
            .await??;
        }

        Ok(FluentDb {
            pool: FluentPool::Sqlite(pool),
            db_type: DatabaseType::Sqlite,
        })
    }
}

/// Bind middleware values to SQLite types.
///
/// # Errors
/// Infallible today; kept fallible to match the other backends' converters.
pub fn convert_params(params: &[SqlValue]) -> Result<Vec<Value>, SqlFluentError> {
    let mut vec_values = Vec::with_capacity(params.len());
    for p in params {
        let v = match p {
            SqlValue::Int(i) => Value::Integer(*i),
            SqlValue::Float(f) => Value::Real(*f),
            SqlValue::Text(s) => Value::Text(s.to_string()),
            SqlValue::Bool(b) => Value::Integer(i64::from(*b)),
            SqlValue::Timestamp(dt) => {
                let formatted = dt.format("%F %T%.f").to_string();
                Value::Text(formatted)
            }
            SqlValue::Null => Value::Null,
            SqlValue::Json(jsval) => Value::Text(jsval.to_string()),
            SqlValue::Blob(bytes) => Value::Blob(bytes.to_vec()),
        };
        vec_values.push(v);
    }
    Ok(vec_values)
}

fn extract_value(row: &rusqlite::Row, idx: usize) -> Result<SqlValue, SqlFluentError> {
    match row.get_ref(idx) {
        Err(e) => Err(SqlFluentError::SqliteError(e)),
        Ok(rusqlite::types::ValueRef::Null) => Ok(SqlValue::Null),
        Ok(rusqlite::types::ValueRef::Integer(i)) => Ok(SqlValue::Int(i)),
        Ok(rusqlite::types::ValueRef::Real(f)) => Ok(SqlValue::Float(f)),
        Ok(rusqlite::types::ValueRef::Text(bytes)) => {
            let s = String::from_utf8_lossy(bytes).into_owned();
            Ok(SqlValue::Text(s))
        }
        Ok(rusqlite::types::ValueRef::Blob(b)) => Ok(SqlValue::Blob(b.to_vec())),
    }
}

/// Run a prepared SELECT and collect every row.
///
/// # Errors
/// Returns `SqlFluentError::SqliteError` if the query or a value extraction
/// fails.
pub fn build_result_set(
    stmt: &mut Statement,
    params: &[Value],
) -> Result<ResultSet, SqlFluentError> {
    let param_refs: Vec<&dyn ToSql> = params.iter().map(|v| v as &dyn ToSql).collect();
    let column_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
    let column_names = std::sync::Arc::new(column_names);

    let mut rows_iter = stmt.query(&param_refs[..])?;
    let mut result_set = ResultSet::with_capacity(0);
    result_set.set_column_names(column_names.clone());

    while let Some(row) = rows_iter.next()? {
        let mut values = Vec::with_capacity(column_names.len());
        for i in 0..column_names.len() {
            values.push(extract_value(row, i)?);
        }
        result_set.add_row_values(values);
    }

    Ok(result_set)
}

/// Execute a multi-statement script within a transaction.
///
/// # Errors
/// Returns `SqlFluentError::SqliteError` if any statement fails.
pub async fn execute_batch(sqlite_client: &Object, script: &str) -> Result<(), SqlFluentError> {
    let script_owned = script.to_owned();

    sqlite_client
        .interact(move |conn| -> Result<(), SqlFluentError> {
            let tx = conn.transaction()?;
            tx.execute_batch(&script_owned)?;
            tx.commit()?;
            Ok(())
        })
        .await?
}

/// Execute a SELECT with positional parameters.
///
/// # Errors
/// Returns `SqlFluentError::SqliteError` if the query fails.
pub async fn execute_select(
    sqlite_client: &Object,
    query: &str,
    params: &[SqlValue],
) -> Result<ResultSet, SqlFluentError> {
    let query_owned = query.to_owned();
    let params_owned = convert_params(params)?;

    sqlite_client
        .interact(move |conn| -> Result<ResultSet, SqlFluentError> {
            let mut stmt = conn.prepare(&query_owned)?;
            build_result_set(&mut stmt, &params_owned)
        })
        .await?
}

/// Execute a DML statement with positional parameters, in a transaction.
///
/// # Errors
/// Returns `SqlFluentError::SqliteError` if execution fails.
pub async fn execute_dml(
    sqlite_client: &Object,
    query: &str,
    params: &[SqlValue],
) -> Result<usize, SqlFluentError> {
    let query_owned = query.to_owned();
    let params_owned = convert_params(params)?;

    sqlite_client
        .interact(move |conn| -> Result<usize, SqlFluentError> {
            let tx = conn.transaction()?;
            let rows = {
                let mut stmt = tx.prepare(&query_owned)?;
                stmt.execute(rusqlite::params_from_iter(params_owned))?
            };
            tx.commit()?;
            Ok(rows)
        })
        .await?
}

/// Batch engine for SQLite. The whole engine runs inside one `interact`
/// closure so the prepared statement stays on the worker thread and is
/// dropped on every exit path.
///
/// # Errors
/// Returns `SqlFluentError::ParameterError` for a named row missing a
/// required value, or `SqlFluentError::SqliteError` if prepare or a flush
/// fails. Chunks flushed before the failure remain applied.
pub async fn execute_batch_rows(
    sqlite_client: &Object,
    sql: &str,
    mut source: RowSource,
    batch_size: Option<usize>,
) -> Result<Vec<UpdateResult>, SqlFluentError> {
    let (sql_text, names): (String, Option<Vec<String>>) = if source.is_named() {
        let transformed = transform_named(sql, PlaceholderStyle::Sqlite);
        (transformed.positional_sql, Some(transformed.placeholders))
    } else {
        (sql.to_owned(), None)
    };

    sqlite_client
        .interact(move |conn| -> Result<Vec<UpdateResult>, SqlFluentError> {
            let mut stmt = conn.prepare(&sql_text)?;
            let mut batch: BatchAccumulator<Vec<Value>> = BatchAccumulator::new(batch_size);
            while let Some(ordered) = source.next_ordered(names.as_deref())? {
                batch.append(convert_params(&ordered)?);
                if batch.flush_due() {
                    run_pending(&mut stmt, &mut batch)?;
                }
            }
            run_pending(&mut stmt, &mut batch)?;
            Ok(batch.into_results())
        })
        .await?
}

fn run_pending(
    stmt: &mut Statement<'_>,
    batch: &mut BatchAccumulator<Vec<Value>>,
) -> Result<(), SqlFluentError> {
    let pending = batch.take_pending();
    if pending.is_empty() {
        return Ok(());
    }
    let rows = pending.len();
    for values in pending {
        let rows_affected = stmt.execute(rusqlite::params_from_iter(values))? as u64;
        batch.record(UpdateResult { rows_affected });
    }
    tracing::debug!(rows, flush = batch.flushes(), "flushed sqlite batch chunk");
    Ok(())
}
