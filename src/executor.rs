use crate::batch::{BatchQuery, RowSource};
use crate::error::SqlFluentError;
use crate::pool::DbConnection;
use crate::results::ResultSet;
use crate::types::{SqlValue, UpdateResult};

#[cfg(feature = "postgres")]
use crate::postgres;
#[cfg(feature = "sqlite")]
use crate::sqlite;

impl DbConnection {
    /// Start a fluent batch for the given SQL text. Named markers (`:name`)
    /// are rewritten for the backend when named rows are supplied.
    ///
    /// ```rust,no_run
    /// use sql_fluent::prelude::*;
    ///
    /// # async fn demo() -> Result<(), SqlFluentError> {
    /// let db = FluentDb::new_sqlite("file::memory:?cache=shared".into()).await?;
    /// let mut conn = db.get_connection().await?;
    /// conn.execute_batch("CREATE TABLE t (id INTEGER, v INTEGER)").await?;
    ///
    /// let results = conn
    ///     .batch("INSERT INTO t (id, v) VALUES (:id, :v)")
    ///     .named_rows((0..10).map(|i| {
    ///         std::collections::HashMap::from([
    ///             ("id".to_string(), SqlValue::Int(i)),
    ///             ("v".to_string(), SqlValue::Int(i * 10)),
    ///         ])
    ///     }))?
    ///     .batch_size(4)?
    ///     .run()
    ///     .await?;
    /// assert_eq!(results.len(), 10);
    /// # Ok(()) }
    /// ```
    pub fn batch<'conn, 'q>(&'conn mut self, sql: &'q str) -> BatchQuery<'conn, 'q> {
        BatchQuery::new(self, sql)
    }

    /// Execute a multi-statement SQL script within a transaction.
    ///
    /// # Errors
    /// Returns the backend's error if any statement fails; the transaction
    /// rolls back.
    pub async fn execute_batch(&mut self, script: &str) -> Result<(), SqlFluentError> {
        match self {
            #[cfg(feature = "postgres")]
            DbConnection::Postgres(pg_client) => postgres::execute_batch(pg_client, script).await,
            #[cfg(feature = "sqlite")]
            DbConnection::Sqlite(sqlite_client) => {
                sqlite::execute_batch(sqlite_client, script).await
            }
            #[allow(unreachable_patterns)]
            _ => Err(SqlFluentError::Unimplemented(
                "this database type is not enabled in the current build".to_string(),
            )),
        }
    }

    /// Execute a SELECT with positional parameters and return the rows.
    ///
    /// # Errors
    /// Returns the backend's error if the query fails.
    pub async fn execute_select(
        &mut self,
        query: &str,
        params: &[SqlValue],
    ) -> Result<ResultSet, SqlFluentError> {
        match self {
            #[cfg(feature = "postgres")]
            DbConnection::Postgres(pg_client) => {
                postgres::execute_select(pg_client, query, params).await
            }
            #[cfg(feature = "sqlite")]
            DbConnection::Sqlite(sqlite_client) => {
                sqlite::execute_select(sqlite_client, query, params).await
            }
            #[allow(unreachable_patterns)]
            _ => Err(SqlFluentError::Unimplemented(
                "this database type is not enabled in the current build".to_string(),
            )),
        }
    }

    /// Execute a single DML statement with positional parameters and return
    /// the number of rows affected.
    ///
    /// # Errors
    /// Returns the backend's error if execution fails.
    pub async fn execute_dml(
        &mut self,
        query: &str,
        params: &[SqlValue],
    ) -> Result<usize, SqlFluentError> {
        match self {
            #[cfg(feature = "postgres")]
            DbConnection::Postgres(pg_client) => {
                postgres::execute_dml(pg_client, query, params).await
            }
            #[cfg(feature = "sqlite")]
            DbConnection::Sqlite(sqlite_client) => {
                sqlite::execute_dml(sqlite_client, query, params).await
            }
            #[allow(unreachable_patterns)]
            _ => Err(SqlFluentError::Unimplemented(
                "this database type is not enabled in the current build".to_string(),
            )),
        }
    }
}

pub(crate) async fn execute_batch_rows_dispatch(
    conn: &mut DbConnection,
    sql: &str,
    source: RowSource,
    batch_size: Option<usize>,
) -> Result<Vec<UpdateResult>, SqlFluentError> {
    match conn {
        #[cfg(feature = "postgres")]
        DbConnection::Postgres(pg_client) => {
            postgres::execute_batch_rows(pg_client, sql, source, batch_size).await
        }
        #[cfg(feature = "sqlite")]
        DbConnection::Sqlite(sqlite_client) => {
            sqlite::execute_batch_rows(sqlite_client, sql, source, batch_size).await
        }
        #[allow(unreachable_patterns)]
        _ => Err(SqlFluentError::Unimplemented(
            "this database type is not enabled in the current build".to_string(),
        )),
    }
}
