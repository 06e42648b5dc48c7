#[cfg(feature = "postgres")]
use deadpool_postgres::{Object as PostgresObject, Pool as DeadpoolPostgresPool};

#[cfg(feature = "sqlite")]
use deadpool_sqlite::{Object as SqliteObject, Pool as DeadpoolSqlitePool};
#[cfg(feature = "sqlite")]
use deadpool_sqlite::rusqlite;

use crate::error::SqlFluentError;
use crate::types::DatabaseType;

/// Connection pool for database access, one variant per enabled backend.
#[derive(Clone)]
pub enum FluentPool {
    /// `PostgreSQL` connection pool
    #[cfg(feature = "postgres")]
    Postgres(DeadpoolPostgresPool),
    /// `SQLite` connection pool
    #[cfg(feature = "sqlite")]
    Sqlite(DeadpoolSqlitePool),
}

impl std::fmt::Debug for FluentPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(_) => f.debug_tuple("Postgres").field(&"<PostgresPool>").finish(),
            #[cfg(feature = "sqlite")]
            Self::Sqlite(_) => f.debug_tuple("Sqlite").field(&"<SqlitePool>").finish(),
        }
    }
}

/// Entry point: a configured connection pool plus its backend type.
///
/// Built once via [`FluentDb::new_sqlite`] or [`FluentDb::new_postgres`] and
/// cloned freely; each clone shares the same pool.
#[derive(Clone, Debug)]
pub struct FluentDb {
    /// The connection pool
    pub pool: FluentPool,
    /// The database type
    pub db_type: DatabaseType,
}

impl FluentDb {
    /// Acquire a connection scoped to the caller; dropping it returns it to
    /// the pool.
    ///
    /// # Errors
    /// Returns `SqlFluentError::PoolErrorPostgres` or
    /// `SqlFluentError::PoolErrorSqlite` if the pool cannot provide a
    /// connection.
    pub async fn get_connection(&self) -> Result<DbConnection, SqlFluentError> {
        self.pool.get_connection().await
    }
}

impl FluentPool {
    /// Acquire a connection from the pool.
    ///
    /// # Errors
    /// Returns the backend's pool error if acquisition fails.
    pub async fn get_connection(&self) -> Result<DbConnection, SqlFluentError> {
        match self {
            #[cfg(feature = "postgres")]
            FluentPool::Postgres(pool) => {
                let conn: PostgresObject = pool
                    .get()
                    .await
                    .map_err(SqlFluentError::PoolErrorPostgres)?;
                Ok(DbConnection::Postgres(conn))
            }
            #[cfg(feature = "sqlite")]
            FluentPool::Sqlite(pool) => {
                let conn: SqliteObject =
                    pool.get().await.map_err(SqlFluentError::PoolErrorSqlite)?;
                Ok(DbConnection::Sqlite(conn))
            }
        }
    }
}

/// A pooled connection scoped to one caller. All fluent execution paths hang
/// off this type; see [`DbConnection::batch`](crate::BatchQuery).
pub enum DbConnection {
    #[cfg(feature = "postgres")]
    Postgres(PostgresObject),
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteObject),
}

impl std::fmt::Debug for DbConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(_) => f
                .debug_tuple("Postgres")
                .field(&"<PostgresConnection>")
                .finish(),
            #[cfg(feature = "sqlite")]
            Self::Sqlite(_) => f
                .debug_tuple("Sqlite")
                .field(&"<SqliteConnection>")
                .finish(),
        }
    }
}

/// Raw driver connection handed to `interact_sync` / `interact_async`
/// closures for code that needs to bypass the fluent layer.
pub enum AnyConnWrapper<'a> {
    /// `PostgreSQL` client connection
    #[cfg(feature = "postgres")]
    Postgres(&'a mut tokio_postgres::Client),
    /// `SQLite` database connection
    #[cfg(feature = "sqlite")]
    Sqlite(&'a mut rusqlite::Connection),
}

impl DbConnection {
    /// Run an async closure against the raw backend client. Supported for
    /// Postgres; SQLite connections live on a worker thread and need
    /// [`interact_sync`](DbConnection::interact_sync) instead.
    ///
    /// # Errors
    /// Returns `SqlFluentError::Unimplemented` for backends without async
    /// client access.
    #[allow(unused_variables)]
    pub async fn interact_async<F, Fut>(&mut self, func: F) -> Result<Fut::Output, SqlFluentError>
    where
        F: FnOnce(AnyConnWrapper<'_>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<(), SqlFluentError>> + Send + 'static,
    {
        match self {
            #[cfg(feature = "postgres")]
            DbConnection::Postgres(pg_obj) => {
                let client: &mut tokio_postgres::Client = pg_obj.as_mut();
                Ok(func(AnyConnWrapper::Postgres(client)).await)
            }
            #[cfg(feature = "sqlite")]
            DbConnection::Sqlite(_) => Err(SqlFluentError::Unimplemented(
                "interact_async is not supported for SQLite; use interact_sync instead".to_string(),
            )),
        }
    }

    /// Run a blocking closure against the raw backend connection on its
    /// worker thread. Supported for SQLite.
    ///
    /// # Errors
    /// Returns `SqlFluentError::Unimplemented` for backends without a
    /// blocking worker, or `SqlFluentError::ConnectionError` if the worker
    /// panicked.
    #[allow(unused_variables)]
    pub async fn interact_sync<F, R>(&self, f: F) -> Result<R, SqlFluentError>
    where
        F: FnOnce(AnyConnWrapper) -> R + Send + 'static,
        R: Send + 'static,
    {
        match self {
            #[cfg(feature = "sqlite")]
            DbConnection::Sqlite(sqlite_obj) => {
                sqlite_obj
                    .interact(move |conn| {
                        let wrapper = AnyConnWrapper::Sqlite(conn);
                        Ok(f(wrapper))
                    })
                    .await?
            }
            #[cfg(feature = "postgres")]
            DbConnection::Postgres(_) => Err(SqlFluentError::Unimplemented(
                "interact_sync is not supported for Postgres; use interact_async instead"
                    .to_string(),
            )),
        }
    }
}
