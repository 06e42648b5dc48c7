use thiserror::Error;

#[cfg(feature = "sqlite")]
use deadpool_sqlite::rusqlite;

/// Error type covering configuration, parameter shaping, and execution
/// failures across every enabled backend.
#[derive(Debug, Error)]
pub enum SqlFluentError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error("Postgres pool error: {0}")]
    PoolErrorPostgres(#[from] deadpool_postgres::PoolError),

    #[cfg(feature = "sqlite")]
    #[error("SQLite pool error: {0}")]
    PoolErrorSqlite(#[from] deadpool_sqlite::PoolError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),

    #[error("Other database error: {0}")]
    Other(String),
}

impl SqlFluentError {
    /// Whether this error came from the database during prepare, bind, or
    /// execute. Only these errors are eligible for a retry verdict;
    /// configuration and parameter-shape errors always propagate directly.
    #[must_use]
    pub fn is_database_error(&self) -> bool {
        match self {
            #[cfg(feature = "postgres")]
            SqlFluentError::PostgresError(_) => true,
            #[cfg(feature = "sqlite")]
            SqlFluentError::SqliteError(_) => true,
            SqlFluentError::ExecutionError(_) => true,
            _ => false,
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<deadpool_sqlite::InteractError> for SqlFluentError {
    fn from(err: deadpool_sqlite::InteractError) -> Self {
        SqlFluentError::ConnectionError(format!("SQLite interact error: {err}"))
    }
}
