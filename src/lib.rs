//! Fluent batched SQL execution over `tokio-postgres` and `rusqlite`.
//!
//! The core of the crate is the batch engine: feed a statement either
//! positional rows or named rows ([`BatchQuery::rows`] /
//! [`BatchQuery::named_rows`]), optionally set a flush size, and `run()` the
//! batch to get one ordered [`UpdateResult`] per logical row. Named markers
//! (`:name`) are rewritten once per batch into the backend's positional
//! placeholders by [`named::transform_named`].
//!
//! On top of that, [`RetryingExecutor`] runs a unit of work against a freshly
//! acquired pool connection and consults a caller-supplied
//! [`SqlErrorHandler`] when the database errors, retrying the whole unit of
//! work for as long as the handler keeps answering
//! [`RetryVerdict::Retry`].

mod batch;
mod error;
mod executor;
pub mod named;
mod pool;
mod results;
mod retry;
mod types;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub mod prelude;

pub use batch::{BatchQuery, NamedRows, PositionalRows, RowSource};
pub use error::SqlFluentError;
pub use named::{NamedTransformedSql, PlaceholderStyle, transform_named};
pub use pool::{AnyConnWrapper, DbConnection, FluentDb, FluentPool};
pub use results::{DbRow, ResultSet};
pub use retry::{RetryVerdict, RetryingExecutor, SqlErrorHandler};
pub use types::{DatabaseType, SqlValue, UpdateResult};

#[cfg(feature = "postgres")]
pub use postgres::Params as PostgresParams;
#[cfg(feature = "postgres")]
pub use postgres::build_result_set as postgres_build_result_set;

#[cfg(feature = "sqlite")]
pub use sqlite::build_result_set as sqlite_build_result_set;
#[cfg(feature = "sqlite")]
pub use sqlite::convert_params as sqlite_convert_params;
