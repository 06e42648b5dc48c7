//! Convenient imports for common functionality.

pub use crate::batch::{BatchQuery, RowSource};
pub use crate::error::SqlFluentError;
pub use crate::named::{NamedTransformedSql, PlaceholderStyle, transform_named};
pub use crate::pool::{AnyConnWrapper, DbConnection, FluentDb, FluentPool};
pub use crate::results::{DbRow, ResultSet};
pub use crate::retry::{RetryVerdict, RetryingExecutor, SqlErrorHandler};
pub use crate::types::{DatabaseType, SqlValue, UpdateResult};

#[cfg(feature = "postgres")]
pub use crate::PostgresParams;
#[cfg(feature = "postgres")]
pub use crate::postgres_build_result_set;

#[cfg(feature = "sqlite")]
pub use crate::sqlite_build_result_set;
#[cfg(feature = "sqlite")]
pub use crate::sqlite_convert_params;
