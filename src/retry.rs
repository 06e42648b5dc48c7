use std::future::Future;

use crate::error::SqlFluentError;
use crate::pool::{DbConnection, FluentDb};

/// The only non-error outcome of [`SqlErrorHandler::handle`]: re-run the
/// whole unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryVerdict {
    Retry,
}

/// Decides what happens after a database-level error: return
/// [`RetryVerdict::Retry`] to re-run the unit of work, or return `Err` (the
/// original error or a wrapped one) to propagate to the caller.
///
/// The handler owns all retry-limiting policy — delay, attempt caps, circuit
/// breaking. [`RetryingExecutor`] imposes no cap of its own and will keep
/// retrying as long as the handler says so.
pub trait SqlErrorHandler {
    /// # Errors
    /// The returned error propagates verbatim to the caller of
    /// [`RetryingExecutor::run`].
    fn handle(
        &mut self,
        error: SqlFluentError,
        sql: Option<&str>,
    ) -> Result<RetryVerdict, SqlFluentError>;
}

/// Runs a unit of work against a freshly acquired connection, consulting the
/// error handler on database errors.
///
/// Each attempt gets a new connection, statement, and batch state; retry
/// re-runs the work closure from scratch, never mid-batch. If earlier chunks
/// of a chunked batch were already flushed before the failure, a retry
/// re-executes them — callers needing exactly-once semantics should flush
/// once (no batch size) or wrap the work in an external transaction.
///
/// ```rust,no_run
/// use sql_fluent::prelude::*;
///
/// struct GiveUp;
/// impl SqlErrorHandler for GiveUp {
///     fn handle(
///         &mut self,
///         error: SqlFluentError,
///         _sql: Option<&str>,
///     ) -> Result<RetryVerdict, SqlFluentError> {
///         Err(error)
///     }
/// }
///
/// # async fn demo(db: FluentDb) -> Result<(), SqlFluentError> {
/// let sql = "INSERT INTO t (id) VALUES (?1)";
/// let mut executor = RetryingExecutor::new(&db, GiveUp);
/// let results = executor
///     .run(Some(sql), |mut conn| async move {
///         let rows = (0..10).map(|i| vec![SqlValue::Int(i)]).collect::<Vec<_>>();
///         conn.batch(sql).rows(rows)?.batch_size(4)?.run().await
///     })
///     .await?;
/// assert_eq!(results.len(), 10);
/// # Ok(()) }
/// ```
pub struct RetryingExecutor<'db, H> {
    db: &'db FluentDb,
    handler: H,
}

impl<'db, H: SqlErrorHandler> RetryingExecutor<'db, H> {
    pub fn new(db: &'db FluentDb, handler: H) -> Self {
        Self { db, handler }
    }

    #[must_use]
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Execute `work` until it succeeds or the handler declines to retry.
    ///
    /// `sql` is context for the handler: the statement text when the unit of
    /// work runs one, `None` when the work bypasses the fluent layer (e.g.
    /// raw `interact_sync` usage). Configuration and parameter-shape errors
    /// propagate immediately without consulting the handler, as does a pool
    /// acquisition failure.
    ///
    /// # Errors
    /// Whatever the handler returned as `Err`, or any non-database error
    /// from `work`, or a pool error from connection acquisition.
    pub async fn run<T, F, Fut>(&mut self, sql: Option<&str>, work: F) -> Result<T, SqlFluentError>
    where
        F: Fn(DbConnection) -> Fut,
        Fut: Future<Output = Result<T, SqlFluentError>>,
    {
        let mut attempt: u32 = 1;
        loop {
            let conn = self.db.get_connection().await?;
            match work(conn).await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_database_error() => {
                    let RetryVerdict::Retry = self.handler.handle(error, sql)?;
                    attempt += 1;
                    tracing::debug!(attempt, "error handler requested retry of unit of work");
                }
                Err(error) => return Err(error),
            }
        }
    }
}
