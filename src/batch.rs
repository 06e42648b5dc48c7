use std::borrow::Cow;
use std::collections::HashMap;

use crate::error::SqlFluentError;
use crate::executor::execute_batch_rows_dispatch;
use crate::pool::DbConnection;
use crate::types::{SqlValue, UpdateResult};

/// Boxed positional row stream: one ordered value list per logical row.
pub type PositionalRows = Box<dyn Iterator<Item = Vec<SqlValue>> + Send + 'static>;
/// Boxed named row stream: one name-to-value mapping per logical row.
pub type NamedRows = Box<dyn Iterator<Item = HashMap<String, SqlValue>> + Send + 'static>;

/// The parameter stream feeding a batch: either positional or named, never
/// both. Finite, non-restartable, consumed exactly once by one batch run.
pub enum RowSource {
    Positional(PositionalRows),
    Named(NamedRows),
}

impl RowSource {
    pub fn positional<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = Vec<SqlValue>>,
        I::IntoIter: Send + 'static,
    {
        RowSource::Positional(Box::new(rows.into_iter()))
    }

    pub fn named<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = HashMap<String, SqlValue>>,
        I::IntoIter: Send + 'static,
    {
        RowSource::Named(Box::new(rows.into_iter()))
    }

    pub(crate) fn is_named(&self) -> bool {
        matches!(self, RowSource::Named(_))
    }

    /// Pull the next logical row, resolved to placeholder order. Positional
    /// rows pass through as-is; named rows are re-ordered into `placeholders`
    /// order, one value per slot (a name appearing twice is looked up twice).
    /// Extra keys in a mapping are ignored.
    ///
    /// # Errors
    /// Returns `SqlFluentError::ParameterError` if a named row has no value
    /// for a required placeholder. The row never reaches the statement.
    pub(crate) fn next_ordered(
        &mut self,
        placeholders: Option<&[String]>,
    ) -> Result<Option<Vec<SqlValue>>, SqlFluentError> {
        match self {
            RowSource::Positional(rows) => Ok(rows.next()),
            RowSource::Named(rows) => {
                let Some(mapping) = rows.next() else {
                    return Ok(None);
                };
                let names = placeholders.unwrap_or(&[]);
                let mut ordered = Vec::with_capacity(names.len());
                for name in names {
                    let value = mapping.get(name).cloned().ok_or_else(|| {
                        SqlFluentError::ParameterError(format!(
                            "no value provided for named parameter :{name}"
                        ))
                    })?;
                    ordered.push(value);
                }
                Ok(Some(ordered))
            }
        }
    }
}

/// Per-run flush bookkeeping: buffers bound rows until a flush is due and
/// aggregates per-row outcomes in input order. Owned exclusively by one
/// executing batch call.
pub(crate) struct BatchAccumulator<P> {
    batch_size: Option<usize>,
    appended: usize,
    pending: Vec<P>,
    results: Vec<UpdateResult>,
    flushes: usize,
}

impl<P> BatchAccumulator<P> {
    pub(crate) fn new(batch_size: Option<usize>) -> Self {
        Self {
            batch_size,
            appended: 0,
            pending: Vec::new(),
            results: Vec::new(),
            flushes: 0,
        }
    }

    pub(crate) fn append(&mut self, row: P) {
        self.pending.push(row);
        self.appended += 1;
    }

    /// Whether the row just appended landed on a flush boundary. Without a
    /// configured batch size nothing is due until the final flush.
    pub(crate) fn flush_due(&self) -> bool {
        match self.batch_size {
            Some(size) => self.appended % size == 0,
            None => false,
        }
    }

    /// Drain the pending buffer for execution. An empty buffer stays a no-op
    /// and is not counted as a flush.
    pub(crate) fn take_pending(&mut self) -> Vec<P> {
        if !self.pending.is_empty() {
            self.flushes += 1;
        }
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn record(&mut self, result: UpdateResult) {
        self.results.push(result);
    }

    pub(crate) fn flushes(&self) -> usize {
        self.flushes
    }

    pub(crate) fn into_results(self) -> Vec<UpdateResult> {
        self.results
    }
}

/// Fluent configuration for one batched statement execution.
///
/// Built from [`DbConnection::batch`], fed exactly one row source, and
/// consumed by [`run`](BatchQuery::run):
/// ```rust,no_run
/// use sql_fluent::prelude::*;
///
/// # async fn demo(conn: &mut DbConnection) -> Result<(), SqlFluentError> {
/// let rows = (0..100)
///     .map(|i| vec![SqlValue::Int(i), SqlValue::Text(format!("name_{i}"))])
///     .collect::<Vec<_>>();
/// let results = conn
///     .batch("INSERT INTO t (id, name) VALUES (?1, ?2)")
///     .rows(rows)?
///     .batch_size(50)?
///     .run()
///     .await?;
/// assert_eq!(results.len(), 100);
/// # Ok(()) }
/// ```
pub struct BatchQuery<'conn, 'q> {
    conn: &'conn mut DbConnection,
    sql: Cow<'q, str>,
    source: Option<RowSource>,
    batch_size: Option<usize>,
}

impl std::fmt::Debug for BatchQuery<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchQuery")
            .field("conn", &self.conn)
            .field("sql", &self.sql)
            .field("source", &self.source.as_ref().map(|_| "<RowSource>"))
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl<'conn, 'q> BatchQuery<'conn, 'q> {
    pub(crate) fn new(conn: &'conn mut DbConnection, sql: &'q str) -> Self {
        Self {
            conn,
            sql: Cow::Borrowed(sql),
            source: None,
            batch_size: None,
        }
    }

    /// Supply positional rows, one ordered value list per logical row.
    ///
    /// # Errors
    /// Returns `SqlFluentError::ConfigError` if named rows are already set.
    pub fn rows<I>(mut self, rows: I) -> Result<Self, SqlFluentError>
    where
        I: IntoIterator<Item = Vec<SqlValue>>,
        I::IntoIter: Send + 'static,
    {
        if matches!(self.source, Some(RowSource::Named(_))) {
            return Err(SqlFluentError::ConfigError(
                "positional parameters can't be set if named parameters are already set"
                    .to_string(),
            ));
        }
        self.source = Some(RowSource::positional(rows));
        Ok(self)
    }

    /// Supply named rows, one name-to-value mapping per logical row. The SQL
    /// text must use `:name` markers.
    ///
    /// # Errors
    /// Returns `SqlFluentError::ConfigError` if positional rows are already
    /// set.
    pub fn named_rows<I>(mut self, rows: I) -> Result<Self, SqlFluentError>
    where
        I: IntoIterator<Item = HashMap<String, SqlValue>>,
        I::IntoIter: Send + 'static,
    {
        if matches!(self.source, Some(RowSource::Positional(_))) {
            return Err(SqlFluentError::ConfigError(
                "named parameters can't be set if positional parameters are already set"
                    .to_string(),
            ));
        }
        self.source = Some(RowSource::named(rows));
        Ok(self)
    }

    /// Flush the pending batch every `batch_size` rows. Without this, the
    /// whole batch is flushed once, at the end.
    ///
    /// # Errors
    /// Returns `SqlFluentError::ConfigError` if `batch_size` is zero.
    pub fn batch_size(mut self, batch_size: usize) -> Result<Self, SqlFluentError> {
        if batch_size == 0 {
            return Err(SqlFluentError::ConfigError(
                "batch size must be greater than 0".to_string(),
            ));
        }
        self.batch_size = Some(batch_size);
        Ok(self)
    }

    /// Execute the batch and return one [`UpdateResult`] per logical row, in
    /// input order.
    ///
    /// # Errors
    /// Returns `SqlFluentError::ConfigError` if no row source was supplied,
    /// `SqlFluentError::ParameterError` for a named row missing a required
    /// value, or the backend's error if the database rejects a prepare or
    /// flush.
    pub async fn run(self) -> Result<Vec<UpdateResult>, SqlFluentError> {
        let Some(source) = self.source else {
            return Err(SqlFluentError::ConfigError(
                "parameters must be set to run a batch query".to_string(),
            ));
        };
        execute_batch_rows_dispatch(self.conn, self.sql.as_ref(), source, self.batch_size).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive_accumulator(n: usize, batch_size: Option<usize>) -> (usize, usize) {
        let mut batch: BatchAccumulator<usize> = BatchAccumulator::new(batch_size);
        for i in 0..n {
            batch.append(i);
            if batch.flush_due() {
                for _ in batch.take_pending() {
                    batch.record(UpdateResult { rows_affected: 1 });
                }
            }
        }
        for _ in batch.take_pending() {
            batch.record(UpdateResult { rows_affected: 1 });
        }
        let flushes = batch.flushes();
        (batch.into_results().len(), flushes)
    }

    #[test]
    fn flush_count_is_ceil_of_rows_over_batch_size() {
        for (n, t) in [(7usize, 2usize), (6, 2), (6, 3), (1, 5), (10, 10), (9, 4)] {
            let (results, flushes) = drive_accumulator(n, Some(t));
            assert_eq!(results, n);
            assert_eq!(flushes, n.div_ceil(t), "n={n} t={t}");
        }
    }

    #[test]
    fn no_batch_size_means_one_trailing_flush() {
        let (results, flushes) = drive_accumulator(42, None);
        assert_eq!(results, 42);
        assert_eq!(flushes, 1);
    }

    #[test]
    fn empty_source_never_flushes() {
        let (results, flushes) = drive_accumulator(0, Some(3));
        assert_eq!(results, 0);
        assert_eq!(flushes, 0);
    }

    #[test]
    fn named_rows_resolve_into_placeholder_order() {
        let row = HashMap::from([
            ("b".to_string(), SqlValue::Int(2)),
            ("a".to_string(), SqlValue::Int(1)),
        ]);
        let mut source = RowSource::named(vec![row]);
        let names = vec!["a".to_string(), "b".to_string()];
        let ordered = source.next_ordered(Some(&names)).unwrap().unwrap();
        assert_eq!(ordered, vec![SqlValue::Int(1), SqlValue::Int(2)]);
        assert!(source.next_ordered(Some(&names)).unwrap().is_none());
    }

    #[test]
    fn named_row_missing_a_placeholder_is_a_parameter_error() {
        let row = HashMap::from([("a".to_string(), SqlValue::Int(1))]);
        let mut source = RowSource::named(vec![row]);
        let names = vec!["a".to_string(), "b".to_string()];
        let err = source.next_ordered(Some(&names)).unwrap_err();
        assert!(matches!(err, SqlFluentError::ParameterError(_)));
        assert!(!err.is_database_error());
    }

    #[test]
    fn named_row_extra_keys_are_ignored() {
        let row = HashMap::from([
            ("a".to_string(), SqlValue::Int(1)),
            ("unused".to_string(), SqlValue::Text("x".into())),
        ]);
        let mut source = RowSource::named(vec![row]);
        let names = vec!["a".to_string()];
        let ordered = source.next_ordered(Some(&names)).unwrap().unwrap();
        assert_eq!(ordered, vec![SqlValue::Int(1)]);
    }

    #[test]
    fn duplicate_placeholder_names_bind_once_per_slot() {
        let row = HashMap::from([("x".to_string(), SqlValue::Int(7))]);
        let mut source = RowSource::named(vec![row]);
        let names = vec!["x".to_string(), "x".to_string()];
        let ordered = source.next_ordered(Some(&names)).unwrap().unwrap();
        assert_eq!(ordered, vec![SqlValue::Int(7), SqlValue::Int(7)]);
    }
}
