use crate::{
    db::{condition::ParamSet, response::Row, route::ShardId},
    error::BoxError,
    value::Value,
};

///
/// Connection
///
/// Driver-side handle to one shard. Pooling and reconnects are the
/// implementor's concern.
///

pub trait Connection: Send + Sync {
    /// Prepare `sql` for execution with named placeholders.
    fn prepare(&self, sql: &str) -> Result<Box<dyn Statement>, BoxError>;

    /// Render a value as a literal in this shard's dialect, for error
    /// messages and logs only.
    fn quote_literal(&self, value: &Value) -> String {
        value.to_sql_literal()
    }

    fn close(&self) {}
}

///
/// Statement
///

pub trait Statement: Send {
    fn query(&mut self, params: &ParamSet) -> Result<Vec<Row>, BoxError>;

    /// Run a write, returning the affected row count.
    fn execute(&mut self, params: &ParamSet) -> Result<u64, BoxError>;

    fn close(&mut self);
}

///
/// StatementGuard
/// Prepared statement that is closed when the guard drops, on every exit
/// path.
///

pub(crate) struct StatementGuard<'a> {
    pub(crate) shard: &'a ShardId,
    pub(crate) sql: &'a str,
    inner: Box<dyn Statement>,
}

impl<'a> StatementGuard<'a> {
    pub(crate) fn new(shard: &'a ShardId, sql: &'a str, inner: Box<dyn Statement>) -> Self {
        Self { shard, sql, inner }
    }

    pub(crate) fn statement(&mut self) -> &mut dyn Statement {
        self.inner.as_mut()
    }
}

impl Drop for StatementGuard<'_> {
    fn drop(&mut self) {
        self.inner.close();
    }
}
