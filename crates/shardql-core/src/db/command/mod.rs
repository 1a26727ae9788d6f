//! Multi-shard command execution.
//!
//! Every shard statement is prepared before any executes; shards then run
//! one at a time in plan order. The first failure aborts the remaining
//! shards with no rollback of those that already ran.

mod connection;


use crate::{
    db::{
        condition::ParamSet,
        extract::render_sql,
        query::{CompiledStatement, ReadKind, check_cross_shard},
        response::Row,
        route::{RouteError, ShardId, ShardRegistry},
    },
    error::{BoxError, ErrorClass, ErrorOrigin, InternalError},
    obs::sink::{self, ExecKind, MetricsEvent, Span},
    value::{Float64, Value},
};

// re-exports
pub use connection::{Connection, Statement};

use connection::StatementGuard;

///
/// ShardCommand
///

#[derive(Debug)]
pub struct ShardCommand<'a> {
    registry: &'a ShardRegistry,
    statement: CompiledStatement,
    entity_path: &'static str,
}

impl<'a> ShardCommand<'a> {
    #[must_use]
    pub const fn new(registry: &'a ShardRegistry, statement: CompiledStatement) -> Self {
        Self {
            registry,
            statement,
            entity_path: "",
        }
    }

    /// Attribute metrics to an entity path.
    #[must_use]
    pub const fn for_entity(mut self, entity_path: &'static str) -> Self {
        self.entity_path = entity_path;
        self
    }

    #[must_use]
    pub const fn statement(&self) -> &CompiledStatement {
        &self.statement
    }

    /// Per-shard SQL with bindings substituted using each shard's quoting.
    pub fn raw_sql(&self) -> Result<Vec<(ShardId, String)>, InternalError> {
        self.statement
            .statements
            .iter()
            .map(|s| Ok((s.shard.clone(), self.render(&s.shard, &s.sql)?)))
            .collect()
    }

    // ─── reads ───

    /// Rows from every shard, concatenated in shard order.
    pub fn query_all(&self) -> Result<Vec<Row>, InternalError> {
        self.check_policy(ReadKind::Rows)?;

        let mut span = Span::new(ExecKind::Read, self.entity_path);
        let mut rows = Vec::new();
        self.run(|guard, params| {
            let batch = guard.statement().query(params)?;
            tracing::debug!(shard = %guard.shard, rows = batch.len(), "shard query finished");
            rows.extend(batch);
            Ok(())
        })?;
        span.set_rows(count(rows.len()));

        Ok(rows)
    }

    /// First row in shard order.
    pub fn query_one(&self) -> Result<Option<Row>, InternalError> {
        Ok(self.query_all()?.into_iter().next())
    }

    /// Sum of the first column of each shard's first row.
    ///
    /// Shards returning no row or NULL contribute nothing; the sum stays an
    /// integer unless a shard returns a float.
    pub fn query_scalar(&self) -> Result<Value, InternalError> {
        self.check_policy(ReadKind::Scalar)?;

        let mut span = Span::new(ExecKind::Read, self.entity_path);
        let mut sum = ScalarSum::default();
        self.run(|guard, params| {
            let rows = guard.statement().query(params)?;
            if let Some(value) = rows.first().and_then(Row::first_value) {
                sum.add(guard.shard, value)?;
            }
            Ok(())
        })?;
        span.set_rows(1);

        sum.finish()
    }

    // ─── writes ───

    /// Run a write on every shard, returning the summed affected count.
    pub fn execute(&self) -> Result<u64, InternalError> {
        if self.statement.statements.is_empty() {
            return Ok(0);
        }

        let mut span = Span::new(ExecKind::Write, self.entity_path);
        let mut affected: u64 = 0;
        self.run(|guard, params| {
            let n = guard.statement().execute(params)?;
            tracing::debug!(shard = %guard.shard, affected = n, "shard write finished");
            affected = affected.saturating_add(n);
            Ok(())
        })?;
        span.set_rows(affected);

        Ok(affected)
    }

    // ─── internals ───

    fn check_policy(&self, read: ReadKind) -> Result<(), InternalError> {
        check_cross_shard(self.statement.shape, read, self.statement.shard_count()).map_err(|err| {
            sink::record(MetricsEvent::PolicyRejected {
                entity_path: self.entity_path,
            });
            tracing::debug!(error = %err, "cross-shard read rejected");
            err.into()
        })
    }

    // Prepare every shard, then execute each in order. Guards close every
    // prepared statement however this returns.
    fn run(
        &self,
        mut step: impl FnMut(&mut StatementGuard<'_>, &ParamSet) -> Result<(), BoxError>,
    ) -> Result<(), InternalError> {
        let mut guards = Vec::with_capacity(self.statement.statements.len());

        for shard_sql in &self.statement.statements {
            let backend = self.registry.backend(&shard_sql.shard).ok_or_else(|| {
                RouteError::UnknownBackend {
                    shard: shard_sql.shard.clone(),
                }
            })?;

            let prepared = backend
                .connection
                .prepare(&shard_sql.sql)
                .map_err(|cause| self.failure(&shard_sql.shard, &shard_sql.sql, cause))?;
            guards.push(StatementGuard::new(&shard_sql.shard, &shard_sql.sql, prepared));
        }

        for guard in &mut guards {
            let params = self.statement.params.clone();
            tracing::debug!(shard = %guard.shard, sql = guard.sql, "executing shard statement");
            sink::record(MetricsEvent::ShardStatement {
                entity_path: self.entity_path,
            });

            if let Err(cause) = step(guard, &params) {
                return Err(self.failure(guard.shard, guard.sql, cause));
            }
        }

        Ok(())
    }

    fn failure(&self, shard: &ShardId, sql: &str, cause: BoxError) -> InternalError {
        let rendered = self.render(shard, sql).unwrap_or_else(|_| sql.to_string());

        tracing::warn!(shard = %shard, sql = %rendered, error = %cause, "shard statement failed");
        sink::record(MetricsEvent::ShardFailure {
            entity_path: self.entity_path,
        });

        InternalError::execution(shard.clone(), rendered, cause)
    }

    fn render(&self, shard: &ShardId, sql: &str) -> Result<String, RouteError> {
        let backend = self
            .registry
            .backend(shard)
            .ok_or_else(|| RouteError::UnknownBackend {
                shard: shard.clone(),
            })?;

        Ok(render_sql(sql, &self.statement.params, |value| {
            backend.connection.quote_literal(value)
        }))
    }
}

fn count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

///
/// ScalarSum
///

#[derive(Debug, Default)]
enum ScalarSum {
    #[default]
    Empty,
    Int(i64),
    Float(f64),
}

impl ScalarSum {
    fn add(&mut self, shard: &ShardId, value: &Value) -> Result<(), BoxError> {
        let next = match (&*self, value) {
            (_, Value::Null) => return Ok(()),
            (Self::Float(acc), v) => Self::Float(acc + as_f64(shard, v)?),
            (_, Value::Float64(f)) => Self::Float(self.as_f64() + f.get()),
            (acc, v) => {
                let n = v
                    .as_i64()
                    .filter(|_| !matches!(v, Value::Bool(_)))
                    .ok_or_else(|| non_numeric(shard))?;
                match acc {
                    Self::Int(total) => match total.checked_add(n) {
                        Some(sum) => Self::Int(sum),
                        #[allow(clippy::cast_precision_loss)]
                        None => Self::Float(*total as f64 + n as f64),
                    },
                    _ => Self::Int(n),
                }
            }
        };
        *self = next;

        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    const fn as_f64(&self) -> f64 {
        match self {
            Self::Empty => 0.0,
            Self::Int(n) => *n as f64,
            Self::Float(f) => *f,
        }
    }

    fn finish(self) -> Result<Value, InternalError> {
        match self {
            Self::Empty => Ok(Value::Int(0)),
            Self::Int(n) => Ok(Value::Int(n)),
            Self::Float(f) => Float64::try_new(f).map(Value::Float64).ok_or_else(|| {
                InternalError::new(
                    ErrorClass::Execution,
                    ErrorOrigin::Command,
                    "scalar sum across shards is not finite",
                )
            }),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_f64(shard: &ShardId, value: &Value) -> Result<f64, BoxError> {
    match value {
        Value::Float64(f) => Ok(f.get()),
        Value::Bool(_) => Err(non_numeric(shard)),
        other => other
            .as_i64()
            .map(|n| n as f64)
            .ok_or_else(|| non_numeric(shard)),
    }
}

fn non_numeric(shard: &ShardId) -> BoxError {
    format!("scalar result from shard '{shard}' is not numeric").into()
}
