use crate::{
    db::{
        condition::ParamSet,
        query::logical::{LogicalQuery, QueryShape, StatementKind},
        route::{RouteError, ShardId, ShardPlan, ShardRegistry},
    },
    error::{ErrorOrigin, InternalError},
};

///
/// ShardSql
/// One shard's compiled SQL text.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ShardSql {
    pub shard: ShardId,
    pub sql: String,
}

///
/// CompiledStatement
///
/// Per-shard SQL in plan order plus the bindings every shard shares.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompiledStatement {
    pub statements: Vec<ShardSql>,
    pub params: ParamSet,
    pub shape: QueryShape,
    pub kind: StatementKind,
}

impl CompiledStatement {
    #[must_use]
    pub const fn shard_count(&self) -> usize {
        self.statements.len()
    }

    #[must_use]
    pub fn sql_for(&self, shard: &ShardId) -> Option<&str> {
        self.statements
            .iter()
            .find(|s| &s.shard == shard)
            .map(|s| s.sql.as_str())
    }
}

///
/// FanoutBuilder
///
/// Compiles one logical query once per planned shard with that shard's
/// compiler.
///

#[derive(Clone, Copy, Debug)]
pub struct FanoutBuilder<'a> {
    registry: &'a ShardRegistry,
}

impl<'a> FanoutBuilder<'a> {
    #[must_use]
    pub const fn new(registry: &'a ShardRegistry) -> Self {
        Self { registry }
    }

    /// Compile `query` for every shard in `plan`.
    ///
    /// The first shard's bindings become the shared `ParamSet`. Every other
    /// shard compiles from a fresh copy of `params` and must reproduce those
    /// bindings exactly.
    pub fn build(
        &self,
        query: &LogicalQuery,
        params: &ParamSet,
        plan: &ShardPlan,
    ) -> Result<CompiledStatement, InternalError> {
        let mut statements = Vec::with_capacity(plan.len());
        let mut shared: Option<ParamSet> = None;

        for shard in plan {
            let backend = self
                .registry
                .backend(shard)
                .ok_or_else(|| RouteError::UnknownBackend {
                    shard: shard.clone(),
                })?;

            let mut local = params.clone();
            let sql = backend.compiler.compile(query, &mut local)?;

            match &shared {
                None => shared = Some(local),
                Some(first) if *first != local => {
                    return Err(InternalError::invariant(
                        ErrorOrigin::Build,
                        format!("shard '{shard}' compiled bindings that differ from the first shard"),
                    ));
                }
                Some(_) => {}
            }

            tracing::debug!(shard = %shard, sql = %sql, "compiled shard statement");
            statements.push(ShardSql {
                shard: shard.clone(),
                sql,
            });
        }

        let Some(params) = shared else {
            return Err(RouteError::EmptyPlan.into());
        };

        Ok(CompiledStatement {
            statements,
            params,
            shape: query.shape(),
            kind: query.kind(),
        })
    }
}
