//! Session façade: entity-typed reads and bulk writes routed across shards.

mod query;


use crate::{
    db::{
        command::ShardCommand,
        condition::{Condition, Expression, Operand, ParamSet},
        extract::KeyExtractor,
        query::{DeleteQuery, FanoutBuilder, InsertQuery, LogicalQuery, UpdateQuery},
        route::{RouteError, ShardPlan, ShardRegistry, ShardRouter},
    },
    error::InternalError,
    model::entity::EntityModel,
    traits::EntityKind,
    value::Value,
};
use std::sync::Arc;

// re-exports
pub use query::{ShardedQuery, ViaLink};

///
/// ShardSession
///
/// Entry point for routed queries. Holds the shared registry and the key
/// extraction settings; cheap to clone.
///

#[derive(Clone, Debug)]
pub struct ShardSession {
    registry: Arc<ShardRegistry>,
    extractor: KeyExtractor,
}

impl ShardSession {
    #[must_use]
    pub fn new(registry: Arc<ShardRegistry>) -> Self {
        Self {
            registry,
            extractor: KeyExtractor::default(),
        }
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: KeyExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &ShardRegistry {
        &self.registry
    }

    #[must_use]
    pub fn router(&self) -> ShardRouter<'_> {
        ShardRouter::new(&self.registry, self.extractor)
    }

    /// Start a read of `E`.
    #[must_use]
    pub fn query<E: EntityKind>(&self) -> ShardedQuery<'_, E> {
        ShardedQuery::new(self)
    }

    // ─── writes ───

    /// Insert one row on the shard its sharding column maps to.
    ///
    /// The sharding column must be present and non-empty.
    pub fn insert<E: EntityKind>(
        &self,
        values: impl IntoIterator<Item = (impl Into<String>, impl Into<Value>)>,
    ) -> Result<u64, InternalError> {
        let model = E::MODEL;
        let values: Vec<(String, Value)> = values
            .into_iter()
            .map(|(c, v)| (c.into(), v.into()))
            .collect();

        let key = model
            .sharding_value(&values)
            .ok_or_else(|| RouteError::MissingShardingValue {
                column: model.sharding_column.to_string(),
            })?;
        let plan = self.router().plan_for_key(model, key)?;

        let query = LogicalQuery::Insert(InsertQuery {
            table: model.table_ref(),
            values,
        });

        self.execute(model, &query, &ParamSet::new(), &plan)
    }

    /// Update every row matching `condition` on the shards it routes to.
    pub fn update_all<E: EntityKind>(
        &self,
        set: impl IntoIterator<Item = (impl Into<String>, impl Into<Operand>)>,
        condition: Condition,
        params: ParamSet,
    ) -> Result<u64, InternalError> {
        let set = set.into_iter().map(|(c, v)| (c.into(), v.into())).collect();

        self.update::<E>(set, condition, params)
    }

    /// Add `delta` to each named counter column of every matching row.
    ///
    /// Each counter renders as `[[column]] + :bpN`.
    pub fn update_all_counters<E: EntityKind>(
        &self,
        counters: impl IntoIterator<Item = (impl Into<String>, i64)>,
        condition: Condition,
        params: ParamSet,
    ) -> Result<u64, InternalError> {
        let set = counters
            .into_iter()
            .enumerate()
            .map(|(n, (column, delta))| {
                let column = column.into();
                let name = format!(":bp{n}");
                let expr = Expression::new(format!("[[{column}]] + {name}")).with_param(&name, delta);
                (column, Operand::Expr(expr))
            })
            .collect();

        self.update::<E>(set, condition, params)
    }

    /// Delete every row matching `condition` on the shards it routes to.
    pub fn delete_all<E: EntityKind>(
        &self,
        condition: Condition,
        params: ParamSet,
    ) -> Result<u64, InternalError> {
        let model = E::MODEL;
        let plan = self.router().plan(model, &condition, &params)?;
        let query = LogicalQuery::Delete(DeleteQuery {
            table: model.table_ref(),
            filter: condition,
        });

        self.execute(model, &query, &params, &plan)
    }

    /// Close every shard connection.
    pub fn close(&self) {
        for id in self.registry.shard_ids() {
            if let Some(backend) = self.registry.backend(id) {
                backend.connection.close();
            }
        }
    }

    fn update<E: EntityKind>(
        &self,
        set: Vec<(String, Operand)>,
        condition: Condition,
        params: ParamSet,
    ) -> Result<u64, InternalError> {
        let model = E::MODEL;
        let plan = self.router().plan(model, &condition, &params)?;
        let query = LogicalQuery::Update(UpdateQuery {
            table: model.table_ref(),
            set,
            filter: condition,
        });

        self.execute(model, &query, &params, &plan)
    }

    fn execute(
        &self,
        model: &'static EntityModel,
        query: &LogicalQuery,
        params: &ParamSet,
        plan: &ShardPlan,
    ) -> Result<u64, InternalError> {
        let statement = FanoutBuilder::new(&self.registry).build(query, params, plan)?;

        ShardCommand::new(&self.registry, statement)
            .for_entity(model.path)
            .execute()
    }
}
