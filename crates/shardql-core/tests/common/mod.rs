use shardql_core::{
    db::{
        command::{Connection, Statement},
        condition::ParamSet,
        query::{Dialect, GenericSqlCompiler},
        response::Row,
        route::{RangeCoordinator, ShardDescriptor, ShardRegistry},
        ShardSession,
    },
    error::BoxError,
    model::entity::EntityModel,
    traits::EntityKind,
};
use std::sync::{Arc, Mutex};

///
/// Order
/// Range-routed: 1..=99 on db0, 100..=199 on db1, 200..=299 on db2.
///

pub struct Order;

impl EntityKind for Order {
    const MODEL: &'static EntityModel = &EntityModel {
        path: "tests::Order",
        table: "order",
        primary_key: &["id"],
        sharding_column: "region_id",
        sharding_type: "region",
    };
}

///
/// FakeShard
/// Returns canned rows or affected counts and logs what it ran.
///

#[derive(Clone, Default)]
pub struct FakeShard {
    inner: Arc<Mutex<FakeState>>,
}

#[derive(Default)]
struct FakeState {
    rows: Vec<Row>,
    affected: u64,
    fail: Option<String>,
    log: Vec<String>,
}

#[allow(dead_code)]
impl FakeShard {
    pub fn rows(rows: Vec<Row>) -> Self {
        let shard = Self::default();
        shard.inner.lock().unwrap().rows = rows;
        shard
    }

    pub fn affected(n: u64) -> Self {
        let shard = Self::default();
        shard.inner.lock().unwrap().affected = n;
        shard
    }

    pub fn failing(message: &str) -> Self {
        let shard = Self::default();
        shard.inner.lock().unwrap().fail = Some(message.to_string());
        shard
    }

    pub fn log(&self) -> Vec<String> {
        self.inner.lock().unwrap().log.clone()
    }
}

impl Connection for FakeShard {
    fn prepare(&self, sql: &str) -> Result<Box<dyn Statement>, BoxError> {
        self.inner.lock().unwrap().log.push(sql.to_string());

        Ok(Box::new(FakeStatement(self.clone())))
    }
}

struct FakeStatement(FakeShard);

impl FakeStatement {
    fn check(&self) -> Result<(), BoxError> {
        match &self.0.inner.lock().unwrap().fail {
            Some(message) => Err(message.clone().into()),
            None => Ok(()),
        }
    }
}

impl Statement for FakeStatement {
    fn query(&mut self, _: &ParamSet) -> Result<Vec<Row>, BoxError> {
        self.check()?;
        Ok(self.0.inner.lock().unwrap().rows.clone())
    }

    fn execute(&mut self, _: &ParamSet) -> Result<u64, BoxError> {
        self.check()?;
        Ok(self.0.inner.lock().unwrap().affected)
    }

    fn close(&mut self) {}
}

/// Session over three fake shards `db0..db2`.
pub fn session(shards: &[FakeShard; 3]) -> ShardSession {
    let mut registry = ShardRegistry::new()
        .with_descriptor(ShardDescriptor::new("region", ["db0", "db1", "db2"], "range"))
        .with_coordinator(
            "range",
            RangeCoordinator::new()
                .range(1, 99, "db0")
                .range(100, 199, "db1")
                .range(200, 299, "db2"),
        );
    for (n, shard) in shards.iter().enumerate() {
        registry = registry.with_backend(
            format!("db{n}"),
            Arc::new(shard.clone()),
            Arc::new(GenericSqlCompiler::new(Dialect::Ansi)),
        );
    }

    ShardSession::new(Arc::new(registry))
}
