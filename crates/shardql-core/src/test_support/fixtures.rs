use crate::{
    db::{
        query::{Dialect, GenericSqlCompiler},
        route::{HashCoordinator, RangeCoordinator, ShardDescriptor, ShardRegistry},
    },
    model::entity::EntityModel,
    test_support::memory::MemoryShard,
    traits::EntityKind,
};
use std::sync::Arc;

///
/// Order
/// Range-routed by `region_id`: 1..=99 on db0, 100..=199 on db1,
/// 200..=299 on db2.
///

pub(crate) struct Order;

impl EntityKind for Order {
    const MODEL: &'static EntityModel = &EntityModel {
        path: "test_support::Order",
        table: "order",
        primary_key: &["id"],
        sharding_column: "region_id",
        sharding_type: "region",
    };
}

///
/// Account
/// Hash-routed by `id`.
///

pub(crate) struct Account;

impl EntityKind for Account {
    const MODEL: &'static EntityModel = &EntityModel {
        path: "test_support::Account",
        table: "account",
        primary_key: &["id"],
        sharding_column: "id",
        sharding_type: "account",
    };
}

/// Three in-memory shards `db0..db2` wired to both sharding types.
pub(crate) fn registry(shards: &[MemoryShard; 3]) -> Arc<ShardRegistry> {
    let mut registry = ShardRegistry::new()
        .with_descriptor(ShardDescriptor::new("region", ["db0", "db1", "db2"], "range"))
        .with_descriptor(ShardDescriptor::new("account", ["db0", "db1", "db2"], "hash"))
        .with_coordinator("hash", HashCoordinator)
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
            shard.connection(),
            Arc::new(GenericSqlCompiler::new(Dialect::Ansi)),
        );
    }

    Arc::new(registry)
}

pub(crate) fn shards() -> [MemoryShard; 3] {
    [MemoryShard::new(), MemoryShard::new(), MemoryShard::new()]
}
