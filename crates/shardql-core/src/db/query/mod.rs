//! Logical queries, per-shard compilation, and fan-out.

mod compile;
mod fanout;
mod logical;
mod policy;

#[cfg(test)]
mod tests;

// re-exports
pub use compile::{CompileError, Dialect, GenericSqlCompiler, SqlCompiler};
pub use fanout::{CompiledStatement, FanoutBuilder, ShardSql};
pub use logical::{
    DeleteQuery, InsertQuery, Join, JoinKind, LogicalQuery, QueryShape, SelectQuery,
    SortDirection, StatementKind, Union, UnionSource, UpdateQuery,
};
pub use policy::{CrossShardPolicyError, ReadKind, UnmergeableFeature, check_cross_shard};
