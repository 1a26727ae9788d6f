//! Core runtime for shardql: conditions, key extraction, shard routing,
//! per-shard compilation, fan-out execution, and result merging.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod db;
pub mod error;
pub mod model;
pub mod obs;
pub mod traits;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, connections, compilers, or registries are re-exported here.
///

pub mod prelude {
    pub use crate::{
        db::{
            ShardSession,
            condition::{Condition, Expression, Operand, ParamSet},
            query::{JoinKind, SortDirection},
            response::Row,
            route::ShardId,
        },
        model::entity::EntityModel,
        traits::EntityKind,
        value::Value,
    };
}
