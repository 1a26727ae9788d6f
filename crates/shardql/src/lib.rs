//! ## Crate layout
//! - `core`: conditions, key extraction, routing, fan-out, and merging.
//! - `config`: TOML loading for sharding types and backends.
//! - `error`: the public, serializable error type.
//!
//! The `prelude` module carries the vocabulary application code needs to
//! describe entities and run routed queries.

pub use shardql_config as config;
pub use shardql_core as core;

pub mod error;

pub use error::Error;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        config::Config,
        core::{
            db::{
                ShardSession, ShardedQuery, ViaLink,
                command::{Connection, Statement},
                query::{Dialect, GenericSqlCompiler},
                route::{HashCoordinator, RangeCoordinator, ShardDescriptor, ShardRegistry},
            },
            prelude::*,
        },
        error::{Error, ErrorKind},
    };
}
