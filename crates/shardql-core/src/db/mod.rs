//! Query routing pipeline.
//!
//! A read or write flows `session` → `route` (via `extract`) → `query`
//! (per-shard compilation) → `command` (execution) → `response` (merge).

pub mod command;
pub mod condition;
pub mod extract;
pub mod query;
pub mod response;
pub mod route;
pub mod session;

// re-exports
pub use session::{ShardSession, ShardedQuery, ViaLink};
