//! Shard routing: descriptors, coordinators, the backend registry, and the
//! router that turns a condition into a `ShardPlan`.

mod coordinator;
mod descriptor;
mod registry;
mod router;


use crate::error::{ErrorClass, ErrorOrigin, InternalError};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

// re-exports
pub use coordinator::{HashCoordinator, RangeCoordinator, ShardCoordinator, ShardResolution};
pub use descriptor::ShardDescriptor;
pub use registry::{ShardBackend, ShardRegistry};
pub use router::ShardRouter;

///
/// ShardId
/// Stable name of one physical shard.
///

#[derive(
    Clone, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(transparent)]
pub struct ShardId(String);

impl ShardId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ShardId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ShardId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&Self> for ShardId {
    fn from(id: &Self) -> Self {
        id.clone()
    }
}

///
/// ShardPlan
///
/// Resolved shard set for one statement: non-empty, duplicate-free, and in
/// the order shards will be executed.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ShardPlan {
    shards: Vec<ShardId>,
}

impl ShardPlan {
    /// Build a plan, dropping repeats while keeping first-seen order.
    pub fn new(shards: impl IntoIterator<Item = impl Into<ShardId>>) -> Result<Self, RouteError> {
        let mut unique: Vec<ShardId> = Vec::new();
        for shard in shards {
            let shard = shard.into();
            if !unique.contains(&shard) {
                unique.push(shard);
            }
        }

        if unique.is_empty() {
            return Err(RouteError::EmptyPlan);
        }

        Ok(Self { shards: unique })
    }

    #[must_use]
    pub fn single(shard: impl Into<ShardId>) -> Self {
        Self {
            shards: vec![shard.into()],
        }
    }

    #[must_use]
    pub fn shards(&self) -> &[ShardId] {
        &self.shards
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.shards.len()
    }

    #[must_use]
    pub const fn is_single(&self) -> bool {
        self.shards.len() == 1
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ShardId> {
        self.shards.iter()
    }
}

impl<'a> IntoIterator for &'a ShardPlan {
    type Item = &'a ShardId;
    type IntoIter = std::slice::Iter<'a, ShardId>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

///
/// RouteError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum RouteError {
    #[error("the sharding component for '{sharding_type}' was not found")]
    UnknownShardingType { sharding_type: String },

    #[error("coordinator '{coordinator}' for sharding type '{sharding_type}' is not registered")]
    UnknownCoordinator {
        sharding_type: String,
        coordinator: String,
    },

    #[error("shard '{shard}' has no registered backend")]
    UnknownBackend { shard: ShardId },

    #[error("coordinator resolved shard '{shard}' outside sharding type '{sharding_type}'")]
    ShardOutsideCandidates {
        sharding_type: String,
        shard: ShardId,
    },

    #[error("the shard for this query was not found (sharding type '{sharding_type}')")]
    NoShardForKey { sharding_type: String },

    #[error("please set the sharding column '{column}'")]
    MissingShardingValue { column: String },

    #[error("shard plan must name at least one shard")]
    EmptyPlan,
}

impl From<RouteError> for InternalError {
    fn from(err: RouteError) -> Self {
        Self::new(ErrorClass::Configuration, ErrorOrigin::Route, err.to_string())
    }
}
