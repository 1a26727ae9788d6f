use crate::{
    db::route::{ShardDescriptor, ShardId},
    value::Value,
};
use xxhash_rust::xxh3::xxh3_64;

///
/// ShardResolution
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ShardResolution {
    Single(ShardId),
    Set(Vec<ShardId>),
    /// No opinion; the caller falls back to the descriptor's defaults.
    Unresolved,
}

impl ShardResolution {
    /// Flatten into shard ids; `Unresolved` yields nothing.
    #[must_use]
    pub fn into_shards(self) -> Vec<ShardId> {
        match self {
            Self::Single(shard) => vec![shard],
            Self::Set(shards) => shards,
            Self::Unresolved => Vec::new(),
        }
    }
}

///
/// ShardCoordinator
///
/// Maps extracted sharding-key values onto candidate shards.
///
/// Implementations must be pure with respect to their inputs and must only
/// return shards listed in `descriptor.shards`; the router rejects anything
/// else as a configuration error.
///

pub trait ShardCoordinator: Send + Sync {
    fn resolve(&self, descriptor: &ShardDescriptor, keys: &[Value]) -> ShardResolution;
}

///
/// HashCoordinator
///
/// xxh3 of each key's canonical bytes, modulo the candidate count.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct HashCoordinator;

impl HashCoordinator {
    #[must_use]
    pub fn shard_for<'a>(descriptor: &'a ShardDescriptor, key: &Value) -> Option<&'a ShardId> {
        let count = u64::try_from(descriptor.shards.len()).ok().filter(|n| *n > 0)?;
        let slot = usize::try_from(xxh3_64(&key.canonical_bytes()) % count).ok()?;

        descriptor.shards.get(slot)
    }
}

impl ShardCoordinator for HashCoordinator {
    fn resolve(&self, descriptor: &ShardDescriptor, keys: &[Value]) -> ShardResolution {
        let mut shards: Vec<ShardId> = Vec::new();

        for key in keys.iter().filter(|key| !key.is_null()) {
            if let Some(shard) = Self::shard_for(descriptor, key)
                && !shards.contains(shard)
            {
                shards.push(shard.clone());
            }
        }

        match shards.len() {
            0 => ShardResolution::Unresolved,
            1 => ShardResolution::Single(shards.remove(0)),
            _ => ShardResolution::Set(shards),
        }
    }
}

///
/// RangeCoordinator
///
/// Inclusive integer ranges mapped onto shards. Keys that are not integers,
/// or that fall outside every range, resolve nowhere.
///

#[derive(Clone, Debug, Default)]
pub struct RangeCoordinator {
    ranges: Vec<(i64, i64, ShardId)>,
}

impl RangeCoordinator {
    #[must_use]
    pub const fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    /// Map `[lo, hi]` onto `shard`. Earlier ranges win on overlap.
    #[must_use]
    pub fn range(mut self, lo: i64, hi: i64, shard: impl Into<ShardId>) -> Self {
        self.ranges.push((lo.min(hi), lo.max(hi), shard.into()));
        self
    }

    fn shard_for(&self, key: i64) -> Option<&ShardId> {
        self.ranges
            .iter()
            .find(|(lo, hi, _)| (*lo..=*hi).contains(&key))
            .map(|(_, _, shard)| shard)
    }
}

impl ShardCoordinator for RangeCoordinator {
    fn resolve(&self, _descriptor: &ShardDescriptor, keys: &[Value]) -> ShardResolution {
        let mut shards: Vec<ShardId> = Vec::new();

        let ints = keys
            .iter()
            .filter(|key| !matches!(key, Value::Bool(_)))
            .filter_map(Value::as_i64);

        for key in ints {
            if let Some(shard) = self.shard_for(key)
                && !shards.contains(shard)
            {
                shards.push(shard.clone());
            }
        }

        match shards.len() {
            0 => ShardResolution::Unresolved,
            1 => ShardResolution::Single(shards.remove(0)),
            _ => ShardResolution::Set(shards),
        }
    }
}
