use crate::db::route::ShardId;

///
/// ShardDescriptor
///
/// One sharding type: the shards its rows may live on, the coordinator that
/// maps keys onto them, and the shards used when no key can be recovered.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ShardDescriptor {
    pub sharding_type: String,
    pub shards: Vec<ShardId>,
    pub coordinator: String,
    default_shards: Option<Vec<ShardId>>,
}

impl ShardDescriptor {
    pub fn new(
        sharding_type: impl Into<String>,
        shards: impl IntoIterator<Item = impl Into<ShardId>>,
        coordinator: impl Into<String>,
    ) -> Self {
        Self {
            sharding_type: sharding_type.into(),
            shards: shards.into_iter().map(Into::into).collect(),
            coordinator: coordinator.into(),
            default_shards: None,
        }
    }

    /// Restrict the fallback used when no sharding key is found.
    #[must_use]
    pub fn with_default_shards(mut self, shards: impl IntoIterator<Item = impl Into<ShardId>>) -> Self {
        self.default_shards = Some(shards.into_iter().map(Into::into).collect());
        self
    }

    /// Fallback shards; every candidate unless configured otherwise.
    #[must_use]
    pub fn default_shards(&self) -> &[ShardId] {
        self.default_shards.as_deref().unwrap_or(&self.shards)
    }

    #[must_use]
    pub fn contains(&self, shard: &ShardId) -> bool {
        self.shards.contains(shard)
    }
}
