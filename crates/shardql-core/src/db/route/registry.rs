use crate::db::{
    command::Connection,
    query::SqlCompiler,
    route::{ShardCoordinator, ShardDescriptor, ShardId},
};
use std::{collections::BTreeMap, fmt, sync::Arc};

///
/// ShardBackend
/// One physical shard: its connection and the compiler for its dialect.
///

#[derive(Clone)]
pub struct ShardBackend {
    pub id: ShardId,
    pub connection: Arc<dyn Connection>,
    pub compiler: Arc<dyn SqlCompiler>,
}

impl fmt::Debug for ShardBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardBackend").field("id", &self.id).finish_non_exhaustive()
    }
}

///
/// ShardRegistry
///
/// Immutable routing environment: sharding descriptors, named coordinators
/// and shard backends. Built once, then shared behind an `Arc` by every
/// session.
///

#[derive(Default)]
pub struct ShardRegistry {
    descriptors: BTreeMap<String, ShardDescriptor>,
    coordinators: BTreeMap<String, Arc<dyn ShardCoordinator>>,
    backends: BTreeMap<ShardId, ShardBackend>,
}

impl ShardRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ─── registration ───

    #[must_use]
    pub fn with_descriptor(mut self, descriptor: ShardDescriptor) -> Self {
        self.descriptors
            .insert(descriptor.sharding_type.clone(), descriptor);
        self
    }

    #[must_use]
    pub fn with_coordinator(
        mut self,
        name: impl Into<String>,
        coordinator: impl ShardCoordinator + 'static,
    ) -> Self {
        self.coordinators.insert(name.into(), Arc::new(coordinator));
        self
    }

    #[must_use]
    pub fn with_backend(
        mut self,
        id: impl Into<ShardId>,
        connection: Arc<dyn Connection>,
        compiler: Arc<dyn SqlCompiler>,
    ) -> Self {
        let id = id.into();
        self.backends.insert(
            id.clone(),
            ShardBackend {
                id,
                connection,
                compiler,
            },
        );
        self
    }

    // ─── lookup ───

    #[must_use]
    pub fn descriptor(&self, sharding_type: &str) -> Option<&ShardDescriptor> {
        self.descriptors.get(sharding_type)
    }

    #[must_use]
    pub fn coordinator(&self, name: &str) -> Option<&dyn ShardCoordinator> {
        self.coordinators.get(name).map(AsRef::as_ref)
    }

    #[must_use]
    pub fn backend(&self, shard: &ShardId) -> Option<&ShardBackend> {
        self.backends.get(shard)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ShardDescriptor> {
        self.descriptors.values()
    }

    pub fn shard_ids(&self) -> impl Iterator<Item = &ShardId> {
        self.backends.keys()
    }
}

impl fmt::Debug for ShardRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardRegistry")
            .field("descriptors", &self.descriptors)
            .field("coordinators", &self.coordinators.keys().collect::<Vec<_>>())
            .field("backends", &self.backends.keys().collect::<Vec<_>>())
            .finish()
    }
}
