use crate::{
    db::{
        condition::{Condition, ParamSet},
        extract::KeyExtractor,
        route::{RouteError, ShardDescriptor, ShardId, ShardPlan, ShardRegistry, ShardResolution},
    },
    error::InternalError,
    model::entity::EntityModel,
    obs::sink::{self, MetricsEvent},
    value::Value,
};

///
/// ShardRouter
///
/// Resolves the shard plan for one statement. Plans are recomputed on every
/// call and never cached.
///

#[derive(Clone, Copy, Debug)]
pub struct ShardRouter<'a> {
    registry: &'a ShardRegistry,
    extractor: KeyExtractor,
}

impl<'a> ShardRouter<'a> {
    #[must_use]
    pub const fn new(registry: &'a ShardRegistry, extractor: KeyExtractor) -> Self {
        Self {
            registry,
            extractor,
        }
    }

    /// Plan a read or bulk write from its filter.
    ///
    /// Keys are recovered from the rendered condition; when none are found,
    /// or the coordinator has no opinion, the descriptor's default shards are
    /// used.
    pub fn plan(
        &self,
        model: &EntityModel,
        condition: &Condition,
        params: &ParamSet,
    ) -> Result<ShardPlan, InternalError> {
        let descriptor = self.descriptor(model)?;
        let keys = self
            .extractor
            .extract_from_condition(condition, params, model.sharding_column)?;

        let resolved = if keys.is_empty() {
            Vec::new()
        } else {
            self.resolve(descriptor, keys.as_slice())?
        };

        let fallback = resolved.is_empty();
        let plan = if fallback {
            ShardPlan::new(descriptor.default_shards())?
        } else {
            ShardPlan::new(resolved)?
        };

        tracing::debug!(
            entity = model.path,
            keys = keys.len(),
            shards = ?plan.shards(),
            fallback,
            "shard plan resolved"
        );
        record_route(model, &plan, fallback);

        Ok(plan)
    }

    /// Plan an insert from its explicit sharding key; it must resolve to a
    /// shard.
    pub fn plan_for_key(&self, model: &EntityModel, key: &Value) -> Result<ShardPlan, InternalError> {
        let descriptor = self.descriptor(model)?;
        let resolved = self.resolve(descriptor, std::slice::from_ref(key))?;

        let [shard] = resolved.as_slice() else {
            return Err(RouteError::NoShardForKey {
                sharding_type: descriptor.sharding_type.clone(),
            }
            .into());
        };
        let plan = ShardPlan::single(shard);

        tracing::debug!(entity = model.path, shard = %shard, "insert shard resolved");
        record_route(model, &plan, false);

        Ok(plan)
    }

    /// Plan against caller-named shards; each must have a backend.
    pub fn plan_explicit(&self, shards: &[ShardId]) -> Result<ShardPlan, InternalError> {
        for shard in shards {
            if self.registry.backend(shard).is_none() {
                return Err(RouteError::UnknownBackend {
                    shard: shard.clone(),
                }
                .into());
            }
        }

        Ok(ShardPlan::new(shards)?)
    }

    fn descriptor(&self, model: &EntityModel) -> Result<&'a ShardDescriptor, RouteError> {
        self.registry
            .descriptor(model.sharding_type)
            .ok_or_else(|| RouteError::UnknownShardingType {
                sharding_type: model.sharding_type.to_string(),
            })
    }

    // Coordinator output, validated against the descriptor's candidates.
    fn resolve(
        &self,
        descriptor: &ShardDescriptor,
        keys: &[Value],
    ) -> Result<Vec<ShardId>, RouteError> {
        let coordinator = self
            .registry
            .coordinator(&descriptor.coordinator)
            .ok_or_else(|| RouteError::UnknownCoordinator {
                sharding_type: descriptor.sharding_type.clone(),
                coordinator: descriptor.coordinator.clone(),
            })?;

        let shards = match coordinator.resolve(descriptor, keys) {
            ShardResolution::Unresolved => return Ok(Vec::new()),
            resolution => resolution.into_shards(),
        };

        if let Some(stray) = shards.iter().find(|shard| !descriptor.contains(shard)) {
            return Err(RouteError::ShardOutsideCandidates {
                sharding_type: descriptor.sharding_type.clone(),
                shard: stray.clone(),
            });
        }

        Ok(shards)
    }
}

fn record_route(model: &EntityModel, plan: &ShardPlan, fallback: bool) {
    sink::record(MetricsEvent::Route {
        entity_path: model.path,
        shard_count: u64::try_from(plan.len()).unwrap_or(u64::MAX),
        fallback,
    });
}
