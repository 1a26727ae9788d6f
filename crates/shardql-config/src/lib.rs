//! TOML configuration for shardql: sharding types, backends, and key
//! extraction limits.


use serde::Deserialize;
use shardql_core::{
    db::{
        command::Connection,
        extract::{DEFAULT_MAX_RANGE_SPAN, KeyExtractor},
        query::{Dialect, GenericSqlCompiler},
        route::{ShardDescriptor, ShardId, ShardRegistry},
    },
    error::{ErrorClass, ErrorOrigin, InternalError},
};
use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("sharding type '{sharding_type}' lists no shards")]
    NoShards { sharding_type: String },

    #[error("sharding type '{sharding_type}' names no coordinator")]
    NoCoordinator { sharding_type: String },

    #[error("sharding type '{sharding_type}' lists shard '{shard}' more than once")]
    DuplicateShard { sharding_type: String, shard: String },

    #[error("sharding type '{sharding_type}' has an empty default shard list")]
    EmptyDefault { sharding_type: String },

    #[error("sharding type '{sharding_type}' defaults to '{shard}', which is not one of its shards")]
    DefaultOutsideShards { sharding_type: String, shard: String },

    #[error("shard '{shard}' of sharding type '{sharding_type}' has no backend section")]
    MissingBackend { sharding_type: String, shard: String },

    #[error("backend '{shard}' uses unknown dialect '{dialect}'")]
    UnknownDialect { shard: String, dialect: String },

    #[error("no backend configured for shard '{shard}'")]
    UnknownShard { shard: String },
}

impl From<ConfigError> for InternalError {
    fn from(err: ConfigError) -> Self {
        Self::new(ErrorClass::Configuration, ErrorOrigin::Config, err.to_string())
    }
}

///
/// Config
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub extract: ExtractConfig,

    /// Sharding types by name.
    #[serde(default)]
    pub sharding: BTreeMap<String, ShardingConfig>,

    /// Backends by shard id.
    #[serde(default)]
    pub backends: BTreeMap<String, BackendConfig>,
}

///
/// ExtractConfig
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractConfig {
    pub max_range_span: u64,

    /// Expand BETWEEN ranges of any width.
    pub unbounded: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_range_span: DEFAULT_MAX_RANGE_SPAN,
            unbounded: false,
        }
    }
}

///
/// ShardingConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ShardingConfig {
    pub shards: Vec<String>,
    pub coordinator: String,

    /// Fallback shards for statements with no recoverable key.
    #[serde(default)]
    pub default: Option<Vec<String>>,
}

///
/// BackendConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    #[serde(default = "BackendConfig::default_dialect")]
    pub dialect: String,

    #[serde(default)]
    pub table_prefix: String,
}

impl BackendConfig {
    fn default_dialect() -> String {
        "ansi".to_string()
    }
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;

        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, sharding) in &self.sharding {
            if sharding.shards.is_empty() {
                return Err(ConfigError::NoShards {
                    sharding_type: name.clone(),
                });
            }
            if sharding.coordinator.trim().is_empty() {
                return Err(ConfigError::NoCoordinator {
                    sharding_type: name.clone(),
                });
            }

            let mut seen = BTreeSet::new();
            for shard in &sharding.shards {
                if !seen.insert(shard.as_str()) {
                    return Err(ConfigError::DuplicateShard {
                        sharding_type: name.clone(),
                        shard: shard.clone(),
                    });
                }
                if !self.backends.contains_key(shard) {
                    return Err(ConfigError::MissingBackend {
                        sharding_type: name.clone(),
                        shard: shard.clone(),
                    });
                }
            }

            if sharding.default.as_ref().is_some_and(Vec::is_empty) {
                return Err(ConfigError::EmptyDefault {
                    sharding_type: name.clone(),
                });
            }
            for shard in sharding.default.iter().flatten() {
                if !seen.contains(shard.as_str()) {
                    return Err(ConfigError::DefaultOutsideShards {
                        sharding_type: name.clone(),
                        shard: shard.clone(),
                    });
                }
            }
        }

        for (shard, backend) in &self.backends {
            dialect(shard, backend)?;
        }

        Ok(())
    }

    // ─── accessors ───

    #[must_use]
    pub fn descriptors(&self) -> Vec<ShardDescriptor> {
        self.sharding
            .iter()
            .map(|(name, sharding)| {
                let descriptor = ShardDescriptor::new(
                    name.as_str(),
                    sharding.shards.iter().map(String::as_str),
                    sharding.coordinator.as_str(),
                );
                match &sharding.default {
                    Some(defaults) => {
                        descriptor.with_default_shards(defaults.iter().map(String::as_str))
                    }
                    None => descriptor,
                }
            })
            .collect()
    }

    #[must_use]
    pub const fn extractor(&self) -> KeyExtractor {
        if self.extract.unbounded {
            KeyExtractor::new(None)
        } else {
            KeyExtractor::new(Some(self.extract.max_range_span))
        }
    }

    pub fn compiler_for(&self, shard: &str) -> Result<GenericSqlCompiler, ConfigError> {
        let backend = self
            .backends
            .get(shard)
            .ok_or_else(|| ConfigError::UnknownShard {
                shard: shard.to_string(),
            })?;

        let compiler = GenericSqlCompiler::new(dialect(shard, backend)?)
            .with_table_prefix(backend.table_prefix.as_str());

        Ok(compiler)
    }

    /// Build a registry holding every descriptor and backend.
    ///
    /// `connect` opens one connection per configured backend. Coordinators
    /// are code, so the caller registers them on the returned registry.
    pub fn registry(
        &self,
        mut connect: impl FnMut(&ShardId, &BackendConfig) -> Arc<dyn Connection>,
    ) -> Result<ShardRegistry, ConfigError> {
        let mut registry = ShardRegistry::new();
        for descriptor in self.descriptors() {
            registry = registry.with_descriptor(descriptor);
        }

        for (shard, backend) in &self.backends {
            let id = ShardId::new(shard.as_str());
            let compiler = self.compiler_for(shard)?;
            let connection = connect(&id, backend);
            registry = registry.with_backend(id, connection, Arc::new(compiler));
        }

        Ok(registry)
    }
}

fn dialect(shard: &str, backend: &BackendConfig) -> Result<Dialect, ConfigError> {
    Dialect::parse(&backend.dialect).ok_or_else(|| ConfigError::UnknownDialect {
        shard: shard.to_string(),
        dialect: backend.dialect.clone(),
    })
}
