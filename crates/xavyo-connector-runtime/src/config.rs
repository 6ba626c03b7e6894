//! Connector runtime configuration types
//!
//! [`ApiConfiguration`] is what a caller supplies for one configured
//! connector: its properties and how instances are pooled. [`Configuration`]
//! is the bound value handed to [`Connector::init`](crate::traits::Connector::init),
//! from which a connector extracts its own typed [`ConnectorConfig`].

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

use crate::error::{ConnectorError, ConnectorResult};

/// Trait for connector-specific configuration.
///
/// Each connector defines its configuration as a serde type and validates it
/// here. Binding fails with [`ConnectorError::InvalidConfiguration`] when
/// either deserialization or validation fails.
pub trait ConnectorConfig: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Validate the configuration.
    fn validate(&self) -> ConnectorResult<()>;
}

/// Pool settings for pooled connector instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of instances alive at once (idle plus borrowed).
    #[serde(default = "default_max_objects")]
    pub max_objects: u32,

    /// Maximum number of idle instances kept for reuse.
    #[serde(default = "default_max_idle")]
    pub max_idle: u32,

    /// Idle instances never evicted by age.
    #[serde(default = "default_min_idle")]
    pub min_idle: u32,

    /// How long a borrow waits for a free instance, in milliseconds.
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,

    /// Idle time after which an instance may be evicted, in milliseconds.
    #[serde(default = "default_min_evictable_idle_ms")]
    pub min_evictable_idle_ms: u64,
}

fn default_max_objects() -> u32 {
    10
}

fn default_max_idle() -> u32 {
    10
}

fn default_min_idle() -> u32 {
    1
}

fn default_max_wait_ms() -> u64 {
    150_000
}

fn default_min_evictable_idle_ms() -> u64 {
    120_000
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_objects: default_max_objects(),
            max_idle: default_max_idle(),
            min_idle: default_min_idle(),
            max_wait_ms: default_max_wait_ms(),
            min_evictable_idle_ms: default_min_evictable_idle_ms(),
        }
    }
}

impl PoolConfig {
    /// Create new pool settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of instances.
    pub fn with_max_objects(mut self, max: u32) -> Self {
        self.max_objects = max;
        self
    }

    /// Set the maximum number of idle instances.
    pub fn with_max_idle(mut self, max: u32) -> Self {
        self.max_idle = max;
        self
    }

    /// Set the minimum number of idle instances.
    pub fn with_min_idle(mut self, min: u32) -> Self {
        self.min_idle = min;
        self
    }

    /// Set the borrow wait.
    pub fn with_max_wait(mut self, wait: Duration) -> Self {
        self.max_wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the idle eviction age.
    pub fn with_min_evictable_idle(mut self, idle: Duration) -> Self {
        self.min_evictable_idle_ms = u64::try_from(idle.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Get the borrow wait as Duration.
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    /// Get the idle eviction age as Duration.
    pub fn min_evictable_idle(&self) -> Duration {
        Duration::from_millis(self.min_evictable_idle_ms)
    }

    /// Validate the pool settings.
    pub fn validate(&self) -> ConnectorResult<()> {
        if self.max_objects == 0 {
            return Err(ConnectorError::invalid_configuration(
                "max_objects must be at least 1",
            ));
        }
        if self.min_idle > self.max_idle {
            return Err(ConnectorError::invalid_configuration(
                "max_idle must be greater than or equal to min_idle",
            ));
        }
        if self.max_objects < self.max_idle {
            return Err(ConnectorError::invalid_configuration(
                "max_objects must be greater than or equal to max_idle",
            ));
        }
        Ok(())
    }
}

/// Caller-supplied configuration of one connector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiConfiguration {
    /// Connector properties, bound by the connector itself.
    #[serde(default)]
    pub properties: Map<String, Value>,

    /// Whether instances are pooled and reused across calls.
    #[serde(default)]
    pub pooling_enabled: bool,

    /// Pool settings, used when pooling is enabled.
    #[serde(default)]
    pub pool: PoolConfig,
}

impl ApiConfiguration {
    /// Create a configuration with the given properties and no pooling.
    pub fn new(properties: Map<String, Value>) -> Self {
        Self {
            properties,
            ..Default::default()
        }
    }

    /// Create a configuration from a JSON object value.
    pub fn from_value(properties: Value) -> ConnectorResult<Self> {
        match properties {
            Value::Object(map) => Ok(Self::new(map)),
            other => Err(ConnectorError::invalid_configuration(format!(
                "connector properties must be a JSON object, got {other}"
            ))),
        }
    }

    /// Set a single property.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Enable pooling with the given settings.
    pub fn with_pooling(mut self, pool: PoolConfig) -> Self {
        self.pooling_enabled = true;
        self.pool = pool;
        self
    }

    /// Disable pooling.
    pub fn without_pooling(mut self) -> Self {
        self.pooling_enabled = false;
        self
    }

    /// Produce the bound configuration handed to a connector.
    pub fn bind(&self) -> Configuration {
        Configuration {
            properties: self.properties.clone(),
        }
    }

    /// A stable string identifying this configuration. Facades whose keys
    /// match can share one pool.
    pub(crate) fn sharing_key(&self) -> ConnectorResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Bound configuration handed to a connector instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Configuration {
    properties: Map<String, Value>,
}

impl Configuration {
    /// Get a raw property.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Get all raw properties.
    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    /// Deserialize and validate the connector's typed configuration.
    pub fn bind<T: ConnectorConfig>(&self) -> ConnectorResult<T> {
        let config: T = serde_json::from_value(Value::Object(self.properties.clone()))
            .map_err(|e| ConnectorError::invalid_configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
