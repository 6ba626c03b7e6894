//! Connector registry
//!
//! Keeps the known [`ConnectorFactory`]s and builds facades for them.
//! Pooled facades created for the same connector and configuration share
//! one pool.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::ApiConfiguration;
use crate::context::OperationalContext;
use crate::error::{ConnectorError, ConnectorResult};
use crate::facade::ConnectorFacade;
use crate::ids::ConnectorKey;
use crate::operation::ReservedAttributes;
use crate::pool::{ConnectorObjectPool, ConnectorPool};
use crate::traits::ConnectorFactory;

type PoolKey = (ConnectorKey, String);

/// Registry of connector factories and their shared pools.
pub struct ConnectorRegistry {
    factories: RwLock<HashMap<ConnectorKey, Arc<dyn ConnectorFactory>>>,
    pools: RwLock<HashMap<PoolKey, Arc<ConnectorObjectPool>>>,
    reserved: Arc<ReservedAttributes>,
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectorRegistry {
    /// Create an empty registry using the standard reserved attributes.
    #[must_use]
    pub fn new() -> Self {
        Self::with_reserved_attributes(ReservedAttributes::standard())
    }

    /// Create an empty registry whose facades reserve the given names.
    #[must_use]
    pub fn with_reserved_attributes(reserved: ReservedAttributes) -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
            pools: RwLock::new(HashMap::new()),
            reserved: Arc::new(reserved),
        }
    }

    /// Register a factory, replacing any factory with the same key.
    pub async fn register_factory(&self, factory: Arc<dyn ConnectorFactory>) {
        let key = factory.key();
        info!(connector = %key, "Registering connector factory");
        self.factories.write().await.insert(key, factory);
    }

    /// Check if a factory is registered.
    pub async fn is_registered(&self, key: &ConnectorKey) -> bool {
        self.factories.read().await.contains_key(key)
    }

    /// Keys of all registered factories.
    pub async fn connector_keys(&self) -> Vec<ConnectorKey> {
        let mut keys: Vec<_> = self.factories.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Build a facade for a registered connector.
    pub async fn new_facade(
        &self,
        key: &ConnectorKey,
        configuration: ApiConfiguration,
    ) -> ConnectorResult<ConnectorFacade> {
        let factory = self
            .factories
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| ConnectorError::ConnectorNotRegistered { key: key.clone() })?;

        let context = if configuration.pooling_enabled {
            let pool = self
                .shared_pool(key, factory.clone(), &configuration)
                .await?;
            OperationalContext::with_pool(factory, configuration, pool)
        } else {
            OperationalContext::new(factory, configuration)?
        };

        Ok(ConnectorFacade::with_reserved_attributes(
            Arc::new(context),
            self.reserved.clone(),
        ))
    }

    async fn shared_pool(
        &self,
        key: &ConnectorKey,
        factory: Arc<dyn ConnectorFactory>,
        configuration: &ApiConfiguration,
    ) -> ConnectorResult<Arc<dyn ConnectorPool>> {
        let pool_key = (key.clone(), configuration.sharing_key()?);

        if let Some(pool) = self.pools.read().await.get(&pool_key) {
            return Ok(pool.clone() as Arc<dyn ConnectorPool>);
        }

        let mut pools = self.pools.write().await;
        // Another caller may have created it while we waited for the lock.
        if let Some(pool) = pools.get(&pool_key) {
            return Ok(pool.clone() as Arc<dyn ConnectorPool>);
        }

        debug!(connector = %key, "Creating connector pool");
        let pool = Arc::new(ConnectorObjectPool::new(
            factory,
            configuration.bind(),
            configuration.pool.clone(),
        )?);
        pools.insert(pool_key, pool.clone());
        Ok(pool as Arc<dyn ConnectorPool>)
    }

    /// Number of pools currently shared by facades.
    pub async fn pool_count(&self) -> usize {
        self.pools.read().await.len()
    }

    /// Close and forget every pool. Facades still holding a pool get
    /// errors on later borrows; instances they return are disposed.
    pub async fn dispose_all(&self) {
        let pools: Vec<_> = self.pools.write().await.drain().collect();
        for ((key, _), pool) in pools {
            debug!(connector = %key, "Closing connector pool");
            pool.close();
        }
    }
}
