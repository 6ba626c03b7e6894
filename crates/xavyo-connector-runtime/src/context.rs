//! Operational context of one configured connector
//!
//! Holds everything a facade needs to obtain connector instances: the
//! factory, the caller's configuration and its bound form, and the pool when
//! pooling is enabled. Built once per facade and shared by every call.

use std::fmt;
use std::sync::Arc;

use crate::config::{ApiConfiguration, Configuration};
use crate::error::ConnectorResult;
use crate::ids::ConnectorKey;
use crate::pool::{ConnectorObjectPool, ConnectorPool};
use crate::traits::ConnectorFactory;

pub struct OperationalContext {
    factory: Arc<dyn ConnectorFactory>,
    configuration: ApiConfiguration,
    bound: Configuration,
    pool: Option<Arc<dyn ConnectorPool>>,
}

impl OperationalContext {
    /// Build a context. With pooling enabled a dedicated
    /// [`ConnectorObjectPool`] is created for it.
    pub fn new(
        factory: Arc<dyn ConnectorFactory>,
        configuration: ApiConfiguration,
    ) -> ConnectorResult<Self> {
        let bound = configuration.bind();
        let pool = if configuration.pooling_enabled {
            let pool = ConnectorObjectPool::new(
                factory.clone(),
                bound.clone(),
                configuration.pool.clone(),
            )?;
            Some(Arc::new(pool) as Arc<dyn ConnectorPool>)
        } else {
            None
        };
        Ok(Self {
            factory,
            configuration,
            bound,
            pool,
        })
    }

    /// Build a pooled context around an existing pool.
    pub fn with_pool(
        factory: Arc<dyn ConnectorFactory>,
        configuration: ApiConfiguration,
        pool: Arc<dyn ConnectorPool>,
    ) -> Self {
        let bound = configuration.bind();
        Self {
            factory,
            configuration,
            bound,
            pool: Some(pool),
        }
    }

    pub fn factory(&self) -> &dyn ConnectorFactory {
        self.factory.as_ref()
    }

    pub fn connector_key(&self) -> ConnectorKey {
        self.factory.key()
    }

    pub fn configuration(&self) -> &ApiConfiguration {
        &self.configuration
    }

    /// Configuration handed to `Connector::init`.
    pub fn bound_configuration(&self) -> &Configuration {
        &self.bound
    }

    /// The pool, when instances are pooled.
    pub fn pool(&self) -> Option<&Arc<dyn ConnectorPool>> {
        self.pool.as_ref()
    }
}

impl fmt::Debug for OperationalContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationalContext")
            .field("connector", &self.factory.key())
            .field("pooled", &self.pool.is_some())
            .finish_non_exhaustive()
    }
}
