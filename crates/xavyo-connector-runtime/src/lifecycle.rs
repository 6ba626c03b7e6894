//! Connector lifecycle dispatcher
//!
//! Every API call obtains a connector instance, runs against it, and
//! releases it. [`ConnectorLifecycle::acquire`] does the first step and
//! returns a [`ConnectorLease`]; dropping the lease does the last one on
//! every exit path, including `?` returns, panics, and a dropped future.
//!
//! Release never fails the call. A pool that refuses the instance back, or
//! a connector whose `dispose` fails, is logged at `warn` and forgotten.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::capability::ConnectorInstance;
use crate::context::OperationalContext;
use crate::error::{ConnectorError, ConnectorResult};
use crate::ids::ConnectorKey;
use crate::pool::ConnectorPool;

/// Obtains connector instances for one operational context.
#[derive(Debug, Clone)]
pub struct ConnectorLifecycle {
    context: Arc<OperationalContext>,
}

impl ConnectorLifecycle {
    pub fn new(context: Arc<OperationalContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &OperationalContext {
        &self.context
    }

    /// Borrow from the pool, or create and initialize a fresh instance.
    pub async fn acquire(&self) -> ConnectorResult<ConnectorLease> {
        let key = self.context.connector_key();
        match self.context.pool() {
            Some(pool) => {
                let instance = pool.borrow_object().await?;
                debug!(connector = %key, "Borrowed pooled connector");
                Ok(ConnectorLease {
                    instance: Some(instance),
                    release: Release::Return(pool.clone()),
                    key,
                })
            }
            None => {
                let instance = ConnectorInstance::create(
                    self.context.factory(),
                    self.context.bound_configuration().clone(),
                )
                .await?;
                debug!(connector = %key, "Created connector");
                Ok(ConnectorLease {
                    instance: Some(instance),
                    release: Release::Dispose,
                    key,
                })
            }
        }
    }
}

enum Release {
    Return(Arc<dyn ConnectorPool>),
    Dispose,
}

/// A connector instance held for the duration of one call.
///
/// The instance goes back to the pool, or is disposed, when the lease is
/// dropped.
pub struct ConnectorLease {
    instance: Option<ConnectorInstance>,
    release: Release,
    key: ConnectorKey,
}

impl ConnectorLease {
    /// The leased instance.
    pub fn instance(&self) -> ConnectorResult<&ConnectorInstance> {
        self.instance
            .as_ref()
            .ok_or_else(|| ConnectorError::internal("connector lease already released"))
    }

    /// Whether the instance came from a pool.
    pub fn is_pooled(&self) -> bool {
        matches!(self.release, Release::Return(_))
    }
}

impl fmt::Debug for ConnectorLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorLease")
            .field("connector", &self.key)
            .field("pooled", &self.is_pooled())
            .finish_non_exhaustive()
    }
}

impl Drop for ConnectorLease {
    fn drop(&mut self) {
        let Some(instance) = self.instance.take() else {
            return;
        };
        match &self.release {
            Release::Return(pool) => match pool.return_object(instance) {
                Ok(()) => debug!(connector = %self.key, "Returned connector to pool"),
                Err(e) => warn!(
                    connector = %self.key,
                    error = %e,
                    "Failed to return connector to pool"
                ),
            },
            Release::Dispose => match instance.dispose() {
                Ok(()) => debug!(connector = %self.key, "Disposed connector"),
                Err(e) => warn!(
                    connector = %self.key,
                    error = %e,
                    "Failed to dispose connector"
                ),
            },
        }
    }
}
