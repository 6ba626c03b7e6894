//! Connector instance pooling
//!
//! [`ConnectorPool`] is the borrow/return contract the lifecycle dispatcher
//! relies on. [`ConnectorObjectPool`] is the default implementation: a
//! bounded set of initialized instances of one connector configuration.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Semaphore;
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

use crate::capability::ConnectorInstance;
use crate::config::{Configuration, PoolConfig};
use crate::error::{ConnectorError, ConnectorResult};
use crate::traits::ConnectorFactory;

/// Borrow/return pool of connector instances.
#[async_trait]
pub trait ConnectorPool: Send + Sync {
    /// Borrow a live instance, waiting if the pool is at capacity.
    async fn borrow_object(&self) -> ConnectorResult<ConnectorInstance>;

    /// Return a borrowed instance. The instance may have failed during its
    /// last operation; the pool decides whether to keep it.
    fn return_object(&self, instance: ConnectorInstance) -> ConnectorResult<()>;

    /// Dispose idle instances and refuse further borrows.
    fn close(&self);
}

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Instances waiting for reuse.
    pub idle: usize,
    /// Instances currently borrowed.
    pub active: usize,
}

struct IdleInstance {
    instance: ConnectorInstance,
    returned_at: Instant,
}

/// Default pool of initialized connector instances.
///
/// - at most `max_objects` instances exist at once; a borrow beyond that
///   waits up to `max_wait` and then fails with `PoolExhausted`
/// - at most `max_idle` returned instances are kept; extra ones are disposed
/// - idle instances older than `min_evictable_idle` are disposed on the next
///   borrow, keeping at least `min_idle`
/// - an idle instance failing `check_alive` is disposed and replaced
pub struct ConnectorObjectPool {
    factory: Arc<dyn ConnectorFactory>,
    configuration: Configuration,
    config: PoolConfig,
    permits: Semaphore,
    idle: Mutex<VecDeque<IdleInstance>>,
    closed: AtomicBool,
}

impl ConnectorObjectPool {
    /// Create an empty pool. Instances are created on first borrow.
    pub fn new(
        factory: Arc<dyn ConnectorFactory>,
        configuration: Configuration,
        config: PoolConfig,
    ) -> ConnectorResult<Self> {
        config.validate()?;
        Ok(Self {
            factory,
            configuration,
            permits: Semaphore::new(config.max_objects as usize),
            config,
            idle: Mutex::new(VecDeque::new()),
            closed: AtomicBool::new(false),
        })
    }

    /// Current occupancy.
    pub fn stats(&self) -> PoolStats {
        let max = self.config.max_objects as usize;
        PoolStats {
            idle: self.lock_idle().len(),
            active: max.saturating_sub(self.permits.available_permits()),
        }
    }

    fn lock_idle(&self) -> MutexGuard<'_, VecDeque<IdleInstance>> {
        // The queue is consistent after every push/pop, so a panic elsewhere
        // while holding the lock leaves nothing half-done.
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take the most recently returned idle instance, evicting stale ones.
    fn pop_idle(&self) -> Option<ConnectorInstance> {
        let min_evictable_idle = self.config.min_evictable_idle();
        let min_idle = self.config.min_idle as usize;
        let (candidate, evicted) = {
            let mut idle = self.lock_idle();
            let mut evicted = Vec::new();
            while idle.len() > min_idle
                && idle
                    .front()
                    .is_some_and(|entry| entry.returned_at.elapsed() >= min_evictable_idle)
            {
                if let Some(entry) = idle.pop_front() {
                    evicted.push(entry.instance);
                }
            }
            (idle.pop_back().map(|entry| entry.instance), evicted)
        };
        for instance in evicted {
            debug!(connector = %self.factory.key(), "Evicting idle connector instance");
            self.dispose_quietly(instance);
        }
        candidate
    }

    async fn take_live_instance(&self) -> ConnectorResult<ConnectorInstance> {
        while let Some(instance) = self.pop_idle() {
            match instance.check_alive().await {
                Ok(()) => return Ok(instance),
                Err(e) => {
                    debug!(
                        connector = %self.factory.key(),
                        error = %e,
                        "Idle connector instance failed liveness check"
                    );
                    self.dispose_quietly(instance);
                }
            }
        }
        debug!(connector = %self.factory.key(), "Creating pooled connector instance");
        ConnectorInstance::create(self.factory.as_ref(), self.configuration.clone()).await
    }

    fn dispose_idle(&self) {
        let drained: Vec<_> = self.lock_idle().drain(..).collect();
        for entry in drained {
            self.dispose_quietly(entry.instance);
        }
    }

    fn dispose_quietly(&self, instance: ConnectorInstance) {
        if let Err(e) = instance.dispose() {
            warn!(
                connector = %self.factory.key(),
                error = %e,
                "Failed to dispose pooled connector instance"
            );
        }
    }
}

#[async_trait]
impl ConnectorPool for ConnectorObjectPool {
    async fn borrow_object(&self) -> ConnectorResult<ConnectorInstance> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ConnectorError::internal("connector pool is closed"));
        }

        let max_wait = self.config.max_wait();
        let permit = match timeout(max_wait, self.permits.acquire()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(ConnectorError::internal("connector pool is closed")),
            Err(_) => {
                warn!(
                    connector = %self.factory.key(),
                    max_objects = self.config.max_objects,
                    "Connector pool exhausted"
                );
                return Err(ConnectorError::PoolExhausted {
                    waited_ms: self.config.max_wait_ms,
                });
            }
        };

        // The permit travels with the instance until it is returned.
        let instance = self.take_live_instance().await?;
        permit.forget();
        Ok(instance)
    }

    fn return_object(&self, instance: ConnectorInstance) -> ConnectorResult<()> {
        let surplus = {
            let mut idle = self.lock_idle();
            if self.closed.load(Ordering::SeqCst) || idle.len() >= self.config.max_idle as usize {
                Some(instance)
            } else {
                idle.push_back(IdleInstance {
                    instance,
                    returned_at: Instant::now(),
                });
                None
            }
        };
        self.permits.add_permits(1);

        match surplus {
            Some(instance) => instance.dispose(),
            None => Ok(()),
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.dispose_idle();
    }
}

impl Drop for ConnectorObjectPool {
    fn drop(&mut self) {
        // Borrowed instances keep the pool alive, so only idle ones remain.
        self.dispose_idle();
    }
}
