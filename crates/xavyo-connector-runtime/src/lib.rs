//! # Connector Runtime
//!
//! Execution core for xavyo connectors: the layer between a caller and a
//! resource-specific connector.
//!
//! ## Architecture
//!
//! A caller talks to a [`ConnectorFacade`](facade::ConnectorFacade). For
//! each operation the facade
//!
//! 1. checks its arguments and fills in empty [`OperationOptions`](options::OperationOptions)
//! 2. obtains a connector through the [`lifecycle`] dispatcher, from a pool
//!    or freshly initialized
//! 3. normalizes inputs, runs the connector capability, normalizes outputs
//! 4. returns the connector to the pool, or disposes it, however the call ended
//!
//! Searches go through the [`search`] orchestrator, which translates filters
//! into native queries and re-applies filtering, projection, and
//! deduplication in process. Incremental updates go through the [`update`]
//! reconciler, which emulates add/remove of values on connectors that can
//! only replace.
//!
//! Connectors implement [`Connector`](traits::Connector) plus whichever
//! capability traits they support (`CreateOp`, `SearchOp`, `SyncOp`, ...).
//!
//! ## Example
//!
//! ```ignore
//! use xavyo_connector_runtime::prelude::*;
//!
//! let registry = ConnectorRegistry::new();
//! registry.register_factory(Arc::new(LdapConnectorFactory)).await;
//!
//! let configuration = ApiConfiguration::default()
//!     .with_property("host", "ldap.example.com")
//!     .with_pooling(PoolConfig::default());
//! let facade = registry.new_facade(&ldap_key, configuration).await?;
//!
//! let mut users = Vec::new();
//! facade
//!     .search(
//!         &ObjectClass::account(),
//!         Some(Filter::starts_with("mail", "j")),
//!         &mut |object| {
//!             users.push(object);
//!             true
//!         },
//!         None,
//!     )
//!     .await?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`facade`] - Caller-facing operations
//! - [`lifecycle`], [`context`], [`pool`], [`registry`] - Obtaining and releasing connectors
//! - [`search`], [`update`] - Search orchestration and update reconciliation
//! - [`handler`], [`normalizer`] - Result handler pipeline and normalization
//! - [`traits`], [`capability`] - Connector SPI and bound capabilities
//! - [`filter`], [`translator`] - Filter trees and native query translation
//! - [`operation`], [`options`], [`sync`], [`schema`], [`guarded`] - Data model
//! - [`config`] - Configuration types and traits
//! - [`error`] - Error types with transient/permanent classification
//! - [`ids`], [`types`] - Identifiers and enums

pub mod capability;
pub mod config;
pub mod context;
pub mod error;
pub mod facade;
pub mod filter;
pub mod guarded;
pub mod handler;
pub mod ids;
pub mod lifecycle;
pub mod normalizer;
pub mod operation;
pub mod options;
pub mod pool;
pub mod registry;
pub mod schema;
pub mod search;
pub mod sync;
pub mod traits;
pub mod translator;
pub mod types;
pub mod update;

/// Prelude module for convenient imports.
///
/// ```
/// use xavyo_connector_runtime::prelude::*;
/// ```
pub mod prelude {
    // IDs and enums
    pub use crate::ids::{ConnectorKey, FacadeId};
    pub use crate::types::{ApiOperation, SearchScope, SyncDeltaType};

    // Error handling
    pub use crate::error::{ConnectorError, ConnectorResult};

    // Connector SPI
    pub use crate::capability::{Capability, CapabilitySet, ConnectorInstance};
    pub use crate::traits::{
        AttributeNormalizer, AuthenticateOp, Connector, ConnectorFactory, CreateOp, DeleteOp,
        ErasedSearchOp, ResolveUsernameOp, SchemaOp, ScriptContext, ScriptOnConnectorOp,
        ScriptOnResourceOp, SearchOp, SyncOp, TestOp, UpdateAttributeValuesOp, UpdateOp,
    };
    pub use crate::translator::FilterTranslator;

    // Data model
    pub use crate::filter::Filter;
    pub use crate::guarded::GuardedString;
    pub use crate::operation::{
        Attribute, AttributeSet, AttributeValue, ConnectorObject, ObjectClass, ReservedAttributes,
        Uid, NAME_ATTRIBUTE, UID_ATTRIBUTE,
    };
    pub use crate::options::{OperationOptions, QualifiedUid, SortKey};
    pub use crate::schema::{AttributeDataType, AttributeInfo, ObjectClassInfo, Schema};
    pub use crate::sync::{SyncDelta, SyncToken};

    // Handlers
    pub use crate::handler::{ResultsHandler, SyncResultsHandler};

    // Configuration
    pub use crate::config::{ApiConfiguration, Configuration, ConnectorConfig, PoolConfig};

    // Runtime
    pub use crate::facade::ConnectorFacade;
    pub use crate::pool::{ConnectorObjectPool, ConnectorPool};
    pub use crate::registry::ConnectorRegistry;
}

// Re-export async_trait for connector implementors
pub use async_trait::async_trait;
