//! Connector SPI traits
//!
//! Capability-based trait definitions for connectors, inspired by `ConnId`.
//! A connector implements [`Connector`] plus any subset of the capability
//! traits, and advertises each one it implements through the matching
//! `as_*_op` accessor:
//!
//! ```ignore
//! #[async_trait]
//! impl Connector for LdapConnector {
//!     async fn init(&mut self, configuration: Configuration) -> ConnectorResult<()> {
//!         self.config = Some(configuration.bind::<LdapConfig>()?);
//!         Ok(())
//!     }
//!
//!     fn as_create_op(&self) -> Option<&dyn CreateOp> {
//!         Some(self)
//!     }
//!
//!     fn as_search_op(&self) -> Option<&dyn ErasedSearchOp> {
//!         Some(self)
//!     }
//! }
//! ```
//!
//! The runtime probes the accessors once per instance, see
//! [`ConnectorInstance`](crate::capability::ConnectorInstance).

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::any::Any;

use crate::config::Configuration;
use crate::error::{ConnectorError, ConnectorResult};
use crate::filter::Filter;
use crate::guarded::GuardedString;
use crate::handler::{ResultsHandler, SyncResultsHandler};
use crate::ids::ConnectorKey;
use crate::operation::{Attribute, AttributeSet, ObjectClass, Uid};
use crate::options::OperationOptions;
use crate::schema::Schema;
use crate::sync::SyncToken;

/// Base trait for all connectors.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Initialize a fresh instance with its bound configuration.
    async fn init(&mut self, configuration: Configuration) -> ConnectorResult<()>;

    /// Release connections and other resources held by the instance.
    ///
    /// Called exactly once, when the instance leaves service. Synchronous so
    /// the runtime can release an instance on any exit path.
    fn dispose(&mut self) -> ConnectorResult<()> {
        Ok(())
    }

    /// Lightweight liveness probe run before a pooled instance is handed out.
    async fn check_alive(&self) -> ConnectorResult<()> {
        Ok(())
    }

    /// Normalizer applied to attributes entering and leaving this connector.
    fn attribute_normalizer(&self) -> Option<&dyn AttributeNormalizer> {
        None
    }

    /// Create capability, if implemented.
    fn as_create_op(&self) -> Option<&dyn CreateOp> {
        None
    }

    /// Delete capability, if implemented.
    fn as_delete_op(&self) -> Option<&dyn DeleteOp> {
        None
    }

    /// Update capability, if implemented.
    fn as_update_op(&self) -> Option<&dyn UpdateOp> {
        None
    }

    /// Add/remove values capability, if implemented.
    fn as_update_attribute_values_op(&self) -> Option<&dyn UpdateAttributeValuesOp> {
        None
    }

    /// Search capability, if implemented.
    fn as_search_op(&self) -> Option<&dyn ErasedSearchOp> {
        None
    }

    /// Sync capability, if implemented.
    fn as_sync_op(&self) -> Option<&dyn SyncOp> {
        None
    }

    /// Schema capability, if implemented.
    fn as_schema_op(&self) -> Option<&dyn SchemaOp> {
        None
    }

    /// Test capability, if implemented.
    fn as_test_op(&self) -> Option<&dyn TestOp> {
        None
    }

    /// Authenticate capability, if implemented.
    fn as_authenticate_op(&self) -> Option<&dyn AuthenticateOp> {
        None
    }

    /// Resolve username capability, if implemented.
    fn as_resolve_username_op(&self) -> Option<&dyn ResolveUsernameOp> {
        None
    }

    /// Script on connector capability, if implemented.
    fn as_script_on_connector_op(&self) -> Option<&dyn ScriptOnConnectorOp> {
        None
    }

    /// Script on resource capability, if implemented.
    fn as_script_on_resource_op(&self) -> Option<&dyn ScriptOnResourceOp> {
        None
    }
}

/// Creates connector instances of one kind.
pub trait ConnectorFactory: Send + Sync {
    /// Key identifying the connector implementation.
    fn key(&self) -> ConnectorKey;

    /// Construct an uninitialized instance.
    fn new_connector(&self) -> Box<dyn Connector>;

    /// Validate a configuration without creating an instance.
    fn validate(&self, configuration: &Configuration) -> ConnectorResult<()> {
        let _ = configuration;
        Ok(())
    }
}

/// Per-connector attribute normalization.
///
/// Applied to every attribute, uid, and filter going into the connector and
/// every object coming out of it, so values compare in canonical form.
pub trait AttributeNormalizer: Send + Sync {
    /// Normalize one attribute of the given object class.
    fn normalize_attribute(&self, object_class: &ObjectClass, attribute: Attribute) -> Attribute;
}

/// Capability for creating objects in the target system.
#[async_trait]
pub trait CreateOp: Connector {
    /// Create a new object and return its uid.
    async fn create(
        &self,
        object_class: &ObjectClass,
        attributes: AttributeSet,
        options: &OperationOptions,
    ) -> ConnectorResult<Uid>;
}

/// Capability for deleting objects from the target system.
#[async_trait]
pub trait DeleteOp: Connector {
    /// Delete an object.
    async fn delete(
        &self,
        object_class: &ObjectClass,
        uid: &Uid,
        options: &OperationOptions,
    ) -> ConnectorResult<()>;
}

/// Capability for replacing attributes of objects in the target system.
#[async_trait]
pub trait UpdateOp: Connector {
    /// Replace the given attributes. An attribute with no values clears it.
    ///
    /// Returns the uid of the updated object, which may have changed.
    async fn update(
        &self,
        object_class: &ObjectClass,
        uid: &Uid,
        replace: AttributeSet,
        options: &OperationOptions,
    ) -> ConnectorResult<Uid>;
}

/// Capability for adding and removing individual attribute values natively.
#[async_trait]
pub trait UpdateAttributeValuesOp: UpdateOp {
    /// Add values to existing attributes.
    async fn add_attribute_values(
        &self,
        object_class: &ObjectClass,
        uid: &Uid,
        values: AttributeSet,
        options: &OperationOptions,
    ) -> ConnectorResult<Uid>;

    /// Remove values from existing attributes.
    async fn remove_attribute_values(
        &self,
        object_class: &ObjectClass,
        uid: &Uid,
        values: AttributeSet,
        options: &OperationOptions,
    ) -> ConnectorResult<Uid>;
}

/// Capability for searching objects in the target system.
///
/// A search runs in two steps. [`translate_filter`](SearchOp::translate_filter)
/// turns a filter into native queries, usually with a
/// [`FilterTranslator`](crate::translator::FilterTranslator), and
/// [`execute_query`](SearchOp::execute_query) runs one of them, streaming
/// results into the handler until the handler returns `false`.
#[async_trait]
pub trait SearchOp: Connector {
    /// Native query representation.
    type Query: Send + Sync + 'static;

    /// Translate a filter into native queries.
    fn translate_filter(
        &self,
        object_class: &ObjectClass,
        options: &OperationOptions,
        filter: &Filter,
    ) -> Vec<Self::Query>;

    /// Run one native query. `None` means no native filtering.
    async fn execute_query(
        &self,
        object_class: &ObjectClass,
        query: Option<&Self::Query>,
        handler: &mut dyn ResultsHandler,
        options: &OperationOptions,
    ) -> ConnectorResult<()>;
}

/// A native query with its type erased.
pub type NativeQuery = Box<dyn Any + Send + Sync>;

/// Object-safe view of a [`SearchOp`], implemented for every `SearchOp`.
#[async_trait]
pub trait ErasedSearchOp: Send + Sync {
    /// Translate a filter into native queries.
    fn translate(
        &self,
        object_class: &ObjectClass,
        options: &OperationOptions,
        filter: &Filter,
    ) -> Vec<NativeQuery>;

    /// Run one native query produced by [`ErasedSearchOp::translate`].
    async fn execute(
        &self,
        object_class: &ObjectClass,
        query: Option<&NativeQuery>,
        handler: &mut dyn ResultsHandler,
        options: &OperationOptions,
    ) -> ConnectorResult<()>;
}

#[async_trait]
impl<T> ErasedSearchOp for T
where
    T: SearchOp,
{
    fn translate(
        &self,
        object_class: &ObjectClass,
        options: &OperationOptions,
        filter: &Filter,
    ) -> Vec<NativeQuery> {
        SearchOp::translate_filter(self, object_class, options, filter)
            .into_iter()
            .map(|query| Box::new(query) as NativeQuery)
            .collect()
    }

    async fn execute(
        &self,
        object_class: &ObjectClass,
        query: Option<&NativeQuery>,
        handler: &mut dyn ResultsHandler,
        options: &OperationOptions,
    ) -> ConnectorResult<()> {
        let query = match query {
            Some(query) => Some(
                (**query)
                    .downcast_ref::<T::Query>()
                    .ok_or_else(|| ConnectorError::internal("native query has the wrong type"))?,
            ),
            None => None,
        };
        SearchOp::execute_query(self, object_class, query, handler, options).await
    }
}

/// Capability for live synchronization from target systems.
#[async_trait]
pub trait SyncOp: Connector {
    /// Stream changes after `token` into the handler until it returns
    /// `false`. With no token, the connector decides where to start.
    async fn sync(
        &self,
        object_class: &ObjectClass,
        token: Option<&SyncToken>,
        handler: &mut dyn SyncResultsHandler,
        options: &OperationOptions,
    ) -> ConnectorResult<()>;

    /// Token of the most recent change, if the resource has one.
    async fn get_latest_sync_token(
        &self,
        object_class: &ObjectClass,
    ) -> ConnectorResult<Option<SyncToken>>;
}

/// Capability for describing the target system schema.
#[async_trait]
pub trait SchemaOp: Connector {
    /// Describe the schema.
    async fn schema(&self) -> ConnectorResult<Schema>;
}

/// Capability for testing the configuration against the target system.
#[async_trait]
pub trait TestOp: Connector {
    /// Test the connection to the target system.
    async fn test(&self) -> ConnectorResult<()>;
}

/// Capability for authenticating accounts on the target system.
#[async_trait]
pub trait AuthenticateOp: Connector {
    /// Verify the credentials and return the account's uid.
    async fn authenticate(
        &self,
        object_class: &ObjectClass,
        username: &str,
        password: &GuardedString,
        options: &OperationOptions,
    ) -> ConnectorResult<Uid>;
}

/// Capability for resolving usernames to uids.
#[async_trait]
pub trait ResolveUsernameOp: Connector {
    /// Return the uid of the account with the given username.
    async fn resolve_username(
        &self,
        object_class: &ObjectClass,
        username: &str,
        options: &OperationOptions,
    ) -> ConnectorResult<Uid>;
}

/// A script and its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptContext {
    /// Script language, e.g. "shell" or "powershell".
    pub language: String,
    /// Script text.
    pub text: String,
    /// Named arguments.
    pub arguments: Map<String, Value>,
}

impl ScriptContext {
    /// Create a script context with no arguments.
    pub fn new(language: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            text: text.into(),
            arguments: Map::new(),
        }
    }

    /// Add an argument.
    pub fn with_argument(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }
}

/// Capability for running scripts inside the connector.
#[async_trait]
pub trait ScriptOnConnectorOp: Connector {
    /// Run the script and return its result.
    async fn run_script_on_connector(
        &self,
        script: &ScriptContext,
        options: &OperationOptions,
    ) -> ConnectorResult<Value>;
}

/// Capability for running scripts on the target resource.
#[async_trait]
pub trait ScriptOnResourceOp: Connector {
    /// Run the script on the resource and return its result.
    async fn run_script_on_resource(
        &self,
        script: &ScriptContext,
        options: &OperationOptions,
    ) -> ConnectorResult<Value>;
}
