//! Connector capabilities
//!
//! A [`ConnectorInstance`] owns one live connector together with the
//! [`CapabilitySet`] probed from it when the instance was created. Operation
//! code asks the instance for a capability; a missing one is reported as
//! [`ConnectorError::OperationNotSupported`].

use std::fmt;
use tracing::warn;

use crate::config::Configuration;
use crate::error::{ConnectorError, ConnectorResult};
use crate::traits::{
    AuthenticateOp, Connector, ConnectorFactory, CreateOp, DeleteOp, ErasedSearchOp,
    ResolveUsernameOp, SchemaOp, ScriptOnConnectorOp, ScriptOnResourceOp, SyncOp, TestOp,
    UpdateAttributeValuesOp, UpdateOp,
};
use crate::types::ApiOperation;

/// An optional connector interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Create,
    Delete,
    Update,
    UpdateAttributeValues,
    Search,
    Sync,
    Schema,
    Test,
    Authenticate,
    ResolveUsername,
    ScriptOnConnector,
    ScriptOnResource,
}

impl Capability {
    /// Get all capabilities.
    pub fn all() -> &'static [Capability] {
        &[
            Capability::Create,
            Capability::Delete,
            Capability::Update,
            Capability::UpdateAttributeValues,
            Capability::Search,
            Capability::Sync,
            Capability::Schema,
            Capability::Test,
            Capability::Authenticate,
            Capability::ResolveUsername,
            Capability::ScriptOnConnector,
            Capability::ScriptOnResource,
        ]
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Create => "create",
            Capability::Delete => "delete",
            Capability::Update => "update",
            Capability::UpdateAttributeValues => "update_attribute_values",
            Capability::Search => "search",
            Capability::Sync => "sync",
            Capability::Schema => "schema",
            Capability::Test => "test",
            Capability::Authenticate => "authenticate",
            Capability::ResolveUsername => "resolve_username",
            Capability::ScriptOnConnector => "script_on_connector",
            Capability::ScriptOnResource => "script_on_resource",
        }
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The capabilities one connector instance implements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    bits: u16,
}

impl CapabilitySet {
    /// Create an empty set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Probe a connector's capability accessors.
    pub fn probe(connector: &dyn Connector) -> Self {
        let probes = [
            (Capability::Create, connector.as_create_op().is_some()),
            (Capability::Delete, connector.as_delete_op().is_some()),
            (Capability::Update, connector.as_update_op().is_some()),
            (
                Capability::UpdateAttributeValues,
                connector.as_update_attribute_values_op().is_some(),
            ),
            (Capability::Search, connector.as_search_op().is_some()),
            (Capability::Sync, connector.as_sync_op().is_some()),
            (Capability::Schema, connector.as_schema_op().is_some()),
            (Capability::Test, connector.as_test_op().is_some()),
            (
                Capability::Authenticate,
                connector.as_authenticate_op().is_some(),
            ),
            (
                Capability::ResolveUsername,
                connector.as_resolve_username_op().is_some(),
            ),
            (
                Capability::ScriptOnConnector,
                connector.as_script_on_connector_op().is_some(),
            ),
            (
                Capability::ScriptOnResource,
                connector.as_script_on_resource_op().is_some(),
            ),
        ];
        probes
            .into_iter()
            .filter(|(_, present)| *present)
            .map(|(capability, _)| capability)
            .collect()
    }

    /// Add a capability.
    pub fn insert(&mut self, capability: Capability) {
        self.bits |= capability.bit();
    }

    /// Add a capability using builder pattern.
    pub fn with(mut self, capability: Capability) -> Self {
        self.insert(capability);
        self
    }

    /// Check if the set contains a capability.
    pub fn contains(&self, capability: Capability) -> bool {
        self.bits & capability.bit() != 0
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Iterate over the contained capabilities.
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::all()
            .iter()
            .copied()
            .filter(move |c| self.contains(*c))
    }

    /// Check if a facade operation can run against these capabilities.
    ///
    /// Add and remove of attribute values are available natively or through
    /// fetch-merge emulation, which needs update and search.
    pub fn supports(&self, operation: ApiOperation) -> bool {
        match operation {
            ApiOperation::Create => self.contains(Capability::Create),
            ApiOperation::Delete => self.contains(Capability::Delete),
            ApiOperation::Update => self.contains(Capability::Update),
            ApiOperation::AddAttributeValues | ApiOperation::RemoveAttributeValues => {
                self.contains(Capability::UpdateAttributeValues)
                    || (self.contains(Capability::Update) && self.contains(Capability::Search))
            }
            ApiOperation::Search | ApiOperation::Get => self.contains(Capability::Search),
            ApiOperation::Sync | ApiOperation::GetLatestSyncToken => {
                self.contains(Capability::Sync)
            }
            ApiOperation::Schema => self.contains(Capability::Schema),
            ApiOperation::Test => self.contains(Capability::Test),
            ApiOperation::Validate => true,
            ApiOperation::Authenticate => self.contains(Capability::Authenticate),
            ApiOperation::ResolveUsername => self.contains(Capability::ResolveUsername),
            ApiOperation::ScriptOnConnector => self.contains(Capability::ScriptOnConnector),
            ApiOperation::ScriptOnResource => self.contains(Capability::ScriptOnResource),
        }
    }

    /// Get the facade operations these capabilities support.
    pub fn supported_operations(&self) -> Vec<ApiOperation> {
        ApiOperation::all()
            .iter()
            .copied()
            .filter(|op| self.supports(*op))
            .collect()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = Capability>>(iter: T) -> Self {
        let mut set = Self::empty();
        for capability in iter {
            set.insert(capability);
        }
        set
    }
}

/// A live connector and the capabilities bound to it.
pub struct ConnectorInstance {
    connector: Box<dyn Connector>,
    capabilities: CapabilitySet,
}

impl ConnectorInstance {
    /// Bind an initialized connector.
    pub fn new(connector: Box<dyn Connector>) -> Self {
        let capabilities = CapabilitySet::probe(connector.as_ref());
        Self {
            connector,
            capabilities,
        }
    }

    /// Construct a connector from the factory and initialize it.
    ///
    /// An instance whose initialization fails is disposed before the error
    /// is returned.
    pub async fn create(
        factory: &dyn ConnectorFactory,
        configuration: Configuration,
    ) -> ConnectorResult<Self> {
        let mut connector = factory.new_connector();
        if let Err(e) = connector.init(configuration).await {
            if let Err(dispose_err) = connector.dispose() {
                warn!(
                    connector = %factory.key(),
                    error = %dispose_err,
                    "Failed to dispose connector after init failure"
                );
            }
            return Err(e);
        }
        Ok(Self::new(connector))
    }

    /// Capabilities probed at construction.
    pub fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    /// The underlying connector.
    pub fn connector(&self) -> &dyn Connector {
        self.connector.as_ref()
    }

    /// Run the connector's liveness probe.
    pub async fn check_alive(&self) -> ConnectorResult<()> {
        self.connector.check_alive().await
    }

    /// Dispose the connector, consuming the instance.
    pub fn dispose(mut self) -> ConnectorResult<()> {
        self.connector.dispose()
    }

    fn require(&self, capability: Capability, operation: ApiOperation) -> ConnectorResult<()> {
        if self.capabilities.contains(capability) {
            Ok(())
        } else {
            Err(ConnectorError::OperationNotSupported { operation })
        }
    }

    /// Create capability.
    pub fn create_op(&self) -> ConnectorResult<&dyn CreateOp> {
        self.require(Capability::Create, ApiOperation::Create)?;
        self.connector.as_create_op().ok_or_else(|| unbound(Capability::Create))
    }

    /// Delete capability.
    pub fn delete_op(&self) -> ConnectorResult<&dyn DeleteOp> {
        self.require(Capability::Delete, ApiOperation::Delete)?;
        self.connector.as_delete_op().ok_or_else(|| unbound(Capability::Delete))
    }

    /// Update (replace) capability.
    pub fn update_op(&self) -> ConnectorResult<&dyn UpdateOp> {
        self.require(Capability::Update, ApiOperation::Update)?;
        self.connector.as_update_op().ok_or_else(|| unbound(Capability::Update))
    }

    /// Native add/remove values capability, if the connector has one.
    pub fn update_attribute_values_op(&self) -> Option<&dyn UpdateAttributeValuesOp> {
        if self.capabilities.contains(Capability::UpdateAttributeValues) {
            self.connector.as_update_attribute_values_op()
        } else {
            None
        }
    }

    /// Search capability.
    pub fn search_op(&self) -> ConnectorResult<&dyn ErasedSearchOp> {
        self.require(Capability::Search, ApiOperation::Search)?;
        self.connector.as_search_op().ok_or_else(|| unbound(Capability::Search))
    }

    /// Sync capability.
    pub fn sync_op(&self) -> ConnectorResult<&dyn SyncOp> {
        self.require(Capability::Sync, ApiOperation::Sync)?;
        self.connector.as_sync_op().ok_or_else(|| unbound(Capability::Sync))
    }

    /// Schema capability.
    pub fn schema_op(&self) -> ConnectorResult<&dyn SchemaOp> {
        self.require(Capability::Schema, ApiOperation::Schema)?;
        self.connector.as_schema_op().ok_or_else(|| unbound(Capability::Schema))
    }

    /// Test capability.
    pub fn test_op(&self) -> ConnectorResult<&dyn TestOp> {
        self.require(Capability::Test, ApiOperation::Test)?;
        self.connector.as_test_op().ok_or_else(|| unbound(Capability::Test))
    }

    /// Authenticate capability.
    pub fn authenticate_op(&self) -> ConnectorResult<&dyn AuthenticateOp> {
        self.require(Capability::Authenticate, ApiOperation::Authenticate)?;
        self.connector
            .as_authenticate_op()
            .ok_or_else(|| unbound(Capability::Authenticate))
    }

    /// Resolve username capability.
    pub fn resolve_username_op(&self) -> ConnectorResult<&dyn ResolveUsernameOp> {
        self.require(Capability::ResolveUsername, ApiOperation::ResolveUsername)?;
        self.connector
            .as_resolve_username_op()
            .ok_or_else(|| unbound(Capability::ResolveUsername))
    }

    /// Script on connector capability.
    pub fn script_on_connector_op(&self) -> ConnectorResult<&dyn ScriptOnConnectorOp> {
        self.require(Capability::ScriptOnConnector, ApiOperation::ScriptOnConnector)?;
        self.connector
            .as_script_on_connector_op()
            .ok_or_else(|| unbound(Capability::ScriptOnConnector))
    }

    /// Script on resource capability.
    pub fn script_on_resource_op(&self) -> ConnectorResult<&dyn ScriptOnResourceOp> {
        self.require(Capability::ScriptOnResource, ApiOperation::ScriptOnResource)?;
        self.connector
            .as_script_on_resource_op()
            .ok_or_else(|| unbound(Capability::ScriptOnResource))
    }
}

impl fmt::Debug for ConnectorInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorInstance")
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

/// An accessor answered differently than when the instance was probed.
fn unbound(capability: Capability) -> ConnectorError {
    ConnectorError::internal(format!(
        "connector stopped providing the '{capability}' capability"
    ))
}
