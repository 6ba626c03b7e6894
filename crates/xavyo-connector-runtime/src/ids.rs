//! Connector runtime identifiers
//!
//! Newtype wrappers for connector keys and facade instances.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifies a connector implementation (bundle, version, connector name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectorKey {
    /// Name of the bundle that ships the connector.
    pub bundle_name: String,
    /// Version of the bundle.
    pub bundle_version: String,
    /// Name of the connector within the bundle.
    pub connector_name: String,
}

impl ConnectorKey {
    /// Create a new connector key.
    pub fn new(
        bundle_name: impl Into<String>,
        bundle_version: impl Into<String>,
        connector_name: impl Into<String>,
    ) -> Self {
        Self {
            bundle_name: bundle_name.into(),
            bundle_version: bundle_version.into(),
            connector_name: connector_name.into(),
        }
    }
}

impl fmt::Display for ConnectorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.bundle_name, self.bundle_version, self.connector_name
        )
    }
}

/// Unique identifier for a connector facade instance, carried in log spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacadeId(Uuid);

impl FacadeId {
    /// Create a new random FacadeId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID value.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for FacadeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FacadeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
