//! Connector runtime type definitions
//!
//! Enums for the caller-facing operation set, sync deltas, and search scope.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Caller-facing operation exposed by a connector facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiOperation {
    /// Create a new object
    Create,
    /// Delete an object
    Delete,
    /// Replace attributes of an object
    Update,
    /// Add values to attributes of an object
    AddAttributeValues,
    /// Remove values from attributes of an object
    RemoveAttributeValues,
    /// Search objects of a class
    Search,
    /// Fetch a single object by uid
    Get,
    /// Stream change records since a token
    Sync,
    /// Fetch the latest sync token
    GetLatestSyncToken,
    /// Fetch the resource schema
    Schema,
    /// Test the connector configuration against the resource
    Test,
    /// Validate the configuration without touching the resource
    Validate,
    /// Authenticate an account
    Authenticate,
    /// Resolve a username to a uid
    ResolveUsername,
    /// Run a script inside the connector
    ScriptOnConnector,
    /// Run a script on the target resource
    ScriptOnResource,
}

impl ApiOperation {
    /// Get all operations.
    #[must_use]
    pub fn all() -> &'static [ApiOperation] {
        &[
            ApiOperation::Create,
            ApiOperation::Delete,
            ApiOperation::Update,
            ApiOperation::AddAttributeValues,
            ApiOperation::RemoveAttributeValues,
            ApiOperation::Search,
            ApiOperation::Get,
            ApiOperation::Sync,
            ApiOperation::GetLatestSyncToken,
            ApiOperation::Schema,
            ApiOperation::Test,
            ApiOperation::Validate,
            ApiOperation::Authenticate,
            ApiOperation::ResolveUsername,
            ApiOperation::ScriptOnConnector,
            ApiOperation::ScriptOnResource,
        ]
    }

    /// Get the string representation used in logs and error messages.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiOperation::Create => "create",
            ApiOperation::Delete => "delete",
            ApiOperation::Update => "update",
            ApiOperation::AddAttributeValues => "add_attribute_values",
            ApiOperation::RemoveAttributeValues => "remove_attribute_values",
            ApiOperation::Search => "search",
            ApiOperation::Get => "get",
            ApiOperation::Sync => "sync",
            ApiOperation::GetLatestSyncToken => "get_latest_sync_token",
            ApiOperation::Schema => "schema",
            ApiOperation::Test => "test",
            ApiOperation::Validate => "validate",
            ApiOperation::Authenticate => "authenticate",
            ApiOperation::ResolveUsername => "resolve_username",
            ApiOperation::ScriptOnConnector => "script_on_connector",
            ApiOperation::ScriptOnResource => "script_on_resource",
        }
    }

    /// Check if the operation accepts the `__ALL__` object class.
    #[must_use]
    pub fn accepts_all_object_class(&self) -> bool {
        matches!(self, ApiOperation::Sync | ApiOperation::GetLatestSyncToken)
    }
}

impl fmt::Display for ApiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ApiOperation {
    type Err = ParseApiOperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_lowercase();
        ApiOperation::all()
            .iter()
            .copied()
            .find(|op| op.as_str() == lowered)
            .ok_or_else(|| ParseApiOperationError(s.to_string()))
    }
}

/// Error parsing an operation name from string.
#[derive(Debug, Clone)]
pub struct ParseApiOperationError(String);

impl fmt::Display for ParseApiOperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid operation '{}'", self.0)
    }
}

impl std::error::Error for ParseApiOperationError {}

/// Kind of change carried by a sync delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDeltaType {
    /// The object was created or updated; the resource cannot tell which.
    CreateOrUpdate,
    /// The object was created.
    Create,
    /// The object was updated.
    Update,
    /// The object was deleted.
    Delete,
}

impl SyncDeltaType {
    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncDeltaType::CreateOrUpdate => "create_or_update",
            SyncDeltaType::Create => "create",
            SyncDeltaType::Update => "update",
            SyncDeltaType::Delete => "delete",
        }
    }

    /// Check if deltas of this type carry the current object.
    #[must_use]
    pub fn carries_object(&self) -> bool {
        !matches!(self, SyncDeltaType::Delete)
    }
}

impl fmt::Display for SyncDeltaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Depth of a search below its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    /// Only the container object itself.
    Object,
    /// Direct children of the container.
    OneLevel,
    /// The container and everything below it.
    #[default]
    Subtree,
}

impl SearchScope {
    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchScope::Object => "object",
            SearchScope::OneLevel => "one_level",
            SearchScope::Subtree => "subtree",
        }
    }
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
