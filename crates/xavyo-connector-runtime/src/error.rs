//! Connector runtime error types
//!
//! Error definitions with transient/permanent classification. Connector
//! implementations raise the same type, so a fault produced by a connector
//! reaches the caller exactly as it was raised.

use thiserror::Error;

use crate::ids::ConnectorKey;
use crate::types::ApiOperation;

/// Error that can occur while executing a connector operation.
#[derive(Debug, Error)]
pub enum ConnectorError {
    // Precondition errors
    /// A required argument was missing or blank.
    #[error("invalid argument '{argument}': {message}")]
    InvalidArgument { argument: String, message: String },

    // Structural errors
    /// An attribute set names the same attribute more than once.
    #[error("duplicate attribute name: {name}")]
    DuplicateAttribute { name: String },

    /// An attribute set is not acceptable for the operation.
    #[error("invalid attribute set: {message}")]
    InvalidAttributeSet { message: String },

    /// An update delta touches an attribute it may not touch.
    #[error("invalid delta for attribute '{attribute}': {reason}")]
    InvalidDelta { attribute: String, reason: String },

    /// A connector object, sync delta, or similar value could not be built.
    #[error("invalid object: {message}")]
    InvalidObject { message: String },

    // Identity errors
    /// The object identified by the uid does not exist.
    #[error("unknown uid '{uid}' for object class '{object_class}'")]
    UnknownUid { object_class: String, uid: String },

    /// Object already exists in target system (create conflict).
    #[error("object already exists: {identifier}")]
    ObjectAlreadyExists { identifier: String },

    // Capability errors
    /// The connector does not implement the capability the operation needs.
    #[error("operation '{operation}' is not supported by this connector")]
    OperationNotSupported { operation: ApiOperation },

    // Connection errors (usually transient)
    /// Failed to establish connection to target system.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Connection timed out.
    #[error("connection timeout after {timeout_secs} seconds")]
    ConnectionTimeout { timeout_secs: u64 },

    /// Target system is temporarily unavailable.
    #[error("target system unavailable: {message}")]
    TargetUnavailable { message: String },

    /// Network error during communication.
    #[error("network error: {message}")]
    NetworkError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Authentication errors (usually permanent)
    /// Invalid credentials provided.
    #[error("authentication failed: invalid credentials")]
    AuthenticationFailed,

    /// The password is correct but has expired.
    #[error("authentication failed: password expired")]
    PasswordExpired,

    /// Insufficient permissions for the operation.
    #[error("permission denied for {operation}")]
    PermissionDenied { operation: String },

    // Target system errors
    /// Constraint violation in target system.
    #[error("constraint violation: {message}")]
    ConstraintViolation { message: String },

    /// Invalid data format.
    #[error("invalid data: {message}")]
    InvalidData { message: String },

    /// Operation failed.
    #[error("operation failed: {message}")]
    OperationFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Configuration and pooling errors
    /// Connector configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// No factory is registered under the given key.
    #[error("connector not registered: {key}")]
    ConnectorNotRegistered { key: ConnectorKey },

    /// No pooled instance became available in time.
    #[error("connector pool exhausted after waiting {waited_ms} ms")]
    PoolExhausted { waited_ms: u64 },

    // Internal errors
    /// Internal error.
    #[error("internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization error.
    #[error("serialization error: {message}")]
    Serialization { message: String },
}

impl ConnectorError {
    /// Check if this error is transient and the operation could be retried.
    ///
    /// The runtime never retries on its own; the classification is for callers.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ConnectorError::ConnectionFailed { .. }
                | ConnectorError::ConnectionTimeout { .. }
                | ConnectorError::TargetUnavailable { .. }
                | ConnectorError::NetworkError { .. }
                | ConnectorError::PoolExhausted { .. }
        )
    }

    /// Check if this error is permanent and retry won't help.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConnectorError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            ConnectorError::DuplicateAttribute { .. } => "DUPLICATE_ATTRIBUTE",
            ConnectorError::InvalidAttributeSet { .. } => "INVALID_ATTRIBUTE_SET",
            ConnectorError::InvalidDelta { .. } => "INVALID_DELTA",
            ConnectorError::InvalidObject { .. } => "INVALID_OBJECT",
            ConnectorError::UnknownUid { .. } => "UNKNOWN_UID",
            ConnectorError::ObjectAlreadyExists { .. } => "OBJECT_EXISTS",
            ConnectorError::OperationNotSupported { .. } => "OPERATION_NOT_SUPPORTED",
            ConnectorError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            ConnectorError::ConnectionTimeout { .. } => "CONNECTION_TIMEOUT",
            ConnectorError::TargetUnavailable { .. } => "TARGET_UNAVAILABLE",
            ConnectorError::NetworkError { .. } => "NETWORK_ERROR",
            ConnectorError::AuthenticationFailed => "AUTH_FAILED",
            ConnectorError::PasswordExpired => "PASSWORD_EXPIRED",
            ConnectorError::PermissionDenied { .. } => "PERMISSION_DENIED",
            ConnectorError::ConstraintViolation { .. } => "CONSTRAINT_VIOLATION",
            ConnectorError::InvalidData { .. } => "INVALID_DATA",
            ConnectorError::OperationFailed { .. } => "OPERATION_FAILED",
            ConnectorError::InvalidConfiguration { .. } => "INVALID_CONFIG",
            ConnectorError::ConnectorNotRegistered { .. } => "CONNECTOR_NOT_REGISTERED",
            ConnectorError::PoolExhausted { .. } => "POOL_EXHAUSTED",
            ConnectorError::Internal { .. } => "INTERNAL_ERROR",
            ConnectorError::Serialization { .. } => "SERIALIZATION_ERROR",
        }
    }

    // Convenience constructors

    /// Create an invalid argument error.
    pub fn invalid_argument(argument: impl Into<String>, message: impl Into<String>) -> Self {
        ConnectorError::InvalidArgument {
            argument: argument.into(),
            message: message.into(),
        }
    }

    /// Create an invalid delta error.
    pub fn invalid_delta(attribute: impl Into<String>, reason: impl Into<String>) -> Self {
        ConnectorError::InvalidDelta {
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid object error.
    pub fn invalid_object(message: impl Into<String>) -> Self {
        ConnectorError::InvalidObject {
            message: message.into(),
        }
    }

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        ConnectorError::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection failed error with source.
    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an operation failed error.
    pub fn operation_failed(message: impl Into<String>) -> Self {
        ConnectorError::OperationFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ConnectorError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        ConnectorError::InvalidConfiguration {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ConnectorError {
    fn from(err: serde_json::Error) -> Self {
        ConnectorError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;
