//! Sync change records
//!
//! A [`SyncDelta`] reports one change on the resource together with the
//! [`SyncToken`] a caller resumes from. Deltas are only built through
//! [`SyncDeltaBuilder`], which enforces:
//!
//! - the object is present exactly when the delta is not a delete
//! - a previous uid is only set on non-delete deltas
//! - the delta uid is the uid of the carried object

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConnectorError, ConnectorResult};
use crate::operation::{ConnectorObject, ObjectClass, Uid};
use crate::types::SyncDeltaType;

/// Opaque resumption cursor defined by the connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncToken(Value);

impl SyncToken {
    /// Wrap a connector-defined value.
    pub fn new(value: impl Into<Value>) -> Self {
        Self(value.into())
    }

    /// Get the value.
    pub fn value(&self) -> &Value {
        &self.0
    }
}

/// One change record from a sync stream.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncDelta {
    token: SyncToken,
    delta_type: SyncDeltaType,
    previous_uid: Option<Uid>,
    object_class: Option<ObjectClass>,
    uid: Uid,
    object: Option<ConnectorObject>,
}

impl SyncDelta {
    /// Start building a delta.
    pub fn builder(token: SyncToken, delta_type: SyncDeltaType) -> SyncDeltaBuilder {
        SyncDeltaBuilder {
            token,
            delta_type,
            previous_uid: None,
            object_class: None,
            uid: None,
            object: None,
        }
    }

    /// Token to resume after this delta.
    pub fn token(&self) -> &SyncToken {
        &self.token
    }

    /// Kind of change.
    pub fn delta_type(&self) -> SyncDeltaType {
        self.delta_type
    }

    /// Uid before the change, when the change renamed the object.
    pub fn previous_uid(&self) -> Option<&Uid> {
        self.previous_uid.as_ref()
    }

    /// Object class of the changed object, if known.
    pub fn object_class(&self) -> Option<&ObjectClass> {
        self.object_class.as_ref()
    }

    /// Uid of the changed object.
    pub fn uid(&self) -> &Uid {
        &self.uid
    }

    /// The object after the change; absent for deletes.
    pub fn object(&self) -> Option<&ConnectorObject> {
        self.object.as_ref()
    }

    /// Rebuild the delta with the carried object transformed. Deletes are
    /// returned unchanged.
    pub fn map_object(self, f: impl FnOnce(ConnectorObject) -> ConnectorObject) -> Self {
        match self.object {
            Some(object) => {
                let object = f(object);
                Self {
                    uid: object.uid().clone(),
                    object_class: Some(object.object_class().clone()),
                    object: Some(object),
                    ..self
                }
            }
            None => self,
        }
    }
}

/// Builder for [`SyncDelta`].
#[derive(Debug, Clone)]
pub struct SyncDeltaBuilder {
    token: SyncToken,
    delta_type: SyncDeltaType,
    previous_uid: Option<Uid>,
    object_class: Option<ObjectClass>,
    uid: Option<Uid>,
    object: Option<ConnectorObject>,
}

impl SyncDeltaBuilder {
    /// Set the uid of the changed object.
    pub fn uid(mut self, uid: impl Into<Uid>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// Set the uid the object had before the change.
    pub fn previous_uid(mut self, uid: impl Into<Uid>) -> Self {
        self.previous_uid = Some(uid.into());
        self
    }

    /// Set the object class.
    pub fn object_class(mut self, object_class: ObjectClass) -> Self {
        self.object_class = Some(object_class);
        self
    }

    /// Set the object after the change. Also sets uid and object class.
    pub fn object(mut self, object: ConnectorObject) -> Self {
        self.uid = Some(object.uid().clone());
        self.object_class = Some(object.object_class().clone());
        self.object = Some(object);
        self
    }

    /// Build the delta.
    pub fn build(self) -> ConnectorResult<SyncDelta> {
        let uid = self
            .uid
            .ok_or_else(|| ConnectorError::invalid_object("sync delta has no uid"))?;

        match (self.delta_type.carries_object(), &self.object) {
            (true, None) => {
                return Err(ConnectorError::invalid_object(format!(
                    "{} delta must carry an object",
                    self.delta_type
                )))
            }
            (false, Some(_)) => {
                return Err(ConnectorError::invalid_object(
                    "delete delta must not carry an object",
                ))
            }
            _ => {}
        }

        if self.delta_type == SyncDeltaType::Delete && self.previous_uid.is_some() {
            return Err(ConnectorError::invalid_object(
                "delete delta must not carry a previous uid",
            ));
        }

        if let Some(object) = &self.object {
            if object.uid() != &uid {
                return Err(ConnectorError::invalid_object(
                    "sync delta uid does not match its object",
                ));
            }
        }

        Ok(SyncDelta {
            token: self.token,
            delta_type: self.delta_type,
            previous_uid: self.previous_uid,
            object_class: self.object_class,
            uid,
            object: self.object,
        })
    }
}
