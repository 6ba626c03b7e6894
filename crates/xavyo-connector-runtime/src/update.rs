//! Update reconciliation
//!
//! Full replace goes straight to the connector's [`UpdateOp`]. Adding or
//! removing individual values uses the connector's native
//! [`UpdateAttributeValuesOp`] when it has one, and is otherwise emulated:
//! fetch the touched attributes, merge the delta in process, replace.
//!
//! Emulated updates are not atomic. A concurrent change to the same object
//! on the resource between the fetch and the replace is lost.
//!
//! [`UpdateOp`]: crate::traits::UpdateOp
//! [`UpdateAttributeValuesOp`]: crate::traits::UpdateAttributeValuesOp

use tracing::debug;

use crate::capability::ConnectorInstance;
use crate::error::{ConnectorError, ConnectorResult};
use crate::normalizer::ObjectNormalizerFacade;
use crate::operation::{
    Attribute, AttributeSet, ConnectorObject, ObjectClass, ReservedAttributes, Uid, UID_ATTRIBUTE,
};
use crate::options::OperationOptions;
use crate::search::SearchOrchestrator;
use crate::types::ApiOperation;

/// Which way an incremental delta changes values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueChange {
    Add,
    Remove,
}

impl ValueChange {
    fn operation(self) -> ApiOperation {
        match self {
            ValueChange::Add => ApiOperation::AddAttributeValues,
            ValueChange::Remove => ApiOperation::RemoveAttributeValues,
        }
    }
}

/// Check a delta before anything reaches the connector.
///
/// No delta may carry `__UID__`. Add and remove deltas may not touch a
/// reserved attribute either.
pub fn validate_delta(
    operation: ApiOperation,
    delta: &AttributeSet,
    reserved: &ReservedAttributes,
) -> ConnectorResult<()> {
    if delta.contains(UID_ATTRIBUTE) {
        return Err(ConnectorError::invalid_delta(
            UID_ATTRIBUTE,
            "the uid cannot be part of an update delta",
        ));
    }
    if matches!(
        operation,
        ApiOperation::AddAttributeValues | ApiOperation::RemoveAttributeValues
    ) {
        if let Some(name) = delta.names().find(|name| reserved.contains(name)) {
            return Err(ConnectorError::invalid_delta(
                name,
                format!("reserved attribute cannot be used with {operation}"),
            ));
        }
    }
    Ok(())
}

/// Runs update operations against one connector instance.
#[derive(Debug, Clone, Copy)]
pub struct UpdateReconciler<'a> {
    instance: &'a ConnectorInstance,
    reserved: &'a ReservedAttributes,
}

impl<'a> UpdateReconciler<'a> {
    pub fn new(instance: &'a ConnectorInstance, reserved: &'a ReservedAttributes) -> Self {
        Self { instance, reserved }
    }

    fn normalizer<'o>(&'o self, object_class: &'o ObjectClass) -> ObjectNormalizerFacade<'o> {
        ObjectNormalizerFacade::new(object_class, self.instance.connector().attribute_normalizer())
    }

    /// Replace the given attributes and return the (possibly new) uid.
    pub async fn update(
        &self,
        object_class: &ObjectClass,
        uid: &Uid,
        replace: AttributeSet,
        options: &OperationOptions,
    ) -> ConnectorResult<Uid> {
        validate_delta(ApiOperation::Update, &replace, self.reserved)?;
        let update = self.instance.update_op()?;

        let normalizer = self.normalizer(object_class);
        let uid = normalizer.normalize_uid(uid.clone());
        let replace = normalizer.normalize_attributes(replace);
        let uid = update.update(object_class, &uid, replace, options).await?;
        Ok(normalizer.normalize_uid(uid))
    }

    /// Append values to attributes.
    pub async fn add_attribute_values(
        &self,
        object_class: &ObjectClass,
        uid: &Uid,
        values: AttributeSet,
        options: &OperationOptions,
    ) -> ConnectorResult<Uid> {
        self.change_values(ValueChange::Add, object_class, uid, values, options)
            .await
    }

    /// Remove values from attributes.
    pub async fn remove_attribute_values(
        &self,
        object_class: &ObjectClass,
        uid: &Uid,
        values: AttributeSet,
        options: &OperationOptions,
    ) -> ConnectorResult<Uid> {
        self.change_values(ValueChange::Remove, object_class, uid, values, options)
            .await
    }

    async fn change_values(
        &self,
        change: ValueChange,
        object_class: &ObjectClass,
        uid: &Uid,
        delta: AttributeSet,
        options: &OperationOptions,
    ) -> ConnectorResult<Uid> {
        let operation = change.operation();
        validate_delta(operation, &delta, self.reserved)?;

        let normalizer = self.normalizer(object_class);
        let uid = normalizer.normalize_uid(uid.clone());
        let delta = normalizer.normalize_attributes(delta);

        if let Some(native) = self.instance.update_attribute_values_op() {
            let uid = match change {
                ValueChange::Add => {
                    native
                        .add_attribute_values(object_class, &uid, delta, options)
                        .await?
                }
                ValueChange::Remove => {
                    native
                        .remove_attribute_values(object_class, &uid, delta, options)
                        .await?
                }
            };
            return Ok(normalizer.normalize_uid(uid));
        }

        if !self.instance.capabilities().supports(operation) {
            return Err(ConnectorError::OperationNotSupported { operation });
        }

        debug!(
            object_class = %object_class,
            uid = %uid,
            operation = %operation,
            attributes = delta.len(),
            "Emulating incremental update with fetch and replace"
        );

        let fetch_options = options
            .to_builder()
            .attributes_to_get(delta.names().map(str::to_string).collect::<Vec<_>>())
            .build();
        let current = SearchOrchestrator::new(self.instance)
            .get_object(object_class, &uid, &fetch_options)
            .await?
            .ok_or_else(|| ConnectorError::UnknownUid {
                object_class: object_class.to_string(),
                uid: uid.to_string(),
            })?;

        let merged = match change {
            ValueChange::Add => merge_added(&current, delta),
            ValueChange::Remove => merge_removed(&current, delta),
        };
        self.update(object_class, &uid, merged, options).await
    }
}

/// Existing values followed by the added ones. Duplicates are kept.
fn merge_added(current: &ConnectorObject, delta: AttributeSet) -> AttributeSet {
    delta
        .into_iter()
        .map(|added| match current.attribute(added.name()) {
            Some(existing) => {
                let name = existing.name().to_string();
                let values = existing
                    .values()
                    .iter()
                    .cloned()
                    .chain(added.into_values());
                Attribute::new(name, values)
            }
            None => added,
        })
        .collect()
}

/// Existing values minus the removed ones. An attribute left with no
/// values is replaced by an explicitly empty one; an attribute the object
/// does not carry is left out.
fn merge_removed(current: &ConnectorObject, delta: AttributeSet) -> AttributeSet {
    delta
        .into_iter()
        .filter_map(|removed| {
            let existing = current.attribute(removed.name())?;
            let remaining = existing
                .values()
                .iter()
                .filter(|value| !removed.values().contains(value))
                .cloned();
            Some(Attribute::new(existing.name().to_string(), remaining))
        })
        .collect()
}
