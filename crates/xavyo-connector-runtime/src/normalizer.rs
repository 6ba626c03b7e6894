//! Normalization facade
//!
//! Applies a connector's optional [`AttributeNormalizer`] to everything that
//! crosses the connector boundary for one object class. Without a normalizer
//! every method is the identity.

use crate::filter::Filter;
use crate::operation::{Attribute, AttributeSet, ConnectorObject, ObjectClass, Uid};
use crate::sync::SyncDelta;
use crate::traits::AttributeNormalizer;

/// Normalizes attributes, objects, filters, and sync deltas of one object class.
#[derive(Clone, Copy)]
pub struct ObjectNormalizerFacade<'a> {
    object_class: &'a ObjectClass,
    normalizer: Option<&'a dyn AttributeNormalizer>,
}

impl<'a> ObjectNormalizerFacade<'a> {
    /// Create a facade for the object class.
    pub fn new(
        object_class: &'a ObjectClass,
        normalizer: Option<&'a dyn AttributeNormalizer>,
    ) -> Self {
        Self {
            object_class,
            normalizer,
        }
    }

    /// Object class this facade normalizes for.
    pub fn object_class(&self) -> &ObjectClass {
        self.object_class
    }

    /// Normalize one attribute.
    pub fn normalize_attribute(&self, attribute: Attribute) -> Attribute {
        match self.normalizer {
            Some(normalizer) => normalizer.normalize_attribute(self.object_class, attribute),
            None => attribute,
        }
    }

    /// Normalize every attribute of a set.
    pub fn normalize_attributes(&self, attributes: AttributeSet) -> AttributeSet {
        if self.normalizer.is_none() {
            return attributes;
        }
        attributes
            .into_iter()
            .map(|attribute| self.normalize_attribute(attribute))
            .collect()
    }

    /// Normalize a uid through its attribute form. A uid the normalizer
    /// turns into something that is no longer a uid is kept as is.
    pub fn normalize_uid(&self, uid: Uid) -> Uid {
        if self.normalizer.is_none() {
            return uid;
        }
        let normalized = self.normalize_attribute(uid.to_attribute());
        Uid::from_attribute(&normalized).unwrap_or(uid)
    }

    /// Rebuild an object with its attributes normalized.
    pub fn normalize_object(&self, object: ConnectorObject) -> ConnectorObject {
        if self.normalizer.is_none() {
            return object;
        }
        object.map_attributes(|attributes| self.normalize_attributes(attributes))
    }

    /// Normalize the attribute carried by every comparison in the tree.
    pub fn normalize_filter(&self, filter: Filter) -> Filter {
        if self.normalizer.is_none() {
            return filter;
        }
        match filter {
            Filter::Equals(a) => Filter::Equals(self.normalize_attribute(a)),
            Filter::EqualsIgnoreCase(a) => Filter::EqualsIgnoreCase(self.normalize_attribute(a)),
            Filter::GreaterThan(a) => Filter::GreaterThan(self.normalize_attribute(a)),
            Filter::GreaterThanOrEqual(a) => {
                Filter::GreaterThanOrEqual(self.normalize_attribute(a))
            }
            Filter::LessThan(a) => Filter::LessThan(self.normalize_attribute(a)),
            Filter::LessThanOrEqual(a) => Filter::LessThanOrEqual(self.normalize_attribute(a)),
            Filter::Contains(a) => Filter::Contains(self.normalize_attribute(a)),
            Filter::StartsWith(a) => Filter::StartsWith(self.normalize_attribute(a)),
            Filter::EndsWith(a) => Filter::EndsWith(self.normalize_attribute(a)),
            Filter::ContainsAllValues(a) => {
                Filter::ContainsAllValues(self.normalize_attribute(a))
            }
            Filter::And { filters } => Filter::And {
                filters: filters
                    .into_iter()
                    .map(|f| self.normalize_filter(f))
                    .collect(),
            },
            Filter::Or { filters } => Filter::Or {
                filters: filters
                    .into_iter()
                    .map(|f| self.normalize_filter(f))
                    .collect(),
            },
            Filter::Not { filter } => Filter::negate(self.normalize_filter(*filter)),
            other => other,
        }
    }

    /// Normalize the object a delta carries. Deletes pass through.
    pub fn normalize_sync_delta(&self, delta: SyncDelta) -> SyncDelta {
        if self.normalizer.is_none() {
            return delta;
        }
        delta.map_object(|object| self.normalize_object(object))
    }
}
