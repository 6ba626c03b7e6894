//! Connector runtime object model
//!
//! Object classes, uids, attribute values, attribute sets, and connector
//! objects. All of these are values: built once, never mutated in place.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::btree_map::{self, BTreeMap};
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{ConnectorError, ConnectorResult};
use crate::guarded::GuardedString;

/// Name of the attribute carrying an object's uid.
pub const UID_ATTRIBUTE: &str = "__UID__";

/// Name of the attribute carrying an object's human-facing name.
pub const NAME_ATTRIBUTE: &str = "__NAME__";

/// Operational attributes: reserved names with special semantics on the resource.
pub mod operational {
    /// Whether the account is enabled.
    pub const ENABLE: &str = "__ENABLE__";
    /// When the account becomes enabled.
    pub const ENABLE_DATE: &str = "__ENABLE_DATE__";
    /// When the account becomes disabled.
    pub const DISABLE_DATE: &str = "__DISABLE_DATE__";
    /// Whether the account is locked out.
    pub const LOCK_OUT: &str = "__LOCK_OUT__";
    /// When the password expires.
    pub const PASSWORD_EXPIRATION_DATE: &str = "__PASSWORD_EXPIRATION_DATE__";
    /// Whether the password has expired.
    pub const PASSWORD_EXPIRED: &str = "__PASSWORD_EXPIRED__";
    /// The account password.
    pub const PASSWORD: &str = "__PASSWORD__";
    /// The current password, required by some resources to change it.
    pub const CURRENT_PASSWORD: &str = "__CURRENT_PASSWORD__";

    /// All operational attribute names.
    pub const ALL: &[&str] = &[
        ENABLE,
        ENABLE_DATE,
        DISABLE_DATE,
        LOCK_OUT,
        PASSWORD_EXPIRATION_DATE,
        PASSWORD_EXPIRED,
        PASSWORD,
        CURRENT_PASSWORD,
    ];
}

/// Category of managed object, e.g. accounts or groups.
///
/// Comparison is case-insensitive.
#[derive(Debug, Clone)]
pub struct ObjectClass(String);

impl ObjectClass {
    /// Name of the account object class.
    pub const ACCOUNT_NAME: &'static str = "__ACCOUNT__";
    /// Name of the group object class.
    pub const GROUP_NAME: &'static str = "__GROUP__";
    /// Name of the pseudo object class matching every class (sync only).
    pub const ALL_NAME: &'static str = "__ALL__";

    /// Create an object class with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The account object class.
    pub fn account() -> Self {
        Self::new(Self::ACCOUNT_NAME)
    }

    /// The group object class.
    pub fn group() -> Self {
        Self::new(Self::GROUP_NAME)
    }

    /// The pseudo object class matching every class.
    pub fn all() -> Self {
        Self::new(Self::ALL_NAME)
    }

    /// Get the name.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Check if the name is the given one (case-insensitive).
    pub fn is(&self, name: &str) -> bool {
        self.0.eq_ignore_ascii_case(name)
    }

    /// Check if this is the `__ALL__` pseudo class.
    pub fn is_all(&self) -> bool {
        self.is(Self::ALL_NAME)
    }
}

impl PartialEq for ObjectClass {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for ObjectClass {}

impl Hash for ObjectClass {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_ascii_lowercase().hash(state);
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectClass {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Unique identifier of an object within its object class on a resource.
///
/// Two uids are the same object exactly when their values are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uid {
    value: String,
}

impl Uid {
    /// Create a new uid.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Get the value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Represent the uid as its reserved attribute.
    pub fn to_attribute(&self) -> Attribute {
        Attribute::single(UID_ATTRIBUTE, self.value.clone())
    }

    /// Read a uid back out of its reserved attribute.
    ///
    /// Returns `None` unless the attribute is `__UID__` with exactly one string value.
    pub fn from_attribute(attribute: &Attribute) -> Option<Self> {
        if !attribute.is(UID_ATTRIBUTE) {
            return None;
        }
        match attribute.values() {
            [AttributeValue::String(value)] => Some(Self::new(value.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl From<&str> for Uid {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Uid {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A single attribute value.
///
/// The set of kinds is closed; connectors convert native values into one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// A string value.
    String(String),
    /// An integer value.
    Integer(i64),
    /// A floating-point value.
    Float(f64),
    /// A boolean value.
    Boolean(bool),
    /// Binary data.
    Binary(Vec<u8>),
    /// A point in time.
    DateTime(DateTime<Utc>),
    /// A secret.
    Guarded(GuardedString),
    /// A structured JSON value.
    Object(serde_json::Map<String, Value>),
}

impl AttributeValue {
    /// Get as a string if this is a string value.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as an integer if this is an integer value.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as a boolean if this is a boolean value.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            AttributeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Order two values of the same kind.
    ///
    /// Integers and floats compare numerically with each other. Any other
    /// mix of kinds, secrets, and JSON objects are unordered.
    pub fn compare(&self, other: &AttributeValue) -> Option<Ordering> {
        match (self, other) {
            (AttributeValue::String(a), AttributeValue::String(b)) => Some(a.cmp(b)),
            (AttributeValue::Integer(a), AttributeValue::Integer(b)) => Some(a.cmp(b)),
            (AttributeValue::Float(a), AttributeValue::Float(b)) => a.partial_cmp(b),
            (AttributeValue::Integer(a), AttributeValue::Float(b)) => (*a as f64).partial_cmp(b),
            (AttributeValue::Float(a), AttributeValue::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (AttributeValue::Boolean(a), AttributeValue::Boolean(b)) => Some(a.cmp(b)),
            (AttributeValue::Binary(a), AttributeValue::Binary(b)) => Some(a.cmp(b)),
            (AttributeValue::DateTime(a), AttributeValue::DateTime(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_string())
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Integer(i)
    }
}

impl From<i32> for AttributeValue {
    fn from(i: i32) -> Self {
        AttributeValue::Integer(i64::from(i))
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Boolean(b)
    }
}

impl From<f64> for AttributeValue {
    fn from(f: f64) -> Self {
        AttributeValue::Float(f)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(bytes: Vec<u8>) -> Self {
        AttributeValue::Binary(bytes)
    }
}

impl From<DateTime<Utc>> for AttributeValue {
    fn from(ts: DateTime<Utc>) -> Self {
        AttributeValue::DateTime(ts)
    }
}

impl From<GuardedString> for AttributeValue {
    fn from(secret: GuardedString) -> Self {
        AttributeValue::Guarded(secret)
    }
}

/// A named, ordered list of values.
///
/// An attribute with an empty value list is meaningful: in a replace it
/// clears the attribute on the resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    name: String,
    values: Vec<AttributeValue>,
}

impl Attribute {
    /// Create an attribute with the given values.
    pub fn new<V: Into<AttributeValue>>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a single-valued attribute.
    pub fn single(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            name: name.into(),
            values: vec![value.into()],
        }
    }

    /// Create an attribute with no values.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }

    /// Get the name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if the attribute has the given name (case-insensitive).
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Get the values.
    pub fn values(&self) -> &[AttributeValue] {
        &self.values
    }

    /// Consume the attribute and return its values.
    pub fn into_values(self) -> Vec<AttributeValue> {
        self.values
    }

    /// Get the only value, if there is exactly one.
    pub fn single_value(&self) -> Option<&AttributeValue> {
        match self.values.as_slice() {
            [value] => Some(value),
            _ => None,
        }
    }

    /// Check if this is the reserved `__UID__` attribute.
    pub fn is_uid(&self) -> bool {
        self.is(UID_ATTRIBUTE)
    }

    /// Check if this is the reserved `__NAME__` attribute.
    pub fn is_name(&self) -> bool {
        self.is(NAME_ATTRIBUTE)
    }

    fn key(&self) -> String {
        self.name.to_ascii_lowercase()
    }
}

/// A set of attributes with case-insensitively unique names.
///
/// Iteration order is by lowercase name; it carries no meaning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeSet {
    attributes: BTreeMap<String, Attribute>,
}

impl AttributeSet {
    /// Create a new empty attribute set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set, rejecting a name that appears twice.
    pub fn try_from_attributes(
        attributes: impl IntoIterator<Item = Attribute>,
    ) -> ConnectorResult<Self> {
        let mut set = Self::new();
        for attribute in attributes {
            match set.attributes.entry(attribute.key()) {
                btree_map::Entry::Occupied(_) => {
                    return Err(ConnectorError::DuplicateAttribute {
                        name: attribute.name,
                    });
                }
                btree_map::Entry::Vacant(slot) => {
                    slot.insert(attribute);
                }
            }
        }
        Ok(set)
    }

    /// Add an attribute, replacing any attribute with the same name.
    pub fn insert(&mut self, attribute: Attribute) {
        self.attributes.insert(attribute.key(), attribute);
    }

    /// Add an attribute using builder pattern.
    pub fn with(mut self, attribute: Attribute) -> Self {
        self.insert(attribute);
        self
    }

    /// Get an attribute by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(&name.to_ascii_lowercase())
    }

    /// Check if an attribute exists.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Remove an attribute.
    pub fn remove(&mut self, name: &str) -> Option<Attribute> {
        self.attributes.remove(&name.to_ascii_lowercase())
    }

    /// Get all attribute names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.values().map(Attribute::name)
    }

    /// Get the number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Iterate over all attributes.
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }
}

impl IntoIterator for AttributeSet {
    type Item = Attribute;
    type IntoIter = btree_map::IntoValues<String, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.attributes.into_values()
    }
}

impl FromIterator<Attribute> for AttributeSet {
    /// Later attributes win over earlier ones with the same name.
    fn from_iter<T: IntoIterator<Item = Attribute>>(iter: T) -> Self {
        let mut set = Self::new();
        for attribute in iter {
            set.insert(attribute);
        }
        set
    }
}

/// The immutable set of attribute names incremental updates may not touch.
///
/// Built once and handed to whatever validates deltas.
#[derive(Debug, Clone)]
pub struct ReservedAttributes {
    names: BTreeSet<String>,
}

impl ReservedAttributes {
    /// The framework's operational attributes plus `__NAME__`.
    pub fn standard() -> Self {
        Self::with_names(
            operational::ALL
                .iter()
                .copied()
                .chain(std::iter::once(NAME_ATTRIBUTE)),
        )
    }

    /// A reserved set with exactly the given names.
    pub fn with_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            names: names.into_iter().map(str::to_ascii_lowercase).collect(),
        }
    }

    /// Check if the name is reserved (case-insensitive).
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&name.to_ascii_lowercase())
    }
}

impl Default for ReservedAttributes {
    fn default() -> Self {
        Self::standard()
    }
}

/// An object on a resource: its class, uid, and attributes.
///
/// The attribute set always contains exactly one `__UID__` attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorObject {
    object_class: ObjectClass,
    uid: Uid,
    attributes: AttributeSet,
}

impl ConnectorObject {
    /// Start building an object.
    pub fn builder(object_class: ObjectClass) -> ConnectorObjectBuilder {
        ConnectorObjectBuilder::new(object_class)
    }

    /// Get the object class.
    pub fn object_class(&self) -> &ObjectClass {
        &self.object_class
    }

    /// Get the uid.
    pub fn uid(&self) -> &Uid {
        &self.uid
    }

    /// Get the name, if the object carries a single-valued string `__NAME__`.
    pub fn name(&self) -> Option<&str> {
        self.attributes
            .get(NAME_ATTRIBUTE)
            .and_then(Attribute::single_value)
            .and_then(AttributeValue::as_string)
    }

    /// Get an attribute by name (case-insensitive).
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Get all attributes, including `__UID__`.
    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    /// Consume the object and return its attributes.
    pub fn into_attributes(self) -> AttributeSet {
        self.attributes
    }

    /// Rebuild the object from transformed attributes. If the result no
    /// longer carries a well-formed `__UID__`, the current uid is put back.
    pub(crate) fn map_attributes(self, f: impl FnOnce(AttributeSet) -> AttributeSet) -> Self {
        let mut attributes = f(self.attributes);
        let uid = match attributes.get(UID_ATTRIBUTE).and_then(Uid::from_attribute) {
            Some(uid) => uid,
            None => {
                attributes.insert(self.uid.to_attribute());
                self.uid
            }
        };
        Self {
            object_class: self.object_class,
            uid,
            attributes,
        }
    }
}

/// Builder for [`ConnectorObject`].
#[derive(Debug, Clone)]
pub struct ConnectorObjectBuilder {
    object_class: ObjectClass,
    attributes: AttributeSet,
}

impl ConnectorObjectBuilder {
    /// Create a builder for an object of the given class.
    pub fn new(object_class: ObjectClass) -> Self {
        Self {
            object_class,
            attributes: AttributeSet::new(),
        }
    }

    /// Set the uid.
    pub fn uid(mut self, uid: impl Into<Uid>) -> Self {
        self.attributes.insert(uid.into().to_attribute());
        self
    }

    /// Set the name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.attributes
            .insert(Attribute::single(NAME_ATTRIBUTE, name.into()));
        self
    }

    /// Add an attribute, replacing any attribute with the same name.
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.insert(attribute);
        self
    }

    /// Add several attributes.
    pub fn attributes(mut self, attributes: impl IntoIterator<Item = Attribute>) -> Self {
        for attribute in attributes {
            self.attributes.insert(attribute);
        }
        self
    }

    /// Build the object.
    ///
    /// Fails unless the attributes contain a well-formed `__UID__`.
    pub fn build(self) -> ConnectorResult<ConnectorObject> {
        let uid = self
            .attributes
            .get(UID_ATTRIBUTE)
            .ok_or_else(|| ConnectorError::invalid_object("connector object has no uid"))
            .and_then(|attribute| {
                Uid::from_attribute(attribute).ok_or_else(|| {
                    ConnectorError::invalid_object("uid must carry exactly one string value")
                })
            })?;

        Ok(ConnectorObject {
            object_class: self.object_class,
            uid,
            attributes: self.attributes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_class_case_insensitive() {
        assert_eq!(ObjectClass::new("account"), ObjectClass::new("ACCOUNT"));
        assert!(ObjectClass::new("__all__").is_all());
        assert!(!ObjectClass::account().is_all());
    }

    #[test]
    fn test_uid_attribute_roundtrip() {
        let uid = Uid::new("cn=john,dc=example,dc=com");
        let attribute = uid.to_attribute();
        assert!(attribute.is_uid());
        assert_eq!(Uid::from_attribute(&attribute), Some(uid));

        let multi = Attribute::new(UID_ATTRIBUTE, ["a", "b"]);
        assert_eq!(Uid::from_attribute(&multi), None);
    }

    #[test]
    fn test_attribute_set_is_case_insensitive() {
        let set = AttributeSet::new()
            .with(Attribute::single("Email", "john@example.com"))
            .with(Attribute::single("EMAIL", "jane@example.com"));

        assert_eq!(set.len(), 1);
        let email = set.get("email").unwrap();
        assert_eq!(email.name(), "EMAIL");
        assert_eq!(
            email.single_value().and_then(AttributeValue::as_string),
            Some("jane@example.com")
        );
    }

    #[test]
    fn test_attribute_set_rejects_duplicates() {
        let result = AttributeSet::try_from_attributes(vec![
            Attribute::single("mail", "a@example.com"),
            Attribute::single("Mail", "b@example.com"),
        ]);
        assert!(matches!(
            result,
            Err(ConnectorError::DuplicateAttribute { ref name }) if name == "Mail"
        ));
    }

    #[test]
    fn test_connector_object_requires_uid() {
        let result = ConnectorObject::builder(ObjectClass::account())
            .name("john")
            .build();
        assert!(matches!(result, Err(ConnectorError::InvalidObject { .. })));

        let object = ConnectorObject::builder(ObjectClass::account())
            .uid("42")
            .name("john")
            .attribute(Attribute::new("groups", ["g1", "g2"]))
            .build()
            .unwrap();
        assert_eq!(object.uid().value(), "42");
        assert_eq!(object.name(), Some("john"));
        assert_eq!(object.attribute("GROUPS").unwrap().values().len(), 2);
        assert!(object.attributes().contains(UID_ATTRIBUTE));
    }

    #[test]
    fn test_value_ordering() {
        let a = AttributeValue::from(3i64);
        let b = AttributeValue::from(4.5f64);
        assert_eq!(a.compare(&b), Some(Ordering::Less));
        assert_eq!(
            AttributeValue::from("b").compare(&AttributeValue::from("a")),
            Some(Ordering::Greater)
        );
        assert_eq!(AttributeValue::from("1").compare(&a), None);
    }

    #[test]
    fn test_reserved_attributes() {
        let reserved = ReservedAttributes::standard();
        assert!(reserved.contains("__PASSWORD__"));
        assert!(reserved.contains("__enable__"));
        assert!(reserved.contains(NAME_ATTRIBUTE));
        assert!(!reserved.contains("groups"));
    }
}
