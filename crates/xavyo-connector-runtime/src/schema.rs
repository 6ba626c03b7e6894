//! Connector runtime schema types
//!
//! What a connector reports from its schema operation: the object classes it
//! manages, their attributes, and which operations accept which classes.
//! Building a schema is the connector's job; the runtime only carries it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::operation::AttributeValue;
use crate::types::ApiOperation;

/// Schema of a target system as reported by a connector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// The object classes available in this schema.
    pub object_classes: Vec<ObjectClassInfo>,

    /// Object class names each operation accepts. An operation with no
    /// entry accepts every class.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub supported_by_operation: HashMap<ApiOperation, Vec<String>>,
}

impl Schema {
    /// Create a new empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a schema with the given object classes.
    #[must_use]
    pub fn with_object_classes(object_classes: Vec<ObjectClassInfo>) -> Self {
        Self {
            object_classes,
            supported_by_operation: HashMap::new(),
        }
    }

    /// Restrict an operation to the given object classes.
    #[must_use]
    pub fn with_operation_support<S: Into<String>>(
        mut self,
        operation: ApiOperation,
        object_classes: impl IntoIterator<Item = S>,
    ) -> Self {
        self.supported_by_operation.insert(
            operation,
            object_classes.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Find an object class by name (case-insensitive).
    #[must_use]
    pub fn object_class(&self, name: &str) -> Option<&ObjectClassInfo> {
        self.object_classes
            .iter()
            .find(|oc| oc.name.eq_ignore_ascii_case(name))
    }

    /// Check if an operation accepts an object class.
    #[must_use]
    pub fn supports(&self, operation: ApiOperation, object_class: &str) -> bool {
        self.supported_by_operation
            .get(&operation)
            .map_or(true, |names| {
                names.iter().any(|n| n.eq_ignore_ascii_case(object_class))
            })
    }

    /// Get all object class names.
    #[must_use]
    pub fn object_class_names(&self) -> Vec<&str> {
        self.object_classes.iter().map(|oc| oc.name.as_str()).collect()
    }
}

/// An object class in a target system schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectClassInfo {
    /// Object class name as used by callers.
    pub name: String,

    /// Whether objects of this class may contain other objects.
    #[serde(default)]
    pub container: bool,

    /// Whether this is an auxiliary class.
    #[serde(default)]
    pub auxiliary: bool,

    /// Attributes belonging to this object class.
    pub attributes: Vec<AttributeInfo>,
}

impl ObjectClassInfo {
    /// Create a new object class with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            container: false,
            auxiliary: false,
            attributes: Vec::new(),
        }
    }

    /// Mark the class as a container.
    #[must_use]
    pub fn as_container(mut self) -> Self {
        self.container = true;
        self
    }

    /// Mark the class as auxiliary.
    #[must_use]
    pub fn as_auxiliary(mut self) -> Self {
        self.auxiliary = true;
        self
    }

    /// Add an attribute using builder pattern.
    #[must_use]
    pub fn with_attribute(mut self, attribute: AttributeInfo) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Get an attribute by name (case-insensitive).
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeInfo> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Get attributes required for create.
    #[must_use]
    pub fn required_attributes(&self) -> Vec<&AttributeInfo> {
        self.attributes.iter().filter(|a| a.required).collect()
    }

    /// Get attributes returned when no attributes-to-get is requested.
    #[must_use]
    pub fn default_attributes(&self) -> Vec<&AttributeInfo> {
        self.attributes
            .iter()
            .filter(|a| a.returned_by_default && a.readable)
            .collect()
    }
}

/// An attribute in an object class schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeInfo {
    /// Attribute name.
    pub name: String,

    /// Kind of value the attribute carries.
    pub data_type: AttributeDataType,

    /// Whether this attribute can have multiple values.
    #[serde(default)]
    pub multi_valued: bool,

    /// Whether this attribute is required for create operations.
    #[serde(default)]
    pub required: bool,

    /// Whether this attribute can be read.
    #[serde(default = "default_true")]
    pub readable: bool,

    /// Whether this attribute can be set on create.
    #[serde(default = "default_true")]
    pub creatable: bool,

    /// Whether this attribute can be changed by update.
    #[serde(default = "default_true")]
    pub updateable: bool,

    /// Whether this attribute is returned by default in search results.
    #[serde(default = "default_true")]
    pub returned_by_default: bool,
}

fn default_true() -> bool {
    true
}

impl AttributeInfo {
    /// Create a new attribute with the given name and type.
    pub fn new(name: impl Into<String>, data_type: AttributeDataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            multi_valued: false,
            required: false,
            readable: true,
            creatable: true,
            updateable: true,
            returned_by_default: true,
        }
    }

    /// Mark this attribute as multi-valued.
    #[must_use]
    pub fn multi_valued(mut self) -> Self {
        self.multi_valued = true;
        self
    }

    /// Mark this attribute as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark this attribute as read-only.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.creatable = false;
        self.updateable = false;
        self
    }

    /// Mark this attribute as write-only (e.g., passwords).
    #[must_use]
    pub fn write_only(mut self) -> Self {
        self.readable = false;
        self.returned_by_default = false;
        self
    }

    /// Exclude this attribute from default search results.
    #[must_use]
    pub fn not_returned_by_default(mut self) -> Self {
        self.returned_by_default = false;
        self
    }
}

/// Data type for schema attributes, one per [`AttributeValue`] kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeDataType {
    /// String/text value.
    String,
    /// Integer value.
    Integer,
    /// Floating-point value.
    Float,
    /// Boolean value.
    Boolean,
    /// Binary data (bytes).
    Binary,
    /// Date/time value.
    DateTime,
    /// Secret value.
    Guarded,
    /// JSON object.
    Object,
}

impl AttributeDataType {
    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeDataType::String => "string",
            AttributeDataType::Integer => "integer",
            AttributeDataType::Float => "float",
            AttributeDataType::Boolean => "boolean",
            AttributeDataType::Binary => "binary",
            AttributeDataType::DateTime => "datetime",
            AttributeDataType::Guarded => "guarded",
            AttributeDataType::Object => "object",
        }
    }

    /// Get the data type of a value.
    #[must_use]
    pub fn of(value: &AttributeValue) -> Self {
        match value {
            AttributeValue::String(_) => AttributeDataType::String,
            AttributeValue::Integer(_) => AttributeDataType::Integer,
            AttributeValue::Float(_) => AttributeDataType::Float,
            AttributeValue::Boolean(_) => AttributeDataType::Boolean,
            AttributeValue::Binary(_) => AttributeDataType::Binary,
            AttributeValue::DateTime(_) => AttributeDataType::DateTime,
            AttributeValue::Guarded(_) => AttributeDataType::Guarded,
            AttributeValue::Object(_) => AttributeDataType::Object,
        }
    }
}

impl std::fmt::Display for AttributeDataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
