//! Search filters
//!
//! A filter is a pure predicate tree over attribute values. Leaf nodes
//! compare one attribute; composite nodes combine other filters. Filters are
//! evaluated in-process with [`Filter::accept`] and translated into native
//! queries by a connector's [`FilterTranslator`](crate::translator::FilterTranslator).

use std::cmp::Ordering;

use crate::operation::{Attribute, AttributeValue, ConnectorObject, Uid};

/// Filter for search operations.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Filter {
    /// Attribute values equal the filter values, in order.
    Equals(Attribute),

    /// Like `Equals`, but string values compare case-insensitively.
    EqualsIgnoreCase(Attribute),

    /// Some attribute value is greater than the filter value.
    GreaterThan(Attribute),

    /// Some attribute value is greater than or equal to the filter value.
    GreaterThanOrEqual(Attribute),

    /// Some attribute value is less than the filter value.
    LessThan(Attribute),

    /// Some attribute value is less than or equal to the filter value.
    LessThanOrEqual(Attribute),

    /// Some string value contains the filter value.
    Contains(Attribute),

    /// Some string value starts with the filter value.
    StartsWith(Attribute),

    /// Some string value ends with the filter value.
    EndsWith(Attribute),

    /// The attribute carries every filter value.
    ContainsAllValues(Attribute),

    /// The attribute is present with at least one value.
    Present { name: String },

    /// Logical AND of multiple filters.
    And { filters: Vec<Filter> },

    /// Logical OR of multiple filters.
    Or { filters: Vec<Filter> },

    /// Logical NOT of a filter.
    Not { filter: Box<Filter> },
}

impl Filter {
    /// Create an equals filter on a single value.
    pub fn eq(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Filter::Equals(Attribute::single(name, value))
    }

    /// Create a filter matching the object with the given uid.
    pub fn uid_eq(uid: &Uid) -> Self {
        Filter::Equals(uid.to_attribute())
    }

    /// Create a case-insensitive equals filter.
    pub fn eq_ignore_case(name: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::EqualsIgnoreCase(Attribute::single(name, value.into()))
    }

    /// Create a greater-than filter.
    pub fn gt(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Filter::GreaterThan(Attribute::single(name, value))
    }

    /// Create a greater-than-or-equal filter.
    pub fn gte(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Filter::GreaterThanOrEqual(Attribute::single(name, value))
    }

    /// Create a less-than filter.
    pub fn lt(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Filter::LessThan(Attribute::single(name, value))
    }

    /// Create a less-than-or-equal filter.
    pub fn lte(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Filter::LessThanOrEqual(Attribute::single(name, value))
    }

    /// Create a contains (substring) filter.
    pub fn contains(name: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Contains(Attribute::single(name, value.into()))
    }

    /// Create a starts-with filter.
    pub fn starts_with(name: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::StartsWith(Attribute::single(name, value.into()))
    }

    /// Create an ends-with filter.
    pub fn ends_with(name: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::EndsWith(Attribute::single(name, value.into()))
    }

    /// Create a contains-all-values filter.
    pub fn contains_all_values(attribute: Attribute) -> Self {
        Filter::ContainsAllValues(attribute)
    }

    /// Create a present (attribute has a value) filter.
    pub fn present(name: impl Into<String>) -> Self {
        Filter::Present { name: name.into() }
    }

    /// Create an AND filter.
    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And { filters }
    }

    /// Create an OR filter.
    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or { filters }
    }

    /// Create a NOT filter (negation).
    pub fn negate(filter: Filter) -> Self {
        Filter::Not {
            filter: Box::new(filter),
        }
    }

    /// Combine this filter with another using AND.
    pub fn and_with(self, other: Filter) -> Self {
        match self {
            Filter::And { mut filters } => {
                filters.push(other);
                Filter::And { filters }
            }
            _ => Filter::And {
                filters: vec![self, other],
            },
        }
    }

    /// Combine this filter with another using OR.
    pub fn or_with(self, other: Filter) -> Self {
        match self {
            Filter::Or { mut filters } => {
                filters.push(other);
                Filter::Or { filters }
            }
            _ => Filter::Or {
                filters: vec![self, other],
            },
        }
    }

    /// The attribute a leaf comparison carries.
    pub fn attribute(&self) -> Option<&Attribute> {
        match self {
            Filter::Equals(a)
            | Filter::EqualsIgnoreCase(a)
            | Filter::GreaterThan(a)
            | Filter::GreaterThanOrEqual(a)
            | Filter::LessThan(a)
            | Filter::LessThanOrEqual(a)
            | Filter::Contains(a)
            | Filter::StartsWith(a)
            | Filter::EndsWith(a)
            | Filter::ContainsAllValues(a) => Some(a),
            _ => None,
        }
    }

    /// Check if the object satisfies this filter.
    pub fn accept(&self, object: &ConnectorObject) -> bool {
        match self {
            Filter::Equals(expected) => object
                .attribute(expected.name())
                .is_some_and(|actual| actual.values() == expected.values()),
            Filter::EqualsIgnoreCase(expected) => object
                .attribute(expected.name())
                .is_some_and(|actual| equals_ignore_case(actual.values(), expected.values())),
            Filter::GreaterThan(a) => compare_any(object, a, |o| o == Ordering::Greater),
            Filter::GreaterThanOrEqual(a) => compare_any(object, a, |o| o != Ordering::Less),
            Filter::LessThan(a) => compare_any(object, a, |o| o == Ordering::Less),
            Filter::LessThanOrEqual(a) => compare_any(object, a, |o| o != Ordering::Greater),
            Filter::Contains(a) => match_string(object, a, |value, pattern| value.contains(pattern)),
            Filter::StartsWith(a) => {
                match_string(object, a, |value, pattern| value.starts_with(pattern))
            }
            Filter::EndsWith(a) => match_string(object, a, |value, pattern| value.ends_with(pattern)),
            Filter::ContainsAllValues(expected) => {
                object.attribute(expected.name()).is_some_and(|actual| {
                    expected
                        .values()
                        .iter()
                        .all(|value| actual.values().contains(value))
                })
            }
            Filter::Present { name } => object
                .attribute(name)
                .is_some_and(|actual| !actual.values().is_empty()),
            Filter::And { filters } => filters.iter().all(|f| f.accept(object)),
            Filter::Or { filters } => filters.iter().any(|f| f.accept(object)),
            Filter::Not { filter } => !filter.accept(object),
        }
    }
}

fn equals_ignore_case(actual: &[AttributeValue], expected: &[AttributeValue]) -> bool {
    actual.len() == expected.len()
        && actual
            .iter()
            .zip(expected)
            .all(|(a, e)| match (a.as_string(), e.as_string()) {
                (Some(a), Some(e)) => a.eq_ignore_ascii_case(e),
                _ => a == e,
            })
}

fn compare_any(
    object: &ConnectorObject,
    filter_attribute: &Attribute,
    matches: impl Fn(Ordering) -> bool,
) -> bool {
    let Some(expected) = filter_attribute.single_value() else {
        return false;
    };
    object
        .attribute(filter_attribute.name())
        .is_some_and(|actual| {
            actual
                .values()
                .iter()
                .filter_map(|value| value.compare(expected))
                .any(&matches)
        })
}

fn match_string(
    object: &ConnectorObject,
    filter_attribute: &Attribute,
    matches: impl Fn(&str, &str) -> bool,
) -> bool {
    let Some(pattern) = filter_attribute
        .single_value()
        .and_then(AttributeValue::as_string)
    else {
        return false;
    };
    object
        .attribute(filter_attribute.name())
        .is_some_and(|actual| {
            actual
                .values()
                .iter()
                .filter_map(AttributeValue::as_string)
                .any(|value| matches(value, pattern))
        })
}
