//! Filter translation
//!
//! Splits a [`Filter`] tree into the native queries a connector can run.
//! A connector implements [`FilterTranslator`] by supplying expression
//! builders for the leaf comparisons and combinators its resource supports;
//! the provided [`FilterTranslator::translate`] does the rest.
//!
//! Translation is best-effort. Whatever the native queries miss is caught by
//! the in-process filter the search pipeline re-applies to every result, so a
//! translator may over-match but must never under-match.

use crate::filter::Filter;
use crate::operation::Attribute;

/// Translates filters into an ordered list of native queries of type `Q`.
///
/// Every builder returns `None` when the resource cannot express the
/// expression. `not` asks for the negated form of a leaf comparison.
pub trait FilterTranslator<Q> {
    /// Native form of an equals comparison.
    fn create_equals_expression(&self, _attribute: &Attribute, _not: bool) -> Option<Q> {
        None
    }

    /// Native form of a case-insensitive equals comparison.
    fn create_equals_ignore_case_expression(
        &self,
        _attribute: &Attribute,
        _not: bool,
    ) -> Option<Q> {
        None
    }

    /// Native form of a greater-than comparison.
    fn create_greater_than_expression(&self, _attribute: &Attribute, _not: bool) -> Option<Q> {
        None
    }

    /// Native form of a greater-than-or-equal comparison.
    fn create_greater_than_or_equal_expression(
        &self,
        _attribute: &Attribute,
        _not: bool,
    ) -> Option<Q> {
        None
    }

    /// Native form of a less-than comparison.
    fn create_less_than_expression(&self, _attribute: &Attribute, _not: bool) -> Option<Q> {
        None
    }

    /// Native form of a less-than-or-equal comparison.
    fn create_less_than_or_equal_expression(
        &self,
        _attribute: &Attribute,
        _not: bool,
    ) -> Option<Q> {
        None
    }

    /// Native form of a substring comparison.
    fn create_contains_expression(&self, _attribute: &Attribute, _not: bool) -> Option<Q> {
        None
    }

    /// Native form of a prefix comparison.
    fn create_starts_with_expression(&self, _attribute: &Attribute, _not: bool) -> Option<Q> {
        None
    }

    /// Native form of a suffix comparison.
    fn create_ends_with_expression(&self, _attribute: &Attribute, _not: bool) -> Option<Q> {
        None
    }

    /// Native form of a contains-all-values comparison.
    fn create_contains_all_values_expression(
        &self,
        _attribute: &Attribute,
        _not: bool,
    ) -> Option<Q> {
        None
    }

    /// Native form of a presence test.
    fn create_present_expression(&self, _name: &str, _not: bool) -> Option<Q> {
        None
    }

    /// Combine two native queries with AND.
    fn create_and_expression(&self, _left: &Q, _right: &Q) -> Option<Q> {
        None
    }

    /// Combine two native queries with OR.
    fn create_or_expression(&self, _left: &Q, _right: &Q) -> Option<Q> {
        None
    }

    /// Translate a filter into native queries.
    ///
    /// An empty list means no native filtering is possible. More than one
    /// query means the union of their results covers the filter.
    fn translate(&self, filter: &Filter) -> Vec<Q> {
        let normalized = push_down_not(filter.clone(), false);
        translate_normalized(self, &normalized)
    }
}

/// Rewrite the tree so NOT only ever wraps a leaf (De Morgan).
fn push_down_not(filter: Filter, negate: bool) -> Filter {
    match filter {
        Filter::Not { filter } => push_down_not(*filter, !negate),
        Filter::And { filters } => {
            let children = filters.into_iter().map(|f| push_down_not(f, negate)).collect();
            if negate {
                Filter::Or { filters: children }
            } else {
                Filter::And { filters: children }
            }
        }
        Filter::Or { filters } => {
            let children = filters.into_iter().map(|f| push_down_not(f, negate)).collect();
            if negate {
                Filter::And { filters: children }
            } else {
                Filter::Or { filters: children }
            }
        }
        leaf if negate => Filter::negate(leaf),
        leaf => leaf,
    }
}

fn translate_normalized<Q, T>(translator: &T, filter: &Filter) -> Vec<Q>
where
    T: FilterTranslator<Q> + ?Sized,
{
    match filter {
        Filter::And { filters } => {
            let mut parts = filters.iter().map(|f| translate_normalized(translator, f));
            let first = parts.next().unwrap_or_default();
            parts.fold(first, |left, right| and_impl(translator, left, right))
        }
        Filter::Or { filters } => {
            let mut parts = filters.iter().map(|f| translate_normalized(translator, f));
            let first = parts.next().unwrap_or_default();
            parts.fold(first, |left, right| or_impl(translator, left, right))
        }
        Filter::Not { filter } => create_leaf(translator, filter, true).into_iter().collect(),
        leaf => create_leaf(translator, leaf, false).into_iter().collect(),
    }
}

fn create_leaf<Q, T>(translator: &T, filter: &Filter, not: bool) -> Option<Q>
where
    T: FilterTranslator<Q> + ?Sized,
{
    match filter {
        Filter::Equals(a) => translator.create_equals_expression(a, not),
        Filter::EqualsIgnoreCase(a) => translator.create_equals_ignore_case_expression(a, not),
        Filter::GreaterThan(a) => translator.create_greater_than_expression(a, not),
        Filter::GreaterThanOrEqual(a) => {
            translator.create_greater_than_or_equal_expression(a, not)
        }
        Filter::LessThan(a) => translator.create_less_than_expression(a, not),
        Filter::LessThanOrEqual(a) => translator.create_less_than_or_equal_expression(a, not),
        Filter::Contains(a) => translator.create_contains_expression(a, not),
        Filter::StartsWith(a) => translator.create_starts_with_expression(a, not),
        Filter::EndsWith(a) => translator.create_ends_with_expression(a, not),
        Filter::ContainsAllValues(a) => translator.create_contains_all_values_expression(a, not),
        Filter::Present { name } => translator.create_present_expression(name, not),
        // Composites never reach here after NOT push-down.
        Filter::And { .. } | Filter::Or { .. } | Filter::Not { .. } => None,
    }
}

/// An untranslatable side drops out. If two sides cannot be combined the
/// narrower side is kept; the in-process filter handles the rest.
fn and_impl<Q, T>(translator: &T, left: Vec<Q>, right: Vec<Q>) -> Vec<Q>
where
    T: FilterTranslator<Q> + ?Sized,
{
    if left.is_empty() {
        return right;
    }
    if right.is_empty() {
        return left;
    }
    let mut combined = Vec::with_capacity(left.len() * right.len());
    for l in &left {
        for r in &right {
            match translator.create_and_expression(l, r) {
                Some(expression) => combined.push(expression),
                None => return if left.len() <= right.len() { left } else { right },
            }
        }
    }
    combined
}

/// An untranslatable side makes the whole OR untranslatable. Sides that
/// cannot be combined natively become separate queries.
fn or_impl<Q, T>(translator: &T, mut left: Vec<Q>, right: Vec<Q>) -> Vec<Q>
where
    T: FilterTranslator<Q> + ?Sized,
{
    if left.is_empty() || right.is_empty() {
        return Vec::new();
    }
    if let ([l], [r]) = (left.as_slice(), right.as_slice()) {
        if let Some(expression) = translator.create_or_expression(l, r) {
            return vec![expression];
        }
    }
    left.extend(right);
    left
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::AttributeValue;

    /// LDAP-style translator supporting equals and starts-with.
    struct LdapLike {
        native_and: bool,
        native_or: bool,
    }

    impl LdapLike {
        fn value(attribute: &Attribute) -> Option<&str> {
            attribute.single_value().and_then(AttributeValue::as_string)
        }

        fn wrap(expression: String, not: bool) -> String {
            if not {
                format!("(!{expression})")
            } else {
                expression
            }
        }
    }

    impl FilterTranslator<String> for LdapLike {
        fn create_equals_expression(&self, attribute: &Attribute, not: bool) -> Option<String> {
            let value = Self::value(attribute)?;
            Some(Self::wrap(format!("({}={value})", attribute.name()), not))
        }

        fn create_starts_with_expression(
            &self,
            attribute: &Attribute,
            not: bool,
        ) -> Option<String> {
            let value = Self::value(attribute)?;
            Some(Self::wrap(format!("({}={value}*)", attribute.name()), not))
        }

        fn create_and_expression(&self, left: &String, right: &String) -> Option<String> {
            self.native_and.then(|| format!("(&{left}{right})"))
        }

        fn create_or_expression(&self, left: &String, right: &String) -> Option<String> {
            self.native_or.then(|| format!("(|{left}{right})"))
        }
    }

    fn full() -> LdapLike {
        LdapLike {
            native_and: true,
            native_or: true,
        }
    }

    fn minimal() -> LdapLike {
        LdapLike {
            native_and: false,
            native_or: false,
        }
    }

    #[test]
    fn test_leaf() {
        assert_eq!(full().translate(&Filter::eq("cn", "john")), vec!["(cn=john)"]);
        assert!(full().translate(&Filter::present("cn")).is_empty());
    }

    #[test]
    fn test_not_uses_negated_leaf() {
        let filter = Filter::negate(Filter::eq("cn", "john"));
        assert_eq!(full().translate(&filter), vec!["(!(cn=john))"]);

        let double = Filter::negate(Filter::negate(Filter::eq("cn", "john")));
        assert_eq!(full().translate(&double), vec!["(cn=john)"]);
    }

    #[test]
    fn test_and() {
        let filter = Filter::eq("cn", "john").and_with(Filter::starts_with("mail", "j"));
        assert_eq!(full().translate(&filter), vec!["(&(cn=john)(mail=j*))"]);
    }

    #[test]
    fn test_and_drops_untranslatable_side() {
        let filter = Filter::present("phone").and_with(Filter::eq("cn", "john"));
        assert_eq!(full().translate(&filter), vec!["(cn=john)"]);
    }

    #[test]
    fn test_and_without_native_support_keeps_narrower_side() {
        let filter = Filter::or(vec![Filter::eq("cn", "a"), Filter::eq("cn", "b")])
            .and_with(Filter::eq("mail", "x"));
        assert_eq!(minimal().translate(&filter), vec!["(mail=x)"]);
    }

    #[test]
    fn test_or() {
        let filter = Filter::eq("cn", "a").or_with(Filter::eq("cn", "b"));
        assert_eq!(full().translate(&filter), vec!["(|(cn=a)(cn=b))"]);
        assert_eq!(minimal().translate(&filter), vec!["(cn=a)", "(cn=b)"]);
    }

    #[test]
    fn test_or_with_untranslatable_side_is_untranslatable() {
        let filter = Filter::eq("cn", "a").or_with(Filter::present("phone"));
        assert!(full().translate(&filter).is_empty());
    }

    #[test]
    fn test_three_way_or_yields_three_queries() {
        let filter = Filter::or(vec![
            Filter::eq("cn", "a"),
            Filter::eq("cn", "b"),
            Filter::eq("cn", "c"),
        ]);
        assert_eq!(
            minimal().translate(&filter),
            vec!["(cn=a)", "(cn=b)", "(cn=c)"]
        );
    }

    #[test]
    fn test_de_morgan() {
        let filter = Filter::negate(Filter::eq("cn", "a").and_with(Filter::eq("cn", "b")));
        assert_eq!(
            minimal().translate(&filter),
            vec!["(!(cn=a))", "(!(cn=b))"]
        );
        assert_eq!(full().translate(&filter), vec!["(|(!(cn=a))(!(cn=b)))"]);
    }
}
