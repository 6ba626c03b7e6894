//! Operation options
//!
//! Optional modifiers a caller attaches to an operation. An absent options
//! value is always replaced by [`OperationOptions::default`], the empty set,
//! before any operation logic runs.

use crate::guarded::GuardedString;
use crate::operation::{ObjectClass, Uid};
use crate::types::SearchScope;

/// A uid qualified by its object class, used to name a search container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedUid {
    /// Object class of the container.
    pub object_class: ObjectClass,
    /// Uid of the container.
    pub uid: Uid,
}

impl QualifiedUid {
    /// Create a new qualified uid.
    pub fn new(object_class: ObjectClass, uid: Uid) -> Self {
        Self { object_class, uid }
    }
}

/// Sort order on one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Attribute to sort on.
    pub field: String,
    /// Ascending when true.
    pub ascending: bool,
}

impl SortKey {
    /// Create an ascending sort key.
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: true,
        }
    }

    /// Create a descending sort key.
    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: false,
        }
    }
}

/// Immutable bundle of optional call modifiers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationOptions {
    attributes_to_get: Option<Vec<String>>,
    scope: Option<SearchScope>,
    container: Option<QualifiedUid>,
    run_as_user: Option<String>,
    run_with_password: Option<GuardedString>,
    page_size: Option<u32>,
    paged_results_cookie: Option<String>,
    paged_results_offset: Option<u32>,
    sort_keys: Vec<SortKey>,
    allow_partial_results: Option<bool>,
    return_default_attributes: Option<bool>,
}

impl OperationOptions {
    /// Start building options.
    pub fn builder() -> OperationOptionsBuilder {
        OperationOptionsBuilder::default()
    }

    /// Start building options from a copy of these.
    pub fn to_builder(&self) -> OperationOptionsBuilder {
        OperationOptionsBuilder {
            options: self.clone(),
        }
    }

    /// Check if no option is set.
    pub fn is_empty(&self) -> bool {
        *self == OperationOptions::default()
    }

    /// Attribute names the caller wants returned, if restricted.
    pub fn attributes_to_get(&self) -> Option<&[String]> {
        self.attributes_to_get.as_deref()
    }

    /// Search scope.
    pub fn scope(&self) -> Option<SearchScope> {
        self.scope
    }

    /// Container to search below.
    pub fn container(&self) -> Option<&QualifiedUid> {
        self.container.as_ref()
    }

    /// Account to run the operation as.
    pub fn run_as_user(&self) -> Option<&str> {
        self.run_as_user.as_deref()
    }

    /// Password of the run-as account.
    pub fn run_with_password(&self) -> Option<&GuardedString> {
        self.run_with_password.as_ref()
    }

    /// Requested page size.
    pub fn page_size(&self) -> Option<u32> {
        self.page_size
    }

    /// Cookie returned by the previous page.
    pub fn paged_results_cookie(&self) -> Option<&str> {
        self.paged_results_cookie.as_deref()
    }

    /// Offset of the first result to return.
    pub fn paged_results_offset(&self) -> Option<u32> {
        self.paged_results_offset
    }

    /// Requested sort order.
    pub fn sort_keys(&self) -> &[SortKey] {
        &self.sort_keys
    }

    /// Whether a partial result set is acceptable.
    pub fn allow_partial_results(&self) -> Option<bool> {
        self.allow_partial_results
    }

    /// Whether default attributes are returned in addition to `attributes_to_get`.
    pub fn return_default_attributes(&self) -> Option<bool> {
        self.return_default_attributes
    }
}

/// Builder for [`OperationOptions`].
#[derive(Debug, Clone, Default)]
pub struct OperationOptionsBuilder {
    options: OperationOptions,
}

impl OperationOptionsBuilder {
    /// Restrict the returned attributes.
    pub fn attributes_to_get<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.options.attributes_to_get = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Set the search scope.
    pub fn scope(mut self, scope: SearchScope) -> Self {
        self.options.scope = Some(scope);
        self
    }

    /// Set the container to search below.
    pub fn container(mut self, container: QualifiedUid) -> Self {
        self.options.container = Some(container);
        self
    }

    /// Run the operation as another account.
    pub fn run_as_user(mut self, user: impl Into<String>) -> Self {
        self.options.run_as_user = Some(user.into());
        self
    }

    /// Password of the run-as account.
    pub fn run_with_password(mut self, password: GuardedString) -> Self {
        self.options.run_with_password = Some(password);
        self
    }

    /// Set the page size.
    pub fn page_size(mut self, size: u32) -> Self {
        self.options.page_size = Some(size);
        self
    }

    /// Continue from a previous page.
    pub fn paged_results_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.options.paged_results_cookie = Some(cookie.into());
        self
    }

    /// Skip results before the offset.
    pub fn paged_results_offset(mut self, offset: u32) -> Self {
        self.options.paged_results_offset = Some(offset);
        self
    }

    /// Add a sort key.
    pub fn sort_key(mut self, key: SortKey) -> Self {
        self.options.sort_keys.push(key);
        self
    }

    /// Accept partial results.
    pub fn allow_partial_results(mut self, allow: bool) -> Self {
        self.options.allow_partial_results = Some(allow);
        self
    }

    /// Return default attributes in addition to the requested ones.
    pub fn return_default_attributes(mut self, value: bool) -> Self {
        self.options.return_default_attributes = Some(value);
        self
    }

    /// Build the options.
    pub fn build(self) -> OperationOptions {
        self.options
    }
}
