//! Common test utilities for xavyo-connector-runtime integration tests.
//!
//! [`MemoryConnector`] keeps its objects in a shared [`Resource`] so every
//! instance a test creates, pooled or not, sees the same data, and the test
//! can inspect what the connector was asked to do.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use serde_json::{json, Value};
use xavyo_connector_runtime::async_trait;
use xavyo_connector_runtime::context::OperationalContext;
use xavyo_connector_runtime::prelude::*;

static INIT: Once = Once::new();

/// Initialize logging for tests (once).
pub fn init_test_logging() {
    INIT.call_once(|| {
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();
        }
    });
}

pub fn account(uid: &str, attributes: Vec<Attribute>) -> ConnectorObject {
    ConnectorObject::builder(ObjectClass::account())
        .uid(uid)
        .name(uid)
        .attributes(attributes)
        .build()
        .unwrap()
}

pub fn uids(objects: &[ConnectorObject]) -> Vec<String> {
    objects.iter().map(|o| o.uid().value().to_string()).collect()
}

pub fn strings(values: &[&str]) -> Vec<AttributeValue> {
    values.iter().map(|v| AttributeValue::from(*v)).collect()
}

/// Shared backing store and call log.
#[derive(Default)]
pub struct Resource {
    objects: Mutex<BTreeMap<String, ConnectorObject>>,
    changes: Mutex<Vec<SyncDelta>>,
    calls: Mutex<Vec<&'static str>>,
    replaced: Mutex<Vec<AttributeSet>>,
    queries: Mutex<Vec<Option<MemoryQuery>>>,
    requested: Mutex<Vec<Option<Vec<String>>>>,
    pub created: AtomicUsize,
    pub disposed: AtomicUsize,
}

impl Resource {
    pub fn insert(&self, object: ConnectorObject) {
        self.objects
            .lock()
            .unwrap()
            .insert(object.uid().value().to_string(), object);
    }

    pub fn object(&self, uid: &str) -> Option<ConnectorObject> {
        self.objects.lock().unwrap().get(uid).cloned()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    /// Attribute sets passed to `update`, in call order.
    pub fn replaced(&self) -> Vec<AttributeSet> {
        self.replaced.lock().unwrap().clone()
    }

    /// Native queries executed, in call order.
    pub fn queries(&self) -> Vec<Option<MemoryQuery>> {
        self.queries.lock().unwrap().clone()
    }

    /// Attributes-to-get of each native query, in call order.
    pub fn requested(&self) -> Vec<Option<Vec<String>>> {
        self.requested.lock().unwrap().clone()
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn disposed(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }

    fn call(&self, name: &'static str) {
        self.calls.lock().unwrap().push(name);
    }

    fn record(&self, delta_type: SyncDeltaType, uid: &str, object: Option<ConnectorObject>) {
        let mut changes = self.changes.lock().unwrap();
        let token = SyncToken::new(changes.len() as i64 + 1);
        let builder = SyncDelta::builder(token, delta_type).uid(uid);
        let builder = match object {
            Some(object) => builder.object(object),
            None => builder.object_class(ObjectClass::account()),
        };
        changes.push(builder.build().unwrap());
    }
}

/// What a [`MemoryConnector`] supports and how it misbehaves.
#[derive(Debug, Clone, Copy, Default)]
pub struct Profile {
    /// Implement add/remove of values natively.
    pub native_values: bool,
    /// Lowercase `mail` values through an attribute normalizer.
    pub lowercase_mail: bool,
    /// Fail every `dispose`.
    pub fail_dispose: bool,
    /// Fail every create/update/search with a connector error.
    pub fail_operations: bool,
    /// Only replace and search; no create, delete, or sync.
    pub replace_only: bool,
    /// Simulated round trip of `test` and `search`.
    pub latency: Option<Duration>,
}

/// Native query of the in-memory resource. String comparisons ignore
/// case, so the resource over-matches a case-sensitive filter.
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryQuery {
    Equals { name: String, value: AttributeValue },
    StartsWith { name: String, prefix: String },
    All(Vec<MemoryQuery>),
}

impl MemoryQuery {
    fn matches(&self, object: &ConnectorObject) -> bool {
        match self {
            MemoryQuery::Equals { name, value } => object
                .attribute(name)
                .is_some_and(|a| a.values().iter().any(|v| loosely_equal(v, value))),
            MemoryQuery::StartsWith { name, prefix } => {
                let prefix = prefix.to_lowercase();
                object.attribute(name).is_some_and(|a| {
                    a.values()
                        .iter()
                        .filter_map(AttributeValue::as_string)
                        .any(|s| s.to_lowercase().starts_with(&prefix))
                })
            }
            MemoryQuery::All(parts) => parts.iter().all(|part| part.matches(object)),
        }
    }
}

fn loosely_equal(a: &AttributeValue, b: &AttributeValue) -> bool {
    match (a.as_string(), b.as_string()) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => a == b,
    }
}

/// Translates equality, prefix, and AND; OR splits into several queries.
pub struct MemoryTranslator;

impl FilterTranslator<MemoryQuery> for MemoryTranslator {
    fn create_equals_expression(&self, attribute: &Attribute, not: bool) -> Option<MemoryQuery> {
        if not {
            return None;
        }
        Some(MemoryQuery::Equals {
            name: attribute.name().to_string(),
            value: attribute.single_value()?.clone(),
        })
    }

    fn create_starts_with_expression(
        &self,
        attribute: &Attribute,
        not: bool,
    ) -> Option<MemoryQuery> {
        if not {
            return None;
        }
        Some(MemoryQuery::StartsWith {
            name: attribute.name().to_string(),
            prefix: attribute.single_value()?.as_string()?.to_string(),
        })
    }

    fn create_and_expression(&self, left: &MemoryQuery, right: &MemoryQuery) -> Option<MemoryQuery> {
        Some(MemoryQuery::All(vec![left.clone(), right.clone()]))
    }
}

struct LowercaseMail;

impl AttributeNormalizer for LowercaseMail {
    fn normalize_attribute(&self, _object_class: &ObjectClass, attribute: Attribute) -> Attribute {
        if !attribute.is("mail") {
            return attribute;
        }
        let values: Vec<AttributeValue> = attribute
            .values()
            .iter()
            .map(|value| match value {
                AttributeValue::String(s) => AttributeValue::String(s.to_lowercase()),
                other => other.clone(),
            })
            .collect();
        Attribute::new(attribute.name().to_string(), values)
    }
}

pub struct MemoryConnector {
    resource: Arc<Resource>,
    profile: Profile,
}

impl MemoryConnector {
    async fn round_trip(&self) {
        if let Some(latency) = self.profile.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn fail_if_configured(&self) -> ConnectorResult<()> {
        if self.profile.fail_operations {
            return Err(ConnectorError::operation_failed("resource rejected the request"));
        }
        Ok(())
    }

    fn apply(
        &self,
        object_class: &ObjectClass,
        uid: &Uid,
        change: impl FnOnce(&mut AttributeSet),
    ) -> ConnectorResult<Uid> {
        let mut objects = self.resource.objects.lock().unwrap();
        let current = objects
            .remove(uid.value())
            .ok_or_else(|| ConnectorError::UnknownUid {
                object_class: object_class.to_string(),
                uid: uid.to_string(),
            })?;
        let mut attributes = current.into_attributes();
        change(&mut attributes);
        let updated = ConnectorObject::builder(object_class.clone())
            .attributes(attributes)
            .build()?;
        objects.insert(uid.value().to_string(), updated.clone());
        drop(objects);
        self.resource
            .record(SyncDeltaType::Update, uid.value(), Some(updated));
        Ok(uid.clone())
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn init(&mut self, configuration: Configuration) -> ConnectorResult<()> {
        self.resource.call("init");
        if configuration.get("fail_init").is_some() {
            return Err(ConnectorError::invalid_configuration("fail_init is set"));
        }
        self.resource.created.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn dispose(&mut self) -> ConnectorResult<()> {
        self.resource.call("dispose");
        self.resource.disposed.fetch_add(1, Ordering::SeqCst);
        if self.profile.fail_dispose {
            return Err(ConnectorError::operation_failed("socket already closed"));
        }
        Ok(())
    }

    fn attribute_normalizer(&self) -> Option<&dyn AttributeNormalizer> {
        self.profile
            .lowercase_mail
            .then_some(&LowercaseMail as &dyn AttributeNormalizer)
    }

    fn as_create_op(&self) -> Option<&dyn CreateOp> {
        (!self.profile.replace_only).then_some(self as &dyn CreateOp)
    }

    fn as_delete_op(&self) -> Option<&dyn DeleteOp> {
        (!self.profile.replace_only).then_some(self as &dyn DeleteOp)
    }

    fn as_update_op(&self) -> Option<&dyn UpdateOp> {
        Some(self)
    }

    fn as_update_attribute_values_op(&self) -> Option<&dyn UpdateAttributeValuesOp> {
        self.profile
            .native_values
            .then_some(self as &dyn UpdateAttributeValuesOp)
    }

    fn as_search_op(&self) -> Option<&dyn ErasedSearchOp> {
        Some(self)
    }

    fn as_sync_op(&self) -> Option<&dyn SyncOp> {
        (!self.profile.replace_only).then_some(self as &dyn SyncOp)
    }

    fn as_schema_op(&self) -> Option<&dyn SchemaOp> {
        Some(self)
    }

    fn as_test_op(&self) -> Option<&dyn TestOp> {
        Some(self)
    }

    fn as_authenticate_op(&self) -> Option<&dyn AuthenticateOp> {
        Some(self)
    }

    fn as_resolve_username_op(&self) -> Option<&dyn ResolveUsernameOp> {
        Some(self)
    }

    fn as_script_on_connector_op(&self) -> Option<&dyn ScriptOnConnectorOp> {
        Some(self)
    }
}

#[async_trait]
impl CreateOp for MemoryConnector {
    async fn create(
        &self,
        object_class: &ObjectClass,
        attributes: AttributeSet,
        _options: &OperationOptions,
    ) -> ConnectorResult<Uid> {
        self.resource.call("create");
        self.fail_if_configured()?;

        let uid = attributes
            .get(NAME_ATTRIBUTE)
            .and_then(Attribute::single_value)
            .and_then(AttributeValue::as_string)
            .map(str::to_string)
            .ok_or_else(|| ConnectorError::InvalidAttributeSet {
                message: "__NAME__ is required".to_string(),
            })?;
        if self.resource.object(&uid).is_some() {
            return Err(ConnectorError::ObjectAlreadyExists { identifier: uid });
        }

        let object = ConnectorObject::builder(object_class.clone())
            .uid(uid.as_str())
            .attributes(attributes)
            .build()?;
        self.resource.insert(object.clone());
        self.resource
            .record(SyncDeltaType::Create, &uid, Some(object));
        Ok(Uid::new(uid))
    }
}

#[async_trait]
impl DeleteOp for MemoryConnector {
    async fn delete(
        &self,
        object_class: &ObjectClass,
        uid: &Uid,
        _options: &OperationOptions,
    ) -> ConnectorResult<()> {
        self.resource.call("delete");
        let removed = self.resource.objects.lock().unwrap().remove(uid.value());
        if removed.is_none() {
            return Err(ConnectorError::UnknownUid {
                object_class: object_class.to_string(),
                uid: uid.to_string(),
            });
        }
        self.resource.record(SyncDeltaType::Delete, uid.value(), None);
        Ok(())
    }
}

#[async_trait]
impl UpdateOp for MemoryConnector {
    async fn update(
        &self,
        object_class: &ObjectClass,
        uid: &Uid,
        replace: AttributeSet,
        _options: &OperationOptions,
    ) -> ConnectorResult<Uid> {
        self.resource.call("update");
        self.fail_if_configured()?;
        self.resource.replaced.lock().unwrap().push(replace.clone());

        self.apply(object_class, uid, |attributes| {
            for attribute in replace {
                if attribute.values().is_empty() {
                    attributes.remove(attribute.name());
                } else {
                    attributes.insert(attribute);
                }
            }
        })
    }
}

#[async_trait]
impl UpdateAttributeValuesOp for MemoryConnector {
    async fn add_attribute_values(
        &self,
        object_class: &ObjectClass,
        uid: &Uid,
        values: AttributeSet,
        _options: &OperationOptions,
    ) -> ConnectorResult<Uid> {
        self.resource.call("add_attribute_values");
        self.apply(object_class, uid, |attributes| {
            for added in values {
                let mut merged = attributes
                    .remove(added.name())
                    .map(Attribute::into_values)
                    .unwrap_or_default();
                let name = added.name().to_string();
                merged.extend(added.into_values());
                attributes.insert(Attribute::new(name, merged));
            }
        })
    }

    async fn remove_attribute_values(
        &self,
        object_class: &ObjectClass,
        uid: &Uid,
        values: AttributeSet,
        _options: &OperationOptions,
    ) -> ConnectorResult<Uid> {
        self.resource.call("remove_attribute_values");
        self.apply(object_class, uid, |attributes| {
            for removed in values {
                if let Some(existing) = attributes.remove(removed.name()) {
                    let name = existing.name().to_string();
                    let remaining: Vec<AttributeValue> = existing
                        .into_values()
                        .into_iter()
                        .filter(|value| !removed.values().contains(value))
                        .collect();
                    attributes.insert(Attribute::new(name, remaining));
                }
            }
        })
    }
}

#[async_trait]
impl SearchOp for MemoryConnector {
    type Query = MemoryQuery;

    fn translate_filter(
        &self,
        _object_class: &ObjectClass,
        _options: &OperationOptions,
        filter: &Filter,
    ) -> Vec<MemoryQuery> {
        MemoryTranslator.translate(filter)
    }

    async fn execute_query(
        &self,
        object_class: &ObjectClass,
        query: Option<&MemoryQuery>,
        handler: &mut dyn ResultsHandler,
        options: &OperationOptions,
    ) -> ConnectorResult<()> {
        self.resource.call("search");
        self.resource.queries.lock().unwrap().push(query.cloned());
        self.resource
            .requested
            .lock()
            .unwrap()
            .push(options.attributes_to_get().map(<[String]>::to_vec));
        self.round_trip().await;
        self.fail_if_configured()?;

        let matching: Vec<ConnectorObject> = self
            .resource
            .objects
            .lock()
            .unwrap()
            .values()
            .filter(|object| object.object_class() == object_class)
            .filter(|object| query.map_or(true, |q| q.matches(object)))
            .cloned()
            .collect();
        for object in matching {
            if !handler.handle(object) {
                break;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SyncOp for MemoryConnector {
    async fn sync(
        &self,
        object_class: &ObjectClass,
        token: Option<&SyncToken>,
        handler: &mut dyn SyncResultsHandler,
        _options: &OperationOptions,
    ) -> ConnectorResult<()> {
        self.resource.call("sync");
        let after = token.and_then(|t| t.value().as_i64()).unwrap_or(0);
        let deltas: Vec<SyncDelta> = self
            .resource
            .changes
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.token().value().as_i64().unwrap_or(0) > after)
            .filter(|d| {
                object_class.is_all() || d.object_class().map_or(true, |oc| oc == object_class)
            })
            .cloned()
            .collect();
        for delta in deltas {
            if !handler.handle(delta) {
                break;
            }
        }
        Ok(())
    }

    async fn get_latest_sync_token(
        &self,
        _object_class: &ObjectClass,
    ) -> ConnectorResult<Option<SyncToken>> {
        self.resource.call("get_latest_sync_token");
        Ok(self
            .resource
            .changes
            .lock()
            .unwrap()
            .last()
            .map(|d| d.token().clone()))
    }
}

#[async_trait]
impl SchemaOp for MemoryConnector {
    async fn schema(&self) -> ConnectorResult<Schema> {
        self.resource.call("schema");
        Ok(Schema::with_object_classes(vec![ObjectClassInfo::new(
            ObjectClass::ACCOUNT_NAME,
        )
        .with_attribute(AttributeInfo::new("mail", AttributeDataType::String))
        .with_attribute(AttributeInfo::new("groups", AttributeDataType::String).multi_valued())]))
    }
}

#[async_trait]
impl TestOp for MemoryConnector {
    async fn test(&self) -> ConnectorResult<()> {
        self.resource.call("test");
        self.round_trip().await;
        Ok(())
    }
}

#[async_trait]
impl AuthenticateOp for MemoryConnector {
    async fn authenticate(
        &self,
        _object_class: &ObjectClass,
        username: &str,
        password: &GuardedString,
        _options: &OperationOptions,
    ) -> ConnectorResult<Uid> {
        self.resource.call("authenticate");
        let object = self
            .resource
            .object(username)
            .ok_or(ConnectorError::AuthenticationFailed)?;
        let expected = object
            .attribute("__PASSWORD__")
            .and_then(Attribute::single_value)
            .and_then(|value| match value {
                AttributeValue::Guarded(secret) => Some(secret.access(str::to_string)),
                _ => None,
            });
        match expected {
            Some(expected) if password.access(|given| given == expected) => {
                Ok(object.uid().clone())
            }
            _ => Err(ConnectorError::AuthenticationFailed),
        }
    }
}

#[async_trait]
impl ResolveUsernameOp for MemoryConnector {
    async fn resolve_username(
        &self,
        object_class: &ObjectClass,
        username: &str,
        _options: &OperationOptions,
    ) -> ConnectorResult<Uid> {
        self.resource.call("resolve_username");
        self.resource
            .object(username)
            .map(|object| object.uid().clone())
            .ok_or_else(|| ConnectorError::UnknownUid {
                object_class: object_class.to_string(),
                uid: username.to_string(),
            })
    }
}

#[async_trait]
impl ScriptOnConnectorOp for MemoryConnector {
    async fn run_script_on_connector(
        &self,
        script: &ScriptContext,
        _options: &OperationOptions,
    ) -> ConnectorResult<Value> {
        self.resource.call("run_script_on_connector");
        Ok(json!({
            "language": script.language,
            "echo": script.text,
            "arguments": script.arguments,
        }))
    }
}

pub struct MemoryFactory {
    resource: Arc<Resource>,
    profile: Profile,
}

impl MemoryFactory {
    pub fn new(profile: Profile) -> Self {
        Self {
            resource: Arc::new(Resource::default()),
            profile,
        }
    }

    pub fn resource(&self) -> Arc<Resource> {
        self.resource.clone()
    }
}

impl ConnectorFactory for MemoryFactory {
    fn key(&self) -> ConnectorKey {
        ConnectorKey::new("org.xavyo.test", "1.0", "MemoryConnector")
    }

    fn new_connector(&self) -> Box<dyn Connector> {
        Box::new(MemoryConnector {
            resource: self.resource.clone(),
            profile: self.profile,
        })
    }

    fn validate(&self, configuration: &Configuration) -> ConnectorResult<()> {
        match configuration.get("host") {
            Some(Value::String(host)) if !host.is_empty() => Ok(()),
            _ => Err(ConnectorError::invalid_configuration("host is required")),
        }
    }
}

/// Pool wrapper counting borrows and returns.
pub struct CountingPool {
    inner: ConnectorObjectPool,
    pub borrowed: AtomicUsize,
    pub returned: AtomicUsize,
}

impl CountingPool {
    pub fn new(factory: Arc<MemoryFactory>, configuration: &ApiConfiguration) -> Self {
        Self {
            inner: ConnectorObjectPool::new(
                factory,
                configuration.bind(),
                configuration.pool.clone(),
            )
            .unwrap(),
            borrowed: AtomicUsize::new(0),
            returned: AtomicUsize::new(0),
        }
    }

    pub fn borrowed(&self) -> usize {
        self.borrowed.load(Ordering::SeqCst)
    }

    pub fn returned(&self) -> usize {
        self.returned.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectorPool for CountingPool {
    async fn borrow_object(&self) -> ConnectorResult<ConnectorInstance> {
        let instance = self.inner.borrow_object().await?;
        self.borrowed.fetch_add(1, Ordering::SeqCst);
        Ok(instance)
    }

    fn return_object(&self, instance: ConnectorInstance) -> ConnectorResult<()> {
        self.returned.fetch_add(1, Ordering::SeqCst);
        self.inner.return_object(instance)
    }

    fn close(&self) {
        self.inner.close();
    }
}

pub fn configuration() -> ApiConfiguration {
    ApiConfiguration::default().with_property("host", "memory.example.com")
}

/// An unpooled facade over a fresh in-memory resource.
pub fn facade(profile: Profile) -> (ConnectorFacade, Arc<Resource>) {
    init_test_logging();
    let factory = Arc::new(MemoryFactory::new(profile));
    let resource = factory.resource();
    let context = OperationalContext::new(factory, configuration()).unwrap();
    (ConnectorFacade::new(Arc::new(context)), resource)
}

/// A facade whose instances come from a [`CountingPool`].
pub fn pooled_facade(
    profile: Profile,
    pool: PoolConfig,
) -> (ConnectorFacade, Arc<Resource>, Arc<CountingPool>) {
    init_test_logging();
    let factory = Arc::new(MemoryFactory::new(profile));
    let resource = factory.resource();
    let configuration = configuration().with_pooling(pool);
    let counting = Arc::new(CountingPool::new(factory.clone(), &configuration));
    let context = OperationalContext::with_pool(factory, configuration, counting.clone());
    (ConnectorFacade::new(Arc::new(context)), resource, counting)
}
