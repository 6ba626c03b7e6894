//! Connector facade
//!
//! The caller-facing surface of one configured connector. Every operation
//! checks its arguments, obtains a connector through the lifecycle
//! dispatcher, runs against it, and releases it when the call ends.
//! Arguments are normalized on the way in and results on the way out.
//!
//! ```ignore
//! let facade = registry.new_facade(&key, configuration).await?;
//!
//! let uid = facade
//!     .create(&ObjectClass::account(), vec![Attribute::single("__NAME__", "jdoe")], None)
//!     .await?;
//! let object = facade.get_object(&ObjectClass::account(), &uid, None).await?;
//! ```

use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

use crate::capability::{CapabilitySet, ConnectorInstance};
use crate::config::ApiConfiguration;
use crate::context::OperationalContext;
use crate::error::{ConnectorError, ConnectorResult};
use crate::filter::Filter;
use crate::guarded::GuardedString;
use crate::handler::{
    AttributesToGetSyncResultsHandler, NormalizingSyncResultsHandler, ResultsHandler,
    SyncResultsHandler,
};
use crate::ids::{ConnectorKey, FacadeId};
use crate::lifecycle::ConnectorLifecycle;
use crate::normalizer::ObjectNormalizerFacade;
use crate::operation::{
    Attribute, AttributeSet, ConnectorObject, ObjectClass, ReservedAttributes, Uid, UID_ATTRIBUTE,
};
use crate::options::OperationOptions;
use crate::schema::Schema;
use crate::search::SearchOrchestrator;
use crate::sync::SyncToken;
use crate::traits::ScriptContext;
use crate::types::ApiOperation;
use crate::update::{validate_delta, UpdateReconciler};

/// Caller-facing operations of one configured connector.
#[derive(Debug, Clone)]
pub struct ConnectorFacade {
    id: FacadeId,
    lifecycle: ConnectorLifecycle,
    reserved: Arc<ReservedAttributes>,
}

impl ConnectorFacade {
    /// Create a facade over an operational context, with the standard
    /// reserved attribute names.
    pub fn new(context: Arc<OperationalContext>) -> Self {
        Self::with_reserved_attributes(context, Arc::new(ReservedAttributes::standard()))
    }

    /// Create a facade that validates incremental deltas against `reserved`.
    pub fn with_reserved_attributes(
        context: Arc<OperationalContext>,
        reserved: Arc<ReservedAttributes>,
    ) -> Self {
        Self {
            id: FacadeId::new(),
            lifecycle: ConnectorLifecycle::new(context),
            reserved,
        }
    }

    pub fn id(&self) -> FacadeId {
        self.id
    }

    pub fn connector_key(&self) -> ConnectorKey {
        self.lifecycle.context().connector_key()
    }

    pub fn configuration(&self) -> &ApiConfiguration {
        self.lifecycle.context().configuration()
    }

    /// Create an object and return its uid.
    ///
    /// Attribute names must be unique (case-insensitively) and must not
    /// include `__UID__`.
    #[instrument(skip(self, attributes, options), fields(facade = %self.id))]
    pub async fn create(
        &self,
        object_class: &ObjectClass,
        attributes: Vec<Attribute>,
        options: Option<OperationOptions>,
    ) -> ConnectorResult<Uid> {
        check_object_class(object_class, ApiOperation::Create)?;
        let attributes = AttributeSet::try_from_attributes(attributes)?;
        if attributes.contains(UID_ATTRIBUTE) {
            return Err(ConnectorError::InvalidAttributeSet {
                message: "create attributes cannot contain the uid".to_string(),
            });
        }
        let options = options.unwrap_or_default();

        let lease = self.lifecycle.acquire().await?;
        let instance = lease.instance()?;
        let create = instance.create_op()?;
        let normalizer = normalizer(instance, object_class);
        let uid = create
            .create(object_class, normalizer.normalize_attributes(attributes), &options)
            .await?;
        Ok(normalizer.normalize_uid(uid))
    }

    /// Delete an object.
    #[instrument(skip(self, options), fields(facade = %self.id))]
    pub async fn delete(
        &self,
        object_class: &ObjectClass,
        uid: &Uid,
        options: Option<OperationOptions>,
    ) -> ConnectorResult<()> {
        check_object_class(object_class, ApiOperation::Delete)?;
        check_uid(uid)?;
        let options = options.unwrap_or_default();

        let lease = self.lifecycle.acquire().await?;
        let instance = lease.instance()?;
        let delete = instance.delete_op()?;
        let uid = normalizer(instance, object_class).normalize_uid(uid.clone());
        delete.delete(object_class, &uid, &options).await
    }

    /// Replace attributes. An attribute with no values clears it.
    #[instrument(skip(self, replace, options), fields(facade = %self.id))]
    pub async fn update(
        &self,
        object_class: &ObjectClass,
        uid: &Uid,
        replace: AttributeSet,
        options: Option<OperationOptions>,
    ) -> ConnectorResult<Uid> {
        check_object_class(object_class, ApiOperation::Update)?;
        check_uid(uid)?;
        validate_delta(ApiOperation::Update, &replace, &self.reserved)?;
        let options = options.unwrap_or_default();

        let lease = self.lifecycle.acquire().await?;
        let instance = lease.instance()?;
        UpdateReconciler::new(instance, &self.reserved)
            .update(object_class, uid, replace, &options)
            .await
    }

    /// Add values to attributes.
    ///
    /// Without native support this fetches the object, merges, and replaces;
    /// that sequence is not atomic.
    #[instrument(skip(self, values, options), fields(facade = %self.id))]
    pub async fn add_attribute_values(
        &self,
        object_class: &ObjectClass,
        uid: &Uid,
        values: AttributeSet,
        options: Option<OperationOptions>,
    ) -> ConnectorResult<Uid> {
        check_object_class(object_class, ApiOperation::AddAttributeValues)?;
        check_uid(uid)?;
        validate_delta(ApiOperation::AddAttributeValues, &values, &self.reserved)?;
        let options = options.unwrap_or_default();

        let lease = self.lifecycle.acquire().await?;
        let instance = lease.instance()?;
        UpdateReconciler::new(instance, &self.reserved)
            .add_attribute_values(object_class, uid, values, &options)
            .await
    }

    /// Remove values from attributes.
    ///
    /// Same caveat as [`add_attribute_values`](Self::add_attribute_values).
    #[instrument(skip(self, values, options), fields(facade = %self.id))]
    pub async fn remove_attribute_values(
        &self,
        object_class: &ObjectClass,
        uid: &Uid,
        values: AttributeSet,
        options: Option<OperationOptions>,
    ) -> ConnectorResult<Uid> {
        check_object_class(object_class, ApiOperation::RemoveAttributeValues)?;
        check_uid(uid)?;
        validate_delta(ApiOperation::RemoveAttributeValues, &values, &self.reserved)?;
        let options = options.unwrap_or_default();

        let lease = self.lifecycle.acquire().await?;
        let instance = lease.instance()?;
        UpdateReconciler::new(instance, &self.reserved)
            .remove_attribute_values(object_class, uid, values, &options)
            .await
    }

    /// Stream matching objects into `handler`. `None` matches everything.
    #[instrument(skip(self, handler, options), fields(facade = %self.id))]
    pub async fn search(
        &self,
        object_class: &ObjectClass,
        filter: Option<Filter>,
        handler: &mut dyn ResultsHandler,
        options: Option<OperationOptions>,
    ) -> ConnectorResult<()> {
        check_object_class(object_class, ApiOperation::Search)?;
        let options = options.unwrap_or_default();

        let lease = self.lifecycle.acquire().await?;
        let instance = lease.instance()?;
        SearchOrchestrator::new(instance)
            .search(object_class, filter, handler, &options)
            .await
    }

    /// Fetch one object by uid.
    #[instrument(skip(self, options), fields(facade = %self.id))]
    pub async fn get_object(
        &self,
        object_class: &ObjectClass,
        uid: &Uid,
        options: Option<OperationOptions>,
    ) -> ConnectorResult<Option<ConnectorObject>> {
        check_object_class(object_class, ApiOperation::Get)?;
        check_uid(uid)?;
        let options = options.unwrap_or_default();

        let lease = self.lifecycle.acquire().await?;
        let instance = lease.instance()?;
        SearchOrchestrator::new(instance)
            .get_object(object_class, uid, &options)
            .await
    }

    /// Stream changes after `token` into `handler`. Each delta's object is
    /// normalized and, when attributes-to-get is set, projected.
    #[instrument(skip(self, handler, options), fields(facade = %self.id))]
    pub async fn sync(
        &self,
        object_class: &ObjectClass,
        token: Option<&SyncToken>,
        handler: &mut dyn SyncResultsHandler,
        options: Option<OperationOptions>,
    ) -> ConnectorResult<()> {
        check_object_class(object_class, ApiOperation::Sync)?;
        let options = options.unwrap_or_default();

        let lease = self.lifecycle.acquire().await?;
        let instance = lease.instance()?;
        let sync = instance.sync_op()?;
        let attributes_to_get = options.attributes_to_get().map(<[String]>::to_vec);
        let mut projection = AttributesToGetSyncResultsHandler::new(handler, attributes_to_get);
        let mut normalizing =
            NormalizingSyncResultsHandler::new(&mut projection, normalizer(instance, object_class));
        sync.sync(object_class, token, &mut normalizing, &options)
            .await
    }

    /// Token of the most recent change on the resource.
    #[instrument(skip(self), fields(facade = %self.id))]
    pub async fn get_latest_sync_token(
        &self,
        object_class: &ObjectClass,
    ) -> ConnectorResult<Option<SyncToken>> {
        check_object_class(object_class, ApiOperation::GetLatestSyncToken)?;

        let lease = self.lifecycle.acquire().await?;
        let instance = lease.instance()?;
        instance.sync_op()?.get_latest_sync_token(object_class).await
    }

    /// Describe the resource schema.
    #[instrument(skip(self), fields(facade = %self.id))]
    pub async fn schema(&self) -> ConnectorResult<Schema> {
        let lease = self.lifecycle.acquire().await?;
        let instance = lease.instance()?;
        instance.schema_op()?.schema().await
    }

    /// Test the configuration against the resource.
    #[instrument(skip(self), fields(facade = %self.id))]
    pub async fn test(&self) -> ConnectorResult<()> {
        let lease = self.lifecycle.acquire().await?;
        let instance = lease.instance()?;
        instance.test_op()?.test().await
    }

    /// Validate the configuration without touching the resource.
    #[instrument(skip(self), fields(facade = %self.id))]
    pub fn validate(&self) -> ConnectorResult<()> {
        let context = self.lifecycle.context();
        if context.configuration().pooling_enabled {
            context.configuration().pool.validate()?;
        }
        context.factory().validate(context.bound_configuration())
    }

    /// Verify an account's credentials and return its uid.
    #[instrument(skip(self, password, options), fields(facade = %self.id))]
    pub async fn authenticate(
        &self,
        object_class: &ObjectClass,
        username: &str,
        password: &GuardedString,
        options: Option<OperationOptions>,
    ) -> ConnectorResult<Uid> {
        check_object_class(object_class, ApiOperation::Authenticate)?;
        check_username(username)?;
        let options = options.unwrap_or_default();

        let lease = self.lifecycle.acquire().await?;
        let instance = lease.instance()?;
        let authenticate = instance.authenticate_op()?;
        let uid = authenticate
            .authenticate(object_class, username, password, &options)
            .await?;
        Ok(normalizer(instance, object_class).normalize_uid(uid))
    }

    /// Resolve a username to the account's uid.
    #[instrument(skip(self, options), fields(facade = %self.id))]
    pub async fn resolve_username(
        &self,
        object_class: &ObjectClass,
        username: &str,
        options: Option<OperationOptions>,
    ) -> ConnectorResult<Uid> {
        check_object_class(object_class, ApiOperation::ResolveUsername)?;
        check_username(username)?;
        let options = options.unwrap_or_default();

        let lease = self.lifecycle.acquire().await?;
        let instance = lease.instance()?;
        let resolve = instance.resolve_username_op()?;
        let uid = resolve
            .resolve_username(object_class, username, &options)
            .await?;
        Ok(normalizer(instance, object_class).normalize_uid(uid))
    }

    /// Run a script inside the connector.
    #[instrument(skip(self, script, options), fields(facade = %self.id, language = %script.language))]
    pub async fn run_script_on_connector(
        &self,
        script: &ScriptContext,
        options: Option<OperationOptions>,
    ) -> ConnectorResult<Value> {
        check_script(script)?;
        let options = options.unwrap_or_default();

        let lease = self.lifecycle.acquire().await?;
        let instance = lease.instance()?;
        instance
            .script_on_connector_op()?
            .run_script_on_connector(script, &options)
            .await
    }

    /// Run a script on the resource.
    #[instrument(skip(self, script, options), fields(facade = %self.id, language = %script.language))]
    pub async fn run_script_on_resource(
        &self,
        script: &ScriptContext,
        options: Option<OperationOptions>,
    ) -> ConnectorResult<Value> {
        check_script(script)?;
        let options = options.unwrap_or_default();

        let lease = self.lifecycle.acquire().await?;
        let instance = lease.instance()?;
        instance
            .script_on_resource_op()?
            .run_script_on_resource(script, &options)
            .await
    }

    /// Capabilities of the configured connector.
    #[instrument(skip(self), fields(facade = %self.id))]
    pub async fn capabilities(&self) -> ConnectorResult<CapabilitySet> {
        let lease = self.lifecycle.acquire().await?;
        let instance = lease.instance()?;
        Ok(instance.capabilities())
    }
}

fn normalizer<'a>(
    instance: &'a ConnectorInstance,
    object_class: &'a ObjectClass,
) -> ObjectNormalizerFacade<'a> {
    ObjectNormalizerFacade::new(object_class, instance.connector().attribute_normalizer())
}

fn check_object_class(object_class: &ObjectClass, operation: ApiOperation) -> ConnectorResult<()> {
    if object_class.name().trim().is_empty() {
        return Err(ConnectorError::invalid_argument(
            "object_class",
            "must not be blank",
        ));
    }
    if object_class.is_all() && !operation.accepts_all_object_class() {
        return Err(ConnectorError::invalid_argument(
            "object_class",
            format!("{} is only accepted by sync operations", ObjectClass::ALL_NAME),
        ));
    }
    Ok(())
}

fn check_uid(uid: &Uid) -> ConnectorResult<()> {
    if uid.value().trim().is_empty() {
        return Err(ConnectorError::invalid_argument("uid", "must not be blank"));
    }
    Ok(())
}

fn check_username(username: &str) -> ConnectorResult<()> {
    if username.trim().is_empty() {
        return Err(ConnectorError::invalid_argument(
            "username",
            "must not be blank",
        ));
    }
    Ok(())
}

fn check_script(script: &ScriptContext) -> ConnectorResult<()> {
    if script.language.trim().is_empty() {
        return Err(ConnectorError::invalid_argument(
            "language",
            "must not be blank",
        ));
    }
    if script.text.trim().is_empty() {
        return Err(ConnectorError::invalid_argument("text", "must not be blank"));
    }
    Ok(())
}
