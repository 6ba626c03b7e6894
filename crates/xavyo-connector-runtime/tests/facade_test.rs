//! Facade operations against the in-memory connector.

mod common;

use common::{account, facade, init_test_logging, MemoryFactory, Profile};
use serde_json::json;
use std::sync::Arc;
use xavyo_connector_runtime::context::OperationalContext;
use xavyo_connector_runtime::prelude::*;

fn mail(value: &str) -> Attribute {
    Attribute::single("mail", value)
}

#[tokio::test]
async fn test_create_then_get_object() {
    let (facade, resource) = facade(Profile {
        lowercase_mail: true,
        ..Default::default()
    });

    let uid = facade
        .create(
            &ObjectClass::account(),
            vec![Attribute::single(NAME_ATTRIBUTE, "jdoe"), mail("John.Doe@Example.COM")],
            None,
        )
        .await
        .unwrap();
    assert_eq!(uid.value(), "jdoe");

    let object = facade
        .get_object(&ObjectClass::account(), &uid, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        object.attribute("mail").unwrap().values(),
        &[AttributeValue::from("john.doe@example.com")]
    );
    assert!(resource.object("jdoe").is_some());
}

#[tokio::test]
async fn test_get_object_missing_is_none() {
    let (facade, _resource) = facade(Profile::default());
    let found = facade
        .get_object(&ObjectClass::account(), &Uid::new("ghost"), None)
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_create_rejects_duplicate_names_before_connector() {
    let (facade, resource) = facade(Profile::default());

    let err = facade
        .create(
            &ObjectClass::account(),
            vec![mail("a@example.com"), mail("b@example.com")],
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectorError::DuplicateAttribute { .. }));
    assert!(resource.calls().is_empty());
}

#[tokio::test]
async fn test_create_rejects_uid() {
    let (facade, resource) = facade(Profile::default());

    let err = facade
        .create(
            &ObjectClass::account(),
            vec![Uid::new("u1").to_attribute(), mail("a@example.com")],
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectorError::InvalidAttributeSet { .. }));
    assert!(resource.calls().is_empty());
}

#[tokio::test]
async fn test_blank_arguments_rejected() {
    let (facade, resource) = facade(Profile::default());

    let err = facade
        .delete(&ObjectClass::account(), &Uid::new(" "), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::InvalidArgument { .. }));

    let err = facade
        .resolve_username(&ObjectClass::account(), "", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::InvalidArgument { .. }));

    let err = facade
        .run_script_on_connector(&ScriptContext::new("shell", ""), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::InvalidArgument { .. }));

    let err = facade
        .search(&ObjectClass::new(""), None, &mut |_: ConnectorObject| true, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::InvalidArgument { .. }));

    assert!(resource.calls().is_empty());
}

#[tokio::test]
async fn test_all_object_class_only_for_sync() {
    let (facade, resource) = facade(Profile::default());
    resource.insert(account("u1", vec![]));

    let err = facade
        .search(&ObjectClass::all(), None, &mut |_: ConnectorObject| true, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::InvalidArgument { .. }));

    facade
        .create(
            &ObjectClass::account(),
            vec![Attribute::single(NAME_ATTRIBUTE, "u2")],
            None,
        )
        .await
        .unwrap();

    let mut deltas = Vec::new();
    facade
        .sync(
            &ObjectClass::all(),
            None,
            &mut |delta: SyncDelta| {
                deltas.push(delta);
                true
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(deltas.len(), 1);
    assert!(facade
        .get_latest_sync_token(&ObjectClass::all())
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_sync_from_token_with_projection() {
    let (facade, _resource) = facade(Profile {
        lowercase_mail: true,
        ..Default::default()
    });
    let class = ObjectClass::account();

    assert!(facade.get_latest_sync_token(&class).await.unwrap().is_none());

    facade
        .create(
            &class,
            vec![Attribute::single(NAME_ATTRIBUTE, "first"), mail("First@Example.com")],
            None,
        )
        .await
        .unwrap();
    let token = facade.get_latest_sync_token(&class).await.unwrap().unwrap();
    facade
        .create(
            &class,
            vec![
                Attribute::single(NAME_ATTRIBUTE, "second"),
                mail("Second@Example.com"),
                Attribute::new("groups", ["staff"]),
            ],
            None,
        )
        .await
        .unwrap();

    let mut deltas = Vec::new();
    let options = OperationOptions::builder().attributes_to_get(["mail"]).build();
    facade
        .sync(
            &class,
            Some(&token),
            &mut |delta: SyncDelta| {
                deltas.push(delta);
                true
            },
            Some(options),
        )
        .await
        .unwrap();

    assert_eq!(deltas.len(), 1);
    let delta = &deltas[0];
    assert_eq!(delta.delta_type(), SyncDeltaType::Create);
    assert_eq!(delta.uid().value(), "second");

    let object = delta.object().unwrap();
    let mut names: Vec<&str> = object.attributes().names().collect();
    names.sort_unstable();
    assert_eq!(names, vec!["__UID__", "mail"]);
    assert_eq!(
        object.attribute("mail").unwrap().values(),
        &[AttributeValue::from("second@example.com")]
    );
}

#[tokio::test]
async fn test_sync_handler_stop() {
    let (facade, _resource) = facade(Profile::default());
    let class = ObjectClass::account();
    for name in ["a", "b", "c"] {
        facade
            .create(&class, vec![Attribute::single(NAME_ATTRIBUTE, name)], None)
            .await
            .unwrap();
    }

    let mut seen = 0;
    facade
        .sync(
            &class,
            None,
            &mut |_delta: SyncDelta| {
                seen += 1;
                false
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(seen, 1);
}

#[tokio::test]
async fn test_delete() {
    let (facade, resource) = facade(Profile::default());
    resource.insert(account("u1", vec![]));

    facade
        .delete(&ObjectClass::account(), &Uid::new("u1"), None)
        .await
        .unwrap();
    assert!(resource.object("u1").is_none());

    let err = facade
        .delete(&ObjectClass::account(), &Uid::new("u1"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::UnknownUid { .. }));
}

#[tokio::test]
async fn test_authenticate_and_resolve_username() {
    let (facade, resource) = facade(Profile::default());
    resource.insert(account(
        "jdoe",
        vec![Attribute::single(
            "__PASSWORD__",
            GuardedString::new("s3cret"),
        )],
    ));
    let class = ObjectClass::account();

    let uid = facade
        .authenticate(&class, "jdoe", &GuardedString::new("s3cret"), None)
        .await
        .unwrap();
    assert_eq!(uid.value(), "jdoe");

    let err = facade
        .authenticate(&class, "jdoe", &GuardedString::new("wrong"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::AuthenticationFailed));

    let uid = facade.resolve_username(&class, "jdoe", None).await.unwrap();
    assert_eq!(uid.value(), "jdoe");
}

#[tokio::test]
async fn test_schema_test_and_script() {
    let (facade, resource) = facade(Profile::default());

    let schema = facade.schema().await.unwrap();
    assert!(schema.object_class(ObjectClass::ACCOUNT_NAME).is_some());

    facade.test().await.unwrap();

    let script = ScriptContext::new("shell", "echo hi").with_argument("user", "jdoe");
    let result = facade.run_script_on_connector(&script, None).await.unwrap();
    assert_eq!(result["echo"], json!("echo hi"));
    assert_eq!(result["arguments"]["user"], json!("jdoe"));

    assert_eq!(
        resource.calls(),
        vec![
            "init",
            "schema",
            "dispose",
            "init",
            "test",
            "dispose",
            "init",
            "run_script_on_connector",
            "dispose",
        ]
    );
}

#[tokio::test]
async fn test_unsupported_operation() {
    let (facade, resource) = facade(Profile {
        replace_only: true,
        ..Default::default()
    });

    let err = facade
        .run_script_on_resource(&ScriptContext::new("shell", "ls"), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ConnectorError::OperationNotSupported {
            operation: ApiOperation::ScriptOnResource
        }
    ));

    let err = facade
        .create(
            &ObjectClass::account(),
            vec![Attribute::single(NAME_ATTRIBUTE, "u1")],
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ConnectorError::OperationNotSupported {
            operation: ApiOperation::Create
        }
    ));

    // The instance is released even when the capability is missing.
    assert_eq!(resource.created(), resource.disposed());
}

#[tokio::test]
async fn test_capabilities() {
    let (facade, _resource) = facade(Profile {
        replace_only: true,
        ..Default::default()
    });

    let capabilities = facade.capabilities().await.unwrap();
    assert!(capabilities.supports(ApiOperation::Update));
    assert!(capabilities.supports(ApiOperation::AddAttributeValues));
    assert!(capabilities.supports(ApiOperation::RemoveAttributeValues));
    assert!(!capabilities.supports(ApiOperation::Create));
    assert!(!capabilities.supports(ApiOperation::Sync));
}

#[tokio::test]
async fn test_validate_does_not_touch_connector() {
    init_test_logging();
    let factory = Arc::new(MemoryFactory::new(Profile::default()));
    let resource = factory.resource();

    let missing_host = OperationalContext::new(factory.clone(), ApiConfiguration::default()).unwrap();
    let err = ConnectorFacade::new(Arc::new(missing_host))
        .validate()
        .unwrap_err();
    assert!(matches!(err, ConnectorError::InvalidConfiguration { .. }));

    let valid = OperationalContext::new(factory, common::configuration()).unwrap();
    ConnectorFacade::new(Arc::new(valid)).validate().unwrap();

    assert!(resource.calls().is_empty());
}

#[tokio::test]
async fn test_init_failure_surfaces_and_disposes() {
    init_test_logging();
    let factory = Arc::new(MemoryFactory::new(Profile::default()));
    let resource = factory.resource();
    let configuration = common::configuration().with_property("fail_init", true);
    let facade = ConnectorFacade::new(Arc::new(
        OperationalContext::new(factory, configuration).unwrap(),
    ));

    let err = facade.schema().await.unwrap_err();
    assert!(matches!(err, ConnectorError::InvalidConfiguration { .. }));
    assert_eq!(resource.calls(), vec!["init", "dispose"]);
}

#[tokio::test]
async fn test_dispose_failure_is_not_reported() {
    let (facade, resource) = facade(Profile {
        fail_dispose: true,
        ..Default::default()
    });

    facade.test().await.unwrap();
    facade.test().await.unwrap();
    assert_eq!(resource.disposed(), 2);
}
