/// Message handler tests over a real PostgreSQL; skipped when it is unreachable.
mod common;

use serde_json::{json, Value};
use service_store::handlers::{self, ServiceHandler};
use service_store::services::ServiceError;

async fn spawn_handler() -> Option<ServiceHandler> {
    common::spawn_store().await.map(ServiceHandler::new)
}

fn body(value: Value) -> Vec<u8> {
    value.to_string().into_bytes()
}

#[tokio::test]
async fn create_then_get_and_find() {
    let handler = match spawn_handler().await {
        Some(handler) => handler,
        None => return,
    };

    let created = handler
        .handle(
            "service.create",
            &body(json!({
                "id": "b-1",
                "user_id": 1,
                "datacenter_id": 7,
                "name": "env-x",
                "type": "terraform",
                "options": {"region": "eu-west-1"},
                "credentials": {"token": "t"},
                "definition": "name: env-x"
            })),
        )
        .await
        .unwrap();
    let created: Value = serde_json::from_slice(&created).unwrap();
    assert_eq!(created["id"], "b-1");
    assert_eq!(created["status"], "in_progress");
    assert!(created["version"].is_string());

    let stored = handler
        .handle("service.get", &body(json!({"id": "b-1"})))
        .await
        .unwrap();
    let stored: Value = serde_json::from_slice(&stored).unwrap();
    assert_eq!(stored["name"], "env-x");
    assert_eq!(stored["version"], created["version"]);
    assert_eq!(stored["options"], json!({"region": "eu-west-1"}));
    assert!(stored.get("mapping").is_none());

    let found = handler
        .handle("service.find", &body(json!({"names": ["env-x", "env-y"]})))
        .await
        .unwrap();
    let found: Vec<Value> = serde_json::from_slice(&found).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["id"], "b-1");
}

#[tokio::test]
async fn find_without_matches_is_empty_list() {
    let handler = match spawn_handler().await {
        Some(handler) => handler,
        None => return,
    };

    let found = handler
        .handle("service.find", &body(json!({"name": "nothing"})))
        .await
        .unwrap();
    assert_eq!(found, b"[]");
}

#[tokio::test]
async fn failures_are_reported() {
    let handler = match spawn_handler().await {
        Some(handler) => handler,
        None => return,
    };

    let missing = handler
        .handle("service.get", &body(json!({"id": "b-404"})))
        .await;
    assert!(matches!(missing, Err(ServiceError::NotFound(_))));

    let unknown = handler.handle("service.purge", b"{}").await;
    assert!(matches!(unknown, Err(ServiceError::Validation(_))));

    let malformed = handler.handle("service.create", b"{\"name\":").await;
    let err = malformed.unwrap_err();
    assert!(matches!(err, ServiceError::Decode(_)));

    let reply: Value = serde_json::from_slice(&handlers::failure(&err)).unwrap();
    assert!(reply["error"].as_str().unwrap().starts_with("malformed payload"));
}

#[tokio::test]
async fn update_delete_and_set_status_round() {
    let handler = match spawn_handler().await {
        Some(handler) => handler,
        None => return,
    };

    handler
        .handle(
            "service.create",
            &body(json!({"name": "env-x", "id": "b-1", "type": "terraform"})),
        )
        .await
        .unwrap();

    let conflict = handler
        .handle(
            "service.create",
            &body(json!({"name": "env-x", "id": "b-2", "type": "terraform"})),
        )
        .await;
    assert!(matches!(conflict, Err(ServiceError::Conflict)));

    handler
        .handle(
            "service.set.status",
            &body(json!({"id": "b-1", "status": "errored"})),
        )
        .await
        .unwrap();

    handler
        .handle(
            "service.create",
            &body(json!({"name": "env-x", "id": "b-2", "type": "terraform"})),
        )
        .await
        .unwrap();

    handler
        .handle(
            "service.update",
            &body(json!({"name": "env-x", "options": {"size": "large"}})),
        )
        .await
        .unwrap();

    let stored = handler
        .handle("service.get", &body(json!({"name": "env-x"})))
        .await
        .unwrap();
    let stored: Value = serde_json::from_slice(&stored).unwrap();
    assert_eq!(stored["id"], "b-2");
    assert_eq!(stored["options"], json!({"size": "large"}));

    handler
        .handle("service.delete", &body(json!({"name": "env-x"})))
        .await
        .unwrap();

    let gone = handler
        .handle("service.get", &body(json!({"name": "env-x"})))
        .await;
    assert!(matches!(gone, Err(ServiceError::NotFound(_))));
}
