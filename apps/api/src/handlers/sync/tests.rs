use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use inventra_domain::WorkspaceRole;
use serde_json::{Value, json};

use crate::test_support::{approved_create, request, send, test_app};

const MEMBERS: &[(&str, WorkspaceRole)] = &[
    ("owner", WorkspaceRole::Owner),
    ("member", WorkspaceRole::Member),
    ("viewer", WorkspaceRole::Viewer),
];

fn batch(operations: Vec<Value>) -> Option<Value> {
    Some(json!({ "operations": operations }))
}

#[tokio::test]
async fn batch_reports_each_operation_in_order() {
    let (app, workspace_id) = test_app(MEMBERS).await;
    let item_id =
        approved_create(&app, workspace_id, "viewer", "owner", "item", json!({"name": "Drill"}))
            .await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/sync/batch",
            workspace_id,
            "member",
            batch(vec![
                json!({"operation": "update", "entity_type": "item", "entity_id": item_id, "data": {"name": "Cordless drill"}}),
                json!({"operation": "update", "entity_type": "item", "entity_id": item_id, "data": {"name": "Old drill"}, "updated_at": "2000-01-01T00:00:00Z"}),
                json!({"operation": "create", "entity_type": "item", "data": {"name": "Saw"}}),
                json!({"operation": "update", "entity_type": "spaceship", "entity_id": "x"}),
            ]),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["succeeded"], json!(1));
    assert_eq!(body["conflicts"], json!(1));
    assert_eq!(body["failed"], json!(2));

    let results = body["results"].as_array().cloned().unwrap_or_default();
    assert_eq!(results.len(), 4);
    assert_eq!(results[0]["status"], json!("success"));
    assert_eq!(results[0]["entity_id"], json!(item_id));
    assert_eq!(results[1]["status"], json!("conflict"));
    assert_eq!(results[1]["has_conflict"], json!(true));
    assert_eq!(results[1]["server_data"]["name"], json!("Cordless drill"));
    assert_eq!(results[2]["error_code"], json!("UNSUPPORTED_OPERATION"));
    assert_eq!(results[3]["error_code"], json!("INVALID_ENTITY_TYPE"));
    for (index, result) in results.iter().enumerate() {
        assert_eq!(result["index"], json!(index));
    }
}

#[tokio::test]
async fn empty_and_oversized_batches_are_bad_requests() {
    let (app, workspace_id) = test_app(MEMBERS).await;

    let (status, _) = send(
        &app,
        request(Method::POST, "/api/sync/batch", workspace_id, "member", batch(Vec::new())),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let operations = (0..101)
        .map(|index| json!({"operation": "delete", "entity_type": "item", "entity_id": format!("item-{index}")}))
        .collect();
    let (status, _) = send(
        &app,
        request(Method::POST, "/api/sync/batch", workspace_id, "member", batch(operations)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn viewers_cannot_sync() {
    let (app, workspace_id) = test_app(MEMBERS).await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/sync/batch",
            workspace_id,
            "viewer",
            batch(vec![json!({"operation": "delete", "entity_type": "item", "entity_id": "item-1"})]),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["message"].as_str().is_some());
}

#[tokio::test]
async fn requests_without_identity_headers_are_unauthorized() {
    let (app, _) = test_app(MEMBERS).await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/sync/batch")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"operations":[]}"#))
        .unwrap_or_else(|_| unreachable!());

    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_needs_no_identity() {
    let (app, _) = test_app(&[]).await;
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap_or_else(|_| unreachable!());

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
}
