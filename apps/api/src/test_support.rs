use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request, StatusCode};
use inventra_application::AuthorizationRepository;
use inventra_core::WorkspaceId;
use inventra_domain::WorkspaceRole;
use serde_json::Value;
use tower::ServiceExt;

use crate::api_router::build_router;
use crate::api_services::{RepositorySet, build_app_state};
use crate::middleware::{SUBJECT_HEADER, WORKSPACE_HEADER};

pub(crate) async fn test_app(members: &[(&str, WorkspaceRole)]) -> (Router, WorkspaceId) {
    let workspace_id = WorkspaceId::new();
    let repositories = RepositorySet::in_memory();
    for (subject, role) in members {
        assert!(
            repositories
                .authorization_repository
                .save_member_role(workspace_id, subject, *role)
                .await
                .is_ok()
        );
    }

    (build_router(build_app_state(repositories)), workspace_id)
}

pub(crate) fn request(
    method: Method,
    uri: &str,
    workspace_id: WorkspaceId,
    subject: &str,
    body: Option<Value>,
) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(WORKSPACE_HEADER, workspace_id.to_string())
        .header(SUBJECT_HEADER, subject);

    let request = match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    };
    request.unwrap_or_else(|_| unreachable!())
}

pub(crate) async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .unwrap_or_else(|_| unreachable!());
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap_or_default();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    (status, body)
}

/// Submits a change as `requester` and approves it as `reviewer`, returning the record id.
pub(crate) async fn approved_create(
    app: &Router,
    workspace_id: WorkspaceId,
    requester: &str,
    reviewer: &str,
    entity_type: &str,
    payload: Value,
) -> String {
    let (status, submitted) = send(
        app,
        request(
            Method::POST,
            "/api/pending-changes",
            workspace_id,
            requester,
            Some(serde_json::json!({
                "entity_type": entity_type,
                "action": "create",
                "payload": payload,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let change_id = submitted["id"].as_str().unwrap_or_default().to_owned();

    let (status, approved) = send(
        app,
        request(
            Method::POST,
            format!("/api/pending-changes/{change_id}/approve").as_str(),
            workspace_id,
            reviewer,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    approved["entity_id"].as_str().unwrap_or_default().to_owned()
}
