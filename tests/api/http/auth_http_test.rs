//! Admin gate tests: authentication and the administrator role

use super::mock_keycloak::MockKeycloakServer;
use super::{build_test_router, get_json, get_json_with_auth, get_text, TestAppState};
use crate::api::{create_expired_token, create_test_token};
use axum::http::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn test_admin_route_without_token_returns_401() {
    let mock_kc = MockKeycloakServer::new().await;
    let app = build_test_router(TestAppState::with_mock_keycloak(&mock_kc));

    let (status, body): (StatusCode, Option<Value>) =
        get_json(&app, "/api/admin/declaration-types").await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body.unwrap()["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_admin_route_with_non_admin_returns_403() {
    let mock_kc = MockKeycloakServer::new().await;
    let app = build_test_router(TestAppState::with_mock_keycloak(&mock_kc));
    let token = create_test_token("agent", &["ROLE_AGENT", "ROLE_MANAGER"]);

    let (status, body): (StatusCode, Option<Value>) =
        get_json_with_auth(&app, "/api/admin/declaration-types", &token).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body.unwrap(),
        json!({ "error": "Access denied", "code": "FORBIDDEN" })
    );
}

#[tokio::test]
async fn test_admin_gate_runs_before_keycloak_calls() {
    let mock_kc = MockKeycloakServer::new().await;
    let app = build_test_router(TestAppState::with_mock_keycloak(&mock_kc));
    let token = create_test_token("auditor", &["ROLE_AUDITOR"]);

    let (status, _): (StatusCode, Option<Value>) =
        get_json_with_auth(&app, "/api/admin/users", &token).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(mock_kc.received_requests().await.is_empty());
}

#[tokio::test]
async fn test_expired_token_returns_401() {
    let mock_kc = MockKeycloakServer::new().await;
    let app = build_test_router(TestAppState::with_mock_keycloak(&mock_kc));

    let (status, body): (StatusCode, Option<Value>) = get_json_with_auth(
        &app,
        "/api/admin/declaration-types",
        &create_expired_token(&["ROLE_ADMIN"]),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body.unwrap()["error"], "Token has expired");
}

#[tokio::test]
async fn test_garbage_token_returns_401() {
    let mock_kc = MockKeycloakServer::new().await;
    let app = build_test_router(TestAppState::with_mock_keycloak(&mock_kc));

    let (status, body): (StatusCode, Option<Value>) =
        get_json_with_auth(&app, "/api/admin/roles", "not.a.jwt").await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body.unwrap()["error"], "Invalid token");
}

#[tokio::test]
async fn test_cors_preflight_is_answered_without_token() {
    let mock_kc = MockKeycloakServer::new().await;
    let app = build_test_router(TestAppState::with_mock_keycloak(&mock_kc));

    let response = tower::ServiceExt::oneshot(
        app,
        axum::http::Request::builder()
            .method("OPTIONS")
            .uri("/api/admin/users")
            .header("origin", "http://localhost:4200")
            .header("access-control-request-method", "GET")
            .header("access-control-request-headers", "authorization")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://localhost:4200"
    );
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let mock_kc = MockKeycloakServer::new().await;
    let app = build_test_router(TestAppState::with_mock_keycloak(&mock_kc));

    let (status, _) = get_text(&app, "/api/nothing-here", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
