//! System endpoint tests

use super::mock_keycloak::MockKeycloakServer;
use super::{build_test_router, get_json, get_text, TestAppState};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use bct_core::api::health::HealthResponse;
use serde_json::Value;
use tower::ServiceExt;

#[tokio::test]
async fn test_health_returns_version() {
    let mock_kc = MockKeycloakServer::new().await;
    let app = build_test_router(TestAppState::with_mock_keycloak(&mock_kc));

    let (status, body): (StatusCode, Option<HealthResponse>) = get_json(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    let health = body.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_ready() {
    let mock_kc = MockKeycloakServer::new().await;
    let app = build_test_router(TestAppState::with_mock_keycloak(&mock_kc));

    let (status, body) = get_text(&app, "/ready", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ready");
}

#[tokio::test]
async fn test_metrics_disabled_returns_404() {
    let mock_kc = MockKeycloakServer::new().await;
    let app = build_test_router(TestAppState::with_mock_keycloak(&mock_kc));

    let (status, body) = get_text(&app, "/metrics", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "Metrics not enabled");
}

#[tokio::test]
async fn test_openapi_document_lists_admin_paths() {
    let mock_kc = MockKeycloakServer::new().await;
    let app = build_test_router(TestAppState::with_mock_keycloak(&mock_kc));

    let (status, body): (StatusCode, Option<Value>) =
        get_json(&app, "/api-docs/openapi.json").await;

    assert_eq!(status, StatusCode::OK);
    let doc = body.unwrap();
    assert!(doc["paths"]["/api/admin/users"].is_object());
    assert!(doc["paths"]["/api/admin/declaration-types/{id}/toggle"].is_object());
    assert!(doc["components"]["securitySchemes"]["bearer_jwt"].is_object());
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let mock_kc = MockKeycloakServer::new().await;
    let app = build_test_router(TestAppState::with_mock_keycloak(&mock_kc));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "req-123");
}
