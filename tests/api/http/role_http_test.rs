//! Realm role HTTP handler tests

use super::mock_keycloak::MockKeycloakServer;
use super::{
    build_test_router, delete_with_body_with_auth, get_json_with_auth, post_json_with_auth,
    TestAppState,
};
use crate::api::{create_admin_token, keycloak_role_json, keycloak_user_json};
use bct_core::api::MessageResponse;
use bct_core::domain::{RoleDto, UserDto};
use axum::http::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn test_list_roles_hides_builtin_roles() {
    let mock_kc = MockKeycloakServer::new().await;
    mock_kc
        .mock_realm_roles(json!([
            keycloak_role_json("ROLE_ADMIN"),
            keycloak_role_json("offline_access"),
            keycloak_role_json("ROLE_AUDITOR"),
            keycloak_role_json("uma_authorization"),
        ]))
        .await;

    let app = build_test_router(TestAppState::with_mock_keycloak(&mock_kc));

    let (status, body): (StatusCode, Option<Vec<RoleDto>>) =
        get_json_with_auth(&app, "/api/admin/roles", &create_admin_token()).await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<String> = body.unwrap().into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["ROLE_ADMIN", "ROLE_AUDITOR"]);
}

#[tokio::test]
async fn test_get_user_roles() {
    let mock_kc = MockKeycloakServer::new().await;
    mock_kc
        .mock_user_roles(
            "u-1",
            json!([
                keycloak_role_json("ROLE_MANAGER"),
                keycloak_role_json("default-roles-test"),
            ]),
        )
        .await;

    let app = build_test_router(TestAppState::with_mock_keycloak(&mock_kc));

    let (status, body): (StatusCode, Option<Vec<RoleDto>>) =
        get_json_with_auth(&app, "/api/admin/users/u-1/roles", &create_admin_token()).await;

    assert_eq!(status, StatusCode::OK);
    let roles = body.unwrap();
    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0].name, "ROLE_MANAGER");
    assert_eq!(roles[0].id.as_deref(), Some("role-role_manager"));
}

#[tokio::test]
async fn test_assign_roles_skips_unknown_names_and_mirrors() {
    let mock_kc = MockKeycloakServer::new().await;
    mock_kc
        .mock_get_role("ROLE_AGENT", keycloak_role_json("ROLE_AGENT"))
        .await;
    mock_kc.mock_role_not_found("ROLE_GHOST").await;
    mock_kc.mock_add_user_roles("u-1").await;
    mock_kc
        .mock_get_user("u-1", keycloak_user_json("u-1", "alice", true))
        .await;
    mock_kc
        .mock_user_roles("u-1", json!([keycloak_role_json("ROLE_AGENT")]))
        .await;

    let state = TestAppState::with_mock_keycloak(&mock_kc);
    let user_repo = state.user_repo.clone();
    let app = build_test_router(state);

    let (status, body): (StatusCode, Option<MessageResponse>) = post_json_with_auth(
        &app,
        "/api/admin/users/u-1/roles",
        &json!(["ROLE_AGENT", "ROLE_GHOST"]),
        &create_admin_token(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap().message, "Roles assigned successfully");

    let requests = mock_kc.received_requests().await;
    let mapping = requests
        .iter()
        .find(|r| r.method.as_str() == "POST" && r.url.path().ends_with("/role-mappings/realm"))
        .expect("role mapping request");
    let sent: Vec<Value> = serde_json::from_slice(&mapping.body).unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["name"], "ROLE_AGENT");

    let mirrored = user_repo.snapshot().await;
    assert_eq!(mirrored[0].roles, vec!["ROLE_AGENT"]);
}

#[tokio::test]
async fn test_assign_only_unknown_roles_makes_no_mapping_call() {
    let mock_kc = MockKeycloakServer::new().await;
    mock_kc.mock_role_not_found("ROLE_GHOST").await;
    mock_kc
        .mock_get_user("u-1", keycloak_user_json("u-1", "alice", true))
        .await;
    mock_kc.mock_user_roles("u-1", json!([])).await;

    let app = build_test_router(TestAppState::with_mock_keycloak(&mock_kc));

    let (status, _body): (StatusCode, Option<MessageResponse>) = post_json_with_auth(
        &app,
        "/api/admin/users/u-1/roles",
        &json!(["ROLE_GHOST"]),
        &create_admin_token(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let requests = mock_kc.received_requests().await;
    assert!(!requests
        .iter()
        .any(|r| r.url.path().ends_with("/role-mappings/realm")));
}

#[tokio::test]
async fn test_assign_roles_fails_when_mirror_cannot_refresh() {
    let mock_kc = MockKeycloakServer::new().await;
    mock_kc
        .mock_get_role("ROLE_AGENT", keycloak_role_json("ROLE_AGENT"))
        .await;
    mock_kc.mock_add_user_roles("u-1").await;
    mock_kc.mock_get_user_not_found("u-1").await;

    let app = build_test_router(TestAppState::with_mock_keycloak(&mock_kc));

    let (status, body): (StatusCode, Option<Value>) = post_json_with_auth(
        &app,
        "/api/admin/users/u-1/roles",
        &json!(["ROLE_AGENT"]),
        &create_admin_token(),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body.unwrap()["error"], "internal_error");
}

#[tokio::test]
async fn test_remove_roles() {
    let mock_kc = MockKeycloakServer::new().await;
    mock_kc
        .mock_get_role("ROLE_AUDITOR", keycloak_role_json("ROLE_AUDITOR"))
        .await;
    mock_kc.mock_remove_user_roles("u-1").await;
    mock_kc
        .mock_get_user("u-1", keycloak_user_json("u-1", "alice", true))
        .await;
    mock_kc.mock_user_roles("u-1", json!([])).await;

    let app = build_test_router(TestAppState::with_mock_keycloak(&mock_kc));

    let (status, body): (StatusCode, Option<MessageResponse>) = delete_with_body_with_auth(
        &app,
        "/api/admin/users/u-1/roles",
        &json!(["ROLE_AUDITOR"]),
        &create_admin_token(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap().message, "Roles removed successfully");

    let requests = mock_kc.received_requests().await;
    assert!(requests
        .iter()
        .any(|r| r.method.as_str() == "DELETE" && r.url.path().ends_with("/role-mappings/realm")));
}

#[tokio::test]
async fn test_users_by_role() {
    let mock_kc = MockKeycloakServer::new().await;
    mock_kc
        .mock_role_members(
            "ROLE_AGENT",
            json!([
                keycloak_user_json("u-1", "alice", true),
                keycloak_user_json("u-2", "bob", true),
            ]),
        )
        .await;
    mock_kc
        .mock_user_roles("u-1", json!([keycloak_role_json("ROLE_AGENT")]))
        .await;
    mock_kc
        .mock_user_roles("u-2", json!([keycloak_role_json("ROLE_AGENT")]))
        .await;

    let app = build_test_router(TestAppState::with_mock_keycloak(&mock_kc));

    let (status, body): (StatusCode, Option<Vec<UserDto>>) = get_json_with_auth(
        &app,
        "/api/admin/roles/ROLE_AGENT/users",
        &create_admin_token(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let users = body.unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u.roles == vec!["ROLE_AGENT"]));
}

#[tokio::test]
async fn test_users_by_unknown_role_returns_404() {
    let mock_kc = MockKeycloakServer::new().await;
    mock_kc.mock_role_members_not_found("ROLE_GHOST").await;

    let app = build_test_router(TestAppState::with_mock_keycloak(&mock_kc));

    let (status, _body): (StatusCode, Option<Value>) = get_json_with_auth(
        &app,
        "/api/admin/roles/ROLE_GHOST/users",
        &create_admin_token(),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
