//! Declaration type HTTP handler tests

use super::mock_keycloak::MockKeycloakServer;
use super::{
    build_test_router, delete_json_with_auth, get_json_with_auth, patch_with_auth,
    post_json_with_auth, put_json_with_auth, TestAppState,
};
use crate::api::create_admin_token;
use bct_core::api::MessageResponse;
use bct_core::domain::{DeclarationFormat, DeclarationFrequence, DeclarationType};
use axum::http::StatusCode;
use axum::Router;
use serde_json::{json, Value};

async fn test_app() -> (MockKeycloakServer, Router) {
    let mock_kc = MockKeycloakServer::new().await;
    let app = build_test_router(TestAppState::with_mock_keycloak(&mock_kc));
    (mock_kc, app)
}

async fn create(app: &Router, body: Value) -> (StatusCode, Option<DeclarationType>) {
    post_json_with_auth(app, "/api/admin/declaration-types", &body, &create_admin_token()).await
}

#[tokio::test]
async fn test_create_declaration_type_returns_201() {
    let (_kc, app) = test_app().await;

    let (status, body) = create(
        &app,
        json!({
            "code": "  TVA ",
            "nom": "Taxe sur la valeur ajoutee",
            "format": "XML",
            "frequence": "MENSUELLE",
            "dateLimite": "2026-01-20"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let created = body.unwrap();
    assert_eq!(created.code, "TVA");
    assert_eq!(created.format, Some(DeclarationFormat::Xml));
    assert_eq!(created.frequence, Some(DeclarationFrequence::Mensuelle));
    assert!(created.actif);
}

#[tokio::test]
async fn test_create_duplicate_code_returns_409() {
    let (_kc, app) = test_app().await;

    let (status, _) = create(&app, json!({ "code": "IS" })).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = create(&app, json!({ "code": "IS", "format": "TXT" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_create_blank_code_returns_400() {
    let (_kc, app) = test_app().await;

    let (status, _) = create(&app, json!({ "code": "   " })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_unknown_format_is_rejected() {
    let (_kc, app) = test_app().await;

    let (status, _) = create(&app, json!({ "code": "IR", "format": "PDF" })).await;

    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_list_declaration_types() {
    let (_kc, app) = test_app().await;
    create(&app, json!({ "code": "TVA" })).await;
    create(&app, json!({ "code": "IS", "actif": false })).await;

    let (status, body): (StatusCode, Option<Vec<DeclarationType>>) =
        get_json_with_auth(&app, "/api/admin/declaration-types", &create_admin_token()).await;

    assert_eq!(status, StatusCode::OK);
    let declarations = body.unwrap();
    assert_eq!(declarations.len(), 2);
    assert!(!declarations[1].actif);
}

#[tokio::test]
async fn test_update_declaration_type() {
    let (_kc, app) = test_app().await;
    let (_, created) = create(&app, json!({ "code": "TVA" })).await;
    let id = created.unwrap().id;

    let (status, body): (StatusCode, Option<DeclarationType>) = put_json_with_auth(
        &app,
        &format!("/api/admin/declaration-types/{}", id),
        &json!({ "code": "TVA", "nom": "TVA trimestrielle", "frequence": "TRIMESTRIELLE" }),
        &create_admin_token(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let updated = body.unwrap();
    assert_eq!(updated.id, id);
    assert_eq!(updated.nom.as_deref(), Some("TVA trimestrielle"));
    assert_eq!(updated.frequence, Some(DeclarationFrequence::Trimestrielle));
}

#[tokio::test]
async fn test_update_to_taken_code_returns_409() {
    let (_kc, app) = test_app().await;
    create(&app, json!({ "code": "TVA" })).await;
    let (_, second) = create(&app, json!({ "code": "IS" })).await;

    let (status, _body): (StatusCode, Option<Value>) = put_json_with_auth(
        &app,
        &format!("/api/admin/declaration-types/{}", second.unwrap().id),
        &json!({ "code": "TVA" }),
        &create_admin_token(),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_update_missing_declaration_type_returns_404() {
    let (_kc, app) = test_app().await;

    let (status, _body): (StatusCode, Option<Value>) = put_json_with_auth(
        &app,
        "/api/admin/declaration-types/999",
        &json!({ "code": "TVA" }),
        &create_admin_token(),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_declaration_type() {
    let (_kc, app) = test_app().await;
    let (_, created) = create(&app, json!({ "code": "TVA" })).await;
    let path = format!("/api/admin/declaration-types/{}", created.unwrap().id);
    let token = create_admin_token();

    let (status, body): (StatusCode, Option<MessageResponse>) =
        delete_json_with_auth(&app, &path, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap().message, "Declaration type deleted successfully");

    let (status, _): (StatusCode, Option<Value>) =
        delete_json_with_auth(&app, &path, &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_toggle_flips_actif() {
    let (_kc, app) = test_app().await;
    let (_, created) = create(&app, json!({ "code": "TVA" })).await;
    let path = format!("/api/admin/declaration-types/{}/toggle", created.unwrap().id);
    let token = create_admin_token();

    let (status, body): (StatusCode, Option<DeclarationType>) =
        patch_with_auth(&app, &path, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.unwrap().actif);

    let (_, body): (StatusCode, Option<DeclarationType>) =
        patch_with_auth(&app, &path, &token).await;
    assert!(body.unwrap().actif);
}

#[tokio::test]
async fn test_toggle_missing_declaration_type_returns_404() {
    let (_kc, app) = test_app().await;

    let (status, _body): (StatusCode, Option<Value>) = patch_with_auth(
        &app,
        "/api/admin/declaration-types/42/toggle",
        &create_admin_token(),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
