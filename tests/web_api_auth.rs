//! Web API Authentication Tests
//!
//! Integration tests for authentication endpoints and route gating.

mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{
    admin_token, bearer, create_user, login_user, spawn_app, upload, ADMIN_PASSWORD,
    ADMIN_USERNAME,
};
use pleer::Role;

// ============================================================================
// Login Tests
// ============================================================================

#[tokio::test]
async fn test_login_bootstrapped_admin() {
    let app = spawn_app().await;

    let body = login_user(&app.server, ADMIN_USERNAME, ADMIN_PASSWORD).await;

    assert!(body["data"]["access_token"].is_string());
    assert!(body["data"]["refresh_token"].is_string());
    assert_eq!(body["data"]["expires_in"], 900);
    assert_eq!(body["data"]["user"]["username"], ADMIN_USERNAME);
    assert_eq!(body["data"]["user"]["role"], "admin");
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = spawn_app().await;

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({
            "username": ADMIN_USERNAME,
            "password": "not-the-password"
        }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);

    let body: Value = response.json();
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_login_unknown_user() {
    let app = spawn_app().await;

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({
            "username": "nobody",
            "password": "password123"
        }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_inactive_user() {
    let app = spawn_app().await;
    create_user(&app.db, "sleepy", "password123", Role::Editor).await;

    let repo = pleer::UserRepository::new(app.db.pool());
    let user = repo.get_by_username("sleepy").await.unwrap().unwrap();
    repo.set_active(user.id, false).await.unwrap();

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({
            "username": "sleepy",
            "password": "password123"
        }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

// ============================================================================
// Token Tests
// ============================================================================

#[tokio::test]
async fn test_me_with_token() {
    let app = spawn_app().await;
    let token = admin_token(&app.server).await;

    let response = app
        .server
        .get("/api/auth/me")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;

    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["data"]["username"], ADMIN_USERNAME);
    assert_eq!(body["data"]["role"], "admin");
}

#[tokio::test]
async fn test_me_without_token() {
    let app = spawn_app().await;

    let response = app.server.get("/api/auth/me").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_with_invalid_token() {
    let app = spawn_app().await;

    let response = app
        .server
        .get("/api/auth/me")
        .add_header(AUTHORIZATION, "Bearer invalid-token")
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_rotates_token() {
    let app = spawn_app().await;
    let login = login_user(&app.server, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let refresh_token = login["data"]["refresh_token"].as_str().unwrap().to_string();

    let response = app
        .server
        .post("/api/auth/refresh")
        .json(&json!({ "refresh_token": refresh_token }))
        .await;

    response.assert_status_ok();

    let body: Value = response.json();
    assert!(body["data"]["access_token"].is_string());
    assert_ne!(body["data"]["refresh_token"], refresh_token);

    // The old refresh token is spent
    let response = app
        .server
        .post("/api/auth/refresh")
        .json(&json!({ "refresh_token": refresh_token }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    let app = spawn_app().await;
    let login = login_user(&app.server, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let refresh_token = login["data"]["refresh_token"].as_str().unwrap().to_string();

    app.server
        .post("/api/auth/logout")
        .json(&json!({ "refresh_token": refresh_token }))
        .await
        .assert_status_ok();

    let response = app
        .server
        .post("/api/auth/refresh")
        .json(&json!({ "refresh_token": refresh_token }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Route Gating Tests
// ============================================================================

#[tokio::test]
async fn test_mutations_require_token() {
    let app = spawn_app().await;

    app.server
        .post("/create-directory")
        .json(&json!({ "directoryName": "facts" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    app.server
        .delete("/delete-directory/facts")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    app.server
        .delete("/delete/1.mp3")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    app.server
        .post("/move-file")
        .json(&json!({ "filename": "1.mp3", "targetDirectory": "facts" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let response = upload(&app.server, "invalid-token", None, vec![("a.mp3", b"abc".to_vec())]).await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    assert!(!app.uploads.join("facts").exists());
}

#[tokio::test]
async fn test_reads_are_public() {
    let app = spawn_app().await;

    app.server.get("/directories").await.assert_status_ok();
    app.server.get("/files").await.assert_status_ok();
    app.server.get("/health").await.assert_status_ok();
}

#[tokio::test]
async fn test_viewer_cannot_mutate() {
    let app = spawn_app().await;
    create_user(&app.db, "listener", "password123", Role::Viewer).await;

    let login = login_user(&app.server, "listener", "password123").await;
    let token = login["data"]["access_token"].as_str().unwrap().to_string();

    let response = app
        .server
        .post("/create-directory")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "directoryName": "facts" }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);

    let body: Value = response.json();
    assert_eq!(body["code"], "FORBIDDEN");
    assert!(!app.uploads.join("facts").exists());
}

#[tokio::test]
async fn test_editor_can_mutate() {
    let app = spawn_app().await;
    create_user(&app.db, "curator", "password123", Role::Editor).await;

    let login = login_user(&app.server, "curator", "password123").await;
    let token = login["data"]["access_token"].as_str().unwrap().to_string();

    app.server
        .post("/create-directory")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "directoryName": "facts" }))
        .await
        .assert_status(StatusCode::CREATED);

    assert!(app.uploads.join("facts").is_dir());
}
