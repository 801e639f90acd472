//! Test helpers for the web API integration tests.
//!
//! Builds a complete server over a temporary uploads root and an in-memory
//! database, with an administrator bootstrapped from configuration.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use serde_json::{json, Value};
use tempfile::TempDir;

use pleer::auth::{ensure_admin, hash_password};
use pleer::config::Config;
use pleer::db::{NewUser, Role, UserRepository};
use pleer::web::WebServer;
use pleer::{AudioLibrary, Database};

/// JWT secret used by the test servers.
pub const JWT_SECRET: &str = "test-secret-key-for-testing-only";

/// Bootstrapped administrator.
pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-password";

/// Per-file size limit of the test servers, in megabytes.
pub const MAX_FILE_SIZE_MB: u64 = 1;

/// Per-request file limit of the test servers.
pub const MAX_FILES: usize = 3;

/// A running test application.
pub struct TestApp {
    /// In-process server.
    pub server: TestServer,
    /// Shared database.
    pub db: Arc<Database>,
    /// Uploads root on disk.
    pub uploads: PathBuf,
    /// Keeps the temporary directory alive.
    pub temp_dir: TempDir,
}

/// Create a test configuration rooted in `root`.
pub fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.database.path = root.join("pleer.db").to_string_lossy().into_owned();
    config.storage.uploads_path = root.join("uploads").to_string_lossy().into_owned();
    config.storage.max_file_size_mb = MAX_FILE_SIZE_MB;
    config.storage.max_files = MAX_FILES;
    config.web.jwt_secret = JWT_SECRET.to_string();
    config.web.login_rate_limit = 100;
    config.auth.admin_username = Some(ADMIN_USERNAME.to_string());
    config.auth.admin_password = Some(ADMIN_PASSWORD.to_string());
    config
}

/// Build a web server for `config` over the given database.
pub async fn build_web_server(config: &Config, db: Database) -> (WebServer, Arc<Database>) {
    ensure_admin(&db, &config.auth)
        .await
        .expect("Failed to bootstrap admin");

    let db = Arc::new(db);
    let library = AudioLibrary::open(&config.storage, db.clone())
        .await
        .expect("Failed to open audio library");
    let web = WebServer::new(config, db.clone(), library).expect("Failed to create web server");

    (web, db)
}

/// Create a test application with an in-memory database.
pub async fn spawn_app() -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = test_config(temp_dir.path());

    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");
    let (web, db) = build_web_server(&config, db).await;
    let server = TestServer::new(web.router()).expect("Failed to create test server");

    TestApp {
        server,
        db,
        uploads: PathBuf::from(&config.storage.uploads_path),
        temp_dir,
    }
}

/// Create a user directly in the database.
pub async fn create_user(db: &Database, username: &str, password: &str, role: Role) {
    let hash = hash_password(password).expect("Failed to hash password");
    UserRepository::new(db.pool())
        .create(&NewUser::new(username, hash).with_role(role))
        .await
        .expect("Failed to create user");
}

/// Log in and return the full response body.
pub async fn login_user(server: &TestServer, username: &str, password: &str) -> Value {
    server
        .post("/api/auth/login")
        .json(&json!({
            "username": username,
            "password": password
        }))
        .await
        .json::<Value>()
}

/// Log in as the bootstrapped administrator and return the access token.
pub async fn admin_token(server: &TestServer) -> String {
    let body = login_user(server, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    body["data"]["access_token"]
        .as_str()
        .expect("login did not return an access token")
        .to_string()
}

/// Bearer authorization header value.
pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// An `audio` part with the given original name and bytes.
pub fn audio_part(file_name: &str, bytes: impl Into<Vec<u8>>) -> Part {
    Part::bytes(bytes.into())
        .file_name(file_name.to_string())
        .mime_type("audio/mpeg")
}

/// Upload files, optionally into `directory`.
pub async fn upload(
    server: &TestServer,
    token: &str,
    directory: Option<&str>,
    files: Vec<(&str, Vec<u8>)>,
) -> TestResponse {
    let mut form = MultipartForm::new();
    if let Some(dir) = directory {
        form = form.add_text("directory", dir.to_string());
    }
    for (name, bytes) in files {
        form = form.add_part("audio", audio_part(name, bytes));
    }

    server
        .post("/upload")
        .add_header(AUTHORIZATION, bearer(token))
        .multipart(form)
        .await
}

/// Files listed by `GET /files`.
pub async fn list_all_files(server: &TestServer) -> Vec<String> {
    server.get("/files").await.json::<Vec<String>>()
}

/// Count regular files under `dir`, recursively, staging area included.
pub fn count_files_on_disk(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };

    entries
        .filter_map(|e| e.ok())
        .map(|e| {
            let path = e.path();
            if path.is_dir() {
                count_files_on_disk(&path)
            } else {
                1
            }
        })
        .sum()
}
