//! Router configuration for the web API.

use axum::{
    extract::DefaultBodyLimit,
    http::Uri,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use std::any::Any;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::error::ApiError;
use super::handlers::{
    audio_info, create_directory, delete_directory, delete_file, list_directories,
    list_directory_files, list_files, login, logout, me, move_file, random_audio, refresh,
    serve_file, upload, AppState,
};
use super::middleware::{
    create_cors_layer, jwt_auth, login_rate_limit, security_headers, JwtState, RateLimitState,
};
use super::openapi::ApiDoc;

/// Multipart framing allowance on top of the file bytes.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Create the main API router.
pub fn create_router(
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    rate_limit_state: Arc<RateLimitState>,
    cors_origins: &[String],
) -> Router {
    let limits = app_state.library.limits();
    let upload_body_limit = (limits.max_file_size as usize)
        .saturating_mul(limits.max_files)
        .saturating_add(MULTIPART_OVERHEAD);

    let login_route = post(login).layer(middleware::from_fn(move |req, next| {
        let state = rate_limit_state.clone();
        login_rate_limit(state, req, next)
    }));

    let auth_routes = Router::new()
        .route("/login", login_route)
        .route("/logout", post(logout))
        .route("/refresh", post(refresh))
        .route("/me", get(me));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .route("/random-audio/:directory", get(random_audio))
        .route("/audio-info/:directory", get(audio_info));

    let store_routes = Router::new()
        .route(
            "/upload",
            post(upload).layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route("/create-directory", post(create_directory))
        .route("/delete-directory/:directoryName", delete(delete_directory))
        .route("/directories", get(list_directories))
        .route("/directories/:directoryName/files", get(list_directory_files))
        .route("/files", get(list_files))
        .route("/delete/*identifier", delete(delete_file))
        .route("/move-file", post(move_file))
        .route("/uploads/*identifier", get(serve_file));

    let jwt_state_for_middleware = jwt_state.clone();

    Router::new()
        .merge(store_routes)
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::custom(panic_response))
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(security_headers))
                .layer(middleware::from_fn(move |req, next| {
                    let state = jwt_state_for_middleware.clone();
                    jwt_auth(state, req, next)
                })),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

/// Create the Swagger UI router.
pub fn create_swagger_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

/// Create a router serving the client build, with `index.html` for any
/// path that is not a file (client-side routes such as `/play/...`).
///
/// Returns `None` when the directory doesn't exist.
pub fn create_static_router(static_path: &str) -> Option<Router> {
    let root = Path::new(static_path);
    if !root.is_dir() {
        tracing::warn!("Static path {:?} not found; client will not be served", root);
        return None;
    }

    let index = root.join("index.html");
    let serve_dir = ServeDir::new(root).fallback(ServeFile::new(index));
    Some(Router::new().fallback_service(serve_dir))
}

/// JSON 500 for a handler that panicked.
fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("Request handler panicked");
    ApiError::internal("An internal error occurred").into_response()
}

/// JSON 404 for unmatched routes when no client build is served.
pub async fn not_found_fallback(uri: Uri) -> ApiError {
    tracing::debug!("No route for {}", uri);
    ApiError::not_found("Route not found")
}
