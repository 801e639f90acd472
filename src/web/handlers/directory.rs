//! Directory handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::web::dto::{CreateDirectoryRequest, MessageResponse};
use crate::web::error::{ApiError, ErrorBody};
use crate::web::handlers::AppState;
use crate::web::middleware::EditorUser;

/// POST /create-directory - Create a directory under the uploads root.
#[utoipa::path(
    post,
    path = "/create-directory",
    tag = "directories",
    request_body = CreateDirectoryRequest,
    responses(
        (status = 201, description = "Directory created", body = MessageResponse),
        (status = 400, description = "Missing or invalid name", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_directory(
    State(state): State<Arc<AppState>>,
    EditorUser(claims): EditorUser,
    Json(req): Json<CreateDirectoryRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let name = req.directory_name.trim();
    state.library.create_directory(name).await?;
    tracing::info!(user = %claims.username, directory = %name, "Directory created");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Directory created successfully")),
    ))
}

/// DELETE /delete-directory/:directoryName - Delete a directory and its files.
#[utoipa::path(
    delete,
    path = "/delete-directory/{directoryName}",
    tag = "directories",
    params(
        ("directoryName" = String, Path, description = "Directory name")
    ),
    responses(
        (status = 200, description = "Directory deleted", body = MessageResponse),
        (status = 400, description = "Invalid name", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_directory(
    State(state): State<Arc<AppState>>,
    EditorUser(claims): EditorUser,
    Path(name): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let removed = state.library.delete_directory(&name).await?;
    tracing::info!(
        user = %claims.username,
        directory = %name,
        existed = removed,
        "Directory deleted"
    );

    Ok(Json(MessageResponse::new("Directory deleted successfully")))
}

/// GET /directories - List directory names.
#[utoipa::path(
    get,
    path = "/directories",
    tag = "directories",
    responses(
        (status = 200, description = "Directory names", body = Vec<String>)
    )
)]
pub async fn list_directories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.library.list_directories().await?))
}

/// GET /directories/:directoryName/files - List the files of one directory.
#[utoipa::path(
    get,
    path = "/directories/{directoryName}/files",
    tag = "directories",
    params(
        ("directoryName" = String, Path, description = "Directory name")
    ),
    responses(
        (status = 200, description = "Directory-qualified file identifiers", body = Vec<String>),
        (status = 404, description = "Directory not found", body = ErrorBody)
    )
)]
pub async fn list_directory_files(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.library.list_files(Some(&name)).await?))
}
