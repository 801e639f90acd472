//! Audio file handlers.

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Request, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::store::UploadBatch;
use crate::web::dto::{
    MessageResponse, MoveFileRequest, MoveFileResponse, UploadResponse, UploadedFileInfo,
};
use crate::web::error::{ApiError, ErrorBody, ErrorCode};
use crate::web::handlers::AppState;
use crate::web::middleware::EditorUser;
use crate::PleerError;

/// Multipart field carrying audio files.
pub const AUDIO_FIELD: &str = "audio";

/// Multipart field carrying the target directory.
pub const DIRECTORY_FIELD: &str = "directory";

fn multipart_error(state: &AppState, err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        let max_mb = state.library.limits().max_file_size / (1024 * 1024);
        return ApiError::bad_request(format!("File too large (max {max_mb}MB)"));
    }
    tracing::debug!("Failed to read multipart data: {}", err);
    ApiError::bad_request("Invalid multipart data")
}

async fn read_upload(
    state: &AppState,
    batch: &mut UploadBatch,
    multipart: &mut Multipart,
) -> Result<(), ApiError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(state, e))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            AUDIO_FIELD => {
                // Empty file inputs still send a part, without a file name
                let Some(file_name) = field.file_name().map(str::to_string) else {
                    continue;
                };
                if file_name.is_empty() {
                    continue;
                }
                let content_type = field.content_type().map(str::to_string);
                batch.begin_file(&file_name, content_type.as_deref()).await?;

                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| multipart_error(state, e))?
                {
                    batch.write(&chunk).await?;
                }
            }
            DIRECTORY_FIELD => {
                let directory = field.text().await.map_err(|e| multipart_error(state, e))?;
                batch.set_directory(&directory)?;
            }
            _ => {}
        }
    }

    Ok(())
}

/// POST /upload - Upload one or more audio files.
///
/// Request body: multipart/form-data with one or more `audio` file parts
/// and an optional `directory` field.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "files",
    responses(
        (status = 200, description = "Files stored", body = UploadResponse),
        (status = 400, description = "No file, too large, too many or not audio", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload(
    State(state): State<Arc<AppState>>,
    EditorUser(claims): EditorUser,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut batch = state.library.begin_upload();
    if let Err(e) = read_upload(&state, &mut batch, &mut multipart).await {
        batch.abort().await;
        return Err(e);
    }

    let uploaded = state.library.finish_upload(batch, Some(claims.sub)).await?;
    tracing::info!(
        user = %claims.username,
        count = uploaded.len(),
        "Upload complete"
    );

    let base = state.base_url(&headers);
    let uploaded_files: Vec<UploadedFileInfo> = uploaded
        .into_iter()
        .map(|file| UploadedFileInfo {
            url: state.file_url(&base, &file.path),
            path: file.path.identifier(),
            original_name: file.original_name,
            size: file.size,
            mime_type: file.mime_type,
        })
        .collect();
    let audio_url = uploaded_files
        .first()
        .map(|f| f.url.clone())
        .unwrap_or_default();

    Ok(Json(UploadResponse {
        audio_url,
        uploaded_files,
    }))
}

/// GET /files - List every file identifier in the library.
#[utoipa::path(
    get,
    path = "/files",
    tag = "files",
    responses(
        (status = 200, description = "Directory-qualified file identifiers", body = Vec<String>)
    )
)]
pub async fn list_files(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.library.list_files(None).await?))
}

/// DELETE /delete/*identifier - Delete a file.
#[utoipa::path(
    delete,
    path = "/delete/{identifier}",
    tag = "files",
    params(
        ("identifier" = String, Path, description = "File identifier, optionally directory-qualified")
    ),
    responses(
        (status = 200, description = "File deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 404, description = "File not found", body = ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    EditorUser(claims): EditorUser,
    Path(identifier): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let path = state.library.delete_file(&identifier).await?;
    tracing::info!(user = %claims.username, file = %path, "File deleted");

    Ok(Json(MessageResponse::new("File deleted successfully")))
}

/// POST /move-file - Move a file between directories.
#[utoipa::path(
    post,
    path = "/move-file",
    tag = "files",
    request_body = MoveFileRequest,
    responses(
        (status = 200, description = "File moved", body = MoveFileResponse),
        (status = 400, description = "Invalid names", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 404, description = "Source file not found", body = ErrorBody),
        (status = 409, description = "Destination already exists", body = ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn move_file(
    State(state): State<Arc<AppState>>,
    EditorUser(claims): EditorUser,
    Json(req): Json<MoveFileRequest>,
) -> Result<Json<MoveFileResponse>, ApiError> {
    if req.filename.trim().is_empty() {
        return Err(ApiError::bad_request("Filename is required"));
    }

    let path = state
        .library
        .move_file(
            req.filename.trim(),
            req.source_directory.as_deref(),
            req.target_directory.as_deref(),
        )
        .await?;
    tracing::info!(user = %claims.username, file = %path, "File moved");

    Ok(Json(MoveFileResponse {
        message: "File moved successfully".to_string(),
        path: path.identifier(),
    }))
}

/// GET /uploads/*identifier - Stream a file's bytes.
///
/// Range requests are honored so players can seek.
#[utoipa::path(
    get,
    path = "/uploads/{identifier}",
    tag = "files",
    params(
        ("identifier" = String, Path, description = "Directory-qualified file identifier")
    ),
    responses(
        (status = 200, description = "File content"),
        (status = 206, description = "Partial file content"),
        (status = 404, description = "File not found", body = ErrorBody)
    )
)]
pub async fn serve_file(
    State(state): State<Arc<AppState>>,
    Path(identifier): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    let file_path = state
        .library
        .resolve(&identifier)
        .await
        .map_err(|e| match e {
            PleerError::Validation(_) | PleerError::NotFound(_) => {
                ApiError::new(ErrorCode::NotFound, "File not found")
            }
            other => other.into(),
        })?;

    match ServeFile::new(file_path).oneshot(request).await {
        Ok(response) => Ok(response.into_response()),
        Err(never) => match never {},
    }
}
