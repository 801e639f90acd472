//! OpenAPI documentation for the PLEER API.

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use super::dto::{
    CreateDirectoryRequest, LoginRequest, LoginResponse, LogoutRequest, MessageResponse,
    MoveFileRequest, MoveFileResponse, RefreshRequest, RefreshResponse, TrackResponse,
    UploadResponse, UploadedFileInfo, UserInfo,
};
use super::error::{ErrorBody, ErrorCode};
use super::handlers;

/// OpenAPI documentation structure.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "PLEER API",
        description = "Audio file hosting: upload, browse and play back audio files"
    ),
    tags(
        (name = "auth", description = "Authentication"),
        (name = "directories", description = "Directory management"),
        (name = "files", description = "Upload, listing, deletion, moving and serving"),
        (name = "playback", description = "Random track selection"),
    ),
    paths(
        handlers::login,
        handlers::logout,
        handlers::refresh,
        handlers::me,
        handlers::create_directory,
        handlers::delete_directory,
        handlers::list_directories,
        handlers::list_directory_files,
        handlers::upload,
        handlers::list_files,
        handlers::delete_file,
        handlers::move_file,
        handlers::serve_file,
        handlers::random_audio,
        handlers::audio_info,
    ),
    components(schemas(
        ErrorBody,
        ErrorCode,
        LoginRequest,
        LoginResponse,
        LogoutRequest,
        RefreshRequest,
        RefreshResponse,
        UserInfo,
        MessageResponse,
        CreateDirectoryRequest,
        MoveFileRequest,
        MoveFileResponse,
        UploadResponse,
        UploadedFileInfo,
        TrackResponse,
    )),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the bearer token scheme used by protected routes.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
