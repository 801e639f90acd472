//! Request DTOs for the web API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Login request.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

/// Logout request.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LogoutRequest {
    /// Refresh token to invalidate.
    pub refresh_token: String,
}

/// Token refresh request.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
    /// Refresh token.
    pub refresh_token: String,
}

/// Directory creation request.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDirectoryRequest {
    /// Name of the directory to create.
    #[serde(default)]
    pub directory_name: String,
}

/// File move request.
///
/// Missing or empty directories mean the uploads root.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MoveFileRequest {
    /// Stored file name, optionally directory-qualified.
    #[serde(default)]
    pub filename: String,
    /// Directory the file is in.
    #[serde(default)]
    pub source_directory: Option<String>,
    /// Directory to move the file to.
    #[serde(default)]
    pub target_directory: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_directory_request_camel_case() {
        let req: CreateDirectoryRequest =
            serde_json::from_str(r#"{"directoryName":"facts"}"#).unwrap();
        assert_eq!(req.directory_name, "facts");

        let req: CreateDirectoryRequest = serde_json::from_str("{}").unwrap();
        assert!(req.directory_name.is_empty());
    }

    #[test]
    fn test_move_file_request_optional_directories() {
        let req: MoveFileRequest = serde_json::from_str(
            r#"{"filename":"1.mp3","sourceDirectory":null,"targetDirectory":"facts"}"#,
        )
        .unwrap();
        assert_eq!(req.filename, "1.mp3");
        assert!(req.source_directory.is_none());
        assert_eq!(req.target_directory.as_deref(), Some("facts"));
    }
}
