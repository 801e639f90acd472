//! HTTP client for the PLEER REST API.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{ClientError, UNKNOWN_ERROR};
use crate::web::dto::{
    ApiResponse, CreateDirectoryRequest, LoginRequest, LoginResponse, LogoutRequest,
    MessageResponse, MoveFileRequest, MoveFileResponse, RefreshRequest, RefreshResponse,
    TrackResponse, UploadResponse, UserInfo,
};
use crate::web::handlers::{AUDIO_FIELD, DIRECTORY_FIELD};

/// Connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Total timeout in seconds. Uploads of large batches need the headroom.
const TOTAL_TIMEOUT_SECS: u64 = 300;

/// User agent string.
const USER_AGENT: &str = concat!("pleer-client/", env!("CARGO_PKG_VERSION"));

type Result<T> = std::result::Result<T, ClientError>;

/// Error body returned by the server.
#[derive(Debug, Default, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    error: Option<String>,
}

/// Client for the PLEER REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
    token: Option<String>,
}

impl ApiClient {
    /// Create a client for the server at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(TOTAL_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            http,
            base,
            token: None,
        })
    }

    /// Use the given access token for authenticated requests.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Replace the access token.
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// Current access token.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Server base URL.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Sign in and keep the returned access token.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<LoginResponse> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response: ApiResponse<LoginResponse> = self
            .send(self.request(Method::POST, "api/auth/login")?.json(&body))
            .await?;

        self.token = Some(response.data.access_token.clone());
        Ok(response.data)
    }

    /// Rotate the refresh token and keep the new access token.
    pub async fn refresh(&mut self, refresh_token: &str) -> Result<RefreshResponse> {
        let body = RefreshRequest {
            refresh_token: refresh_token.to_string(),
        };
        let response: ApiResponse<RefreshResponse> = self
            .send(self.request(Method::POST, "api/auth/refresh")?.json(&body))
            .await?;

        self.token = Some(response.data.access_token.clone());
        Ok(response.data)
    }

    /// Revoke a refresh token.
    pub async fn logout(&self, refresh_token: &str) -> Result<MessageResponse> {
        let body = LogoutRequest {
            refresh_token: refresh_token.to_string(),
        };
        let response: ApiResponse<MessageResponse> = self
            .send(self.request(Method::POST, "api/auth/logout")?.json(&body))
            .await?;
        Ok(response.data)
    }

    /// Current user.
    pub async fn me(&self) -> Result<UserInfo> {
        let response: ApiResponse<UserInfo> =
            self.send(self.request(Method::GET, "api/auth/me")?).await?;
        Ok(response.data)
    }

    /// List directory names.
    pub async fn list_directories(&self) -> Result<Vec<String>> {
        self.send(self.request(Method::GET, "directories")?).await
    }

    /// List file identifiers, either all of them or those of one directory.
    pub async fn list_files(&self, directory: Option<&str>) -> Result<Vec<String>> {
        let path = match directory {
            Some(dir) => format!("directories/{}/files", urlencoding::encode(dir)),
            None => "files".to_string(),
        };
        self.send(self.request(Method::GET, &path)?).await
    }

    /// Create a directory.
    pub async fn create_directory(&self, name: &str) -> Result<MessageResponse> {
        let body = CreateDirectoryRequest {
            directory_name: name.to_string(),
        };
        self.send(self.request(Method::POST, "create-directory")?.json(&body))
            .await
    }

    /// Delete a directory and everything in it.
    pub async fn delete_directory(&self, name: &str) -> Result<MessageResponse> {
        let path = format!("delete-directory/{}", urlencoding::encode(name));
        self.send(self.request(Method::DELETE, &path)?).await
    }

    /// Upload local files, into `directory` or the uploads root.
    pub async fn upload<P: AsRef<Path>>(
        &self,
        files: &[P],
        directory: Option<&str>,
    ) -> Result<UploadResponse> {
        let mut form = Form::new();
        if let Some(dir) = directory.filter(|d| !d.is_empty()) {
            form = form.text(DIRECTORY_FIELD, dir.to_string());
        }

        for file in files {
            let path = file.as_ref();
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| ClientError::Input(format!("Not a file: {}", path.display())))?;
            let data = tokio::fs::read(path).await?;
            let mime = mime_guess::from_path(path).first_or_octet_stream();

            debug!("Uploading {} ({} bytes, {})", file_name, data.len(), mime);
            let part = Part::bytes(data)
                .file_name(file_name)
                .mime_str(mime.as_ref())?;
            form = form.part(AUDIO_FIELD, part);
        }

        self.send(self.request(Method::POST, "upload")?.multipart(form))
            .await
    }

    /// Delete a file by identifier (`name` or `directory/name`).
    pub async fn delete_file(&self, identifier: &str) -> Result<MessageResponse> {
        let path = format!("delete/{}", encode_identifier(identifier));
        self.send(self.request(Method::DELETE, &path)?).await
    }

    /// Move a file between directories. `None` means the uploads root.
    pub async fn move_file(
        &self,
        filename: &str,
        source_directory: Option<&str>,
        target_directory: Option<&str>,
    ) -> Result<MoveFileResponse> {
        let body = MoveFileRequest {
            filename: filename.to_string(),
            source_directory: source_directory.map(str::to_string),
            target_directory: target_directory.map(str::to_string),
        };
        self.send(self.request(Method::POST, "move-file")?.json(&body))
            .await
    }

    /// Pick a random track from a directory.
    pub async fn random_audio(&self, directory: &str) -> Result<TrackResponse> {
        let path = format!("api/random-audio/{}", urlencoding::encode(directory));
        self.send(self.request(Method::GET, &path)?).await
    }

    /// Download the bytes of a file.
    pub async fn download(&self, identifier: &str) -> Result<Vec<u8>> {
        let path = format!("uploads/{}", encode_identifier(identifier));
        let response = self.request(Method::GET, &path)?.send().await?;
        let response = check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// URL serving a file.
    pub fn file_url(&self, identifier: &str) -> Result<Url> {
        self.endpoint(&format!("uploads/{}", encode_identifier(identifier)))
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.endpoint(path)?;
        let builder = self.http.request(method, url);
        Ok(match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = check_status(builder.send().await?).await?;
        Ok(response.json().await?)
    }
}

/// Percent-encode each segment of an identifier, keeping the `/` separator.
fn encode_identifier(identifier: &str) -> String {
    identifier
        .trim_start_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Turn a non-2xx response into [`ClientError::Api`].
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let payload: ErrorPayload = response.json().await.unwrap_or_default();
    let message = payload
        .error
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| UNKNOWN_ERROR.to_string());

    debug!("Request failed with {}: {}", status, message);
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}
