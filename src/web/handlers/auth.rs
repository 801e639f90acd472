//! Authentication handlers and shared application state.

use axum::{extract::State, http::HeaderMap, Json};
use jsonwebtoken::{encode, EncodingKey, Header};
use std::sync::Arc;

use crate::db::{NewRefreshToken, RefreshTokenRepository, Role, User, UserRepository};
use crate::store::{AudioLibrary, FilePath};
use crate::web::dto::{
    ApiResponse, LoginRequest, LoginResponse, LogoutRequest, MessageResponse, RefreshRequest,
    RefreshResponse, UserInfo,
};
use crate::web::error::{ApiError, ErrorBody};
use crate::web::middleware::{AuthUser, JwtClaims};
use crate::Database;

/// Database shared across handlers.
pub type SharedDatabase = Arc<Database>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database (users, tokens, audio metadata).
    pub db: SharedDatabase,
    /// Audio library.
    pub library: AudioLibrary,
    /// JWT encoding key.
    pub encoding_key: EncodingKey,
    /// Access token expiry in seconds.
    pub access_token_expiry: u64,
    /// Refresh token expiry in days.
    pub refresh_token_expiry: u64,
    /// Public base URL used in returned links.
    pub public_url: Option<String>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        db: SharedDatabase,
        library: AudioLibrary,
        jwt_secret: &str,
        access_expiry: u64,
        refresh_expiry: u64,
    ) -> Self {
        Self {
            db,
            library,
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            access_token_expiry: access_expiry,
            refresh_token_expiry: refresh_expiry,
            public_url: None,
        }
    }

    /// Set the public base URL.
    pub fn with_public_url(mut self, public_url: Option<String>) -> Self {
        self.public_url = public_url
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        self
    }

    /// Base URL for links in responses.
    ///
    /// The configured public URL wins; otherwise the request's `Host` header
    /// is used. Without either, links are root-relative.
    pub fn base_url(&self, headers: &HeaderMap) -> String {
        if let Some(url) = &self.public_url {
            return url.clone();
        }
        headers
            .get(axum::http::header::HOST)
            .and_then(|h| h.to_str().ok())
            .map(|host| format!("http://{host}"))
            .unwrap_or_default()
    }

    /// URL serving a stored file.
    pub fn file_url(&self, base: &str, path: &FilePath) -> String {
        let encoded = match path.directory() {
            Some(dir) => format!(
                "{}/{}",
                urlencoding::encode(dir),
                urlencoding::encode(path.name())
            ),
            None => urlencoding::encode(path.name()).into_owned(),
        };
        format!("{base}/uploads/{encoded}")
    }

    /// Generate an access token for a user.
    pub fn generate_access_token(&self, user_id: i64, username: &str, role: Role) -> Result<String, ApiError> {
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = JwtClaims {
            sub: user_id,
            username: username.to_string(),
            role: role.to_string(),
            iat: now,
            exp: now + self.access_token_expiry,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode JWT: {}", e);
            ApiError::internal("Failed to generate token")
        })
    }

    /// Generate a refresh token.
    pub fn generate_refresh_token(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Persist a fresh refresh token for a user.
    async fn issue_refresh_token(&self, user_id: i64) -> Result<String, ApiError> {
        let token = self.generate_refresh_token();
        let expires_at =
            chrono::Utc::now() + chrono::Duration::days(self.refresh_token_expiry as i64);
        let new_token = NewRefreshToken {
            user_id,
            token: token.clone(),
            expires_at: expires_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        };

        RefreshTokenRepository::new(self.db.pool())
            .create(&new_token)
            .await
            .map_err(|e| {
                tracing::error!("Failed to store refresh token: {}", e);
                ApiError::internal("Failed to create session")
            })?;

        Ok(token)
    }
}

fn user_info(user: &User) -> UserInfo {
    UserInfo {
        id: user.id,
        username: user.username.clone(),
        role: user.role.to_string(),
    }
}

/// POST /api/auth/login - User login.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
        (status = 403, description = "Account disabled", body = ErrorBody),
        (status = 429, description = "Too many login attempts", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Username and password are required"));
    }

    let repo = UserRepository::new(state.db.pool());
    let user = repo
        .get_by_username(&req.username)
        .await
        .map_err(|e| {
            tracing::error!("Failed to look up user: {}", e);
            ApiError::internal("Database error")
        })?
        .ok_or_else(|| ApiError::unauthorized("Invalid username or password"))?;

    crate::auth::verify_password(&req.password, &user.password)
        .map_err(|_| ApiError::unauthorized("Invalid username or password"))?;

    if !user.is_active {
        return Err(ApiError::forbidden("Account is disabled"));
    }

    let access_token = state.generate_access_token(user.id, &user.username, user.role)?;
    let refresh_token = state.issue_refresh_token(user.id).await?;

    if let Err(e) = repo.update_last_login(user.id).await {
        tracing::warn!("Failed to update last login: {}", e);
    }
    tracing::info!(user = %user.username, "User logged in");

    let response = LoginResponse {
        access_token,
        refresh_token,
        expires_in: state.access_token_expiry,
        user: user_info(&user),
    };

    Ok(Json(ApiResponse::new(response)))
}

/// POST /api/auth/logout - Revoke a refresh token.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    request_body = LogoutRequest,
    responses(
        (status = 200, description = "Logged out", body = MessageResponse)
    )
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LogoutRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let repo = RefreshTokenRepository::new(state.db.pool());
    if let Err(e) = repo.revoke(&req.refresh_token).await {
        tracing::warn!("Failed to revoke refresh token: {}", e);
    }

    Ok(Json(ApiResponse::new(MessageResponse::new("Logged out"))))
}

/// POST /api/auth/refresh - Rotate the refresh token and issue a new access token.
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New tokens", body = RefreshResponse),
        (status = 401, description = "Invalid or expired refresh token", body = ErrorBody)
    )
)]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<RefreshResponse>>, ApiError> {
    let token_repo = RefreshTokenRepository::new(state.db.pool());
    let token = token_repo
        .get_valid_token(&req.refresh_token)
        .await
        .map_err(|_| ApiError::internal("Database error"))?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired refresh token"))?;

    let user = UserRepository::new(state.db.pool())
        .get_by_id(token.user_id)
        .await
        .map_err(|_| ApiError::internal("Database error"))?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    if !user.is_active {
        return Err(ApiError::forbidden("Account is disabled"));
    }

    // A token that was revoked concurrently must not be rotated twice.
    let revoked = token_repo
        .revoke(&req.refresh_token)
        .await
        .map_err(|_| ApiError::internal("Database error"))?;
    if !revoked {
        return Err(ApiError::unauthorized("Invalid or expired refresh token"));
    }

    let access_token = state.generate_access_token(user.id, &user.username, user.role)?;
    let refresh_token = state.issue_refresh_token(user.id).await?;

    let response = RefreshResponse {
        access_token,
        refresh_token,
        expires_in: state.access_token_expiry,
    };

    Ok(Json(ApiResponse::new(response)))
}

/// GET /api/auth/me - Get current user info.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = UserInfo),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn me(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let user = UserRepository::new(state.db.pool())
        .get_by_id(claims.sub)
        .await
        .map_err(|_| ApiError::internal("Database error"))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ApiResponse::new(user_info(&user))))
}
