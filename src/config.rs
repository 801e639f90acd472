//! Configuration module for PLEER.

use serde::Deserialize;
use std::path::Path;

use crate::{PleerError, Result};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Environment name (development / production).
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_environment() -> String {
    "development".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
        }
    }
}

impl ServerConfig {
    /// Whether the server runs in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/pleer.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Audio storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the uploads root.
    #[serde(default = "default_uploads_path")]
    pub uploads_path: String,
    /// Maximum size of a single uploaded file in megabytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size_mb: u64,
    /// Maximum number of files in one upload request.
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    /// Only accept `audio/*` uploads.
    #[serde(default = "default_audio_only")]
    pub audio_only: bool,
}

fn default_uploads_path() -> String {
    "uploads".to_string()
}

fn default_max_file_size() -> u64 {
    50
}

fn default_max_files() -> usize {
    100
}

fn default_audio_only() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_path: default_uploads_path(),
            max_file_size_mb: default_max_file_size(),
            max_files: default_max_files(),
            audio_only: default_audio_only(),
        }
    }
}

/// Largest accepted `storage.max_file_size_mb`.
pub const MAX_FILE_SIZE_LIMIT_MB: u64 = 4096;

impl StorageConfig {
    /// Maximum size of a single file in bytes.
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/server.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Web API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// JWT secret key (required).
    #[serde(default)]
    pub jwt_secret: String,
    /// Access token expiry in seconds.
    #[serde(default = "default_jwt_access_expiry")]
    pub jwt_access_token_expiry_secs: u64,
    /// Refresh token expiry in days.
    #[serde(default = "default_jwt_refresh_expiry")]
    pub jwt_refresh_token_expiry_days: u64,
    /// Whether to serve the client application shell.
    #[serde(default)]
    pub serve_static: bool,
    /// Path to the client build directory.
    #[serde(default = "default_static_path")]
    pub static_path: String,
    /// Public base URL used when building file URLs (derived from Host if unset).
    #[serde(default)]
    pub public_url: Option<String>,
    /// Rate limit for login endpoint (requests per minute).
    #[serde(default = "default_login_rate_limit")]
    pub login_rate_limit: u32,
}

fn default_jwt_access_expiry() -> u64 {
    900 // 15 minutes
}

fn default_jwt_refresh_expiry() -> u64 {
    7 // 7 days
}

fn default_static_path() -> String {
    "client/build".to_string()
}

fn default_login_rate_limit() -> u32 {
    5 // 5 requests per minute
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            cors_origins: vec![],
            jwt_secret: String::new(),
            jwt_access_token_expiry_secs: default_jwt_access_expiry(),
            jwt_refresh_token_expiry_days: default_jwt_refresh_expiry(),
            serve_static: false,
            static_path: default_static_path(),
            public_url: None,
            login_rate_limit: default_login_rate_limit(),
        }
    }
}

/// Administrator bootstrap configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthConfig {
    /// Username of the administrator account created on startup.
    #[serde(default)]
    pub admin_username: Option<String>,
    /// Password of the administrator account created on startup.
    #[serde(default)]
    pub admin_password: Option<String>,
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Audio storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Web API configuration.
    #[serde(default)]
    pub web: WebConfig,
    /// Administrator bootstrap.
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(PleerError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| PleerError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `PORT`: listen port
    /// - `PLEER_ENV`: environment name
    /// - `PLEER_JWT_SECRET`: JWT secret key
    /// - `PLEER_ADMIN_PASSWORD`: administrator password
    /// - `PLEER_UPLOADS_DIR`: uploads root
    pub fn apply_env_overrides(&mut self) {
        if let Some(port) = env_value("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(environment) = env_value("PLEER_ENV") {
            self.server.environment = environment;
        }
        if let Some(jwt_secret) = env_value("PLEER_JWT_SECRET") {
            self.web.jwt_secret = jwt_secret;
        }
        if let Some(password) = env_value("PLEER_ADMIN_PASSWORD") {
            self.auth.admin_password = Some(password);
        }
        if let Some(uploads) = env_value("PLEER_UPLOADS_DIR") {
            self.storage.uploads_path = uploads;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.web.jwt_secret.is_empty() {
            return Err(PleerError::Config(
                "jwt_secret is not set. \
                 Set it in config.toml or via PLEER_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }
        if self.storage.max_file_size_mb == 0
            || self.storage.max_file_size_mb > MAX_FILE_SIZE_LIMIT_MB
        {
            return Err(PleerError::Config(format!(
                "storage.max_file_size_mb must be between 1 and {}",
                MAX_FILE_SIZE_LIMIT_MB
            )));
        }
        if self.storage.max_files == 0 {
            return Err(PleerError::Config(
                "storage.max_files must be greater than 0".to_string(),
            ));
        }
        if self.auth.admin_username.is_some() != self.auth.admin_password.is_some() {
            return Err(PleerError::Config(
                "auth.admin_username and auth.admin_password must be set together".to_string(),
            ));
        }
        Ok(())
    }
}

/// Read a non-empty environment variable.
fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
