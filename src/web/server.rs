//! Web server for PLEER.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::{
    predicate::{DefaultPredicate, NotForContentType, Predicate},
    CompressionLayer,
};

use crate::config::Config;
use crate::db::RefreshTokenRepository;
use crate::store::AudioLibrary;
use crate::{PleerError, Result};

use super::handlers::{AppState, SharedDatabase};
use super::middleware::{JwtState, RateLimitState};
use super::router::{
    create_health_router, create_router, create_static_router, create_swagger_router,
    not_found_fallback,
};

/// Token cleanup interval.
const CLEANUP_INTERVAL_SECS: u64 = 3600;

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// JWT state.
    jwt_state: Arc<JwtState>,
    /// Login rate limiting state.
    rate_limit_state: Arc<RateLimitState>,
    /// Allowed CORS origins.
    cors_origins: Vec<String>,
    /// Client build directory, when served.
    static_path: Option<String>,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &Config, db: SharedDatabase, library: AudioLibrary) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| PleerError::Config(format!("invalid server address: {e}")))?;

        let web = &config.web;
        let app_state = AppState::new(
            db,
            library,
            &web.jwt_secret,
            web.jwt_access_token_expiry_secs,
            web.jwt_refresh_token_expiry_days,
        )
        .with_public_url(web.public_url.clone());

        Ok(Self {
            addr,
            app_state: Arc::new(app_state),
            jwt_state: Arc::new(JwtState::new(&web.jwt_secret)),
            rate_limit_state: Arc::new(RateLimitState::new(web.login_rate_limit)),
            cors_origins: web.cors_origins.clone(),
            static_path: web.serve_static.then(|| web.static_path.clone()),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Build the complete application router.
    pub fn router(&self) -> Router {
        let mut router = create_router(
            self.app_state.clone(),
            self.jwt_state.clone(),
            self.rate_limit_state.clone(),
            &self.cors_origins,
        )
        .merge(create_health_router())
        .merge(create_swagger_router());

        router = match self
            .static_path
            .as_deref()
            .and_then(create_static_router)
        {
            Some(static_router) => router.merge(static_router),
            None => router.fallback(not_found_fallback),
        };

        // Audio is already compressed and must keep byte ranges intact.
        let predicate = DefaultPredicate::new().and(NotForContentType::new("audio/"));
        router.layer(CompressionLayer::new().compress_when(predicate))
    }

    /// Start the token cleanup background task.
    ///
    /// Runs every hour and removes expired and revoked refresh tokens.
    fn start_token_cleanup_task(db: SharedDatabase) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(CLEANUP_INTERVAL_SECS));

            // Skip the first immediate tick
            interval.tick().await;

            loop {
                interval.tick().await;

                let refresh_repo = RefreshTokenRepository::new(db.pool());
                match refresh_repo.cleanup_expired().await {
                    Ok(count) if count > 0 => {
                        tracing::info!(
                            deleted_count = count,
                            "Cleaned up expired/revoked refresh tokens"
                        );
                    }
                    Ok(_) => tracing::debug!("No expired refresh tokens to clean up"),
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to cleanup refresh tokens");
                    }
                }
            }
        });
    }

    async fn bind(&self) -> std::io::Result<(TcpListener, SocketAddr)> {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        Self::start_token_cleanup_task(self.app_state.db.clone());
        self.rate_limit_state.clone().start_cleanup_task();
        tracing::info!("Token cleanup task started (runs every hour)");

        Ok((listener, local_addr))
    }

    /// Run the web server until Ctrl-C.
    pub async fn run(self) -> std::io::Result<()> {
        let router = self.router();
        let (listener, local_addr) = self.bind().await?;
        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
    }

    /// Run the server in the background and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> std::io::Result<SocketAddr> {
        let router = self.router();
        let (listener, local_addr) = self.bind().await?;
        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
