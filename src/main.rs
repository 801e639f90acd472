use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};

use pleer::store::AudioLibrary;
use pleer::web::WebServer;
use pleer::{Config, Database};

/// Config file used when `PLEER_CONFIG` is not set.
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() {
    let config_path = std::env::var("PLEER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", config_path.display());
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    match pleer::logging::init(&config.logging, &config.server.environment) {
        Ok(path) => {
            info!("PLEER - audio file hosting service");
            info!("Logging to {}", path.display());
        }
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            pleer::logging::init_console_only(&config.logging.level);
            info!("PLEER - audio file hosting service");
        }
    }

    if let Err(e) = run(config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> pleer::Result<()> {
    config.validate()?;

    let db = Arc::new(Database::open(&config.database.path).await?);
    if pleer::auth::ensure_admin(&db, &config.auth).await? {
        info!("Administrator account bootstrapped from configuration");
    }

    let library = AudioLibrary::open(&config.storage, db.clone()).await?;

    info!(
        "Server configured on {}:{} ({})",
        config.server.host, config.server.port, config.server.environment
    );

    let server = WebServer::new(&config, db, library)?;
    server.run().await?;

    info!("Server stopped");
    Ok(())
}
