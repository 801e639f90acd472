//! Administrator account bootstrap.

use tracing::info;

use super::password::hash_password;
use crate::config::AuthConfig;
use crate::db::{NewUser, Role, UserRepository};
use crate::{Database, PleerError, Result};

/// Create the configured administrator if it does not exist yet.
///
/// Returns `true` when an account was created. An existing account is left
/// untouched, including its password.
pub async fn ensure_admin(db: &Database, config: &AuthConfig) -> Result<bool> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) else {
        return Ok(false);
    };

    let repo = UserRepository::new(db.pool());
    if repo.get_by_username(username).await?.is_some() {
        return Ok(false);
    }

    let hash = hash_password(password)
        .map_err(|e| PleerError::Config(format!("admin password: {e}")))?;
    repo.create(&NewUser::new(username.as_str(), hash).with_role(Role::Admin))
        .await?;
    info!("Created administrator account {}", username);

    Ok(true)
}
