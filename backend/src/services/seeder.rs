//! Optional first-run admin account seeding.

use tracing::{info, warn};

use crate::auth::service::hash_password;
use crate::config::Config;
use crate::database::models::{Role, User};
use crate::database::{queries, Db};
use crate::errors::ApiResult;

/// Creates the initial admin account when `INIT_ADMIN` is set and the
/// account does not exist yet. Safe to run on every boot.
pub async fn seed_admin(db: &Db, config: &Config) -> ApiResult<()> {
    if !config.init_admin {
        return Ok(());
    }

    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        warn!("INIT_ADMIN is set but ADMIN_EMAIL/ADMIN_PASSWORD are missing, skipping seed");
        return Ok(());
    };

    if queries::find_user_by_email(db, email).await?.is_some() {
        info!("admin account already present, skipping seed");
        return Ok(());
    }

    let admin = User::new(
        "Administrator".into(),
        email.clone(),
        hash_password(password)?,
        String::new(),
        Role::Admin,
    );
    db.users().insert_one(&admin).await?;
    info!(email = %email, "admin account seeded");
    Ok(())
}
