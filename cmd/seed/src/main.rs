//! Creates the admin accounts listed under `seed.admins` when they do not
//! exist yet. Running it twice is harmless.

use std::sync::Arc;

use anyhow::{bail, Context};
use auth_adapters::{Argon2PasswordHasher, JwtTokenService};
use configs::Settings;
use secrecy::ExposeSecret;
use services::AuthService;
use storage_adapters::{InMemoryTokenBlacklist, PgRepository};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading configuration")?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.logging.level)))
        .init();

    let Some(url) = settings.database.url.as_ref() else {
        bail!("database.url must be set to seed admins");
    };
    if settings.seed.admins.is_empty() {
        info!("no admins configured under seed.admins");
        return Ok(());
    }

    let repo = PgRepository::connect(url.expose_secret(), settings.database.max_connections)
        .await
        .context("connecting to PostgreSQL")?;
    if settings.database.run_migrations {
        repo.migrate().await.context("running migrations")?;
    }

    let tokens = JwtTokenService::new(
        settings.jwt_secret().as_bytes(),
        chrono::Duration::seconds(settings.auth.token_ttl_secs),
        settings.auth.issuer.clone(),
    );
    let auth = AuthService::new(
        Arc::new(repo),
        Arc::new(Argon2PasswordHasher::default()),
        Arc::new(tokens),
        Arc::new(InMemoryTokenBlacklist::new()),
    );

    for admin in &settings.seed.admins {
        let created = auth
            .ensure_admin(&admin.name, &admin.email, admin.password.expose_secret())
            .await
            .with_context(|| format!("seeding {}", admin.email))?;
        if created {
            info!(email = %admin.email, "admin created");
        } else {
            info!(email = %admin.email, "admin already exists");
        }
    }
    Ok(())
}
