//! # LunchBox server
//!
//! Assembles the application from the adapters enabled at compile time and
//! the loaded [`Settings`].

#[cfg(not(all(feature = "web-axum", feature = "auth-jwt")))]
compile_error!("the lunchbox binary needs the `web-axum` and `auth-jwt` features");

use std::sync::Arc;

use anyhow::Context;
use api_adapters::{router, Adapters, AppState, HttpOptions};
use auth_adapters::{Argon2PasswordHasher, JwtTokenService};
use configs::{LogFormat, Settings};
use domains::ports::{MediaStorage, TokenBlacklist};
use storage_adapters::{ImageMediaProcessor, InMemoryRepository, InMemoryTokenBlacklist};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    match settings.logging.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }
}

/// Every repository port backed by one implementation.
macro_rules! repositories {
    ($repo:expr) => {{
        let repo = $repo;
        (
            repo.clone() as Arc<dyn domains::ports::UserRepository>,
            repo.clone() as Arc<dyn domains::ports::RecipeRepository>,
            repo.clone() as Arc<dyn domains::ports::CommentRepository>,
            repo.clone() as Arc<dyn domains::ports::ReviewRepository>,
            repo.clone() as Arc<dyn domains::ports::ReportRepository>,
            repo as Arc<dyn domains::ports::NotificationRepository>,
        )
    }};
}

async fn build_adapters(settings: &Settings) -> anyhow::Result<Adapters> {
    #[allow(unused_variables)]
    let database_url = settings.database.url.as_ref();

    #[cfg(feature = "db-postgres")]
    let (users, recipes, comments, reviews, reports, notifications) = match database_url {
        Some(url) => {
            use secrecy::ExposeSecret;
            let repo = storage_adapters::PgRepository::connect(url.expose_secret(), settings.database.max_connections)
                .await
                .context("connecting to PostgreSQL")?;
            if settings.database.run_migrations {
                repo.migrate().await.context("running migrations")?;
            }
            info!(max_connections = settings.database.max_connections, "using PostgreSQL storage");
            repositories!(Arc::new(repo))
        }
        None => {
            warn!("database.url is not set; data lives in memory and is lost on exit");
            repositories!(Arc::new(InMemoryRepository::new()))
        }
    };

    #[cfg(not(feature = "db-postgres"))]
    let (users, recipes, comments, reviews, reports, notifications) = {
        if database_url.is_some() {
            warn!("database.url is ignored: built without the db-postgres feature");
        }
        repositories!(Arc::new(InMemoryRepository::new()))
    };

    #[cfg(feature = "media-local")]
    let media: Arc<dyn MediaStorage> = {
        info!(root = %settings.media.root.display(), "storing images on disk");
        Arc::new(storage_adapters::LocalMediaStorage::new(settings.media.root.clone()))
    };
    #[cfg(not(feature = "media-local"))]
    let media: Arc<dyn MediaStorage> = Arc::new(storage_adapters::InMemoryMediaStorage::new());

    #[allow(unused_variables)]
    let redis_url = settings.redis.url.as_ref();

    #[cfg(feature = "redis")]
    let blacklist: Arc<dyn TokenBlacklist> = match redis_url {
        Some(url) => {
            use secrecy::ExposeSecret;
            info!("revoked tokens are kept in Redis");
            Arc::new(storage_adapters::RedisTokenBlacklist::connect(url.expose_secret()).context("creating Redis pool")?)
        }
        None => Arc::new(InMemoryTokenBlacklist::new()),
    };
    #[cfg(not(feature = "redis"))]
    let blacklist: Arc<dyn TokenBlacklist> = Arc::new(InMemoryTokenBlacklist::new());

    let tokens = JwtTokenService::new(
        settings.jwt_secret().as_bytes(),
        chrono::Duration::seconds(settings.auth.token_ttl_secs),
        settings.auth.issuer.clone(),
    )
    .with_reset_ttl(chrono::Duration::seconds(settings.auth.reset_token_ttl_secs));

    Ok(Adapters {
        users,
        recipes,
        comments,
        reviews,
        reports,
        notifications,
        hasher: Arc::new(Argon2PasswordHasher::default()),
        tokens: Arc::new(tokens),
        blacklist,
        media,
        processor: Arc::new(ImageMediaProcessor::new(settings.media.max_upload_bytes, settings.media.optimize_png)),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading configuration")?;
    init_tracing(&settings);

    let adapters = build_adapters(&settings).await?;
    let state = AppState::new(adapters, settings.moderation.auto_approve);
    let options = HttpOptions {
        max_body_bytes: settings.server.max_body_bytes,
        cors_origins: settings.server.cors_origins.clone(),
    };
    let app = router(state, &options);

    let addr = settings.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, auto_approve = settings.moderation.auto_approve, "lunchbox listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;
    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(%err, "failed to listen for ctrl-c");
    }
}
