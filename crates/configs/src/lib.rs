//! # configs
//!
//! Layered runtime settings: built-in defaults, then `config/default.toml`,
//! then `config/$LUNCHBOX_ENV.toml`, then `LUNCHBOX__SECTION__KEY`
//! environment variables (a `.env` file is loaded first when present).

use std::collections::HashMap;
use std::path::PathBuf;

use config::{Config, Environment, File, FileFormat};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

const DEFAULTS: &str = include_str!("../lunchbox.toml");
const ENV_PREFIX: &str = "LUNCHBOX";
pub const MIN_SECRET_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub media: MediaSettings,
    pub moderation: ModerationSettings,
    pub logging: LoggingSettings,
    #[serde(default)]
    pub redis: RedisSettings,
    #[serde(default)]
    pub seed: SeedSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Whole-request cap, multipart uploads included
    pub max_body_bytes: usize,
    /// Empty means any origin
    pub cors_origins: Vec<String>,
}

impl ServerSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// PostgreSQL URL. Without one the server keeps everything in memory.
    pub url: Option<SecretString>,
    pub max_connections: u32,
    pub run_migrations: bool,
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: Option<SecretString>,
    pub token_ttl_secs: i64,
    /// Lifetime of the token handed out after a correct security answer
    pub reset_token_ttl_secs: i64,
    pub issuer: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaSettings {
    /// Filesystem root for uploaded images
    pub root: PathBuf,
    pub max_upload_bytes: usize,
    pub optimize_png: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModerationSettings {
    /// Publish user recipes without admin approval
    pub auto_approve: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Default `EnvFilter` directive; `RUST_LOG` wins when set
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Default, Deserialize)]
pub struct RedisSettings {
    pub url: Option<SecretString>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SeedSettings {
    #[serde(default)]
    pub admins: Vec<SeedAdmin>,
}

#[derive(Debug, Deserialize)]
pub struct SeedAdmin {
    pub name: String,
    pub email: String,
    pub password: SecretString,
}

impl Settings {
    /// Loads `.env`, the config files and the process environment, then validates.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }
        let env_name = std::env::var("LUNCHBOX_ENV").unwrap_or_else(|_| "development".into());
        let builder = Config::builder()
            .add_source(File::from_str(DEFAULTS, FileFormat::Toml))
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{env_name}")).required(false))
            .add_source(environment(None));
        Self::build(builder)
    }

    /// Builds from an extra TOML layer and an explicit variable map instead
    /// of the files and the process environment.
    pub fn from_sources(toml: &str, env: HashMap<String, String>) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::from_str(DEFAULTS, FileFormat::Toml))
            .add_source(File::from_str(toml, FileFormat::Toml))
            .add_source(environment(Some(env)));
        Self::build(builder)
    }

    fn build(builder: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Self, ConfigError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be greater than 0".into()));
        }
        match &self.auth.jwt_secret {
            None => return Err(ConfigError::Invalid("auth.jwt_secret is required".into())),
            Some(secret) if secret.expose_secret().len() < MIN_SECRET_BYTES => {
                return Err(ConfigError::Invalid(format!(
                    "auth.jwt_secret must be at least {MIN_SECRET_BYTES} bytes"
                )));
            }
            Some(_) => {}
        }
        if self.auth.token_ttl_secs <= 0 {
            return Err(ConfigError::Invalid("auth.token_ttl_secs must be positive".into()));
        }
        if self.auth.reset_token_ttl_secs <= 0 {
            return Err(ConfigError::Invalid("auth.reset_token_ttl_secs must be positive".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid("database.max_connections must be at least 1".into()));
        }
        if self.media.max_upload_bytes > self.server.max_body_bytes {
            return Err(ConfigError::Invalid("media.max_upload_bytes cannot exceed server.max_body_bytes".into()));
        }
        Ok(())
    }

    /// The validated signing secret.
    pub fn jwt_secret(&self) -> &str {
        self.auth.jwt_secret.as_ref().map(|s| s.expose_secret()).unwrap_or_default()
    }
}

fn environment(source: Option<HashMap<String, String>>) -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("server.cors_origins")
        .source(source)
}
