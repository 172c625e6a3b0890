//! crates/configs/src/lib.rs
//!
//! Application configuration: defaults overridden by `EMBERHALL_*`
//! environment variables (with `.env` support). Secrets stay wrapped in
//! `secrecy` so they never land in logs.

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection url for both the points store and the durable KV table.
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    /// The site operator's canonical account: automod-exempt and the
    /// ledger's infinite sentinel.
    pub owner_account_id: Uuid,
    /// Shared secret expected from the chat bridge; `None` disables the
    /// check (local development only).
    pub bridge_secret: Option<SecretString>,
}

impl AppConfig {
    /// Loads configuration from the environment.
    ///
    /// Nested keys use double underscores: `EMBERHALL_SERVER__PORT=9090`,
    /// `EMBERHALL_DATABASE__URL=sqlite:emberhall.db?mode=rwc`.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let cfg = config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "sqlite:emberhall.db?mode=rwc")?
            .set_default("owner_account_id", Uuid::nil().to_string())?
            .add_source(
                config::Environment::with_prefix("EMBERHALL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let app: AppConfig = cfg.try_deserialize()?;
        if app.owner_account_id.is_nil() {
            tracing::warn!("EMBERHALL_OWNER_ACCOUNT_ID is unset; owner features are disabled");
        }
        if app.bridge_secret.is_none() {
            tracing::warn!("EMBERHALL_BRIDGE_SECRET is unset; the chat bridge is unauthenticated");
        }
        Ok(app)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_environment() {
        let cfg = AppConfig::load().expect("defaults should always load");
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.port, 8080);
        assert!(cfg.database.url.starts_with("sqlite:"));
        assert!(cfg.owner_account_id.is_nil());
    }
}
