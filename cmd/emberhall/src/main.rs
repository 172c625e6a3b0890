//! # Emberhall Binary
//!
//! The entry point that assembles the application: configuration, storage
//! adapters, core services, then the axum server. A drain task logs the
//! broadcast channel, standing in for the chat-room collaborator.

use std::sync::Arc;

use anyhow::Context;
use api_adapters::notify::ChannelNotifier;
use api_adapters::AppState;
use secrecy::ExposeSecret;
use services::accounts::AccountDirectory;
use services::automod::Automod;
use services::identity::IdentityResolver;
use services::ledger::Ledger;
use services::moderation::ModerationService;
use services::session::Sessions;
use services::storefront::Storefront;
use tokio::sync::broadcast::error::RecvError;

#[cfg(feature = "db-sqlite")]
use storage_adapters::sqlite::{SqliteKvStore, SqlitePointsStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cfg = configs::AppConfig::load().context("loading configuration")?;

    // 1. Storage implementations
    #[cfg(feature = "db-sqlite")]
    let points: Arc<dyn domains::PointsStore> = Arc::new(
        SqlitePointsStore::connect(&cfg.database.url)
            .await
            .context("connecting points store")?,
    );
    #[cfg(feature = "db-sqlite")]
    let kv: Arc<dyn domains::KvStore> = Arc::new(
        SqliteKvStore::connect(&cfg.database.url)
            .await
            .context("connecting kv store")?,
    );

    // 2. Broadcast channel plus its drain task
    let notifier = Arc::new(ChannelNotifier::new(64));
    let mut events = notifier.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => tracing::info!(?event, "broadcast"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "broadcast drain lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // 3. Core services, all sharing the injected storage handles
    let owner = cfg.owner_account_id;
    let identity = Arc::new(IdentityResolver::new(kv.clone()));
    let ledger = Arc::new(Ledger::new(points.clone(), kv.clone(), owner));
    let automod = Arc::new(Automod::new(kv.clone(), points.clone(), owner));
    let moderation = Arc::new(ModerationService::new(kv.clone(), points.clone(), owner));
    let accounts = Arc::new(AccountDirectory::new(kv.clone(), points.clone()));
    let storefront = Arc::new(Storefront::new(kv.clone(), ledger.clone(), accounts.clone()));
    let sessions = Arc::new(Sessions::new(kv.clone()));

    let state = AppState {
        identity,
        ledger,
        automod,
        moderation,
        storefront,
        accounts,
        sessions,
        notifier: notifier.clone(),
        bridge_secret: cfg
            .bridge_secret
            .as_ref()
            .map(|secret| secret.expose_secret().to_string()),
    };

    // 4. Serve
    let app = api_adapters::router(state);
    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.context("binding listener")?;
    tracing::info!(%addr, "emberhall listening");
    axum::serve(listener, app).await?;
    Ok(())
}
