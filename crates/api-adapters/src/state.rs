//! State shared across all handlers: the wired core services.

use std::sync::Arc;

use domains::Notifier;
use services::accounts::AccountDirectory;
use services::automod::Automod;
use services::identity::IdentityResolver;
use services::ledger::Ledger;
use services::moderation::ModerationService;
use services::session::Sessions;
use services::storefront::Storefront;

#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<IdentityResolver>,
    pub ledger: Arc<Ledger>,
    pub automod: Arc<Automod>,
    pub moderation: Arc<ModerationService>,
    pub storefront: Arc<Storefront>,
    pub accounts: Arc<AccountDirectory>,
    pub sessions: Arc<Sessions>,
    pub notifier: Arc<dyn Notifier>,
    /// Shared secret expected from the chat bridge; `None` disables the
    /// check (local development only).
    pub bridge_secret: Option<String>,
}
