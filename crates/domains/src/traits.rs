//! # Core Traits (Ports)
//!
//! Any storage or notification adapter must implement these traits to be
//! used by the binary. Services receive them as `Arc<dyn Trait>` handles;
//! state is always threaded explicitly, never held in ambient singletons.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{BanKind, BanState, BroadcastEvent, PointEvent, PointsSnapshot};

/// Key-value persistence: identity mappings, profile records, the legacy
/// document, moderation doc, word lists, catalogs, sessions, and throttle
/// markers. TTL expiry is lazy: an expired key reads as absent.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn put(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Relational persistence for balances, counters, ban columns, and the
/// append-only event log.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PointsStore: Send + Sync {
    /// Upserts the account row; the display name is refreshed when given
    /// and left untouched when `None`.
    async fn ensure_account<'a>(
        &self,
        account_id: Uuid,
        display_name: Option<&'a str>,
        now: DateTime<Utc>,
    ) -> Result<()>;

    async fn snapshot(&self, account_id: Uuid) -> Result<Option<PointsSnapshot>>;

    /// Read-modify-write of a pre-computed balance plus counter bumps.
    /// Best-effort: credits accept a narrow race window.
    async fn apply_credit(
        &self,
        account_id: Uuid,
        new_balance: i64,
        inc_messages: i64,
        inc_watch: i64,
        now: DateTime<Utc>,
    ) -> Result<()>;

    /// The one true conditional update: subtract only if the balance is
    /// sufficient, in a single indivisible step, returning the post-update
    /// balance. `None` means insufficient funds (or no such row) and no
    /// state change.
    async fn debit_if_affordable(
        &self,
        account_id: Uuid,
        cost: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>>;

    /// Inserts the row with an opening balance only if it does not exist
    /// yet. Returns whether the insert landed; safe to call redundantly
    /// from concurrent first-reads.
    async fn seed_balance(
        &self,
        account_id: Uuid,
        opening: i64,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    async fn append_event(&self, event: &PointEvent) -> Result<()>;

    /// Events for one account in creation order.
    async fn events_for(&self, account_id: Uuid) -> Result<Vec<PointEvent>>;

    async fn set_ban(
        &self,
        account_id: Uuid,
        until: Option<DateTime<Utc>>,
        reason: &str,
        kind: BanKind,
    ) -> Result<()>;

    async fn ban_state(&self, account_id: Uuid) -> Result<Option<BanState>>;

    async fn clear_ban(&self, account_id: Uuid) -> Result<()>;
}

/// Fire-and-forget notification sink consumed by presentation-layer
/// collaborators (chat room, moderation dashboard). At-most-once;
/// implementations log failures and never surface them to the caller.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn broadcast(&self, event: BroadcastEvent);
}
