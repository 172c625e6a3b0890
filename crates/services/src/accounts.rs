//! # Account Directory
//!
//! Read-through access to per-account profile records, with lazy one-time
//! migration out of the legacy single-document store. Whichever request
//! reads an account first performs the migration; running it redundantly
//! is harmless.

use std::sync::Arc;

use chrono::Utc;
use domains::{
    Account, EventType, KvStore, LegacyUserdata, PointEvent, PointsStore, ProfileRecord, Result,
};
use uuid::Uuid;

use crate::kvjson::{read_json, write_json};

/// Fixed key of the legacy single-document store.
pub const LEGACY_USERDATA_KEY: &str = "userdata";

/// Display name for accounts we know nothing else about.
pub const DEFAULT_DISPLAY_NAME: &str = "Wanderer";

fn profile_key(account_id: Uuid) -> String {
    format!("profile:{account_id}")
}

fn legacy_entry_key(account_id: Uuid) -> String {
    format!("ember:{account_id}")
}

pub struct AccountDirectory {
    kv: Arc<dyn KvStore>,
    points: Arc<dyn PointsStore>,
}

impl AccountDirectory {
    pub fn new(kv: Arc<dyn KvStore>, points: Arc<dyn PointsStore>) -> Self {
        Self { kv, points }
    }

    /// Loads the profile record, migrating it out of the legacy document
    /// on first read. An account present in neither place gets a fresh
    /// default record, not persisted until the first mutation.
    pub async fn load_profile(
        &self,
        account_id: Uuid,
        display_fallback: Option<&str>,
    ) -> Result<ProfileRecord> {
        if let Some(profile) = read_json(&*self.kv, &profile_key(account_id)).await? {
            return Ok(profile);
        }
        if let Some(migrated) = self.migrate_legacy_entry(account_id).await? {
            return Ok(migrated);
        }
        Ok(ProfileRecord::new(account_id, display_fallback.unwrap_or(DEFAULT_DISPLAY_NAME)))
    }

    pub async fn save_profile(&self, profile: &ProfileRecord) -> Result<()> {
        write_json(&*self.kv, &profile_key(profile.account_id), profile).await
    }

    /// Assembles the full read model: KV profile plus relational counters.
    pub async fn load_account(
        &self,
        account_id: Uuid,
        display_fallback: Option<&str>,
    ) -> Result<Account> {
        let profile = self.load_profile(account_id, display_fallback).await?;
        let snapshot = self.points.snapshot(account_id).await?.unwrap_or_default();
        Ok(Account {
            id: account_id,
            display_name: profile.display_name,
            balance: snapshot.balance,
            messages_count: snapshot.messages_count,
            watch_minutes: snapshot.watch_minutes,
            inventory: profile.inventory,
            avatar_decoration: profile.avatar_decoration,
            message_decoration: profile.message_decoration,
            bonus_sign_in_granted: profile.bonus_sign_in_granted,
            bonus_linked_accounts_granted: profile.bonus_linked_accounts_granted,
        })
    }

    /// Copies this account's entry out of the legacy document, if present.
    /// The opening balance seeds the points row through a conditional
    /// insert, so redundant concurrent migrations cannot double-credit; an
    /// already-existing row means the balance lives in the ledger and the
    /// legacy figure is stale.
    async fn migrate_legacy_entry(&self, account_id: Uuid) -> Result<Option<ProfileRecord>> {
        let Some(doc) = read_json::<LegacyUserdata>(&*self.kv, LEGACY_USERDATA_KEY).await? else {
            return Ok(None);
        };
        let Some(entry) = doc.users.get(&legacy_entry_key(account_id)) else {
            return Ok(None);
        };

        let profile = entry.clone().into_profile(account_id, DEFAULT_DISPLAY_NAME);
        self.save_profile(&profile).await?;

        if entry.points > 0 {
            let now = Utc::now();
            if self.points.seed_balance(account_id, entry.points, now).await? {
                self.points
                    .append_event(&PointEvent {
                        account_id,
                        delta: entry.points,
                        event_type: EventType::ModAdjust,
                        reason: Some("legacy_migration".to_string()),
                        source: Some(LEGACY_USERDATA_KEY.to_string()),
                        created_at: now,
                        balance_after: entry.points,
                    })
                    .await?;
            }
        }
        tracing::info!(%account_id, "migrated legacy profile to per-account record");
        Ok(Some(profile))
    }
}
