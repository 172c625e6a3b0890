//! # Sessions
//!
//! Browser-session records in the KV store, plus the one-time account
//! bonuses granted at sign-in.

use std::sync::Arc;

use chrono::Utc;
use domains::{EventType, KvStore, Result, SessionRecord};
use uuid::Uuid;

use crate::accounts::AccountDirectory;
use crate::kvjson::{read_json, write_json};
use crate::ledger::Ledger;

pub const SIGN_IN_BONUS: i64 = 2_000;
pub const LINKED_ACCOUNTS_BONUS: i64 = 2_000;

fn session_key(sid: &str) -> String {
    format!("session:{sid}")
}

pub struct Sessions {
    kv: Arc<dyn KvStore>,
}

impl Sessions {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Fresh session ids are dash-less random identifiers.
    pub fn new_session_id() -> String {
        Uuid::new_v4().simple().to_string()
    }

    pub async fn get(&self, sid: &str) -> Result<Option<SessionRecord>> {
        read_json(&*self.kv, &session_key(sid)).await
    }

    pub async fn save(&self, sid: &str, record: &SessionRecord) -> Result<()> {
        write_json(&*self.kv, &session_key(sid), record).await
    }

    /// Returns the existing session or creates an anonymous one.
    pub async fn ensure(&self, sid: Option<&str>) -> Result<(String, SessionRecord)> {
        if let Some(sid) = sid {
            if let Some(record) = self.get(sid).await? {
                return Ok((sid.to_string(), record));
            }
        }
        let sid = Self::new_session_id();
        let record = SessionRecord::new(Utc::now());
        self.save(&sid, &record).await?;
        Ok((sid, record))
    }

    /// Destroyed on logout; no automatic expiry beyond what the KV layer
    /// enforces.
    pub async fn destroy(&self, sid: &str) -> Result<()> {
        self.kv.delete(&session_key(sid)).await
    }
}

/// Grants the one-time sign-in and linked-accounts bonuses for a signed-in
/// session. The profile flags make re-grants idempotent. Returns the total
/// credited.
pub async fn ensure_bonuses(
    session: &SessionRecord,
    accounts: &AccountDirectory,
    ledger: &Ledger,
) -> Result<i64> {
    let Some(user) = &session.user else {
        return Ok(0);
    };
    let mut profile = accounts.load_profile(user.id, Some(&user.display_name)).await?;

    let mut total = 0;
    let mut changed = false;
    if !profile.bonus_sign_in_granted {
        profile.bonus_sign_in_granted = true;
        total += SIGN_IN_BONUS;
        changed = true;
    }
    if session.twitch.is_some()
        && session.youtube.is_some()
        && !profile.bonus_linked_accounts_granted
    {
        profile.bonus_linked_accounts_granted = true;
        total += LINKED_ACCOUNTS_BONUS;
        changed = true;
    }

    if changed {
        accounts.save_profile(&profile).await?;
    }
    if total > 0 {
        ledger.credit(user.id, total, EventType::Bonus, Some("bonus"), Some("ember_bonus")).await?;
    }
    Ok(total)
}
