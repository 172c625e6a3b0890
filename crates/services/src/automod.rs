//! # Automod Engine
//!
//! Pure, synchronous text classification: lowercase substring containment
//! against two operator-maintained word lists, the banned list checked
//! ahead of the flagged one. A first match issues a fixed five-minute
//! suspension and hands the caller a `TimeoutAction` to broadcast.

use std::sync::Arc;

use chrono::{Duration, Utc};
use domains::{
    BanKind, KvStore, ModerationDoc, ModerationRecord, PointsStore, Result, TimeoutAction,
};
use uuid::Uuid;

use crate::kvjson::{read_json, write_json};
use crate::moderation::MODERATION_DOC_KEY;

pub const BANNED_WORDS_KEY: &str = "banned_words";
pub const FLAGGED_WORDS_KEY: &str = "flagged_words";
pub const TIMEOUT_MINUTES: i64 = 5;

const AUTOMOD_NAME: &str = "Emberhall Automod";

fn parse_word_list(raw: Option<String>) -> Vec<String> {
    raw.map(|text| {
        text.split(['\r', '\n', ','])
            .map(|word| word.trim().to_lowercase())
            .filter(|word| !word.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

pub struct Automod {
    kv: Arc<dyn KvStore>,
    points: Arc<dyn PointsStore>,
    /// The site operator is always exempt from scanning.
    owner_account: Uuid,
}

impl Automod {
    pub fn new(kv: Arc<dyn KvStore>, points: Arc<dyn PointsStore>, owner_account: Uuid) -> Self {
        Self { kv, points, owner_account }
    }

    /// Scans one message. Returns the timeout to broadcast on a match,
    /// `None` when the text is clean, the sender is exempt, or the word
    /// lists are unavailable. Missing lists mean no enforcement for this
    /// request, never a blocked message pipeline.
    pub async fn scan(&self, account_id: Uuid, text: &str) -> Result<Option<TimeoutAction>> {
        if account_id == self.owner_account {
            return Ok(None);
        }

        let (banned, flagged) = match self.load_lists().await {
            Ok(lists) => lists,
            Err(err) => {
                tracing::warn!(%err, "word lists unavailable, skipping automod scan");
                return Ok(None);
            }
        };
        if banned.is_empty() && flagged.is_empty() {
            return Ok(None);
        }

        let normalized = text.to_lowercase();
        let banned_hit = banned.iter().find(|word| normalized.contains(word.as_str()));
        let flagged_hit = flagged.iter().find(|word| normalized.contains(word.as_str()));
        let Some(word) = banned_hit.or(flagged_hit) else {
            return Ok(None);
        };
        let kind = if banned_hit.is_some() { BanKind::AutomodBan } else { BanKind::Brainrot };
        let reason = format!("Automod: used forbidden word ({word})");

        let now = Utc::now();
        let until = now + Duration::minutes(TIMEOUT_MINUTES);
        self.points.set_ban(account_id, Some(until), &reason, kind).await?;

        let mut doc: ModerationDoc =
            read_json(&*self.kv, MODERATION_DOC_KEY).await?.unwrap_or_default();
        doc.bans.push(ModerationRecord {
            id: Uuid::new_v4(),
            user_id: account_id,
            reason: reason.clone(),
            ban_kind: kind,
            created_at: now,
            expires_at: Some(until),
            moderator_id: None,
            moderator_name: AUTOMOD_NAME.to_string(),
        });
        write_json(&*self.kv, MODERATION_DOC_KEY, &doc).await?;

        Ok(Some(TimeoutAction {
            user_id: account_id,
            duration_minutes: TIMEOUT_MINUTES,
            reason,
            kind,
        }))
    }

    async fn load_lists(&self) -> Result<(Vec<String>, Vec<String>)> {
        let banned = parse_word_list(self.kv.get(BANNED_WORDS_KEY).await?);
        let flagged = parse_word_list(self.kv.get(FLAGGED_WORDS_KEY).await?);
        Ok((banned, flagged))
    }
}
