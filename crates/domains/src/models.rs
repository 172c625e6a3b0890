//! # Domain Models
//!
//! The core entities of the Emberhall community backend: canonical accounts,
//! the points ledger, moderation records, the cosmetic store, and sessions.
//! Every stored entity is an explicit record type; storage values are never
//! probed as loose JSON.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Balance reported for the distinguished owner/infinite account.
/// Never persisted as spendable; the ledger special-cases the account id.
pub const INFINITE_POINTS: i64 = 999_999_999_999;

/// Chat platforms a viewer can arrive from. `Ember` is the site's own chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitch,
    Youtube,
    Ember,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitch => "twitch",
            Platform::Youtube => "youtube",
            Platform::Ember => "ember",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "twitch" => Ok(Platform::Twitch),
            "youtube" => Ok(Platform::Youtube),
            "ember" => Ok(Platform::Ember),
            other => Err(DomainError::InvalidInput(format!("unknown platform: {other}"))),
        }
    }
}

/// Classification of a single ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Message,
    Watch,
    ModAdjust,
    Redeem,
    Bonus,
    Purchase,
    Tip,
    Subscription,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Message => "message",
            EventType::Watch => "watch",
            EventType::ModAdjust => "mod_adjust",
            EventType::Redeem => "redeem",
            EventType::Bonus => "bonus",
            EventType::Purchase => "purchase",
            EventType::Tip => "tip",
            EventType::Subscription => "subscription",
        }
    }
}

impl FromStr for EventType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message" => Ok(EventType::Message),
            "watch" => Ok(EventType::Watch),
            "mod_adjust" => Ok(EventType::ModAdjust),
            "redeem" => Ok(EventType::Redeem),
            "bonus" => Ok(EventType::Bonus),
            "purchase" => Ok(EventType::Purchase),
            "tip" => Ok(EventType::Tip),
            "subscription" => Ok(EventType::Subscription),
            other => Err(DomainError::InvalidInput(format!("unknown event type: {other}"))),
        }
    }
}

/// One immutable ledger entry. Replaying all deltas for an account in
/// creation order from zero yields exactly the stored balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointEvent {
    pub account_id: Uuid,
    pub delta: i64,
    pub event_type: EventType,
    pub reason: Option<String>,
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
    pub balance_after: i64,
}

/// Relational-side counters for one account, as stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointsSnapshot {
    pub balance: i64,
    pub messages_count: i64,
    pub watch_minutes: i64,
}

/// The assembled read model of one canonical viewer: relational counters
/// plus the KV-side profile.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: Uuid,
    pub display_name: String,
    pub balance: i64,
    pub messages_count: i64,
    pub watch_minutes: i64,
    pub inventory: Vec<String>,
    pub avatar_decoration: Option<String>,
    pub message_decoration: Option<String>,
    pub bonus_sign_in_granted: bool,
    pub bonus_linked_accounts_granted: bool,
}

/// Current version of the per-account profile record shape.
pub const PROFILE_SCHEMA_VERSION: u32 = 2;

/// The "new shape" per-account KV record: inventory, decorations, and the
/// one-time bonus guards. Balance and counters live in the points store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub schema_version: u32,
    pub account_id: Uuid,
    pub display_name: String,
    #[serde(default)]
    pub inventory: Vec<String>,
    #[serde(default)]
    pub avatar_decoration: Option<String>,
    #[serde(default)]
    pub message_decoration: Option<String>,
    #[serde(default)]
    pub bonus_sign_in_granted: bool,
    #[serde(default)]
    pub bonus_linked_accounts_granted: bool,
}

impl ProfileRecord {
    pub fn new(account_id: Uuid, display_name: impl Into<String>) -> Self {
        ProfileRecord {
            schema_version: PROFILE_SCHEMA_VERSION,
            account_id,
            display_name: display_name.into(),
            inventory: Vec::new(),
            avatar_decoration: None,
            message_decoration: None,
            bonus_sign_in_granted: false,
            bonus_linked_accounts_granted: false,
        }
    }
}

/// The legacy single-document store: every user under one KV key, keyed by
/// `ember:{account_id}`. Read-only; migrated entry by entry on first touch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyUserdata {
    #[serde(default)]
    pub users: HashMap<String, LegacyProfile>,
}

/// One entry of the legacy document, with aliases for the historical
/// camelCase field names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyProfile {
    #[serde(default, alias = "displayName")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub points: i64,
    #[serde(default)]
    pub inventory: Vec<String>,
    #[serde(default, alias = "avatarDecoration")]
    pub avatar_decoration: Option<String>,
    #[serde(default, alias = "activeMessageDecoration")]
    pub message_decoration: Option<String>,
    #[serde(default, alias = "bonusSignInGiven")]
    pub bonus_sign_in: bool,
    #[serde(default, alias = "bonusLinkedAccountsGiven")]
    pub bonus_linked_accounts: bool,
}

impl LegacyProfile {
    /// Maps the old shape onto the current profile record.
    pub fn into_profile(self, account_id: Uuid, display_fallback: &str) -> ProfileRecord {
        ProfileRecord {
            schema_version: PROFILE_SCHEMA_VERSION,
            account_id,
            display_name: self.display_name.unwrap_or_else(|| display_fallback.to_string()),
            inventory: self.inventory,
            avatar_decoration: self.avatar_decoration,
            message_decoration: self.message_decoration,
            bonus_sign_in_granted: self.bonus_sign_in,
            bonus_linked_accounts_granted: self.bonus_linked_accounts,
        }
    }
}

/// How a ban came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BanKind {
    Manual,
    AutomodBan,
    Brainrot,
}

impl BanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BanKind::Manual => "manual",
            BanKind::AutomodBan => "automod_ban",
            BanKind::Brainrot => "brainrot",
        }
    }
}

impl FromStr for BanKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(BanKind::Manual),
            "automod_ban" => Ok(BanKind::AutomodBan),
            "brainrot" => Ok(BanKind::Brainrot),
            other => Err(DomainError::InvalidInput(format!("unknown ban kind: {other}"))),
        }
    }
}

/// A ban or timeout as recorded in the moderation document.
/// `expires_at = None` means permanent; expiry is evaluated lazily at read
/// time, never by a background sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub reason: String,
    pub ban_kind: BanKind,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    /// `None` when the ban was issued by the automod rather than a human.
    pub moderator_id: Option<Uuid>,
    pub moderator_name: String,
}

/// The moderation document: moderator roster plus the ban history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModerationDoc {
    #[serde(default)]
    pub mods: Vec<Uuid>,
    #[serde(default)]
    pub bans: Vec<ModerationRecord>,
}

/// The live ban columns of one account row.
#[derive(Debug, Clone)]
pub struct BanState {
    pub is_banned: bool,
    pub until: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub kind: Option<BanKind>,
}

/// A currently-effective ban, after lazy expiry has been applied.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveBan {
    pub user_id: Uuid,
    pub reason: String,
    pub ban_kind: BanKind,
    pub expires_at: Option<DateTime<Utc>>,
}

/// The suspension the automod asks the caller to broadcast.
#[derive(Debug, Clone, Serialize)]
pub struct TimeoutAction {
    pub user_id: Uuid,
    pub duration_minutes: i64,
    pub reason: String,
    pub kind: BanKind,
}

/// Which decoration slot a store item occupies when equipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    AvatarDecoration,
    MessageDecoration,
}

/// One cosmetic catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreItem {
    pub id: String,
    pub name: String,
    pub cost: i64,
    pub item_type: ItemType,
    /// Presentation payload applied to the slot when equipped.
    pub css_class: String,
    #[serde(default)]
    pub requires_input: bool,
}

/// The store catalog document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreCatalog {
    #[serde(default)]
    pub items: Vec<StoreItem>,
}

/// A priced action (e.g. a TTS message) charged through the atomic debit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemOption {
    pub id: String,
    pub name: String,
    pub cost: i64,
    #[serde(default)]
    pub requires_input: bool,
}

/// The redeem catalog document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedeemList {
    #[serde(default)]
    pub options: Vec<RedeemOption>,
}

/// The signed-in identity a session is bound to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub display_name: String,
}

/// A linked per-platform sub-identity merged into a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedIdentity {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Short-lived authentication context. Created on login, destroyed on
/// logout; the KV layer enforces whatever expiry applies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub user: Option<SessionUser>,
    #[serde(default)]
    pub twitch: Option<LinkedIdentity>,
    #[serde(default)]
    pub youtube: Option<LinkedIdentity>,
}

impl SessionRecord {
    pub fn new(created_at: DateTime<Utc>) -> Self {
        SessionRecord { created_at, user: None, twitch: None, youtube: None }
    }
}

/// Minimum role demanded by a protected operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinRole {
    Mod,
    Owner,
}

/// The roles a session resolved to.
#[derive(Debug, Clone, Copy)]
pub struct RoleGrant {
    pub account_id: Uuid,
    pub is_owner: bool,
    pub is_mod: bool,
}

/// Fire-and-forget notifications pushed at presentation-layer collaborators.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BroadcastEvent {
    Chat { user_id: Uuid, display_name: String, text: String, platform: Platform },
    Timeout { user_id: Uuid, duration_minutes: i64, reason: String, kind: BanKind },
    Redeem { user_id: Uuid, redeem_id: String, cost: i64 },
}
