//! # Moderation State
//!
//! Ban lifecycle (`Unbanned -> ActiveBan -> Unbanned`) and role
//! resolution. Expiry is evaluated lazily wherever a ban is read; there is
//! no background sweep, expired records are simply treated as inactive.

use std::sync::Arc;

use chrono::{Duration, Utc};
use domains::{
    ActiveBan, BanKind, DomainError, KvStore, MinRole, ModerationDoc, ModerationRecord,
    PointsStore, Result, RoleGrant, SessionRecord,
};
use uuid::Uuid;

use crate::kvjson::{read_json, write_json};

/// KV key of the moderation document (moderator roster + ban history).
pub const MODERATION_DOC_KEY: &str = "moderation";

pub struct ModerationService {
    kv: Arc<dyn KvStore>,
    points: Arc<dyn PointsStore>,
    owner_account: Uuid,
}

impl ModerationService {
    pub fn new(kv: Arc<dyn KvStore>, points: Arc<dyn PointsStore>, owner_account: Uuid) -> Self {
        Self { kv, points, owner_account }
    }

    pub async fn doc(&self) -> Result<ModerationDoc> {
        Ok(read_json(&*self.kv, MODERATION_DOC_KEY).await?.unwrap_or_default())
    }

    /// The currently-effective ban, if any. A record whose `expires_at`
    /// has passed reads as no ban at all.
    pub async fn active_ban(&self, account_id: Uuid) -> Result<Option<ActiveBan>> {
        let Some(state) = self.points.ban_state(account_id).await? else {
            return Ok(None);
        };
        if !state.is_banned {
            return Ok(None);
        }
        if state.until.is_some_and(|until| until <= Utc::now()) {
            return Ok(None);
        }
        Ok(Some(ActiveBan {
            user_id: account_id,
            reason: state.reason.unwrap_or_default(),
            ban_kind: state.kind.unwrap_or(BanKind::Manual),
            expires_at: state.until,
        }))
    }

    /// A banned account may not earn message or watch points; callers gate
    /// on this before crediting.
    pub async fn is_banned(&self, account_id: Uuid) -> Result<bool> {
        Ok(self.active_ban(account_id).await?.is_some())
    }

    /// Records a human-issued ban or timeout. `duration_minutes = None`
    /// means permanent.
    pub async fn record_manual_ban(
        &self,
        target: Uuid,
        reason: &str,
        duration_minutes: Option<i64>,
        moderator: &RoleGrant,
        moderator_name: &str,
    ) -> Result<ModerationRecord> {
        let now = Utc::now();
        let until = duration_minutes.map(|minutes| now + Duration::minutes(minutes));
        self.points.ensure_account(target, None, now).await?;
        self.points.set_ban(target, until, reason, BanKind::Manual).await?;

        let record = ModerationRecord {
            id: Uuid::new_v4(),
            user_id: target,
            reason: reason.to_string(),
            ban_kind: BanKind::Manual,
            created_at: now,
            expires_at: until,
            moderator_id: Some(moderator.account_id),
            moderator_name: moderator_name.to_string(),
        };
        let mut doc = self.doc().await?;
        doc.bans.push(record.clone());
        write_json(&*self.kv, MODERATION_DOC_KEY, &doc).await?;
        Ok(record)
    }

    /// Explicit unban: clears the live ban columns. History keeps the
    /// record; it simply stops being active.
    pub async fn lift_ban(&self, account_id: Uuid) -> Result<()> {
        self.points.clear_ban(account_id).await
    }

    pub async fn bans(&self) -> Result<Vec<ModerationRecord>> {
        Ok(self.doc().await?.bans)
    }

    /// Read-only role classification layered on the moderator roster plus
    /// the owner id; not a state transition.
    pub async fn require_role(&self, session: &SessionRecord, min: MinRole) -> Result<RoleGrant> {
        let Some(user) = &session.user else {
            return Err(DomainError::Forbidden("not logged in".to_string()));
        };
        let doc = self.doc().await?;
        let is_owner = user.id == self.owner_account;
        let is_mod = is_owner || doc.mods.contains(&user.id);
        let allowed = match min {
            MinRole::Owner => is_owner,
            MinRole::Mod => is_mod,
        };
        if !allowed {
            let needed = match min {
                MinRole::Owner => "owner",
                MinRole::Mod => "mod",
            };
            return Err(DomainError::Forbidden(format!("requires {needed} role")));
        }
        Ok(RoleGrant { account_id: user.id, is_owner, is_mod })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MemoryKv, MemoryPoints};
    use domains::SessionUser;

    fn fixture() -> (ModerationService, Arc<MemoryPoints>, Arc<MemoryKv>, Uuid) {
        let kv = Arc::new(MemoryKv::default());
        let points = Arc::new(MemoryPoints::default());
        let owner = Uuid::new_v4();
        (ModerationService::new(kv.clone(), points.clone(), owner), points, kv, owner)
    }

    fn session_for(id: Uuid) -> SessionRecord {
        let mut session = SessionRecord::new(Utc::now());
        session.user = Some(SessionUser { id, display_name: "Tester".into() });
        session
    }

    #[tokio::test]
    async fn expired_timeout_reads_as_unbanned() {
        let (moderation, points, _, _) = fixture();
        let user = Uuid::new_v4();
        let past = Utc::now() - Duration::minutes(1);
        points.ensure_account(user, None, Utc::now()).await.unwrap();
        points.set_ban(user, Some(past), "old timeout", BanKind::AutomodBan).await.unwrap();

        assert!(!moderation.is_banned(user).await.unwrap());
    }

    #[tokio::test]
    async fn permanent_ban_stays_active() {
        let (moderation, _, _, owner) = fixture();
        let target = Uuid::new_v4();
        let grant = RoleGrant { account_id: owner, is_owner: true, is_mod: true };

        moderation.record_manual_ban(target, "spam", None, &grant, "Owner").await.unwrap();

        let ban = moderation.active_ban(target).await.unwrap().unwrap();
        assert_eq!(ban.ban_kind, BanKind::Manual);
        assert!(ban.expires_at.is_none());
        assert_eq!(moderation.bans().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn lift_ban_returns_account_to_unbanned() {
        let (moderation, _, _, owner) = fixture();
        let target = Uuid::new_v4();
        let grant = RoleGrant { account_id: owner, is_owner: true, is_mod: true };

        moderation.record_manual_ban(target, "spam", Some(60), &grant, "Owner").await.unwrap();
        assert!(moderation.is_banned(target).await.unwrap());

        moderation.lift_ban(target).await.unwrap();
        assert!(!moderation.is_banned(target).await.unwrap());
    }

    #[tokio::test]
    async fn owner_passes_every_role_check() {
        let (moderation, _, _, owner) = fixture();
        let grant = moderation.require_role(&session_for(owner), MinRole::Owner).await.unwrap();
        assert!(grant.is_owner);
        assert!(grant.is_mod);
    }

    #[tokio::test]
    async fn listed_mod_passes_mod_but_not_owner() {
        let (moderation, _, kv, _) = fixture();
        let modder = Uuid::new_v4();
        let doc = ModerationDoc { mods: vec![modder], bans: vec![] };
        write_json(&*kv, MODERATION_DOC_KEY, &doc).await.unwrap();

        let session = session_for(modder);
        assert!(moderation.require_role(&session, MinRole::Mod).await.is_ok());
        let err = moderation.require_role(&session, MinRole::Owner).await.unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn anonymous_session_is_forbidden() {
        let (moderation, _, _, _) = fixture();
        let session = SessionRecord::new(Utc::now());
        let err = moderation.require_role(&session, MinRole::Mod).await.unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }
}
