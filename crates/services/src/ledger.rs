//! # Ledger
//!
//! The single source of truth for embers. Balance is never set directly:
//! credits go through `credit`, spends through the atomic conditional
//! debit, and every effective change appends an immutable `PointEvent`.

use std::sync::Arc;

use chrono::Utc;
use domains::{
    DomainError, EventType, KvStore, Platform, PointEvent, PointsStore, Result, INFINITE_POINTS,
};
use uuid::Uuid;

/// Embers credited for one chat message, per platform.
pub fn message_points(platform: Platform) -> i64 {
    match platform {
        Platform::Twitch | Platform::Youtube => 15,
        Platform::Ember => 25,
    }
}

/// A second message from the same account inside this window earns nothing.
pub const MESSAGE_THROTTLE_MS: i64 = 10_000;

/// Throttle markers garbage-collect themselves well after the window.
const THROTTLE_MARKER_TTL_SECONDS: u64 = 60;

/// Balances observed around one mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceChange {
    pub before: i64,
    pub after: i64,
}

pub struct Ledger {
    points: Arc<dyn PointsStore>,
    kv: Arc<dyn KvStore>,
    /// The distinguished owner account whose balance is always the
    /// sentinel and never actually spendable.
    infinite_account: Uuid,
}

impl Ledger {
    pub fn new(points: Arc<dyn PointsStore>, kv: Arc<dyn KvStore>, infinite_account: Uuid) -> Self {
        Self { points, kv, infinite_account }
    }

    /// Current balance; a missing row reads as zero.
    pub async fn balance(&self, account_id: Uuid) -> Result<i64> {
        if account_id == self.infinite_account {
            return Ok(INFINITE_POINTS);
        }
        Ok(self.points.snapshot(account_id).await?.map(|s| s.balance).unwrap_or(0))
    }

    /// Upserts the account row, refreshing the display name when known.
    pub async fn ensure_account(&self, account_id: Uuid, display_name: Option<&str>) -> Result<()> {
        self.points.ensure_account(account_id, display_name, Utc::now()).await
    }

    /// Applies a signed delta. A negative result clamps to zero rather
    /// than erroring, and the logged delta is the effective one, so
    /// replaying events reproduces the stored balance exactly. A no-op
    /// change appends nothing.
    pub async fn credit(
        &self,
        account_id: Uuid,
        delta: i64,
        event_type: EventType,
        reason: Option<&str>,
        source: Option<&str>,
    ) -> Result<BalanceChange> {
        let now = Utc::now();
        self.points.ensure_account(account_id, None, now).await?;

        if account_id == self.infinite_account {
            if delta != 0 {
                self.points
                    .append_event(&PointEvent {
                        account_id,
                        delta,
                        event_type,
                        reason: reason.map(str::to_string),
                        source: source.map(str::to_string),
                        created_at: now,
                        balance_after: INFINITE_POINTS,
                    })
                    .await?;
            }
            return Ok(BalanceChange { before: INFINITE_POINTS, after: INFINITE_POINTS });
        }

        let before = self.points.snapshot(account_id).await?.unwrap_or_default().balance;
        let after = (before + delta).max(0);
        let inc_messages = i64::from(event_type == EventType::Message);
        let inc_watch = i64::from(event_type == EventType::Watch);
        self.points.apply_credit(account_id, after, inc_messages, inc_watch, now).await?;

        let effective = after - before;
        if effective != 0 {
            self.points
                .append_event(&PointEvent {
                    account_id,
                    delta: effective,
                    event_type,
                    reason: reason.map(str::to_string),
                    source: source.map(str::to_string),
                    created_at: now,
                    balance_after: after,
                })
                .await?;
        }
        Ok(BalanceChange { before, after })
    }

    /// Checks affordability and decrements in one indivisible storage step,
    /// returning the post-charge balance. The infinite account always
    /// succeeds without mutating its sentinel. The audit event after a
    /// successful charge is best-effort: a failed append is logged and
    /// never rolls back the charge.
    pub async fn debit_if_affordable(
        &self,
        account_id: Uuid,
        cost: i64,
        event_type: EventType,
        reason: Option<&str>,
        source: Option<&str>,
    ) -> Result<i64> {
        if cost < 0 {
            return Err(DomainError::InvalidInput(format!("negative debit: {cost}")));
        }
        if account_id == self.infinite_account {
            return Ok(INFINITE_POINTS);
        }
        let now = Utc::now();
        let Some(after) = self.points.debit_if_affordable(account_id, cost, now).await? else {
            return Err(DomainError::InsufficientFunds(cost));
        };
        if cost != 0 {
            let event = PointEvent {
                account_id,
                delta: -cost,
                event_type,
                reason: reason.map(str::to_string),
                source: source.map(str::to_string),
                created_at: now,
                balance_after: after,
            };
            if let Err(err) = self.points.append_event(&event).await {
                tracing::warn!(%account_id, %err, "debit charged but event append failed");
            }
        }
        Ok(after)
    }

    /// Credits message points for one chat message, at most once per
    /// throttle window per account. The marker is a best-effort rate
    /// limiter, not a strict exactly-once guarantee.
    pub async fn award_message_points(
        &self,
        account_id: Uuid,
        platform: Platform,
    ) -> Result<Option<BalanceChange>> {
        let amount = message_points(platform);
        let marker = format!("points_throttle:{account_id}");
        let now_ms = Utc::now().timestamp_millis();

        if let Some(raw) = self.kv.get(&marker).await? {
            if raw.trim().parse::<i64>().is_ok_and(|last| now_ms - last < MESSAGE_THROTTLE_MS) {
                return Ok(None);
            }
        }
        self.kv.put(&marker, &now_ms.to_string(), Some(THROTTLE_MARKER_TTL_SECONDS)).await?;

        let change = self
            .credit(account_id, amount, EventType::Message, Some("message"), Some(platform.as_str()))
            .await?;
        Ok(Some(change))
    }

    /// Full audit history for one account, in creation order.
    pub async fn history(&self, account_id: Uuid) -> Result<Vec<PointEvent>> {
        self.points.events_for(account_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MemoryKv, MemoryPoints};

    fn fixture() -> (Ledger, Arc<MemoryPoints>, Uuid) {
        let points = Arc::new(MemoryPoints::default());
        let kv = Arc::new(MemoryKv::default());
        let infinite = Uuid::new_v4();
        (Ledger::new(points.clone(), kv, infinite), points, infinite)
    }

    #[tokio::test]
    async fn credit_accumulates_and_replay_matches_balance() {
        let (ledger, _, _) = fixture();
        let user = Uuid::new_v4();

        ledger.credit(user, 100, EventType::Message, Some("message"), Some("twitch")).await.unwrap();
        ledger.credit(user, 50, EventType::Bonus, Some("bonus"), None).await.unwrap();
        ledger.debit_if_affordable(user, 30, EventType::Redeem, Some("redeem"), None).await.unwrap();

        let balance = ledger.balance(user).await.unwrap();
        assert_eq!(balance, 120);

        let replayed: i64 = ledger.history(user).await.unwrap().iter().map(|e| e.delta).sum();
        assert_eq!(replayed, balance);
    }

    #[tokio::test]
    async fn negative_credit_clamps_to_zero_with_effective_delta() {
        let (ledger, _, _) = fixture();
        let user = Uuid::new_v4();

        ledger.credit(user, 40, EventType::Message, None, None).await.unwrap();
        let change = ledger.credit(user, -250, EventType::ModAdjust, Some("mod_penalty"), None).await.unwrap();
        assert_eq!(change, BalanceChange { before: 40, after: 0 });

        let events = ledger.history(user).await.unwrap();
        assert_eq!(events.last().unwrap().delta, -40);
        let replayed: i64 = events.iter().map(|e| e.delta).sum();
        assert_eq!(replayed, 0);
    }

    #[tokio::test]
    async fn zero_effective_delta_is_not_logged() {
        let (ledger, _, _) = fixture();
        let user = Uuid::new_v4();

        ledger.credit(user, 0, EventType::Bonus, None, None).await.unwrap();
        // Clamped from an empty balance: requested -10, effective 0.
        ledger.credit(user, -10, EventType::ModAdjust, None, None).await.unwrap();

        assert!(ledger.history(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn infinite_account_reports_sentinel_and_always_affords() {
        let (ledger, _, infinite) = fixture();

        assert_eq!(ledger.balance(infinite).await.unwrap(), INFINITE_POINTS);
        let after = ledger
            .debit_if_affordable(infinite, 1_000_000, EventType::Redeem, None, None)
            .await
            .unwrap();
        assert_eq!(after, INFINITE_POINTS);
        assert_eq!(ledger.balance(infinite).await.unwrap(), INFINITE_POINTS);
    }

    #[tokio::test]
    async fn debit_beyond_balance_fails_and_changes_nothing() {
        let (ledger, _, _) = fixture();
        let user = Uuid::new_v4();
        ledger.credit(user, 25, EventType::Message, None, None).await.unwrap();

        let err = ledger
            .debit_if_affordable(user, 26, EventType::Redeem, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InsufficientFunds(26)));
        assert_eq!(ledger.balance(user).await.unwrap(), 25);
        assert_eq!(ledger.history(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn negative_debit_is_rejected() {
        let (ledger, _, _) = fixture();
        let err = ledger
            .debit_if_affordable(Uuid::new_v4(), -5, EventType::Redeem, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn message_award_is_throttled_within_window() {
        let (ledger, _, _) = fixture();
        let user = Uuid::new_v4();

        let first = ledger.award_message_points(user, Platform::Ember).await.unwrap();
        assert!(first.is_some());
        let second = ledger.award_message_points(user, Platform::Ember).await.unwrap();
        assert!(second.is_none());

        assert_eq!(ledger.balance(user).await.unwrap(), message_points(Platform::Ember));
    }

    #[tokio::test]
    async fn message_credit_bumps_message_counter() {
        let (ledger, points, _) = fixture();
        let user = Uuid::new_v4();

        ledger.credit(user, 15, EventType::Message, None, None).await.unwrap();
        ledger.credit(user, 15, EventType::Message, None, None).await.unwrap();
        ledger.credit(user, 5, EventType::Watch, None, None).await.unwrap();

        let snap = domains::PointsStore::snapshot(&*points, user).await.unwrap().unwrap();
        assert_eq!(snap.messages_count, 2);
        assert_eq!(snap.watch_minutes, 1);
        assert_eq!(snap.balance, 35);
    }
}
