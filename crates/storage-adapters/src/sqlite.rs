//! # SQLite Adapter
//!
//! `sqlx`-backed implementations of `PointsStore` and `KvStore`. The
//! conditional debit is a single `UPDATE .. WHERE balance_total >= ?1
//! RETURNING balance_total`, the one place the schema carries the
//! atomicity contract. Timestamps are unix milliseconds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{
    BanKind, BanState, DomainError, EventType, KvStore, PointEvent, PointsSnapshot, PointsStore,
    Result,
};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use uuid::Uuid;

fn storage_err(err: sqlx::Error) -> DomainError {
    DomainError::StorageUnavailable(err.to_string())
}

fn millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| DomainError::StorageUnavailable(format!("bad stored timestamp: {ms}")))
}

pub struct SqlitePointsStore {
    pool: SqlitePool,
}

impl SqlitePointsStore {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new().max_connections(5).connect(url).await?;
        Self::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// A private in-memory database pinned to one connection, for tests.
    pub async fn connect_in_memory() -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new().max_connections(1).connect("sqlite::memory:").await?;
        Self::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    async fn init_schema(pool: &SqlitePool) -> anyhow::Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS user_points (
                user_id        TEXT PRIMARY KEY,
                display_name   TEXT NOT NULL,
                balance_total  INTEGER NOT NULL DEFAULT 0,
                messages_count INTEGER NOT NULL DEFAULT 0,
                watch_minutes  INTEGER NOT NULL DEFAULT 0,
                is_banned      INTEGER NOT NULL DEFAULT 0,
                ban_until      INTEGER,
                ban_reason     TEXT,
                ban_kind       TEXT,
                created_at     INTEGER NOT NULL,
                updated_at     INTEGER NOT NULL
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS point_events (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id       TEXT NOT NULL,
                delta         INTEGER NOT NULL,
                type          TEXT NOT NULL,
                reason        TEXT,
                source        TEXT,
                created_at    INTEGER NOT NULL,
                balance_after INTEGER NOT NULL
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_point_events_user ON point_events (user_id, id)",
        )
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl PointsStore for SqlitePointsStore {
    async fn ensure_account<'a>(
        &self,
        account_id: Uuid,
        display_name: Option<&'a str>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO user_points (user_id, display_name, created_at, updated_at)
             VALUES (?1, COALESCE(?2, 'Wanderer'), ?3, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                 display_name = COALESCE(?2, user_points.display_name),
                 updated_at   = ?3",
        )
        .bind(account_id.to_string())
        .bind(display_name)
        .bind(millis(now))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn snapshot(&self, account_id: Uuid) -> Result<Option<PointsSnapshot>> {
        let row = sqlx::query(
            "SELECT balance_total, messages_count, watch_minutes
             FROM user_points WHERE user_id = ?1",
        )
        .bind(account_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(row.map(|row| PointsSnapshot {
            balance: row.get("balance_total"),
            messages_count: row.get("messages_count"),
            watch_minutes: row.get("watch_minutes"),
        }))
    }

    async fn apply_credit(
        &self,
        account_id: Uuid,
        new_balance: i64,
        inc_messages: i64,
        inc_watch: i64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE user_points SET
                 balance_total  = ?2,
                 messages_count = messages_count + ?3,
                 watch_minutes  = watch_minutes + ?4,
                 updated_at     = ?5
             WHERE user_id = ?1",
        )
        .bind(account_id.to_string())
        .bind(new_balance)
        .bind(inc_messages)
        .bind(inc_watch)
        .bind(millis(now))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn debit_if_affordable(
        &self,
        account_id: Uuid,
        cost: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>> {
        let row = sqlx::query(
            "UPDATE user_points SET balance_total = balance_total - ?1, updated_at = ?2
             WHERE user_id = ?3 AND balance_total >= ?1
             RETURNING balance_total",
        )
        .bind(cost)
        .bind(millis(now))
        .bind(account_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(row.map(|row| row.get("balance_total")))
    }

    async fn seed_balance(
        &self,
        account_id: Uuid,
        opening: i64,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO user_points (user_id, display_name, balance_total, created_at, updated_at)
             VALUES (?1, 'Wanderer', ?2, ?3, ?3)
             ON CONFLICT(user_id) DO NOTHING",
        )
        .bind(account_id.to_string())
        .bind(opening)
        .bind(millis(now))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn append_event(&self, event: &PointEvent) -> Result<()> {
        sqlx::query(
            "INSERT INTO point_events (user_id, delta, type, reason, source, created_at, balance_after)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(event.account_id.to_string())
        .bind(event.delta)
        .bind(event.event_type.as_str())
        .bind(event.reason.as_deref())
        .bind(event.source.as_deref())
        .bind(millis(event.created_at))
        .bind(event.balance_after)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn events_for(&self, account_id: Uuid) -> Result<Vec<PointEvent>> {
        let rows = sqlx::query(
            "SELECT delta, type, reason, source, created_at, balance_after
             FROM point_events WHERE user_id = ?1 ORDER BY id ASC",
        )
        .bind(account_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.into_iter()
            .map(|row| {
                let event_type: EventType = row.get::<String, _>("type").parse()?;
                Ok(PointEvent {
                    account_id,
                    delta: row.get("delta"),
                    event_type,
                    reason: row.get("reason"),
                    source: row.get("source"),
                    created_at: from_millis(row.get("created_at"))?,
                    balance_after: row.get("balance_after"),
                })
            })
            .collect()
    }

    async fn set_ban(
        &self,
        account_id: Uuid,
        until: Option<DateTime<Utc>>,
        reason: &str,
        kind: BanKind,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE user_points SET is_banned = 1, ban_until = ?2, ban_reason = ?3, ban_kind = ?4
             WHERE user_id = ?1",
        )
        .bind(account_id.to_string())
        .bind(until.map(millis))
        .bind(reason)
        .bind(kind.as_str())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn ban_state(&self, account_id: Uuid) -> Result<Option<BanState>> {
        let row = sqlx::query(
            "SELECT is_banned, ban_until, ban_reason, ban_kind
             FROM user_points WHERE user_id = ?1",
        )
        .bind(account_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let until = match row.get::<Option<i64>, _>("ban_until") {
            Some(ms) => Some(from_millis(ms)?),
            None => None,
        };
        let kind = match row.get::<Option<String>, _>("ban_kind") {
            Some(raw) => Some(raw.parse::<BanKind>()?),
            None => None,
        };
        Ok(Some(BanState {
            is_banned: row.get::<i64, _>("is_banned") != 0,
            until,
            reason: row.get("ban_reason"),
            kind,
        }))
    }

    async fn clear_ban(&self, account_id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE user_points SET is_banned = 0, ban_until = NULL, ban_reason = NULL, ban_kind = NULL
             WHERE user_id = ?1",
        )
        .bind(account_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }
}

pub struct SqliteKvStore {
    pool: SqlitePool,
}

impl SqliteKvStore {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new().max_connections(5).connect(url).await?;
        Self::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// A private in-memory database pinned to one connection, for tests.
    pub async fn connect_in_memory() -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new().max_connections(1).connect("sqlite::memory:").await?;
        Self::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    async fn init_schema(pool: &SqlitePool) -> anyhow::Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS kv (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                expires_at INTEGER
            )",
        )
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value, expires_at FROM kv WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        if let Some(expires_at) = row.get::<Option<i64>, _>("expires_at") {
            if expires_at <= millis(Utc::now()) {
                sqlx::query("DELETE FROM kv WHERE key = ?1")
                    .bind(key)
                    .execute(&self.pool)
                    .await
                    .map_err(storage_err)?;
                return Ok(None);
            }
        }
        Ok(Some(row.get("value")))
    }

    async fn put(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<()> {
        let expires_at = ttl_seconds.map(|secs| millis(Utc::now()) + (secs as i64) * 1000);
        sqlx::query("INSERT OR REPLACE INTO kv (key, value, expires_at) VALUES (?1, ?2, ?3)")
            .bind(key)
            .bind(value)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT key FROM kv
             WHERE key LIKE ?1 || '%' AND (expires_at IS NULL OR expires_at > ?2)
             ORDER BY key",
        )
        .bind(prefix)
        .bind(millis(Utc::now()))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(rows.into_iter().map(|row| row.get("key")).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn conditional_debit_charges_only_when_affordable() {
        let store = SqlitePointsStore::connect_in_memory().await.unwrap();
        let user = Uuid::new_v4();
        let now = Utc::now();

        store.ensure_account(user, Some("Sable"), now).await.unwrap();
        store.apply_credit(user, 100, 0, 0, now).await.unwrap();

        let after = store.debit_if_affordable(user, 60, now).await.unwrap();
        assert_eq!(after, Some(40));

        // 60 > 40 left: the update matches no row and changes nothing.
        let denied = store.debit_if_affordable(user, 60, now).await.unwrap();
        assert_eq!(denied, None);
        let snap = store.snapshot(user).await.unwrap().unwrap();
        assert_eq!(snap.balance, 40);
    }

    #[tokio::test]
    async fn debit_on_missing_row_is_denied() {
        let store = SqlitePointsStore::connect_in_memory().await.unwrap();
        let denied = store.debit_if_affordable(Uuid::new_v4(), 1, Utc::now()).await.unwrap();
        assert_eq!(denied, None);
    }

    #[tokio::test]
    async fn seed_balance_inserts_once_and_never_overwrites() {
        let store = SqlitePointsStore::connect_in_memory().await.unwrap();
        let user = Uuid::new_v4();
        let now = Utc::now();

        assert!(store.seed_balance(user, 500, now).await.unwrap());
        assert!(!store.seed_balance(user, 999, now).await.unwrap());
        assert_eq!(store.snapshot(user).await.unwrap().unwrap().balance, 500);
    }

    #[tokio::test]
    async fn ensure_account_keeps_display_name_when_not_given() {
        let store = SqlitePointsStore::connect_in_memory().await.unwrap();
        let user = Uuid::new_v4();
        let now = Utc::now();

        store.ensure_account(user, Some("Sable"), now).await.unwrap();
        store.ensure_account(user, None, now).await.unwrap();

        let row = sqlx::query("SELECT display_name FROM user_points WHERE user_id = ?1")
            .bind(user.to_string())
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(row.get::<String, _>("display_name"), "Sable");
    }

    #[tokio::test]
    async fn events_round_trip_in_creation_order() {
        let store = SqlitePointsStore::connect_in_memory().await.unwrap();
        let user = Uuid::new_v4();
        let now = Utc::now();

        for (delta, after) in [(100, 100), (-60, 40)] {
            store
                .append_event(&PointEvent {
                    account_id: user,
                    delta,
                    event_type: if delta > 0 { EventType::Message } else { EventType::Purchase },
                    reason: Some("test".into()),
                    source: None,
                    created_at: now,
                    balance_after: after,
                })
                .await
                .unwrap();
        }

        let events = store.events_for(user).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].delta, 100);
        assert_eq!(events[1].delta, -60);
        assert_eq!(events[1].event_type, EventType::Purchase);
    }

    #[tokio::test]
    async fn ban_columns_round_trip_and_clear() {
        let store = SqlitePointsStore::connect_in_memory().await.unwrap();
        let user = Uuid::new_v4();
        let now = Utc::now();
        store.ensure_account(user, None, now).await.unwrap();

        let until = now + chrono::Duration::minutes(5);
        store.set_ban(user, Some(until), "Automod: used forbidden word (grief)", BanKind::AutomodBan).await.unwrap();

        let state = store.ban_state(user).await.unwrap().unwrap();
        assert!(state.is_banned);
        assert_eq!(state.kind, Some(BanKind::AutomodBan));
        assert_eq!(state.until.map(millis), Some(millis(until)));

        store.clear_ban(user).await.unwrap();
        let state = store.ban_state(user).await.unwrap().unwrap();
        assert!(!state.is_banned);
        assert!(state.kind.is_none());
    }

    #[tokio::test]
    async fn kv_ttl_expires_lazily() {
        let kv = SqliteKvStore::connect_in_memory().await.unwrap();
        kv.put("throttle:x", "1", Some(0)).await.unwrap();
        assert!(kv.get("throttle:x").await.unwrap().is_none());

        kv.put("map:twitch:1", "abc", None).await.unwrap();
        assert_eq!(kv.get("map:twitch:1").await.unwrap().as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn kv_list_matches_prefix() {
        let kv = SqliteKvStore::connect_in_memory().await.unwrap();
        kv.put("session:a", "{}", None).await.unwrap();
        kv.put("session:b", "{}", None).await.unwrap();
        kv.put("profile:c", "{}", None).await.unwrap();

        let keys = kv.list("session:").await.unwrap();
        assert_eq!(keys, vec!["session:a".to_string(), "session:b".to_string()]);
    }
}
