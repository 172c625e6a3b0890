//! In-memory port fakes for service unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{
    BanKind, BanState, DomainError, KvStore, PointEvent, PointsSnapshot, PointsStore, Result,
};
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str, _ttl_seconds: Option<u64>) -> Result<()> {
        self.entries.lock().unwrap().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[derive(Clone, Default)]
struct Row {
    display_name: String,
    balance: i64,
    messages_count: i64,
    watch_minutes: i64,
    ban: Option<BanState>,
}

#[derive(Default)]
pub struct MemoryPoints {
    rows: Mutex<HashMap<Uuid, Row>>,
    events: Mutex<Vec<PointEvent>>,
}

#[async_trait]
impl PointsStore for MemoryPoints {
    async fn ensure_account<'a>(
        &self,
        account_id: Uuid,
        display_name: Option<&'a str>,
        _now: DateTime<Utc>,
    ) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .entry(account_id)
            .or_insert_with(|| Row { display_name: "Wanderer".to_string(), ..Row::default() });
        if let Some(name) = display_name {
            row.display_name = name.to_string();
        }
        Ok(())
    }

    async fn snapshot(&self, account_id: Uuid) -> Result<Option<PointsSnapshot>> {
        Ok(self.rows.lock().unwrap().get(&account_id).map(|row| PointsSnapshot {
            balance: row.balance,
            messages_count: row.messages_count,
            watch_minutes: row.watch_minutes,
        }))
    }

    async fn apply_credit(
        &self,
        account_id: Uuid,
        new_balance: i64,
        inc_messages: i64,
        inc_watch: i64,
        _now: DateTime<Utc>,
    ) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(&account_id)
            .ok_or_else(|| DomainError::NotFound("account", account_id.to_string()))?;
        row.balance = new_balance;
        row.messages_count += inc_messages;
        row.watch_minutes += inc_watch;
        Ok(())
    }

    async fn debit_if_affordable(
        &self,
        account_id: Uuid,
        cost: i64,
        _now: DateTime<Utc>,
    ) -> Result<Option<i64>> {
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&account_id) {
            Some(row) if row.balance >= cost => {
                row.balance -= cost;
                Ok(Some(row.balance))
            }
            _ => Ok(None),
        }
    }

    async fn seed_balance(
        &self,
        account_id: Uuid,
        opening: i64,
        _now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(&account_id) {
            return Ok(false);
        }
        rows.insert(
            account_id,
            Row { display_name: "Wanderer".to_string(), balance: opening, ..Row::default() },
        );
        Ok(true)
    }

    async fn append_event(&self, event: &PointEvent) -> Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn events_for(&self, account_id: Uuid) -> Result<Vec<PointEvent>> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn set_ban(
        &self,
        account_id: Uuid,
        until: Option<DateTime<Utc>>,
        reason: &str,
        kind: BanKind,
    ) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows.entry(account_id).or_default();
        row.ban = Some(BanState {
            is_banned: true,
            until,
            reason: Some(reason.to_string()),
            kind: Some(kind),
        });
        Ok(())
    }

    async fn ban_state(&self, account_id: Uuid) -> Result<Option<BanState>> {
        Ok(self.rows.lock().unwrap().get(&account_id).map(|row| {
            row.ban
                .clone()
                .unwrap_or(BanState { is_banned: false, until: None, reason: None, kind: None })
        }))
    }

    async fn clear_ban(&self, account_id: Uuid) -> Result<()> {
        if let Some(row) = self.rows.lock().unwrap().get_mut(&account_id) {
            row.ban = None;
        }
        Ok(())
    }
}
