//! Typed read/write helpers over the raw KV port.

use domains::{DomainError, KvStore, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub(crate) async fn read_json<T: DeserializeOwned>(kv: &dyn KvStore, key: &str) -> Result<Option<T>> {
    let Some(raw) = kv.get(key).await? else {
        return Ok(None);
    };
    let value = serde_json::from_str(&raw)
        .map_err(|err| DomainError::StorageUnavailable(format!("corrupt record at {key}: {err}")))?;
    Ok(Some(value))
}

pub(crate) async fn write_json<T: Serialize>(kv: &dyn KvStore, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value).map_err(DomainError::storage)?;
    kv.put(key, &raw, None).await
}
