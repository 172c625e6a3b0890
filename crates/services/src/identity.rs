//! # Identity Resolver
//!
//! Maps a (platform, platform-native id) pair to one canonical account id,
//! stable forever once created.

use std::sync::Arc;

use domains::{DomainError, KvStore, Platform, Result};
use uuid::Uuid;

fn forward_key(platform: Platform, native_id: &str) -> String {
    format!("map:{platform}:{native_id}")
}

fn reverse_key(account_id: Uuid) -> String {
    format!("rev:{account_id}")
}

pub struct IdentityResolver {
    kv: Arc<dyn KvStore>,
}

impl IdentityResolver {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Returns the canonical account id for a platform-native id,
    /// allocating one on first contact.
    ///
    /// First resolution wins and is permanent. A concurrent duplicate
    /// allocation for the same pair is accepted as a rare zero-balance
    /// duplicate account rather than guarded by a lock.
    pub async fn resolve(
        &self,
        platform: Platform,
        native_id: &str,
        preferred: Option<Uuid>,
    ) -> Result<Uuid> {
        let key = forward_key(platform, native_id);
        if let Some(existing) = self.kv.get(&key).await? {
            return Uuid::parse_str(existing.trim()).map_err(|_| {
                DomainError::StorageUnavailable(format!("corrupt identity mapping at {key}"))
            });
        }

        let mut account_id = None;
        if let Some(id) = preferred {
            // A preferred id is honored only while nothing else claims it.
            if self.kv.get(&reverse_key(id)).await?.is_none() {
                account_id = Some(id);
            }
        }
        let account_id = account_id.unwrap_or_else(Uuid::new_v4);

        self.kv.put(&key, &account_id.to_string(), None).await?;
        self.kv
            .put(&reverse_key(account_id), &format!("{platform}:{native_id}"), None)
            .await?;
        Ok(account_id)
    }

    /// Reverse lookup: which platform identity first created this account.
    pub async fn origin(&self, account_id: Uuid) -> Result<Option<String>> {
        self.kv.get(&reverse_key(account_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MemoryKv;
    use domains::MockKvStore;

    #[tokio::test]
    async fn resolve_returns_existing_mapping_unchanged() {
        let id = Uuid::new_v4();
        let stored = id.to_string();
        let mut kv = MockKvStore::new();
        kv.expect_get()
            .withf(|key| key == "map:twitch:u100")
            .returning(move |_| Ok(Some(stored.clone())));
        kv.expect_put().never();

        let resolver = IdentityResolver::new(Arc::new(kv));
        let resolved = resolver.resolve(Platform::Twitch, "u100", None).await.unwrap();
        assert_eq!(resolved, id);
    }

    #[tokio::test]
    async fn resolve_allocates_once_and_persists_both_directions() {
        let kv = Arc::new(MemoryKv::default());
        let resolver = IdentityResolver::new(kv.clone());

        let first = resolver.resolve(Platform::Ember, "alice", None).await.unwrap();
        let second = resolver.resolve(Platform::Ember, "alice", None).await.unwrap();
        assert_eq!(first, second);

        let origin = resolver.origin(first).await.unwrap();
        assert_eq!(origin.as_deref(), Some("ember:alice"));
    }

    #[tokio::test]
    async fn distinct_native_ids_get_distinct_accounts() {
        let resolver = IdentityResolver::new(Arc::new(MemoryKv::default()));
        let a = resolver.resolve(Platform::Youtube, "chan-a", None).await.unwrap();
        let b = resolver.resolve(Platform::Youtube, "chan-b", None).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn preferred_id_is_honored_unless_already_taken() {
        let resolver = IdentityResolver::new(Arc::new(MemoryKv::default()));
        let preferred = Uuid::new_v4();

        let got = resolver.resolve(Platform::Twitch, "t1", Some(preferred)).await.unwrap();
        assert_eq!(got, preferred);

        let other = resolver.resolve(Platform::Twitch, "t2", Some(preferred)).await.unwrap();
        assert_ne!(other, preferred);
    }
}
