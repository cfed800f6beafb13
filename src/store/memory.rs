use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::{
    error::AppResult,
    store::{KeyValueStore, StoreKey},
};

struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

/// In-process store, used when no Redis URL is configured
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &StoreKey) -> AppResult<Option<String>> {
        let entries = self.entries.read().await;
        let value = entries
            .get(&key.to_string())
            .filter(|entry| entry.expires_at.map_or(true, |at| at > Utc::now()))
            .map(|entry| entry.value.clone());
        Ok(value)
    }

    async fn set(&self, key: &StoreKey, value: String, ttl: Option<u64>) -> AppResult<()> {
        // A ttl too large to represent never expires.
        let expires_at = ttl.and_then(|secs| {
            i64::try_from(secs)
                .ok()
                .and_then(Duration::try_seconds)
                .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        });
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_miss() {
        let store = MemoryStore::new();
        assert_eq!(store.get(&StoreKey::Recommendations).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let store = MemoryStore::new();
        store
            .set(&StoreKey::Recommendations, "[1]".to_string(), Some(60))
            .await
            .unwrap();

        assert_eq!(
            store.get(&StoreKey::Recommendations).await.unwrap(),
            Some("[1]".to_string())
        );
        assert_eq!(store.get(&StoreKey::SavedList).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let store = MemoryStore::new();
        store
            .set(&StoreKey::Recommendations, "[1]".to_string(), Some(0))
            .await
            .unwrap();

        assert_eq!(store.get(&StoreKey::Recommendations).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_oversized_ttl_never_expires() {
        let store = MemoryStore::new();
        store
            .set(&StoreKey::Recommendations, "[1]".to_string(), Some(u64::MAX))
            .await
            .unwrap();
        store
            .set(&StoreKey::SavedList, "[2]".to_string(), Some(i64::MAX as u64))
            .await
            .unwrap();

        assert_eq!(
            store.get(&StoreKey::Recommendations).await.unwrap(),
            Some("[1]".to_string())
        );
        assert_eq!(
            store.get(&StoreKey::SavedList).await.unwrap(),
            Some("[2]".to_string())
        );
    }

    #[tokio::test]
    async fn test_overwrite() {
        let store = MemoryStore::new();
        store
            .set(&StoreKey::SavedList, "old".to_string(), None)
            .await
            .unwrap();
        store
            .set(&StoreKey::SavedList, "new".to_string(), None)
            .await
            .unwrap();

        assert_eq!(
            store.get(&StoreKey::SavedList).await.unwrap(),
            Some("new".to_string())
        );
    }
}
