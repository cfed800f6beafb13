use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Display;

use crate::error::{AppError, AppResult};

pub mod file;
pub mod memory;
pub mod redis;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use redis::{create_redis_client, RedisStore, StoreWriterHandle};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// Most recent recommendation list
    Recommendations,
    /// The reader's saved, hand-ordered book list
    SavedList,
}

impl Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKey::Recommendations => write!(f, "recs:latest"),
            StoreKey::SavedList => write!(f, "saved:list"),
        }
    }
}

/// String key-value storage used by the API layer for caching and persistence
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &StoreKey) -> AppResult<Option<String>>;

    /// Stores a value. `ttl` is in seconds; `None` keeps the value indefinitely.
    async fn set(&self, key: &StoreKey, value: String, ttl: Option<u64>) -> AppResult<()>;
}

/// Reads and decodes a JSON value
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &StoreKey,
) -> AppResult<Option<T>> {
    match store.get(key).await? {
        Some(json) => {
            let data = serde_json::from_str(&json).map_err(|e| {
                AppError::Internal(format!("Stored value deserialization error: {}", e))
            })?;
            Ok(Some(data))
        }
        None => Ok(None),
    }
}

/// Encodes and stores a JSON value
pub async fn set_json<T: Serialize + Sync>(
    store: &dyn KeyValueStore,
    key: &StoreKey,
    value: &T,
    ttl: Option<u64>,
) -> AppResult<()> {
    let json = serde_json::to_string(value)?;
    store.set(key, json, ttl).await
}
