use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::{
    error::AppResult,
    store::{KeyValueStore, StoreKey},
};

/// Durable store writing one JSON file per key
///
/// Expiry is not supported; `ttl` is ignored.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &StoreKey) -> PathBuf {
        let name = key.to_string().replace(':', "_");
        self.dir.join(format!("{}.json", name))
    }
}

#[async_trait::async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &StoreKey) -> AppResult<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &StoreKey, value: String, _ttl: Option<u64>) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.path_for(key), value).await?;
        tracing::debug!(key = %key, dir = %self.dir.display(), "Stored value on disk");
        Ok(())
    }
}
