//! Key/value storage backends for the local wishlist copy.
//!
//! Values are raw strings, exactly like browser `localStorage`: the store
//! decides how to encode them. Three backends are provided:
//!
//! - [`SessionStorage`] - per-browser storage for the HTTP service
//! - [`FileStorage`] - a JSON file acting as device storage for the CLI
//! - [`MemoryStorage`] - in-process map, used by tests

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tower_sessions::Session;

/// Errors raised by storage backends.
///
/// The wishlist store treats all of these as "no usable value" on read and
/// logs them on write.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem access failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file is not a JSON object of strings.
    #[error("Corrupt storage file: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// Session load or save failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Storage cannot be used at all (e.g. a poisoned lock).
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// A string key/value store.
pub trait WishlistStorage: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn read(&self, key: &str)
    -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Replace the value stored under `key`.
    fn write(
        &self,
        key: &str,
        value: String,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

// =============================================================================
// MemoryStorage
// =============================================================================

/// In-process storage. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.values
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))
    }
}

impl WishlistStorage for MemoryStorage {
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn write(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.lock()?.insert(key.to_owned(), value);
        Ok(())
    }
}

// =============================================================================
// FileStorage
// =============================================================================

/// Device storage backed by a JSON object file (`{ "<key>": "<value>" }`).
///
/// A missing file reads as empty. Writes go through a temporary file and a
/// rename so a crash never leaves a half-written store behind. Concurrent
/// writers are not coordinated: the last write wins.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<HashMap<String, String>, StorageError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(HashMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl WishlistStorage for FileStorage {
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load().await?.remove(key))
    }

    async fn write(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut values = match self.load().await {
            Ok(values) => values,
            Err(StorageError::Corrupt(e)) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Overwriting corrupt storage file"
                );
                HashMap::new()
            }
            Err(e) => return Err(e),
        };
        values.insert(key.to_owned(), value);

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(&values)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

// =============================================================================
// SessionStorage
// =============================================================================

/// Per-browser storage backed by the request's session.
#[derive(Debug, Clone)]
pub struct SessionStorage {
    session: Session,
}

impl SessionStorage {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

impl WishlistStorage for SessionStorage {
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.session.get::<String>(key).await?)
    }

    async fn write(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.session.insert(key, value).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        assert!(storage.read("k").await.unwrap().is_none());
        storage.write("k", "[1]".to_string()).await.unwrap();
        assert_eq!(storage.read("k").await.unwrap().as_deref(), Some("[1]"));
    }

    #[tokio::test]
    async fn test_memory_storage_clones_share_state() {
        let storage = MemoryStorage::new();
        let other = storage.clone();
        storage.write("k", "v".to_string()).await.unwrap();
        assert_eq!(other.read("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_file_storage_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("absent.json"));
        assert!(storage.read("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_storage_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested/store.json"));
        storage.write("a", "1".to_string()).await.unwrap();
        storage.write("b", "2".to_string()).await.unwrap();
        assert_eq!(storage.read("a").await.unwrap().as_deref(), Some("1"));
        assert_eq!(storage.read("b").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_file_storage_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();
        let storage = FileStorage::new(&path);

        assert!(matches!(
            storage.read("k").await,
            Err(StorageError::Corrupt(_))
        ));

        // A write replaces the corrupt file
        storage.write("k", "[3]".to_string()).await.unwrap();
        assert_eq!(storage.read("k").await.unwrap().as_deref(), Some("[3]"));
    }
}
