//! Secure key/value storage for credentials and other durable client state.
//!
//! The same store backs the credential vault and the offline queue, so
//! every implementation must make single-key mutations atomic and support
//! compare-and-swap on a key's value.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, RwLock};

use crate::error::{Error, ErrorKind, Result};

/// Store key for the bearer access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Store key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
/// Store key for the cached signed-in user.
pub const USER_DATA_KEY: &str = "user_data";
/// Store key for the serialized offline queue.
pub const OFFLINE_QUEUE_KEY: &str = "offline_queue";

/// Durable string storage keyed by name.
#[async_trait]
pub trait SecureStore: Send + Sync + std::fmt::Debug {
    /// Read a value.
    async fn read(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    async fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Replace the value of `key` with `new` only if it currently equals
    /// `expected` (`None` meaning absent). `new = None` deletes the key.
    ///
    /// Returns whether the swap happened.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: Option<&str>,
    ) -> Result<bool>;
}

/// In-memory store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> Error {
        Error::new(ErrorKind::Storage("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl SecureStore for MemoryStore {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.read().map_err(|_| Self::poisoned())?;
        Ok(values.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.write().map_err(|_| Self::poisoned())?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut values = self.values.write().map_err(|_| Self::poisoned())?;
        values.remove(key);
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: Option<&str>,
    ) -> Result<bool> {
        let mut values = self.values.write().map_err(|_| Self::poisoned())?;
        if values.get(key).map(String::as_str) != expected {
            return Ok(false);
        }
        match new {
            Some(value) => values.insert(key.to_string(), value.to_string()),
            None => values.remove(key),
        };
        Ok(true)
    }
}

/// File-based store: one JSON file per key, written atomically.
///
/// All instances pointing at the same directory share one write lock, so
/// compare-and-swap is atomic within the process.
#[derive(Debug, Clone)]
pub struct FileSecureStore {
    base_path: PathBuf,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl FileSecureStore {
    /// Create a file store at the default path.
    ///
    /// Default path: `~/.outpost/store/`
    pub fn new() -> Result<Self> {
        Ok(Self::with_path(default_store_dir()?))
    }

    /// Create a file store at a custom path.
    pub fn with_path(path: impl AsRef<Path>) -> Self {
        let base_path = path.as_ref().to_path_buf();
        let lock = directory_lock(&base_path);
        Self { base_path, lock }
    }

    /// Directory holding the store files.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Get the file path for a key.
    fn value_path(&self, key: &str) -> PathBuf {
        // Sanitize the key to create a safe filename
        let safe_key = key
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect::<String>();

        self.base_path.join(format!("{}.json", safe_key))
    }

    async fn read_unlocked(&self, key: &str) -> Result<Option<String>> {
        let path = self.value_path(key);
        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let stored: StoredValue = serde_json::from_str(&json)?;
        Ok(Some(stored.value))
    }

    async fn write_unlocked(&self, key: &str, value: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.base_path).await?;

        let path = self.value_path(key);
        let tmp_path = path.with_extension("json.tmp");
        let stored = StoredValue {
            value: value.to_string(),
            stored_at: chrono::Utc::now(),
        };

        let json = serde_json::to_string_pretty(&stored)?;
        tokio::fs::write(&tmp_path, json).await?;

        // Set restrictive permissions on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            tokio::fs::set_permissions(&tmp_path, perms).await?;
        }

        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(())
    }

    async fn delete_unlocked(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.value_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl SecureStore for FileSecureStore {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().await;
        self.read_unlocked(key).await
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.write_unlocked(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.delete_unlocked(key).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: Option<&str>,
    ) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let current = self.read_unlocked(key).await?;
        if current.as_deref() != expected {
            return Ok(false);
        }
        match new {
            Some(value) => self.write_unlocked(key, value).await?,
            None => self.delete_unlocked(key).await?,
        }
        Ok(true)
    }
}

/// Value with storage metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredValue {
    value: String,
    stored_at: chrono::DateTime<chrono::Utc>,
}

/// One lock per store directory, shared by every instance in the process.
fn directory_lock(path: &Path) -> Arc<tokio::sync::Mutex<()>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>> =
        OnceLock::new();

    let mut locks = LOCKS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(|e| e.into_inner());
    locks.entry(path.to_path_buf()).or_default().clone()
}

/// Get the default store directory.
pub fn default_store_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| Error::new(ErrorKind::Config("Could not find home directory".to_string())))?;

    Ok(home.join(".outpost").join("store"))
}
