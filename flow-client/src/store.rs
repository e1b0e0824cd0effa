//! Key-value persistence for client state.
//!
//! Provides a thread-safe [`ClientStore`] shared by the identity, config
//! cache and status components. Values are JSON documents; with a data
//! directory each key is mirrored to `<data_dir>/<key>.json`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::ClientResult;

/// Key of the persisted device identifier.
pub const DEVICE_ID_KEY: &str = "device_id";

/// Key of the identified user.
pub const USER_KEY: &str = "user";

/// Key of the cached flow configuration.
pub const CONFIG_CACHE_KEY: &str = "flow_config";

/// Key of the onboarding completion status.
pub const STATUS_KEY: &str = "onboarding_status";

/// Thread-safe JSON key-value store, optionally backed by a directory.
#[derive(Debug, Clone, Default)]
pub struct ClientStore {
    values: Arc<RwLock<HashMap<String, Value>>>,
    /// Optional data directory for filesystem persistence.
    data_dir: Option<PathBuf>,
}

impl ClientStore {
    /// Create an in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with filesystem persistence.
    ///
    /// The directory is created if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`](crate::ClientError::Io) if the directory
    /// cannot be created.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> ClientResult<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self {
            values: Arc::default(),
            data_dir: Some(data_dir),
        })
    }

    /// The backing directory, if any.
    #[must_use]
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    fn path_for(data_dir: &Path, key: &str) -> PathBuf {
        data_dir.join(format!("{}.json", sanitize_key(key)))
    }

    /// Read and deserialize a value.
    ///
    /// Values missing from memory are loaded from disk when persistent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> ClientResult<Option<T>> {
        let cached = self
            .values
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(key)
            .cloned();

        let value = match (cached, &self.data_dir) {
            (Some(value), _) => value,
            (None, Some(data_dir)) => {
                let path = Self::path_for(data_dir, key);
                if !path.exists() {
                    return Ok(None);
                }
                let value: Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
                self.values
                    .write()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .insert(key.to_string(), value.clone());
                value
            }
            (None, None) => return Ok(None),
        };
        Ok(Some(serde_json::from_value(value)?))
    }

    /// Serialize and store a value, writing through to disk when persistent.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the file write fails.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> ClientResult<()> {
        let value = serde_json::to_value(value)?;
        if let Some(data_dir) = &self.data_dir {
            std::fs::write(
                Self::path_for(data_dir, key),
                serde_json::to_string_pretty(&value)?,
            )?;
        }
        self.values
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key.to_string(), value);
        Ok(())
    }

    /// Remove a value. Missing keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted file exists but cannot be removed.
    pub fn remove(&self, key: &str) -> ClientResult<()> {
        self.values
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(key);
        if let Some(data_dir) = &self.data_dir {
            let path = Self::path_for(data_dir, key);
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Keys currently stored, including persisted keys not yet loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be listed.
    pub fn keys(&self) -> ClientResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .values
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        if let Some(data_dir) = &self.data_dir {
            for entry in std::fs::read_dir(data_dir)? {
                let path = entry?.path();
                if path.extension().is_some_and(|ext| ext == "json") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        keys.push(stem.to_string());
                    }
                }
            }
        }
        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}

/// Sanitize a key for use as a filename.
///
/// Replaces any character that is not alphanumeric, `-`, or `_` with `_`.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Get the current Unix timestamp in milliseconds.
pub(crate) fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_put_get_remove() {
        let store = ClientStore::new();
        assert_eq!(store.get::<String>("missing").expect("get"), None);

        store.put("greeting", &"hello").expect("put");
        assert_eq!(
            store.get::<String>("greeting").expect("get"),
            Some("hello".to_string())
        );

        store.remove("greeting").expect("remove");
        assert_eq!(store.get::<String>("greeting").expect("get"), None);
        assert!(store.data_dir().is_none());
    }

    #[test]
    fn test_persistence_survives_new_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ClientStore::with_data_dir(dir.path()).expect("store");
        store.put("flow_config", &json!({ "version": "4" })).expect("put");

        let reopened = ClientStore::with_data_dir(dir.path()).expect("store");
        let value: Value = reopened.get("flow_config").expect("get").expect("present");
        assert_eq!(value["version"], "4");
        assert!(dir.path().join("flow_config.json").exists());
    }

    #[test]
    fn test_persistence_remove_deletes_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ClientStore::with_data_dir(dir.path()).expect("store");
        store.put("user", &json!({ "userId": "u1" })).expect("put");
        store.remove("user").expect("remove");

        assert!(!dir.path().join("user.json").exists());
        let reopened = ClientStore::with_data_dir(dir.path()).expect("store");
        assert_eq!(reopened.get::<Value>("user").expect("get"), None);
    }

    #[test]
    fn test_keys_include_persisted() {
        let dir = tempfile::tempdir().expect("tempdir");
        ClientStore::with_data_dir(dir.path())
            .expect("store")
            .put("device_id", &"abc")
            .expect("put");

        let store = ClientStore::with_data_dir(dir.path()).expect("store");
        store.put("user", &"u1").expect("put");
        assert_eq!(store.keys().expect("keys"), vec!["device_id", "user"]);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("user.json"), "{ not json").expect("write");
        let store = ClientStore::with_data_dir(dir.path()).expect("store");
        assert!(store.get::<Value>("user").is_err());
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("flow_config"), "flow_config");
        assert_eq!(sanitize_key("../etc/passwd"), "___etc_passwd");
        assert_eq!(sanitize_key("a b:c"), "a_b_c");
    }
}
