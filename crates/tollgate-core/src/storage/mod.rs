// ABOUTME: Key-value storage seam used by the issuance pipeline
// ABOUTME: Storage trait, JSON-encoded entries, and the in-memory and SQLite backends

mod memory;
mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by a storage backend.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The SQLite backend failed.
    #[error("storage backend error: {0}")]
    Backend(#[from] sqlx::Error),

    /// Failed to create the directory holding the database file.
    #[error("failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value could not be serialized.
    #[error("failed to encode entry {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A stored value is not the JSON we expected.
    #[error("failed to decode entry {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Backend refused the operation for a reason of its own.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// A single stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEntry {
    pub key: String,
    pub value: Vec<u8>,
}

impl StorageEntry {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Build an entry whose value is `value` encoded as JSON.
    pub fn json<T: Serialize>(key: impl Into<String>, value: &T) -> Result<Self, StorageError> {
        let key = key.into();
        let value = serde_json::to_vec(value).map_err(|source| StorageError::Encode {
            key: key.clone(),
            source,
        })?;
        Ok(Self { key, value })
    }

    /// Decode the value as JSON.
    pub fn decode_json<T: DeserializeOwned>(&self) -> Result<T, StorageError> {
        serde_json::from_slice(&self.value).map_err(|source| StorageError::Decode {
            key: self.key.clone(),
            source,
        })
    }
}

/// Persistent key-value storage shared by every issuance request.
///
/// Keys are slash-separated strings (`roles/web`, `otp/<salted>`).
#[async_trait]
pub trait Storage: Send + Sync {
    /// Fetch an entry, or `None` if the key is unset.
    async fn get(&self, key: &str) -> Result<Option<StorageEntry>, StorageError>;

    /// Write an entry, replacing any existing value.
    async fn put(&self, entry: StorageEntry) -> Result<(), StorageError>;

    /// Write an entry only if the key is unset. Returns `true` if this call
    /// wrote it. Must be atomic with respect to concurrent callers.
    async fn create_if_absent(&self, entry: StorageEntry) -> Result<bool, StorageError>;

    /// Keys under `prefix`, with the prefix stripped, in sorted order.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

/// Fetch `key` and decode it as JSON.
pub async fn get_json<T: DeserializeOwned>(
    storage: &dyn Storage,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match storage.get(key).await? {
        Some(entry) => entry.decode_json().map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Pair {
        username: String,
        ip: String,
    }

    #[test]
    fn test_json_entry_round_trip() {
        let pair = Pair {
            username: "deploy".to_string(),
            ip: "10.0.0.5".to_string(),
        };
        let entry = StorageEntry::json("otp/abc", &pair).expect("should encode");
        assert_eq!(entry.key, "otp/abc");
        assert_eq!(
            String::from_utf8(entry.value.clone()).expect("utf8"),
            r#"{"username":"deploy","ip":"10.0.0.5"}"#
        );
        let decoded: Pair = entry.decode_json().expect("should decode");
        assert_eq!(decoded, pair);
    }

    #[test]
    fn test_decode_error_names_key() {
        let entry = StorageEntry::new("roles/web", b"not json".to_vec());
        let err = entry.decode_json::<Pair>().unwrap_err();
        assert!(matches!(err, StorageError::Decode { .. }));
        assert!(err.to_string().contains("roles/web"));
    }

    #[tokio::test]
    async fn test_get_json_missing_key() {
        let storage = MemoryStorage::new();
        let value: Option<Pair> = get_json(&storage, "otp/missing").await.expect("get");
        assert!(value.is_none());
    }
}
