// ABOUTME: In-memory storage backend
// ABOUTME: Single mutex-guarded map; create_if_absent is atomic within one process

use super::{Storage, StorageEntry, StorageError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Process-local storage. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>>, StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Unavailable("memory storage lock poisoned".to_string()))
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<StorageEntry>, StorageError> {
        Ok(self
            .lock()?
            .get(key)
            .map(|value| StorageEntry::new(key, value.clone())))
    }

    async fn put(&self, entry: StorageEntry) -> Result<(), StorageError> {
        self.lock()?.insert(entry.key, entry.value);
        Ok(())
    }

    async fn create_if_absent(&self, entry: StorageEntry) -> Result<bool, StorageError> {
        let mut entries = self.lock()?;
        if entries.contains_key(&entry.key) {
            return Ok(false);
        }
        entries.insert(entry.key, entry.value);
        Ok(true)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .lock()?
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key[prefix.len()..].to_string())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_put_then_get() {
        let storage = MemoryStorage::new();
        storage
            .put(StorageEntry::new("keys/admin", b"pem".to_vec()))
            .await
            .expect("put");

        let entry = storage.get("keys/admin").await.expect("get").expect("present");
        assert_eq!(entry.value, b"pem");
        assert!(storage.get("keys/other").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn test_create_if_absent_keeps_first_value() {
        let storage = MemoryStorage::new();
        assert!(storage
            .create_if_absent(StorageEntry::new("otp/a", b"first".to_vec()))
            .await
            .expect("create"));
        assert!(!storage
            .create_if_absent(StorageEntry::new("otp/a", b"second".to_vec()))
            .await
            .expect("create"));

        let entry = storage.get("otp/a").await.expect("get").expect("present");
        assert_eq!(entry.value, b"first");
    }

    #[tokio::test]
    async fn test_list_strips_prefix_and_stops_at_boundary() {
        let storage = MemoryStorage::new();
        for key in ["otp/b", "otp/a", "otq/x", "roles/web"] {
            storage
                .put(StorageEntry::new(key, Vec::new()))
                .await
                .expect("put");
        }

        let keys = storage.list("otp/").await.expect("list");
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_create_if_absent_has_one_winner() {
        let storage = Arc::new(MemoryStorage::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let storage = Arc::clone(&storage);
            handles.push(tokio::spawn(async move {
                storage
                    .create_if_absent(StorageEntry::new("otp/same", vec![i as u8]))
                    .await
                    .expect("create")
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.expect("join") {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
