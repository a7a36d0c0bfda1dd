// ABOUTME: Salt material for deriving storage keys from secret identifiers
// ABOUTME: Explicitly constructed and injected; persisted once under the `salt` key when not configured

use crate::storage::{Storage, StorageEntry, StorageError};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::info;

/// Storage key holding the generated salt.
pub const SALT_KEY: &str = "salt";

/// Secret salt used to derive one-way identifiers.
#[derive(Clone)]
pub struct Salt {
    material: Vec<u8>,
}

impl Salt {
    pub fn new(material: impl Into<Vec<u8>>) -> Self {
        Self {
            material: material.into(),
        }
    }

    /// Fresh random salt: 32 bytes, hex encoded.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::new(hex::encode(bytes))
    }

    /// Load the salt from storage, creating it on first use.
    ///
    /// Creation goes through `create_if_absent`, so two processes starting
    /// against an empty store agree on a single salt.
    pub async fn load_or_create(storage: &dyn Storage) -> Result<Self, StorageError> {
        if let Some(entry) = storage.get(SALT_KEY).await? {
            return Ok(Self::new(entry.value));
        }

        let candidate = Self::generate();
        let created = storage
            .create_if_absent(StorageEntry::new(SALT_KEY, candidate.material.clone()))
            .await?;
        if created {
            info!("generated new salt");
            return Ok(candidate);
        }

        // Lost the race; use whatever the winner wrote
        storage
            .get(SALT_KEY)
            .await?
            .map(|entry| Self::new(entry.value))
            .ok_or_else(|| StorageError::Unavailable("salt vanished after creation".to_string()))
    }

    /// Derive the salted identifier for `id`: hex(SHA-256(salt || id)).
    pub fn salt_id(&self, id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.material);
        hasher.update(id.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl std::fmt::Debug for Salt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Salt(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_salt_id_is_deterministic_hex() {
        let salt = Salt::new("pepper");
        let a = salt.salt_id("token");
        let b = salt.salt_id("token");

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_salt_id_depends_on_salt_and_input() {
        let salt = Salt::new("pepper");
        assert_ne!(salt.salt_id("token"), salt.salt_id("token2"));
        assert_ne!(salt.salt_id("token"), Salt::new("paprika").salt_id("token"));
    }

    #[test]
    fn test_salt_id_never_contains_input() {
        let salt = Salt::new("pepper");
        let token = "0f8fad5b-d9cb-469f-a165-70867728950e";
        assert!(!salt.salt_id(token).contains(token));
    }

    #[test]
    fn test_debug_redacts_material() {
        let debug = format!("{:?}", Salt::new("pepper"));
        assert!(!debug.contains("pepper"));
    }

    #[tokio::test]
    async fn test_load_or_create_persists_once() {
        let storage = MemoryStorage::new();

        let first = Salt::load_or_create(&storage).await.expect("create");
        let second = Salt::load_or_create(&storage).await.expect("load");

        assert_eq!(first.salt_id("x"), second.salt_id("x"));
        assert_eq!(storage.list("").await.expect("list"), vec![SALT_KEY.to_string()]);
    }

    #[tokio::test]
    async fn test_load_or_create_uses_existing_value() {
        let storage = MemoryStorage::new();
        storage
            .put(StorageEntry::new(SALT_KEY, b"pepper".to_vec()))
            .await
            .expect("put");

        let salt = Salt::load_or_create(&storage).await.expect("load");
        assert_eq!(salt.salt_id("x"), Salt::new("pepper").salt_id("x"));
    }
}
