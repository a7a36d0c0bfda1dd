// ABOUTME: SQLite-backed storage for roles, host keys, OTP entries and config
// ABOUTME: create_if_absent maps to INSERT OR IGNORE so concurrent issuers cannot overwrite each other

use super::{Storage, StorageEntry, StorageError};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

/// Persistent key-value store in a single SQLite table.
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open or create a store at the given path
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let url = format!("sqlite:{}?mode=rwc", path.display());
        let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Private in-memory database, mostly for tests.
    pub async fn in_memory() -> Result<Self, StorageError> {
        // A single connection that is never recycled, otherwise the database
        // is lost along with it
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StorageError> {
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn get(&self, key: &str) -> Result<Option<StorageEntry>, StorageError> {
        let row = sqlx::query_as::<_, EntryRow>("SELECT key, value FROM entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn put(&self, entry: StorageEntry) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO entries (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(&entry.key)
        .bind(&entry.value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn create_if_absent(&self, entry: StorageEntry) -> Result<bool, StorageError> {
        let result = sqlx::query("INSERT OR IGNORE INTO entries (key, value) VALUES (?, ?)")
            .bind(&entry.key)
            .bind(&entry.value)
            .execute(&self.pool)
            .await?;

        // rows_affected is 1 if we inserted, 0 if the key already existed
        Ok(result.rows_affected() == 1)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        // substr comparison instead of LIKE so '%' and '_' in prefixes stay literal
        let keys: Vec<String> = sqlx::query_scalar(
            "SELECT key FROM entries WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key ASC",
        )
        .bind(prefix)
        .fetch_all(&self.pool)
        .await?;

        Ok(keys
            .into_iter()
            .map(|key| key[prefix.len()..].to_string())
            .collect())
    }
}

#[derive(sqlx::FromRow)]
struct EntryRow {
    key: String,
    value: Vec<u8>,
}

impl From<EntryRow> for StorageEntry {
    fn from(row: EntryRow) -> Self {
        StorageEntry {
            key: row.key,
            value: row.value,
        }
    }
}
