//! Embedded blob store backed by redb.
//!
//! Single-host deployments point the blob baseline backend at a local
//! database file; the in-memory variant backs the tests. Values are
//! opaque bytes, keyed by string.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, TableDefinition};
use tracing::debug;

use cycle_provider::{ObjectStore, ProviderError, ProviderResult};

/// Baseline records keyed by `baseline/{group}`.
const BASELINES: TableDefinition<&str, &[u8]> = TableDefinition::new("baselines");

/// Convert any `Display` error into a `ProviderError::Store`.
fn store_err(e: impl std::fmt::Display) -> ProviderError {
    ProviderError::Store(e.to_string())
}

/// Thread-safe embedded blob store.
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Database>,
}

impl LocalStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> ProviderResult<Self> {
        let db = Database::create(path).map_err(store_err)?;
        let store = Self { db: Arc::new(db) };
        store.ensure_table()?;
        debug!(?path, "local baseline store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> ProviderResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(store_err)?;
        let store = Self { db: Arc::new(db) };
        store.ensure_table()?;
        debug!("in-memory baseline store opened");
        Ok(store)
    }

    fn ensure_table(&self) -> ProviderResult<()> {
        let txn = self.db.begin_write().map_err(store_err)?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(BASELINES).map_err(store_err)?;
        txn.commit().map_err(store_err)?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn get(&self, key: &str) -> ProviderResult<Option<Vec<u8>>> {
        let txn = self.db.begin_read().map_err(store_err)?;
        let table = txn.open_table(BASELINES).map_err(store_err)?;
        match table.get(key).map_err(store_err)? {
            Some(guard) => Ok(Some(guard.value().to_vec())),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: &[u8]) -> ProviderResult<()> {
        let txn = self.db.begin_write().map_err(store_err)?;
        {
            let mut table = txn.open_table(BASELINES).map_err(store_err)?;
            table.insert(key, value).map_err(store_err)?;
        }
        txn.commit().map_err(store_err)?;
        debug!(%key, "blob stored");
        Ok(())
    }

    async fn delete(&self, key: &str) -> ProviderResult<()> {
        let txn = self.db.begin_write().map_err(store_err)?;
        {
            let mut table = txn.open_table(BASELINES).map_err(store_err)?;
            table.remove(key).map_err(store_err)?;
        }
        txn.commit().map_err(store_err)?;
        debug!(%key, "blob deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_absent_key_is_none() {
        let store = LocalStore::open_in_memory().unwrap();
        assert_eq!(store.get("baseline/web").await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_get_delete_round_trip() {
        let store = LocalStore::open_in_memory().unwrap();
        store.put("baseline/web", b"{\"min_size\":2}").await.unwrap();
        assert_eq!(
            store.get("baseline/web").await.unwrap().as_deref(),
            Some(b"{\"min_size\":2}".as_slice())
        );

        store.delete("baseline/web").await.unwrap();
        assert_eq!(store.get("baseline/web").await.unwrap(), None);
        // Absent delete is not an error.
        store.delete("baseline/web").await.unwrap();
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baselines.redb");

        {
            let store = LocalStore::open(&path).unwrap();
            store.put("baseline/web", b"persisted").await.unwrap();
        }

        let store = LocalStore::open(&path).unwrap();
        assert_eq!(
            store.get("baseline/web").await.unwrap().as_deref(),
            Some(b"persisted".as_slice())
        );
    }
}
