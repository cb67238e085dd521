//! In-memory storage backend.

use core::{
    convert::Infallible,
    sync::atomic::{AtomicUsize, Ordering},
};
use std::{collections::BTreeMap, sync::Arc};

use async_lock::Mutex;
use future_form::{FutureForm, Local, Sendable, future_form};

use super::{LedgerKey, LedgerStorage};

/// An in-memory storage backend.
///
/// Clones share the same documents, so a test can keep a handle to inspect
/// what a ledger persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    documents: Arc<Mutex<BTreeMap<LedgerKey, Vec<u8>>>>,
    saves: Arc<AtomicUsize>,
}

impl MemoryStorage {
    /// Create a new in-memory storage backend.
    #[must_use]
    pub fn new() -> Self {
        tracing::debug!("creating new in-memory storage");
        Self::default()
    }

    /// Create a backend already holding `bytes` under `key`.
    #[must_use]
    pub fn with_document(key: LedgerKey, bytes: Vec<u8>) -> Self {
        let mut documents = BTreeMap::new();
        documents.insert(key, bytes);
        Self {
            documents: Arc::new(Mutex::new(documents)),
            saves: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The bytes currently stored under `key`.
    pub async fn get(&self, key: &LedgerKey) -> Option<Vec<u8>> {
        self.documents.lock().await.get(key).cloned()
    }

    /// Store `bytes` under `key`, counting it as a save.
    pub async fn put(&self, key: LedgerKey, bytes: Vec<u8>) {
        self.documents.lock().await.insert(key, bytes);
        self.saves.fetch_add(1, Ordering::Relaxed);
    }

    /// Remove the bytes stored under `key`.
    pub async fn remove(&self, key: &LedgerKey) -> Option<Vec<u8>> {
        self.documents.lock().await.remove(key)
    }

    /// How many saves have completed.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }
}

#[future_form(Sendable, Local)]
impl<K: FutureForm> LedgerStorage<K> for MemoryStorage {
    type Error = Infallible;

    fn load(&self, key: LedgerKey) -> K::Future<'_, Result<Option<Vec<u8>>, Self::Error>> {
        K::from_future(async move {
            tracing::debug!(%key, "MemoryStorage::load");
            Ok(self.get(&key).await)
        })
    }

    fn save(&self, key: LedgerKey, bytes: Vec<u8>) -> K::Future<'_, Result<(), Self::Error>> {
        K::from_future(async move {
            tracing::debug!(%key, len = bytes.len(), "MemoryStorage::save");
            self.put(key, bytes).await;
            Ok(())
        })
    }

    fn delete(&self, key: LedgerKey) -> K::Future<'_, Result<(), Self::Error>> {
        K::from_future(async move {
            tracing::debug!(%key, "MemoryStorage::delete");
            self.remove(&key).await;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testresult::TestResult;

    #[tokio::test]
    async fn missing_key_loads_none() -> TestResult {
        let storage = MemoryStorage::new();
        let loaded =
            LedgerStorage::<Sendable>::load(&storage, LedgerKey::default()).await?;
        assert_eq!(loaded, None);
        Ok(())
    }

    #[tokio::test]
    async fn save_load_delete() -> TestResult {
        let storage = MemoryStorage::new();
        let key = LedgerKey::new("ledger");

        LedgerStorage::<Sendable>::save(&storage, key.clone(), b"{}".to_vec()).await?;
        assert_eq!(storage.save_count(), 1);
        assert_eq!(
            LedgerStorage::<Sendable>::load(&storage, key.clone()).await?,
            Some(b"{}".to_vec())
        );

        LedgerStorage::<Sendable>::delete(&storage, key.clone()).await?;
        assert_eq!(storage.get(&key).await, None);
        Ok(())
    }

    #[tokio::test]
    async fn clones_share_documents() -> TestResult {
        let storage = MemoryStorage::new();
        let handle = storage.clone();
        LedgerStorage::<Local>::save(&storage, LedgerKey::default(), vec![1]).await?;
        assert_eq!(handle.get(&LedgerKey::default()).await, Some(vec![1]));
        assert_eq!(handle.save_count(), 1);
        Ok(())
    }
}
