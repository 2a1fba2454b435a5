//! In-memory storage, for tests and throwaway sessions.

use async_trait::async_trait;
use ebs_core::Store;

use super::{Result, Storage};

/// Keeps the last saved snapshot in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    snapshot: Option<Store>,
    saves: usize,
}

impl MemoryStorage {
    /// Create storage with no snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create storage pre-seeded with a snapshot.
    pub fn with_store(store: Store) -> Self {
        Self {
            snapshot: Some(store),
            saves: 0,
        }
    }

    /// The last saved snapshot, if any.
    pub fn snapshot(&self) -> Option<&Store> {
        self.snapshot.as_ref()
    }

    /// Number of completed saves.
    pub fn saves(&self) -> usize {
        self.saves
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn load_store(&self) -> Result<Store> {
        Ok(self.snapshot.clone().unwrap_or_default())
    }

    async fn save_store(&mut self, store: &Store) -> Result<()> {
        self.snapshot = Some(store.clone());
        self.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_memory_storage_loads_default() {
        let storage = MemoryStorage::new();
        let store = storage.load_store().await.unwrap();
        assert_eq!(store, Store::default());
        assert!(storage.snapshot().is_none());
    }

    #[tokio::test]
    async fn test_memory_storage_keeps_last_save() {
        let mut storage = MemoryStorage::new();
        let mut store = Store::new();
        store.set_velocity(0.8).unwrap();

        storage.save_store(&store).await.unwrap();
        assert_eq!(storage.saves(), 1);
        assert_eq!(storage.load_store().await.unwrap().velocity(), 0.8);
    }
}
