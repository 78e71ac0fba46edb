//! In-process snapshot store.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Snapshot, SnapshotStore, StoreError};

/// Keeps the latest snapshot in memory only.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshot: Mutex<Option<Snapshot>>,
    saves: Mutex<usize>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot
    #[cfg(test)]
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
            saves: Mutex::new(0),
        }
    }

    #[cfg(test)]
    pub async fn latest(&self) -> Option<Snapshot> {
        self.snapshot.lock().await.clone()
    }

    /// Number of successful saves so far
    #[cfg(test)]
    pub async fn save_count(&self) -> usize {
        *self.saves.lock().await
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> Result<Option<Snapshot>, StoreError> {
        Ok(self.snapshot.lock().await.clone())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        *self.snapshot.lock().await = Some(snapshot.clone());
        *self.saves.lock().await += 1;
        Ok(())
    }
}
