//! JSON file snapshot store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::{Snapshot, SnapshotStore, StoreError};

/// Stores the snapshot as a single JSON document on disk.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so a crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn load(&self) -> Result<Option<Snapshot>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(snapshot)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, json).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RoomSnapshot;

    #[tokio::test]
    async fn test_load_missing_file_returns_none() {
        // テスト項目: ファイルが存在しない場合は None が返る
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("missing.json"));

        // when (操作):
        let result = store.load().await;

        // then (期待する結果):
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn test_save_then_load_returns_same_snapshot() {
        // テスト項目: 保存したスナップショットをそのまま読み込める
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("nested").join("rooms.json"));
        let mut snapshot = Snapshot {
            saved_at: 42,
            ..Default::default()
        };
        snapshot.rooms.insert(
            "1234".to_string(),
            RoomSnapshot {
                theme: Some("dark".to_string()),
                ..Default::default()
            },
        );

        // when (操作):
        store.save(&snapshot).await.unwrap();
        let loaded = store.load().await.unwrap();

        // then (期待する結果):
        assert_eq!(loaded, Some(snapshot));
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn test_load_corrupt_file_is_an_error() {
        // テスト項目: 壊れた JSON はエラーとして報告される
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rooms.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = FileSnapshotStore::new(path);

        // when (操作):
        let result = store.load().await;

        // then (期待する結果):
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }
}
