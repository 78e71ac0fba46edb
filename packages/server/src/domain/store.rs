//! SnapshotStore trait 定義
//!
//! 外部の key-value ドキュメントストアへのインターフェース。
//! トランザクションの保証はなく、スナップショット全体を読み書きするだけです。

use async_trait::async_trait;

use super::{Snapshot, StoreError};

/// SnapshotStore trait
///
/// - `load`: 保存済みスナップショットを取得（存在しなければ `Ok(None)`）
/// - `save`: スナップショット全体を置き換える
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// スナップショットを読み込む
    async fn load(&self) -> Result<Option<Snapshot>, StoreError>;

    /// スナップショットを保存する
    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError>;
}
