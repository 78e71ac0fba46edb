//! UseCase: ルーム状態の永続化
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - PersistenceSync::load() / notify_mutation() / flush()
//!
//! ### なぜこのテストが必要か
//! - ストアの障害がメモリ上の状態やイベント処理を壊さないことを保証
//! - 連続した変更が 1 回の書き込みにまとめられることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：起動時の復元、デバウンス後の保存、定期保存
//! - 異常系：ストアへの読み書きが失敗する
//! - エッジケース：保存済みスナップショットが存在しない

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use pinchat_shared::time::Clock;
use tokio::{sync::Mutex, task::JoinHandle};

use crate::domain::{ChatRooms, Pin, SnapshotStore, StoreError, Timestamp};

use super::scheduler::KeyedScheduler;

/// ルームテーブルの共有ハンドル
pub type SharedRooms = Arc<Mutex<ChatRooms>>;

/// 保存のタイミング
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceStrategy {
    /// 変更のたびに保存を予約し直す（最後の変更から一定時間後に 1 回保存）
    Debounced(Duration),
    /// 変更の有無にかかわらず一定間隔で保存
    Interval(Duration),
}

impl Default for PersistenceStrategy {
    fn default() -> Self {
        Self::Debounced(Duration::from_secs(2))
    }
}

/// スナップショットストアとの同期を担うユースケース
pub struct PersistenceSync {
    rooms: SharedRooms,
    store: Arc<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
    strategy: PersistenceStrategy,
    debouncer: KeyedScheduler<()>,
    /// 書き込みを直列化し、古いスナップショットが新しいものを上書きしないようにする
    write_lock: Mutex<()>,
}

impl PersistenceSync {
    pub fn new(
        rooms: SharedRooms,
        store: Arc<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
        strategy: PersistenceStrategy,
    ) -> Self {
        Self {
            rooms,
            store,
            clock,
            strategy,
            debouncer: KeyedScheduler::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// 保存済みスナップショットをテーブルへ復元する
    ///
    /// # Returns
    ///
    /// 復元したルームの pin。スナップショットが無い、または読み込みに失敗した場合は空
    pub async fn load(&self) -> Vec<Pin> {
        match self.store.load().await {
            Ok(Some(snapshot)) => {
                let restored = self.rooms.lock().await.restore(snapshot);
                tracing::info!("Restored {} room(s) from snapshot", restored.len());
                restored
            }
            Ok(None) => {
                tracing::info!("No snapshot found, starting with empty state");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("Failed to load snapshot, starting with empty state: {}", e);
                Vec::new()
            }
        }
    }

    /// 状態が変更されたことを通知する
    ///
    /// デバウンス戦略では保存を予約し直す。定期保存戦略では何もしない。
    pub fn notify_mutation(self: &Arc<Self>) {
        let PersistenceStrategy::Debounced(delay) = self.strategy else {
            return;
        };
        let this: Weak<Self> = Arc::downgrade(self);
        self.debouncer.schedule((), delay, async move {
            if let Some(this) = this.upgrade() {
                this.persist().await;
            }
        });
    }

    /// 定期保存タスクを起動する（定期保存戦略のときのみ）
    pub fn spawn_periodic(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let PersistenceStrategy::Interval(period) = self.strategy else {
            return None;
        };
        let this = Arc::clone(self);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // 最初の tick は即座に完了するので読み飛ばす
            ticker.tick().await;
            loop {
                ticker.tick().await;
                this.persist().await;
            }
        }))
    }

    /// 現在の状態を即座に保存する
    pub async fn save_now(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let snapshot = {
            let rooms = self.rooms.lock().await;
            rooms.snapshot(Timestamp::new(self.clock.now_millis()))
        };
        let room_count = snapshot.rooms.len();
        self.store.save(&snapshot).await?;
        tracing::debug!("Saved snapshot with {} room(s)", room_count);
        Ok(())
    }

    /// 保留中の保存を取り消し、最終状態を保存する（シャットダウン時）
    pub async fn flush(&self) -> Result<(), StoreError> {
        self.debouncer.cancel(&());
        self.save_now().await
    }

    #[cfg(test)]
    pub fn has_pending_save(&self) -> bool {
        self.debouncer.is_pending(&())
    }

    async fn persist(&self) {
        if let Err(e) = self.save_now().await {
            tracing::warn!("Failed to save snapshot: {}", e);
        }
    }
}
