//! キー付きの遅延タスクスケジューラ
//!
//! 同じキーで再スケジュールすると、まだ発火していない前回のタスクは abort される
//! （最後のスケジュールが勝つ）。発火済みのタスクは自分のエントリを外してから
//! 本体を実行するため、実行中の処理が途中で中断されることはない。

use std::{
    collections::HashMap,
    future::Future,
    hash::Hash,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::task::JoinHandle;

struct Pending {
    generation: u64,
    handle: JoinHandle<()>,
}

type PendingTable<K> = Arc<Mutex<HashMap<K, Pending>>>;

/// キーごとに高々 1 つの保留タスクを持つスケジューラ
pub struct KeyedScheduler<K> {
    pending: PendingTable<K>,
    generation: AtomicU64,
}

impl<K> Default for KeyedScheduler<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> KeyedScheduler<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }

    /// `delay` 経過後に `task` を実行する
    ///
    /// 同じキーの保留タスクがあればキャンセルして置き換える。
    pub fn schedule<F>(&self, key: K, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let pending = Arc::clone(&self.pending);
        let task_key = key.clone();

        // 登録前にタスクが発火しても自分のエントリを見失わないよう、ロックを保持したまま spawn する
        let mut table = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut table = pending.lock().unwrap_or_else(PoisonError::into_inner);
                match table.get(&task_key) {
                    Some(entry) if entry.generation == generation => {
                        table.remove(&task_key);
                    }
                    _ => return,
                }
            }
            task.await;
        });
        if let Some(previous) = table.insert(key, Pending { generation, handle }) {
            previous.handle.abort();
        }
    }

    /// 保留中のタスクをキャンセルする。キャンセルした場合は true
    pub fn cancel(&self, key: &K) -> bool {
        let mut table = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        match table.remove(key) {
            Some(previous) => {
                previous.handle.abort();
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub fn is_pending(&self, key: &K) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    #[cfg(test)]
    pub fn pending_count(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<K> Drop for KeyedScheduler<K> {
    fn drop(&mut self) {
        let mut table = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, pending) in table.drain() {
            pending.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    fn bump(counter: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_runs_after_delay() {
        // テスト項目: 指定した遅延の後にタスクが実行される
        // given (前提条件):
        let scheduler = KeyedScheduler::new();
        let fired = counter();

        // when (操作):
        scheduler.schedule("room", Duration::from_secs(30), bump(&fired));
        tokio::time::sleep(Duration::from_secs(29)).await;
        let before = fired.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(2)).await;

        // then (期待する結果):
        assert_eq!(before, 0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_pending(&"room"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_pending_task() {
        // テスト項目: 同じキーで再スケジュールすると前回のタスクは実行されない
        // given (前提条件):
        let scheduler = KeyedScheduler::new();
        let first = counter();
        let second = counter();
        scheduler.schedule((), Duration::from_secs(2), bump(&first));

        // when (操作):
        tokio::time::sleep(Duration::from_secs(1)).await;
        scheduler.schedule((), Duration::from_secs(2), bump(&second));
        tokio::time::sleep(Duration::from_secs(5)).await;

        // then (期待する結果):
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_execution() {
        // テスト項目: cancel したタスクは実行されない
        // given (前提条件):
        let scheduler = KeyedScheduler::new();
        let fired = counter();
        scheduler.schedule("room", Duration::from_secs(30), bump(&fired));

        // when (操作):
        let cancelled = scheduler.cancel(&"room");
        tokio::time::sleep(Duration::from_secs(60)).await;

        // then (期待する結果):
        assert!(cancelled);
        assert!(!scheduler.cancel(&"room"));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        // テスト項目: 異なるキーのタスクは互いに影響しない
        // given (前提条件):
        let scheduler = KeyedScheduler::new();
        let a = counter();
        let b = counter();
        scheduler.schedule("a", Duration::from_secs(1), bump(&a));
        scheduler.schedule("b", Duration::from_secs(1), bump(&b));

        // when (操作):
        scheduler.cancel(&"a");
        tokio::time::sleep(Duration::from_secs(2)).await;

        // then (期待する結果):
        assert_eq!(a.load(Ordering::SeqCst), 0);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }
}
