//! SnapshotStore の実装
//!
//! - `file`: ローカルの JSON ファイル
//! - `http`: GET / PUT で丸ごと読み書きする外部ドキュメントストア
//! - `memory`: プロセス内のみ（再起動で消える）

pub mod file;
pub mod http;
pub mod memory;

pub use file::FileSnapshotStore;
pub use http::HttpSnapshotStore;
pub use memory::MemorySnapshotStore;

use std::sync::Arc;

use crate::{
    config::SnapshotTarget,
    domain::{SnapshotStore, StoreError},
};

/// 設定に応じた SnapshotStore を生成する
pub fn open_store(target: &SnapshotTarget) -> Result<Arc<dyn SnapshotStore>, StoreError> {
    let store: Arc<dyn SnapshotStore> = match target {
        SnapshotTarget::Memory => Arc::new(MemorySnapshotStore::new()),
        SnapshotTarget::File(path) => Arc::new(FileSnapshotStore::new(path.clone())),
        SnapshotTarget::Http { url, token } => {
            Arc::new(HttpSnapshotStore::new(url.clone(), token.clone())?)
        }
    };
    Ok(store)
}
