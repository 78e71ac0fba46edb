//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - 接続ごとの `UnboundedSender` を管理
//! - 複数接続へのフレーム送信（broadcast）
//!
//! ## 設計ノート
//!
//! WebSocket の受付と書き込みタスクの生成は UI 層（`src/ui/handler/websocket.rs`）で行われます。
//! この実装は生成された `UnboundedSender` を受け取り、送信だけを担当します。
//! 送信はチャンネルへの enqueue のみで、ソケットの書き込みを待ちません。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ConnectionId, MessagePushError, MessagePusher, PusherChannel};

/// WebSocket を使った MessagePusher 実装
///
/// ## 使用例
///
/// ```ignore
/// let pusher = WebSocketMessagePusher::new();
/// pusher.register_client(connection_id.clone(), tx).await;
/// pusher.broadcast(&[connection_id], r#"{"event":"room_deleted"}"#).await?;
/// ```
#[derive(Default)]
pub struct WebSocketMessagePusher {
    /// 接続中のクライアントの送信チャンネル
    clients: Arc<Mutex<HashMap<ConnectionId, PusherChannel>>>,
}

impl WebSocketMessagePusher {
    /// 新しい WebSocketMessagePusher を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 登録済みの接続数を取得
    #[cfg(test)]
    pub async fn client_count(&self) -> usize {
        self.clients.lock().await.len()
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel) {
        tracing::debug!("Connection '{}' registered to MessagePusher", connection_id);
        let mut clients = self.clients.lock().await;
        clients.insert(connection_id, sender);
    }

    async fn unregister_client(&self, connection_id: &ConnectionId) {
        let mut clients = self.clients.lock().await;
        if clients.remove(connection_id).is_some() {
            tracing::debug!("Connection '{}' unregistered from MessagePusher", connection_id);
        }
    }

    async fn broadcast(
        &self,
        targets: &[ConnectionId],
        content: &str,
    ) -> Result<(), MessagePushError> {
        let clients = self.clients.lock().await;
        let mut unreachable = Vec::new();

        for target in targets {
            // 一部の送信失敗を許容し、残りの接続には送り続ける
            let delivered = clients
                .get(target)
                .is_some_and(|sender| sender.send(content.to_string()).is_ok());
            if !delivered {
                tracing::debug!("Connection '{}' unreachable during broadcast", target);
                unreachable.push(target.to_string());
            }
        }

        if unreachable.is_empty() {
            Ok(())
        } else {
            Err(MessagePushError::Unreachable {
                unreachable,
                targets: targets.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - broadcast: 複数接続への送信（部分失敗を許容し、到達不能な接続を報告）
    // - register / unregister
    // ========================================

    fn conn(id: &str) -> ConnectionId {
        ConnectionId::new(id.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_broadcast_success() {
        // テスト項目: 登録済みの全接続にフレームを送信できる
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        pusher.register_client(conn("alice"), tx1).await;
        pusher.register_client(conn("bob"), tx2).await;

        // when (操作):
        let result = pusher.broadcast(&[conn("alice"), conn("bob")], "Hello").await;

        // then (期待する結果):
        assert_eq!(result, Ok(()));
        assert_eq!(rx1.recv().await, Some("Hello".to_string()));
        assert_eq!(rx2.recv().await, Some("Hello".to_string()));
    }

    #[tokio::test]
    async fn test_broadcast_reports_closed_channel() {
        // テスト項目: 受信側が閉じたチャンネルは到達不能として報告される
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (tx, rx) = mpsc::unbounded_channel();
        pusher.register_client(conn("alice"), tx).await;
        drop(rx);

        // when (操作):
        let result = pusher.broadcast(&[conn("alice")], "Hello").await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(MessagePushError::Unreachable {
                unreachable: vec!["alice".to_string()],
                targets: 1,
            })
        );
    }

    #[tokio::test]
    async fn test_broadcast_partial_failure() {
        // テスト項目: 一部の接続が存在しなくても残りの接続には届き、欠けた接続が報告される
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        pusher.register_client(conn("alice"), tx1).await;
        pusher.register_client(conn("bob"), tx2).await;

        // when (操作):
        let targets = vec![conn("alice"), conn("ghost"), conn("bob")];
        let result = pusher.broadcast(&targets, "Broadcast message").await;

        // then (期待する結果):
        assert_eq!(
            result.map_err(|e| e.to_string()),
            Err("1 of 3 target(s) unreachable: ghost".to_string())
        );
        assert_eq!(rx1.recv().await, Some("Broadcast message".to_string()));
        assert_eq!(rx2.recv().await, Some("Broadcast message".to_string()));
    }

    #[tokio::test]
    async fn test_unregister_removes_client() {
        // テスト項目: 登録解除した接続には届かない
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        pusher.register_client(conn("alice"), tx).await;

        // when (操作):
        pusher.unregister_client(&conn("alice")).await;
        pusher.unregister_client(&conn("alice")).await;

        // then (期待する結果):
        assert_eq!(pusher.client_count().await, 0);
        assert!(pusher.broadcast(&[conn("alice")], "Hello").await.is_err());
    }
}
