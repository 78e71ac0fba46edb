//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use tokio::sync::mpsc;

use crate::{
    domain::{ConnectionId, RoomCommand},
    infrastructure::dto::websocket::ClientEvent,
    ui::state::AppState,
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Spawns a task that receives frames from the rx channel and pushes them to the WebSocket sender.
///
/// # Arguments
///
/// * `rx` - Channel receiver for frames addressed to this connection
/// * `sender` - WebSocket sink to send frames to this client
///
/// # Returns
///
/// A `JoinHandle` for the spawned task
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(e) = sender.send(Message::Text(frame.into())).await {
                tracing::debug!("Failed to write frame, closing writer: {}", e);
                break;
            }
        }
    })
}

/// Parse one inbound text frame into a command. Malformed frames yield `None`.
fn parse_command(connection_id: &ConnectionId, text: &str) -> Option<RoomCommand> {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("Ignoring unparsable frame from '{}': {}", connection_id, e);
            return None;
        }
    };
    match RoomCommand::try_from(event) {
        Ok(command) => Some(command),
        Err(e) => {
            tracing::warn!("Ignoring malformed event from '{}': {}", connection_id, e);
            None
        }
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (sender, mut receiver) = socket.split();

    // Create a channel for this connection to receive frames
    let (tx, rx) = mpsc::unbounded_channel();
    let connection_id = state.coordinator.connect(tx).await;

    let state_clone = state.clone();
    let id_clone = connection_id.clone();

    // Inbound frames of one connection are applied in arrival order
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket error on '{}': {}", id_clone, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    tracing::debug!("Received frame from '{}': {}", id_clone, text.as_str());
                    if let Some(command) = parse_command(&id_clone, text.as_str()) {
                        state_clone.coordinator.handle(&id_clone, command).await;
                    }
                }
                Message::Ping(_) => {
                    tracing::debug!("Received ping");
                    // Ping/pong is handled automatically by the WebSocket protocol
                }
                Message::Close(_) => {
                    tracing::info!("Connection '{}' requested close", id_clone);
                    break;
                }
                _ => {}
            }
        }
    });

    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    state.coordinator.disconnect(&connection_id).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> ConnectionId {
        ConnectionId::new("test-connection".to_string()).unwrap()
    }

    #[test]
    fn test_parse_join_room() {
        // テスト項目: join_room フレームが Join コマンドに変換される
        // given (前提条件):
        let frame = r#"{"event":"join_room","data":{"pin":"1234","userName":"Alice"}}"#;

        // when (操作):
        let command = parse_command(&conn(), frame);

        // then (期待する結果):
        assert!(matches!(
            command,
            Some(RoomCommand::Join { ref pin, ref name })
                if pin.as_str() == "1234" && name.as_str() == "Alice"
        ));
    }

    #[test]
    fn test_parse_ignores_non_json() {
        // テスト項目: JSON でないフレームは無視される
        assert_eq!(parse_command(&conn(), "hello"), None);
    }

    #[test]
    fn test_parse_ignores_unknown_event() {
        // テスト項目: 未知のイベント名は無視される
        let frame = r#"{"event":"self_destruct","data":{}}"#;
        assert_eq!(parse_command(&conn(), frame), None);
    }

    #[test]
    fn test_parse_ignores_missing_pin() {
        // テスト項目: 必須フィールド (pin) が欠けたイベントは無視される
        let frame = r#"{"event":"join_room","data":{"userName":"Alice"}}"#;
        assert_eq!(parse_command(&conn(), frame), None);
    }
}
