//! In-process integration tests: a real server on an ephemeral port driven by
//! WebSocket and HTTP clients.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use pinchat_server::{
    domain::ChatRooms, infrastructure::message_pusher::WebSocketMessagePusher, ui::Server,
    usecase::RoomCoordinator,
};
use pinchat_shared::time::SystemClock;
use serde_json::{Value, json};
use tokio::{net::TcpStream, sync::Mutex};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Start a server on 127.0.0.1:0 that runs until the test ends
async fn spawn_server() -> SocketAddr {
    let coordinator = Arc::new(RoomCoordinator::new(
        Arc::new(Mutex::new(ChatRooms::new())),
        Arc::new(WebSocketMessagePusher::new()),
        Arc::new(SystemClock),
    ));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(Server::new(coordinator).serve(listener, std::future::pending()));
    addr
}

async fn connect(addr: SocketAddr) -> Socket {
    let (socket, _response) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    socket
}

async fn send(socket: &mut Socket, event: &str, data: Value) {
    let frame = json!({ "event": event, "data": data }).to_string();
    socket.send(Message::text(frame)).await.unwrap();
}

/// Read frames until one matches `event` and `predicate`, skipping the rest
async fn recv_until<P>(socket: &mut Socket, event: &str, predicate: P) -> Value
where
    P: Fn(&Value) -> bool,
{
    let wait = async {
        loop {
            let message = socket.next().await.unwrap().unwrap();
            let Message::Text(text) = message else {
                continue;
            };
            let frame: Value = serde_json::from_str(text.as_str()).unwrap();
            if frame["event"] == event && predicate(&frame["data"]) {
                return frame;
            }
        }
    };
    tokio::time::timeout(RECV_TIMEOUT, wait)
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for '{}'", event))
}

/// Assert that no frame with `event` arrives within a short window
async fn assert_silent(socket: &mut Socket, event: &str) {
    let wait = async {
        loop {
            let Some(Ok(Message::Text(text))) = socket.next().await else {
                return;
            };
            let frame: Value = serde_json::from_str(text.as_str()).unwrap();
            assert_ne!(frame["event"], event, "unexpected frame: {}", frame);
        }
    };
    let _ = tokio::time::timeout(Duration::from_millis(200), wait).await;
}

#[tokio::test]
async fn test_chat_room_scenario() {
    // テスト項目: 2 人参加 → 送信 → リアクション → 取り消し → テーマ変更 → 3 人目の参加
    // given (前提条件):
    let addr = spawn_server().await;
    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;

    // when (操作): Alice, Bob の順に参加
    send(&mut alice, "join_room", json!({"pin": "1234", "userName": "Alice"})).await;
    recv_until(&mut alice, "user_count_update", |d| d["count"] == 1).await;
    send(&mut bob, "join_room", json!({"pin": "1234", "userName": "Bob"})).await;

    // then (期待する結果): 両者に人数 2 と 2 人分の一覧が届く
    for socket in [&mut alice, &mut bob] {
        recv_until(socket, "user_count_update", |d| d["count"] == 2).await;
        let users = recv_until(socket, "current_users", |d| {
            d["users"].as_array().is_some_and(|u| u.len() == 2)
        })
        .await;
        let names: Vec<&str> = users["data"]["users"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|u| u["userName"].as_str())
            .collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
    }
    let joined = recv_until(&mut alice, "user_joined", |_| true).await;
    assert_eq!(joined["data"]["message"], "Bob joined the chat");

    // when (操作): Alice が m1 を送信
    send(
        &mut alice,
        "send_message",
        json!({"pin": "1234", "message": "hello", "messageId": "m1", "sender": "Alice"}),
    )
    .await;

    // then (期待する結果): Bob に message、Alice に delivered
    let message = recv_until(&mut bob, "message", |d| d["messageId"] == "m1").await;
    assert_eq!(message["data"]["message"], "hello");
    assert_eq!(message["data"]["sender"], "Alice");
    recv_until(&mut alice, "message_status_update", |d| {
        d["messageId"] == "m1" && d["status"] == "delivered"
    })
    .await;

    // when (操作): Bob が 👍 でリアクション
    send(
        &mut bob,
        "message_reaction",
        json!({"pin": "1234", "messageId": "m1", "reaction": "👍"}),
    )
    .await;

    // then (期待する結果): 両者にカウント 1
    for socket in [&mut alice, &mut bob] {
        recv_until(socket, "message_reaction", |d| {
            d["messageId"] == "m1" && d["reaction"] == "👍" && d["count"] == 1
        })
        .await;
    }

    // when (操作): Alice が m1 を取り消す
    send(&mut alice, "unsend_message", json!({"pin": "1234", "messageId": "m1"})).await;

    // then (期待する結果): 両者に message_unsent
    for socket in [&mut alice, &mut bob] {
        recv_until(socket, "message_unsent", |d| d["messageId"] == "m1").await;
    }

    // when (操作): テーマを dark に変更した直後に Carol が参加
    send(&mut alice, "change_theme", json!({"pin": "1234", "theme": "dark"})).await;
    recv_until(&mut alice, "theme_changed", |d| d["theme"] == "dark").await;
    let mut carol = connect(addr).await;
    send(&mut carol, "join_room", json!({"pin": "1234", "userName": "Carol"})).await;

    // then (期待する結果): Carol の最初のフレームがテーマ dark
    let first = tokio::time::timeout(RECV_TIMEOUT, carol.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let first: Value = serde_json::from_str(first.to_text().unwrap()).unwrap();
    assert_eq!(first, json!({"event": "theme_changed", "data": {"theme": "dark"}}));
    let history = recv_until(&mut carol, "chat_history", |_| true).await;
    assert_eq!(history["data"]["messages"], json!([]));
}

#[tokio::test]
async fn test_malformed_frames_keep_connection_open() {
    // テスト項目: 不正なフレームは無視され、接続はそのまま使える
    // given (前提条件):
    let addr = spawn_server().await;
    let mut alice = connect(addr).await;

    // when (操作):
    alice.send(Message::text("not json")).await.unwrap();
    send(&mut alice, "join_room", json!({"userName": "Alice"})).await;
    send(&mut alice, "no_such_event", json!({})).await;
    send(&mut alice, "join_room", json!({"pin": "1234", "userName": "Alice"})).await;

    // then (期待する結果):
    recv_until(&mut alice, "user_count_update", |d| d["count"] == 1).await;
}

#[tokio::test]
async fn test_disconnect_notifies_remaining_members() {
    // テスト項目: 切断すると残りの参加者に退出と人数が通知される
    // given (前提条件):
    let addr = spawn_server().await;
    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;
    send(&mut alice, "join_room", json!({"pin": "1234", "userName": "Alice"})).await;
    recv_until(&mut alice, "user_count_update", |d| d["count"] == 1).await;
    send(&mut bob, "join_room", json!({"pin": "1234", "userName": "Bob"})).await;
    recv_until(&mut alice, "user_count_update", |d| d["count"] == 2).await;

    // when (操作):
    bob.close(None).await.unwrap();

    // then (期待する結果):
    recv_until(&mut alice, "user_count_update", |d| d["count"] == 1).await;
    let left = recv_until(&mut alice, "user_left", |_| true).await;
    assert_eq!(
        left["data"],
        json!({"message": "Bob left the chat", "userName": "Bob"})
    );
    assert_silent(&mut alice, "user_left").await;
}

#[tokio::test]
async fn test_http_room_endpoints() {
    // テスト項目: HTTP API でヘルスチェック・ルーム一覧・ルーム詳細を取得できる
    // given (前提条件):
    let addr = spawn_server().await;
    let mut alice = connect(addr).await;
    send(&mut alice, "join_room", json!({"pin": "1234", "userName": "Alice"})).await;
    recv_until(&mut alice, "user_count_update", |d| d["count"] == 1).await;
    let client = reqwest::Client::new();
    let base = format!("http://{}", addr);

    // when (操作):
    let health: Value = client
        .get(format!("{}/api/health", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let rooms: Value = client
        .get(format!("{}/api/rooms", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let detail: Value = client
        .get(format!("{}/api/rooms/1234", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let missing = client
        .get(format!("{}/api/rooms/9999", base))
        .send()
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(health, json!({"status": "ok"}));
    assert_eq!(rooms[0]["pin"], "1234");
    assert_eq!(rooms[0]["userCount"], 1);
    assert_eq!(rooms[0]["messageCount"], 0);
    assert_eq!(detail["users"][0]["userName"], "Alice");
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}
