//! UseCase: ルームコーディネーター
//!
//! クライアントからのイベントをルームテーブルに適用し、生成された送信イベントを
//! 接続ごとのチャンネルへ配信する。配信はテーブルのロックを保持したまま行うため、
//! あるルームへのファンアウトは他の操作と交互に混ざらない。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - RoomCoordinator::connect() / handle() / disconnect()
//! - 空になったルームの猶予期間付き削除
//!
//! ### なぜこのテストが必要か
//! - 2 人参加からリアクション・取り消し・テーマ変更までの一連の流れを保証
//! - 猶予期間内の再参加でルームの状態が失われないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加、送信、リアクション、取り消し、テーマ変更、削除
//! - 異常系：存在しないルームへの送信、未知の接続
//! - エッジケース：切断の二重通知、猶予期間の境界

use std::{sync::Arc, time::Duration};

use pinchat_shared::time::Clock;

use crate::{
    domain::{
        ChatRooms, ConnectionId, Departure, MessagePusher, Outbound, Pin, PusherChannel,
        Room, RoomCommand, RoomError, Timestamp,
    },
    infrastructure::dto::websocket::ServerEvent,
};

use super::{
    persistence::{PersistenceSync, SharedRooms},
    scheduler::KeyedScheduler,
};

/// 空になったルームを削除するまでの既定の猶予期間
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// ルームコーディネーターのユースケース
pub struct RoomCoordinator {
    /// ルームテーブル（プロセスに 1 つ）
    rooms: SharedRooms,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
    /// 猶予期間付きのルーム削除タイマー（pin ごと）
    reaper: KeyedScheduler<Pin>,
    grace_period: Duration,
    persistence: Option<Arc<PersistenceSync>>,
}

impl RoomCoordinator {
    /// 新しい RoomCoordinator を作成
    pub fn new(
        rooms: SharedRooms,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rooms,
            message_pusher,
            clock,
            reaper: KeyedScheduler::new(),
            grace_period: DEFAULT_GRACE_PERIOD,
            persistence: None,
        }
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// 変更を永続化層へ通知するようにする
    pub fn with_persistence(mut self, persistence: Arc<PersistenceSync>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// 新しい接続を登録し、割り当てた ID を返す
    ///
    /// # Arguments
    ///
    /// * `sender` - クライアントへのメッセージ送信用チャンネル
    pub async fn connect(&self, sender: PusherChannel) -> ConnectionId {
        let connection_id = ConnectionId::generate();
        let mut rooms = self.rooms.lock().await;
        rooms.connect(connection_id.clone());
        self.message_pusher
            .register_client(connection_id.clone(), sender)
            .await;
        tracing::info!(
            "Connection '{}' registered ({} connected)",
            connection_id,
            rooms.connection_count()
        );
        connection_id
    }

    /// クライアントからのコマンドを 1 つ処理する
    ///
    /// 拒否された操作はログに残して破棄する（クライアントへのエラー通知はしない）。
    pub async fn handle(&self, connection_id: &ConnectionId, command: RoomCommand) {
        let event_name = command.name();
        let is_mutation = command.is_mutation();
        let now = self.now();

        let applied = {
            let mut rooms = self.rooms.lock().await;
            match self.apply(&mut rooms, connection_id, command, now) {
                Ok(outbound) => {
                    self.dispatch(outbound).await;
                    true
                }
                Err(e) => {
                    log_rejection(connection_id, event_name, &e);
                    false
                }
            }
        };

        if applied && is_mutation {
            self.notify_persistence();
        }
    }

    /// 接続を切断する（何度呼ばれても安全）
    pub async fn disconnect(&self, connection_id: &ConnectionId) {
        let departed = {
            let mut rooms = self.rooms.lock().await;
            let departure = rooms.disconnect(connection_id, self.now());
            let departed = departure.is_some();
            if let Some(departure) = departure {
                let outbound = self.on_departure(departure);
                self.dispatch(outbound).await;
            }
            self.message_pusher.unregister_client(connection_id).await;
            departed
        };

        tracing::info!("Connection '{}' disconnected", connection_id);
        if departed {
            self.notify_persistence();
        }
    }

    /// スナップショットを復元し、メンバーのいない復元ルームに猶予期間付きの削除を予約する
    ///
    /// # Returns
    ///
    /// 復元したルーム数
    pub async fn restore_from(&self, persistence: &PersistenceSync) -> usize {
        let restored = persistence.load().await;
        let rooms = self.rooms.lock().await;
        for pin in &restored {
            // 復元から予約までの間に誰かが参加していれば予約しない
            if rooms.room(pin).is_some_and(|room| room.member_count() == 0) {
                self.schedule_expiry(pin.clone());
            }
        }
        restored.len()
    }

    /// 全ルームのコピーを pin 順で返す
    pub async fn list_rooms(&self) -> Vec<Room> {
        let rooms = self.rooms.lock().await;
        let mut list: Vec<Room> = rooms.rooms().cloned().collect();
        list.sort_by(|a, b| a.pin.as_str().cmp(b.pin.as_str()));
        list
    }

    pub async fn get_room(&self, pin: &Pin) -> Option<Room> {
        self.rooms.lock().await.room(pin).cloned()
    }

    pub async fn connection_count(&self) -> usize {
        self.rooms.lock().await.connection_count()
    }

    /// 削除予約中のルームがあるか
    #[cfg(test)]
    pub fn is_expiry_pending(&self, pin: &Pin) -> bool {
        self.reaper.is_pending(pin)
    }

    fn apply(
        &self,
        rooms: &mut ChatRooms,
        connection_id: &ConnectionId,
        command: RoomCommand,
        now: Timestamp,
    ) -> Result<Vec<Outbound>, RoomError> {
        match command {
            RoomCommand::Join { pin, name } => {
                let joined = rooms.join(connection_id, pin.clone(), name, now)?;
                if self.reaper.cancel(&pin) {
                    tracing::debug!("Cancelled pending deletion of room '{}'", pin);
                }
                if joined.created {
                    tracing::info!("Room '{}' created", pin);
                }
                let mut outbound = joined
                    .left
                    .map(|departure| self.on_departure(departure))
                    .unwrap_or_default();
                outbound.extend(joined.outbound);
                Ok(outbound)
            }
            RoomCommand::Leave { pin } => {
                let departure = rooms.leave(connection_id, &pin, now)?;
                Ok(self.on_departure(departure))
            }
            RoomCommand::CurrentUsers { pin } => rooms.current_users(connection_id, &pin),
            RoomCommand::SendMessage { pin, message } => {
                rooms.send_message(connection_id, &pin, message, now)
            }
            RoomCommand::React {
                pin,
                message_id,
                reaction,
            } => rooms.react(&pin, &message_id, &reaction, now),
            RoomCommand::Seen { pin, message_id } => {
                rooms.mark_seen(connection_id, &pin, &message_id)
            }
            RoomCommand::Delivered { pin, message_id } => {
                rooms.mark_delivered(&pin, &message_id)
            }
            RoomCommand::Unsend { pin, message_id } => rooms.unsend(&pin, &message_id, now),
            RoomCommand::Typing { pin, name, started } => {
                rooms.typing(connection_id, &pin, name, started)
            }
            RoomCommand::ChangeTheme { pin, theme } => rooms.change_theme(&pin, theme, now),
            RoomCommand::DeleteRoom { pin } => {
                self.reaper.cancel(&pin);
                let outbound = rooms.delete_room(&pin)?;
                tracing::info!("Room '{}' deleted by '{}'", pin, connection_id);
                Ok(outbound)
            }
        }
    }

    /// 退出の後処理。ルームが空になったら猶予期間後の削除を予約する
    fn on_departure(&self, departure: Departure) -> Vec<Outbound> {
        tracing::info!("'{}' left room '{}'", departure.name, departure.pin);
        if departure.room_empty {
            self.schedule_expiry(departure.pin);
        }
        departure.outbound
    }

    fn schedule_expiry(&self, pin: Pin) {
        let rooms = Arc::clone(&self.rooms);
        let persistence = self.persistence.clone();
        let expired = pin.clone();
        tracing::debug!(
            "Room '{}' is empty, deleting in {:?} unless rejoined",
            pin,
            self.grace_period
        );
        self.reaper.schedule(pin, self.grace_period, async move {
            // 猶予期間中に誰かが参加していれば削除しない
            if !rooms.lock().await.expire_room(&expired) {
                return;
            }
            tracing::info!("Room '{}' deleted after grace period", expired);
            if let Some(persistence) = persistence {
                persistence.notify_mutation();
            }
        });
    }

    /// 送信イベントをシリアライズして宛先へ配信する
    async fn dispatch(&self, outbound: Vec<Outbound>) {
        for Outbound { targets, event } in outbound {
            let event_name = event.name();
            let frame = match serde_json::to_string(&ServerEvent::from(event)) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!("Failed to serialize '{}': {}", event_name, e);
                    continue;
                }
            };
            tracing::debug!("Fan-out '{}' to {} connection(s)", event_name, targets.len());
            if let Err(e) = self.message_pusher.broadcast(&targets, &frame).await {
                tracing::warn!("Failed to push '{}': {}", event_name, e);
            }
        }
    }

    fn notify_persistence(&self) {
        if let Some(persistence) = &self.persistence {
            persistence.notify_mutation();
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }
}

fn log_rejection(connection_id: &ConnectionId, event_name: &str, error: &RoomError) {
    match error {
        // 存在しないメッセージへの操作は冪等な no-op として扱う
        RoomError::UnknownMessage { .. } => {
            tracing::debug!("Ignored '{}' from '{}': {}", event_name, connection_id, error)
        }
        _ => tracing::warn!("Rejected '{}' from '{}': {}", event_name, connection_id, error),
    }
}
