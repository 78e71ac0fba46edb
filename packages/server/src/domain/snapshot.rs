//! Point-in-time serialization of the room tables.
//!
//! A snapshot is a recovery cache, not a source of truth: saving replaces the
//! stored copy wholesale and loading replaces the in-memory tables wholesale.
//! Every field has a default so that partial or older snapshots still load.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{
    entity::{ChatMessage, DeliveryStatus, MessageBody, MessageState, Room},
    value_object::{DisplayName, MessageId, Pin, Timestamp},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    pub saved_at: i64,
    pub rooms: BTreeMap<String, RoomSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoomSnapshot {
    pub messages: Vec<MessageSnapshot>,
    pub theme: Option<String>,
    pub user_count: usize,
    pub created_at: i64,
    pub last_active: i64,
    pub status: BTreeMap<String, StatusSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageSnapshot {
    pub message_id: String,
    pub sender: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatusSnapshot {
    pub status: String,
    pub seen_by: Vec<String>,
    pub reactions: BTreeMap<String, u32>,
}

impl From<&ChatMessage> for MessageSnapshot {
    fn from(message: &ChatMessage) -> Self {
        let (text, image_url) = match &message.body {
            MessageBody::Text(text) => (Some(text.clone()), None),
            MessageBody::Image(url) => (None, Some(url.clone())),
        };
        Self {
            message_id: message.id.as_str().to_string(),
            sender: message.sender.as_str().to_string(),
            message: text,
            image_url,
            reply_to: message.reply_to.as_ref().map(|id| id.as_str().to_string()),
            timestamp: message.timestamp.value(),
        }
    }
}

impl From<&MessageState> for StatusSnapshot {
    fn from(state: &MessageState) -> Self {
        Self {
            status: state.status.as_str().to_string(),
            seen_by: state
                .seen_by
                .iter()
                .map(|name| name.as_str().to_string())
                .collect(),
            reactions: state.reactions.clone(),
        }
    }
}

impl From<&Room> for RoomSnapshot {
    fn from(room: &Room) -> Self {
        Self {
            messages: room.messages.iter().map(MessageSnapshot::from).collect(),
            theme: room.theme.clone(),
            user_count: room.member_count(),
            created_at: room.created_at.value(),
            last_active: room.last_active.value(),
            status: room
                .message_states
                .iter()
                .map(|(id, state)| (id.as_str().to_string(), StatusSnapshot::from(state)))
                .collect(),
        }
    }
}

impl MessageSnapshot {
    /// Rebuild a message. Entries without id, sender, or body are dropped.
    fn into_message(self) -> Option<ChatMessage> {
        let body = match (self.message, self.image_url) {
            (_, Some(url)) if !url.is_empty() => MessageBody::Image(url),
            (Some(text), _) => MessageBody::Text(text),
            _ => return None,
        };
        Some(ChatMessage {
            id: MessageId::new(self.message_id).ok()?,
            sender: DisplayName::new(self.sender).ok()?,
            sender_connection: None,
            body,
            reply_to: self.reply_to.and_then(|id| MessageId::new(id).ok()),
            timestamp: Timestamp::new(self.timestamp),
        })
    }
}

impl StatusSnapshot {
    fn into_state(self) -> MessageState {
        MessageState {
            status: match self.status.as_str() {
                "delivered" => DeliveryStatus::Delivered,
                _ => DeliveryStatus::Sent,
            },
            seen_by: self
                .seen_by
                .into_iter()
                .filter_map(|name| DisplayName::new(name).ok())
                .collect(),
            reactions: self.reactions,
        }
    }
}

impl RoomSnapshot {
    /// Rebuild a room with empty membership.
    ///
    /// Only the newest `history_capacity` messages are kept, and status
    /// records are restored only for messages that survived.
    pub fn into_room(mut self, pin: Pin, history_capacity: usize) -> Room {
        let mut room = Room::with_capacity(pin, Timestamp::new(self.created_at), history_capacity);
        room.touch(Timestamp::new(self.last_active));
        room.theme = self.theme.filter(|theme| !theme.is_empty());

        for message in self.messages.into_iter().filter_map(MessageSnapshot::into_message) {
            if room.contains_message(&message.id) {
                continue;
            }
            room.push_message(message);
        }

        for (id, state) in room.message_states.iter_mut() {
            if let Some(saved) = self.status.remove(id.as_str()) {
                *state = saved.into_state();
            }
        }
        room
    }
}
