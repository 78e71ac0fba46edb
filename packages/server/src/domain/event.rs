//! Outbound events produced by the room tables.
//!
//! Every operation on [`ChatRooms`](super::ChatRooms) returns the events it
//! produced together with the concrete connections that must receive them.
//! Targets are resolved while the tables are borrowed, so a fan-out always
//! reflects the room membership at the moment of the mutation.

use super::{
    entity::{ChatMessage, DeliveryStatus, Member},
    value_object::{ConnectionId, DisplayName, MessageId},
};

#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    UserJoined { name: DisplayName },
    UserLeft { name: DisplayName },
    CurrentUsers { users: Vec<Member> },
    UserCountUpdate { count: usize },
    ChatHistory { messages: Vec<ChatMessage> },
    Message(ChatMessage),
    Reaction {
        message_id: MessageId,
        reaction: String,
        count: u32,
    },
    SeenUpdate {
        message_id: MessageId,
        seen_by: Vec<DisplayName>,
    },
    StatusUpdate {
        message_id: MessageId,
        status: DeliveryStatus,
    },
    Unsent { message_id: MessageId },
    TypingStart { name: DisplayName },
    TypingStop { name: DisplayName },
    ThemeChanged { theme: String },
    RoomDeleted,
}

impl RoomEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            Self::UserJoined { .. } => "user_joined",
            Self::UserLeft { .. } => "user_left",
            Self::CurrentUsers { .. } => "current_users",
            Self::UserCountUpdate { .. } => "user_count_update",
            Self::ChatHistory { .. } => "chat_history",
            Self::Message(_) => "message",
            Self::Reaction { .. } => "message_reaction",
            Self::SeenUpdate { .. } => "message_seen_update",
            Self::StatusUpdate { .. } => "message_status_update",
            Self::Unsent { .. } => "message_unsent",
            Self::TypingStart { .. } => "typing_start",
            Self::TypingStop { .. } => "typing_stop",
            Self::ThemeChanged { .. } => "theme_changed",
            Self::RoomDeleted => "room_deleted",
        }
    }
}

/// An event addressed to a set of connections.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub targets: Vec<ConnectionId>,
    pub event: RoomEvent,
}

impl Outbound {
    pub fn new(targets: Vec<ConnectionId>, event: RoomEvent) -> Self {
        Self { targets, event }
    }

    pub fn to_one(target: ConnectionId, event: RoomEvent) -> Self {
        Self {
            targets: vec![target],
            event,
        }
    }
}
