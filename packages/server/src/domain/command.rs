//! Validated inbound operations, one per client event.

use super::{
    rooms::NewMessage,
    value_object::{DisplayName, MessageId, Pin},
};

#[derive(Debug, Clone, PartialEq)]
pub enum RoomCommand {
    Join { pin: Pin, name: DisplayName },
    Leave { pin: Pin },
    CurrentUsers { pin: Pin },
    SendMessage { pin: Pin, message: NewMessage },
    React {
        pin: Pin,
        message_id: MessageId,
        reaction: String,
    },
    Seen { pin: Pin, message_id: MessageId },
    Delivered { pin: Pin, message_id: MessageId },
    Unsend { pin: Pin, message_id: MessageId },
    Typing {
        pin: Pin,
        name: Option<DisplayName>,
        started: bool,
    },
    ChangeTheme { pin: Pin, theme: String },
    DeleteRoom { pin: Pin },
}

impl RoomCommand {
    /// Wire name of the event this command came from
    pub fn name(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join_room",
            Self::Leave { .. } => "leave_room",
            Self::CurrentUsers { .. } => "get_current_users",
            Self::SendMessage { .. } => "send_message",
            Self::React { .. } => "message_reaction",
            Self::Seen { .. } => "message_seen",
            Self::Delivered { .. } => "message_delivered",
            Self::Unsend { .. } => "unsend_message",
            Self::Typing { started: true, .. } => "typing_start",
            Self::Typing { started: false, .. } => "typing_stop",
            Self::ChangeTheme { .. } => "change_theme",
            Self::DeleteRoom { .. } => "delete_room",
        }
    }

    /// Whether the command can change state that is persisted
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::CurrentUsers { .. } | Self::Typing { .. })
    }
}
