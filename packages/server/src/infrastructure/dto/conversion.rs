//! Conversion logic between DTOs and domain values.

use chrono::DateTime;

use crate::domain::{
    ChatMessage, DisplayName, Member, MessageBody, MessageId, NewMessage, Pin, RoomCommand,
    RoomEvent, Timestamp, ValueObjectError,
};
use crate::infrastructure::dto::websocket as dto;

// ========================================
// DTO → Domain
// ========================================

fn required<T>(
    value: Option<String>,
    build: fn(String) -> Result<T, ValueObjectError>,
) -> Result<T, ValueObjectError> {
    build(value.unwrap_or_default())
}

fn optional<T>(
    value: Option<String>,
    build: fn(String) -> Result<T, ValueObjectError>,
) -> Option<T> {
    value.and_then(|v| build(v).ok())
}

fn non_empty_text(value: Option<String>, field: &'static str) -> Result<String, ValueObjectError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ValueObjectError::Empty(field)),
    }
}

/// Accept epoch milliseconds or an RFC 3339 string.
fn parse_timestamp(value: serde_json::Value) -> Option<Timestamp> {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(Timestamp::new),
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| Timestamp::new(dt.timestamp_millis())),
        _ => None,
    }
}

impl TryFrom<dto::SendMessagePayload> for NewMessage {
    type Error = ValueObjectError;

    fn try_from(payload: dto::SendMessagePayload) -> Result<Self, Self::Error> {
        let body = match (payload.message, payload.image_url) {
            (_, Some(url)) if !url.trim().is_empty() => MessageBody::Image(url),
            (Some(text), _) if !text.is_empty() => MessageBody::Text(text),
            _ => return Err(ValueObjectError::Empty("message")),
        };
        Ok(Self {
            id: required(payload.message_id, MessageId::new)?,
            sender: optional(payload.sender, DisplayName::new),
            body,
            reply_to: optional(payload.reply_to, MessageId::new),
            timestamp: payload.timestamp.and_then(parse_timestamp),
        })
    }
}

impl TryFrom<dto::ClientEvent> for RoomCommand {
    type Error = ValueObjectError;

    fn try_from(event: dto::ClientEvent) -> Result<Self, Self::Error> {
        use dto::ClientEvent;

        let command = match event {
            ClientEvent::JoinRoom(p) => Self::Join {
                pin: required(p.pin, Pin::new)?,
                name: required(p.user_name, DisplayName::new)?,
            },
            ClientEvent::SendMessage(mut p) => {
                let pin = required(p.pin.take(), Pin::new)?;
                Self::SendMessage {
                    pin,
                    message: NewMessage::try_from(p)?,
                }
            }
            ClientEvent::MessageReaction(p) => Self::React {
                pin: required(p.pin, Pin::new)?,
                message_id: required(p.message_id, MessageId::new)?,
                reaction: non_empty_text(p.reaction, "reaction")?,
            },
            ClientEvent::MessageSeen(p) => Self::Seen {
                pin: required(p.pin, Pin::new)?,
                message_id: required(p.message_id, MessageId::new)?,
            },
            ClientEvent::MessageDelivered(p) => Self::Delivered {
                pin: required(p.pin, Pin::new)?,
                message_id: required(p.message_id, MessageId::new)?,
            },
            ClientEvent::UnsendMessage(p) => Self::Unsend {
                pin: required(p.pin, Pin::new)?,
                message_id: required(p.message_id, MessageId::new)?,
            },
            ClientEvent::TypingStart(p) => Self::Typing {
                pin: required(p.pin, Pin::new)?,
                name: optional(p.user_name, DisplayName::new),
                started: true,
            },
            ClientEvent::TypingStop(p) => Self::Typing {
                pin: required(p.pin, Pin::new)?,
                name: optional(p.user_name, DisplayName::new),
                started: false,
            },
            ClientEvent::ChangeTheme(p) => Self::ChangeTheme {
                pin: required(p.pin, Pin::new)?,
                theme: non_empty_text(p.theme, "theme")?,
            },
            ClientEvent::DeleteRoom(p) => Self::DeleteRoom {
                pin: required(p.pin, Pin::new)?,
            },
            ClientEvent::LeaveRoom(p) => Self::Leave {
                pin: required(p.pin, Pin::new)?,
            },
            ClientEvent::GetCurrentUsers(p) => Self::CurrentUsers {
                pin: required(p.pin, Pin::new)?,
            },
        };
        Ok(command)
    }
}

// ========================================
// Domain → DTO
// ========================================

impl From<ChatMessage> for dto::MessageDto {
    fn from(model: ChatMessage) -> Self {
        let (message, image_url) = match model.body {
            MessageBody::Text(text) => (Some(text), None),
            MessageBody::Image(url) => (None, Some(url)),
        };
        Self {
            message,
            image_url,
            sender: model.sender.into_string(),
            timestamp: model.timestamp.value(),
            message_id: model.id.into_string(),
            reply_to: model.reply_to.map(MessageId::into_string),
        }
    }
}

impl From<Member> for dto::UserDto {
    fn from(model: Member) -> Self {
        Self {
            user_name: model.name.into_string(),
            joined_at: model.joined_at.value(),
        }
    }
}

impl From<RoomEvent> for dto::ServerEvent {
    fn from(event: RoomEvent) -> Self {
        match event {
            RoomEvent::UserJoined { name } => Self::UserJoined(dto::PresenceDto {
                message: format!("{} joined the chat", name),
                user_name: name.into_string(),
            }),
            RoomEvent::UserLeft { name } => Self::UserLeft(dto::PresenceDto {
                message: format!("{} left the chat", name),
                user_name: name.into_string(),
            }),
            RoomEvent::CurrentUsers { users } => Self::CurrentUsers(dto::CurrentUsersDto {
                users: users.into_iter().map(Into::into).collect(),
            }),
            RoomEvent::UserCountUpdate { count } => {
                Self::UserCountUpdate(dto::UserCountDto { count })
            }
            RoomEvent::ChatHistory { messages } => Self::ChatHistory(dto::ChatHistoryDto {
                messages: messages.into_iter().map(Into::into).collect(),
            }),
            RoomEvent::Message(message) => Self::Message(message.into()),
            RoomEvent::Reaction {
                message_id,
                reaction,
                count,
            } => Self::MessageReaction(dto::ReactionDto {
                message_id: message_id.into_string(),
                reaction,
                count,
            }),
            RoomEvent::SeenUpdate {
                message_id,
                seen_by,
            } => Self::MessageSeenUpdate(dto::SeenUpdateDto {
                message_id: message_id.into_string(),
                seen_by: seen_by.into_iter().map(DisplayName::into_string).collect(),
            }),
            RoomEvent::StatusUpdate { message_id, status } => {
                Self::MessageStatusUpdate(dto::StatusUpdateDto {
                    message_id: message_id.into_string(),
                    status: status.as_str().to_string(),
                })
            }
            RoomEvent::Unsent { message_id } => Self::MessageUnsent(dto::UnsentDto {
                message_id: message_id.into_string(),
            }),
            RoomEvent::TypingStart { name } => Self::TypingStart(dto::TypingDto {
                user_name: name.into_string(),
            }),
            RoomEvent::TypingStop { name } => Self::TypingStop(dto::TypingDto {
                user_name: name.into_string(),
            }),
            RoomEvent::ThemeChanged { theme } => Self::ThemeChanged(dto::ThemeDto { theme }),
            RoomEvent::RoomDeleted => Self::RoomDeleted,
        }
    }
}
