//! WebSocket frame DTOs.
//!
//! Every frame is a JSON envelope `{"event": "<name>", "data": {...}}`.
//! Inbound payload fields are all optional here; required-field checks happen
//! when the payload is converted into a domain command.

use serde::{Deserialize, Serialize};

// ========================================
// Inbound (client → server)
// ========================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinRoom(JoinRoomPayload),
    SendMessage(SendMessagePayload),
    MessageReaction(ReactionPayload),
    MessageSeen(MessageRefPayload),
    MessageDelivered(MessageRefPayload),
    UnsendMessage(MessageRefPayload),
    TypingStart(TypingPayload),
    TypingStop(TypingPayload),
    ChangeTheme(ThemePayload),
    DeleteRoom(PinPayload),
    LeaveRoom(PinPayload),
    GetCurrentUsers(PinPayload),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PinPayload {
    pub pin: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JoinRoomPayload {
    pub pin: Option<String>,
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SendMessagePayload {
    pub pin: Option<String>,
    pub message: Option<String>,
    pub image_url: Option<String>,
    /// Milliseconds since epoch or an RFC 3339 string
    pub timestamp: Option<serde_json::Value>,
    pub message_id: Option<String>,
    pub sender: Option<String>,
    pub reply_to: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReactionPayload {
    pub pin: Option<String>,
    pub message_id: Option<String>,
    pub reaction: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageRefPayload {
    pub pin: Option<String>,
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypingPayload {
    pub pin: Option<String>,
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThemePayload {
    pub pin: Option<String>,
    pub theme: Option<String>,
}

// ========================================
// Outbound (server → client)
// ========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    UserJoined(PresenceDto),
    UserLeft(PresenceDto),
    CurrentUsers(CurrentUsersDto),
    UserCountUpdate(UserCountDto),
    ChatHistory(ChatHistoryDto),
    Message(MessageDto),
    MessageReaction(ReactionDto),
    MessageSeenUpdate(SeenUpdateDto),
    MessageStatusUpdate(StatusUpdateDto),
    MessageUnsent(UnsentDto),
    TypingStart(TypingDto),
    TypingStop(TypingDto),
    ThemeChanged(ThemeDto),
    RoomDeleted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceDto {
    pub message: String,
    pub user_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub user_name: String,
    pub joined_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentUsersDto {
    pub users: Vec<UserDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCountDto {
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatHistoryDto {
    pub messages: Vec<MessageDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub sender: String,
    pub timestamp: i64,
    pub message_id: String,
    #[serde(default)]
    pub reply_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionDto {
    pub message_id: String,
    pub reaction: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeenUpdateDto {
    pub message_id: String,
    pub seen_by: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateDto {
    pub message_id: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsentDto {
    pub message_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingDto {
    pub user_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeDto {
    pub theme: String,
}
