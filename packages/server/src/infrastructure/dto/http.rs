//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

/// Room summary for `GET /api/rooms`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummaryDto {
    pub pin: String,
    pub user_count: usize,
    pub message_count: usize,
    pub theme: Option<String>,
    pub created_at: String,
    pub last_active: String,
}

/// Room member for `GET /api/rooms/{pin}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomUserDto {
    pub user_name: String,
    pub joined_at: String,
}

/// Room detail for `GET /api/rooms/{pin}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetailDto {
    pub pin: String,
    pub users: Vec<RoomUserDto>,
    pub message_count: usize,
    pub theme: Option<String>,
    pub created_at: String,
    pub last_active: String,
}
