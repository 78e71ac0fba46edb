//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    domain::{Pin, Room},
    infrastructure::dto::http::{RoomDetailDto, RoomSummaryDto, RoomUserDto},
    ui::state::AppState,
};
use pinchat_shared::time::timestamp_to_rfc3339;

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Get list of rooms
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSummaryDto>> {
    let rooms = state.coordinator.list_rooms().await;

    // Domain Model から DTO への変換
    let room_summaries: Vec<RoomSummaryDto> = rooms.iter().map(room_summary).collect();

    Json(room_summaries)
}

/// Get room detail by pin
pub async fn get_room_detail(
    State(state): State<Arc<AppState>>,
    Path(pin): Path<String>,
) -> Result<Json<RoomDetailDto>, StatusCode> {
    let pin = Pin::new(pin).map_err(|_| StatusCode::NOT_FOUND)?;
    let room = state
        .coordinator
        .get_room(&pin)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    // Domain Model から DTO への変換
    Ok(Json(RoomDetailDto {
        pin: room.pin.to_string(),
        users: room
            .members
            .iter()
            .map(|m| RoomUserDto {
                user_name: m.name.to_string(),
                joined_at: timestamp_to_rfc3339(m.joined_at.value()),
            })
            .collect(),
        message_count: room.messages.len(),
        theme: room.theme.clone(),
        created_at: timestamp_to_rfc3339(room.created_at.value()),
        last_active: timestamp_to_rfc3339(room.last_active.value()),
    }))
}

fn room_summary(room: &Room) -> RoomSummaryDto {
    RoomSummaryDto {
        pin: room.pin.to_string(),
        user_count: room.member_count(),
        message_count: room.messages.len(),
        theme: room.theme.clone(),
        created_at: timestamp_to_rfc3339(room.created_at.value()),
        last_active: timestamp_to_rfc3339(room.last_active.value()),
    }
}
