//! Server state shared by every handler.

use std::sync::Arc;

use crate::usecase::RoomCoordinator;

/// Shared application state
pub struct AppState {
    /// RoomCoordinator（ルーム操作のユースケース）
    pub coordinator: Arc<RoomCoordinator>,
}
