//! Domain error types.

use thiserror::Error;

/// Errors raised while building value objects from client input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Rejections returned by the room tables.
///
/// None of these reach the client; the coordinator logs them and drops the
/// event without touching state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("room '{0}' does not exist")]
    UnknownRoom(String),

    #[error("message '{message_id}' not found in room '{pin}'")]
    UnknownMessage { pin: String, message_id: String },

    #[error("message '{message_id}' already exists in room '{pin}'")]
    DuplicateMessage { pin: String, message_id: String },

    #[error("connection '{0}' is not registered")]
    UnknownConnection(String),

    #[error("connection '{connection_id}' is not a member of room '{pin}'")]
    NotInRoom { connection_id: String, pin: String },

    #[error("connection '{0}' has not joined any room")]
    NotJoined(String),
}

/// Errors raised while pushing a frame to a connection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    /// Some targets were not registered or had a closed channel; the rest still got the frame
    #[error(
        "{} of {targets} target(s) unreachable: {}",
        .unreachable.len(),
        .unreachable.join(", ")
    )]
    Unreachable {
        unreachable: Vec<String>,
        targets: usize,
    },
}

/// Errors raised by snapshot store adapters
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot (de)serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("snapshot request failed: {0}")]
    Http(String),

    #[error("snapshot store answered with status {0}")]
    UnexpectedStatus(u16),
}
