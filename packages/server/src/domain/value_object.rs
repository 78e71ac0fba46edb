//! Value objects of the chat domain.
//!
//! Identifiers arrive from clients as free-form strings. The only rule
//! enforced here is that they are non-empty after trimming; everything else
//! (format, length, uniqueness) is the client's business.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ValueObjectError;

fn non_empty(value: String, field: &'static str) -> Result<String, ValueObjectError> {
    if value.trim().is_empty() {
        return Err(ValueObjectError::Empty(field));
    }
    Ok(value)
}

/// Server-assigned identity of one live socket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Generate a fresh random connection id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        non_empty(value, "connection id").map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Room identifier shared between clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pin(String);

impl Pin {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        non_empty(value, "pin").map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for Pin {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name a user chose when joining a room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        non_empty(value, "display name").map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client-generated message identifier, unique within a room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        non_empty(value, "message id").map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for MessageId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unix timestamp in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_rejects_blank_value() {
        // テスト項目: 空白のみの pin は作成できない
        // given (前提条件):
        let value = "   ".to_string();

        // when (操作):
        let result = Pin::new(value);

        // then (期待する結果):
        assert_eq!(result, Err(ValueObjectError::Empty("pin")));
    }

    #[test]
    fn test_pin_keeps_value_as_is() {
        // テスト項目: pin は検証のみ行い、値はそのまま保持される
        // given (前提条件):
        let value = "1234".to_string();

        // when (操作):
        let pin = Pin::try_from(value).unwrap();

        // then (期待する結果):
        assert_eq!(pin.as_str(), "1234");
        assert_eq!(pin.to_string(), "1234");
    }

    #[test]
    fn test_message_id_and_display_name_reject_empty() {
        // テスト項目: 空の message id / display name はエラーになる
        // given (前提条件):
        let empty = String::new();

        // when (操作):
        let message_id = MessageId::new(empty.clone());
        let name = DisplayName::new(empty);

        // then (期待する結果):
        assert_eq!(message_id, Err(ValueObjectError::Empty("message id")));
        assert_eq!(name, Err(ValueObjectError::Empty("display name")));
    }

    #[test]
    fn test_generated_connection_ids_are_unique() {
        // テスト項目: 生成される ConnectionId は毎回異なる
        // given (前提条件):

        // when (操作):
        let first = ConnectionId::generate();
        let second = ConnectionId::generate();

        // then (期待する結果):
        assert_ne!(first, second);
        assert!(!first.as_str().is_empty());
    }
}
