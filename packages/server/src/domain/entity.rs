//! Entities of the chat domain: connections, rooms, and messages.

use std::collections::{BTreeMap, HashMap, VecDeque};

use super::value_object::{ConnectionId, DisplayName, MessageId, Pin, Timestamp};

/// Default number of messages kept per room log
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// One live client session.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub id: ConnectionId,
    /// Room the connection currently belongs to (at most one)
    pub room: Option<Pin>,
    /// Name used in the current room
    pub name: Option<DisplayName>,
}

impl Connection {
    pub fn new(id: ConnectionId) -> Self {
        Self {
            id,
            room: None,
            name: None,
        }
    }
}

/// Entry of a room's ordered member list.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub connection_id: ConnectionId,
    pub name: DisplayName,
    pub joined_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    Text(String),
    Image(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender: DisplayName,
    /// Connection that sent the message; unknown for messages restored from a snapshot
    pub sender_connection: Option<ConnectionId>,
    pub body: MessageBody,
    pub reply_to: Option<MessageId>,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryStatus {
    #[default]
    Sent,
    Delivered,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Delivered => "delivered",
        }
    }
}

/// Receipt and reaction record of one message.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MessageState {
    pub status: DeliveryStatus,
    /// Names that have seen the message, in first-seen order
    pub seen_by: Vec<DisplayName>,
    /// Reaction symbol → count. Counts only ever grow.
    pub reactions: BTreeMap<String, u32>,
}

/// A chat room keyed by its pin.
///
/// The room owns its message log and the state record of every message in
/// that log; a state record never outlives its message.
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub pin: Pin,
    pub members: Vec<Member>,
    pub theme: Option<String>,
    pub messages: VecDeque<ChatMessage>,
    pub message_states: HashMap<MessageId, MessageState>,
    pub created_at: Timestamp,
    pub last_active: Timestamp,
    history_capacity: usize,
}

impl Room {
    pub fn new(pin: Pin, now: Timestamp) -> Self {
        Self::with_capacity(pin, now, DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_capacity(pin: Pin, now: Timestamp, history_capacity: usize) -> Self {
        Self {
            pin,
            members: Vec::new(),
            theme: None,
            messages: VecDeque::new(),
            message_states: HashMap::new(),
            created_at: now,
            last_active: now,
            history_capacity: history_capacity.max(1),
        }
    }

    pub fn touch(&mut self, now: Timestamp) {
        if now > self.last_active {
            self.last_active = now;
        }
    }

    /// Add a member. Returns `false` if the connection is already listed.
    pub fn add_member(&mut self, member: Member) -> bool {
        if self.is_member(&member.connection_id) {
            return false;
        }
        self.members.push(member);
        true
    }

    pub fn remove_member(&mut self, connection_id: &ConnectionId) -> Option<Member> {
        let index = self
            .members
            .iter()
            .position(|m| &m.connection_id == connection_id)?;
        Some(self.members.remove(index))
    }

    pub fn is_member(&self, connection_id: &ConnectionId) -> bool {
        self.members.iter().any(|m| &m.connection_id == connection_id)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn member_ids(&self) -> Vec<ConnectionId> {
        self.members
            .iter()
            .map(|m| m.connection_id.clone())
            .collect()
    }

    pub fn member_ids_except(&self, exclude: &ConnectionId) -> Vec<ConnectionId> {
        self.members
            .iter()
            .filter(|m| &m.connection_id != exclude)
            .map(|m| m.connection_id.clone())
            .collect()
    }

    pub fn contains_message(&self, message_id: &MessageId) -> bool {
        self.message_states.contains_key(message_id)
    }

    /// Append a message to the log with a fresh state record.
    ///
    /// Returns the messages evicted to stay within capacity, oldest first.
    pub fn push_message(&mut self, message: ChatMessage) -> Vec<ChatMessage> {
        self.message_states
            .insert(message.id.clone(), MessageState::default());
        self.messages.push_back(message);

        let mut evicted = Vec::new();
        while self.messages.len() > self.history_capacity {
            if let Some(oldest) = self.messages.pop_front() {
                self.message_states.remove(&oldest.id);
                evicted.push(oldest);
            }
        }
        evicted
    }

    /// Remove a message and its state record.
    pub fn remove_message(&mut self, message_id: &MessageId) -> Option<ChatMessage> {
        let index = self.messages.iter().position(|m| &m.id == message_id)?;
        self.message_states.remove(message_id);
        self.messages.remove(index)
    }

    /// Increment the tally of `symbol` and return the new count.
    pub fn add_reaction(&mut self, message_id: &MessageId, symbol: &str) -> Option<u32> {
        let state = self.message_states.get_mut(message_id)?;
        let count = state.reactions.entry(symbol.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        Some(*count)
    }

    /// Mark a message delivered. Returns `Some(true)` on a sent → delivered transition.
    pub fn mark_delivered(&mut self, message_id: &MessageId) -> Option<bool> {
        let state = self.message_states.get_mut(message_id)?;
        let transitioned = state.status != DeliveryStatus::Delivered;
        state.status = DeliveryStatus::Delivered;
        Some(transitioned)
    }

    /// Record that `name` has seen a message and return the seen-by list.
    pub fn mark_seen(&mut self, message_id: &MessageId, name: &DisplayName) -> Option<Vec<DisplayName>> {
        let state = self.message_states.get_mut(message_id)?;
        if !state.seen_by.contains(name) {
            state.seen_by.push(name.clone());
        }
        Some(state.seen_by.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin() -> Pin {
        Pin::new("1234".to_string()).unwrap()
    }

    fn message(id: &str) -> ChatMessage {
        ChatMessage {
            id: MessageId::new(id.to_string()).unwrap(),
            sender: DisplayName::new("alice".to_string()).unwrap(),
            sender_connection: None,
            body: MessageBody::Text(format!("body of {}", id)),
            reply_to: None,
            timestamp: Timestamp::new(1000),
        }
    }

    fn member(id: &str) -> Member {
        Member {
            connection_id: ConnectionId::new(id.to_string()).unwrap(),
            name: DisplayName::new(id.to_string()).unwrap(),
            joined_at: Timestamp::new(1000),
        }
    }

    #[test]
    fn test_add_member_deduplicates_by_connection_id() {
        // テスト項目: 同じ connection id で2回参加しても member は重複しない
        // given (前提条件):
        let mut room = Room::new(pin(), Timestamp::new(1000));

        // when (操作):
        let first = room.add_member(member("c1"));
        let second = room.add_member(member("c1"));

        // then (期待する結果):
        assert!(first);
        assert!(!second);
        assert_eq!(room.member_count(), 1);
    }

    #[test]
    fn test_push_message_evicts_oldest_with_state() {
        // テスト項目: 容量を超えると最古のメッセージとその状態が削除される
        // given (前提条件):
        let mut room = Room::with_capacity(pin(), Timestamp::new(1000), 2);
        room.push_message(message("m1"));
        room.push_message(message("m2"));

        // when (操作):
        let evicted = room.push_message(message("m3"));

        // then (期待する結果):
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].id.as_str(), "m1");
        let ids: Vec<&str> = room.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m2", "m3"]);
        assert!(!room.contains_message(&MessageId::new("m1".to_string()).unwrap()));
        assert_eq!(room.message_states.len(), 2);
    }

    #[test]
    fn test_add_reaction_counts_up_per_symbol() {
        // テスト項目: リアクションは記号ごとに単調増加する
        // given (前提条件):
        let mut room = Room::new(pin(), Timestamp::new(1000));
        room.push_message(message("m1"));
        let id = MessageId::new("m1".to_string()).unwrap();

        // when (操作):
        let counts: Vec<Option<u32>> = (0..3).map(|_| room.add_reaction(&id, "👍")).collect();
        let other = room.add_reaction(&id, "❤️");

        // then (期待する結果):
        assert_eq!(counts, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(other, Some(1));
    }

    #[test]
    fn test_operations_on_unknown_message_return_none() {
        // テスト項目: 存在しないメッセージへの操作は None を返し状態を作らない
        // given (前提条件):
        let mut room = Room::new(pin(), Timestamp::new(1000));
        let id = MessageId::new("ghost".to_string()).unwrap();
        let name = DisplayName::new("bob".to_string()).unwrap();

        // when (操作):
        let reaction = room.add_reaction(&id, "👍");
        let delivered = room.mark_delivered(&id);
        let seen = room.mark_seen(&id, &name);

        // then (期待する結果):
        assert_eq!(reaction, None);
        assert_eq!(delivered, None);
        assert_eq!(seen, None);
        assert!(room.message_states.is_empty());
    }

    #[test]
    fn test_mark_delivered_reports_transition_once() {
        // テスト項目: delivered への遷移は初回のみ true を返す
        // given (前提条件):
        let mut room = Room::new(pin(), Timestamp::new(1000));
        room.push_message(message("m1"));
        let id = MessageId::new("m1".to_string()).unwrap();

        // when (操作):
        let first = room.mark_delivered(&id);
        let second = room.mark_delivered(&id);

        // then (期待する結果):
        assert_eq!(first, Some(true));
        assert_eq!(second, Some(false));
    }

    #[test]
    fn test_mark_seen_deduplicates_names() {
        // テスト項目: 同じ名前で複数回既読にしても seen_by は重複しない
        // given (前提条件):
        let mut room = Room::new(pin(), Timestamp::new(1000));
        room.push_message(message("m1"));
        let id = MessageId::new("m1".to_string()).unwrap();
        let bob = DisplayName::new("bob".to_string()).unwrap();
        let carol = DisplayName::new("carol".to_string()).unwrap();

        // when (操作):
        room.mark_seen(&id, &bob);
        room.mark_seen(&id, &carol);
        let seen_by = room.mark_seen(&id, &bob).unwrap();

        // then (期待する結果):
        assert_eq!(seen_by, vec![bob, carol]);
    }
}
