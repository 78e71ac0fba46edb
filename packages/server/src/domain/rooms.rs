//! The in-memory room tables and the synchronous operations on them.
//!
//! `ChatRooms` holds every connection and every room of the process. Each
//! operation runs to completion on `&mut self` and returns the outbound
//! events it produced, already addressed to concrete connections. Nothing in
//! here blocks, sleeps, or performs I/O; timers and delivery are the caller's
//! job.

use std::collections::HashMap;

use super::{
    entity::{
        ChatMessage, Connection, DEFAULT_HISTORY_CAPACITY, DeliveryStatus, Member, MessageBody,
        Room,
    },
    error::RoomError,
    event::{Outbound, RoomEvent},
    snapshot::{RoomSnapshot, Snapshot},
    value_object::{ConnectionId, DisplayName, MessageId, Pin, Timestamp},
};

/// A message as submitted by a client, before it is placed in a room log.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub id: MessageId,
    /// Falls back to the sender connection's display name when absent
    pub sender: Option<DisplayName>,
    pub body: MessageBody,
    pub reply_to: Option<MessageId>,
    /// Falls back to server time when absent
    pub timestamp: Option<Timestamp>,
}

/// Result of a connection leaving a room.
#[derive(Debug, Clone, PartialEq)]
pub struct Departure {
    pub pin: Pin,
    pub name: DisplayName,
    pub outbound: Vec<Outbound>,
    /// The room has no members left and is due for grace-period deletion
    pub room_empty: bool,
}

/// Result of a join.
#[derive(Debug, Clone, PartialEq)]
pub struct Joined {
    /// The room the connection was implicitly moved out of
    pub left: Option<Departure>,
    /// The room was created by this join
    pub created: bool,
    pub outbound: Vec<Outbound>,
}

#[derive(Debug)]
pub struct ChatRooms {
    connections: HashMap<ConnectionId, Connection>,
    rooms: HashMap<Pin, Room>,
    history_capacity: usize,
}

impl Default for ChatRooms {
    fn default() -> Self {
        Self::new()
    }
}

fn push_to_targets(outbound: &mut Vec<Outbound>, targets: Vec<ConnectionId>, event: RoomEvent) {
    if !targets.is_empty() {
        outbound.push(Outbound::new(targets, event));
    }
}

fn membership_events(room: &Room) -> Vec<Outbound> {
    let mut outbound = Vec::new();
    let members = room.member_ids();
    push_to_targets(
        &mut outbound,
        members.clone(),
        RoomEvent::UserCountUpdate {
            count: room.member_count(),
        },
    );
    push_to_targets(
        &mut outbound,
        members,
        RoomEvent::CurrentUsers {
            users: room.members.clone(),
        },
    );
    outbound
}

impl ChatRooms {
    pub fn new() -> Self {
        Self::with_history_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_history_capacity(history_capacity: usize) -> Self {
        Self {
            connections: HashMap::new(),
            rooms: HashMap::new(),
            history_capacity: history_capacity.max(1),
        }
    }

    pub fn connection(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn room(&self, pin: &Pin) -> Option<&Room> {
        self.rooms.get(pin)
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Register a new connection. Returns `false` if the id is already known.
    pub fn connect(&mut self, id: ConnectionId) -> bool {
        if self.connections.contains_key(&id) {
            return false;
        }
        self.connections.insert(id.clone(), Connection::new(id));
        true
    }

    /// Join `pin` as `name`, leaving the current room first if it differs.
    pub fn join(
        &mut self,
        id: &ConnectionId,
        pin: Pin,
        name: DisplayName,
        now: Timestamp,
    ) -> Result<Joined, RoomError> {
        let previous = self
            .connections
            .get(id)
            .ok_or_else(|| RoomError::UnknownConnection(id.to_string()))?
            .room
            .clone();

        let left = match previous {
            Some(previous) if previous != pin => self.remove_from_room(id, &previous, now),
            _ => None,
        };

        if let Some(connection) = self.connections.get_mut(id) {
            connection.room = Some(pin.clone());
            connection.name = Some(name.clone());
        }

        let created = !self.rooms.contains_key(&pin);
        let history_capacity = self.history_capacity;
        let room = self
            .rooms
            .entry(pin.clone())
            .or_insert_with(|| Room::with_capacity(pin, now, history_capacity));
        room.touch(now);

        let added = room.add_member(Member {
            connection_id: id.clone(),
            name: name.clone(),
            joined_at: now,
        });
        if !added {
            if let Some(member) = room.members.iter_mut().find(|m| &m.connection_id == id) {
                member.name = name.clone();
            }
        }

        let mut outbound = Vec::new();
        if let Some(theme) = &room.theme {
            outbound.push(Outbound::to_one(
                id.clone(),
                RoomEvent::ThemeChanged {
                    theme: theme.clone(),
                },
            ));
        }
        outbound.extend(membership_events(room));
        outbound.push(Outbound::to_one(
            id.clone(),
            RoomEvent::ChatHistory {
                messages: room.messages.iter().cloned().collect(),
            },
        ));
        if added {
            push_to_targets(
                &mut outbound,
                room.member_ids_except(id),
                RoomEvent::UserJoined { name },
            );
        }

        // Messages sent by others reach this member now.
        let received: Vec<(MessageId, Option<ConnectionId>)> = room
            .messages
            .iter()
            .filter(|m| m.sender_connection.as_ref() != Some(id))
            .map(|m| (m.id.clone(), m.sender_connection.clone()))
            .collect();
        for (message_id, sender) in received {
            if room.mark_delivered(&message_id) != Some(true) {
                continue;
            }
            if let Some(sender) = sender.filter(|s| room.is_member(s)) {
                outbound.push(Outbound::to_one(
                    sender,
                    RoomEvent::StatusUpdate {
                        message_id,
                        status: DeliveryStatus::Delivered,
                    },
                ));
            }
        }

        Ok(Joined {
            left,
            created,
            outbound,
        })
    }

    /// Explicitly leave `pin`.
    pub fn leave(
        &mut self,
        id: &ConnectionId,
        pin: &Pin,
        now: Timestamp,
    ) -> Result<Departure, RoomError> {
        let connection = self
            .connections
            .get(id)
            .ok_or_else(|| RoomError::UnknownConnection(id.to_string()))?;
        if connection.room.as_ref() != Some(pin) {
            return Err(not_in_room(id, pin));
        }
        self.remove_from_room(id, pin, now)
            .ok_or_else(|| not_in_room(id, pin))
    }

    /// Forget a connection entirely. Returns `None` if it was unknown or in no room.
    pub fn disconnect(&mut self, id: &ConnectionId, now: Timestamp) -> Option<Departure> {
        let connection = self.connections.get(id)?;
        let departure = match connection.room.clone() {
            Some(pin) => self.remove_from_room(id, &pin, now),
            None => None,
        };
        self.connections.remove(id);
        departure
    }

    fn remove_from_room(&mut self, id: &ConnectionId, pin: &Pin, now: Timestamp) -> Option<Departure> {
        if let Some(connection) = self.connections.get_mut(id) {
            connection.room = None;
            connection.name = None;
        }

        let room = self.rooms.get_mut(pin)?;
        let member = room.remove_member(id)?;
        room.touch(now);

        let mut outbound = membership_events(room);
        push_to_targets(
            &mut outbound,
            room.member_ids(),
            RoomEvent::UserLeft {
                name: member.name.clone(),
            },
        );

        Some(Departure {
            pin: pin.clone(),
            name: member.name,
            outbound,
            room_empty: room.member_count() == 0,
        })
    }

    /// Send the member list and count of `pin` to the requester only.
    pub fn current_users(&self, id: &ConnectionId, pin: &Pin) -> Result<Vec<Outbound>, RoomError> {
        let room = self.room_or_err(pin)?;
        Ok(vec![
            Outbound::to_one(
                id.clone(),
                RoomEvent::CurrentUsers {
                    users: room.members.clone(),
                },
            ),
            Outbound::to_one(
                id.clone(),
                RoomEvent::UserCountUpdate {
                    count: room.member_count(),
                },
            ),
        ])
    }

    /// Append a message to the room log and fan it out to everyone but the sender.
    pub fn send_message(
        &mut self,
        id: &ConnectionId,
        pin: &Pin,
        message: NewMessage,
        now: Timestamp,
    ) -> Result<Vec<Outbound>, RoomError> {
        let connection = self
            .connections
            .get(id)
            .ok_or_else(|| RoomError::UnknownConnection(id.to_string()))?;
        let room = self
            .rooms
            .get_mut(pin)
            .ok_or_else(|| RoomError::UnknownRoom(pin.to_string()))?;
        if !room.is_member(id) {
            return Err(not_in_room(id, pin));
        }
        if room.contains_message(&message.id) {
            return Err(RoomError::DuplicateMessage {
                pin: pin.to_string(),
                message_id: message.id.to_string(),
            });
        }
        let sender = message
            .sender
            .or_else(|| connection.name.clone())
            .ok_or_else(|| RoomError::NotJoined(id.to_string()))?;

        let chat_message = ChatMessage {
            id: message.id,
            sender,
            sender_connection: Some(id.clone()),
            body: message.body,
            reply_to: message.reply_to,
            timestamp: message.timestamp.unwrap_or(now),
        };
        let message_id = chat_message.id.clone();
        room.push_message(chat_message.clone());
        room.touch(now);

        let mut outbound = Vec::new();
        push_to_targets(
            &mut outbound,
            room.member_ids_except(id),
            RoomEvent::Message(chat_message),
        );
        if room.member_count() > 1 {
            room.mark_delivered(&message_id);
            outbound.push(Outbound::to_one(
                id.clone(),
                RoomEvent::StatusUpdate {
                    message_id,
                    status: DeliveryStatus::Delivered,
                },
            ));
        }
        Ok(outbound)
    }

    /// Count one more `symbol` reaction on a message.
    pub fn react(
        &mut self,
        pin: &Pin,
        message_id: &MessageId,
        symbol: &str,
        now: Timestamp,
    ) -> Result<Vec<Outbound>, RoomError> {
        let room = self.room_mut_or_err(pin)?;
        let count = room
            .add_reaction(message_id, symbol)
            .ok_or_else(|| unknown_message(pin, message_id))?;
        room.touch(now);
        Ok(vec![Outbound::new(
            room.member_ids(),
            RoomEvent::Reaction {
                message_id: message_id.clone(),
                reaction: symbol.to_string(),
                count,
            },
        )])
    }

    /// Remove a message together with its status and reactions.
    pub fn unsend(
        &mut self,
        pin: &Pin,
        message_id: &MessageId,
        now: Timestamp,
    ) -> Result<Vec<Outbound>, RoomError> {
        let room = self.room_mut_or_err(pin)?;
        room.remove_message(message_id)
            .ok_or_else(|| unknown_message(pin, message_id))?;
        room.touch(now);
        Ok(vec![Outbound::new(
            room.member_ids(),
            RoomEvent::Unsent {
                message_id: message_id.clone(),
            },
        )])
    }

    /// Record that the connection's user has seen a message.
    pub fn mark_seen(
        &mut self,
        id: &ConnectionId,
        pin: &Pin,
        message_id: &MessageId,
    ) -> Result<Vec<Outbound>, RoomError> {
        let name = self
            .connections
            .get(id)
            .ok_or_else(|| RoomError::UnknownConnection(id.to_string()))?
            .name
            .clone()
            .ok_or_else(|| RoomError::NotJoined(id.to_string()))?;
        let room = self.room_mut_or_err(pin)?;
        if !room.is_member(id) {
            return Err(not_in_room(id, pin));
        }
        let seen_by = room
            .mark_seen(message_id, &name)
            .ok_or_else(|| unknown_message(pin, message_id))?;
        Ok(vec![Outbound::new(
            room.member_ids(),
            RoomEvent::SeenUpdate {
                message_id: message_id.clone(),
                seen_by,
            },
        )])
    }

    /// Mark a message delivered and tell the whole room.
    pub fn mark_delivered(
        &mut self,
        pin: &Pin,
        message_id: &MessageId,
    ) -> Result<Vec<Outbound>, RoomError> {
        let room = self.room_mut_or_err(pin)?;
        room.mark_delivered(message_id)
            .ok_or_else(|| unknown_message(pin, message_id))?;
        Ok(vec![Outbound::new(
            room.member_ids(),
            RoomEvent::StatusUpdate {
                message_id: message_id.clone(),
                status: DeliveryStatus::Delivered,
            },
        )])
    }

    /// Relay a typing indicator to everyone but the typist. No state changes.
    pub fn typing(
        &self,
        id: &ConnectionId,
        pin: &Pin,
        name: Option<DisplayName>,
        started: bool,
    ) -> Result<Vec<Outbound>, RoomError> {
        let room = self.room_or_err(pin)?;
        if !room.is_member(id) {
            return Err(not_in_room(id, pin));
        }
        let name = match name {
            Some(name) => name,
            None => self
                .connections
                .get(id)
                .and_then(|c| c.name.clone())
                .ok_or_else(|| RoomError::NotJoined(id.to_string()))?,
        };
        let event = if started {
            RoomEvent::TypingStart { name }
        } else {
            RoomEvent::TypingStop { name }
        };
        let mut outbound = Vec::new();
        push_to_targets(&mut outbound, room.member_ids_except(id), event);
        Ok(outbound)
    }

    /// Overwrite the room theme (last writer wins).
    pub fn change_theme(
        &mut self,
        pin: &Pin,
        theme: String,
        now: Timestamp,
    ) -> Result<Vec<Outbound>, RoomError> {
        let room = self.room_mut_or_err(pin)?;
        room.theme = Some(theme.clone());
        room.touch(now);
        Ok(vec![Outbound::new(
            room.member_ids(),
            RoomEvent::ThemeChanged { theme },
        )])
    }

    /// Remove a room immediately and detach its members.
    pub fn delete_room(&mut self, pin: &Pin) -> Result<Vec<Outbound>, RoomError> {
        let room = self
            .rooms
            .remove(pin)
            .ok_or_else(|| RoomError::UnknownRoom(pin.to_string()))?;
        let members = room.member_ids();
        for member in &members {
            if let Some(connection) = self.connections.get_mut(member) {
                connection.room = None;
                connection.name = None;
            }
        }
        let mut outbound = Vec::new();
        push_to_targets(&mut outbound, members, RoomEvent::RoomDeleted);
        Ok(outbound)
    }

    /// Drop a room whose grace period elapsed, if it is still empty.
    pub fn expire_room(&mut self, pin: &Pin) -> bool {
        match self.rooms.get(pin) {
            Some(room) if room.member_count() == 0 => {
                self.rooms.remove(pin);
                true
            }
            _ => false,
        }
    }

    /// Flatten every room into a snapshot.
    pub fn snapshot(&self, now: Timestamp) -> Snapshot {
        Snapshot {
            saved_at: now.value(),
            rooms: self
                .rooms
                .iter()
                .map(|(pin, room)| (pin.as_str().to_string(), RoomSnapshot::from(room)))
                .collect(),
        }
    }

    /// Seed the tables from a snapshot and return the pins of the restored rooms.
    ///
    /// Rooms that already exist in memory are newer than the snapshot and are
    /// left untouched. Restored rooms have no members.
    pub fn restore(&mut self, snapshot: Snapshot) -> Vec<Pin> {
        let mut restored = Vec::new();
        for (pin, saved) in snapshot.rooms {
            let Ok(pin) = Pin::new(pin) else {
                continue;
            };
            if self.rooms.contains_key(&pin) {
                continue;
            }
            let room = saved.into_room(pin.clone(), self.history_capacity);
            self.rooms.insert(pin.clone(), room);
            restored.push(pin);
        }
        restored
    }

    fn room_or_err(&self, pin: &Pin) -> Result<&Room, RoomError> {
        self.rooms
            .get(pin)
            .ok_or_else(|| RoomError::UnknownRoom(pin.to_string()))
    }

    fn room_mut_or_err(&mut self, pin: &Pin) -> Result<&mut Room, RoomError> {
        self.rooms
            .get_mut(pin)
            .ok_or_else(|| RoomError::UnknownRoom(pin.to_string()))
    }
}

fn not_in_room(id: &ConnectionId, pin: &Pin) -> RoomError {
    RoomError::NotInRoom {
        connection_id: id.to_string(),
        pin: pin.to_string(),
    }
}

fn unknown_message(pin: &Pin, message_id: &MessageId) -> RoomError {
    RoomError::UnknownMessage {
        pin: pin.to_string(),
        message_id: message_id.to_string(),
    }
}
