//! Domain layer: chat rooms, their members and messages, and the ports the
//! outer layers implement.

pub mod command;
pub mod entity;
pub mod error;
pub mod event;
pub mod pusher;
pub mod rooms;
pub mod snapshot;
pub mod store;
pub mod value_object;

pub use command::RoomCommand;
pub use entity::{
    ChatMessage, Connection, DEFAULT_HISTORY_CAPACITY, DeliveryStatus, Member, MessageBody,
    MessageState, Room,
};
pub use error::{MessagePushError, RoomError, StoreError, ValueObjectError};
pub use event::{Outbound, RoomEvent};
pub use pusher::{MessagePusher, PusherChannel};
pub use rooms::{ChatRooms, Departure, Joined, NewMessage};
pub use snapshot::{MessageSnapshot, RoomSnapshot, Snapshot, StatusSnapshot};
pub use store::SnapshotStore;
pub use value_object::{ConnectionId, DisplayName, MessageId, Pin, Timestamp};
