//! UseCase layer: event routing, grace-period timers and persistence.

pub mod coordinator;
pub mod persistence;
pub mod scheduler;

pub use coordinator::{DEFAULT_GRACE_PERIOD, RoomCoordinator};
pub use persistence::{PersistenceStrategy, PersistenceSync, SharedRooms};
pub use scheduler::KeyedScheduler;
