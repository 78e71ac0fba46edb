//! Real-time chat relay organized around short PIN-identified rooms.
//!
//! Connections join a room by PIN, exchange messages, reactions, read and
//! delivery receipts, typing indicators and a shared theme. Rooms live in
//! memory, survive a short grace period after the last member leaves, and
//! are mirrored to a snapshot store so they outlive restarts.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
