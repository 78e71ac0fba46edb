//! Shared utilities for the Pinchat workspace.

pub mod logger;
pub mod time;
