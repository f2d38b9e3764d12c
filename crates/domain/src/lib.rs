//! Shared types for the dmbridge crates: the error enum, the config tree,
//! dialogue wire types and structured log events.

pub mod config;
pub mod dialogue;
pub mod error;
pub mod events;
