//! Per-call conversation tracking for dmbridge.
//!
//! The bridge only needs to know whether a call identifier has been seen
//! before: the first turn of a call resets the backend dialogue and
//! launches it, every later turn continues it with the caller's text.

pub mod store;

pub use store::{InMemorySessionStore, SeenCall, SessionStore};
