//! `dm-client`: dialogue backend client crate for dmbridge.
//!
//! Provides the [`DialogueBackend`] and [`TranscriptArchiver`] traits the
//! turn handler is written against, typed request bodies matching the
//! backend wire format, and a production REST implementation
//! ([`RestDialogueClient`]).
//!
//! # Quick start
//!
//! ```rust,no_run
//! use dm_domain::config::BackendConfig;
//! use dm_domain::dialogue::DialogueAction;
//! use dm_client::{DialogueBackend, RestDialogueClient};
//!
//! # async fn example() -> dm_domain::error::Result<()> {
//! let cfg = BackendConfig::default();
//! let client = RestDialogueClient::new(&cfg)?;
//!
//! client.reset_user_state("+15550100").await?;
//! let traces = client
//!     .advance_dialogue("+15550100", &DialogueAction::Launch)
//!     .await?;
//!
//! println!("backend returned {} traces", traces.len());
//! # Ok(())
//! # }
//! ```

pub mod provider;
pub mod rest;
pub mod types;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use provider::{DialogueBackend, TranscriptArchiver};
pub use rest::{from_reqwest, RestDialogueClient};
pub use types::{InteractRequest, TranscriptRecord, TurnConfig};
