//! The traits the turn handler depends on.  The REST client implements
//! both; tests substitute in-process doubles.

use async_trait::async_trait;
use dm_domain::dialogue::{DialogueAction, TraceEvent};
use dm_domain::error::Result;

/// The two dialogue operations the bridge needs from the backend.
#[async_trait]
pub trait DialogueBackend: Send + Sync {
    /// Delete any prior dialogue state for `user_id` (DELETE /state/user/{userId}).
    async fn reset_user_state(&self, user_id: &str) -> Result<()>;

    /// Send `action` and return the resulting trace sequence
    /// (POST /state/user/{userId}/interact).
    async fn advance_dialogue(
        &self,
        user_id: &str,
        action: &DialogueAction,
    ) -> Result<Vec<TraceEvent>>;
}

/// Persists a transcript record once a turn has been answered.
#[async_trait]
pub trait TranscriptArchiver: Send + Sync {
    /// PUT /v2/transcripts for `user_id`.
    async fn save_transcript(&self, user_id: &str) -> Result<()>;
}
