//! Fire-and-forget transcript archival.

use std::sync::Arc;

use dm_client::TranscriptArchiver;
use dm_domain::events::BridgeEvent;
use tokio::task::JoinHandle;

/// Archive the transcript for `user_id` on a detached task.
///
/// The outcome is reported as a `TranscriptArchived` event and never reaches
/// the turn that triggered it.
pub fn spawn_archive(archiver: Arc<dyn TranscriptArchiver>, user_id: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result = archiver.save_transcript(&user_id).await;
        BridgeEvent::TranscriptArchived {
            ok: result.is_ok(),
            error: result.err().map(|e| e.to_string()),
            user_id,
        }
        .emit();
    })
}
