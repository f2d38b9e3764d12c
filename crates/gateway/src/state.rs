use std::sync::Arc;

use dm_client::{DialogueBackend, TranscriptArchiver};
use dm_domain::config::Config;
use dm_sessions::SessionStore;

/// Shared application state passed to all API handlers.
///
/// Every collaborator sits behind a trait object so tests can wire in-process
/// doubles without touching the network.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Which calls have already had their first turn.
    pub sessions: Arc<dyn SessionStore>,
    pub backend: Arc<dyn DialogueBackend>,
    pub archiver: Arc<dyn TranscriptArchiver>,
}
