//! AppState construction and background-task spawning extracted from `main.rs`.

use std::sync::Arc;

use anyhow::Context;

use dm_client::RestDialogueClient;
use dm_domain::config::{Config, ConfigSeverity};
use dm_sessions::InMemorySessionStore;

use crate::state::AppState;

/// Validate config, initialize every collaborator and return a fully-wired
/// [`AppState`].
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let error_count = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if error_count > 0 {
        anyhow::bail!("config validation failed with {error_count} error(s)");
    }

    // ── Dialogue backend (also the transcript archiver) ──────────────
    let client = Arc::new(
        RestDialogueClient::new(&config.backend).context("initializing dialogue client")?,
    );
    tracing::info!(
        runtime = %config.backend.runtime_base_url(),
        transcripts = %config.backend.transcripts_base_url(),
        timeout_ms = config.backend.timeout_ms,
        "dialogue client ready"
    );

    // ── Session registry ─────────────────────────────────────────────
    let sessions = Arc::new(InMemorySessionStore::new(&config.sessions));
    tracing::info!(
        max_entries = config.sessions.max_entries,
        idle_ttl_secs = config.sessions.idle_ttl_secs,
        evict_on_end = config.sessions.evict_on_end,
        "session registry ready"
    );

    Ok(AppState {
        config,
        sessions,
        backend: client.clone(),
        archiver: client,
    })
}

/// Spawn long-running maintenance loops.
pub fn spawn_background_tasks(state: &AppState) {
    // ── Periodic idle-call pruning ───────────────────────────────────
    let sessions = state.sessions.clone();
    let every = std::time::Duration::from_secs(state.config.sessions.prune_interval_secs.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let pruned = sessions.prune_expired(chrono::Utc::now());
            if pruned > 0 {
                tracing::info!(pruned, tracked = sessions.len(), "idle calls pruned");
            }
        }
    });
}
