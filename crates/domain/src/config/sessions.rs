use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session registry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Bounds for the in-memory "have I seen this call" registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Hard cap on tracked calls.  When full, the least recently seen
    /// call is dropped.
    #[serde(default = "d_max_entries")]
    pub max_entries: usize,

    /// Calls idle for longer than this are pruned.
    #[serde(default = "d_idle_ttl_secs")]
    pub idle_ttl_secs: u64,

    /// Forget a call as soon as a turn ends it.
    #[serde(default = "d_true")]
    pub evict_on_end: bool,

    #[serde(default = "d_prune_interval_secs")]
    pub prune_interval_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            max_entries: d_max_entries(),
            idle_ttl_secs: d_idle_ttl_secs(),
            evict_on_end: true,
            prune_interval_secs: d_prune_interval_secs(),
        }
    }
}

fn d_max_entries() -> usize {
    100_000
}
fn d_idle_ttl_secs() -> u64 {
    86_400
}
fn d_true() -> bool {
    true
}
fn d_prune_interval_secs() -> u64 {
    60
}
