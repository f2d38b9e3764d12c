//! Session registry.
//!
//! [`SessionStore`] is the seam the turn handler depends on; it is passed in
//! through the application state so tests and alternative backings (a shared
//! cache across replicas, for instance) can stand in for the in-memory map.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

use dm_domain::config::SessionsConfig;
use dm_domain::events::BridgeEvent;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// "Have I seen this call before" tracking, keyed by call identifier.
pub trait SessionStore: Send + Sync {
    /// `true` when `call_id` has not been observed (or has been forgotten).
    fn is_new_conversation(&self, call_id: &str) -> bool;

    /// Record that `call_id` has been observed.  Idempotent.
    fn mark_seen(&self, call_id: &str);

    /// Check novelty and mark the call seen, in that order.
    ///
    /// Implementations may override this to make the pair atomic.
    fn observe(&self, call_id: &str) -> bool {
        let is_new = self.is_new_conversation(call_id);
        self.mark_seen(call_id);
        is_new
    }

    /// Drop `call_id`, returning whether it was tracked.
    fn forget(&self, call_id: &str) -> bool;

    /// Drop calls idle since before `now - ttl`.  Returns the number pruned.
    fn prune_expired(&self, _now: DateTime<Utc>) -> usize {
        0
    }

    /// Number of tracked calls.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// In-memory store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Bookkeeping for one observed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeenCall {
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub turns: u64,
}

/// Process-local registry bounded by an entry cap and an idle TTL.
pub struct InMemorySessionStore {
    max_entries: usize,
    idle_ttl: Duration,
    calls: RwLock<HashMap<String, SeenCall>>,
}

impl InMemorySessionStore {
    pub fn new(config: &SessionsConfig) -> Self {
        let secs = config.idle_ttl_secs.min(i64::MAX as u64 / 1000) as i64;
        let idle_ttl = Duration::seconds(secs);
        Self {
            max_entries: config.max_entries.max(1),
            idle_ttl,
            calls: RwLock::new(HashMap::new()),
        }
    }

    /// Snapshot of the bookkeeping for `call_id`.
    pub fn get(&self, call_id: &str) -> Option<SeenCall> {
        self.calls.read().get(call_id).copied()
    }

    fn touch_locked(&self, calls: &mut HashMap<String, SeenCall>, call_id: &str) -> bool {
        let now = Utc::now();
        if let Some(entry) = calls.get_mut(call_id) {
            entry.last_seen = now;
            entry.turns += 1;
            return false;
        }

        if calls.len() >= self.max_entries {
            evict_least_recent(calls);
        }
        calls.insert(
            call_id.to_owned(),
            SeenCall {
                first_seen: now,
                last_seen: now,
                turns: 1,
            },
        );
        true
    }
}

fn evict_least_recent(calls: &mut HashMap<String, SeenCall>) {
    let oldest = calls
        .iter()
        .min_by_key(|(_, seen)| seen.last_seen)
        .map(|(id, _)| id.clone());
    if let Some(call_id) = oldest {
        calls.remove(&call_id);
        BridgeEvent::SessionEvicted {
            call_id,
            reason: "capacity".into(),
        }
        .emit();
    }
}

impl SessionStore for InMemorySessionStore {
    fn is_new_conversation(&self, call_id: &str) -> bool {
        !self.calls.read().contains_key(call_id)
    }

    fn mark_seen(&self, call_id: &str) {
        let mut calls = self.calls.write();
        self.touch_locked(&mut calls, call_id);
    }

    fn observe(&self, call_id: &str) -> bool {
        let mut calls = self.calls.write();
        self.touch_locked(&mut calls, call_id)
    }

    fn forget(&self, call_id: &str) -> bool {
        self.calls.write().remove(call_id).is_some()
    }

    fn prune_expired(&self, now: DateTime<Utc>) -> usize {
        let Some(cutoff) = now.checked_sub_signed(self.idle_ttl) else {
            return 0;
        };
        let mut calls = self.calls.write();
        let before = calls.len();
        calls.retain(|_, seen| seen.last_seen > cutoff);
        let pruned = before - calls.len();
        if pruned > 0 {
            tracing::debug!(pruned, remaining = calls.len(), "pruned idle calls");
        }
        pruned
    }

    fn len(&self) -> usize {
        self.calls.read().len()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
