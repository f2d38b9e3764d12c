use serde::Serialize;

/// Structured events emitted across all dmbridge crates.
///
/// Every component outcome worth observing goes through [`BridgeEvent::emit`]
/// so log pipelines can key on a single `bridge_event` field.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum BridgeEvent {
    InboundTurn {
        call_id: String,
        messages: usize,
        tools: usize,
    },
    SessionResolved {
        call_id: String,
        user_id: String,
        is_new: bool,
    },
    SessionEvicted {
        call_id: String,
        reason: String,
    },
    BackendCall {
        endpoint: String,
        status: u16,
        duration_ms: u64,
    },
    TraceSkipped {
        kind: String,
    },
    TurnTranslated {
        call_id: String,
        deltas: usize,
        end_call: bool,
        transfer_call: bool,
    },
    TranscriptArchived {
        user_id: String,
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl BridgeEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        match self {
            Self::TranscriptArchived { ok: false, .. } => {
                tracing::warn!(bridge_event = %json, "dm_event");
            }
            _ => tracing::info!(bridge_event = %json, "dm_event"),
        }
    }
}
