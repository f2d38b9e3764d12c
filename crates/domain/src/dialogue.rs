//! Dialogue backend wire types shared by the client and the gateway.
//!
//! The backend speaks camelCase JSON with a `type` discriminator on both the
//! actions we send and the traces it returns.

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Actions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The instruction that advances the backend's dialogue state machine.
///
/// Exactly one action is sent per turn: `Launch` for a call the bridge has
/// never seen, `Text` for every turn after that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum DialogueAction {
    Launch,
    Text(String),
}

impl DialogueAction {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Launch => "launch",
            Self::Text(_) => "text",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Traces
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One item of the ordered trace sequence returned by an interact call.
///
/// The payload shape depends on `kind` and is not uniform (objects for
/// `text`/`speak`/`custom`, a JSON-encoded string for the legacy handoff
/// kind), so it is kept as raw JSON and interpreted by the translator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
}

impl TraceEvent {
    pub fn new(kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }
}
