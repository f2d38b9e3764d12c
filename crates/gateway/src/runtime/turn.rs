//! Turn orchestration up to the point the stream can be opened.
//!
//! A turn resolves the call's novelty, resets the backend dialogue for a new
//! call, and advances it with exactly one action.  Every failure here
//! happens before a single byte of the response is written.

use dm_domain::dialogue::{DialogueAction, TraceEvent};
use dm_domain::error::{Error, Result};
use dm_domain::events::BridgeEvent;

use crate::state::AppState;

/// The parts of an inbound turn request the runtime needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnInput {
    /// Registry key: the platform's call identifier.
    pub call_id: String,
    /// Backend session key: caller number when known, else the call id.
    pub user_id: String,
    /// Content of the last message, `None` when the list was empty.
    pub utterance: Option<String>,
}

/// A turn whose backend work is done and whose traces await translation.
#[derive(Debug, Clone)]
pub struct PreparedTurn {
    pub call_id: String,
    pub user_id: String,
    pub is_new: bool,
    pub action: DialogueAction,
    pub traces: Vec<TraceEvent>,
}

/// Prefer the customer's phone number, fall back to the call identifier.
pub fn resolve_user_id(call_id: &str, customer_number: Option<&str>) -> String {
    match customer_number {
        Some(number) if !number.trim().is_empty() => number.to_owned(),
        _ => call_id.to_owned(),
    }
}

/// `Launch` for a new call, otherwise `Text` with the caller's utterance.
pub fn select_action(is_new: bool, utterance: Option<&str>) -> Result<DialogueAction> {
    if is_new {
        return Ok(DialogueAction::Launch);
    }
    utterance
        .map(|text| DialogueAction::Text(text.to_owned()))
        .ok_or_else(|| Error::InvalidRequest("turn request has no messages".into()))
}

/// Run the backend half of a turn.
pub async fn prepare_turn(state: &AppState, input: TurnInput) -> Result<PreparedTurn> {
    let is_new = state.sessions.observe(&input.call_id);

    BridgeEvent::SessionResolved {
        call_id: input.call_id.clone(),
        user_id: input.user_id.clone(),
        is_new,
    }
    .emit();

    let action = select_action(is_new, input.utterance.as_deref())?;

    if is_new {
        state.backend.reset_user_state(&input.user_id).await?;
    }
    let traces = state
        .backend
        .advance_dialogue(&input.user_id, &action)
        .await?;

    tracing::debug!(
        call_id = %input.call_id,
        action = action.kind(),
        traces = traces.len(),
        "dialogue advanced"
    );

    Ok(PreparedTurn {
        call_id: input.call_id,
        user_id: input.user_id,
        is_new,
        action,
        traces,
    })
}
