//! OpenAI-compatible `/chat/completions` endpoint for voice-agent platforms.
//!
//! The platform posts the call's message list on every caller turn.  The
//! bridge advances the backend dialogue, then answers with a streamed
//! `chat.completion.chunk` sequence: one content delta per spoken trace,
//! exactly one terminal chunk (a `transferCall` or `endCall` function call,
//! or a plain `stop`), and the `[DONE]` sentinel.

use std::convert::Infallible;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Json, Response};
use futures_util::stream::Stream;
use serde::{Deserialize, Serialize};

use dm_domain::error::Error;
use dm_domain::events::BridgeEvent;

use crate::runtime::turn::resolve_user_id;
use crate::runtime::{prepare_turn, spawn_archive, PreparedTurn, TraceTranslator, TurnInput, TurnOutcome};
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    pub call: CallDescriptor,
    /// Function manifest offered by the platform.  Accepted, not consumed.
    #[serde(default)]
    pub tools: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallDescriptor {
    pub id: String,
    #[serde(default)]
    pub customer: Option<Customer>,
}

#[derive(Debug, Deserialize)]
pub struct Customer {
    #[serde(default)]
    pub number: Option<String>,
}

impl TurnRequest {
    pub fn turn_input(&self) -> TurnInput {
        let number = self
            .call
            .customer
            .as_ref()
            .and_then(|c| c.number.as_deref());
        TurnInput {
            call_id: self.call.id.clone(),
            user_id: resolve_user_id(&self.call.id, number),
            utterance: self
                .messages
                .last()
                .map(|m| m.content.clone().unwrap_or_default()),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Streaming chunk types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Serialize)]
pub struct ChatChunk {
    id: String,
    object: &'static str,
    created: i64,
    model: String,
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Serialize)]
struct ChunkChoice {
    index: u32,
    delta: ChunkDelta,
    finish_reason: Option<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ChunkDelta {
    Content {
        content: String,
    },
    FunctionCall {
        content: Option<String>,
        function_call: FunctionCall,
    },
    Empty {},
}

#[derive(Debug, Serialize)]
struct FunctionCall {
    name: &'static str,
    arguments: String,
}

/// Builds every chunk of one turn with a shared id and model tag.
#[derive(Debug, Clone)]
pub struct ChunkFactory {
    id: String,
    model: String,
}

impl ChunkFactory {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            id: format!("chatcmpl-{}", uuid::Uuid::new_v4()),
            model: model.into(),
        }
    }

    fn chunk(&self, delta: ChunkDelta, finish_reason: Option<&'static str>) -> ChatChunk {
        ChatChunk {
            id: self.id.clone(),
            object: "chat.completion.chunk",
            created: chrono::Utc::now().timestamp(),
            model: self.model.clone(),
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason,
            }],
        }
    }

    pub fn content(&self, text: String) -> ChatChunk {
        self.chunk(ChunkDelta::Content { content: text }, None)
    }

    pub fn function_call(&self, name: &'static str, arguments: String) -> ChatChunk {
        self.chunk(
            ChunkDelta::FunctionCall {
                content: None,
                function_call: FunctionCall { name, arguments },
            },
            None,
        )
    }

    pub fn stop(&self) -> ChatChunk {
        self.chunk(ChunkDelta::Empty {}, Some("stop"))
    }

    /// The single terminal chunk for `outcome`.
    pub fn terminal(&self, outcome: TurnOutcome, forwarding_number: Option<&str>) -> ChatChunk {
        match outcome {
            TurnOutcome::TransferCall => {
                self.function_call("transferCall", transfer_arguments(forwarding_number))
            }
            TurnOutcome::EndCall => self.function_call("endCall", "{}".into()),
            TurnOutcome::Stop => self.stop(),
        }
    }
}

fn transfer_arguments(forwarding_number: Option<&str>) -> String {
    match forwarding_number {
        Some(number) => serde_json::json!({ "destination": number }).to_string(),
        None => {
            tracing::warn!("transfer requested but no forwarding number is configured");
            "{}".into()
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /chat/completions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn chat_completions(
    State(state): State<AppState>,
    body: Result<Json<TurnRequest>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            let err = Error::InvalidRequest(rejection.body_text());
            tracing::warn!(error = %err, "turn request rejected");
            return error_response(&err).into_response();
        }
    };

    BridgeEvent::InboundTurn {
        call_id: body.call.id.clone(),
        messages: body.messages.len(),
        tools: body.tools.as_ref().map_or(0, Vec::len),
    }
    .emit();
    tracing::debug!(request = ?body, "turn request received");

    let input = body.turn_input();
    let turn = match prepare_turn(&state, input).await {
        Ok(turn) => turn,
        Err(e) => {
            tracing::error!(call_id = %body.call.id, error = %e, "turn failed");
            return error_response(&e).into_response();
        }
    };

    let stream = make_turn_stream(state, turn);
    (
        [(header::CONNECTION, "keep-alive")],
        Sse::new(stream),
    )
        .into_response()
}

/// Translate the turn's traces into framed chunks, then archive.
///
/// Content deltas are yielded as each trace is translated; the terminal
/// chunk and `[DONE]` follow once every trace has been consumed.
fn make_turn_stream(
    state: AppState,
    turn: PreparedTurn,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        let chunks = ChunkFactory::new(state.config.call.model.clone());
        let mut translator = TraceTranslator::new();

        for trace in &turn.traces {
            if let Some(text) = translator.feed(trace) {
                if let Ok(data) = serde_json::to_string(&chunks.content(text)) {
                    yield Ok(Event::default().data(data));
                }
            }
        }

        let outcome = translator.outcome();
        BridgeEvent::TurnTranslated {
            call_id: turn.call_id.clone(),
            deltas: translator.deltas(),
            end_call: translator.end_call(),
            transfer_call: translator.transfer_call(),
        }
        .emit();
        tracing::debug!(text = %translator.assistant_text(), ?outcome, "assistant turn");

        if outcome == TurnOutcome::EndCall
            && state.config.sessions.evict_on_end
            && state.sessions.forget(&turn.call_id)
        {
            BridgeEvent::SessionEvicted {
                call_id: turn.call_id.clone(),
                reason: "end_call".into(),
            }
            .emit();
        }

        let terminal = chunks.terminal(outcome, state.config.call.forwarding_number.as_deref());
        if let Ok(data) = serde_json::to_string(&terminal) {
            yield Ok(Event::default().data(data));
        }

        // Terminate the stream with [DONE].
        yield Ok(Event::default().data("[DONE]"));

        spawn_archive(state.archiver.clone(), turn.user_id.clone());
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Non-streamed failure body: `500 {"error": "<message>"}`.
fn error_response(err: &Error) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": err.to_string() })),
    )
}
