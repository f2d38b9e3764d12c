//! End-to-end turns through the router with scripted backend doubles.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;

use dm_client::{DialogueBackend, TranscriptArchiver};
use dm_domain::config::Config;
use dm_domain::dialogue::{DialogueAction, TraceEvent};
use dm_domain::error::{Error, Result};
use dm_gateway::api;
use dm_gateway::state::AppState;
use dm_sessions::InMemorySessionStore;

// ── Doubles ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Reset(String),
    Advance(String, DialogueAction),
}

#[derive(Default)]
struct ScriptedBackend {
    calls: Mutex<Vec<Call>>,
    replies: Mutex<VecDeque<Result<Vec<TraceEvent>>>>,
    fail_reset: bool,
}

impl ScriptedBackend {
    fn reply(self, traces: Vec<TraceEvent>) -> Self {
        self.replies.lock().unwrap().push_back(Ok(traces));
        self
    }

    fn fail_next(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(Error::Backend(message.into())));
        self
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DialogueBackend for ScriptedBackend {
    async fn reset_user_state(&self, user_id: &str) -> Result<()> {
        self.calls.lock().unwrap().push(Call::Reset(user_id.into()));
        if self.fail_reset {
            return Err(Error::Backend("reset refused".into()));
        }
        Ok(())
    }

    async fn advance_dialogue(
        &self,
        user_id: &str,
        action: &DialogueAction,
    ) -> Result<Vec<TraceEvent>> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Advance(user_id.into(), action.clone()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

struct ChannelArchiver(mpsc::UnboundedSender<String>);

#[async_trait]
impl TranscriptArchiver for ChannelArchiver {
    async fn save_transcript(&self, user_id: &str) -> Result<()> {
        let _ = self.0.send(user_id.to_owned());
        Ok(())
    }
}

struct Harness {
    state: AppState,
    backend: Arc<ScriptedBackend>,
    archived: mpsc::UnboundedReceiver<String>,
}

fn harness(backend: ScriptedBackend) -> Harness {
    let mut config = Config::default();
    config.call.forwarding_number = Some("+15550199".into());
    harness_with(backend, config)
}

fn harness_with(backend: ScriptedBackend, config: Config) -> Harness {
    let backend = Arc::new(backend);
    let (tx, archived) = mpsc::unbounded_channel();
    let state = AppState {
        sessions: Arc::new(InMemorySessionStore::new(&config.sessions)),
        config: Arc::new(config),
        backend: backend.clone(),
        archiver: Arc::new(ChannelArchiver(tx)),
    };
    Harness {
        state,
        backend,
        archived,
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn speak(text: &str) -> TraceEvent {
    TraceEvent::new("text", json!({ "message": text }))
}

fn turn_body(call_id: &str, last: &str) -> Value {
    json!({
        "messages": [
            { "role": "system", "content": "You are a receptionist." },
            { "role": "user", "content": last }
        ],
        "call": { "id": call_id, "customer": { "number": "+15550100" } }
    })
}

struct Reply {
    status: StatusCode,
    content_type: String,
    cache_control: String,
    connection: String,
    body: String,
}

impl Reply {
    /// `data:` payloads in order, `[DONE]` included.
    fn frames(&self) -> Vec<String> {
        self.body
            .split("\n\n")
            .filter_map(|block| block.trim().strip_prefix("data:"))
            .map(|data| data.trim().to_owned())
            .collect()
    }

    fn chunks(&self) -> Vec<Value> {
        self.frames()
            .iter()
            .filter(|f| f.as_str() != "[DONE]")
            .map(|f| serde_json::from_str(f).unwrap())
            .collect()
    }

    fn contents(&self) -> Vec<String> {
        self.chunks()
            .iter()
            .filter_map(|c| c["choices"][0]["delta"]["content"].as_str().map(String::from))
            .collect()
    }

    fn function_calls(&self) -> Vec<Value> {
        self.chunks()
            .iter()
            .filter_map(|c| {
                let call = &c["choices"][0]["delta"]["function_call"];
                (!call.is_null()).then(|| call.clone())
            })
            .collect()
    }

    fn stops(&self) -> usize {
        self.chunks()
            .iter()
            .filter(|c| c["choices"][0]["finish_reason"] == "stop")
            .count()
    }
}

async fn post_turn(state: &AppState, path: &str, body: Value) -> Reply {
    let resp = api::router()
        .with_state(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(path)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = resp.status();
    let header_str = |name: header::HeaderName| {
        resp.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned()
    };
    let content_type = header_str(header::CONTENT_TYPE);
    let cache_control = header_str(header::CACHE_CONTROL);
    let connection = header_str(header::CONNECTION);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    Reply {
        status,
        content_type,
        cache_control,
        connection,
        body: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}

async fn next_archive(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("archival was not triggered")
        .expect("archiver channel closed")
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn first_turn_resets_then_launches() {
    let h = harness(ScriptedBackend::default().reply(vec![speak("Welcome to Acme.")]));

    let reply = post_turn(&h.state, "/chat/completions", turn_body("call-1", "hello")).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.content_type.starts_with("text/event-stream"));
    assert_eq!(reply.cache_control, "no-cache");
    assert_eq!(reply.connection, "keep-alive");
    assert_eq!(
        h.backend.calls(),
        vec![
            Call::Reset("+15550100".into()),
            Call::Advance("+15550100".into(), DialogueAction::Launch),
        ]
    );
    assert_eq!(reply.contents(), vec!["Welcome to Acme.".to_string()]);
    assert_eq!(reply.stops(), 1);
    assert_eq!(reply.frames().last().map(String::as_str), Some("[DONE]"));
}

#[tokio::test]
async fn later_turns_send_last_message_without_reset() {
    let h = harness(
        ScriptedBackend::default()
            .reply(vec![speak("Welcome.")])
            .reply(vec![speak("Booked for Tuesday.")]),
    );

    post_turn(&h.state, "/chat/completions", turn_body("call-1", "hi")).await;
    let reply = post_turn(
        &h.state,
        "/v1/chat/completions",
        turn_body("call-1", "Tuesday please"),
    )
    .await;

    assert_eq!(reply.status, StatusCode::OK);
    let calls = h.backend.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(
        calls[2],
        Call::Advance("+15550100".into(), DialogueAction::Text("Tuesday please".into()))
    );
    assert_eq!(
        calls.iter().filter(|c| matches!(c, Call::Reset(_))).count(),
        1
    );
    assert_eq!(reply.contents(), vec!["Booked for Tuesday.".to_string()]);
}

#[tokio::test]
async fn replayed_first_request_is_treated_as_a_continuation() {
    let h = harness(ScriptedBackend::default());

    post_turn(&h.state, "/chat/completions", turn_body("call-9", "hi")).await;
    post_turn(&h.state, "/chat/completions", turn_body("call-9", "hi")).await;

    let resets = h
        .backend
        .calls()
        .iter()
        .filter(|c| matches!(c, Call::Reset(_)))
        .count();
    assert_eq!(resets, 1);
}

#[tokio::test]
async fn speech_is_streamed_in_order_and_other_traces_are_skipped() {
    let h = harness(ScriptedBackend::default().reply(vec![
        speak("One."),
        TraceEvent::new("visual", json!({ "image": "x.png" })),
        TraceEvent::new("speak", json!({ "message": "Two." })),
        TraceEvent::new("path", Value::Null),
        speak("Three."),
    ]));

    let reply = post_turn(&h.state, "/chat/completions", turn_body("call-2", "hi")).await;

    assert_eq!(reply.contents(), vec!["One.", "Two.", "Three."]);
    assert!(reply.function_calls().is_empty());
    assert_eq!(reply.stops(), 1);
}

#[tokio::test]
async fn handoff_emits_a_single_transfer_without_stop() {
    let h = harness(ScriptedBackend::default().reply(vec![
        speak("Let me connect you."),
        TraceEvent::new("custom", json!({ "type": "Handoff Human" })),
    ]));

    let reply = post_turn(&h.state, "/chat/completions", turn_body("call-3", "agent")).await;

    let calls = reply.function_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["name"], "transferCall");
    let args: Value = serde_json::from_str(calls[0]["arguments"].as_str().unwrap()).unwrap();
    assert_eq!(args, json!({ "destination": "+15550199" }));
    assert_eq!(reply.stops(), 0);
    assert_eq!(reply.frames().last().map(String::as_str), Some("[DONE]"));
}

#[tokio::test]
async fn handoff_wins_over_end_with_one_transfer_chunk() {
    let h = harness(ScriptedBackend::default().reply(vec![
        speak("Transferring you now."),
        TraceEvent::new("end", Value::Null),
        TraceEvent::new("custom", json!({ "type": "Handoff Human" })),
        TraceEvent::new("custom", json!({ "type": "end_call" })),
    ]));

    let reply = post_turn(&h.state, "/chat/completions", turn_body("call-14", "human")).await;

    let calls = reply.function_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["name"], "transferCall");
    assert_eq!(reply.stops(), 0);
    assert_eq!(reply.contents(), vec!["Transferring you now.".to_string()]);
    let frames = reply.frames();
    assert_eq!(frames.iter().filter(|f| f.as_str() == "[DONE]").count(), 1);
    assert_eq!(frames.last().map(String::as_str), Some("[DONE]"));
    // A transfer is not an end of conversation; the call stays tracked.
    assert!(!h.state.sessions.is_new_conversation("call-14"));
}

#[tokio::test]
async fn unparseable_legacy_handoff_payload_still_transfers() {
    let h = harness(ScriptedBackend::default().reply(vec![TraceEvent::new(
        "Handoff Human",
        json!("not json {"),
    )]));

    let reply = post_turn(&h.state, "/chat/completions", turn_body("call-4", "agent")).await;

    let calls = reply.function_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["name"], "transferCall");
}

#[tokio::test]
async fn end_trace_emits_end_call_and_evicts_the_call() {
    let h = harness(
        ScriptedBackend::default()
            .reply(vec![speak("Goodbye."), TraceEvent::new("end", Value::Null)]),
    );

    let reply = post_turn(&h.state, "/chat/completions", turn_body("call-5", "bye")).await;

    let calls = reply.function_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["name"], "endCall");
    assert_eq!(calls[0]["arguments"], "{}");
    assert_eq!(reply.stops(), 0);
    assert_eq!(reply.contents(), vec!["Goodbye.".to_string()]);
    assert!(h.state.sessions.is_new_conversation("call-5"));
}

#[tokio::test]
async fn end_call_keeps_the_call_when_eviction_is_disabled() {
    let mut config = Config::default();
    config.sessions.evict_on_end = false;
    let h = harness_with(
        ScriptedBackend::default().reply(vec![TraceEvent::new("end", Value::Null)]),
        config,
    );

    post_turn(&h.state, "/chat/completions", turn_body("call-6", "bye")).await;

    assert!(!h.state.sessions.is_new_conversation("call-6"));
}

#[tokio::test]
async fn replayed_end_turn_starts_over_after_eviction() {
    let h = harness(
        ScriptedBackend::default()
            .reply(vec![speak("Welcome.")])
            .reply(vec![speak("Goodbye."), TraceEvent::new("end", Value::Null)]),
    );

    post_turn(&h.state, "/chat/completions", turn_body("call-15", "hi")).await;
    post_turn(&h.state, "/chat/completions", turn_body("call-15", "bye")).await;
    post_turn(&h.state, "/chat/completions", turn_body("call-15", "bye")).await;

    let calls = h.backend.calls();
    assert_eq!(
        calls[calls.len() - 2..],
        [
            Call::Reset("+15550100".into()),
            Call::Advance("+15550100".into(), DialogueAction::Launch),
        ]
    );
}

#[tokio::test]
async fn replayed_end_turn_continues_when_eviction_is_disabled() {
    let mut config = Config::default();
    config.sessions.evict_on_end = false;
    let h = harness_with(
        ScriptedBackend::default()
            .reply(vec![speak("Welcome.")])
            .reply(vec![TraceEvent::new("end", Value::Null)]),
        config,
    );

    post_turn(&h.state, "/chat/completions", turn_body("call-16", "hi")).await;
    post_turn(&h.state, "/chat/completions", turn_body("call-16", "bye")).await;
    post_turn(&h.state, "/chat/completions", turn_body("call-16", "bye")).await;

    let calls = h.backend.calls();
    assert_eq!(
        calls.iter().filter(|c| matches!(c, Call::Reset(_))).count(),
        1
    );
    assert_eq!(
        calls.last(),
        Some(&Call::Advance("+15550100".into(), DialogueAction::Text("bye".into())))
    );
}

#[tokio::test]
async fn undecodable_turn_body_returns_500_json() {
    let h = harness(ScriptedBackend::default());

    let reply = post_turn(&h.state, "/chat/completions", json!({ "messages": [] })).await;

    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(reply.content_type.starts_with("application/json"));
    let body: Value = serde_json::from_str(&reply.body).unwrap();
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("call"), "{message}");
    assert!(h.backend.calls().is_empty());
}

#[tokio::test]
async fn backend_failure_returns_500_without_a_stream() {
    let mut h = harness(ScriptedBackend::default().fail_next("runtime exploded"));

    let reply = post_turn(&h.state, "/chat/completions", turn_body("call-7", "hi")).await;

    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(reply.content_type.starts_with("application/json"));
    let body: Value = serde_json::from_str(&reply.body).unwrap();
    assert!(body["error"].as_str().unwrap().contains("runtime exploded"));
    assert!(h.archived.try_recv().is_err());
}

#[tokio::test]
async fn reset_failure_skips_the_advance() {
    let h = harness(ScriptedBackend {
        fail_reset: true,
        ..Default::default()
    });

    let reply = post_turn(&h.state, "/chat/completions", turn_body("call-8", "hi")).await;

    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(h.backend.calls(), vec![Call::Reset("+15550100".into())]);
}

#[tokio::test]
async fn transcript_is_archived_after_the_stream() {
    let mut h = harness(ScriptedBackend::default().reply(vec![speak("Hi.")]));

    post_turn(&h.state, "/chat/completions", turn_body("call-10", "hi")).await;

    assert_eq!(next_archive(&mut h.archived).await, "+15550100");
}

#[tokio::test]
async fn call_id_is_the_user_id_without_a_customer_number() {
    let mut h = harness(ScriptedBackend::default());

    post_turn(
        &h.state,
        "/chat/completions",
        json!({ "messages": [], "call": { "id": "call-11" } }),
    )
    .await;

    assert_eq!(
        h.backend.calls()[0],
        Call::Reset("call-11".into())
    );
    assert_eq!(next_archive(&mut h.archived).await, "call-11");
}

#[tokio::test]
async fn continuing_turn_without_messages_is_rejected() {
    let h = harness(ScriptedBackend::default());
    h.state.sessions.mark_seen("call-12");

    let reply = post_turn(
        &h.state,
        "/chat/completions",
        json!({ "messages": [], "call": { "id": "call-12" } }),
    )
    .await;

    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(h.backend.calls().is_empty());
}

#[tokio::test]
async fn health_reports_tracked_sessions() {
    let h = harness(ScriptedBackend::default());
    h.state.sessions.mark_seen("call-13");

    let resp = api::router()
        .with_state(h.state.clone())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({ "status": "ok", "sessions": 1 }));
}
