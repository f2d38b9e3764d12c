//! Trace translation.
//!
//! Turns the backend's ordered trace sequence into the caller-facing content
//! deltas plus one call-control outcome.  Both encodings of a human handoff
//! (the `custom` trace with a nested type, and the dedicated legacy kind)
//! are recognised in [`classify_trace_event`] and nowhere else.

use dm_domain::dialogue::TraceEvent;
use dm_domain::events::BridgeEvent;
use serde_json::Value;

/// Nested type (inside `custom`) and legacy trace kind meaning "get a human".
pub const HANDOFF_HUMAN: &str = "Handoff Human";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Classification
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// What a single trace means to the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceClass<'a> {
    /// Text to surface to the caller, verbatim.
    Speech(&'a str),
    /// The dialogue wants the call to end.
    EndCall,
    /// The dialogue wants the caller transferred to a human.
    TransferCall,
    /// A recognised kind that carries nothing for the caller.
    Ignored,
    /// A kind the bridge does not understand.
    Unknown,
}

pub fn classify_trace_event(trace: &TraceEvent) -> TraceClass<'_> {
    match trace.kind.as_str() {
        "text" | "speak" => match trace.payload.get("message").and_then(Value::as_str) {
            Some(message) if !message.is_empty() => TraceClass::Speech(message),
            _ => TraceClass::Ignored,
        },
        "end" => TraceClass::EndCall,
        "custom" => match trace.payload.get("type").and_then(Value::as_str) {
            Some(HANDOFF_HUMAN) => TraceClass::TransferCall,
            Some("end_call") => TraceClass::EndCall,
            _ => TraceClass::Ignored,
        },
        HANDOFF_HUMAN => classify_legacy_handoff(&trace.payload),
        _ => TraceClass::Unknown,
    }
}

/// The legacy handoff kind carries a JSON-encoded string payload.
///
/// Only a string that decodes to an object whose `type` is not
/// `transferCall` is ignored. Every other payload counts as a transfer
/// request.
fn classify_legacy_handoff(payload: &Value) -> TraceClass<'static> {
    let Value::String(raw) = payload else {
        tracing::warn!(payload = %payload, "handoff payload is not a JSON string, transferring");
        return TraceClass::TransferCall;
    };

    let parsed = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(fields)) => fields,
        Ok(other) => {
            tracing::warn!(payload = %other, "handoff payload is not an object, transferring");
            return TraceClass::TransferCall;
        }
        Err(e) => {
            tracing::warn!(error = %e, payload = %raw, "unparseable handoff payload, transferring");
            return TraceClass::TransferCall;
        }
    };

    if parsed.get("type").and_then(Value::as_str) == Some("transferCall") {
        TraceClass::TransferCall
    } else {
        TraceClass::Ignored
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Translator
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The single terminal signal of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    TransferCall,
    EndCall,
    Stop,
}

/// Incremental translator over one turn's traces.
///
/// Control flags only ever go from `false` to `true`.
#[derive(Debug, Default)]
pub struct TraceTranslator {
    end_call: bool,
    transfer_call: bool,
    deltas: usize,
    text: String,
}

impl TraceTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the next trace; returns the content delta to emit, if any.
    pub fn feed(&mut self, trace: &TraceEvent) -> Option<String> {
        tracing::debug!(kind = %trace.kind, payload = %trace.payload, "processing trace");

        match classify_trace_event(trace) {
            TraceClass::Speech(message) => {
                if !self.text.is_empty() {
                    self.text.push(' ');
                }
                self.text.push_str(message);
                self.deltas += 1;
                return Some(message.to_owned());
            }
            TraceClass::EndCall => self.end_call = true,
            TraceClass::TransferCall => self.transfer_call = true,
            TraceClass::Ignored => {}
            TraceClass::Unknown => {
                BridgeEvent::TraceSkipped {
                    kind: trace.kind.clone(),
                }
                .emit();
            }
        }
        None
    }

    /// Transfer wins over end-call; otherwise a plain stop.
    pub fn outcome(&self) -> TurnOutcome {
        if self.transfer_call {
            TurnOutcome::TransferCall
        } else if self.end_call {
            TurnOutcome::EndCall
        } else {
            TurnOutcome::Stop
        }
    }

    pub fn end_call(&self) -> bool {
        self.end_call
    }

    pub fn transfer_call(&self) -> bool {
        self.transfer_call
    }

    /// Number of content deltas produced so far.
    pub fn deltas(&self) -> usize {
        self.deltas
    }

    /// Everything said to the caller this turn, space-joined.
    pub fn assistant_text(&self) -> &str {
        &self.text
    }
}

/// Translate a whole trace sequence at once.
pub fn translate(traces: &[TraceEvent]) -> (Vec<String>, TurnOutcome) {
    let mut translator = TraceTranslator::new();
    let deltas = traces.iter().filter_map(|t| translator.feed(t)).collect();
    (deltas, translator.outcome())
}
