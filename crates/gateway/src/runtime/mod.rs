//! Core runtime: session novelty and backend calls ([`turn`]), trace
//! translation ([`translate`]) and transcript archival ([`archive`]).

pub mod archive;
pub mod translate;
pub mod turn;

pub use archive::spawn_archive;
pub use translate::{classify_trace_event, TraceClass, TraceTranslator, TurnOutcome};
pub use turn::{prepare_turn, PreparedTurn, TurnInput};
