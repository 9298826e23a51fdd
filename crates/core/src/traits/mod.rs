//! Collaborator traits
//!
//! The orchestrator never talks to a concrete recognizer, model, synthesizer
//! or transport. It issues commands through these traits:
//!
//! ```text
//! CommandSink:
//!   - send_transcript: caption lines to the message collector
//!   - send_tts_text / send_tts_flush: synthesis requests and cancellation
//!   - flush_transport: drop buffered outbound audio
//!
//! ModelControl:
//!   - submit: start a response for a turn
//!   - cancel: stop in-flight generation
//!   - register_tool: forward function-calling tools
//! ```

mod sinks;

pub use sinks::{CommandSink, ModelControl};
