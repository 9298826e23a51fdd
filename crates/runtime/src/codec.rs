//! JSON-lines wire format
//!
//! Inbound, one event per line, with an optional session key:
//!
//! ```text
//! {"session": "room-1", "event": "asr_result", "text": "hello", "final": true}
//! ```
//!
//! Outbound, one command per line, tagged with the session it belongs to:
//!
//! ```text
//! {"session": "room-1", "command": "model_submit", "turn_id": 1, "text": "hello"}
//! ```

use serde::Deserialize;
use thiserror::Error;

use voice_orchestrator_core::InboundEvent;
use voice_orchestrator_pipeline::SessionCommand;

/// Wire format errors
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Malformed event: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Empty session key")]
    EmptySession,
}

/// An inbound event and the session it is addressed to
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub session: Option<String>,
    #[serde(flatten)]
    pub event: InboundEvent,
}

impl Envelope {
    /// Session key, or `default` when the line did not name one
    pub fn session_key<'a>(&'a self, default: &'a str) -> &'a str {
        self.session.as_deref().unwrap_or(default)
    }
}

/// Parse one input line; blank lines yield `None`
pub fn decode_line(line: &str) -> Result<Option<Envelope>, CodecError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let envelope: Envelope = serde_json::from_str(line)?;
    if matches!(envelope.session.as_deref(), Some(s) if s.trim().is_empty()) {
        return Err(CodecError::EmptySession);
    }
    Ok(Some(envelope))
}

/// Render one output line, without the trailing newline
pub fn encode_command(command: &SessionCommand) -> Result<String, CodecError> {
    Ok(serde_json::to_string(command)?)
}
