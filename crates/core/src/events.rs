//! Inbound events consumed by the orchestrator
//!
//! Events arrive as JSON objects tagged by `event`:
//!
//! ```text
//! {"event":"asr_result","text":"hello","final":true,"metadata":{"session_id":"123"}}
//! {"event":"llm_response","delta":"Hi.","text":"Hi.","is_final":false,"type":"message"}
//! {"event":"metrics","module":"tts","metrics":{"ttfb":120}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Turn identifier, strictly increasing within a session
pub type TurnId = u64;

/// Event type tags used by the dispatch table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    UserJoined,
    UserLeft,
    AsrResult,
    LlmResponse,
    ToolRegister,
    Metrics,
}

impl EventKind {
    /// All event kinds, in dispatch-table order
    pub fn all() -> &'static [EventKind] {
        &[
            Self::UserJoined,
            Self::UserLeft,
            Self::AsrResult,
            Self::LlmResponse,
            Self::ToolRegister,
            Self::Metrics,
        ]
    }

    /// Stable label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserJoined => "user_joined",
            Self::UserLeft => "user_left",
            Self::AsrResult => "asr_result",
            Self::LlmResponse => "llm_response",
            Self::ToolRegister => "tool_register",
            Self::Metrics => "metrics",
        }
    }
}

/// An inbound event from the recognizer, model, synthesizer, or session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InboundEvent {
    /// A participant joined the session
    UserJoined,
    /// A participant left the session
    UserLeft,
    /// Recognizer output
    AsrResult(AsrResult),
    /// Streaming model output
    LlmResponse(LlmResponse),
    /// Tool registration for the model's function calling
    ToolRegister(ToolRegistration),
    /// Synthesizer (or other module) timing feedback
    Metrics(SynthesisMetrics),
}

impl InboundEvent {
    /// Dispatch tag of this event
    pub fn kind(&self) -> EventKind {
        match self {
            Self::UserJoined => EventKind::UserJoined,
            Self::UserLeft => EventKind::UserLeft,
            Self::AsrResult(_) => EventKind::AsrResult,
            Self::LlmResponse(_) => EventKind::LlmResponse,
            Self::ToolRegister(_) => EventKind::ToolRegister,
            Self::Metrics(_) => EventKind::Metrics,
        }
    }

    /// Recognizer result without metadata
    pub fn asr(text: impl Into<String>, is_final: bool) -> Self {
        Self::AsrResult(AsrResult {
            text: text.into(),
            is_final,
            metadata: Map::new(),
        })
    }

    /// Non-final model message delta; `text` is the accumulated response
    pub fn llm_delta(delta: impl Into<String>, text: impl Into<String>) -> Self {
        Self::LlmResponse(LlmResponse {
            delta: delta.into(),
            text: text.into(),
            is_final: false,
            kind: LlmResponseKind::Message,
            turn_id: None,
        })
    }

    /// Final model message event
    pub fn llm_final(delta: impl Into<String>, text: impl Into<String>) -> Self {
        Self::LlmResponse(LlmResponse {
            delta: delta.into(),
            text: text.into(),
            is_final: true,
            kind: LlmResponseKind::Message,
            turn_id: None,
        })
    }

    /// TTS time-to-first-byte feedback
    pub fn tts_ttfb(ttfb_ms: f64) -> Self {
        let mut metrics = Map::new();
        metrics.insert("ttfb".to_string(), Value::from(ttfb_ms));
        Self::Metrics(SynthesisMetrics {
            module: "tts".to_string(),
            metrics,
            metadata: Map::new(),
        })
    }
}

/// Recognizer output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsrResult {
    /// Recognized text (partial or final)
    #[serde(default)]
    pub text: String,
    /// Whether the recognizer finalized this utterance
    #[serde(rename = "final", default)]
    pub is_final: bool,
    /// Recognizer metadata; `session_id` is read from here
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl AsrResult {
    /// Session id carried in metadata, if any (string or number)
    pub fn session_id(&self) -> Option<String> {
        match self.metadata.get("session_id")? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Attach a session id
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.metadata
            .insert("session_id".to_string(), Value::String(session_id.into()));
        self
    }
}

/// Kind of model output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmResponseKind {
    /// Spoken answer text
    #[default]
    Message,
    /// Model reasoning, shown in the transcript only
    Reasoning,
}

/// Streaming model output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Newly generated text since the previous event
    #[serde(default)]
    pub delta: String,
    /// Accumulated response text so far
    #[serde(default)]
    pub text: String,
    /// Last event of the response
    #[serde(default)]
    pub is_final: bool,
    /// Message or reasoning
    #[serde(rename = "type", default)]
    pub kind: LlmResponseKind,
    /// Turn the model was generating for, when the model source echoes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_id: Option<TurnId>,
}

impl LlmResponse {
    /// Tag this response with the turn it belongs to
    pub fn for_turn(mut self, turn_id: TurnId) -> Self {
        self.turn_id = Some(turn_id);
        self
    }
}

/// Opaque tool registration, forwarded to the model collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRegistration {
    /// Tool metadata as published by the tool extension
    pub tool: Value,
    /// Name of the extension that owns the tool
    #[serde(default)]
    pub source: String,
}

impl ToolRegistration {
    /// Tool name from the metadata, if present
    pub fn name(&self) -> Option<&str> {
        self.tool.get("name").and_then(Value::as_str)
    }
}

/// Timing feedback published by a pipeline module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisMetrics {
    /// Publishing module ("tts", "asr", "llm", ...)
    #[serde(default)]
    pub module: String,
    /// Metric values keyed by name
    #[serde(default)]
    pub metrics: Map<String, Value>,
    /// Request metadata echoed back by the module
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Why a metrics payload was not usable as synthesis feedback
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedbackRejection {
    /// Published by a module other than TTS
    #[error("module '{0}' is not tts")]
    WrongModule(String),

    /// No `ttfb` key
    #[error("missing ttfb key")]
    MissingTtfb,

    /// `ttfb` present but not a number
    #[error("ttfb is not numeric: {0}")]
    NonNumericTtfb(Value),
}

impl SynthesisMetrics {
    /// TTS time-to-first-byte in milliseconds
    pub fn tts_ttfb_ms(&self) -> Result<f64, FeedbackRejection> {
        if self.module != "tts" {
            return Err(FeedbackRejection::WrongModule(self.module.clone()));
        }
        let value = self.metrics.get("ttfb").ok_or(FeedbackRejection::MissingTtfb)?;
        value
            .as_f64()
            .ok_or_else(|| FeedbackRejection::NonNumericTtfb(value.clone()))
    }

    /// Turn id echoed in the metadata, if any
    pub fn turn_id(&self) -> Option<TurnId> {
        match self.metadata.get("turn_id")? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}
