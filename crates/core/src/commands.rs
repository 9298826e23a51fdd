//! Outbound commands issued to downstream collaborators

use serde::{Deserialize, Serialize};

use crate::events::{ToolRegistration, TurnId};

/// Transcript payload encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptDataType {
    /// Plain caption text
    Transcribe,
    /// JSON-encoded structured payload (reasoning)
    Raw,
}

/// Speaker of a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Caption message for the message collector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub data_type: TranscriptDataType,
    pub role: Role,
    pub text: String,
    /// Epoch milliseconds when the orchestrator emitted the message
    pub text_ts: i64,
    pub is_final: bool,
    pub stream_id: i64,
}

impl TranscriptMessage {
    /// Plain transcript line
    pub fn transcribe(
        role: Role,
        text: impl Into<String>,
        is_final: bool,
        stream_id: i64,
        text_ts: i64,
    ) -> Self {
        Self {
            data_type: TranscriptDataType::Transcribe,
            role,
            text: text.into(),
            text_ts,
            is_final,
            stream_id,
        }
    }

    /// Reasoning line; the text becomes `{"type":"reasoning","data":{"text":...}}`
    pub fn reasoning(text: &str, is_final: bool, stream_id: i64, text_ts: i64) -> Self {
        let payload = serde_json::json!({
            "type": "reasoning",
            "data": { "text": text },
        });
        Self {
            data_type: TranscriptDataType::Raw,
            role: Role::Assistant,
            text: payload.to_string(),
            text_ts,
            is_final,
            stream_id,
        }
    }
}

/// Request metadata echoed back by the synthesizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtsMetadata {
    pub session_id: String,
    pub turn_id: TurnId,
}

/// Text chunk for the synthesizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsTextInput {
    pub request_id: String,
    pub text: String,
    /// Marks the end of the request's text stream
    pub text_input_end: bool,
    pub metadata: TtsMetadata,
}

impl TtsTextInput {
    /// Request id used for every chunk of a turn
    pub fn request_id_for(turn_id: TurnId) -> String {
        format!("tts-request-{}", turn_id)
    }

    /// Chunk for the given turn
    pub fn new(
        turn_id: TurnId,
        session_id: impl Into<String>,
        text: impl Into<String>,
        text_input_end: bool,
    ) -> Self {
        Self {
            request_id: Self::request_id_for(turn_id),
            text: text.into(),
            text_input_end,
            metadata: TtsMetadata {
                session_id: session_id.into(),
                turn_id,
            },
        }
    }
}

/// Discard queued and in-flight synthesis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtsFlush {
    pub flush_id: String,
}

impl TtsFlush {
    /// Flush with a fresh random id
    pub fn random() -> Self {
        Self {
            flush_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Every command the orchestrator can issue, tagged for recording and wire output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum OutboundCommand {
    Transcript(TranscriptMessage),
    TtsText(TtsTextInput),
    TtsFlush(TtsFlush),
    /// Drop buffered outbound audio at the transport
    TransportFlush,
    /// Start generating a response for the turn
    ModelSubmit { turn_id: TurnId, text: String },
    /// Stop any in-flight generation
    ModelCancel,
    /// Forward a tool to the model
    ToolRegistered(ToolRegistration),
}

impl OutboundCommand {
    /// Stable label for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Transcript(_) => "transcript",
            Self::TtsText(_) => "tts_text",
            Self::TtsFlush(_) => "tts_flush",
            Self::TransportFlush => "transport_flush",
            Self::ModelSubmit { .. } => "model_submit",
            Self::ModelCancel => "model_cancel",
            Self::ToolRegistered(_) => "tool_registered",
        }
    }
}
