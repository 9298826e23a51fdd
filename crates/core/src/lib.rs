//! Core types for the voice turn orchestrator
//!
//! This crate provides the types shared by every other crate:
//! - Inbound events (recognizer, model, synthesizer feedback, membership)
//! - Outbound commands and their wire shapes
//! - Collaborator traits (`CommandSink`, `ModelControl`)
//! - Wall-clock abstraction for latency measurement
//! - Language-aware sentence terminators
//! - Error types

pub mod clock;
pub mod commands;
pub mod error;
pub mod events;
pub mod language;
pub mod traits;

pub use clock::{millis_between, Clock, ManualClock, SystemClock};
pub use commands::{
    OutboundCommand, Role, TranscriptDataType, TranscriptMessage, TtsFlush, TtsMetadata,
    TtsTextInput,
};
pub use error::{Error, Result, SinkTarget};
pub use events::{
    AsrResult, EventKind, FeedbackRejection, InboundEvent, LlmResponse, LlmResponseKind,
    SynthesisMetrics, ToolRegistration, TurnId,
};
pub use language::{Language, Script, CLAUSE_BREAKS, COMMON_TERMINATORS};
pub use traits::{CommandSink, ModelControl};
