//! Conversational turn orchestration
//!
//! This crate sits between the recognizer, the language model, and the
//! synthesizer of a voice assistant:
//! - Turn state machine with monotonically increasing turn ids
//! - Sentence segmentation of streaming model output
//! - Barge-in: cancelling generation, synthesis, and buffered audio
//! - Per-turn latency records (end-to-end, LLM TTFT, TTS TTFB, LLM→TTS gap)
//! - Static event dispatch and one coordinator task per session

pub mod interrupt;
pub mod latency;
pub mod metrics;
pub mod processors;
pub mod router;
pub mod session;
pub mod sinks;
pub mod tools;
pub mod turn;

pub use interrupt::{InterruptController, InterruptReport};
pub use latency::{LatencyRecord, LatencyTracker};
pub use processors::{segment, Segmentation, SentenceSegmenter};
pub use router::{EventHandler, EventRouter, RouterError};
pub use session::{
    SessionCoordinator, SessionHandle, SessionManager, SessionSinks, SessionSummary, SinkFactory,
};
pub use sinks::{ChannelSink, RecordingSink, SessionCommand};
pub use tools::{Tool, ToolError, ToolRegistry};
pub use turn::{TurnManager, TurnState, TurnStats, LATENCY_HISTORY};

use thiserror::Error;
use voice_orchestrator_config::ConfigError;

/// Pipeline errors
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Router(#[from] RouterError),

    #[error("Session limit reached ({0})")]
    SessionLimit(usize),

    #[error("Session '{0}' is closed")]
    ChannelClosed(String),

    #[error("Session task failed: {0}")]
    Join(String),
}

impl From<ConfigError> for PipelineError {
    fn from(err: ConfigError) -> Self {
        PipelineError::Config(err.to_string())
    }
}
