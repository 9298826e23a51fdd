//! Downstream sink and model control interfaces

use async_trait::async_trait;

use crate::commands::{TranscriptMessage, TtsFlush, TtsTextInput};
use crate::events::{ToolRegistration, TurnId};
use crate::Result;

/// Destination for every command the orchestrator emits toward the
/// transcript collector, synthesizer, and transport
///
/// Implementations must not block for long: calls are awaited on the
/// session's coordinator task, between events.
///
/// # Example
///
/// ```ignore
/// let sink: Arc<dyn CommandSink> = Arc::new(ChannelSink::new("room-1", tx));
/// sink.send_tts_text(TtsTextInput::new(1, "100", "Hello.", false)).await?;
/// ```
#[async_trait]
pub trait CommandSink: Send + Sync + 'static {
    /// Deliver a caption line
    async fn send_transcript(&self, message: TranscriptMessage) -> Result<()>;

    /// Deliver a text chunk for synthesis
    async fn send_tts_text(&self, input: TtsTextInput) -> Result<()>;

    /// Discard queued and in-flight synthesis
    async fn send_tts_flush(&self, flush: TtsFlush) -> Result<()>;

    /// Discard buffered outbound audio
    async fn flush_transport(&self) -> Result<()>;
}

/// Control surface of the language model collaborator
#[async_trait]
pub trait ModelControl: Send + Sync + 'static {
    /// Start generating a response to `text` for `turn_id`
    ///
    /// Responses should echo `turn_id` so stale output can be discarded.
    async fn submit(&self, turn_id: TurnId, text: &str) -> Result<()>;

    /// Stop any in-flight generation
    async fn cancel(&self) -> Result<()>;

    /// Make a tool available for function calling
    async fn register_tool(&self, registration: ToolRegistration) -> Result<()>;
}
