//! Sink adapters
//!
//! - `ChannelSink`: production adapter, enqueues commands on an unbounded
//!   channel so the coordinator never waits on downstream delivery
//! - `RecordingSink`: test adapter, records every command in order and can
//!   be told to fail for a given target

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use tokio::sync::mpsc;

use voice_orchestrator_core::{
    CommandSink, Error, ModelControl, OutboundCommand, Result, SinkTarget, ToolRegistration,
    TranscriptMessage, TtsFlush, TtsTextInput, TurnId,
};

/// A command addressed to one session
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SessionCommand {
    pub session: String,
    #[serde(flatten)]
    pub command: OutboundCommand,
}

/// Enqueues commands, tagged with their session key, on an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    session: String,
    tx: mpsc::UnboundedSender<SessionCommand>,
}

impl ChannelSink {
    pub fn new(session: impl Into<String>, tx: mpsc::UnboundedSender<SessionCommand>) -> Self {
        Self {
            session: session.into(),
            tx,
        }
    }

    fn push(&self, target: SinkTarget, command: OutboundCommand) -> Result<()> {
        self.tx
            .send(SessionCommand {
                session: self.session.clone(),
                command,
            })
            .map_err(|_| Error::ChannelClosed {
                target,
                session: self.session.clone(),
            })
    }
}

#[async_trait]
impl CommandSink for ChannelSink {
    async fn send_transcript(&self, message: TranscriptMessage) -> Result<()> {
        self.push(SinkTarget::Transcript, OutboundCommand::Transcript(message))
    }

    async fn send_tts_text(&self, input: TtsTextInput) -> Result<()> {
        self.push(SinkTarget::Synthesis, OutboundCommand::TtsText(input))
    }

    async fn send_tts_flush(&self, flush: TtsFlush) -> Result<()> {
        self.push(SinkTarget::Synthesis, OutboundCommand::TtsFlush(flush))
    }

    async fn flush_transport(&self) -> Result<()> {
        self.push(SinkTarget::Transport, OutboundCommand::TransportFlush)
    }
}

#[async_trait]
impl ModelControl for ChannelSink {
    async fn submit(&self, turn_id: TurnId, text: &str) -> Result<()> {
        self.push(
            SinkTarget::Model,
            OutboundCommand::ModelSubmit {
                turn_id,
                text: text.to_string(),
            },
        )
    }

    async fn cancel(&self) -> Result<()> {
        self.push(SinkTarget::Model, OutboundCommand::ModelCancel)
    }

    async fn register_tool(&self, registration: ToolRegistration) -> Result<()> {
        self.push(SinkTarget::Model, OutboundCommand::ToolRegistered(registration))
    }
}

/// Records every command for assertions
#[derive(Debug, Default)]
pub struct RecordingSink {
    commands: Mutex<Vec<OutboundCommand>>,
    failing: Mutex<HashSet<SinkTarget>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to `target` fail until `recover` is called
    pub fn fail(&self, target: SinkTarget) {
        self.failing.lock().insert(target);
    }

    pub fn recover(&self, target: SinkTarget) {
        self.failing.lock().remove(&target);
    }

    /// All recorded commands, in emission order
    pub fn commands(&self) -> Vec<OutboundCommand> {
        self.commands.lock().clone()
    }

    pub fn clear(&self) {
        self.commands.lock().clear();
    }

    /// Synthesis text chunks only
    pub fn tts_inputs(&self) -> Vec<TtsTextInput> {
        self.commands
            .lock()
            .iter()
            .filter_map(|c| match c {
                OutboundCommand::TtsText(input) => Some(input.clone()),
                _ => None,
            })
            .collect()
    }

    /// Transcript messages only
    pub fn transcripts(&self) -> Vec<TranscriptMessage> {
        self.commands
            .lock()
            .iter()
            .filter_map(|c| match c {
                OutboundCommand::Transcript(msg) => Some(msg.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of recorded commands with the given name
    pub fn count(&self, name: &str) -> usize {
        self.commands
            .lock()
            .iter()
            .filter(|c| c.name() == name)
            .count()
    }

    /// Position of the first command with the given name
    pub fn position(&self, name: &str) -> Option<usize> {
        self.commands.lock().iter().position(|c| c.name() == name)
    }

    fn record(&self, target: SinkTarget, command: OutboundCommand) -> Result<()> {
        if self.failing.lock().contains(&target) {
            return Err(Error::sink(target, "injected failure"));
        }
        self.commands.lock().push(command);
        Ok(())
    }
}

#[async_trait]
impl CommandSink for RecordingSink {
    async fn send_transcript(&self, message: TranscriptMessage) -> Result<()> {
        self.record(SinkTarget::Transcript, OutboundCommand::Transcript(message))
    }

    async fn send_tts_text(&self, input: TtsTextInput) -> Result<()> {
        self.record(SinkTarget::Synthesis, OutboundCommand::TtsText(input))
    }

    async fn send_tts_flush(&self, flush: TtsFlush) -> Result<()> {
        self.record(SinkTarget::Synthesis, OutboundCommand::TtsFlush(flush))
    }

    async fn flush_transport(&self) -> Result<()> {
        self.record(SinkTarget::Transport, OutboundCommand::TransportFlush)
    }
}

#[async_trait]
impl ModelControl for RecordingSink {
    async fn submit(&self, turn_id: TurnId, text: &str) -> Result<()> {
        self.record(
            SinkTarget::Model,
            OutboundCommand::ModelSubmit {
                turn_id,
                text: text.to_string(),
            },
        )
    }

    async fn cancel(&self) -> Result<()> {
        self.record(SinkTarget::Model, OutboundCommand::ModelCancel)
    }

    async fn register_tool(&self, registration: ToolRegistration) -> Result<()> {
        self.record(SinkTarget::Model, OutboundCommand::ToolRegistered(registration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_sink_order() {
        let sink = RecordingSink::new();
        sink.submit(1, "hello").await.unwrap();
        sink.send_tts_text(TtsTextInput::new(1, "100", "Hi.", false))
            .await
            .unwrap();
        sink.flush_transport().await.unwrap();

        let names: Vec<_> = sink.commands().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["model_submit", "tts_text", "transport_flush"]);
        assert_eq!(sink.tts_inputs().len(), 1);
    }

    #[tokio::test]
    async fn test_recording_sink_failure_injection() {
        let sink = RecordingSink::new();
        sink.fail(SinkTarget::Synthesis);

        let err = sink.send_tts_flush(TtsFlush::random()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Sink {
                target: SinkTarget::Synthesis,
                ..
            }
        ));
        assert!(sink.flush_transport().await.is_ok());
        assert_eq!(sink.count("tts_flush"), 0);

        sink.recover(SinkTarget::Synthesis);
        assert!(sink.send_tts_flush(TtsFlush::random()).await.is_ok());
        assert_eq!(sink.count("tts_flush"), 1);
    }

    #[tokio::test]
    async fn test_channel_sink_tags_session() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = ChannelSink::new("room-7", tx);

        sink.cancel().await.unwrap();
        let cmd = rx.recv().await.unwrap();
        assert_eq!(cmd.session, "room-7");
        assert_eq!(cmd.command, OutboundCommand::ModelCancel);

        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["session"], "room-7");
        assert_eq!(json["command"], "model_cancel");
    }

    #[tokio::test]
    async fn test_channel_sink_reports_closed_channel() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = ChannelSink::new("room-7", tx);
        drop(rx);

        let err = sink.flush_transport().await.unwrap_err();
        match err {
            Error::ChannelClosed { target, session } => {
                assert_eq!(target, SinkTarget::Transport);
                assert_eq!(session, "room-7");
            }
            other => panic!("expected closed channel, got {:?}", other),
        }
        assert!(matches!(
            sink.submit(1, "hello").await,
            Err(Error::ChannelClosed {
                target: SinkTarget::Model,
                ..
            })
        ));
    }
}
