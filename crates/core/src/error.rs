//! Error types shared across the orchestrator crates

use thiserror::Error;

/// Result alias used by sinks and collaborators
pub type Result<T> = std::result::Result<T, Error>;

/// Orchestrator errors
///
/// None of these are fatal to a session: the coordinator logs them and
/// keeps consuming events.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// A downstream sink rejected or failed to accept a command
    #[error("Sink '{target}' failed: {message}")]
    Sink { target: SinkTarget, message: String },

    /// The channel behind a sink was closed; carries the session key
    #[error("Channel closed for session '{session}' ({target})")]
    ChannelClosed { target: SinkTarget, session: String },

    /// Payload could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Build a sink error for the given target
    pub fn sink(target: SinkTarget, message: impl Into<String>) -> Self {
        Error::Sink {
            target,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Downstream collaborators that receive commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkTarget {
    /// Message collector for live captions
    Transcript,
    /// Text-to-speech engine
    Synthesis,
    /// Audio transport (RTC)
    Transport,
    /// Language model source
    Model,
}

impl SinkTarget {
    /// Stable label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            SinkTarget::Transcript => "transcript",
            SinkTarget::Synthesis => "synthesis",
            SinkTarget::Transport => "transport",
            SinkTarget::Model => "model",
        }
    }
}

impl std::fmt::Display for SinkTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
