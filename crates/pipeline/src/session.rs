//! Session coordination
//!
//! Each session gets one coordinator task that owns its `TurnManager` and
//! consumes an ordered event channel. Sessions never share turn state, so
//! they run concurrently without locks; the only shared structure is the
//! session table itself.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use voice_orchestrator_config::{OrchestratorConfig, Settings};
use voice_orchestrator_core::{Clock, CommandSink, InboundEvent, ModelControl, SystemClock};

use crate::latency::LatencyRecord;
use crate::processors::SentenceSegmenter;
use crate::router::{EventRouter, RouterError};
use crate::turn::{TurnManager, TurnState};
use crate::PipelineError;

/// Collaborators for one session
#[derive(Clone)]
pub struct SessionSinks {
    pub commands: Arc<dyn CommandSink>,
    pub model: Arc<dyn ModelControl>,
}

/// Builds the collaborators for a newly created session, given its key
pub type SinkFactory = Arc<dyn Fn(&str) -> SessionSinks + Send + Sync>;

/// What a session did, reported when it closes
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub key: String,
    pub session_id: String,
    pub turns: u64,
    pub interrupts: u64,
    pub stale_events: u64,
    pub sink_errors: u64,
    pub final_state: TurnState,
    pub latency_records_total: u64,
    /// Most recent latency records
    pub latency_records: Vec<LatencyRecord>,
}

impl SessionSummary {
    fn from_manager(key: String, manager: &TurnManager) -> Self {
        let stats = manager.stats();
        Self {
            key,
            session_id: manager.session_id().to_string(),
            turns: stats.turns,
            interrupts: stats.interrupts,
            stale_events: stats.stale_events,
            sink_errors: stats.sink_errors,
            final_state: manager.state(),
            latency_records_total: stats.latency_records_total,
            latency_records: stats.latency_records.iter().cloned().collect(),
        }
    }
}

/// Single task consuming one session's events in order
pub struct SessionCoordinator {
    key: String,
    manager: TurnManager,
    router: EventRouter<TurnManager>,
    events: mpsc::Receiver<InboundEvent>,
}

impl SessionCoordinator {
    pub fn new(
        key: impl Into<String>,
        manager: TurnManager,
        events: mpsc::Receiver<InboundEvent>,
    ) -> Result<Self, RouterError> {
        Ok(Self {
            key: key.into(),
            manager,
            router: EventRouter::standard()?,
            events,
        })
    }

    /// Consume events until every sender is dropped
    pub async fn run(mut self) -> SessionSummary {
        tracing::info!(session = %self.key, "Session coordinator started");

        while let Some(event) = self.events.recv().await {
            let kind = event.kind();
            tracing::trace!(session = %self.key, event = kind.as_str(), "Dispatching event");
            self.router.dispatch(&mut self.manager, event).await;
        }

        let summary = SessionSummary::from_manager(self.key, &self.manager);
        tracing::info!(
            session = %summary.key,
            turns = summary.turns,
            interrupts = summary.interrupts,
            latency_records = summary.latency_records_total,
            "Session coordinator stopped"
        );
        summary
    }
}

/// Sender side of a running coordinator
pub struct SessionHandle {
    key: String,
    events: mpsc::Sender<InboundEvent>,
    task: JoinHandle<SessionSummary>,
}

impl SessionHandle {
    /// Spawn a coordinator task for `manager`
    pub fn spawn(
        key: impl Into<String>,
        manager: TurnManager,
        capacity: usize,
    ) -> Result<Self, PipelineError> {
        let key = key.into();
        let (events, rx) = mpsc::channel(capacity.max(1));
        let coordinator = SessionCoordinator::new(key.clone(), manager, rx)?;
        let task = tokio::spawn(coordinator.run());
        Ok(Self { key, events, task })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn sender(&self) -> mpsc::Sender<InboundEvent> {
        self.events.clone()
    }

    /// Queue an event, waiting if the session is backlogged
    pub async fn send(&self, event: InboundEvent) -> Result<(), PipelineError> {
        self.events
            .send(event)
            .await
            .map_err(|_| PipelineError::ChannelClosed(self.key.clone()))
    }

    /// Stop accepting events, drain the queue, and collect the summary
    pub async fn close(self) -> Result<SessionSummary, PipelineError> {
        drop(self.events);
        self.task
            .await
            .map_err(|e| PipelineError::Join(e.to_string()))
    }
}

/// Session table keyed by session key
pub struct SessionManager {
    orchestrator: OrchestratorConfig,
    segmenter: SentenceSegmenter,
    channel_capacity: usize,
    max_sessions: usize,
    sinks: SinkFactory,
    clock: Arc<dyn Clock>,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionManager {
    pub fn new(settings: &Settings, sinks: SinkFactory) -> Result<Self, PipelineError> {
        Ok(Self {
            orchestrator: settings.orchestrator.clone(),
            segmenter: SentenceSegmenter::from_config(&settings.segmenter)?,
            channel_capacity: settings.session.channel_capacity,
            max_sessions: settings.session.max_sessions,
            sinks,
            clock: Arc::new(SystemClock),
            sessions: RwLock::new(HashMap::new()),
        })
    }

    /// Use a specific clock for every session created afterwards
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Route an event to its session, creating the session on first use
    pub async fn dispatch(&self, key: &str, event: InboundEvent) -> Result<(), PipelineError> {
        let sender = self.sender_for(key)?;
        sender
            .send(event)
            .await
            .map_err(|_| PipelineError::ChannelClosed(key.to_string()))
    }

    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Session keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sessions.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Close one session and return its summary
    pub async fn close(&self, key: &str) -> Option<Result<SessionSummary, PipelineError>> {
        let handle = self.sessions.write().remove(key)?;
        Some(handle.close().await)
    }

    /// Close every session, draining their queues, and report summaries by key
    pub async fn shutdown(&self) -> Vec<SessionSummary> {
        let handles: Vec<SessionHandle> = self.sessions.write().drain().map(|(_, h)| h).collect();

        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            let key = handle.key().to_string();
            match handle.close().await {
                Ok(summary) => summaries.push(summary),
                Err(e) => tracing::error!(session = %key, error = %e, "Session task failed"),
            }
        }

        summaries.sort_by(|a, b| a.key.cmp(&b.key));
        summaries
    }

    fn sender_for(&self, key: &str) -> Result<mpsc::Sender<InboundEvent>, PipelineError> {
        if let Some(handle) = self.sessions.read().get(key) {
            return Ok(handle.sender());
        }

        let mut sessions = self.sessions.write();
        if let Some(handle) = sessions.get(key) {
            return Ok(handle.sender());
        }

        if sessions.len() >= self.max_sessions {
            tracing::warn!(session = %key, max = self.max_sessions, "Session limit reached");
            return Err(PipelineError::SessionLimit(self.max_sessions));
        }

        let sinks = (self.sinks)(key);
        let manager = TurnManager::new(
            self.orchestrator.clone(),
            self.segmenter.clone(),
            sinks.commands,
            sinks.model,
        )
        .with_clock(self.clock.clone());

        let handle = SessionHandle::spawn(key, manager, self.channel_capacity)?;
        let sender = handle.sender();
        sessions.insert(key.to_string(), handle);

        tracing::info!(session = %key, active = sessions.len(), "Session created");
        Ok(sender)
    }
}
