//! Turn manager
//!
//! Owns turn identity for one session and reacts to inbound events:
//!
//! ```text
//!            asr final              first delta             final message
//!   Idle ──────────────▶ AwaitingModel ─────────▶ Streaming ─────────────▶ Flushing ──▶ Idle
//!     ▲                                                                          │
//!     └──────────── Interrupted ◀── new speech (any state with an active turn) ──┘
//! ```
//!
//! The manager is owned by a single coordinator task, so none of its state is
//! shared or locked. Every downstream call is best-effort: failures are
//! logged and counted, and the manager keeps going.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;

use voice_orchestrator_config::OrchestratorConfig;
use voice_orchestrator_core::{
    AsrResult, Clock, CommandSink, Error, LlmResponse, LlmResponseKind, ModelControl, Role,
    SinkTarget, SynthesisMetrics, SystemClock, ToolRegistration, TranscriptMessage, TtsTextInput,
    TurnId,
};

use crate::interrupt::InterruptController;
use crate::latency::{LatencyRecord, LatencyTracker};
use crate::metrics;
use crate::processors::SentenceSegmenter;
use crate::tools::ToolRegistry;

/// Turn lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    /// No response in progress
    Idle,
    /// Recognized text submitted, no model output yet
    AwaitingModel,
    /// Model output arriving
    Streaming,
    /// Final model event received, flushing the carry
    Flushing,
    /// Cancelled by barge-in
    Interrupted,
}

/// Latency records kept per session; older ones are dropped
pub const LATENCY_HISTORY: usize = 64;

/// Running counters for one session
#[derive(Debug, Clone, Default, Serialize)]
pub struct TurnStats {
    pub turns: u64,
    pub interrupts: u64,
    pub stale_events: u64,
    pub sink_errors: u64,
    /// Every record produced, including those no longer in the history
    pub latency_records_total: u64,
    /// Most recent records, at most `LATENCY_HISTORY`
    pub latency_records: VecDeque<LatencyRecord>,
}

impl TurnStats {
    fn push_latency(&mut self, record: LatencyRecord) {
        if self.latency_records.len() == LATENCY_HISTORY {
            self.latency_records.pop_front();
        }
        self.latency_records.push_back(record);
        self.latency_records_total += 1;
    }
}

/// Per-session turn state machine
pub struct TurnManager {
    config: OrchestratorConfig,
    segmenter: SentenceSegmenter,
    sink: Arc<dyn CommandSink>,
    model: Arc<dyn ModelControl>,
    interrupts: InterruptController,
    clock: Arc<dyn Clock>,
    latency: LatencyTracker,
    tools: ToolRegistry,

    state: TurnState,
    /// Last allocated turn id (0 before the first turn)
    turn_id: TurnId,
    active_turn: Option<TurnId>,
    /// A `tts_text` for the active turn has been sent
    synthesis_started: bool,
    carry: String,
    session_id: String,
    participant_count: usize,
    stats: TurnStats,
}

impl TurnManager {
    pub fn new(
        config: OrchestratorConfig,
        segmenter: SentenceSegmenter,
        sink: Arc<dyn CommandSink>,
        model: Arc<dyn ModelControl>,
    ) -> Self {
        let session_id = config.default_session_id.clone();
        Self {
            interrupts: InterruptController::new(sink.clone(), model.clone()),
            config,
            segmenter,
            sink,
            model,
            clock: Arc::new(SystemClock),
            latency: LatencyTracker::new(),
            tools: ToolRegistry::new(),
            state: TurnState::Idle,
            turn_id: 0,
            active_turn: None,
            synthesis_started: false,
            carry: String::new(),
            session_id,
            participant_count: 0,
            stats: TurnStats::default(),
        }
    }

    /// Use a specific clock (tests drive a `ManualClock`)
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Last allocated turn id
    pub fn turn_id(&self) -> TurnId {
        self.turn_id
    }

    pub fn active_turn(&self) -> Option<TurnId> {
        self.active_turn
    }

    /// Pending sentence fragment
    pub fn carry(&self) -> &str {
        &self.carry
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn participant_count(&self) -> usize {
        self.participant_count
    }

    pub fn stats(&self) -> &TurnStats {
        &self.stats
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn tools_mut(&mut self) -> &mut ToolRegistry {
        &mut self.tools
    }

    /// Participant joined; the first one hears the greeting
    pub async fn on_user_joined(&mut self) {
        self.participant_count += 1;
        tracing::debug!(participants = self.participant_count, "User joined");

        if self.participant_count != 1 {
            return;
        }
        let greeting = match self.config.greeting.clone() {
            Some(greeting) if !greeting.is_empty() => greeting,
            _ => return,
        };

        self.send_tts(&greeting, true).await;
        let message = TranscriptMessage::transcribe(
            Role::Assistant,
            greeting,
            true,
            self.config.assistant_stream_id,
            self.clock.now_millis(),
        );
        self.send_transcript(message).await;
    }

    pub async fn on_user_left(&mut self) {
        self.participant_count = self.participant_count.saturating_sub(1);
        tracing::debug!(participants = self.participant_count, "User left");
    }

    /// Recognizer output: barge-in, turn allocation, user transcript
    pub async fn on_asr_result(&mut self, asr: AsrResult) {
        self.session_id = asr
            .session_id()
            .unwrap_or_else(|| self.config.default_session_id.clone());
        let stream_id = self
            .session_id
            .parse::<i64>()
            .unwrap_or(self.config.fallback_user_stream_id);

        if asr.text.is_empty() {
            return;
        }

        if asr.is_final || asr.text.chars().count() > self.config.interrupt_min_chars {
            self.interrupt().await;
        }

        if asr.is_final {
            self.start_turn(&asr.text).await;
        }

        let message = TranscriptMessage::transcribe(
            Role::User,
            asr.text,
            asr.is_final,
            stream_id,
            self.clock.now_millis(),
        );
        self.send_transcript(message).await;
    }

    /// Streaming model output for the active turn
    pub async fn on_llm_response(&mut self, response: LlmResponse) {
        let turn = match (self.active_turn, response.turn_id) {
            (Some(active), None) => active,
            (Some(active), Some(turn)) if turn == active => active,
            (active, turn) => {
                tracing::debug!(
                    active = ?active,
                    event_turn = ?turn,
                    is_final = response.is_final,
                    "Discarding model output for inactive turn"
                );
                self.stats.stale_events += 1;
                metrics::record_stale_event("model_response");
                return;
            }
        };

        if !response.is_final && !response.delta.is_empty() {
            let first_token = self.state == TurnState::AwaitingModel;
            if matches!(self.state, TurnState::AwaitingModel | TurnState::Idle) {
                self.state = TurnState::Streaming;
            }
            if first_token && self.latency.on_first_model_token(turn, self.clock.now()) {
                tracing::info!(turn_id = turn, "First model token");
            }
        }

        if response.kind == LlmResponseKind::Message {
            if response.is_final {
                self.flush_turn(&response.delta).await;
            } else {
                let segmentation = self.segmenter.segment(&self.carry, &response.delta);
                self.carry = segmentation.carry;
                for sentence in segmentation.sentences {
                    self.send_tts(&sentence, false).await;
                }
            }
        }

        let now = self.clock.now_millis();
        let message = match response.kind {
            LlmResponseKind::Message => TranscriptMessage::transcribe(
                Role::Assistant,
                response.text,
                response.is_final,
                self.config.assistant_stream_id,
                now,
            ),
            LlmResponseKind::Reasoning => TranscriptMessage::reasoning(
                &response.text,
                response.is_final,
                self.config.assistant_stream_id,
                now,
            ),
        };
        self.send_transcript(message).await;
    }

    /// Synthesizer timing feedback
    pub async fn on_metrics(&mut self, feedback: SynthesisMetrics) {
        let ttfb_ms = match feedback.tts_ttfb_ms() {
            Ok(ttfb) => ttfb,
            Err(rejection) => {
                tracing::debug!(reason = %rejection, "Ignoring metrics payload");
                return;
            }
        };

        // Without an echoed turn id, feedback can only belong to the active
        // turn once its text has reached the synthesizer
        let turn = match (feedback.turn_id(), self.active_turn) {
            (Some(turn), _) => turn,
            (None, Some(active)) if self.synthesis_started => active,
            (None, active) => {
                tracing::debug!(
                    active = ?active,
                    synthesis_started = self.synthesis_started,
                    "Discarding synthesis feedback before any text was synthesized"
                );
                self.stats.stale_events += 1;
                metrics::record_stale_event("synthesis_feedback");
                return;
            }
        };
        let Some(record) = self
            .latency
            .on_synthesis_feedback(turn, ttfb_ms, self.clock.now())
        else {
            self.stats.stale_events += 1;
            return;
        };

        tracing::info!(
            turn_id = record.turn_id,
            e2e_ms = record.end_to_end_ms,
            llm_ttft_ms = record.model_time_to_first_token_ms,
            tts_ttfb_ms = record.synthesis_first_byte_latency_ms,
            llm_to_tts_ms = record.model_to_synthesis_gap_ms,
            "Turn latency"
        );
        metrics::record_latency(&record);
        self.stats.push_latency(record);
    }

    /// Record a tool and forward it to the model
    pub async fn on_tool_register(&mut self, registration: ToolRegistration) {
        let name = self.tools.register(registration.clone());
        tracing::info!(tool = %name, source = %registration.source, "Tool registered");

        if let Err(e) = self.model.register_tool(registration).await {
            self.sink_failed(SinkTarget::Model, e);
        }
    }

    /// Barge-in: deactivate the turn and broadcast cancellation
    pub async fn interrupt(&mut self) {
        self.synthesis_started = false;
        if let Some(turn) = self.active_turn.take() {
            self.state = TurnState::Interrupted;
            self.latency.cancel();
            tracing::info!(turn_id = turn, "Turn interrupted");
        }

        let report = self.interrupts.interrupt(&mut self.carry).await;
        self.stats.interrupts += 1;
        self.stats.sink_errors += report.failures.len() as u64;
        self.state = TurnState::Idle;
    }

    async fn start_turn(&mut self, text: &str) {
        self.turn_id += 1;
        let turn = self.turn_id;

        self.active_turn = Some(turn);
        self.synthesis_started = false;
        self.carry.clear();
        self.latency.on_finalized(turn, self.clock.now());
        self.state = TurnState::AwaitingModel;
        self.stats.turns += 1;
        metrics::record_turn();

        tracing::info!(turn_id = turn, session_id = %self.session_id, "Turn started");

        if let Err(e) = self.model.submit(turn, text).await {
            self.sink_failed(SinkTarget::Model, e);
        }
    }

    async fn flush_turn(&mut self, delta: &str) {
        self.state = TurnState::Flushing;

        let segmentation = self.segmenter.segment(&self.carry, delta);
        self.carry.clear();
        for sentence in segmentation.sentences {
            self.send_tts(&sentence, false).await;
        }
        self.send_tts(&segmentation.carry, true).await;

        self.state = TurnState::Idle;
    }

    async fn send_tts(&mut self, text: &str, text_input_end: bool) {
        let input = TtsTextInput::new(self.turn_id, self.session_id.clone(), text, text_input_end);
        tracing::debug!(
            request_id = %input.request_id,
            text_input_end,
            text,
            "Sent to TTS"
        );
        match self.sink.send_tts_text(input).await {
            Ok(()) => {
                if self.active_turn == Some(self.turn_id) {
                    self.synthesis_started = true;
                }
            }
            Err(e) => self.sink_failed(SinkTarget::Synthesis, e),
        }
    }

    async fn send_transcript(&mut self, message: TranscriptMessage) {
        if let Err(e) = self.sink.send_transcript(message).await {
            self.sink_failed(SinkTarget::Transcript, e);
        }
    }

    fn sink_failed(&mut self, target: SinkTarget, error: Error) {
        tracing::warn!(sink = %target, error = %error, turn_id = self.turn_id, "Sink call failed");
        metrics::record_sink_error(target);
        self.stats.sink_errors += 1;
    }
}
