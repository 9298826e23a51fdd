//! Per-turn latency ledger
//!
//! Correlates the moment recognition finalized, the first model token, and
//! the synthesizer's time-to-first-byte into one record per turn:
//!
//! ```text
//! end_to_end_ms                = feedback_at - vad_stopped_at
//! model_time_to_first_token_ms = first_model_token_at - vad_stopped_at   (0 if unseen)
//! model_to_synthesis_gap_ms    = end_to_end_ms - ttft - ttfb
//! ```
//!
//! Feedback is terminal: the record is produced once and tracking is cleared,
//! so duplicate or late feedback is discarded.

use chrono::{DateTime, Utc};
use serde::Serialize;
use voice_orchestrator_core::{millis_between, TurnId};

use crate::metrics;

/// Completed latency measurement for one turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyRecord {
    pub turn_id: TurnId,
    pub vad_stopped_at: DateTime<Utc>,
    pub first_model_token_at: Option<DateTime<Utc>>,
    pub end_to_end_ms: f64,
    pub model_time_to_first_token_ms: f64,
    pub synthesis_first_byte_latency_ms: f64,
    pub model_to_synthesis_gap_ms: f64,
    /// Some component came out negative (clock skew or out-of-order feedback)
    pub has_negative_component: bool,
}

#[derive(Debug, Clone)]
struct TrackedTurn {
    turn_id: TurnId,
    vad_stopped_at: DateTime<Utc>,
    first_model_token_at: Option<DateTime<Utc>>,
}

/// Latency tracker for one session
#[derive(Debug, Default)]
pub struct LatencyTracker {
    current: Option<TrackedTurn>,
    last_started: Option<TurnId>,
}

impl LatencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn currently being measured
    pub fn tracked_turn(&self) -> Option<TurnId> {
        self.current.as_ref().map(|t| t.turn_id)
    }

    /// Start measuring `turn_id`, replacing any previous turn
    ///
    /// Returns false (and changes nothing) if `turn_id` is not newer than
    /// the last turn started.
    pub fn on_finalized(&mut self, turn_id: TurnId, at: DateTime<Utc>) -> bool {
        if let Some(last) = self.last_started {
            if turn_id <= last {
                tracing::debug!(turn_id, last, "Ignoring stale finalization");
                metrics::record_stale_event("finalized");
                return false;
            }
        }

        if let Some(previous) = self.current.take() {
            tracing::debug!(
                turn_id = previous.turn_id,
                "Latency tracking superseded before feedback"
            );
        }

        self.last_started = Some(turn_id);
        self.current = Some(TrackedTurn {
            turn_id,
            vad_stopped_at: at,
            first_model_token_at: None,
        });
        true
    }

    /// Record the first model token; later tokens are ignored
    pub fn on_first_model_token(&mut self, turn_id: TurnId, at: DateTime<Utc>) -> bool {
        match self.current.as_mut() {
            Some(turn) if turn.turn_id == turn_id => {
                if turn.first_model_token_at.is_some() {
                    return false;
                }
                turn.first_model_token_at = Some(at);
                true
            }
            other => {
                tracing::debug!(
                    turn_id,
                    tracked = ?other.map(|t| t.turn_id),
                    "Ignoring model token for untracked turn"
                );
                metrics::record_stale_event("model_token");
                false
            }
        }
    }

    /// Close the turn's measurement with the synthesizer's TTFB
    pub fn on_synthesis_feedback(
        &mut self,
        turn_id: TurnId,
        ttfb_ms: f64,
        now: DateTime<Utc>,
    ) -> Option<LatencyRecord> {
        let matches = self
            .current
            .as_ref()
            .map(|t| t.turn_id == turn_id)
            .unwrap_or(false);

        if !matches {
            tracing::debug!(
                turn_id,
                tracked = ?self.tracked_turn(),
                "Discarding synthesis feedback for untracked turn"
            );
            metrics::record_stale_event("synthesis_feedback");
            return None;
        }

        let turn = self.current.take()?;
        let end_to_end_ms = millis_between(turn.vad_stopped_at, now);
        let model_time_to_first_token_ms = turn
            .first_model_token_at
            .map(|at| millis_between(turn.vad_stopped_at, at))
            .unwrap_or(0.0);
        let model_to_synthesis_gap_ms = end_to_end_ms - model_time_to_first_token_ms - ttfb_ms;

        let has_negative_component = end_to_end_ms < 0.0
            || model_time_to_first_token_ms < 0.0
            || ttfb_ms < 0.0
            || model_to_synthesis_gap_ms < 0.0;

        let record = LatencyRecord {
            turn_id,
            vad_stopped_at: turn.vad_stopped_at,
            first_model_token_at: turn.first_model_token_at,
            end_to_end_ms,
            model_time_to_first_token_ms,
            synthesis_first_byte_latency_ms: ttfb_ms,
            model_to_synthesis_gap_ms,
            has_negative_component,
        };

        if has_negative_component {
            tracing::warn!(
                turn_id,
                end_to_end_ms,
                model_time_to_first_token_ms,
                ttfb_ms,
                model_to_synthesis_gap_ms,
                "Negative latency component"
            );
        }

        Some(record)
    }

    /// Drop the tracked turn (interrupt)
    pub fn cancel(&mut self) -> Option<TurnId> {
        self.current.take().map(|t| t.turn_id)
    }
}
