//! Metric recording helpers
//!
//! Thin wrappers over the `metrics` facade so metric names live in one place.
//! Nothing is exported unless the binary installs a recorder.

use voice_orchestrator_core::SinkTarget;

use crate::latency::LatencyRecord;

pub const TURNS_TOTAL: &str = "orchestrator_turns_total";
pub const INTERRUPTS_TOTAL: &str = "orchestrator_interrupts_total";
pub const STALE_EVENTS_TOTAL: &str = "orchestrator_stale_events_total";
pub const SINK_ERRORS_TOTAL: &str = "orchestrator_sink_errors_total";
pub const E2E_LATENCY_MS: &str = "orchestrator_e2e_latency_ms";
pub const LLM_TTFT_MS: &str = "orchestrator_llm_ttft_ms";
pub const TTS_TTFB_MS: &str = "orchestrator_tts_ttfb_ms";
pub const LLM_TO_TTS_MS: &str = "orchestrator_llm_to_tts_ms";

/// A turn was allocated
pub fn record_turn() {
    ::metrics::counter!(TURNS_TOTAL).increment(1);
}

/// An interrupt broadcast fired
pub fn record_interrupt() {
    ::metrics::counter!(INTERRUPTS_TOTAL).increment(1);
}

/// An event referenced a turn that is no longer tracked
pub fn record_stale_event(kind: &'static str) {
    ::metrics::counter!(STALE_EVENTS_TOTAL, "kind" => kind).increment(1);
}

/// A sink or model control call failed
pub fn record_sink_error(target: SinkTarget) {
    ::metrics::counter!(SINK_ERRORS_TOTAL, "target" => target.as_str()).increment(1);
}

/// Emit the histograms for a completed latency record
pub fn record_latency(record: &LatencyRecord) {
    ::metrics::histogram!(E2E_LATENCY_MS).record(record.end_to_end_ms);
    ::metrics::histogram!(LLM_TTFT_MS).record(record.model_time_to_first_token_ms);
    ::metrics::histogram!(TTS_TTFB_MS).record(record.synthesis_first_byte_latency_ms);
    ::metrics::histogram!(LLM_TO_TTS_MS).record(record.model_to_synthesis_gap_ms);
}
