//! Barge-in handling
//!
//! When the user starts talking over the assistant, every downstream effect
//! of the current turn is cancelled:
//!
//! 1. the pending sentence fragment is cleared
//! 2. the model is told to stop generating
//! 3. the synthesizer is flushed with a fresh flush id
//! 4. the transport drops buffered audio
//!
//! Steps 2-4 are independent and best-effort. A failing collaborator is
//! logged and counted but never prevents the others from being signalled.

use std::sync::Arc;

use voice_orchestrator_core::{CommandSink, Error, ModelControl, SinkTarget, TtsFlush};

use crate::metrics;

/// Outcome of one interrupt broadcast
#[derive(Debug, Clone)]
pub struct InterruptReport {
    pub flush_id: String,
    /// Failures, by collaborator
    pub failures: Vec<(SinkTarget, Error)>,
}

impl InterruptReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Broadcasts cancellation signals to the model, synthesizer, and transport
pub struct InterruptController {
    sink: Arc<dyn CommandSink>,
    model: Arc<dyn ModelControl>,
}

impl InterruptController {
    pub fn new(sink: Arc<dyn CommandSink>, model: Arc<dyn ModelControl>) -> Self {
        Self { sink, model }
    }

    /// Clear `pending` and signal every collaborator
    pub async fn interrupt(&self, pending: &mut String) -> InterruptReport {
        pending.clear();

        let flush = TtsFlush::random();
        let flush_id = flush.flush_id.clone();

        let (model, synthesis, transport) = futures::join!(
            self.model.cancel(),
            self.sink.send_tts_flush(flush),
            self.sink.flush_transport()
        );

        let mut failures = Vec::new();
        for (target, result) in [
            (SinkTarget::Model, model),
            (SinkTarget::Synthesis, synthesis),
            (SinkTarget::Transport, transport),
        ] {
            if let Err(e) = result {
                tracing::warn!(sink = %target, error = %e, "Interrupt signal failed");
                metrics::record_sink_error(target);
                failures.push((target, e));
            }
        }

        metrics::record_interrupt();
        tracing::info!(flush_id = %flush_id, failed = failures.len(), "Interrupt signal sent");

        InterruptReport { flush_id, failures }
    }
}
