//! End-to-end turn scenarios
//!
//! Drives a `TurnManager` (directly or through a session) with the event
//! sequences a real conversation produces and checks what reaches the
//! synthesizer, the transcript channel, and the model.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::mpsc;

use voice_orchestrator_config::{OrchestratorConfig, Settings};
use voice_orchestrator_core::{InboundEvent, ManualClock, OutboundCommand, Role, TurnId};
use voice_orchestrator_pipeline::{
    ChannelSink, EventRouter, RecordingSink, SentenceSegmenter, SessionCommand, SessionManager,
    SessionSinks, SinkFactory, TurnManager, TurnState,
};

struct Conversation {
    manager: TurnManager,
    router: EventRouter<TurnManager>,
    sink: Arc<RecordingSink>,
    clock: Arc<ManualClock>,
}

impl Conversation {
    fn new() -> Self {
        let sink = Arc::new(RecordingSink::new());
        let clock = Arc::new(ManualClock::from_epoch_secs(1_700_000_000));
        let manager = TurnManager::new(
            OrchestratorConfig::default(),
            SentenceSegmenter::default(),
            sink.clone(),
            sink.clone(),
        )
        .with_clock(clock.clone());

        Self {
            manager,
            router: EventRouter::<TurnManager>::standard().unwrap(),
            sink,
            clock,
        }
    }

    async fn send(&mut self, event: InboundEvent) {
        assert!(self.router.dispatch(&mut self.manager, event).await);
    }

    fn tts(&self) -> Vec<(String, bool)> {
        self.sink
            .tts_inputs()
            .into_iter()
            .map(|input| (input.text, input.text_input_end))
            .collect()
    }

    fn submitted_turns(&self) -> Vec<TurnId> {
        self.sink
            .commands()
            .into_iter()
            .filter_map(|c| match c {
                OutboundCommand::ModelSubmit { turn_id, .. } => Some(turn_id),
                _ => None,
            })
            .collect()
    }
}

fn asr_for_session(text: &str, is_final: bool, session_id: &str) -> InboundEvent {
    match InboundEvent::asr(text, is_final) {
        InboundEvent::AsrResult(asr) => InboundEvent::AsrResult(asr.with_session_id(session_id)),
        other => other,
    }
}

fn ttfb_for_turn(ms: f64, turn_id: TurnId) -> InboundEvent {
    match InboundEvent::tts_ttfb(ms) {
        InboundEvent::Metrics(mut feedback) => {
            feedback.metadata.insert("turn_id".into(), Value::from(turn_id));
            InboundEvent::Metrics(feedback)
        }
        other => other,
    }
}

#[tokio::test]
async fn test_single_turn_reply() {
    let mut c = Conversation::new();

    c.send(asr_for_session("hello", true, "123")).await;
    c.clock.advance_ms(200);
    c.send(InboundEvent::llm_delta("Hi", "Hi")).await;
    c.clock.advance_ms(50);
    c.send(InboundEvent::llm_delta(" there.", "Hi there.")).await;
    c.send(InboundEvent::llm_final("", "Hi there.")).await;
    c.clock.advance_ms(250);
    c.send(InboundEvent::tts_ttfb(120.0)).await;

    assert_eq!(
        c.tts(),
        vec![("Hi there.".to_string(), false), (String::new(), true)]
    );
    for input in c.sink.tts_inputs() {
        assert_eq!(input.request_id, "tts-request-1");
        assert_eq!(input.metadata.session_id, "123");
        assert_eq!(input.metadata.turn_id, 1);
    }

    let records = &c.manager.stats().latency_records;
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.turn_id, 1);
    assert_eq!(record.synthesis_first_byte_latency_ms, 120.0);
    assert_eq!(record.model_time_to_first_token_ms, 200.0);
    assert_eq!(record.end_to_end_ms, 500.0);
    assert_eq!(record.model_to_synthesis_gap_ms, 180.0);
    assert!(!record.has_negative_component);

    assert_eq!(c.manager.state(), TurnState::Idle);
    assert!(c.manager.carry().is_empty());
}

#[tokio::test]
async fn test_barge_in_during_streaming() {
    let mut c = Conversation::new();

    c.send(InboundEvent::asr("tell me a story", true)).await;
    c.send(InboundEvent::llm_delta("Once upon a time", "Once upon a time"))
        .await;
    assert_eq!(c.manager.state(), TurnState::Streaming);
    assert_eq!(c.manager.carry(), "Once upon a time");
    c.sink.clear();

    // User talks over the assistant
    c.send(InboundEvent::asr("wait a second", false)).await;

    let commands = c.sink.commands();
    let names: Vec<&str> = commands.iter().map(|c| c.name()).collect();
    assert_eq!(
        names,
        vec!["model_cancel", "tts_flush", "transport_flush", "transcript"]
    );
    assert!(c.manager.carry().is_empty());
    assert_eq!(c.manager.active_turn(), None);
    assert_eq!(c.manager.turn_id(), 1);

    // Late output and feedback for the cancelled turn change nothing
    c.sink.clear();
    c.send(InboundEvent::llm_delta(" there was a dragon.", "...")).await;
    c.send(ttfb_for_turn(90.0, 1)).await;
    assert!(c.sink.tts_inputs().is_empty());
    assert!(c.manager.stats().latency_records.is_empty());
    assert_eq!(c.manager.stats().stale_events, 2);

    c.send(InboundEvent::asr("wait a second please", true)).await;
    assert_eq!(c.manager.active_turn(), Some(2));
    assert_eq!(c.submitted_turns(), vec![2]);
}

#[tokio::test]
async fn test_late_feedback_after_next_turn_is_discarded() {
    let mut c = Conversation::new();

    c.send(InboundEvent::asr("first question", true)).await;
    c.clock.advance_ms(100);
    c.send(InboundEvent::llm_delta("Hi there.", "Hi there.")).await;
    c.clock.advance_ms(100);
    c.send(InboundEvent::asr("second question", true)).await;
    assert_eq!(c.manager.active_turn(), Some(2));

    // Turn 1's feedback, with and without the echoed turn id
    c.send(ttfb_for_turn(120.0, 1)).await;
    c.send(InboundEvent::tts_ttfb(120.0)).await;
    assert!(c.manager.stats().latency_records.is_empty());
    assert_eq!(c.manager.stats().stale_events, 2);

    // Turn 2 measures normally afterwards
    c.clock.advance_ms(150);
    c.send(InboundEvent::llm_delta("Of course.", "Of course.")).await;
    c.clock.advance_ms(250);
    c.send(InboundEvent::tts_ttfb(60.0)).await;

    let records = &c.manager.stats().latency_records;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].turn_id, 2);
    assert_eq!(records[0].model_time_to_first_token_ms, 150.0);
    assert_eq!(records[0].end_to_end_ms, 400.0);
    assert_eq!(records[0].model_to_synthesis_gap_ms, 190.0);
    assert_eq!(c.manager.stats().stale_events, 2);
}

#[tokio::test]
async fn test_turn_ids_strictly_increase() {
    let mut c = Conversation::new();

    for text in ["one", "two", "three", "four"] {
        c.send(InboundEvent::asr(text, true)).await;
        c.send(InboundEvent::llm_delta("Okay.", "Okay.")).await;
        c.send(InboundEvent::llm_final("", "Okay.")).await;
    }

    assert_eq!(c.submitted_turns(), vec![1, 2, 3, 4]);
    let request_ids: Vec<String> = c
        .sink
        .tts_inputs()
        .into_iter()
        .filter(|input| input.text_input_end)
        .map(|input| input.request_id)
        .collect();
    assert_eq!(
        request_ids,
        vec![
            "tts-request-1",
            "tts-request-2",
            "tts-request-3",
            "tts-request-4"
        ]
    );
}

#[tokio::test]
async fn test_ttft_measured_from_finalization() {
    let mut c = Conversation::new();

    c.send(InboundEvent::asr("what time is it", true)).await;
    c.clock.advance_ms(340);
    c.send(InboundEvent::llm_delta("It", "It")).await;
    // Later tokens do not move the first-token timestamp
    c.clock.advance_ms(500);
    c.send(InboundEvent::llm_delta(" is noon.", "It is noon.")).await;
    c.send(InboundEvent::llm_final("", "It is noon.")).await;
    c.clock.advance_ms(100);
    c.send(ttfb_for_turn(75.0, 1)).await;

    let record = &c.manager.stats().latency_records[0];
    assert_eq!(record.model_time_to_first_token_ms, 340.0);
    assert_eq!(record.end_to_end_ms, 940.0);
    assert_eq!(record.model_to_synthesis_gap_ms, 940.0 - 340.0 - 75.0);

    // The record is terminal
    c.send(ttfb_for_turn(75.0, 1)).await;
    assert_eq!(c.manager.stats().latency_records.len(), 1);
}

#[tokio::test]
async fn test_reasoning_goes_to_transcript_only() {
    let mut c = Conversation::new();
    c.send(InboundEvent::asr("think hard", true)).await;
    c.sink.clear();

    let reasoning = match InboundEvent::llm_delta("Considering.", "Considering.") {
        InboundEvent::LlmResponse(mut response) => {
            response.kind = voice_orchestrator_core::LlmResponseKind::Reasoning;
            InboundEvent::LlmResponse(response)
        }
        other => other,
    };
    c.send(reasoning).await;

    assert!(c.sink.tts_inputs().is_empty());
    let transcripts = c.sink.transcripts();
    assert_eq!(transcripts.len(), 1);
    assert_eq!(transcripts[0].role, Role::Assistant);
    assert_eq!(transcripts[0].stream_id, 100);
}

#[tokio::test]
async fn test_greeting_on_first_join() {
    let sink = Arc::new(RecordingSink::new());
    let manager = TurnManager::new(
        OrchestratorConfig {
            greeting: Some("Hello, how can I help?".into()),
            ..Default::default()
        },
        SentenceSegmenter::default(),
        sink.clone(),
        sink.clone(),
    );
    let router = EventRouter::<TurnManager>::standard().unwrap();
    let mut manager = manager;

    router.dispatch(&mut manager, InboundEvent::UserJoined).await;
    router.dispatch(&mut manager, InboundEvent::UserJoined).await;

    let inputs = sink.tts_inputs();
    assert_eq!(inputs.len(), 1);
    assert_eq!(inputs[0].text, "Hello, how can I help?");
    assert!(inputs[0].text_input_end);
    assert_eq!(inputs[0].request_id, "tts-request-0");
    assert_eq!(manager.participant_count(), 2);
}

#[tokio::test]
async fn test_sessions_over_channel_sink() {
    let (tx, mut rx) = mpsc::unbounded_channel::<SessionCommand>();
    let factory: SinkFactory = Arc::new(move |key: &str| {
        let sink = Arc::new(ChannelSink::new(key, tx.clone()));
        SessionSinks {
            commands: sink.clone(),
            model: sink,
        }
    });
    let sessions = SessionManager::new(&Settings::default(), factory).unwrap();

    sessions
        .dispatch("alpha", InboundEvent::asr("hello", true))
        .await
        .unwrap();
    sessions
        .dispatch("alpha", InboundEvent::llm_delta("Hi. How are", "Hi. How are"))
        .await
        .unwrap();
    sessions
        .dispatch("beta", InboundEvent::asr("hey", false))
        .await
        .unwrap();

    let summaries = sessions.shutdown().await;
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].key, "alpha");
    assert_eq!(summaries[0].turns, 1);
    assert_eq!(summaries[0].final_state, TurnState::Streaming);
    assert_eq!(summaries[1].key, "beta");
    assert_eq!(summaries[1].turns, 0);

    let mut by_session: HashMap<String, Vec<SessionCommand>> = HashMap::new();
    while let Ok(command) = rx.try_recv() {
        by_session
            .entry(command.session.clone())
            .or_default()
            .push(command);
    }

    let alpha: Vec<Value> = by_session["alpha"]
        .iter()
        .map(|c| serde_json::to_value(c).unwrap())
        .collect();
    let tts: Vec<&Value> = alpha
        .iter()
        .filter(|v| v["command"] == "tts_text")
        .collect();
    assert_eq!(tts.len(), 1);
    assert_eq!(tts[0]["text"], json!("Hi. "));
    assert_eq!(tts[0]["session"], json!("alpha"));

    let beta_names: Vec<&str> = by_session["beta"]
        .iter()
        .map(|c| c.command.name())
        .collect();
    assert_eq!(
        beta_names,
        vec!["model_cancel", "tts_flush", "transport_flush", "transcript"]
    );
}
