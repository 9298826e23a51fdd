//! Event dispatch table
//!
//! Maps each inbound event kind to exactly one handler. The table is built
//! once, when a session coordinator starts, and registering a second handler
//! for the same kind is an error rather than a silent override.

use futures::future::BoxFuture;
use std::collections::HashMap;
use thiserror::Error;

use voice_orchestrator_core::{EventKind, InboundEvent};

use crate::turn::TurnManager;

/// Handler for one event kind
pub type EventHandler<T> = for<'a> fn(&'a mut T, InboundEvent) -> BoxFuture<'a, ()>;

/// Dispatch table errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("Handler already registered for '{}'", .0.as_str())]
    DuplicateHandler(EventKind),
}

/// Event kind to handler table
pub struct EventRouter<T> {
    handlers: HashMap<EventKind, EventHandler<T>>,
}

impl<T> EventRouter<T> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register the handler for `kind`
    pub fn register(&mut self, kind: EventKind, handler: EventHandler<T>) -> Result<(), RouterError> {
        if self.handlers.contains_key(&kind) {
            return Err(RouterError::DuplicateHandler(kind));
        }
        self.handlers.insert(kind, handler);
        Ok(())
    }

    /// Builder-style `register`
    pub fn on(mut self, kind: EventKind, handler: EventHandler<T>) -> Result<Self, RouterError> {
        self.register(kind, handler)?;
        Ok(self)
    }

    pub fn has_handler(&self, kind: EventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Registered kinds, in `EventKind::all()` order
    pub fn kinds(&self) -> Vec<EventKind> {
        EventKind::all()
            .iter()
            .copied()
            .filter(|k| self.handlers.contains_key(k))
            .collect()
    }

    /// Run the handler for `event`; returns false if none is registered
    pub async fn dispatch(&self, target: &mut T, event: InboundEvent) -> bool {
        let kind = event.kind();
        match self.handlers.get(&kind) {
            Some(handler) => {
                handler(target, event).await;
                true
            }
            None => {
                tracing::debug!(event = kind.as_str(), "No handler registered");
                false
            }
        }
    }
}

impl<T> Default for EventRouter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl EventRouter<TurnManager> {
    /// The turn manager's handler set, one per event kind
    pub fn standard() -> Result<Self, RouterError> {
        Self::new()
            .on(EventKind::UserJoined, on_user_joined)?
            .on(EventKind::UserLeft, on_user_left)?
            .on(EventKind::AsrResult, on_asr_result)?
            .on(EventKind::LlmResponse, on_llm_response)?
            .on(EventKind::ToolRegister, on_tool_register)?
            .on(EventKind::Metrics, on_metrics)
    }
}

fn on_user_joined(manager: &mut TurnManager, _event: InboundEvent) -> BoxFuture<'_, ()> {
    Box::pin(manager.on_user_joined())
}

fn on_user_left(manager: &mut TurnManager, _event: InboundEvent) -> BoxFuture<'_, ()> {
    Box::pin(manager.on_user_left())
}

fn on_asr_result(manager: &mut TurnManager, event: InboundEvent) -> BoxFuture<'_, ()> {
    Box::pin(async move {
        if let InboundEvent::AsrResult(asr) = event {
            manager.on_asr_result(asr).await;
        }
    })
}

fn on_llm_response(manager: &mut TurnManager, event: InboundEvent) -> BoxFuture<'_, ()> {
    Box::pin(async move {
        if let InboundEvent::LlmResponse(response) = event {
            manager.on_llm_response(response).await;
        }
    })
}

fn on_tool_register(manager: &mut TurnManager, event: InboundEvent) -> BoxFuture<'_, ()> {
    Box::pin(async move {
        if let InboundEvent::ToolRegister(registration) = event {
            manager.on_tool_register(registration).await;
        }
    })
}

fn on_metrics(manager: &mut TurnManager, event: InboundEvent) -> BoxFuture<'_, ()> {
    Box::pin(async move {
        if let InboundEvent::Metrics(feedback) = event {
            manager.on_metrics(feedback).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        seen: Vec<EventKind>,
    }

    fn count(counter: &mut Counter, event: InboundEvent) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            counter.seen.push(event.kind());
        })
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut router = EventRouter::<Counter>::new();
        router.register(EventKind::UserJoined, count).unwrap();

        let err = router.register(EventKind::UserJoined, count).unwrap_err();
        assert_eq!(err, RouterError::DuplicateHandler(EventKind::UserJoined));
        assert_eq!(err.to_string(), "Handler already registered for 'user_joined'");
    }

    #[tokio::test]
    async fn test_dispatch_and_missing_handler() {
        let router = EventRouter::<Counter>::new()
            .on(EventKind::UserJoined, count)
            .unwrap();
        let mut counter = Counter::default();

        assert!(router.dispatch(&mut counter, InboundEvent::UserJoined).await);
        assert!(!router.dispatch(&mut counter, InboundEvent::UserLeft).await);
        assert_eq!(counter.seen, vec![EventKind::UserJoined]);
    }

    #[test]
    fn test_standard_covers_every_kind() {
        let router = EventRouter::<TurnManager>::standard().unwrap();
        assert_eq!(router.kinds(), EventKind::all().to_vec());
    }
}
