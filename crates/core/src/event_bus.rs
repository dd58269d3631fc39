//! Outbound notification channel — trait for emitting engine events to
//! external observers (dashboards, alerting). Delivery order across multiple
//! observers is not guaranteed.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use uuid::Uuid;

use crate::types::{EngineEvent, EventType};

/// Trait for emitting engine events. Implementations route events to
/// whatever transport the embedding service wires up.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// No-op sink for tests and embeddings that don't consume notifications.
pub struct NoOpSink;

impl EventSink for NoOpSink {
    fn emit(&self, _event: EngineEvent) {}
}

/// In-memory sink that captures events for testing.
#[derive(Default)]
pub struct CaptureSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().expect("event bus mutex poisoned").clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().expect("event bus mutex poisoned").len()
    }

    pub fn count_type(&self, event_type: EventType) -> usize {
        self.events
            .lock()
            .expect("event bus mutex poisoned")
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().expect("event bus mutex poisoned").clear();
    }
}

impl EventSink for CaptureSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().expect("event bus mutex poisoned").push(event);
    }
}

/// Sink that forwards every event into the tracing pipeline.
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: EngineEvent) {
        tracing::info!(
            event_type = ?event.event_type,
            identity_id = event.identity_id.as_deref().unwrap_or("-"),
            journey_id = ?event.journey_id,
            payload = %event.payload,
            "engine event"
        );
    }
}

/// Convenience builder for creating an `EngineEvent` with minimal boilerplate.
pub fn make_event(
    event_type: EventType,
    identity_id: Option<String>,
    journey_id: Option<Uuid>,
    payload: serde_json::Value,
) -> EngineEvent {
    EngineEvent {
        event_id: Uuid::new_v4(),
        event_type,
        identity_id,
        journey_id,
        payload,
        timestamp: Utc::now(),
    }
}

/// Convenience: create a no-op sink for embeddings that don't need one.
pub fn noop_sink() -> Arc<dyn EventSink> {
    Arc::new(NoOpSink)
}

/// Convenience: create a capture sink for tests.
pub fn capture_sink() -> Arc<CaptureSink> {
    Arc::new(CaptureSink::new())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_sink() {
        let sink = capture_sink();
        assert_eq!(sink.count(), 0);

        sink.emit(make_event(
            EventType::TouchpointTracked,
            Some("user-1".into()),
            None,
            serde_json::json!({"touchpoint_type": "page_view"}),
        ));
        sink.emit(make_event(
            EventType::JourneyUpdated,
            Some("user-1".into()),
            Some(Uuid::new_v4()),
            serde_json::json!({"touchpoint_count": 1}),
        ));

        assert_eq!(sink.count(), 2);
        assert_eq!(sink.count_type(EventType::TouchpointTracked), 1);
        assert_eq!(sink.count_type(EventType::JourneyUpdated), 1);

        let events = sink.events();
        assert_eq!(events[0].identity_id, Some("user-1".into()));
        assert!(events[1].journey_id.is_some());
    }

    #[test]
    fn test_noop_sink() {
        let sink = noop_sink();
        // Should not panic
        sink.emit(make_event(
            EventType::AnalysisError,
            None,
            None,
            serde_json::json!({}),
        ));
    }
}
