use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditCategory {
    Ingress,
    Resolution,
    Validation,
    Execution,
    System,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditOutcome {
    Success,
    Rejected,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    pub correlation_id: String,
    pub operation: String,
    pub event_type: String,
    pub category: AuditCategory,
    pub outcome: AuditOutcome,
    pub metadata: BTreeMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        correlation_id: impl Into<String>,
        operation: impl Into<String>,
        event_type: impl Into<String>,
        category: AuditCategory,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            correlation_id: correlation_id.into(),
            operation: operation.into(),
            event_type: event_type.into(),
            category,
            outcome,
            metadata: BTreeMap::new(),
            occurred_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Observer handed to the dispatcher explicitly; there is no process-wide
/// counter or log file.
pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

impl<S> AuditSink for Arc<S>
where
    S: AuditSink + ?Sized,
{
    fn emit(&self, event: AuditEvent) {
        (**self).emit(event);
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn emit(&self, _event: AuditEvent) {}
}

#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn event_types(&self) -> Vec<String> {
        self.events().into_iter().map(|event| event.event_type).collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn emit(&self, event: AuditEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// Forwards every event to `tracing` at debug (success) or warn (otherwise).
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        let metadata = format!("{:?}", event.metadata);
        match event.outcome {
            AuditOutcome::Success => tracing::debug!(
                event_name = %event.event_type,
                correlation_id = %event.correlation_id,
                operation = %event.operation,
                category = ?event.category,
                metadata = %metadata,
                "dispatch audit event"
            ),
            AuditOutcome::Rejected | AuditOutcome::Failed => tracing::warn!(
                event_name = %event.event_type,
                correlation_id = %event.correlation_id,
                operation = %event.operation,
                category = ?event.category,
                outcome = ?event.outcome,
                metadata = %metadata,
                "dispatch audit event"
            ),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CallCount {
    pub invocations: u64,
    pub failures: u64,
}

/// Per-operation call telemetry built from dispatch events.
#[derive(Clone, Default)]
pub struct CallCounter {
    counts: Arc<Mutex<BTreeMap<String, CallCount>>>,
}

impl CallCounter {
    pub fn snapshot(&self) -> BTreeMap<String, CallCount> {
        match self.counts.lock() {
            Ok(counts) => counts.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn total_invocations(&self) -> u64 {
        self.snapshot().values().map(|count| count.invocations).sum()
    }
}

impl AuditSink for CallCounter {
    fn emit(&self, event: AuditEvent) {
        let received = event.event_type == "dispatch.received";
        let failed = event.event_type == "dispatch.failed";
        if !received && !failed {
            return;
        }

        let mut counts = match self.counts.lock() {
            Ok(counts) => counts,
            Err(poisoned) => poisoned.into_inner(),
        };
        let entry = counts.entry(event.operation).or_default();
        if received {
            entry.invocations += 1;
        } else {
            entry.failures += 1;
        }
    }
}

/// Fans one event out to several sinks.
#[derive(Clone, Default)]
pub struct FanoutAuditSink {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl FanoutAuditSink {
    pub fn new(sinks: Vec<Arc<dyn AuditSink>>) -> Self {
        Self { sinks }
    }
}

impl AuditSink for FanoutAuditSink {
    fn emit(&self, event: AuditEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::audit::{
        AuditCategory, AuditEvent, AuditOutcome, AuditSink, CallCounter, FanoutAuditSink,
        InMemoryAuditSink,
    };

    fn event(operation: &str, event_type: &str, outcome: AuditOutcome) -> AuditEvent {
        AuditEvent::new("req-1", operation, event_type, AuditCategory::Ingress, outcome)
    }

    #[test]
    fn in_memory_sink_records_events_with_correlation_fields() {
        let sink = InMemoryAuditSink::default();
        sink.emit(
            AuditEvent::new(
                "req-123",
                "forget_person",
                "dispatch.transition",
                AuditCategory::Resolution,
                AuditOutcome::Success,
            )
            .with_metadata("from", "Received")
            .with_metadata("to", "ResolvingEntities"),
        );

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].correlation_id, "req-123");
        assert_eq!(events[0].operation, "forget_person");
        assert!(events[0].metadata.contains_key("from"));
    }

    #[test]
    fn call_counter_tracks_invocations_and_failures_per_operation() {
        let counter = CallCounter::default();
        counter.emit(event("track_debt", "dispatch.received", AuditOutcome::Success));
        counter.emit(event("track_debt", "dispatch.failed", AuditOutcome::Failed));
        counter.emit(event("find_people", "dispatch.received", AuditOutcome::Success));
        counter.emit(event("find_people", "dispatch.transition", AuditOutcome::Success));

        let counts = counter.snapshot();
        assert_eq!(counts["track_debt"].invocations, 1);
        assert_eq!(counts["track_debt"].failures, 1);
        assert_eq!(counts["find_people"].invocations, 1);
        assert_eq!(counts["find_people"].failures, 0);
        assert_eq!(counter.total_invocations(), 2);
    }

    #[test]
    fn fanout_delivers_to_every_sink() {
        let memory = Arc::new(InMemoryAuditSink::default());
        let counter = Arc::new(CallCounter::default());
        let fanout = FanoutAuditSink::new(vec![memory.clone(), counter.clone()]);

        fanout.emit(event("log_gift", "dispatch.received", AuditOutcome::Success));

        assert_eq!(memory.events().len(), 1);
        assert_eq!(counter.total_invocations(), 1);
    }
}
