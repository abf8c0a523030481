//! Closed-scope events for in-process consumers.
//!
//! Every scope publishes a [`TraceEvent`] when it closes. Consumers
//! subscribe through [`Tracer::subscribe`](crate::Tracer::subscribe);
//! OpenTelemetry exporters receive the same data independently.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::attribute::AttributeValue;

/// Status of a completed scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanStatus {
    /// Scope completed successfully
    #[default]
    Ok,
    /// Scope completed with a recorded failure
    Error,
}

impl SpanStatus {
    pub fn is_error(self) -> bool {
        matches!(self, Self::Error)
    }
}

/// Snapshot of a scope taken when it closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// The trace ID (128-bit hex string)
    pub trace_id: String,
    /// The span ID (64-bit hex string)
    pub span_id: String,
    /// Parent span ID if this is a child scope
    pub parent_span_id: Option<String>,
    /// Operation name (e.g., "prepare_container")
    pub name: String,
    /// When the scope started
    pub timestamp: DateTime<Utc>,
    /// Duration in milliseconds
    pub duration_ms: Option<f64>,
    /// Recorded attributes, last write per key
    pub attributes: BTreeMap<String, AttributeValue>,
    /// Completion status
    pub status: SpanStatus,
    /// Failure message when `status` is `Error`
    pub status_message: Option<String>,
}

impl TraceEvent {
    /// Look up a recorded attribute.
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }
}

/// Fan-out of closed-scope events to any number of receivers.
#[derive(Debug, Clone)]
pub(crate) struct EventBroadcaster {
    tx: broadcast::Sender<TraceEvent>,
}

impl EventBroadcaster {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<TraceEvent> {
        self.tx.subscribe()
    }

    /// Best-effort publish; having no receivers is fine.
    pub(crate) fn publish(&self, event: &TraceEvent) {
        if self.tx.receiver_count() > 0 {
            let _ = self.tx.send(event.clone());
        }
    }
}
