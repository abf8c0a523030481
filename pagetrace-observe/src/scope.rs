//! Scopes: one timed interval per logical operation.
//!
//! A scope is opened by [`Tracer::start`](crate::Tracer::start), collects
//! attributes while the operation runs, and is closed exactly once:
//! explicitly via [`Scope::close`] or implicitly on drop, which covers `?`
//! and early returns.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;
use opentelemetry::trace::{Span as _, SpanId, Status, TraceId};

use crate::attribute::AttributeValue;
use crate::context::attributes;
use crate::export::{SpanStatus, TraceEvent};
use crate::tracer::TracerShared;

/// Stable, low-cardinality classification of a failure.
///
/// Implemented by error types that want `error.kind` recorded alongside
/// the message.
pub trait FailureKind {
    fn kind(&self) -> &'static str;
}

/// An open scope.
pub struct Scope {
    name: Cow<'static, str>,
    trace_id: TraceId,
    span_id: SpanId,
    parent_span_id: Option<SpanId>,
    started_at: DateTime<Utc>,
    attributes: BTreeMap<String, AttributeValue>,
    failure: Option<String>,
    span: opentelemetry_sdk::trace::Span,
    shared: Arc<TracerShared>,
    closed: bool,
}

impl Scope {
    pub(crate) fn open(
        name: Cow<'static, str>,
        span: opentelemetry_sdk::trace::Span,
        trace_id: TraceId,
        span_id: SpanId,
        parent_span_id: Option<SpanId>,
        shared: Arc<TracerShared>,
    ) -> Self {
        tracing::trace!(operation = %name, %trace_id, %span_id, "scope opened");
        Self {
            name,
            trace_id,
            span_id,
            parent_span_id,
            started_at: Utc::now(),
            attributes: BTreeMap::new(),
            failure: None,
            span,
            shared,
            closed: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    pub fn span_id(&self) -> SpanId {
        self.span_id
    }

    pub fn parent_span_id(&self) -> Option<SpanId> {
        self.parent_span_id
    }

    /// Attach an attribute. The last write for a key wins.
    ///
    /// The exported span receives the final attribute set when the scope
    /// closes.
    pub fn record(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Read back a recorded attribute.
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    pub fn attributes(&self) -> &BTreeMap<String, AttributeValue> {
        &self.attributes
    }

    /// Mark this scope as failed and hand the error back unchanged.
    ///
    /// Records `error.message`, plus `error.chain` when the error has
    /// sources. Calling it again replaces the previous message and drops
    /// any `error.chain` or `error.kind` left by the earlier failure.
    pub fn record_failure<E: Error>(&mut self, err: E) -> E {
        let message = err.to_string();

        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }

        self.span.add_event(
            "exception",
            vec![KeyValue::new("exception.message", message.clone())],
        );
        self.attributes.remove(attributes::ERROR_KIND);
        if chain.is_empty() {
            self.attributes.remove(attributes::ERROR_CHAIN);
        } else {
            self.record(attributes::ERROR_CHAIN, chain);
        }
        self.record(attributes::ERROR_MESSAGE, message.as_str());

        tracing::debug!(
            operation = %self.name,
            trace_id = %self.trace_id,
            span_id = %self.span_id,
            error = %message,
            "failure recorded"
        );
        self.failure = Some(message);
        err
    }

    /// Like [`record_failure`](Self::record_failure), also recording
    /// `error.kind`.
    pub fn record_classified_failure<E: Error + FailureKind>(&mut self, err: E) -> E {
        let err = self.record_failure(err);
        self.record(attributes::ERROR_KIND, err.kind());
        err
    }

    /// Current status: `Error` once a failure was recorded, `Ok` otherwise.
    pub fn status(&self) -> SpanStatus {
        if self.failure.is_some() {
            SpanStatus::Error
        } else {
            SpanStatus::Ok
        }
    }

    pub fn failure_message(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Close the scope now and return its final snapshot.
    pub fn close(mut self) -> TraceEvent {
        self.finish()
    }

    fn finish(&mut self) -> TraceEvent {
        self.closed = true;

        let ended_at = Utc::now();
        let duration_ms = (ended_at - self.started_at)
            .num_microseconds()
            .map(|us| us as f64 / 1000.0);

        let status = self.status();
        self.span.set_attributes(
            self.attributes
                .iter()
                .map(|(key, value)| KeyValue::new(key.clone(), opentelemetry::Value::from(value))),
        );
        match &self.failure {
            Some(message) => self.span.set_status(Status::error(message.clone())),
            None => self.span.set_status(Status::Ok),
        }
        self.span.end();

        let event = TraceEvent {
            trace_id: self.trace_id.to_string(),
            span_id: self.span_id.to_string(),
            parent_span_id: self.parent_span_id.map(|id| id.to_string()),
            name: self.name.to_string(),
            timestamp: self.started_at,
            duration_ms,
            attributes: self.attributes.clone(),
            status,
            status_message: self.failure.clone(),
        };

        tracing::trace!(
            operation = %self.name,
            trace_id = %self.trace_id,
            span_id = %self.span_id,
            ?status,
            duration_ms,
            "scope closed"
        );
        self.shared.scope_closed(&event);
        event
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        if !self.closed {
            self.finish();
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("name", &self.name)
            .field("trace_id", &self.trace_id)
            .field("span_id", &self.span_id)
            .field("parent_span_id", &self.parent_span_id)
            .field("attributes", &self.attributes)
            .field("failure", &self.failure)
            .finish_non_exhaustive()
    }
}

/// Record the error of a `Result` on a scope while passing it through.
///
/// ```ignore
/// let page = render(&cx).await.record_err(&mut scope)?;
/// ```
pub trait RecordErrExt<T, E> {
    fn record_err(self, scope: &mut Scope) -> Result<T, E>;
}

impl<T, E> RecordErrExt<T, E> for Result<T, E>
where
    E: Error + FailureKind,
{
    fn record_err(self, scope: &mut Scope) -> Result<T, E> {
        self.map_err(|e| scope.record_classified_failure(e))
    }
}
