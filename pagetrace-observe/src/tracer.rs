//! Tracer construction and configuration.
//!
//! This module provides:
//! - `TracerConfig`, loadable from TOML
//! - `Tracer`, an explicitly constructed tracer that starts scopes
//! - `TracingGuard`, which flushes exporters when dropped

use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use opentelemetry::KeyValue;
use opentelemetry::trace::{
    Span as _, SpanContext, TraceContextExt, TraceFlags, TraceState, Tracer as _,
    TracerProvider as _,
};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::{IdGenerator, RandomIdGenerator, Sampler, TracerProvider};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::context::OperationContext;
use crate::export::{EventBroadcaster, TraceEvent};
use crate::scope::Scope;

/// Export target for spans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExportTarget {
    /// Print finished spans to stdout (default for development).
    Console,
    /// Export via OTLP/gRPC to a collector.
    Otlp { endpoint: String },
}

/// Configuration for the tracer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TracerConfig {
    /// Service name for spans.
    pub service_name: String,
    /// Service version for spans.
    pub service_version: String,
    /// Sample rate (0.0 to 1.0).
    pub sample_rate: f64,
    /// Export targets.
    pub exporters: Vec<ExportTarget>,
    /// Capacity of the in-process closed-scope channel.
    pub broadcast_capacity: usize,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            service_name: "pagetrace".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            sample_rate: 1.0,
            exporters: vec![ExportTarget::Console],
            broadcast_capacity: 1024,
        }
    }
}

impl TracerConfig {
    /// Config with no OpenTelemetry exporters; scopes are only published
    /// in-process.
    pub fn without_exporters() -> Self {
        Self {
            exporters: Vec::new(),
            ..Self::default()
        }
    }

    /// Sample rate clamped to `[0.0, 1.0]`; NaN counts as 1.0.
    pub fn effective_sample_rate(&self) -> f64 {
        if self.sample_rate.is_nan() {
            1.0
        } else {
            self.sample_rate.clamp(0.0, 1.0)
        }
    }
}

/// Error type for tracer and logging initialization.
#[derive(Debug, thiserror::Error)]
pub enum TracerError {
    /// Failed to set global subscriber.
    #[error("failed to set global subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing_subscriber::util::TryInitError),

    /// Failed to build a span exporter.
    #[error("failed to build {target} exporter: {message}")]
    Exporter { target: &'static str, message: String },
}

/// Counts of scopes started and closed by a [`Tracer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TracerStats {
    pub started: u64,
    pub closed: u64,
}

impl TracerStats {
    /// Scopes started but not yet closed.
    pub fn open(&self) -> u64 {
        self.started.saturating_sub(self.closed)
    }
}

/// State shared between a tracer and the scopes it starts.
#[derive(Debug)]
pub(crate) struct TracerShared {
    provider: TracerProvider,
    otel: opentelemetry_sdk::trace::Tracer,
    events: EventBroadcaster,
    started: AtomicU64,
    closed: AtomicU64,
}

impl TracerShared {
    pub(crate) fn scope_closed(&self, event: &TraceEvent) {
        self.closed.fetch_add(1, Ordering::Relaxed);
        self.events.publish(event);
    }
}

/// Starts scopes for logical operations.
///
/// Construct one per process (or per test) and inject it wherever root
/// operations begin. Clones share the same provider, counters, and event
/// channel.
#[derive(Debug, Clone)]
pub struct Tracer {
    shared: Arc<TracerShared>,
}

impl Tracer {
    /// Build a tracer and its OpenTelemetry pipeline from config.
    ///
    /// OTLP exporters use the batch processor and must be built inside a
    /// tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if an exporter cannot be constructed.
    pub fn new(config: &TracerConfig) -> Result<Self, TracerError> {
        let sampler = Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
            config.effective_sample_rate(),
        )));
        let resource = Resource::new(vec![
            KeyValue::new("service.name", config.service_name.clone()),
            KeyValue::new("service.version", config.service_version.clone()),
        ]);

        let mut builder = TracerProvider::builder()
            .with_sampler(sampler)
            .with_resource(resource);

        for target in &config.exporters {
            builder = match target {
                ExportTarget::Console => {
                    builder.with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
                }
                ExportTarget::Otlp { endpoint } => {
                    let exporter = opentelemetry_otlp::SpanExporter::builder()
                        .with_tonic()
                        .with_endpoint(endpoint.clone())
                        .build()
                        .map_err(|e| TracerError::Exporter {
                            target: "otlp",
                            message: e.to_string(),
                        })?;
                    builder.with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
                }
            };
        }

        tracing::debug!(
            service = %config.service_name,
            exporters = config.exporters.len(),
            sample_rate = config.effective_sample_rate(),
            "tracer initialized"
        );

        Ok(Self::from_provider(builder.build(), config))
    }

    /// Wrap an already built provider, e.g. one carrying extra span
    /// processors. Only `service_name` and `broadcast_capacity` are read
    /// from `config`.
    pub fn from_provider(provider: TracerProvider, config: &TracerConfig) -> Self {
        let otel = provider.tracer(config.service_name.clone());
        Self {
            shared: Arc::new(TracerShared {
                provider,
                otel,
                events: EventBroadcaster::new(config.broadcast_capacity),
                started: AtomicU64::new(0),
                closed: AtomicU64::new(0),
            }),
        }
    }

    /// Start a scope named `name` under whatever scope is active in
    /// `parent`, or a new root scope if none is.
    ///
    /// Returns the context to hand to nested operations and the scope
    /// itself. The scope closes when [`Scope::close`] is called or when it
    /// is dropped, whichever comes first.
    pub fn start(
        &self,
        parent: &OperationContext,
        name: impl Into<Cow<'static, str>>,
    ) -> (OperationContext, Scope) {
        let name = name.into();
        let span = self
            .shared
            .otel
            .start_with_context(name.clone(), parent.otel());
        let mut span_context = span.span_context().clone();
        if !span_context.is_valid() {
            // The provider stops issuing ids once shut down.
            span_context = local_span_context(parent);
        }
        let parent_span_id = parent.span_id();

        self.shared.started.fetch_add(1, Ordering::Relaxed);

        let child = parent.child(span_context.clone());
        let scope = Scope::open(
            name,
            span,
            span_context.trace_id(),
            span_context.span_id(),
            parent_span_id,
            Arc::clone(&self.shared),
        );
        (child, scope)
    }

    /// Subscribe to events for every scope closed after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<TraceEvent> {
        self.shared.events.subscribe()
    }

    /// Scopes started and closed so far.
    pub fn stats(&self) -> TracerStats {
        TracerStats {
            started: self.shared.started.load(Ordering::Relaxed),
            closed: self.shared.closed.load(Ordering::Relaxed),
        }
    }

    /// Guard that shuts the tracer down when dropped.
    pub fn guard(&self) -> TracingGuard {
        TracingGuard {
            provider: Some(self.shared.provider.clone()),
        }
    }

    /// Flush pending spans and shut down the exporters.
    pub fn shutdown(&self) {
        if let Err(e) = self.shared.provider.shutdown() {
            tracing::warn!("failed to shutdown tracer provider: {e}");
        }
    }
}

fn local_span_context(parent: &OperationContext) -> SpanContext {
    let ids = RandomIdGenerator::default();
    let (trace_id, flags) = match parent.trace_id() {
        Some(trace_id) => (trace_id, parent.otel().span().span_context().trace_flags()),
        None => (ids.new_trace_id(), TraceFlags::default()),
    };
    SpanContext::new(trace_id, ids.new_span_id(), flags, false, TraceState::default())
}

/// Guard that shuts down tracing when dropped.
///
/// Keep it alive for the duration of the program so pending spans are
/// flushed on exit.
pub struct TracingGuard {
    provider: Option<TracerProvider>,
}

impl TracingGuard {
    /// Shutdown the tracer and flush pending spans.
    pub fn shutdown(&mut self) {
        if let Some(provider) = self.provider.take()
            && let Err(e) = provider.shutdown()
        {
            tracing::warn!("failed to shutdown tracer provider: {e}");
        }
    }
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::{SpanId, Status, TraceId};
    use opentelemetry_sdk::testing::trace::InMemorySpanExporter;

    #[derive(Debug, thiserror::Error)]
    #[error("configure failed")]
    struct ConfigureFailed(#[source] std::io::Error);

    #[derive(Debug, thiserror::Error)]
    #[error("locale fr missing")]
    struct LocaleMissing;

    fn recording_tracer() -> (Tracer, InMemorySpanExporter) {
        let exporter = InMemorySpanExporter::default();
        let provider = TracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        let tracer = Tracer::from_provider(provider, &TracerConfig::without_exporters());
        (tracer, exporter)
    }

    fn assert_tree_survives(tracer: &Tracer) {
        let (cx, root) = tracer.start(&OperationContext::new(), "late");
        let (_, child) = tracer.start(&cx, "late_child");

        assert_ne!(root.trace_id(), TraceId::INVALID);
        assert_ne!(root.span_id(), SpanId::INVALID);
        assert!(cx.has_active_scope());
        assert_eq!(child.trace_id(), root.trace_id());
        assert_eq!(child.parent_span_id(), Some(root.span_id()));
        assert_ne!(child.span_id(), root.span_id());

        let event = child.close();
        assert_eq!(event.parent_span_id, Some(root.span_id().to_string()));
        assert_eq!(event.trace_id, root.trace_id().to_string());
        drop(root);
        assert_eq!(tracer.stats().open(), 0);
    }

    #[test]
    fn tracer_config_has_sensible_defaults() {
        let config = TracerConfig::default();

        assert_eq!(config.service_name, "pagetrace");
        assert!(!config.service_version.is_empty());
        assert!((config.sample_rate - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.exporters, vec![ExportTarget::Console]);
        assert_eq!(config.broadcast_capacity, 1024);
    }

    #[test]
    fn tracer_config_deserializes_from_toml() {
        let config: TracerConfig = toml::from_str(
            r#"
            service_name = "container_api"
            sample_rate = 0.25
            exporters = [
                { kind = "console" },
                { kind = "otlp", endpoint = "http://localhost:4317" },
            ]
            "#,
        )
        .unwrap();

        assert_eq!(config.service_name, "container_api");
        assert!((config.sample_rate - 0.25).abs() < f64::EPSILON);
        assert_eq!(
            config.exporters,
            vec![
                ExportTarget::Console,
                ExportTarget::Otlp {
                    endpoint: "http://localhost:4317".to_string()
                }
            ]
        );
        assert_eq!(config.broadcast_capacity, 1024);
    }

    #[test]
    fn sample_rate_is_clamped() {
        let mut config = TracerConfig::without_exporters();
        config.sample_rate = 4.0;
        assert!((config.effective_sample_rate() - 1.0).abs() < f64::EPSILON);
        config.sample_rate = -1.0;
        assert!(config.effective_sample_rate().abs() < f64::EPSILON);
        config.sample_rate = f64::NAN;
        assert!((config.effective_sample_rate() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn start_without_parent_creates_root() {
        let tracer = Tracer::new(&TracerConfig::without_exporters()).unwrap();
        let (cx, scope) = tracer.start(&OperationContext::new(), "root");

        assert!(scope.parent_span_id().is_none());
        assert_eq!(cx.span_id(), Some(scope.span_id()));
        assert_eq!(cx.trace_id(), Some(scope.trace_id()));
    }

    #[test]
    fn start_under_parent_creates_child_in_same_trace() {
        let tracer = Tracer::new(&TracerConfig::without_exporters()).unwrap();
        let (root_cx, root) = tracer.start(&OperationContext::new(), "root");
        let (_, child) = tracer.start(&root_cx, "child");

        assert_eq!(child.trace_id(), root.trace_id());
        assert_eq!(child.parent_span_id(), Some(root.span_id()));
        assert_ne!(child.span_id(), root.span_id());
    }

    #[test]
    fn stats_track_started_and_closed() {
        let tracer = Tracer::new(&TracerConfig::without_exporters()).unwrap();
        let (cx, outer) = tracer.start(&OperationContext::new(), "outer");
        let (_, inner) = tracer.start(&cx, "inner");
        assert_eq!(tracer.stats().open(), 2);

        drop(inner);
        assert_eq!(tracer.stats(), TracerStats { started: 2, closed: 1 });

        outer.close();
        assert_eq!(tracer.stats().open(), 0);
    }

    #[test]
    fn clones_share_counters() {
        let tracer = Tracer::new(&TracerConfig::without_exporters()).unwrap();
        let clone = tracer.clone();
        let (_, scope) = clone.start(&OperationContext::new(), "op");
        assert_eq!(tracer.stats().started, 1);
        drop(scope);
        assert_eq!(tracer.stats().closed, 1);
    }

    #[test]
    fn guard_shuts_down_on_drop() {
        let tracer = Tracer::new(&TracerConfig::without_exporters()).unwrap();
        let guard = tracer.guard();
        drop(guard);
    }

    #[test]
    fn scopes_keep_valid_ids_after_shutdown() {
        let tracer = Tracer::new(&TracerConfig::without_exporters()).unwrap();
        tracer.shutdown();
        assert_tree_survives(&tracer);
    }

    #[test]
    fn scopes_keep_valid_ids_after_guard_drop() {
        let tracer = Tracer::new(&TracerConfig::without_exporters()).unwrap();
        drop(tracer.guard());
        assert_tree_survives(&tracer);
    }

    #[test]
    fn exported_span_matches_closed_scope() {
        let (tracer, exporter) = recording_tracer();
        let (cx, parent) = tracer.start(&OperationContext::new(), "prepare_container");
        let (_, mut scope) = tracer.start(&cx, "render_page");

        scope.record("status", "pending");
        scope.record("status", "failed");
        scope.record_failure(ConfigureFailed(std::io::Error::other("disk full")));
        scope.record_failure(LocaleMissing);

        let event = scope.close();
        let parent_event = parent.close();

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans.len(), 2);

        let span = spans.iter().find(|s| s.name == "render_page").unwrap();
        let mut keys: Vec<_> = span.attributes.iter().map(|kv| kv.key.as_str()).collect();
        keys.sort_unstable();
        let expected: Vec<_> = event.attributes.keys().map(String::as_str).collect();
        assert_eq!(keys, expected, "one exported attribute per recorded key");
        assert!(!keys.contains(&"error.chain"));

        let status = span
            .attributes
            .iter()
            .find(|kv| kv.key.as_str() == "status")
            .unwrap();
        assert_eq!(status.value, opentelemetry::Value::from("failed"));
        assert_eq!(span.status, Status::error("locale fr missing"));
        assert_eq!(
            span.events
                .events
                .iter()
                .filter(|e| e.name == "exception")
                .count(),
            2
        );
        assert_eq!(span.span_context.span_id().to_string(), event.span_id);
        assert_eq!(span.parent_span_id.to_string(), parent_event.span_id);

        let parent_span = spans
            .iter()
            .find(|s| s.name == "prepare_container")
            .unwrap();
        assert_eq!(parent_span.status, Status::Ok);
        assert_eq!(parent_span.parent_span_id, SpanId::INVALID);
        assert!(parent_span.events.events.is_empty());
    }
}
