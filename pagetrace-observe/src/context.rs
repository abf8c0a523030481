//! Operation context propagation.
//!
//! This module provides:
//! - `OperationContext`, the handle passed down through nested operations
//! - Standard attribute names written by the helper layer itself

use opentelemetry::trace::{SpanContext, SpanId, TraceContextExt, TraceId};

/// Standard attribute names recorded by [`Scope`](crate::Scope).
pub mod attributes {
    pub const ERROR_MESSAGE: &str = "error.message";
    pub const ERROR_KIND: &str = "error.kind";
    pub const ERROR_CHAIN: &str = "error.chain";
}

/// Propagatable handle referencing the currently active scope.
///
/// Cloning is cheap. Pass it into every nested operation so the scopes
/// started there become children of the caller's scope. An empty context
/// (see [`OperationContext::new`]) has no active scope, and the next scope
/// started from it is a root.
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    cx: opentelemetry::Context,
}

impl OperationContext {
    /// Create a context with no active scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing OpenTelemetry context, e.g. one extracted from
    /// incoming request headers by a propagator.
    pub fn from_otel(cx: opentelemetry::Context) -> Self {
        Self { cx }
    }

    pub(crate) fn child(&self, span_context: SpanContext) -> Self {
        Self {
            cx: self.cx.with_remote_span_context(span_context),
        }
    }

    /// The underlying OpenTelemetry context.
    pub fn otel(&self) -> &opentelemetry::Context {
        &self.cx
    }

    /// Whether a scope is active in this context.
    pub fn has_active_scope(&self) -> bool {
        self.cx.has_active_span() && self.cx.span().span_context().is_valid()
    }

    /// Trace ID of the active scope, if any.
    #[must_use]
    pub fn trace_id(&self) -> Option<TraceId> {
        self.has_active_scope()
            .then(|| self.cx.span().span_context().trace_id())
    }

    /// Span ID of the active scope, if any.
    #[must_use]
    pub fn span_id(&self) -> Option<SpanId> {
        self.has_active_scope()
            .then(|| self.cx.span().span_context().span_id())
    }
}
