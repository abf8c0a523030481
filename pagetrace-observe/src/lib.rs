//! Request-scoped tracing helpers for pagetrace.
//!
//! This crate provides OpenTelemetry-backed scopes for wrapping multi-step
//! business operations:
//! - [`Tracer::start`] opens a child scope under an [`OperationContext`]
//! - [`Scope::record`] attaches attributes, [`Scope::record_failure`] marks
//!   the scope failed and hands the error back for propagation
//! - scopes close exactly once, on [`Scope::close`] or on drop
//! - closed scopes are exported through OpenTelemetry and published as
//!   [`TraceEvent`]s to in-process subscribers

pub mod attribute;
pub mod context;
pub mod export;
pub mod logging;
pub mod scope;
pub mod tracer;

pub use attribute::AttributeValue;
pub use context::{OperationContext, attributes};
pub use export::{SpanStatus, TraceEvent};
pub use logging::{LogFormat, LoggingConfig, init_logging};
pub use scope::{FailureKind, RecordErrExt, Scope};
pub use tracer::{ExportTarget, Tracer, TracerConfig, TracerError, TracerStats, TracingGuard};
pub use opentelemetry::trace::{SpanId, TraceId};
