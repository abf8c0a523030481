//! pagetrace-core: traced container preparation
//!
//! This crate wraps a page-templating workflow with request-scoped
//! tracing from [`pagetrace_observe`]:
//!
//! - **Workflow** - [`ContainerPreparer`] runs `prepare_container` and
//!   `render_page`, one scope per operation
//! - **Collaborators** - [`PageBackend`] abstracts templating, locale
//!   rendering, and persistence; [`MockBackend`] scripts it for tests
//! - **Configuration** - [`PagetraceConfig`] loads tracer, logging, and
//!   workflow defaults from TOML
//!
//! # Quick Start
//!
//! ```no_run
//! use pagetrace_core::{
//!     ContainerContext, ContainerPreparer, MockBackend, PageSlugs, PrepareRequest,
//! };
//! use pagetrace_observe::{OperationContext, Tracer, TracerConfig};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let tracer = Tracer::new(&TracerConfig::default())?;
//!     let _guard = tracer.guard();
//!     let preparer = ContainerPreparer::new(tracer, MockBackend::new());
//!
//!     let container = ContainerContext::new(
//!         "container-1",
//!         PageSlugs { home: "home".into(), faq: Some("faq".into()) },
//!     );
//!     let request = PrepareRequest::new(["en", "fr"]).dry_run(true);
//!
//!     let result = preparer
//!         .prepare_container(&OperationContext::new(), &container, &request)
//!         .await?;
//!     println!("{}: {:?}", result.status, result.template_ids);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod model;
pub mod preparer;

pub use backend::{MockBackend, MockCall, PageBackend};
pub use config::{PagetraceConfig, PrepareRequest, WorkflowConfig};
pub use error::{BackendError, ConfigError, PrepareError};
pub use model::{
    ContainerContext, FilledTemplate, PageSlugs, PageSource, PrepareStatus, RenderedPage,
    StatusResult,
};
pub use preparer::ContainerPreparer;
