//! PageBackend trait
//!
//! The backend wraps the templating engine, locale rendering, and the
//! "ready for usage" persistence call. The workflow only traces around it.

use async_trait::async_trait;
use pagetrace_observe::OperationContext;

use crate::error::BackendError;
use crate::model::{ContainerContext, FilledTemplate, PageSource, RenderedPage};

/// Collaborators the preparation workflow delegates to
///
/// Every call receives the context of the scope that issued it, so
/// implementations can start nested scopes of their own.
#[async_trait]
pub trait PageBackend: Send + Sync {
    /// Fetch the template for `source` and fill it for `locales`
    async fn fetch_and_fill_template(
        &self,
        cx: &OperationContext,
        source: PageSource,
        container: &ContainerContext,
        locales: &[String],
    ) -> Result<FilledTemplate, BackendError>;

    /// Configure a page from a filled template
    ///
    /// The returned page lists the locales that actually rendered.
    async fn configure_from_template(
        &self,
        cx: &OperationContext,
        container: &ContainerContext,
        template: &FilledTemplate,
        locales: &[String],
    ) -> Result<RenderedPage, BackendError>;

    /// Mark rendered templates as ready for usage
    async fn mark_ready_for_usage(
        &self,
        cx: &OperationContext,
        container: &ContainerContext,
        template_ids: &[String],
    ) -> Result<(), BackendError>;
}
