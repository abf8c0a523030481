//! Traced container preparation
//!
//! `prepare_container` renders the home page, the FAQ page when the
//! container has one, and marks the resulting templates ready for usage.
//! Each step runs under its own scope; failures are recorded at every
//! scope they cross and returned unchanged.

use pagetrace_observe::{OperationContext, RecordErrExt, Tracer};
use tracing::{info, warn};

use crate::backend::PageBackend;
use crate::config::PrepareRequest;
use crate::error::PrepareError;
use crate::model::{ContainerContext, PageSource, PrepareStatus, RenderedPage, StatusResult};

/// Attribute names recorded by the preparation workflow
pub mod attributes {
    pub const CONTAINER_ID: &str = "container_id";
    pub const LOCALES: &str = "locales";
    pub const DRY_RUN: &str = "dry_run";
    pub const LOCALES_MANDATORY: &str = "locales_mandatory";
    pub const HAS_FAQ: &str = "has_faq";
    pub const TEMPLATE_IDS: &str = "template_ids";
    pub const STATUS: &str = "status";
    pub const SOURCE_NAME: &str = "source_name";
    pub const ALL_LOCALES_RENDERED: &str = "all_locales_rendered";
    pub const LOCALES_RENDERED: &str = "locales_rendered";
    pub const LOCALES_MISSING: &str = "locales_missing";
}

/// Scope names
pub const PREPARE_CONTAINER: &str = "prepare_container";
pub const RENDER_PAGE: &str = "render_page";

/// Runs the preparation workflow against a backend
pub struct ContainerPreparer<B> {
    tracer: Tracer,
    backend: B,
}

impl<B: PageBackend> ContainerPreparer<B> {
    pub fn new(tracer: Tracer, backend: B) -> Self {
        Self { tracer, backend }
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Render the container's pages and, unless dry-running, mark them
    /// ready for usage.
    pub async fn prepare_container(
        &self,
        cx: &OperationContext,
        container: &ContainerContext,
        request: &PrepareRequest,
    ) -> Result<StatusResult, PrepareError> {
        let (cx, mut scope) = self.tracer.start(cx, PREPARE_CONTAINER);

        scope.record(attributes::CONTAINER_ID, container.id.as_str());
        scope.record(attributes::LOCALES, request.locales.as_slice());
        scope.record(attributes::DRY_RUN, request.dry_run);
        scope.record(attributes::LOCALES_MANDATORY, request.all_locales_required);

        let home = self
            .render_page(
                &cx,
                PageSource::Home,
                container,
                &request.locales,
                request.all_locales_required,
            )
            .await
            .record_err(&mut scope)?;

        let mut template_ids = vec![home.id];

        let has_faq = container.has_faq();
        scope.record(attributes::HAS_FAQ, has_faq);

        if has_faq {
            let faq = self
                .render_page(
                    &cx,
                    PageSource::Faq,
                    container,
                    &request.locales,
                    request.all_locales_required,
                )
                .await
                .record_err(&mut scope)?;
            template_ids.push(faq.id);
        }

        scope.record(attributes::TEMPLATE_IDS, template_ids.as_slice());

        if request.dry_run {
            scope.record(attributes::STATUS, PrepareStatus::DryRun.as_str());
            info!(
                trace_id = %scope.trace_id(),
                span_id = %scope.span_id(),
                container_id = %container.id,
                ?template_ids,
                "Dry run, not marking page template(s) for usage"
            );
            return Ok(StatusResult {
                status: PrepareStatus::DryRun,
                template_ids,
            });
        }

        info!(
            trace_id = %scope.trace_id(),
            span_id = %scope.span_id(),
            container_id = %container.id,
            ?template_ids,
            "Marking page template(s) for usage"
        );

        self.backend
            .mark_ready_for_usage(&cx, container, &template_ids)
            .await
            .map_err(PrepareError::from)
            .record_err(&mut scope)?;

        scope.record(attributes::STATUS, PrepareStatus::Complete.as_str());
        Ok(StatusResult {
            status: PrepareStatus::Complete,
            template_ids,
        })
    }

    /// Fetch, fill, and configure one page, then apply the locale policy.
    ///
    /// When some requested locales did not render, this fails if
    /// `all_locales_required` is set and otherwise records the missing
    /// locales as a warning and returns the page.
    pub async fn render_page(
        &self,
        cx: &OperationContext,
        source: PageSource,
        container: &ContainerContext,
        locales: &[String],
        all_locales_required: bool,
    ) -> Result<RenderedPage, PrepareError> {
        let (cx, mut scope) = self.tracer.start(cx, RENDER_PAGE);

        scope.record(attributes::SOURCE_NAME, source.name());
        info!(
            trace_id = %scope.trace_id(),
            span_id = %scope.span_id(),
            "Filling {source} page template"
        );

        let template = self
            .backend
            .fetch_and_fill_template(&cx, source, container, locales)
            .await
            .map_err(PrepareError::from)
            .record_err(&mut scope)?;

        let page = self
            .backend
            .configure_from_template(&cx, container, &template, locales)
            .await
            .map_err(PrepareError::from)
            .record_err(&mut scope)?;

        let missing = page.missing_locales(locales);
        scope.record(attributes::ALL_LOCALES_RENDERED, missing.is_empty());
        scope.record(attributes::LOCALES_RENDERED, page.locales.as_slice());

        if !missing.is_empty() {
            if all_locales_required {
                return Err(PrepareError::MissingLocales {
                    source_name: source.name().to_string(),
                    missing,
                })
                .record_err(&mut scope);
            }

            warn!(
                trace_id = %scope.trace_id(),
                span_id = %scope.span_id(),
                ?locales,
                pages = ?page.locales,
                ?missing,
                "Failed to render {source} page template for some locales"
            );
            scope.record(attributes::LOCALES_MISSING, missing);
        }

        Ok(page)
    }
}
