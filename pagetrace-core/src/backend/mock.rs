//! Mock backend for testing
//!
//! MockBackend lets tests script which collaborator calls fail and which
//! locales fail to render, and records every call it receives.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use pagetrace_observe::OperationContext;

use super::traits::PageBackend;
use crate::error::BackendError;
use crate::model::{ContainerContext, FilledTemplate, PageSource, RenderedPage};

/// A call received by [`MockBackend`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    FetchAndFill {
        source: PageSource,
        locales: Vec<String>,
    },
    Configure {
        template_id: String,
    },
    MarkReady {
        template_ids: Vec<String>,
    },
}

/// Scripted implementation of PageBackend
///
/// Template ids are `"<container id>-<source>"` so tests can predict them.
#[derive(Debug, Default)]
pub struct MockBackend {
    fetch_failures: HashMap<PageSource, String>,
    configure_failures: HashMap<PageSource, String>,
    mark_ready_failure: Option<String>,
    unrenderable: HashSet<String>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make fetching the template for `source` fail
    pub fn fail_fetch(mut self, source: PageSource, message: impl Into<String>) -> Self {
        self.fetch_failures.insert(source, message.into());
        self
    }

    /// Make configuring the page for `source` fail
    pub fn fail_configure(mut self, source: PageSource, message: impl Into<String>) -> Self {
        self.configure_failures.insert(source, message.into());
        self
    }

    /// Make marking templates ready fail
    pub fn fail_mark_ready(mut self, message: impl Into<String>) -> Self {
        self.mark_ready_failure = Some(message.into());
        self
    }

    /// Drop `locale` from every rendered page
    pub fn without_locale(mut self, locale: impl Into<String>) -> Self {
        self.unrenderable.insert(locale.into());
        self
    }

    /// Template id the mock assigns to `source` for `container`
    pub fn template_id(container: &ContainerContext, source: PageSource) -> String {
        format!("{}-{}", container.id, source.name())
    }

    /// All calls received so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock_calls().clone()
    }

    /// Whether `mark_ready_for_usage` was ever invoked
    pub fn marked_ready(&self) -> bool {
        self.lock_calls()
            .iter()
            .any(|call| matches!(call, MockCall::MarkReady { .. }))
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<MockCall>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, call: MockCall) {
        self.lock_calls().push(call);
    }
}

#[async_trait]
impl PageBackend for MockBackend {
    async fn fetch_and_fill_template(
        &self,
        _cx: &OperationContext,
        source: PageSource,
        container: &ContainerContext,
        locales: &[String],
    ) -> Result<FilledTemplate, BackendError> {
        self.push(MockCall::FetchAndFill {
            source,
            locales: locales.to_vec(),
        });

        if let Some(message) = self.fetch_failures.get(&source) {
            return Err(BackendError::TemplateFetch {
                source_name: source.name().to_string(),
                message: message.clone(),
            });
        }

        Ok(FilledTemplate {
            id: Self::template_id(container, source),
            source,
            locales: locales.to_vec(),
        })
    }

    async fn configure_from_template(
        &self,
        _cx: &OperationContext,
        _container: &ContainerContext,
        template: &FilledTemplate,
        locales: &[String],
    ) -> Result<RenderedPage, BackendError> {
        self.push(MockCall::Configure {
            template_id: template.id.clone(),
        });

        if let Some(message) = self.configure_failures.get(&template.source) {
            return Err(BackendError::Configure {
                template_id: template.id.clone(),
                message: message.clone(),
            });
        }

        Ok(RenderedPage {
            id: template.id.clone(),
            locales: locales
                .iter()
                .filter(|locale| !self.unrenderable.contains(*locale))
                .cloned()
                .collect(),
        })
    }

    async fn mark_ready_for_usage(
        &self,
        _cx: &OperationContext,
        _container: &ContainerContext,
        template_ids: &[String],
    ) -> Result<(), BackendError> {
        self.push(MockCall::MarkReady {
            template_ids: template_ids.to_vec(),
        });

        match &self.mark_ready_failure {
            Some(message) => Err(BackendError::MarkReady {
                template_ids: template_ids.to_vec(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PageSlugs;

    fn container() -> ContainerContext {
        ContainerContext::new(
            "c-1",
            PageSlugs {
                home: "home".into(),
                faq: Some("faq".into()),
            },
        )
    }

    fn locales() -> Vec<String> {
        vec!["en".into(), "fr".into()]
    }

    #[tokio::test]
    async fn renders_all_locales_by_default() {
        let backend = MockBackend::new();
        let cx = OperationContext::new();

        let template = backend
            .fetch_and_fill_template(&cx, PageSource::Home, &container(), &locales())
            .await
            .unwrap();
        assert_eq!(template.id, "c-1-home");

        let page = backend
            .configure_from_template(&cx, &container(), &template, &locales())
            .await
            .unwrap();
        assert_eq!(page.locales, locales());
    }

    #[tokio::test]
    async fn drops_unrenderable_locales() {
        let backend = MockBackend::new().without_locale("fr");
        let cx = OperationContext::new();
        let template = backend
            .fetch_and_fill_template(&cx, PageSource::Faq, &container(), &locales())
            .await
            .unwrap();

        let page = backend
            .configure_from_template(&cx, &container(), &template, &locales())
            .await
            .unwrap();
        assert_eq!(page.locales, vec!["en".to_string()]);
    }

    #[tokio::test]
    async fn scripted_failures_and_call_log() {
        let backend = MockBackend::new()
            .fail_fetch(PageSource::Faq, "not found")
            .fail_mark_ready("conflict");
        let cx = OperationContext::new();

        let err = backend
            .fetch_and_fill_template(&cx, PageSource::Faq, &container(), &locales())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::TemplateFetch { .. }));

        let ids = vec!["c-1-home".to_string()];
        assert!(backend.mark_ready_for_usage(&cx, &container(), &ids).await.is_err());

        assert!(backend.marked_ready());
        assert_eq!(backend.calls().len(), 2);
    }
}
