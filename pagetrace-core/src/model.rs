//! Container and page data model.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Page slugs configured for a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSlugs {
    pub home: String,
    /// FAQ slug; `None` or empty means the container has no FAQ page.
    #[serde(default)]
    pub faq: Option<String>,
}

/// The container whose pages are being prepared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerContext {
    pub id: String,
    pub page_slugs: PageSlugs,
}

impl ContainerContext {
    pub fn new(id: impl Into<String>, page_slugs: PageSlugs) -> Self {
        Self {
            id: id.into(),
            page_slugs,
        }
    }

    pub fn has_faq(&self) -> bool {
        self.page_slugs.faq.as_deref().is_some_and(|slug| !slug.is_empty())
    }
}

/// Which page template to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSource {
    Home,
    Faq,
}

impl PageSource {
    pub fn name(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Faq => "faq",
        }
    }
}

impl fmt::Display for PageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A template fetched and filled for a set of locales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilledTemplate {
    pub id: String,
    pub source: PageSource,
    pub locales: Vec<String>,
}

/// A page configured from a filled template.
///
/// `locales` lists the locales that actually rendered, which may be fewer
/// than were requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedPage {
    pub id: String,
    pub locales: Vec<String>,
}

impl RenderedPage {
    /// Requested locales that did not render, in request order.
    pub fn missing_locales(&self, requested: &[String]) -> Vec<String> {
        requested
            .iter()
            .filter(|locale| !self.locales.contains(locale))
            .cloned()
            .collect()
    }
}

/// Outcome of a successful preparation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrepareStatus {
    /// Pages rendered but nothing was marked for usage.
    DryRun,
    /// Pages rendered and marked ready for usage.
    Complete,
}

impl PrepareStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DryRun => "dry_run",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for PrepareStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResult {
    pub status: PrepareStatus,
    pub template_ids: Vec<String>,
}
