//! Error types for pagetrace-core

use std::path::PathBuf;

use pagetrace_observe::FailureKind;
use thiserror::Error;

/// Failures reported by a [`PageBackend`](crate::backend::PageBackend)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("failed to fetch {source_name} page template: {message}")]
    TemplateFetch {
        source_name: String,
        message: String,
    },

    #[error("failed to configure page from template {template_id}: {message}")]
    Configure {
        template_id: String,
        message: String,
    },

    #[error("failed to mark template(s) {} ready for usage: {message}", .template_ids.join(", "))]
    MarkReady {
        template_ids: Vec<String>,
        message: String,
    },
}

impl FailureKind for BackendError {
    fn kind(&self) -> &'static str {
        match self {
            Self::TemplateFetch { .. } => "template_fetch",
            Self::Configure { .. } => "configure",
            Self::MarkReady { .. } => "mark_ready",
        }
    }
}

/// Errors from preparing a container's pages
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrepareError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("failed to render {source_name} page template for some locales (missing: {})", .missing.join(", "))]
    MissingLocales {
        source_name: String,
        missing: Vec<String>,
    },
}

impl FailureKind for PrepareError {
    fn kind(&self) -> &'static str {
        match self {
            Self::Backend(e) => e.kind(),
            Self::MissingLocales { .. } => "missing_locales",
        }
    }
}

/// Errors loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_locales_message_lists_locales() {
        let err = PrepareError::MissingLocales {
            source_name: "home".into(),
            missing: vec!["fr".into(), "de".into()],
        };
        assert_eq!(
            err.to_string(),
            "failed to render home page template for some locales (missing: fr, de)"
        );
        assert_eq!(err.kind(), "missing_locales");
    }

    #[test]
    fn backend_errors_pass_through_transparently() {
        let backend = BackendError::TemplateFetch {
            source_name: "faq".into(),
            message: "timeout".into(),
        };
        let err = PrepareError::from(backend.clone());
        assert_eq!(err.to_string(), backend.to_string());
        assert_eq!(err.kind(), "template_fetch");
    }

    #[test]
    fn mark_ready_message_lists_ids() {
        let err = BackendError::MarkReady {
            template_ids: vec!["a".into(), "b".into()],
            message: "conflict".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to mark template(s) a, b ready for usage: conflict"
        );
        assert_eq!(err.kind(), "mark_ready");
    }
}
