//! Configuration for pagetrace

use std::path::Path;

use pagetrace_observe::{LoggingConfig, TracerConfig};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration, loaded from TOML
///
/// ```toml
/// [tracing]
/// service_name = "container_api"
/// exporters = [{ kind = "otlp", endpoint = "http://localhost:4317" }]
///
/// [logging]
/// level = "pagetrace_core=debug"
///
/// [workflow]
/// all_locales_required = false
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PagetraceConfig {
    pub tracing: TracerConfig,
    pub logging: LoggingConfig,
    pub workflow: WorkflowConfig,
}

impl PagetraceConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }
}

/// Defaults applied to preparation requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Locales requested when the caller does not name any
    pub default_locales: Vec<String>,
    /// Render pages without marking them ready for usage
    pub dry_run: bool,
    /// Fail when any requested locale does not render
    pub all_locales_required: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            default_locales: vec!["en".to_string()],
            dry_run: false,
            all_locales_required: true,
        }
    }
}

/// Parameters for one `prepare_container` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareRequest {
    pub locales: Vec<String>,
    pub dry_run: bool,
    pub all_locales_required: bool,
}

impl PrepareRequest {
    pub fn new(locales: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let defaults = WorkflowConfig::default();
        Self {
            locales: locales.into_iter().map(Into::into).collect(),
            dry_run: defaults.dry_run,
            all_locales_required: defaults.all_locales_required,
        }
    }

    /// Request built from configured defaults
    pub fn from_config(config: &WorkflowConfig) -> Self {
        Self {
            locales: config.default_locales.clone(),
            dry_run: config.dry_run,
            all_locales_required: config.all_locales_required,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn all_locales_required(mut self, required: bool) -> Self {
        self.all_locales_required = required;
        self
    }
}
