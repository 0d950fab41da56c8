//! Conversion configuration
//!
//! Replaces module-level globals (registry host, output folders) with one
//! object handed to the classifier. Loaded from
//! `~/.config/dc2chart/config.yaml` when present; CLI flags override it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

pub const DEFAULT_CHART_VERSION: &str = "0.1.0";
pub const DEFAULT_APP_VERSION: &str = "1.0.0";
pub const DEFAULT_DESCRIPTION: &str = "A Helm chart for Kubernetes";

/// Options recognised by the converter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConvertConfig {
    /// Registry host prefixed to image references derived from triggers
    pub registry_host: Option<String>,

    /// Insert the trigger's source namespace between registry and image
    pub include_source_namespace: bool,

    /// Base path for bundle assembly
    pub output_root: PathBuf,

    /// Scratch path for intermediate per-resource documents
    pub working_root: Option<PathBuf>,

    /// Chart `version`
    pub chart_version: String,

    /// Chart `appVersion`
    pub app_version: String,

    /// Chart `description`
    pub description: String,

    /// Overwrite existing bundle directories
    pub force: bool,

    /// Assemble bundles without writing them
    pub dry_run: bool,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            registry_host: None,
            include_source_namespace: true,
            output_root: PathBuf::from("charts"),
            working_root: None,
            chart_version: DEFAULT_CHART_VERSION.to_string(),
            app_version: DEFAULT_APP_VERSION.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            force: false,
            dry_run: false,
        }
    }
}

impl ConvertConfig {
    /// Load configuration from the default location, or defaults
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Default configuration path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("dc2chart").join("config.yaml"))
    }

    /// Check values that would otherwise fail late, per bundle
    pub fn validate(&self) -> Result<()> {
        semver::Version::parse(&self.chart_version)?;
        if self.app_version.trim().is_empty() {
            return Err(CoreError::InvalidConfig {
                message: "appVersion must not be empty".to_string(),
            });
        }
        if self.output_root.as_os_str().is_empty() {
            return Err(CoreError::InvalidConfig {
                message: "outputRoot must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Registry host with surrounding whitespace and trailing slashes removed
    pub fn registry(&self) -> Option<&str> {
        self.registry_host
            .as_deref()
            .map(|r| r.trim().trim_end_matches('/'))
            .filter(|r| !r.is_empty())
    }
}
