//! CLI commands

pub mod convert;
pub mod inspect;

use std::path::Path;

use dc2chart_convert::ConvertConfig;

use crate::error::{CliError, Result};

/// Load the explicit config file, or the user config file when present,
/// or the defaults.
pub fn load_config(path: Option<&Path>) -> Result<ConvertConfig> {
    match path {
        Some(path) => ConvertConfig::load_from(path).map_err(|e| {
            CliError::config_with_help(
                format!("{}: {}", path.display(), e),
                "config files are YAML with camelCase keys, e.g. registryHost",
            )
        }),
        None => ConvertConfig::load().map_err(|e| CliError::config(e.to_string())),
    }
}
