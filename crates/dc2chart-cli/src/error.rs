//! CLI error types with exit code handling
//!
//! Every command returns [`CliError`] so `main` can pick the process exit
//! code from the failure instead of always exiting with 1.

use miette::Diagnostic;
use thiserror::Error;

use dc2chart_convert::ConvertError;
use dc2chart_core::CoreError;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    #[diagnostic(code(dc2chart::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (input not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(dc2chart::cli::io))]
    Io {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// The run finished but some files or bundles were skipped
    #[error("Conversion completed with {errors} error(s)")]
    #[diagnostic(
        code(dc2chart::cli::incomplete),
        help("the charts listed above were written; fix the reported errors and run again")
    )]
    CompletedWithErrors { errors: usize },

    /// Anything else
    #[error("{message}")]
    #[diagnostic(code(dc2chart::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::CompletedWithErrors { .. } => exit_codes::COMPLETED_WITH_ERRORS,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidVersion(_) => {
                CliError::config_with_help(err.to_string(), "chart versions must be SemVer, e.g. 0.1.0")
            }
            CoreError::InvalidConfig { .. } | CoreError::YamlParse(_) => CliError::config(err.to_string()),
            CoreError::Io(e) => CliError::Io {
                message: e.to_string(),
                help: None,
            },
            other => CliError::Other {
                message: other.to_string(),
            },
        }
    }
}

impl From<ConvertError> for CliError {
    fn from(err: ConvertError) -> Self {
        match err {
            ConvertError::Core(core) => core.into(),
            ConvertError::InputNotFound(_) => CliError::Io {
                message: err.to_string(),
                help: Some("pass a manifest file or a directory of .yaml/.yml files".to_string()),
            },
            ConvertError::Io(_) | ConvertError::Store { .. } => CliError::Io {
                message: err.to_string(),
                help: None,
            },
            other => CliError::Other {
                message: other.to_string(),
            },
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
