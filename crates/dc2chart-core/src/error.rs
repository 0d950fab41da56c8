//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid field path '{path}': {message}")]
    InvalidPath { path: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid chart version: {0}")]
    InvalidVersion(#[from] semver::Error),

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Values error: {message}")]
    Values { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
