//! Error and warning types for the converter
//!
//! Hard errors are reserved for store I/O and invalid configuration.
//! Everything the converter can route around becomes a [`ConversionWarning`].

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use dc2chart_core::{CoreError, FieldPath};

/// Converter error
#[derive(Debug, Error, Diagnostic)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    #[diagnostic(code(dc2chart::convert::io))]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(code(dc2chart::convert::core))]
    Core(#[from] CoreError),

    #[error("YAML error: {0}")]
    #[diagnostic(code(dc2chart::convert::yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error("Store error at {}: {message}", .path.display())]
    #[diagnostic(code(dc2chart::convert::store))]
    Store { path: PathBuf, message: String },

    #[error("Input not found: {}", .0.display())]
    #[diagnostic(
        code(dc2chart::convert::input_not_found),
        help("pass a manifest file or a directory of .yaml/.yml files")
    )]
    InputNotFound(PathBuf),
}

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, ConvertError>;

// =============================================================================
// WARNING SYSTEM
// =============================================================================

/// Warning severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WarningSeverity {
    /// Informational - conversion succeeded with an adjustment
    Info,
    /// Warning - a field could not be migrated, manual review recommended
    Warning,
    /// Error - a document, file or bundle was skipped
    Error,
}

impl WarningSeverity {
    /// Get the label for this severity
    pub fn label(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// Get the icon for this severity
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Info => "ℹ",
            Self::Warning => "⚠",
            Self::Error => "✗",
        }
    }
}

/// Warning category for grouping related warnings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WarningCategory {
    /// An expected field was missing; the step was skipped
    Structure,
    /// Document without a usable kind or name
    UnknownKind,
    /// Source file could not be parsed
    Parse,
    /// Values model adjustments (qualified keys, pruned orphans)
    Values,
    /// Template parameter resolution
    Parameters,
    /// Bundle could not be written
    Output,
}

impl WarningCategory {
    /// Get the display label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Structure => "structure",
            Self::UnknownKind => "kind",
            Self::Parse => "parse",
            Self::Values => "values",
            Self::Parameters => "parameters",
            Self::Output => "output",
        }
    }
}

/// Rich warning with context
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionWarning {
    /// Warning severity
    pub severity: WarningSeverity,
    /// Warning category
    pub category: WarningCategory,
    /// Source file the warning relates to
    pub file: PathBuf,
    /// `Kind/name` of the resource, when known
    pub resource: Option<String>,
    /// Field the warning is about, when known
    pub field: Option<String>,
    /// Human-readable message
    pub message: String,
    /// Suggested fix
    pub suggestion: Option<String>,
}

impl ConversionWarning {
    fn new(severity: WarningSeverity, category: WarningCategory, message: impl Into<String>) -> Self {
        Self {
            severity,
            category,
            file: PathBuf::new(),
            resource: None,
            field: None,
            message: message.into(),
            suggestion: None,
        }
    }

    /// Create an info-level warning
    pub fn info(category: WarningCategory, message: impl Into<String>) -> Self {
        Self::new(WarningSeverity::Info, category, message)
    }

    /// Create a warning-level warning
    pub fn warning(category: WarningCategory, message: impl Into<String>) -> Self {
        Self::new(WarningSeverity::Warning, category, message)
    }

    /// Create an error-level warning
    pub fn error(category: WarningCategory, message: impl Into<String>) -> Self {
        Self::new(WarningSeverity::Error, category, message)
    }

    /// A field the rewriter expected was absent
    pub fn missing_field(resource: &str, field: &FieldPath, step: &str) -> Self {
        Self::warning(
            WarningCategory::Structure,
            format!("{} skipped: '{}' not found", step, field),
        )
        .for_resource(resource)
        .at_field(field)
    }

    /// Attach the source file
    pub fn in_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = file.into();
        self
    }

    /// Attach the resource identifier
    pub fn for_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Attach the field path
    pub fn at_field(mut self, field: &FieldPath) -> Self {
        self.field = Some(field.to_string());
        self
    }

    /// Add suggestion to warning
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Emit the warning as a tracing event
    pub(crate) fn trace(&self) {
        match self.severity {
            WarningSeverity::Info => tracing::debug!("{}", self),
            WarningSeverity::Warning | WarningSeverity::Error => tracing::warn!("{}", self),
        }
    }
}

impl std::fmt::Display for ConversionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Format: [severity] file (Kind/name) field - message
        write!(f, "[{}] ", self.severity.label())?;
        write!(f, "{}", self.file.display())?;

        if let Some(ref resource) = self.resource {
            write!(f, " ({})", resource)?;
        }

        if let Some(ref field) = self.field {
            write!(f, " {}", field)?;
        }

        write!(f, " - {}", self.message)?;

        if let Some(ref suggestion) = self.suggestion {
            write!(f, "\n  {} {}", self.severity.icon(), suggestion)?;
        }

        Ok(())
    }
}

/// Diagnostics collected while converting one resource or file
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    warnings: Vec<ConversionWarning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: ConversionWarning) {
        warning.trace();
        self.warnings.push(warning);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
    }

    /// Stamp every warning that has no file yet with `file`
    pub fn in_file(mut self, file: &std::path::Path) -> Self {
        for warning in &mut self.warnings {
            if warning.file.as_os_str().is_empty() {
                warning.file = file.to_path_buf();
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConversionWarning> {
        self.warnings.iter()
    }

    pub fn into_vec(self) -> Vec<ConversionWarning> {
        self.warnings
    }

    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        self.warnings.iter().any(|w| w.severity == WarningSeverity::Error)
    }
}

impl IntoIterator for Diagnostics {
    type Item = ConversionWarning;
    type IntoIter = std::vec::IntoIter<ConversionWarning>;

    fn into_iter(self) -> Self::IntoIter {
        self.warnings.into_iter()
    }
}
