//! dc2chart Convert - OpenShift manifests to Helm charts
//!
//! This crate turns OpenShift `DeploymentConfig`, `Service`, `Route`,
//! `PersistentVolumeClaim`, `StatefulSet` and `CronJob` manifests into
//! installable Helm charts, one chart per application.
//!
//! # Pipeline
//!
//! | Stage        | Module          | Does                                              |
//! |--------------|-----------------|---------------------------------------------------|
//! | parse        | [`source`]      | split files into resource documents               |
//! | classify     | [`classifier`]  | resolve kind and application, dispatch            |
//! | rewrite      | [`rewriter`]    | migrate legacy fields per kind                    |
//! | extract      | [`extractor`]   | lift literals into values, insert placeholders    |
//! | sanitize     | [`sanitizer`]   | unquote placeholders in serialized text           |
//! | assemble     | [`bundle`]      | write `Chart.yaml`, `values.yaml`, `templates/`   |
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use dc2chart_convert::{ConvertConfig, convert};
//!
//! let config = ConvertConfig {
//!     registry_host: Some("registry.example.com:5000".to_string()),
//!     ..Default::default()
//! };
//!
//! let result = convert(Path::new("./openshift"), config).unwrap();
//! for bundle in &result.bundles {
//!     println!("{}: {} templates", bundle.name, bundle.templates);
//! }
//! for warning in &result.warnings {
//!     println!("{}", warning);
//! }
//! ```

pub mod bundle;
pub mod classifier;
pub mod converter;
pub mod error;
pub mod extractor;
pub mod parameters;
pub mod placeholder;
pub mod rewriter;
pub mod sanitizer;
pub mod source;
pub mod store;

// Re-exports
pub use bundle::{AssembledBundle, Bundle, BundleAssembler, BundleSet};
pub use classifier::{Classification, ClassifiedDocument, Classifier};
pub use converter::{BundleReport, ConversionResult, Converter, convert};
pub use dc2chart_core::ConvertConfig;
pub use error::{ConversionWarning, ConvertError, Diagnostics, Result, WarningCategory, WarningSeverity};
pub use extractor::ValueExtractor;
pub use parameters::TemplateParameters;
pub use rewriter::{RewriteContext, RewriteRule};
pub use sanitizer::sanitize;
pub use store::{FsSink, FsSource, ListFailure, Listing, MemoryStore, SinkStore, SourceStore};
