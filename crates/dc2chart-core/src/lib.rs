//! dc2chart Core - Core types for converting OpenShift manifests into Helm charts
//!
//! This crate provides the foundational types used throughout dc2chart:
//! - `ManifestDocument`: one resource as an ordered YAML tree
//! - `FieldPath`: dot/index addressing inside a document
//! - `ResourceKind`: the kinds with dedicated conversion rules
//! - `ImageReference`: container image split into overridable components
//! - `ValuesModel`: the chart's values with dotted-key access
//! - `ChartMetadata`: Chart.yaml
//! - `ConvertConfig`: registry host, output locations, chart versions

pub mod chart;
pub mod config;
pub mod document;
pub mod error;
pub mod image;
pub mod kind;
pub mod path;
pub mod values;

pub use chart::ChartMetadata;
pub use config::ConvertConfig;
pub use document::{ManifestDocument, scalar_to_string};
pub use error::{CoreError, Result};
pub use image::ImageReference;
pub use kind::ResourceKind;
pub use path::{FieldPath, Segment};
pub use values::ValuesModel;
