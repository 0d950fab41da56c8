//! Main converter logic
//!
//! Orchestrates a conversion run: read every source file, classify and
//! rewrite its documents into per-application bundles, and write each of
//! those bundles as a chart before the next file is read.
//!
//! Failures are contained at the smallest unit that can fail: a document,
//! a file or a bundle. Each one becomes a warning and the run continues.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use dc2chart_core::ConvertConfig;

use crate::bundle::{BundleAssembler, BundleSet, unique_file_name};
use crate::classifier::Classifier;
use crate::error::{ConversionWarning, Result, WarningCategory, WarningSeverity};
use crate::store::{FsSink, FsSource, MemoryStore, SinkStore, SourceStore};

/// One chart produced by a run
#[derive(Debug, Clone)]
pub struct BundleReport {
    pub name: String,
    /// Written (or, on a dry run, would-be) file paths
    pub files: Vec<PathBuf>,
    pub templates: usize,
}

/// Result of a conversion
#[derive(Debug, Default)]
pub struct ConversionResult {
    /// Charts that were assembled
    pub bundles: Vec<BundleReport>,
    /// Source files that were read and classified
    pub processed_files: Vec<PathBuf>,
    /// Source files that could not be read or parsed
    pub skipped_files: Vec<PathBuf>,
    /// Intermediate documents written to the working store
    pub intermediate_files: Vec<PathBuf>,
    /// Warnings generated during conversion
    pub warnings: Vec<ConversionWarning>,
}

impl ConversionResult {
    /// Check if any warning is an error
    pub fn has_errors(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| w.severity == WarningSeverity::Error)
    }

    /// Count warnings of a given severity
    pub fn count(&self, severity: WarningSeverity) -> usize {
        self.warnings.iter().filter(|w| w.severity == severity).count()
    }

    fn record(&mut self, warning: ConversionWarning) {
        warning.trace();
        self.warnings.push(warning);
    }
}

/// Convert OpenShift manifests into Helm charts
pub struct Converter {
    config: ConvertConfig,
}

impl Converter {
    pub fn new(config: ConvertConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// Convert a file or directory of manifests using filesystem stores.
    ///
    /// On a dry run, bundles are assembled into memory and nothing is
    /// written, not even to the working store.
    pub fn convert(&self, input: &Path) -> Result<ConversionResult> {
        self.config.validate()?;
        let source = FsSource::new(input)?;

        if self.config.dry_run {
            let mut sink = MemoryStore::new(&self.config.output_root);
            return self.convert_with(&source, &mut sink, None);
        }

        let mut sink = FsSink::new(&self.config.output_root);
        match &self.config.working_root {
            Some(root) => {
                let mut working = FsSink::new(root);
                self.convert_with(&source, &mut sink, Some(&mut working))
            }
            None => self.convert_with(&source, &mut sink, None),
        }
    }

    /// Convert with explicit stores
    pub fn convert_with(
        &self,
        source: &dyn SourceStore,
        sink: &mut dyn SinkStore,
        mut working: Option<&mut dyn SinkStore>,
    ) -> Result<ConversionResult> {
        let mut result = ConversionResult::default();
        let classifier = Classifier::new(&self.config);
        let assembler = BundleAssembler::new(&self.config);
        let mut intermediate_names = HashSet::new();

        for path in list_sources(source, &mut result)? {
            let file = match source.read(&path) {
                Ok(file) => file,
                Err(e) => {
                    result.record(
                        ConversionWarning::error(WarningCategory::Parse, format!("Failed to read file: {}", e))
                            .in_file(&path),
                    );
                    result.skipped_files.push(path);
                    continue;
                }
            };

            // bundles never outlive the file they were built from
            let mut bundles = BundleSet::new();
            let report = match classifier.process(&file, &mut bundles) {
                Ok(report) => report,
                Err(e) => {
                    result.record(
                        ConversionWarning::error(WarningCategory::Parse, format!("Failed to parse: {}", e))
                            .in_file(&path)
                            .with_suggestion("Fix the YAML syntax; the other files were still converted"),
                    );
                    result.skipped_files.push(path);
                    continue;
                }
            };

            if let Some(working) = working.as_deref_mut() {
                for (stem, content) in &report.intermediates {
                    let relative = PathBuf::from(unique_file_name(&mut intermediate_names, stem));
                    match working.write(&relative, content) {
                        Ok(()) => result.intermediate_files.push(working.root().join(&relative)),
                        Err(e) => result.record(
                            ConversionWarning::warning(WarningCategory::Output, e.to_string()).in_file(&path),
                        ),
                    }
                }
            }

            result.warnings.extend(report.diagnostics);
            self.write_bundles(&assembler, bundles, &path, sink, &mut result);
            result.processed_files.push(path);
        }

        Ok(result)
    }

    /// Assemble and write the bundles built from one source file
    fn write_bundles(
        &self,
        assembler: &BundleAssembler<'_>,
        bundles: BundleSet,
        file: &Path,
        sink: &mut dyn SinkStore,
        result: &mut ConversionResult,
    ) {
        for bundle in bundles.into_bundles() {
            let name = bundle.chart_name();
            let dir = PathBuf::from(&name);

            if sink.exists(&dir) && !self.config.force {
                result.record(
                    ConversionWarning::error(
                        WarningCategory::Output,
                        format!("output directory already exists: {}", sink.root().join(&dir).display()),
                    )
                    .in_file(file)
                    .for_resource(format!("chart/{}", name))
                    .with_suggestion("use --force to overwrite"),
                );
                continue;
            }

            let templates = bundle.templates.len();
            let outcome = assembler
                .assemble(bundle)
                .and_then(|assembled| {
                    let files = assembler.write(&assembled, sink)?;
                    Ok((assembled, files))
                });

            match outcome {
                Ok((assembled, files)) => {
                    result.warnings.extend(
                        assembled
                            .diagnostics
                            .in_file(file)
                            .into_iter()
                            .map(|w| w.for_resource(format!("chart/{}", name))),
                    );
                    tracing::info!(bundle = %name, files = files.len(), "wrote chart");
                    result.bundles.push(BundleReport {
                        name,
                        files,
                        templates,
                    });
                }
                Err(e) => {
                    result.record(
                        ConversionWarning::error(WarningCategory::Output, format!("Failed to write chart: {}", e))
                            .in_file(file)
                            .for_resource(format!("chart/{}", name)),
                    );
                }
            }
        }
    }
}

/// List source files. Entries the store could not list are recorded as
/// skipped files with an error.
fn list_sources(source: &dyn SourceStore, result: &mut ConversionResult) -> Result<Vec<PathBuf>> {
    let listing = source.list()?;
    for failure in listing.failures {
        result.record(
            ConversionWarning::error(WarningCategory::Parse, format!("Failed to list: {}", failure.message))
                .in_file(&failure.path),
        );
        result.skipped_files.push(failure.path);
    }
    Ok(listing.files)
}

/// Convert with the given configuration
pub fn convert(input: &Path, config: ConvertConfig) -> Result<ConversionResult> {
    Converter::new(config).convert(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceFile;
    use crate::store::{ListFailure, Listing};

    const SHOP: &str = r#"
kind: DeploymentConfig
metadata:
  name: frontend
  labels:
    app: shop
spec:
  replicas: 2
  selector:
    app: shop
  strategy:
    type: Rolling
  template:
    metadata:
      labels:
        app: shop
    spec:
      containers:
        - name: web
          image: ' '
  triggers:
    - type: ImageChange
      imageChangeParams:
        from:
          name: frontend:latest
---
kind: Service
metadata:
  name: frontend
  labels:
    app: shop
spec:
  selector:
    app: shop
"#;

    fn source(files: &[(&str, &str)]) -> MemoryStore {
        let mut store = MemoryStore::new("input");
        for (path, content) in files {
            store.insert(*path, *content);
        }
        store
    }

    #[test]
    fn test_convert_with_memory_stores() {
        let source = source(&[("shop.yaml", SHOP)]);
        let mut sink = MemoryStore::new("charts");
        let mut working = MemoryStore::new("work");

        let converter = Converter::new(ConvertConfig::default());
        let result = converter
            .convert_with(&source, &mut sink, Some(&mut working))
            .unwrap();

        assert_eq!(result.bundles.len(), 1);
        assert_eq!(result.bundles[0].templates, 2);
        assert!(!result.has_errors());
        assert!(sink.get("shop/Chart.yaml").is_some());
        assert!(sink.get("shop/values.yaml").is_some());
        assert!(sink.get("shop/templates/frontend_deployment.yaml").is_some());
        assert!(sink.get("shop/templates/frontend_service.yaml").is_some());

        assert!(working.get("frontend_deploymentconfig.yaml").is_some());
        assert!(working.get("frontend_service.yaml").is_some());
        assert_eq!(result.intermediate_files.len(), 2);
    }

    #[test]
    fn test_bad_file_does_not_stop_run() {
        let source = source(&[("broken.yaml", "kind: [unclosed\n"), ("shop.yaml", SHOP)]);
        let mut sink = MemoryStore::new("charts");

        let result = Converter::new(ConvertConfig::default())
            .convert_with(&source, &mut sink, None)
            .unwrap();

        assert_eq!(result.skipped_files, vec![PathBuf::from("broken.yaml")]);
        assert_eq!(result.processed_files, vec![PathBuf::from("shop.yaml")]);
        assert_eq!(result.bundles.len(), 1);
        assert!(result.has_errors());
    }

    #[test]
    fn test_existing_output_needs_force() {
        let source = source(&[("shop.yaml", SHOP)]);
        let mut sink = MemoryStore::new("charts");
        sink.insert("shop/Chart.yaml", "stale\n");

        let result = Converter::new(ConvertConfig::default())
            .convert_with(&source, &mut sink, None)
            .unwrap();
        assert!(result.bundles.is_empty());
        assert_eq!(result.count(WarningSeverity::Error), 1);
        assert_eq!(sink.get("shop/Chart.yaml"), Some("stale\n"));

        let config = ConvertConfig {
            force: true,
            ..Default::default()
        };
        let result = Converter::new(config)
            .convert_with(&source, &mut sink, None)
            .unwrap();
        assert_eq!(result.bundles.len(), 1);
        assert_ne!(sink.get("shop/Chart.yaml"), Some("stale\n"));
    }

    #[test]
    fn test_bundles_do_not_span_files() {
        let source = source(&[("a.yaml", SHOP), ("b.yaml", SHOP)]);
        let mut sink = MemoryStore::new("charts");
        let mut working = MemoryStore::new("work");

        let result = Converter::new(ConvertConfig::default())
            .convert_with(&source, &mut sink, Some(&mut working))
            .unwrap();

        assert!(working.get("frontend_service.yaml").is_some());
        assert!(working.get("frontend_service-2.yaml").is_some());

        // b.yaml builds its own shop chart, which meets a.yaml's output
        assert_eq!(result.bundles.len(), 1);
        assert_eq!(result.bundles[0].templates, 2);
        assert!(sink.get("shop/templates/frontend_deployment-2.yaml").is_none());
        let conflict = result
            .warnings
            .iter()
            .find(|w| w.severity == WarningSeverity::Error)
            .unwrap();
        assert_eq!(conflict.category, WarningCategory::Output);
        assert_eq!(conflict.file, PathBuf::from("b.yaml"));

        let config = ConvertConfig {
            force: true,
            ..Default::default()
        };
        let mut sink = MemoryStore::new("charts");
        let result = Converter::new(config)
            .convert_with(&source, &mut sink, None)
            .unwrap();
        assert_eq!(result.bundles.len(), 2);
        assert!(result.bundles.iter().all(|b| b.templates == 2));
        assert!(!result.has_errors());
    }

    #[test]
    fn test_chart_directory_stays_below_root() {
        let source = source(&[(
            "escape.yaml",
            "kind: Service\nmetadata:\n  name: web\n  labels:\n    app: ../escaped\n",
        )]);
        let mut sink = MemoryStore::new("charts");

        let result = Converter::new(ConvertConfig::default())
            .convert_with(&source, &mut sink, None)
            .unwrap();

        assert_eq!(result.bundles[0].name, "_escaped");
        assert!(sink.get("_escaped/Chart.yaml").is_some());
        assert!(sink.files().all(|(path, _)| !path.starts_with("..")));
        assert!(
            result
                .warnings
                .iter()
                .any(|w| w.category == WarningCategory::Output && w.message.contains("../escaped"))
        );
    }

    /// Source whose listing partly fails
    struct PartialSource(MemoryStore);

    impl SourceStore for PartialSource {
        fn list(&self) -> Result<Listing> {
            let mut listing = self.0.list()?;
            listing.failures.push(ListFailure {
                path: PathBuf::from("locked"),
                message: "Permission denied".to_string(),
            });
            Ok(listing)
        }

        fn read(&self, path: &Path) -> Result<SourceFile> {
            self.0.read(path)
        }
    }

    #[test]
    fn test_listing_failures_are_reported() {
        let source = PartialSource(source(&[("shop.yaml", SHOP)]));
        let mut sink = MemoryStore::new("charts");

        let result = Converter::new(ConvertConfig::default())
            .convert_with(&source, &mut sink, None)
            .unwrap();

        assert_eq!(result.bundles.len(), 1);
        assert_eq!(result.skipped_files, vec![PathBuf::from("locked")]);
        assert_eq!(result.count(WarningSeverity::Error), 1);
    }
}
