//! Document classification and dispatch
//!
//! Reads each resource document of a source file, resolves the application
//! it belongs to, runs the rewrite rule registered for its kind, extracts
//! its values and files the result into the application's bundle.
//!
//! A failure on one document never stops the others.

use dc2chart_core::{ConvertConfig, ManifestDocument, ResourceKind};

use crate::bundle::{BundleSet, file_safe};
use crate::error::{ConversionWarning, Diagnostics, Result, WarningCategory};
use crate::extractor::ValueExtractor;
use crate::parameters::{TemplateParameters, has_reference};
use crate::rewriter::{RewriteContext, RewriteRule};
use crate::source::{SourceFile, read_source};

/// A document with its kind and application resolved
#[derive(Debug, Clone)]
pub struct ClassifiedDocument {
    pub kind: ResourceKind,
    pub rule: RewriteRule,
    /// `metadata.name` with template parameters resolved
    pub name: String,
    pub application: String,
    pub document: ManifestDocument,
}

/// Classification of one source file
#[derive(Debug, Default)]
pub struct Classification {
    pub documents: Vec<ClassifiedDocument>,
    pub parameters: TemplateParameters,
    pub diagnostics: Diagnostics,
}

/// What processing one source file produced
#[derive(Debug, Default)]
pub struct FileReport {
    /// Documents filed into a bundle
    pub converted: usize,
    /// Documents skipped
    pub skipped: usize,
    /// Raw documents keyed by a `<name>_<kind>` file stem, for the working store
    pub intermediates: Vec<(String, String)>,
    pub diagnostics: Diagnostics,
}

pub struct Classifier<'a> {
    config: &'a ConvertConfig,
}

impl<'a> Classifier<'a> {
    pub fn new(config: &'a ConvertConfig) -> Self {
        Self { config }
    }

    /// Parse a source file and classify its documents.
    ///
    /// Fails only when the file is not valid YAML. Documents without a kind
    /// are left out with a diagnostic.
    pub fn classify(&self, source: &SourceFile) -> Result<Classification> {
        let parsed = read_source(source)?;
        let mut classification = Classification {
            documents: Vec::with_capacity(parsed.documents.len()),
            parameters: parsed.parameters,
            diagnostics: parsed.diagnostics,
        };

        for document in parsed.documents {
            let Some(kind) = document.resource_kind() else {
                classification.diagnostics.push(
                    ConversionWarning::warning(WarningCategory::UnknownKind, "document has no kind; skipped")
                        .for_resource(document.resource_id()),
                );
                continue;
            };

            let name = classification
                .parameters
                .resolve(document.name().unwrap_or_default());
            let application = application_name(&document, &classification.parameters);

            classification.documents.push(ClassifiedDocument {
                rule: RewriteRule::for_kind(&kind),
                kind,
                name,
                application,
                document,
            });
        }

        classification.diagnostics = classification.diagnostics.in_file(&source.path);
        Ok(classification)
    }

    /// Classify, rewrite and extract every document of `source` into `bundles`
    pub fn process(&self, source: &SourceFile, bundles: &mut BundleSet) -> Result<FileReport> {
        let classification = self.classify(source)?;
        let mut report = FileReport {
            diagnostics: classification.diagnostics,
            ..Default::default()
        };
        let parameters = &classification.parameters;

        for classified in classification.documents {
            let ctx = RewriteContext {
                application: &classified.application,
                registry: self.config.registry(),
                include_source_namespace: self.config.include_source_namespace,
                parameters,
            };

            let rewritten = match classified.rule.apply(&classified.document, &ctx) {
                Ok(rewritten) => rewritten,
                Err(e) => {
                    report.skipped += 1;
                    report.diagnostics.push(
                        ConversionWarning::warning(WarningCategory::UnknownKind, format!("{}; skipped", e))
                            .in_file(&source.path)
                            .for_resource(classified.document.resource_id()),
                    );
                    continue;
                }
            };

            report.intermediates.push((
                file_safe(&format!("{}_{}", classified.name, classified.kind.file_suffix())),
                classified.document.to_yaml()?,
            ));

            let bundle = bundles.entry(&classified.application);
            bundle.declare_parameters(parameters);

            let extraction = ValueExtractor::new(&classified.application, parameters).extract(
                &rewritten.document,
                &classified.kind,
                &bundle.values,
            );

            let mut diagnostics = rewritten.diagnostics;
            diagnostics.extend(extraction.diagnostics.clone());
            bundle.add(&classified.name, &classified.kind, extraction);
            report.diagnostics.extend(diagnostics.in_file(&source.path));
            report.converted += 1;
        }

        tracing::info!(
            file = %source.path.display(),
            converted = report.converted,
            skipped = report.skipped,
            "processed source file"
        );
        Ok(report)
    }
}

/// Application a document belongs to: its `app` label, or its name.
///
/// Template parameters are resolved first; a label that still holds an
/// unresolved reference falls back to the name.
pub fn application_name(document: &ManifestDocument, parameters: &TemplateParameters) -> String {
    let name = parameters.resolve(document.name().unwrap_or_default());
    match document.label("app").map(|app| parameters.resolve(&app)) {
        Some(app) if !app.is_empty() && !has_reference(&app) => app,
        _ => name,
    }
}
