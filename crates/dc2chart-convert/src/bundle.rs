//! Chart bundles
//!
//! A [`Bundle`] collects the rewritten documents and the values of one
//! application. [`BundleAssembler`] turns it into the files of a chart:
//!
//! ```text
//! <name>/
//! ├── Chart.yaml
//! ├── values.yaml
//! └── templates/
//!     └── <resource>_<kind>.yaml
//! ```

use indexmap::IndexMap;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use dc2chart_core::{ChartMetadata, ConvertConfig, ManifestDocument, ResourceKind, ValuesModel};

use crate::error::{ConversionWarning, Diagnostics, Result, WarningCategory};
use crate::extractor::Extraction;
use crate::parameters::TemplateParameters;
use crate::placeholder;
use crate::sanitizer;
use crate::store::SinkStore;

pub const CHART_FILE: &str = "Chart.yaml";
pub const VALUES_FILE: &str = "values.yaml";
pub const TEMPLATES_DIR: &str = "templates";

/// One template of a bundle
#[derive(Debug, Clone)]
pub struct TemplateEntry {
    /// File name below `templates/`
    pub file_name: String,
    /// `Kind/name` of the converted resource
    pub resource: String,
    pub document: ManifestDocument,
}

/// Everything gathered for one application
#[derive(Debug, Clone)]
pub struct Bundle {
    pub name: String,
    pub values: ValuesModel,
    pub templates: Vec<TemplateEntry>,
    /// Parameters declared by the templates the documents came from
    pub parameters: TemplateParameters,
    file_names: HashSet<String>,
}

impl Bundle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: ValuesModel::new(),
            templates: Vec::new(),
            parameters: TemplateParameters::new(),
            file_names: HashSet::new(),
        }
    }

    /// Add an extracted document as a template and merge its values
    pub fn add(&mut self, resource_name: &str, kind: &ResourceKind, extraction: Extraction) {
        let stem = format!("{}_{}", file_safe(resource_name), kind.target().file_suffix());
        let file_name = unique_file_name(&mut self.file_names, &stem);

        self.values.merge(&extraction.values);
        self.templates.push(TemplateEntry {
            file_name,
            resource: extraction.document.resource_id(),
            document: extraction.document,
        });
    }

    /// Directory and `Chart.yaml` name of the chart built from this bundle
    pub fn chart_name(&self) -> String {
        chart_name(&self.name)
    }

    /// Record parameters from another source template
    pub fn declare_parameters(&mut self, parameters: &TemplateParameters) {
        for param in parameters.iter() {
            self.parameters.declare(param.clone());
        }
    }
}

/// Bundles of one conversion run, in first-seen order
#[derive(Debug, Default)]
pub struct BundleSet {
    bundles: IndexMap<String, Bundle>,
}

impl BundleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&mut self, name: &str) -> &mut Bundle {
        self.bundles
            .entry(name.to_string())
            .or_insert_with(|| Bundle::new(name))
    }

    pub fn get(&self, name: &str) -> Option<&Bundle> {
        self.bundles.get(name)
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    pub fn into_bundles(self) -> Vec<Bundle> {
        self.bundles.into_values().collect()
    }
}

/// Replace characters that do not belong in a file name
pub fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// File-safe chart name for an application. Never contains a path
/// separator and never starts with a dot.
pub fn chart_name(application: &str) -> String {
    let safe = file_safe(application);
    let safe = safe.trim_start_matches('.');
    if safe.is_empty() {
        "chart".to_string()
    } else {
        safe.to_string()
    }
}

/// `<stem>.yaml`, or `<stem>-2.yaml`, `<stem>-3.yaml`... when taken
pub fn unique_file_name(taken: &mut HashSet<String>, stem: &str) -> String {
    let mut name = format!("{}.yaml", stem);
    let mut n = 2;
    while taken.contains(&name) {
        name = format!("{}-{}.yaml", stem, n);
        n += 1;
    }
    taken.insert(name.clone());
    name
}

// =============================================================================
// ASSEMBLY
// =============================================================================

/// Files of an assembled bundle, paths relative to the output root
#[derive(Debug, Clone)]
pub struct AssembledBundle {
    /// Chart name, also the chart directory
    pub name: String,
    pub files: Vec<(PathBuf, String)>,
    pub values: ValuesModel,
    pub diagnostics: Diagnostics,
}

impl AssembledBundle {
    pub fn file(&self, relative: impl AsRef<Path>) -> Option<&str> {
        self.files
            .iter()
            .find(|(path, _)| path == relative.as_ref())
            .map(|(_, content)| content.as_str())
    }
}

/// Serializes bundles into chart files
pub struct BundleAssembler<'a> {
    config: &'a ConvertConfig,
}

impl<'a> BundleAssembler<'a> {
    pub fn new(config: &'a ConvertConfig) -> Self {
        Self { config }
    }

    /// Serialize and sanitize every template, reconcile the values with the
    /// placeholders that survived, and build Chart.yaml.
    pub fn assemble(&self, bundle: Bundle) -> Result<AssembledBundle> {
        let Bundle {
            name,
            mut values,
            templates,
            parameters,
            ..
        } = bundle;
        let mut diagnostics = Diagnostics::new();

        let chart_name = chart_name(&name);
        if chart_name != name {
            diagnostics.push(
                ConversionWarning::warning(
                    WarningCategory::Output,
                    format!("application '{}' is not a valid chart name; written as '{}'", name, chart_name),
                )
                .with_suggestion("set an `app` label made of letters, digits and dashes"),
            );
        }

        let chart = ChartMetadata::new(
            chart_name.as_str(),
            self.config.description.as_str(),
            self.config.chart_version.as_str(),
            self.config.app_version.as_str(),
        )?;

        let root = PathBuf::from(&chart_name);
        let mut templates_out = Vec::with_capacity(templates.len());
        let mut referenced = BTreeSet::new();
        for template in &templates {
            // sanitization runs on the final text, after all structural edits
            let text = sanitizer::sanitize(&template.document.to_yaml()?);
            referenced.extend(placeholder::referenced_keys(&text));
            templates_out.push((root.join(TEMPLATES_DIR).join(&template.file_name), text));
        }

        reconcile(&name, &mut values, &referenced, &parameters, &mut diagnostics);

        let mut files = vec![
            (root.join(CHART_FILE), chart.to_yaml()?),
            (root.join(VALUES_FILE), values.to_yaml()?),
        ];
        files.extend(templates_out);

        tracing::debug!(
            bundle = %name,
            templates = templates.len(),
            values = values.leaf_keys().len(),
            "assembled bundle"
        );

        Ok(AssembledBundle {
            name: chart_name,
            files,
            values,
            diagnostics,
        })
    }

    /// Write an assembled bundle. Returns the written paths, joined to the
    /// sink root.
    pub fn write(&self, assembled: &AssembledBundle, sink: &mut dyn SinkStore) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(assembled.files.len());
        for (relative, content) in &assembled.files {
            sink.write(relative, content)?;
            written.push(sink.root().join(relative));
        }
        Ok(written)
    }
}

/// Make values and placeholders agree: drop values no template references
/// and fill referenced keys that have no value.
fn reconcile(
    name: &str,
    values: &mut ValuesModel,
    referenced: &BTreeSet<String>,
    parameters: &TemplateParameters,
    diagnostics: &mut Diagnostics,
) {
    let is_referenced = |key: &str| {
        referenced
            .iter()
            .any(|r| key == r || key.strip_prefix(r.as_str()).is_some_and(|rest| rest.starts_with('.')))
    };

    for key in values.leaf_keys() {
        if !is_referenced(&key) {
            values.remove(&key);
            diagnostics.push(ConversionWarning::info(
                WarningCategory::Values,
                format!("'{}' is not referenced by any template; removed", key),
            ));
        }
    }

    for key in referenced {
        if values.contains(key) {
            continue;
        }

        let filled = if key == placeholder::APP_NAME_KEY {
            name.to_string()
        } else if let Some(param) = key.strip_prefix("parameters.") {
            match parameters.default_value(param) {
                Some(value) => value,
                None => {
                    diagnostics.push(
                        ConversionWarning::warning(
                            WarningCategory::Parameters,
                            format!("parameter '{}' is referenced but not declared", param),
                        )
                        .with_suggestion(format!("set parameters.{} in values.yaml", param)),
                    );
                    String::new()
                }
            }
        } else {
            diagnostics.push(ConversionWarning::warning(
                WarningCategory::Values,
                format!("placeholder '{}' has no value; defaulting to empty", key),
            ));
            String::new()
        };

        if let Err(e) = values.set(key, filled) {
            diagnostics.push(ConversionWarning::warning(
                WarningCategory::Values,
                format!("cannot add '{}': {}", key, e),
            ));
        }
    }
}
