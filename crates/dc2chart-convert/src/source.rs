//! Source file parsing
//!
//! A source file holds one or more YAML documents. A document may be a plain
//! resource, an OpenShift `Template` (resources under `objects`, parameters
//! under `parameters`) or a `List` (resources under `items`). Everything is
//! flattened into resource documents here.

use serde::Deserialize;
use serde_yaml::Value;
use std::path::{Path, PathBuf};

use dc2chart_core::ManifestDocument;

use crate::error::{ConversionWarning, Diagnostics, Result, WarningCategory};
use crate::parameters::TemplateParameters;

/// Raw content of one source file
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// File name without extension, used to label intermediate output
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("source")
            .to_string()
    }
}

/// Resource documents found in one file
#[derive(Debug, Default)]
pub struct ParsedSource {
    pub documents: Vec<ManifestDocument>,
    pub parameters: TemplateParameters,
    pub diagnostics: Diagnostics,
}

/// Split `content` into YAML documents, dropping empty ones.
///
/// Fails on the first malformed document; the caller treats the whole file
/// as unreadable.
pub fn parse_documents(content: &str) -> Result<Vec<Value>> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let value = Value::deserialize(document)?;
        if !value.is_null() {
            documents.push(value);
        }
    }
    Ok(documents)
}

/// Parse and flatten a source file
pub fn read_source(source: &SourceFile) -> Result<ParsedSource> {
    let mut parsed = ParsedSource::default();
    for value in parse_documents(&source.content)? {
        expand(value, &source.path, &mut parsed);
    }

    tracing::debug!(
        file = %source.path.display(),
        documents = parsed.documents.len(),
        parameters = parsed.parameters.len(),
        "parsed source file"
    );
    Ok(parsed)
}

fn expand(value: Value, file: &Path, parsed: &mut ParsedSource) {
    if !value.is_mapping() {
        parsed.diagnostics.push(
            ConversionWarning::warning(WarningCategory::UnknownKind, "document is not a mapping; skipped")
                .in_file(file),
        );
        return;
    }

    let nested = if value.get("objects").is_some_and(Value::is_sequence) {
        for param in TemplateParameters::from_template(&value).iter() {
            parsed.parameters.declare(param.clone());
        }
        Some("objects")
    } else if value.get("kind").and_then(Value::as_str) == Some("List") {
        Some("items")
    } else {
        None
    };

    match nested {
        Some(key) => {
            let Value::Mapping(mut map) = value else {
                return;
            };
            if let Some(Value::Sequence(items)) = map.remove(key) {
                for item in items.into_iter().filter(|item| !item.is_null()) {
                    expand(item, file, parsed);
                }
            }
        }
        None => parsed.documents.push(ManifestDocument::new(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(content: &str) -> SourceFile {
        SourceFile::new("input/app.yaml", content)
    }

    #[test]
    fn test_multi_document_file() {
        let parsed = read_source(&source(
            "kind: Service\nmetadata:\n  name: a\n---\nkind: Route\nmetadata:\n  name: b\n---\n",
        ))
        .unwrap();

        let kinds: Vec<_> = parsed.documents.iter().filter_map(|d| d.kind()).collect();
        assert_eq!(kinds, vec!["Service", "Route"]);
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn test_template_objects_and_parameters() {
        let parsed = read_source(&source(
            r#"
apiVersion: template.openshift.io/v1
kind: Template
metadata:
  name: shop-template
parameters:
  - name: APP_NAME
    value: shop
objects:
  - kind: Service
    metadata:
      name: ${APP_NAME}
  - kind: List
    items:
      - kind: Route
        metadata:
          name: ${APP_NAME}
"#,
        ))
        .unwrap();

        assert_eq!(parsed.documents.len(), 2);
        assert_eq!(parsed.documents[1].kind(), Some("Route"));
        assert_eq!(parsed.parameters.default_value("APP_NAME").as_deref(), Some("shop"));
    }

    #[test]
    fn test_scalar_document_is_reported() {
        let parsed = read_source(&source("just text\n---\nkind: Service\nmetadata:\n  name: a\n")).unwrap();
        assert_eq!(parsed.documents.len(), 1);
        assert_eq!(parsed.diagnostics.len(), 1);
    }

    #[test]
    fn test_malformed_yaml_fails() {
        assert!(read_source(&source("kind: [unclosed\n")).is_err());
    }

    #[test]
    fn test_stem() {
        assert_eq!(source("").stem(), "app");
    }
}
