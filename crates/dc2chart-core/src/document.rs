//! Manifest documents
//!
//! A [`ManifestDocument`] is one Kubernetes-style resource held as an ordered
//! YAML tree. Field access goes through [`FieldPath`] so callers never have
//! to match on the full tree shape.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

use crate::error::{CoreError, Result};
use crate::kind::ResourceKind;
use crate::path::FieldPath;

/// One resource document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestDocument(Value);

impl ManifestDocument {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Parse a single YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(Self(serde_yaml::from_str(yaml)?))
    }

    /// Serialize back to YAML text
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.0)?)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// The `kind` discriminant, if present and non-empty
    pub fn kind(&self) -> Option<&str> {
        self.0
            .get("kind")
            .and_then(Value::as_str)
            .filter(|k| !k.is_empty())
    }

    pub fn resource_kind(&self) -> Option<ResourceKind> {
        self.kind().map(ResourceKind::from_kind)
    }

    pub fn api_version(&self) -> Option<&str> {
        self.0.get("apiVersion").and_then(Value::as_str)
    }

    /// `metadata.name`, if present and non-empty
    pub fn name(&self) -> Option<&str> {
        self.metadata()
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata()
            .and_then(|m| m.get("namespace"))
            .and_then(Value::as_str)
    }

    pub fn metadata(&self) -> Option<&Mapping> {
        self.0.get("metadata").and_then(Value::as_mapping)
    }

    pub fn labels(&self) -> Option<&Mapping> {
        self.metadata()
            .and_then(|m| m.get("labels"))
            .and_then(Value::as_mapping)
    }

    /// A single label value rendered as a string
    pub fn label(&self, key: &str) -> Option<String> {
        self.labels()
            .and_then(|labels| labels.get(key))
            .and_then(scalar_to_string)
    }

    /// `Kind/name` identifier used in diagnostics
    pub fn resource_id(&self) -> String {
        format!(
            "{}/{}",
            self.kind().unwrap_or("<unknown>"),
            self.name().unwrap_or("<unnamed>")
        )
    }

    /// Fail fast when the document lacks `kind` or `metadata.name`
    pub fn ensure_identity(&self) -> Result<()> {
        if self.kind().is_none() {
            return Err(CoreError::MissingField {
                field: "kind".to_string(),
            });
        }
        if self.name().is_none() {
            return Err(CoreError::MissingField {
                field: "metadata.name".to_string(),
            });
        }
        Ok(())
    }

    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        path.get(&self.0)
    }

    pub fn get_mut(&mut self, path: &FieldPath) -> Option<&mut Value> {
        path.get_mut(&mut self.0)
    }

    pub fn get_str(&self, path: &FieldPath) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn get_mapping(&self, path: &FieldPath) -> Option<&Mapping> {
        self.get(path).and_then(Value::as_mapping)
    }

    pub fn get_mapping_mut(&mut self, path: &FieldPath) -> Option<&mut Mapping> {
        self.get_mut(path).and_then(Value::as_mapping_mut)
    }

    pub fn contains(&self, path: &FieldPath) -> bool {
        self.get(path).is_some()
    }

    /// Write a value, creating intermediate mappings. See [`FieldPath::set`].
    pub fn set(&mut self, path: &FieldPath, value: impl Into<Value>) -> bool {
        path.set(&mut self.0, value.into())
    }

    pub fn remove(&mut self, path: &FieldPath) -> Option<Value> {
        path.remove(&mut self.0)
    }

    /// Build a new document with the given paths replaced.
    ///
    /// The tree is rebuilt rather than patched, so the same literal appearing
    /// at several locations is only replaced where a path points at it.
    /// Paths that do not exist in the document are ignored.
    pub fn with_replacements(&self, replacements: &BTreeMap<FieldPath, Value>) -> Self {
        Self(rebuild(&self.0, &FieldPath::root(), &mut |path, _| {
            replacements.get(path).cloned()
        }))
    }

    /// Every scalar leaf together with its path, in document order
    pub fn scalar_leaves(&self) -> Vec<(FieldPath, &Value)> {
        let mut leaves = Vec::new();
        collect_leaves(&self.0, FieldPath::root(), &mut leaves);
        leaves
    }
}

impl From<Value> for ManifestDocument {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Pure recursive transform: `replace` may substitute any node, otherwise
/// mappings and sequences are copied and descended into.
pub fn rebuild<F>(node: &Value, path: &FieldPath, replace: &mut F) -> Value
where
    F: FnMut(&FieldPath, &Value) -> Option<Value>,
{
    if let Some(replacement) = replace(path, node) {
        return replacement;
    }

    match node {
        Value::Mapping(map) => {
            let mut out = Mapping::new();
            for (key, value) in map {
                let child = match key.as_str() {
                    Some(k) => rebuild(value, &path.clone().key(k), replace),
                    None => value.clone(),
                };
                out.insert(key.clone(), child);
            }
            Value::Mapping(out)
        }
        Value::Sequence(seq) => Value::Sequence(
            seq.iter()
                .enumerate()
                .map(|(i, value)| rebuild(value, &path.clone().index(i), replace))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn collect_leaves<'a>(node: &'a Value, path: FieldPath, out: &mut Vec<(FieldPath, &'a Value)>) {
    match node {
        Value::Mapping(map) => {
            for (key, value) in map {
                if let Some(k) = key.as_str() {
                    collect_leaves(value, path.clone().key(k), out);
                }
            }
        }
        Value::Sequence(seq) => {
            for (i, value) in seq.iter().enumerate() {
                collect_leaves(value, path.clone().index(i), out);
            }
        }
        Value::Tagged(tagged) => collect_leaves(&tagged.value, path, out),
        leaf => out.push((path, leaf)),
    }
}

/// Render a scalar as an opaque string. Mappings, sequences and null yield `None`.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        _ => None,
    }
}

/// Whether `path` addresses a location below `prefix`
pub fn is_under(path: &FieldPath, prefix: &FieldPath) -> bool {
    path.segments().starts_with(prefix.segments())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DC: &str = r#"
apiVersion: apps.openshift.io/v1
kind: DeploymentConfig
metadata:
  name: frontend
  labels:
    app: shop
spec:
  replicas: 2
  template:
    spec:
      containers:
        - name: web
          image: nginx
        - name: sidecar
          image: nginx
"#;

    #[test]
    fn test_identity_accessors() {
        let doc = ManifestDocument::from_yaml(DC).unwrap();
        assert_eq!(doc.kind(), Some("DeploymentConfig"));
        assert_eq!(doc.name(), Some("frontend"));
        assert_eq!(doc.label("app").as_deref(), Some("shop"));
        assert_eq!(doc.resource_id(), "DeploymentConfig/frontend");
        assert!(doc.ensure_identity().is_ok());
    }

    #[test]
    fn test_ensure_identity_fails_fast() {
        let doc = ManifestDocument::from_yaml("metadata:\n  name: x\n").unwrap();
        assert!(matches!(
            doc.ensure_identity(),
            Err(CoreError::MissingField { field }) if field == "kind"
        ));

        let doc = ManifestDocument::from_yaml("kind: Service\nmetadata: {}\n").unwrap();
        assert!(matches!(
            doc.ensure_identity(),
            Err(CoreError::MissingField { field }) if field == "metadata.name"
        ));
    }

    #[test]
    fn test_with_replacements_is_path_scoped() {
        let doc = ManifestDocument::from_yaml(DC).unwrap();
        let first_image = FieldPath::parse("spec.template.spec.containers[0].image").unwrap();
        let second_image = FieldPath::parse("spec.template.spec.containers[1].image").unwrap();

        let mut replacements = BTreeMap::new();
        replacements.insert(first_image.clone(), Value::from("replaced"));
        let rebuilt = doc.with_replacements(&replacements);

        assert_eq!(rebuilt.get_str(&first_image), Some("replaced"));
        assert_eq!(rebuilt.get_str(&second_image), Some("nginx"));
        // the source document is untouched
        assert_eq!(doc.get_str(&first_image), Some("nginx"));
    }

    #[test]
    fn test_scalar_to_string() {
        assert_eq!(scalar_to_string(&Value::from(3)), Some("3".to_string()));
        assert_eq!(scalar_to_string(&Value::from("500m")), Some("500m".to_string()));
        assert_eq!(scalar_to_string(&Value::from(true)), Some("true".to_string()));
        assert_eq!(scalar_to_string(&Value::Null), None);
    }

    #[test]
    fn test_scalar_leaves_and_is_under() {
        let doc = ManifestDocument::from_yaml(DC).unwrap();
        let containers = FieldPath::parse("spec.template.spec.containers").unwrap();
        let under: Vec<_> = doc
            .scalar_leaves()
            .into_iter()
            .filter(|(path, _)| is_under(path, &containers))
            .collect();
        assert_eq!(under.len(), 4);
    }
}
