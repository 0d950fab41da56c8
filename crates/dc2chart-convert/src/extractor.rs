//! Value extraction
//!
//! Lifts environment-specific literals out of a rewritten document into the
//! bundle's values model and writes a placeholder referencing each new key
//! in their place. Both sides are produced together so a placeholder never
//! exists without its value.

use serde_yaml::Value;
use std::collections::BTreeMap;

use dc2chart_core::{FieldPath, ImageReference, ManifestDocument, ResourceKind, ValuesModel, scalar_to_string};

use crate::error::{ConversionWarning, Diagnostics, WarningCategory};
use crate::parameters::TemplateParameters;
use crate::placeholder;

/// How a table entry is read and templated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    /// Single literal under one key
    Scalar,
    /// Image reference split over `<key>.host/path/image/tag`
    Image,
    /// The placeholder is written by the rewriter; record the application name
    AppName,
    /// `spec.storageClassName` of every claim template under the path
    ClaimTemplates,
}

/// One externalizable field
#[derive(Debug, Clone, Copy)]
struct FieldRule {
    path: &'static str,
    key: &'static str,
    shape: Shape,
}

const fn rule(path: &'static str, key: &'static str, shape: Shape) -> FieldRule {
    FieldRule { path, key, shape }
}

const APP_NAME: FieldRule = rule("metadata.labels.app", placeholder::APP_NAME_KEY, Shape::AppName);

const WORKLOAD_FIELDS: &[FieldRule] = &[
    APP_NAME,
    rule("spec.replicas", "replicas", Shape::Scalar),
    rule("spec.template.spec.containers[0].image", "repository", Shape::Image),
    rule("spec.template.spec.containers[0].resources.limits.cpu", "resources.limits.cpu", Shape::Scalar),
    rule("spec.template.spec.containers[0].resources.limits.memory", "resources.limits.memory", Shape::Scalar),
    rule("spec.template.spec.containers[0].resources.requests.cpu", "resources.requests.cpu", Shape::Scalar),
    rule("spec.template.spec.containers[0].resources.requests.memory", "resources.requests.memory", Shape::Scalar),
];

const STATEFULSET_FIELDS: &[FieldRule] = &[
    APP_NAME,
    rule("spec.replicas", "replicas", Shape::Scalar),
    rule("spec.template.spec.containers[0].image", "repository", Shape::Image),
    rule("spec.template.spec.containers[0].resources.limits.cpu", "resources.limits.cpu", Shape::Scalar),
    rule("spec.template.spec.containers[0].resources.limits.memory", "resources.limits.memory", Shape::Scalar),
    rule("spec.template.spec.containers[0].resources.requests.cpu", "resources.requests.cpu", Shape::Scalar),
    rule("spec.template.spec.containers[0].resources.requests.memory", "resources.requests.memory", Shape::Scalar),
    rule("spec.volumeClaimTemplates", "storage.className", Shape::ClaimTemplates),
];

const ROUTE_FIELDS: &[FieldRule] = &[APP_NAME, rule("spec.host", "route.domain", Shape::Scalar)];

const CLAIM_FIELDS: &[FieldRule] = &[
    APP_NAME,
    rule("spec.storageClassName", "storage.className", Shape::Scalar),
];

const COMMON_FIELDS: &[FieldRule] = &[APP_NAME];

/// Externalizable fields for a kind
fn fields_for(kind: &ResourceKind) -> &'static [FieldRule] {
    match kind.target() {
        ResourceKind::Deployment => WORKLOAD_FIELDS,
        ResourceKind::StatefulSet => STATEFULSET_FIELDS,
        ResourceKind::Route => ROUTE_FIELDS,
        ResourceKind::PersistentVolumeClaim => CLAIM_FIELDS,
        _ => COMMON_FIELDS,
    }
}

/// Values lifted from one document, and the document with placeholders
#[derive(Debug, Clone)]
pub struct Extraction {
    pub document: ManifestDocument,
    /// New keys only; merge into the bundle's values
    pub values: ValuesModel,
    pub diagnostics: Diagnostics,
}

/// Lifts literals out of documents belonging to one application
pub struct ValueExtractor<'a> {
    application: &'a str,
    parameters: &'a TemplateParameters,
}

impl<'a> ValueExtractor<'a> {
    pub fn new(application: &'a str, parameters: &'a TemplateParameters) -> Self {
        Self {
            application,
            parameters,
        }
    }

    /// Extract from `document`, claiming keys against the values the bundle
    /// already holds. Identical literals share a key; differing literals for
    /// an already used key get a key qualified by the resource name.
    pub fn extract(&self, document: &ManifestDocument, kind: &ResourceKind, existing: &ValuesModel) -> Extraction {
        let mut state = ExtractState {
            existing,
            fragment: ValuesModel::new(),
            replacements: BTreeMap::new(),
            diagnostics: Diagnostics::new(),
            resource: document.resource_id(),
            qualifier: qualifier(document.name().unwrap_or_default()),
        };

        for field in fields_for(kind) {
            let Ok(path) = FieldPath::parse(field.path) else {
                continue;
            };
            match field.shape {
                Shape::AppName => {
                    if document.get_str(&path) == Some(placeholder::app_name().as_str()) {
                        state.record_app_name(self.application);
                    }
                }
                Shape::Scalar => {
                    if let Some(literal) = self.literal(document, &path) {
                        let key = state.claim(field.key, &literal);
                        state.replace(path, placeholder::values_ref(&key));
                    }
                }
                Shape::Image => {
                    if let Some(literal) = self.literal(document, &path) {
                        let image = ImageReference::parse(&literal);
                        if !image.is_empty() {
                            let templated = state.claim_image(field.key, &image);
                            state.replace(path, templated);
                        }
                    }
                }
                Shape::ClaimTemplates => {
                    let count = document
                        .get(&path)
                        .and_then(Value::as_sequence)
                        .map(Vec::len)
                        .unwrap_or(0);
                    for i in 0..count {
                        let class = path.clone().index(i).key("spec").key("storageClassName");
                        if let Some(literal) = self.literal(document, &class) {
                            let key = state.claim(field.key, &literal);
                            state.replace(class, placeholder::values_ref(&key));
                        }
                    }
                }
            }
        }

        tracing::debug!(
            resource = %state.resource,
            extracted = state.replacements.len(),
            "extracted values"
        );

        Extraction {
            document: document.with_replacements(&state.replacements),
            values: state.fragment,
            diagnostics: state.diagnostics,
        }
    }

    /// A scalar literal at `path`, with template parameters resolved.
    ///
    /// Absent fields, nulls, mappings and values that are already templated
    /// are skipped.
    fn literal(&self, document: &ManifestDocument, path: &FieldPath) -> Option<String> {
        let raw = scalar_to_string(document.get(path)?)?;
        if placeholder::is_templated(&raw) {
            return None;
        }
        Some(self.parameters.resolve(&raw))
    }
}

struct ExtractState<'a> {
    existing: &'a ValuesModel,
    fragment: ValuesModel,
    replacements: BTreeMap<FieldPath, Value>,
    diagnostics: Diagnostics,
    resource: String,
    qualifier: String,
}

impl ExtractState<'_> {
    fn replace(&mut self, path: FieldPath, placeholder: String) {
        self.replacements.insert(path, Value::String(placeholder));
    }

    fn lookup(&self, key: &str) -> Option<&str> {
        self.fragment
            .get_str(key)
            .or_else(|| self.existing.get_str(key))
    }

    fn is_free(&self, key: &str) -> bool {
        self.existing.is_free(key) && self.fragment.is_free(key)
    }

    fn record_app_name(&mut self, application: &str) {
        if !self.is_free(placeholder::APP_NAME_KEY) {
            return;
        }
        if let Err(e) = self.fragment.set(placeholder::APP_NAME_KEY, application) {
            self.diagnostics.push(
                ConversionWarning::warning(
                    WarningCategory::Values,
                    format!("cannot add '{}': {}", placeholder::APP_NAME_KEY, e),
                )
                .for_resource(self.resource.clone()),
            );
        }
    }

    /// Pick the key `value` is stored under and record it
    fn claim(&mut self, key: &str, value: &str) -> String {
        let candidates = std::iter::once(key.to_string())
            .chain(std::iter::once(format!("{}.{}", self.qualifier, key)))
            .chain((2..).map(|n| format!("{}{}.{}", self.qualifier, n, key)));

        for candidate in candidates {
            if self.lookup(&candidate) == Some(value) {
                return candidate;
            }
            if self.is_free(&candidate) && self.fragment.set(&candidate, value).is_ok() {
                if candidate != key {
                    self.diagnostics.push(
                        ConversionWarning::info(
                            WarningCategory::Values,
                            format!("'{}' already holds a different value; stored as '{}'", key, candidate),
                        )
                        .for_resource(self.resource.clone()),
                    );
                }
                return candidate;
            }
        }
        key.to_string()
    }

    /// Claim each non-empty image component and compose the placeholder
    fn claim_image(&mut self, group: &str, image: &ImageReference) -> String {
        let mut component = |name: &str, value: &str| -> Option<String> {
            if value.is_empty() {
                return None;
            }
            let key = self.claim(&format!("{}.{}", group, name), value);
            Some(placeholder::values_ref(&key))
        };

        let host = component("host", &image.host);
        let path = component("path", &image.path);
        let name = component("image", &image.name);
        let tag = component("tag", &image.tag);

        let mut out = [host, path, name]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join("/");
        if let Some(tag) = tag {
            out.push_str(image.tag_separator());
            out.push_str(&tag);
        }
        out
    }
}

/// Lower-camel identifier derived from a resource name, used to qualify keys
pub fn qualifier(name: &str) -> String {
    let mut out = String::new();
    let mut upper = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if out.is_empty() {
                out.push(c.to_ascii_lowercase());
            } else if upper {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
            upper = false;
        } else {
            upper = true;
        }
    }
    if out.is_empty() {
        out.push_str("resource");
    } else if out.starts_with(|c: char| c.is_ascii_digit()) {
        // template field names cannot start with a digit
        out.insert(0, 'r');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPLOYMENT: &str = r#"
kind: Deployment
metadata:
  name: frontend
  labels:
    app: '{{ .Values.name }}'
spec:
  replicas: 2
  template:
    spec:
      containers:
        - name: web
          image: registry.example.com:5000/shop-dev/frontend:latest
          resources:
            limits:
              cpu: 500m
              memory: 512Mi
        - name: sidecar
          image: registry.example.com:5000/shop-dev/frontend:latest
"#;

    fn extract(yaml: &str, existing: &ValuesModel) -> Extraction {
        let params = TemplateParameters::new();
        let doc = ManifestDocument::from_yaml(yaml).unwrap();
        let kind = doc.resource_kind().unwrap();
        ValueExtractor::new("shop", &params).extract(&doc, &kind, existing)
    }

    fn at<'a>(doc: &'a ManifestDocument, path: &str) -> Option<&'a str> {
        doc.get_str(&FieldPath::parse(path).unwrap())
    }

    #[test]
    fn test_table_paths_parse() {
        for table in [WORKLOAD_FIELDS, STATEFULSET_FIELDS, ROUTE_FIELDS, CLAIM_FIELDS, COMMON_FIELDS] {
            for field in table {
                assert!(FieldPath::parse(field.path).is_ok(), "{}", field.path);
            }
        }
    }

    #[test]
    fn test_workload_extraction() {
        let out = extract(DEPLOYMENT, &ValuesModel::new());
        let values = &out.values;

        assert_eq!(values.get_str("name"), Some("shop"));
        assert_eq!(values.get_str("replicas"), Some("2"));
        assert_eq!(values.get_str("repository.host"), Some("registry.example.com:5000"));
        assert_eq!(values.get_str("repository.path"), Some("shop-dev"));
        assert_eq!(values.get_str("repository.image"), Some("frontend"));
        assert_eq!(values.get_str("repository.tag"), Some("latest"));
        assert_eq!(values.get_str("resources.limits.cpu"), Some("500m"));
        assert!(!values.contains("resources.requests"));

        let doc = &out.document;
        assert_eq!(at(doc, "spec.replicas"), Some("{{ .Values.replicas }}"));
        assert_eq!(
            at(doc, "spec.template.spec.containers[0].image"),
            Some(
                "{{ .Values.repository.host }}/{{ .Values.repository.path }}/{{ .Values.repository.image }}:{{ .Values.repository.tag }}"
            )
        );
        // only the first container is externalized
        assert_eq!(
            at(doc, "spec.template.spec.containers[1].image"),
            Some("registry.example.com:5000/shop-dev/frontend:latest")
        );
        assert_eq!(
            at(doc, "spec.template.spec.containers[0].resources.limits.memory"),
            Some("{{ .Values.resources.limits.memory }}")
        );
    }

    #[test]
    fn test_image_without_host_or_tag() {
        let out = extract(
            "kind: Deployment\nmetadata:\n  name: api\nspec:\n  template:\n    spec:\n      containers:\n        - image: nginx\n",
            &ValuesModel::new(),
        );
        assert_eq!(
            at(&out.document, "spec.template.spec.containers[0].image"),
            Some("{{ .Values.repository.image }}")
        );
        assert!(!out.values.contains("repository.host"));
        assert!(!out.values.contains("repository.tag"));
    }

    #[test]
    fn test_digest_reference() {
        let out = extract(
            "kind: Deployment\nmetadata:\n  name: api\nspec:\n  template:\n    spec:\n      containers:\n        - image: quay.io/org/api@sha256:abc\n",
            &ValuesModel::new(),
        );
        assert_eq!(out.values.get_str("repository.tag"), Some("@sha256:abc"));
        assert_eq!(
            at(&out.document, "spec.template.spec.containers[0].image"),
            Some("{{ .Values.repository.host }}/{{ .Values.repository.path }}/{{ .Values.repository.image }}{{ .Values.repository.tag }}")
        );
    }

    #[test]
    fn test_collision_is_qualified() {
        let mut existing = ValuesModel::new();
        existing.set("replicas", "2").unwrap();
        existing.set("repository.image", "frontend").unwrap();

        let out = extract(
            r#"
kind: Deployment
metadata:
  name: order-worker
spec:
  replicas: 5
  template:
    spec:
      containers:
        - image: frontend
"#,
            &existing,
        );

        assert_eq!(out.values.get_str("orderWorker.replicas"), Some("5"));
        assert!(!out.values.contains("replicas"));
        assert_eq!(at(&out.document, "spec.replicas"), Some("{{ .Values.orderWorker.replicas }}"));

        // identical literal shares the existing key
        assert_eq!(
            at(&out.document, "spec.template.spec.containers[0].image"),
            Some("{{ .Values.repository.image }}")
        );
        assert!(!out.values.contains("repository.image"));

        assert_eq!(out.diagnostics.len(), 1);
    }

    #[test]
    fn test_route_and_claim() {
        let out = extract(
            "kind: Route\nmetadata:\n  name: web\nspec:\n  host: shop.apps.example.com\n",
            &ValuesModel::new(),
        );
        assert_eq!(out.values.get_str("route.domain"), Some("shop.apps.example.com"));
        assert_eq!(at(&out.document, "spec.host"), Some("{{ .Values.route.domain }}"));

        let out = extract(
            "kind: PersistentVolumeClaim\nmetadata:\n  name: data\nspec:\n  storageClassName: ''\n",
            &ValuesModel::new(),
        );
        assert_eq!(out.values.get_str("storage.className"), Some(""));
        assert_eq!(
            at(&out.document, "spec.storageClassName"),
            Some("{{ .Values.storage.className }}")
        );
    }

    #[test]
    fn test_parameters_resolve_into_values() {
        let mut params = TemplateParameters::new();
        params.declare(crate::parameters::Parameter {
            name: "REPLICAS".into(),
            value: Some("4".into()),
            ..Default::default()
        });
        let doc = ManifestDocument::from_yaml(
            "kind: Deployment\nmetadata:\n  name: api\nspec:\n  replicas: ${{REPLICAS}}\n",
        )
        .unwrap();
        let out = ValueExtractor::new("shop", &params).extract(
            &doc,
            &ResourceKind::Deployment,
            &ValuesModel::new(),
        );
        assert_eq!(out.values.get_str("replicas"), Some("4"));
    }

    #[test]
    fn test_templated_fields_are_skipped() {
        let first = extract(DEPLOYMENT, &ValuesModel::new());
        let again = ValueExtractor::new("shop", &TemplateParameters::new()).extract(
            &first.document,
            &ResourceKind::Deployment,
            &first.values,
        );
        assert_eq!(again.document, first.document);
        assert!(again.values.is_empty());
    }

    #[test]
    fn test_collision_with_digit_leading_name() {
        let mut existing = ValuesModel::new();
        existing.set("replicas", "1").unwrap();

        let out = extract(
            "kind: Deployment\nmetadata:\n  name: 2nd-worker\nspec:\n  replicas: 5\n",
            &existing,
        );
        assert_eq!(out.values.get_str("r2ndWorker.replicas"), Some("5"));
        assert_eq!(at(&out.document, "spec.replicas"), Some("{{ .Values.r2ndWorker.replicas }}"));
    }

    #[test]
    fn test_qualifier() {
        assert_eq!(qualifier("order-worker"), "orderWorker");
        assert_eq!(qualifier("Frontend"), "frontend");
        assert_eq!(qualifier("db_2"), "db2");
        assert_eq!(qualifier("--"), "resource");
        assert_eq!(qualifier("2nd-worker"), "r2ndWorker");
    }
}
