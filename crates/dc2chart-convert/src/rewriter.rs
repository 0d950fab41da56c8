//! Per-kind field rewriting
//!
//! Each rule takes a parsed document and returns a new one with legacy
//! OpenShift fields migrated to their standard Kubernetes counterparts.
//! Every step first checks that the fields it needs are present; when they
//! are not, the step is skipped and a diagnostic is recorded. Only a missing
//! `kind` or `metadata.name` fails the rule.
//!
//! Rules are idempotent: rewriting an already rewritten document changes
//! nothing.

use serde_yaml::{Mapping, Value};

use dc2chart_core::path::remove_key;
use dc2chart_core::{FieldPath, ImageReference, ManifestDocument, ResourceKind};

use crate::error::{ConversionWarning, Diagnostics, Result, WarningCategory, WarningSeverity};
use crate::parameters::TemplateParameters;
use crate::placeholder;

/// Legacy pod label written by OpenShift on DeploymentConfig pods
const LEGACY_POD_LABEL: &str = "deploymentconfig";
/// Label replacing it
const POD_LABEL: &str = "deployment";

/// Strategy fields with no Deployment equivalent
const LEGACY_STRATEGY_FIELDS: &[&str] = &[
    "rollingParams",
    "recreateParams",
    "customParams",
    "activeDeadlineSeconds",
    "resources",
];

/// `spec` fields with no Deployment equivalent
const LEGACY_SPEC_FIELDS: &[&str] = &["triggers", "test", "status"];

/// Inputs a rule needs besides the document
#[derive(Debug, Clone, Copy)]
pub struct RewriteContext<'a> {
    /// Application the resource belongs to
    pub application: &'a str,
    /// Registry host prefixed to trigger-derived images
    pub registry: Option<&'a str>,
    /// Insert the trigger's source namespace into derived images
    pub include_source_namespace: bool,
    /// Parameters of the source template, for comparing label values
    pub parameters: &'a TemplateParameters,
}

/// A rewritten document and what happened along the way
#[derive(Debug, Clone)]
pub struct Rewritten {
    pub document: ManifestDocument,
    pub diagnostics: Diagnostics,
}

/// Rewrite rule, chosen once per document from its kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteRule {
    /// DeploymentConfig to Deployment; also re-applied to Deployments
    Deployment,
    Service,
    Route,
    PersistentVolumeClaim,
    StatefulSet,
    /// Common normalization only
    Common,
}

impl RewriteRule {
    /// Rule registered for a kind. Unregistered kinds get [`RewriteRule::Common`].
    pub fn for_kind(kind: &ResourceKind) -> Self {
        match kind {
            ResourceKind::DeploymentConfig | ResourceKind::Deployment => Self::Deployment,
            ResourceKind::Service => Self::Service,
            ResourceKind::Route => Self::Route,
            ResourceKind::PersistentVolumeClaim => Self::PersistentVolumeClaim,
            ResourceKind::StatefulSet => Self::StatefulSet,
            ResourceKind::CronJob | ResourceKind::Other(_) => Self::Common,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Deployment => "deployment",
            Self::Service => "service",
            Self::Route => "route",
            Self::PersistentVolumeClaim => "persistentvolumeclaim",
            Self::StatefulSet => "statefulset",
            Self::Common => "common",
        }
    }

    /// Apply the rule. The input document is left untouched.
    pub fn apply(&self, document: &ManifestDocument, ctx: &RewriteContext<'_>) -> Result<Rewritten> {
        document.ensure_identity()?;

        let mut rewrite = Rewrite {
            doc: document.clone(),
            resource: document.resource_id(),
            ctx,
            diagnostics: Diagnostics::new(),
        };

        rewrite.normalize_metadata();
        match self {
            Self::Deployment => rewrite.deployment(),
            Self::Service => rewrite.service(),
            Self::Route => rewrite.route(),
            Self::PersistentVolumeClaim => rewrite.persistent_volume_claim(),
            Self::StatefulSet => rewrite.stateful_set(),
            Self::Common => {}
        }

        tracing::debug!(
            resource = %rewrite.resource,
            rule = self.name(),
            diagnostics = rewrite.diagnostics.len(),
            "rewrote document"
        );

        Ok(Rewritten {
            document: rewrite.doc,
            diagnostics: rewrite.diagnostics,
        })
    }
}

/// Working state of one rule application
struct Rewrite<'a> {
    doc: ManifestDocument,
    resource: String,
    ctx: &'a RewriteContext<'a>,
    diagnostics: Diagnostics,
}

impl Rewrite<'_> {
    fn missing(&mut self, path: &FieldPath, step: &str) {
        self.diagnostics
            .push(ConversionWarning::missing_field(&self.resource, path, step));
    }

    fn note(&mut self, path: &FieldPath, message: impl Into<String>) {
        self.diagnostics.push(
            ConversionWarning::info(WarningCategory::Structure, message)
                .for_resource(self.resource.clone())
                .at_field(path),
        );
    }

    // =========================================================================
    // Common normalization
    // =========================================================================

    /// Namespace becomes the release namespace; `labels.app` points at the
    /// application name placeholder.
    fn normalize_metadata(&mut self) {
        self.doc.set(
            &FieldPath::keys(&["metadata", "namespace"]),
            placeholder::RELEASE_NAMESPACE,
        );

        let labels = FieldPath::keys(&["metadata", "labels"]);
        let writable = matches!(
            self.doc.get(&labels),
            Some(Value::Mapping(_)) | Some(Value::Null) | None
        );
        if writable {
            self.doc.set(&labels.key("app"), placeholder::app_name());
        } else {
            self.note(&labels, "labels is not a mapping; left unchanged");
        }
    }

    /// Rename the legacy pod label and repoint `app` when it names this
    /// application. Used on selectors and pod template labels alike.
    fn align_pod_labels(&mut self, path: &FieldPath) -> bool {
        let ctx = self.ctx;
        let Some(labels) = self.doc.get_mapping_mut(path) else {
            return false;
        };

        if !labels.contains_key(POD_LABEL) {
            if let Some(value) = remove_key(labels, LEGACY_POD_LABEL) {
                labels.insert(Value::from(POD_LABEL), value);
            }
        }

        if let Some(app) = labels.get_mut("app") {
            let names_application = app
                .as_str()
                .is_some_and(|value| ctx.parameters.resolve(value) == ctx.application);
            if names_application {
                *app = Value::from(placeholder::app_name());
            }
        }
        true
    }

    // =========================================================================
    // DeploymentConfig / Deployment
    // =========================================================================

    fn deployment(&mut self) {
        self.doc.set(&FieldPath::keys(&["kind"]), ResourceKind::Deployment.as_str());
        self.doc.set(&FieldPath::keys(&["apiVersion"]), "apps/v1");

        self.rolling_strategy();
        self.migrate_selector();
        self.resolve_image(WarningSeverity::Warning);
        self.drop_legacy_fields();

        let template_labels = FieldPath::keys(&["spec", "template", "metadata", "labels"]);
        if !self.align_pod_labels(&template_labels) {
            self.missing(&template_labels, "pod label alignment");
        }
    }

    fn rolling_strategy(&mut self) {
        let strategy = FieldPath::keys(&["spec", "strategy"]);
        let Some(map) = self.doc.get_mapping_mut(&strategy) else {
            self.missing(&strategy, "strategy conversion");
            return;
        };

        map.insert(Value::from("type"), Value::from("RollingUpdate"));
        for field in LEGACY_STRATEGY_FIELDS {
            remove_key(map, field);
        }
    }

    /// Move every selector key except `matchLabels` into `matchLabels`
    fn migrate_selector(&mut self) {
        let selector = FieldPath::keys(&["spec", "selector"]);
        let Some(map) = self.doc.get_mapping_mut(&selector) else {
            self.missing(&selector, "selector migration");
            return;
        };

        let mut match_labels = match remove_key(map, "matchLabels") {
            Some(Value::Mapping(existing)) => existing,
            _ => Mapping::new(),
        };
        let mut rest = Mapping::new();
        for (key, value) in std::mem::take(map) {
            if key.as_str() == Some("matchExpressions") {
                rest.insert(key, value);
            } else {
                match_labels.insert(key, value);
            }
        }

        map.insert(Value::from("matchLabels"), Value::Mapping(match_labels));
        map.extend(rest);

        self.align_pod_labels(&selector.key("matchLabels"));
    }

    // =========================================================================
    // Image resolution
    // =========================================================================

    /// Derive `containers[0].image` from the first image-change trigger.
    ///
    /// Must run before the triggers are dropped.
    fn resolve_image(&mut self, severity: WarningSeverity) {
        let triggers = FieldPath::keys(&["spec", "triggers"]);
        let trigger = self
            .doc
            .get(&triggers)
            .and_then(Value::as_sequence)
            .and_then(|seq| {
                seq.iter().find_map(|t| {
                    let from = t.get("imageChangeParams")?.get("from")?;
                    let name = from.get("name")?.as_str()?.to_string();
                    let namespace = from.get("namespace").and_then(Value::as_str).map(String::from);
                    Some((name, namespace))
                })
            });

        let Some((stream_tag, namespace)) = trigger else {
            let path = triggers.clone().index(0).key("imageChangeParams");
            if severity == WarningSeverity::Info {
                self.note(&path, "no image-change trigger; container image kept");
            } else {
                self.missing(&path, "image resolution");
            }
            return;
        };

        let namespace = namespace.filter(|_| self.ctx.include_source_namespace);
        let image = ImageReference::from_stream(self.ctx.registry, namespace.as_deref(), &stream_tag);

        let target = FieldPath::keys(&["spec", "template", "spec", "containers"])
            .index(0)
            .key("image");
        if !self.doc.contains(&target.parent().unwrap_or_default()) {
            self.missing(&target, "image resolution");
            return;
        }
        self.doc.set(&target, image.to_string());
    }

    fn drop_legacy_fields(&mut self) {
        for &field in LEGACY_SPEC_FIELDS {
            self.doc.remove(&FieldPath::keys(&["spec", field]));
        }
        self.doc.remove(&FieldPath::keys(&["status"]));
    }

    // =========================================================================
    // Other kinds
    // =========================================================================

    fn service(&mut self) {
        let selector = FieldPath::keys(&["spec", "selector"]);
        if !self.align_pod_labels(&selector) {
            self.missing(&selector, "selector alignment");
        }
    }

    /// Host is templated by the extractor; make sure the field exists
    fn route(&mut self) {
        self.doc.set(
            &FieldPath::keys(&["metadata", "annotations"]),
            Value::Mapping(Mapping::new()),
        );

        self.ensure_blank(&FieldPath::keys(&["spec", "host"]), "host templating");
    }

    fn persistent_volume_claim(&mut self) {
        self.ensure_blank(
            &FieldPath::keys(&["spec", "storageClassName"]),
            "storage class templating",
        );
    }

    fn stateful_set(&mut self) {
        self.resolve_image(WarningSeverity::Info);
        self.doc.remove(&FieldPath::keys(&["spec", "triggers"]));

        let templates = FieldPath::keys(&["spec", "volumeClaimTemplates"]);
        let count = self
            .doc
            .get(&templates)
            .and_then(Value::as_sequence)
            .map(Vec::len)
            .unwrap_or(0);
        for i in 0..count {
            let class = templates.clone().index(i).key("spec").key("storageClassName");
            self.ensure_blank(&class, "storage class templating");
        }
    }

    /// An absent or null field becomes `""` so the extractor templates it
    fn ensure_blank(&mut self, path: &FieldPath, step: &str) {
        let unset = matches!(self.doc.get(path), None | Some(Value::Null));
        if unset && !self.doc.set(path, "") {
            self.missing(path, step);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;

    const DC: &str = r#"
apiVersion: apps.openshift.io/v1
kind: DeploymentConfig
metadata:
  name: frontend
  namespace: shop-dev
  labels:
    app: shop
spec:
  replicas: 2
  selector:
    app: shop
    deploymentconfig: frontend
  strategy:
    type: Rolling
    rollingParams:
      timeoutSeconds: 600
    activeDeadlineSeconds: 21600
    resources: {}
  template:
    metadata:
      labels:
        app: shop
        deploymentconfig: frontend
    spec:
      containers:
        - name: web
          image: ' '
  test: false
  triggers:
    - type: ConfigChange
    - type: ImageChange
      imageChangeParams:
        automatic: true
        containerNames: [web]
        from:
          kind: ImageStreamTag
          namespace: shop-dev
          name: frontend:latest
status:
  replicas: 2
"#;

    static NO_PARAMETERS: Lazy<TemplateParameters> = Lazy::new(TemplateParameters::new);

    fn ctx(registry: Option<&str>) -> RewriteContext<'_> {
        RewriteContext {
            application: "shop",
            registry,
            include_source_namespace: true,
            parameters: &NO_PARAMETERS,
        }
    }

    fn doc(yaml: &str) -> ManifestDocument {
        ManifestDocument::from_yaml(yaml).unwrap()
    }

    fn str_at<'a>(doc: &'a ManifestDocument, path: &str) -> Option<&'a str> {
        doc.get_str(&FieldPath::parse(path).unwrap())
    }

    #[test]
    fn test_rule_dispatch() {
        assert_eq!(RewriteRule::for_kind(&ResourceKind::DeploymentConfig), RewriteRule::Deployment);
        assert_eq!(RewriteRule::for_kind(&ResourceKind::Deployment), RewriteRule::Deployment);
        assert_eq!(RewriteRule::for_kind(&ResourceKind::CronJob), RewriteRule::Common);
        assert_eq!(
            RewriteRule::for_kind(&ResourceKind::Other("ConfigMap".into())),
            RewriteRule::Common
        );
    }

    #[test]
    fn test_deployment_config_conversion() {
        let input = doc(DC);
        let out = RewriteRule::Deployment
            .apply(&input, &ctx(Some("registry.example.com:5000")))
            .unwrap();
        let d = &out.document;

        assert_eq!(d.kind(), Some("Deployment"));
        assert_eq!(d.api_version(), Some("apps/v1"));
        assert_eq!(d.namespace(), Some("{{ .Release.Namespace }}"));
        assert_eq!(d.label("app").as_deref(), Some("{{ .Values.name }}"));

        assert_eq!(str_at(d, "spec.strategy.type"), Some("RollingUpdate"));
        assert!(!d.contains(&FieldPath::parse("spec.strategy.rollingParams").unwrap()));
        assert!(!d.contains(&FieldPath::parse("spec.strategy.activeDeadlineSeconds").unwrap()));
        assert!(!d.contains(&FieldPath::parse("spec.strategy.resources").unwrap()));

        assert_eq!(
            str_at(d, "spec.selector.matchLabels.deployment"),
            Some("frontend")
        );
        assert_eq!(
            str_at(d, "spec.selector.matchLabels.app"),
            Some("{{ .Values.name }}")
        );
        assert_eq!(d.get_mapping(&FieldPath::keys(&["spec", "selector"])).unwrap().len(), 1);
        assert_eq!(
            str_at(d, "spec.template.metadata.labels.deployment"),
            Some("frontend")
        );
        assert!(str_at(d, "spec.template.metadata.labels.deploymentconfig").is_none());

        assert_eq!(
            str_at(d, "spec.template.spec.containers[0].image"),
            Some("registry.example.com:5000/shop-dev/frontend:latest")
        );

        for gone in ["spec.triggers", "spec.test", "status"] {
            assert!(!d.contains(&FieldPath::parse(gone).unwrap()), "{gone} kept");
        }
        assert!(out.diagnostics.is_empty());

        // input untouched
        assert_eq!(input.kind(), Some("DeploymentConfig"));
    }

    #[test]
    fn test_source_namespace_can_be_omitted() {
        let context = RewriteContext {
            include_source_namespace: false,
            ..ctx(Some("registry.example.com:5000"))
        };
        let out = RewriteRule::Deployment.apply(&doc(DC), &context).unwrap();
        assert_eq!(
            str_at(&out.document, "spec.template.spec.containers[0].image"),
            Some("registry.example.com:5000/frontend:latest")
        );
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let once = RewriteRule::Deployment
            .apply(&doc(DC), &ctx(Some("registry.example.com:5000")))
            .unwrap()
            .document;
        let twice = RewriteRule::Deployment
            .apply(&once, &ctx(Some("registry.example.com:5000")))
            .unwrap();

        assert_eq!(twice.document, once);
        assert_eq!(
            str_at(&twice.document, "spec.template.spec.containers[0].image"),
            Some("registry.example.com:5000/shop-dev/frontend:latest")
        );
    }

    #[test]
    fn test_missing_fields_are_diagnosed_not_fatal() {
        let input = doc(
            r#"
kind: DeploymentConfig
metadata:
  name: worker
spec:
  template:
    spec:
      containers:
        - name: worker
          image: busybox
"#,
        );
        let out = RewriteRule::Deployment.apply(&input, &ctx(None)).unwrap();

        assert_eq!(out.document.kind(), Some("Deployment"));
        assert_eq!(
            str_at(&out.document, "spec.template.spec.containers[0].image"),
            Some("busybox")
        );
        let fields: Vec<_> = out
            .diagnostics
            .iter()
            .filter_map(|w| w.field.clone())
            .collect();
        assert!(fields.contains(&"spec.strategy".to_string()));
        assert!(fields.contains(&"spec.selector".to_string()));
        assert!(fields.contains(&"spec.triggers[0].imageChangeParams".to_string()));
    }

    #[test]
    fn test_missing_identity_fails() {
        let input = doc("kind: DeploymentConfig\nspec: {}\n");
        assert!(RewriteRule::Deployment.apply(&input, &ctx(None)).is_err());
    }

    #[test]
    fn test_existing_match_labels_are_kept() {
        let input = doc(
            r#"
kind: Deployment
metadata:
  name: api
spec:
  selector:
    matchLabels:
      tier: backend
    component: api
"#,
        );
        let out = RewriteRule::Deployment.apply(&input, &ctx(None)).unwrap();
        assert_eq!(str_at(&out.document, "spec.selector.matchLabels.tier"), Some("backend"));
        assert_eq!(str_at(&out.document, "spec.selector.matchLabels.component"), Some("api"));
    }

    #[test]
    fn test_service_selector() {
        let input = doc(
            r#"
apiVersion: v1
kind: Service
metadata:
  name: frontend
spec:
  selector:
    app: shop
    deploymentconfig: frontend
  ports:
    - port: 8080
"#,
        );
        let out = RewriteRule::Service.apply(&input, &ctx(None)).unwrap();
        assert_eq!(str_at(&out.document, "spec.selector.deployment"), Some("frontend"));
        assert_eq!(str_at(&out.document, "spec.selector.app"), Some("{{ .Values.name }}"));
        assert!(str_at(&out.document, "spec.selector.deploymentconfig").is_none());
        assert_eq!(out.document.label("app").as_deref(), Some("{{ .Values.name }}"));
    }

    #[test]
    fn test_parameterized_app_label_is_repointed() {
        let mut params = TemplateParameters::new();
        params.declare(crate::parameters::Parameter {
            name: "APP_NAME".into(),
            value: Some("shop".into()),
            ..Default::default()
        });
        let context = RewriteContext {
            parameters: &params,
            ..ctx(None)
        };

        let input = doc("kind: Service\nmetadata:\n  name: web\nspec:\n  selector:\n    app: ${APP_NAME}\n");
        let out = RewriteRule::Service.apply(&input, &context).unwrap();
        assert_eq!(str_at(&out.document, "spec.selector.app"), Some("{{ .Values.name }}"));
    }

    #[test]
    fn test_foreign_app_selector_is_kept() {
        let input = doc("kind: Service\nmetadata:\n  name: db\nspec:\n  selector:\n    app: postgres\n");
        let out = RewriteRule::Service.apply(&input, &ctx(None)).unwrap();
        assert_eq!(str_at(&out.document, "spec.selector.app"), Some("postgres"));
    }

    #[test]
    fn test_route_blanks_annotations() {
        let input = doc(
            r#"
kind: Route
metadata:
  name: frontend
  annotations:
    openshift.io/host.generated: "true"
spec:
  to:
    kind: Service
    name: frontend
"#,
        );
        let out = RewriteRule::Route.apply(&input, &ctx(None)).unwrap();
        assert!(
            out.document
                .get_mapping(&FieldPath::keys(&["metadata", "annotations"]))
                .unwrap()
                .is_empty()
        );
        assert_eq!(str_at(&out.document, "spec.host"), Some(""));
    }

    #[test]
    fn test_null_host_and_storage_class_are_blanked() {
        let route = doc("kind: Route\nmetadata:\n  name: web\nspec:\n  host:\n");
        let out = RewriteRule::Route.apply(&route, &ctx(None)).unwrap();
        assert_eq!(str_at(&out.document, "spec.host"), Some(""));

        let claim = doc("kind: PersistentVolumeClaim\nmetadata:\n  name: data\nspec:\n  storageClassName: ~\n");
        let out = RewriteRule::PersistentVolumeClaim.apply(&claim, &ctx(None)).unwrap();
        assert_eq!(str_at(&out.document, "spec.storageClassName"), Some(""));

        let set = doc(
            r#"
kind: StatefulSet
metadata:
  name: db
spec:
  volumeClaimTemplates:
    - spec:
        storageClassName: null
"#,
        );
        let out = RewriteRule::StatefulSet.apply(&set, &ctx(None)).unwrap();
        assert_eq!(
            str_at(&out.document, "spec.volumeClaimTemplates[0].spec.storageClassName"),
            Some("")
        );
    }

    #[test]
    fn test_statefulset_claim_templates() {
        let input = doc(
            r#"
kind: StatefulSet
metadata:
  name: db
spec:
  template:
    spec:
      containers:
        - name: db
          image: postgres:15
  volumeClaimTemplates:
    - metadata:
        name: data
      spec:
        storageClassName: fast
    - metadata:
        name: logs
      spec:
        accessModes: [ReadWriteOnce]
"#,
        );
        let out = RewriteRule::StatefulSet.apply(&input, &ctx(None)).unwrap();
        assert_eq!(
            str_at(&out.document, "spec.volumeClaimTemplates[0].spec.storageClassName"),
            Some("fast")
        );
        assert_eq!(
            str_at(&out.document, "spec.volumeClaimTemplates[1].spec.storageClassName"),
            Some("")
        );
        assert_eq!(
            str_at(&out.document, "spec.template.spec.containers[0].image"),
            Some("postgres:15")
        );
        assert!(out.diagnostics.iter().all(|w| w.severity == WarningSeverity::Info));
    }

    #[test]
    fn test_common_rule_creates_labels() {
        let input = doc("kind: CronJob\nmetadata:\n  name: cleanup\nspec: {}\n");
        let out = RewriteRule::Common.apply(&input, &ctx(None)).unwrap();
        assert_eq!(out.document.label("app").as_deref(), Some("{{ .Values.name }}"));
        assert_eq!(out.document.namespace(), Some("{{ .Release.Namespace }}"));
    }
}
