//! Resource kinds known to the converter

use phf::phf_map;
use std::fmt;

/// Kinds with a dedicated conversion rule.
///
/// Anything else that carries a `kind` is converted as [`ResourceKind::Other`]
/// and only gets the common namespace/label normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    DeploymentConfig,
    Deployment,
    Service,
    Route,
    CronJob,
    PersistentVolumeClaim,
    StatefulSet,
    Other(String),
}

static KNOWN_KINDS: phf::Map<&'static str, ResourceKind> = phf_map! {
    "DeploymentConfig" => ResourceKind::DeploymentConfig,
    "Deployment" => ResourceKind::Deployment,
    "Service" => ResourceKind::Service,
    "Route" => ResourceKind::Route,
    "CronJob" => ResourceKind::CronJob,
    "PersistentVolumeClaim" => ResourceKind::PersistentVolumeClaim,
    "StatefulSet" => ResourceKind::StatefulSet,
};

impl ResourceKind {
    /// Classify a `kind` discriminant
    pub fn from_kind(kind: &str) -> Self {
        KNOWN_KINDS
            .get(kind)
            .cloned()
            .unwrap_or_else(|| ResourceKind::Other(kind.to_string()))
    }

    /// The `kind` string as it appears in manifests
    pub fn as_str(&self) -> &str {
        match self {
            Self::DeploymentConfig => "DeploymentConfig",
            Self::Deployment => "Deployment",
            Self::Service => "Service",
            Self::Route => "Route",
            Self::CronJob => "CronJob",
            Self::PersistentVolumeClaim => "PersistentVolumeClaim",
            Self::StatefulSet => "StatefulSet",
            Self::Other(kind) => kind,
        }
    }

    /// Kind after conversion (`DeploymentConfig` becomes `Deployment`)
    pub fn target(&self) -> ResourceKind {
        match self {
            Self::DeploymentConfig => Self::Deployment,
            other => other.clone(),
        }
    }

    /// Lowercase form used in file names, e.g. `deploymentconfig`
    pub fn file_suffix(&self) -> String {
        self.as_str().to_ascii_lowercase()
    }

    /// Whether the kind runs pods from a pod template
    pub fn is_workload(&self) -> bool {
        matches!(
            self,
            Self::DeploymentConfig | Self::Deployment | Self::StatefulSet
        )
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_kind() {
        assert_eq!(
            ResourceKind::from_kind("DeploymentConfig"),
            ResourceKind::DeploymentConfig
        );
        assert_eq!(ResourceKind::from_kind("Route"), ResourceKind::Route);
        assert_eq!(
            ResourceKind::from_kind("ConfigMap"),
            ResourceKind::Other("ConfigMap".to_string())
        );
    }

    #[test]
    fn test_target_and_suffix() {
        assert_eq!(
            ResourceKind::DeploymentConfig.target(),
            ResourceKind::Deployment
        );
        assert_eq!(ResourceKind::Service.target(), ResourceKind::Service);
        assert_eq!(
            ResourceKind::PersistentVolumeClaim.file_suffix(),
            "persistentvolumeclaim"
        );
        assert_eq!(
            ResourceKind::Other("ConfigMap".into()).file_suffix(),
            "configmap"
        );
    }
}
