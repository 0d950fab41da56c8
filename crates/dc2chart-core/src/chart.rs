//! Chart.yaml metadata

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Chart API version written to every generated Chart.yaml
pub const CHART_API_VERSION: &str = "v2";

/// Helm Chart.yaml structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    /// API version (always v2)
    pub api_version: String,

    /// Chart name
    pub name: String,

    /// Chart description
    pub description: String,

    /// Chart version (SemVer)
    pub version: String,

    /// Version of the packaged application
    pub app_version: String,
}

impl ChartMetadata {
    /// Build chart metadata, validating the chart version as SemVer
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        version: impl Into<String>,
        app_version: impl Into<String>,
    ) -> Result<Self> {
        let chart = Self {
            api_version: CHART_API_VERSION.to_string(),
            name: name.into(),
            description: description.into(),
            version: version.into(),
            app_version: app_version.into(),
        };

        if chart.name.is_empty() {
            return Err(CoreError::MissingField {
                field: "name".to_string(),
            });
        }
        semver::Version::parse(&chart.version)?;

        Ok(chart)
    }

    /// Parse a Chart.yaml string
    pub fn parse(content: &str) -> Result<Self> {
        let chart: ChartMetadata = serde_yaml::from_str(content)?;
        Ok(chart)
    }

    /// Serialize to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_chart() {
        let chart = ChartMetadata::new("shop", "A Helm chart for Kubernetes", "0.1.0", "1.0.0").unwrap();
        assert_eq!(chart.api_version, "v2");
        assert_eq!(chart.name, "shop");
    }

    #[test]
    fn test_invalid_version() {
        let err = ChartMetadata::new("shop", "desc", "one", "1.0.0").unwrap_err();
        assert!(matches!(err, CoreError::InvalidVersion(_)));
    }

    #[test]
    fn test_yaml_output() {
        let chart = ChartMetadata::new("shop", "My application", "1.0.0", "2.0.0").unwrap();
        let yaml = chart.to_yaml().unwrap();

        assert!(yaml.starts_with("apiVersion: v2\n"));
        assert!(yaml.contains("name: shop"));
        assert!(yaml.contains("description: My application"));
        assert!(yaml.contains("appVersion: 2.0.0"));

        assert_eq!(ChartMetadata::parse(&yaml).unwrap(), chart);
    }
}
