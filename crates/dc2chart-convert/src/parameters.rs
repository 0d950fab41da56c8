//! Template parameters
//!
//! OpenShift templates declare `parameters` and reference them as `${NAME}`
//! (or `${{NAME}}` for non-string substitution) anywhere in their objects.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_yaml::Value;

use dc2chart_core::scalar_to_string;

/// `${NAME}` and `${{NAME}}`
pub(crate) static PARAMETER_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{\{?([A-Za-z0-9_]+)\}\}?").expect("valid regex")
});

/// One declared parameter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: Option<String>,
    pub description: Option<String>,
    pub required: bool,
    /// Set for parameters OpenShift generates (`generate: expression`)
    pub generate: Option<String>,
}

/// Parameters declared by one template, in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateParameters {
    declared: IndexMap<String, Parameter>,
}

impl TemplateParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the `parameters` sequence of a template document.
    ///
    /// Entries without a `name` are ignored.
    pub fn from_template(template: &Value) -> Self {
        let mut params = Self::new();
        let Some(entries) = template.get("parameters").and_then(Value::as_sequence) else {
            return params;
        };

        for entry in entries {
            let Some(name) = entry.get("name").and_then(Value::as_str) else {
                continue;
            };
            let text = |key: &str| entry.get(key).and_then(scalar_to_string);

            params.declare(Parameter {
                name: name.to_string(),
                value: text("value"),
                description: text("description"),
                required: entry.get("required").and_then(Value::as_bool).unwrap_or(false),
                generate: text("generate"),
            });
        }
        params
    }

    pub fn declare(&mut self, param: Parameter) {
        self.declared.insert(param.name.clone(), param);
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.declared.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }

    pub fn len(&self) -> usize {
        self.declared.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.declared.values()
    }

    /// Default value of a parameter. Declared parameters without a value
    /// default to the empty string; undeclared ones yield `None`.
    pub fn default_value(&self, name: &str) -> Option<String> {
        self.declared
            .get(name)
            .map(|p| p.value.clone().unwrap_or_default())
    }

    /// Substitute declared defaults into `text`.
    ///
    /// References to undeclared parameters are left untouched.
    pub fn resolve(&self, text: &str) -> String {
        if !text.contains("${") {
            return text.to_string();
        }
        PARAMETER_REF
            .replace_all(text, |caps: &Captures| match self.default_value(&caps[1]) {
                Some(value) => value,
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}

/// Whether `text` still contains a parameter reference
pub fn has_reference(text: &str) -> bool {
    PARAMETER_REF.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = r#"
kind: Template
parameters:
  - name: APP_NAME
    value: shop
    required: true
  - name: REPLICAS
    value: 3
  - name: SECRET
    generate: expression
  - description: nameless entries are ignored
objects: []
"#;

    #[test]
    fn test_from_template() {
        let template: Value = serde_yaml::from_str(TEMPLATE).unwrap();
        let params = TemplateParameters::from_template(&template);

        assert_eq!(params.len(), 3);
        let app = params.get("APP_NAME").unwrap();
        assert!(app.required);
        assert_eq!(app.value.as_deref(), Some("shop"));
        assert_eq!(params.default_value("REPLICAS").as_deref(), Some("3"));
        assert_eq!(params.default_value("SECRET").as_deref(), Some(""));
        assert_eq!(params.default_value("MISSING"), None);
        assert_eq!(
            params.get("SECRET").unwrap().generate.as_deref(),
            Some("expression")
        );
    }

    #[test]
    fn test_resolve() {
        let template: Value = serde_yaml::from_str(TEMPLATE).unwrap();
        let params = TemplateParameters::from_template(&template);

        assert_eq!(params.resolve("${APP_NAME}-web"), "shop-web");
        assert_eq!(params.resolve("${{REPLICAS}}"), "3");
        assert_eq!(params.resolve("${UNKNOWN}"), "${UNKNOWN}");
        assert_eq!(params.resolve("plain"), "plain");
    }

    #[test]
    fn test_has_reference() {
        assert!(has_reference("${A}"));
        assert!(has_reference("x-${{B}}"));
        assert!(!has_reference("$A {B}"));
    }
}
