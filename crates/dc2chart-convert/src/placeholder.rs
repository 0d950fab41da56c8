//! Placeholder expressions understood by the downstream templating engine
//!
//! The syntax is fixed: `{{ .Values.<dotted.key> }}` for values lookups and
//! `{{ .Release.Namespace }}` for the release namespace.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

/// Release namespace placeholder
pub const RELEASE_NAMESPACE: &str = "{{ .Release.Namespace }}";

/// Values key holding the application name
pub const APP_NAME_KEY: &str = "name";

/// Values group holding template parameters
pub const PARAMETERS_GROUP: &str = "parameters";

static VALUES_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*\.Values\.([A-Za-z0-9_]+(?:\.[A-Za-z0-9_]+)*)\s*\}\}").expect("valid regex")
});

/// `{{ .Values.<key> }}`
pub fn values_ref(key: &str) -> String {
    format!("{{{{ .Values.{} }}}}", key)
}

/// Placeholder for the application name
pub fn app_name() -> String {
    values_ref(APP_NAME_KEY)
}

/// Values key for a template parameter
pub fn parameter_key(name: &str) -> String {
    format!("{}.{}", PARAMETERS_GROUP, name)
}

/// Whether `text` already contains a templating expression
pub fn is_templated(text: &str) -> bool {
    text.contains("{{")
}

/// Every values key dereferenced in `text`
pub fn referenced_keys(text: &str) -> BTreeSet<String> {
    VALUES_REF
        .captures_iter(text)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_ref_syntax() {
        assert_eq!(values_ref("repository.image"), "{{ .Values.repository.image }}");
        assert_eq!(app_name(), "{{ .Values.name }}");
        assert_eq!(parameter_key("APP_NAME"), "parameters.APP_NAME");
    }

    #[test]
    fn test_referenced_keys() {
        let text = "image: {{ .Values.repository.host }}/{{ .Values.repository.image }}\n\
                    namespace: {{ .Release.Namespace }}\n\
                    replicas: {{.Values.replicas}}\n";
        let keys: Vec<_> = referenced_keys(text).into_iter().collect();
        assert_eq!(keys, vec!["replicas", "repository.host", "repository.image"]);
    }
}
