//! The values model of a chart
//!
//! Keys are dotted logical names (`repository.image`, `resources.limits.cpu`)
//! stored as nested mappings so the serialized `values.yaml` mirrors their
//! grouping. Leaves are opaque strings.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;

use crate::error::{CoreError, Result};

/// Values container with dotted-key access and deep merge
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValuesModel(pub JsonValue);

impl ValuesModel {
    /// Create empty values
    pub fn new() -> Self {
        Self(JsonValue::Object(serde_json::Map::new()))
    }

    /// Parse values from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: JsonValue = serde_yaml::from_str(yaml)?;
        Ok(Self(value))
    }

    /// Serialize to a YAML document
    pub fn to_yaml(&self) -> Result<String> {
        if self.is_empty() {
            return Ok("{}\n".to_string());
        }
        Ok(serde_yaml::to_string(&self.0)?)
    }

    /// Set a literal by dotted key (e.g., "repository.tag")
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        let parts = split_key(key)?;
        set_nested(&mut self.0, &parts, JsonValue::String(value.into()))
    }

    /// Get a value by dotted key
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        let parts: Vec<&str> = key.split('.').collect();
        get_nested(&self.0, &parts)
    }

    /// Get a leaf literal by dotted key
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(JsonValue::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Whether `key` is unused and can be set without a shape conflict
    pub fn is_free(&self, key: &str) -> bool {
        let Ok(parts) = split_key(key) else {
            return false;
        };
        let mut node = &self.0;
        for part in parts {
            match node {
                JsonValue::Object(map) => match map.get(part) {
                    Some(child) => node = child,
                    None => return true,
                },
                JsonValue::Null => return true,
                _ => return false,
            }
        }
        false
    }

    /// Remove a leaf and any mappings it leaves empty
    pub fn remove(&mut self, key: &str) -> Option<JsonValue> {
        let parts: Vec<&str> = key.split('.').collect();
        remove_nested(&mut self.0, &parts)
    }

    /// Deep merge another model into this one
    ///
    /// Rules:
    /// - Scalars: overlay replaces base
    /// - Objects: recursive merge
    pub fn merge(&mut self, overlay: &ValuesModel) {
        deep_merge(&mut self.0, &overlay.0);
    }

    /// Dotted keys of every leaf, sorted
    pub fn leaf_keys(&self) -> BTreeSet<String> {
        let mut keys = BTreeSet::new();
        collect_leaf_keys(&self.0, String::new(), &mut keys);
        keys
    }

    pub fn inner(&self) -> &JsonValue {
        &self.0
    }

    /// Check if values are empty
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            JsonValue::Object(map) => map.is_empty(),
            JsonValue::Null => true,
            _ => false,
        }
    }
}

fn split_key(key: &str) -> Result<Vec<&str>> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(CoreError::Values {
            message: format!("invalid values key '{}'", key),
        });
    }
    Ok(parts)
}

/// Deep merge two JSON values
fn deep_merge(base: &mut JsonValue, overlay: &JsonValue) {
    match (base, overlay) {
        (JsonValue::Object(base_map), JsonValue::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

/// Set a nested value by path
fn set_nested(value: &mut JsonValue, path: &[&str], new_value: JsonValue) -> Result<()> {
    let Some((key, remaining)) = path.split_first() else {
        *value = new_value;
        return Ok(());
    };

    if !value.is_object() {
        if !value.is_null() {
            return Err(CoreError::Values {
                message: format!("cannot nest '{}' under a literal", key),
            });
        }
        *value = JsonValue::Object(serde_json::Map::new());
    }

    let JsonValue::Object(map) = value else {
        return Ok(());
    };

    if remaining.is_empty() {
        if map.get(*key).is_some_and(JsonValue::is_object) {
            return Err(CoreError::Values {
                message: format!("'{}' already holds nested values", key),
            });
        }
        map.insert((*key).to_string(), new_value);
        Ok(())
    } else {
        let entry = map
            .entry((*key).to_string())
            .or_insert_with(|| JsonValue::Object(serde_json::Map::new()));
        set_nested(entry, remaining, new_value)
    }
}

/// Get a nested value by path
fn get_nested<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    let Some((key, remaining)) = path.split_first() else {
        return Some(value);
    };

    match value {
        JsonValue::Object(map) => map.get(*key).and_then(|v| get_nested(v, remaining)),
        _ => None,
    }
}

fn remove_nested(value: &mut JsonValue, path: &[&str]) -> Option<JsonValue> {
    let (key, remaining) = path.split_first()?;
    let map = value.as_object_mut()?;

    if remaining.is_empty() {
        return map.remove(*key);
    }

    let child = map.get_mut(*key)?;
    let removed = remove_nested(child, remaining);
    if child.as_object().is_some_and(|m| m.is_empty()) {
        map.remove(*key);
    }
    removed
}

fn collect_leaf_keys(value: &JsonValue, prefix: String, keys: &mut BTreeSet<String>) {
    match value {
        JsonValue::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                collect_leaf_keys(child, path, keys);
            }
        }
        _ if !prefix.is_empty() => {
            keys.insert(prefix);
        }
        _ => {}
    }
}
