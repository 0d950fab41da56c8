//! Dot/index addressing inside YAML trees
//!
//! A [`FieldPath`] names a location such as
//! `spec.template.spec.containers[0].image` without the caller having to
//! walk the whole tree by hand.

use serde_yaml::{Mapping, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// One step of a field path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// Mapping key
    Key(String),
    /// Sequence index
    Index(usize),
}

/// Location inside a manifest document
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    /// The document root
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path made only of mapping keys
    pub fn keys(keys: &[&str]) -> Self {
        Self {
            segments: keys.iter().map(|k| Segment::Key((*k).to_string())).collect(),
        }
    }

    /// Parse a dotted path with optional `[n]` index suffixes
    pub fn parse(path: &str) -> Result<Self> {
        let invalid = |message: &str| CoreError::InvalidPath {
            path: path.to_string(),
            message: message.to_string(),
        };

        if path.is_empty() {
            return Ok(Self::root());
        }

        let mut segments = Vec::new();
        for part in path.split('.') {
            let (key, mut rest) = match part.find('[') {
                Some(pos) => (&part[..pos], &part[pos..]),
                None => (part, ""),
            };

            if key.is_empty() && rest.is_empty() {
                return Err(invalid("empty segment"));
            }
            if !key.is_empty() {
                segments.push(Segment::Key(key.to_string()));
            }

            while !rest.is_empty() {
                let close = rest.find(']').ok_or_else(|| invalid("unclosed '['"))?;
                let index = rest[1..close]
                    .parse::<usize>()
                    .map_err(|_| invalid("index is not a number"))?;
                segments.push(Segment::Index(index));
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(invalid("unexpected characters after index"));
                }
            }
        }

        Ok(Self { segments })
    }

    /// Append a mapping key
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.segments.push(Segment::Key(key.into()));
        self
    }

    /// Append a sequence index
    pub fn index(mut self, index: usize) -> Self {
        self.segments.push(Segment::Index(index));
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Path of the enclosing node, `None` at the root
    pub fn parent(&self) -> Option<FieldPath> {
        let (_, parent) = self.segments.split_last()?;
        Some(Self {
            segments: parent.to_vec(),
        })
    }

    /// Look up the node at this path
    pub fn get<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(value, |node, segment| match segment {
                Segment::Key(key) => node.as_mapping()?.get(key.as_str()),
                Segment::Index(index) => node.as_sequence()?.get(*index),
            })
    }

    /// Mutable lookup of the node at this path
    pub fn get_mut<'a>(&self, value: &'a mut Value) -> Option<&'a mut Value> {
        let mut node = value;
        for segment in &self.segments {
            node = match segment {
                Segment::Key(key) => node.as_mapping_mut()?.get_mut(key.as_str())?,
                Segment::Index(index) => node.as_sequence_mut()?.get_mut(*index)?,
            };
        }
        Some(node)
    }

    /// Write `new_value` at this path.
    ///
    /// Missing intermediate mappings (and null nodes) are created when the
    /// next step is a key. Sequence indices must already exist. Returns
    /// `false` when the path is blocked by a scalar or a short sequence.
    pub fn set(&self, value: &mut Value, new_value: Value) -> bool {
        set_in(value, &self.segments, new_value)
    }

    /// Remove the node at this path, keeping sibling order intact
    pub fn remove(&self, value: &mut Value) -> Option<Value> {
        let (last, _) = self.segments.split_last()?;
        let parent = self.parent()?.get_mut(value)?;
        match (last, parent) {
            (Segment::Key(key), Value::Mapping(map)) => remove_key(map, key),
            (Segment::Index(index), Value::Sequence(seq)) if *index < seq.len() => {
                Some(seq.remove(*index))
            }
            _ => None,
        }
    }
}

fn set_in(node: &mut Value, segments: &[Segment], new_value: Value) -> bool {
    let Some((first, rest)) = segments.split_first() else {
        *node = new_value;
        return true;
    };

    match first {
        Segment::Key(key) => {
            if node.is_null() {
                *node = Value::Mapping(Mapping::new());
            }
            let Value::Mapping(map) = node else {
                return false;
            };

            if !map.contains_key(key.as_str()) {
                match rest.first() {
                    None | Some(Segment::Key(_)) => {
                        map.insert(Value::String(key.clone()), Value::Null);
                    }
                    Some(Segment::Index(_)) => return false,
                }
            }

            match map.get_mut(key.as_str()) {
                Some(child) => set_in(child, rest, new_value),
                None => false,
            }
        }
        Segment::Index(index) => match node.as_sequence_mut().and_then(|s| s.get_mut(*index)) {
            Some(child) => set_in(child, rest, new_value),
            None => false,
        },
    }
}

/// Remove `key` from `map` without disturbing the order of the other entries
pub fn remove_key(map: &mut Mapping, key: &str) -> Option<Value> {
    if !map.contains_key(key) {
        return None;
    }

    let mut removed = None;
    for (k, v) in std::mem::take(map) {
        if removed.is_none() && k.as_str() == Some(key) {
            removed = Some(v);
        } else {
            map.insert(k, v);
        }
    }
    removed
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => write!(f, "{}", key)?,
                Segment::Key(key) => write!(f, ".{}", key)?,
                Segment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
