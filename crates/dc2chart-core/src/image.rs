//! Container image references
//!
//! Splits `host[:port]/path/segments/name:tag` into independently
//! overridable components. Any component may be empty.

use std::fmt;

/// A container image reference split into components
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageReference {
    /// Registry host, including an optional port
    pub host: String,
    /// Path between host and repository name (may contain `/`)
    pub path: String,
    /// Repository name (last path segment)
    pub name: String,
    /// Tag or `@digest`
    pub tag: String,
}

impl ImageReference {
    /// Split an image string. Never fails: missing parts come back empty.
    pub fn parse(image: &str) -> Self {
        let image = image.trim();
        if image.is_empty() {
            return Self::default();
        }

        let mut segments: Vec<&str> = image.split('/').collect();

        let host = if segments.len() > 1 && looks_like_host(segments[0]) {
            segments.remove(0).to_string()
        } else {
            String::new()
        };

        let last = segments.pop().unwrap_or_default();
        let (name, tag) = split_tag(last);

        Self {
            host,
            path: segments.join("/"),
            name: name.to_string(),
            tag: tag.to_string(),
        }
    }

    /// Compose a reference from a registry host, an optional namespace
    /// segment and an image stream tag such as `myapp:latest`.
    pub fn from_stream(registry: Option<&str>, namespace: Option<&str>, stream_tag: &str) -> Self {
        let mut reference = Self::parse(stream_tag);

        if let Some(ns) = namespace.filter(|ns| !ns.is_empty()) {
            reference.path = if reference.path.is_empty() {
                ns.to_string()
            } else {
                format!("{}/{}", ns, reference.path)
            };
        }

        if let Some(registry) = registry.map(|r| r.trim_end_matches('/')).filter(|r| !r.is_empty()) {
            if !reference.host.is_empty() {
                reference.path = if reference.path.is_empty() {
                    reference.host.clone()
                } else {
                    format!("{}/{}", reference.host, reference.path)
                };
            }
            reference.host = registry.to_string();
        }

        reference
    }

    pub fn is_empty(&self) -> bool {
        self.host.is_empty() && self.path.is_empty() && self.name.is_empty() && self.tag.is_empty()
    }

    /// Separator placed before the tag component
    pub fn tag_separator(&self) -> &'static str {
        if self.tag.starts_with('@') { "" } else { ":" }
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for part in [&self.host, &self.path, &self.name] {
            if part.is_empty() {
                continue;
            }
            if !first {
                f.write_str("/")?;
            }
            f.write_str(part)?;
            first = false;
        }
        if !self.tag.is_empty() {
            write!(f, "{}{}", self.tag_separator(), self.tag)?;
        }
        Ok(())
    }
}

fn looks_like_host(segment: &str) -> bool {
    segment.contains('.') || segment.contains(':') || segment == "localhost"
}

fn split_tag(last: &str) -> (&str, &str) {
    if let Some(pos) = last.find('@') {
        return (&last[..pos], &last[pos..]);
    }
    match last.rfind(':') {
        Some(pos) => (&last[..pos], &last[pos + 1..]),
        None => (last, ""),
    }
}
