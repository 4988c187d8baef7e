// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Codec for the fenced `key: value` metadata block at the top of a task
//! file.
//!
//! This is deliberately not YAML: only scalar string values, one per line.
//! Values may be single- or double-quoted on input; serialization writes
//! bare values and drops keys whose value is empty. Key insertion order is
//! preserved so a parse→serialize round trip leaves the block stable.

use indexmap::IndexMap;

/// Parsed metadata block. Wraps an order-preserving string map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontmatter {
    fields: IndexMap<String, String>,
}

impl Frontmatter {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Insert or overwrite a field, keeping the original position for
    /// existing keys.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Frontmatter {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// A task file split into metadata and body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub frontmatter: Frontmatter,
    pub body: String,
}

fn is_fence(line: &str) -> bool {
    line.trim_end_matches('\r') == "---"
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        if (first == b'"' || first == b'\'') && bytes[bytes.len() - 1] == first {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Split a file into its metadata block and body.
///
/// A file that does not open with a `---` fence (or never closes it) parses
/// as all-body. Lines without a colon inside the fence are ignored. The
/// body is the exact byte content after the closing fence line.
pub fn parse(content: &str) -> Document {
    let Some(rest) = content.strip_prefix("---") else {
        return Document { frontmatter: Frontmatter::default(), body: content.to_string() };
    };
    // The opening fence must be a full line
    let Some(rest) = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n")) else {
        return Document { frontmatter: Frontmatter::default(), body: content.to_string() };
    };

    let mut fields = IndexMap::new();
    let mut offset = 0;
    loop {
        let line_end = rest[offset..].find('\n').map(|i| offset + i);
        let line = match line_end {
            Some(end) => &rest[offset..end],
            None => &rest[offset..],
        };

        if is_fence(line) {
            let body_start = line_end.map(|end| end + 1).unwrap_or(rest.len());
            return Document {
                frontmatter: Frontmatter { fields },
                body: rest[body_start..].to_string(),
            };
        }

        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            if !key.is_empty() {
                let value = unquote(value.trim().trim_end_matches('\r')).to_string();
                fields.insert(key.to_string(), value);
            }
        }

        match line_end {
            Some(end) => offset = end + 1,
            // Fence never closed: treat the whole file as body
            None => {
                return Document { frontmatter: Frontmatter::default(), body: content.to_string() }
            }
        }
    }
}

/// Rebuild a task file from metadata and body.
///
/// Keys with empty values are omitted. A document whose every field is
/// empty serializes to just the body.
pub fn serialize(doc: &Document) -> String {
    let fields: Vec<(&str, &str)> = doc.frontmatter.iter().filter(|(_, v)| !v.is_empty()).collect();
    if fields.is_empty() {
        return doc.body.clone();
    }
    let mut out = String::with_capacity(doc.body.len() + 64);
    out.push_str("---\n");
    for (key, value) in fields {
        out.push_str(key);
        out.push_str(": ");
        out.push_str(value);
        out.push('\n');
    }
    out.push_str("---\n");
    out.push_str(&doc.body);
    out
}

/// Set one metadata field without touching the body.
pub fn update_field(content: &str, key: &str, value: &str) -> String {
    let mut doc = parse(content);
    doc.frontmatter.set(key, value);
    serialize(&doc)
}

#[cfg(test)]
#[path = "frontmatter_tests.rs"]
mod tests;
