// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration keys and the dotted path model.
//!
//! Callers address the tree with dotted keys (`"Database.Host"`); a [`KeyPath`]
//! is the parsed form (`["database", "host"]`). Segments are lower-cased and
//! trimmed, so `" Database . HOST "` and `"database.host"` name the same leaf.

use std::fmt;

/// Separator between path segments in a dotted key.
pub const PATH_SEPARATOR: char = '.';

/// Normalizes a single key segment: trimmed and lower-cased.
pub fn normalize_segment(segment: &str) -> String {
    segment.trim().to_lowercase()
}

/// A parsed, normalized key path. Always has at least one segment.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Vec<String>,
}

impl KeyPath {
    /// Parses a dotted key into normalized segments.
    ///
    /// Returns `None` when the key is empty, whitespace only, or has an empty
    /// segment (`"a..b"`, `"a."`). Every accessor treats such keys as absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use mergecfg::domain::config_key::KeyPath;
    ///
    /// let path = KeyPath::parse("Database.Host").unwrap();
    /// assert_eq!(path.containers(), ["database".to_string()]);
    /// assert_eq!(path.leaf(), "host");
    ///
    /// assert!(KeyPath::parse("").is_none());
    /// assert!(KeyPath::parse("a..b").is_none());
    /// assert_eq!(KeyPath::parse(" A . b ").unwrap().to_string(), "a.b");
    /// ```
    pub fn parse(key: &str) -> Option<Self> {
        if key.trim().is_empty() {
            return None;
        }
        let segments: Vec<String> = key.split(PATH_SEPARATOR).map(normalize_segment).collect();
        if segments.iter().any(String::is_empty) {
            return None;
        }
        Some(KeyPath { segments })
    }

    /// All segments, containers first and the leaf last.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The segments naming the mappings that enclose the leaf.
    pub fn containers(&self) -> &[String] {
        &self.segments[..self.segments.len() - 1]
    }

    /// The final segment.
    pub fn leaf(&self) -> &str {
        // parse() never yields an empty path
        &self.segments[self.segments.len() - 1]
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}
