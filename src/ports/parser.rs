// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration parser trait definition.
//!
//! This module defines the `ConfigParser` trait, which provides an interface for
//! parsing configuration documents in different formats (JSON, YAML, ...).

use crate::domain::{Map, Result};

/// A trait for parsing configuration documents.
///
/// Parsers keep the document's nesting: a YAML document like
///
/// ```yaml
/// database:
///   host: localhost
///   port: 5432
/// ```
///
/// becomes a mapping whose `database` entry is itself a mapping. The document
/// root must be a mapping.
///
/// # Examples
///
/// ```rust
/// use mergecfg::ports::ConfigParser;
/// use mergecfg::domain::{Map, Result, Value};
///
/// struct LineParser;
///
/// impl ConfigParser for LineParser {
///     fn parse(&self, content: &str) -> Result<Map> {
///         let mut map = Map::new();
///         for line in content.lines() {
///             if let Some((k, v)) = line.split_once(' ') {
///                 map.insert(k.to_string(), Value::from(v));
///             }
///         }
///         Ok(map)
///     }
///
///     fn supported_extensions(&self) -> &[&str] {
///         &["lines"]
///     }
/// }
///
/// let map = LineParser.parse("host localhost").unwrap();
/// assert_eq!(map.get("host"), Some(&Value::from("localhost")));
/// ```
pub trait ConfigParser: Send + Sync {
    /// Parses document text into a nested mapping.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseError`](crate::domain::ConfigError::ParseError)
    /// when the text is malformed or its root is not a mapping.
    fn parse(&self, content: &str) -> Result<Map>;

    /// Returns the file extensions (without the leading dot) this parser handles.
    fn supported_extensions(&self) -> &[&str];

    /// Returns true if `extension` is one of [`supported_extensions`](Self::supported_extensions),
    /// ignoring case.
    fn supports(&self, extension: &str) -> bool {
        self.supported_extensions()
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }
}
