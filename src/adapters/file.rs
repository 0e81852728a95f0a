// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON and YAML file configuration providers.
//!
//! A [`FileProvider`] reads one document through a [`FileSystem`] and hands
//! the text to a [`ConfigParser`]. The document keeps its nesting; only the
//! root has to be a mapping.

use super::fs::SafeFileSystem;
use crate::domain::{ConfigError, Map, Result};
#[cfg(any(feature = "json", feature = "yaml"))]
use crate::domain::Value;
use crate::ports::{ConfigParser, FileSystem, Provider};
use directories::ProjectDirs;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name reported by JSON file providers.
pub const JSON_PROVIDER_NAME: &str = "JSON";

/// Name reported by YAML file providers.
pub const YAML_PROVIDER_NAME: &str = "YAML";

#[cfg(any(feature = "json", feature = "yaml"))]
fn root_map(value: Value, format: &str) -> Result<Map> {
    match value {
        Value::Map(map) => Ok(map),
        // An empty document has no root at all
        Value::Null => Ok(Map::new()),
        other => Err(ConfigError::ParseError {
            message: format!(
                "{} document root must be a mapping, found {}",
                format,
                other.kind()
            ),
            source: None,
        }),
    }
}

/// Parser for JSON documents.
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

#[cfg(feature = "json")]
impl JsonParser {
    /// Creates a new JSON parser.
    pub fn new() -> Self {
        JsonParser
    }
}

#[cfg(feature = "json")]
impl ConfigParser for JsonParser {
    fn parse(&self, content: &str) -> Result<Map> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| ConfigError::parse_error(format!("Failed to parse JSON: {}", e), e))?;
        root_map(value, "JSON")
    }

    fn supported_extensions(&self) -> &[&str] {
        &["json"]
    }
}

/// Parser for YAML documents.
#[cfg(feature = "yaml")]
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlParser;

#[cfg(feature = "yaml")]
impl YamlParser {
    /// Creates a new YAML parser.
    pub fn new() -> Self {
        YamlParser
    }
}

#[cfg(feature = "yaml")]
impl ConfigParser for YamlParser {
    fn parse(&self, content: &str) -> Result<Map> {
        let value: Value = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::parse_error(format!("Failed to parse YAML: {}", e), e))?;
        root_map(value, "YAML")
    }

    fn supported_extensions(&self) -> &[&str] {
        &["yaml", "yml"]
    }
}

/// Configuration provider backed by a single JSON or YAML file.
///
/// Files are read through [`SafeFileSystem`] unless another
/// [`FileSystem`] is supplied, so by default only files inside the current
/// directory are accepted.
///
/// # Examples
///
/// ```rust
/// use mergecfg::adapters::{FileProvider, MemoryFileSystem};
/// use mergecfg::domain::Value;
/// use mergecfg::ports::Provider;
///
/// let fs = MemoryFileSystem::new()
///     .with_file("config.json", r#"{"database": {"host": "localhost", "port": 5432}}"#);
/// let provider = FileProvider::json("config.json").file_system(fs);
///
/// let map = provider.load().unwrap();
/// let database = map.get("database").and_then(Value::as_map).unwrap();
/// assert_eq!(database.get("port"), Some(&Value::Int(5432)));
/// ```
#[derive(Clone)]
pub struct FileProvider {
    name: String,
    path: PathBuf,
    parser: Arc<dyn ConfigParser>,
    fs: Arc<dyn FileSystem>,
    required: bool,
}

impl FileProvider {
    /// Creates a provider with an explicit parser.
    pub fn with_parser(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        parser: impl ConfigParser + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            parser: Arc::new(parser),
            fs: Arc::new(SafeFileSystem::new()),
            required: true,
        }
    }

    /// Creates a provider for a JSON file.
    #[cfg(feature = "json")]
    pub fn json(path: impl Into<PathBuf>) -> Self {
        Self::with_parser(JSON_PROVIDER_NAME, path, JsonParser::new())
    }

    /// Creates a provider for a YAML file.
    #[cfg(feature = "yaml")]
    pub fn yaml(path: impl Into<PathBuf>) -> Self {
        Self::with_parser(YAML_PROVIDER_NAME, path, YamlParser::new())
    }

    /// Creates a provider whose parser is chosen by the file extension.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::SourceError` if no enabled parser handles the
    /// extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        #[cfg(feature = "json")]
        {
            if JsonParser.supports(extension) {
                return Ok(Self::json(path));
            }
        }

        #[cfg(feature = "yaml")]
        {
            if YamlParser.supports(extension) {
                return Ok(Self::yaml(path));
            }
        }

        Err(ConfigError::source_error(
            "file",
            format!(
                "no parser available for {} (extension {:?})",
                path.display(),
                extension
            ),
            None,
        ))
    }

    /// Creates a provider for `filename` in the platform configuration
    /// directory of the application.
    ///
    /// The directory comes from `directories::ProjectDirs`, for example
    /// `~/.config/<app_name>/` on Linux. Reads are confined to that directory
    /// and a missing file loads as an empty mapping.
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined or the
    /// extension of `filename` is not supported.
    pub fn from_default_location(app_name: &str, qualifier: &str, filename: &str) -> Result<Self> {
        let project_dirs = ProjectDirs::from(qualifier, "", app_name).ok_or_else(|| {
            ConfigError::source_error(
                "file",
                "Could not determine project directories",
                None,
            )
        })?;

        let config_dir = project_dirs.config_dir();
        tracing::debug!(
            "Using configuration directory {} for {}",
            config_dir.display(),
            app_name
        );

        Ok(Self::from_path(config_dir.join(filename))?
            .file_system(SafeFileSystem::with_base_dir(config_dir))
            .required(false))
    }

    /// Sets the file system the file is read from.
    pub fn file_system(mut self, fs: impl FileSystem + 'static) -> Self {
        self.fs = Arc::new(fs);
        self
    }

    /// Sets whether a missing file is an error (default true).
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Returns the configured file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for FileProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileProvider")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

impl Provider for FileProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Map> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::source_error(
                &self.name,
                format!("{} file path is not set", self.name),
                None,
            ));
        }

        let bytes = match self.fs.read_file(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound && !self.required => {
                tracing::debug!(
                    "Optional configuration file {} not found, skipping",
                    self.path.display()
                );
                return Ok(Map::new());
            }
            Err(e) => {
                return Err(ConfigError::source_error(
                    &self.name,
                    format!("failed to read {} file {}", self.name, self.path.display()),
                    Some(Box::new(e)),
                ));
            }
        };

        let content = String::from_utf8(bytes).map_err(|e| {
            ConfigError::parse_error(
                format!("{} file {} is not valid UTF-8", self.name, self.path.display()),
                e,
            )
        })?;

        let map = self.parser.parse(&content).map_err(|e| {
            ConfigError::source_error(
                &self.name,
                format!("failed to decode {} from {}", self.name, self.path.display()),
                Some(Box::new(e)),
            )
        })?;

        tracing::debug!(
            "Loaded {} top-level keys from {}",
            map.len(),
            self.path.display()
        );

        Ok(map)
    }
}
