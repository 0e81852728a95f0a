// SPDX-License-Identifier: MIT OR Apache-2.0

//! `.env` file configuration provider.
//!
//! This module provides a provider that reads `KEY=value` lines from a dotenv
//! file and nests them exactly like [`EnvProvider`](super::EnvProvider) does
//! for the process environment.

use super::fs::SafeFileSystem;
use crate::domain::variables::{normalize_variables, DEFAULT_SEPARATOR};
use crate::domain::{ConfigError, Map, Result};
use crate::ports::{FileSystem, Provider};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::io::{self, Cursor};
use std::path::PathBuf;
use std::sync::Arc;

/// Name reported by [`DotEnvProvider`].
pub const DOTENV_PROVIDER_NAME: &str = "DotEnv";

const DEFAULT_DOTENV_PATH: &str = ".env";

/// Parses dotenv content into variables.
///
/// Parsing is done by `dotenvy`: `#` comments, an optional `export` keyword,
/// single and double quotes, multi-line double-quoted values and `${VAR}`
/// substitution are supported. Later duplicates win.
///
/// # Errors
///
/// Returns `ConfigError::ParseError` for a malformed line, an unterminated
/// quote, or content that is not UTF-8.
///
/// # Examples
///
/// ```rust
/// use mergecfg::adapters::dotenv::parse_dotenv;
///
/// let vars = parse_dotenv(b"# db\nexport DB_HOST=localhost # local\nGREETING=\"hello\nworld\"\n").unwrap();
/// assert_eq!(vars["DB_HOST"], "localhost");
/// assert_eq!(vars["GREETING"], "hello\nworld");
/// ```
pub fn parse_dotenv(content: &[u8]) -> Result<BTreeMap<String, String>> {
    read_vars(content)
        .map_err(|e| ConfigError::parse_error(format!("Failed to parse dotenv content: {}", e), e))
}

fn read_vars(content: &[u8]) -> std::result::Result<BTreeMap<String, String>, dotenvy::Error> {
    dotenvy::from_read_iter(Cursor::new(content)).collect()
}

/// Configuration provider backed by a dotenv file.
///
/// # Options
///
/// - `path`: the file to read (default `.env`)
/// - `prefix`, `separator`, `normalize_names`: as for
///   [`EnvProvider`](super::EnvProvider)
/// - `require_file`: a missing file is an error (default true); when false a
///   missing file loads as an empty mapping
/// - `export_to_process`: also write every parsed variable to the process
///   environment (default true)
/// - `file_system`: where the file is read from (default [`SafeFileSystem`])
///
/// # Examples
///
/// ```rust
/// use mergecfg::adapters::{DotEnvProvider, MemoryFileSystem};
/// use mergecfg::domain::Value;
/// use mergecfg::ports::Provider;
///
/// let fs = MemoryFileSystem::new().with_file(".env", "APP_SERVER__PORT=8080\n");
/// let provider = DotEnvProvider::new()
///     .prefix("APP_")
///     .export_to_process(false)
///     .file_system(fs);
///
/// let map = provider.load().unwrap();
/// let server = map.get("server").and_then(Value::as_map).unwrap();
/// assert_eq!(server.get("port"), Some(&Value::from("8080")));
/// ```
#[derive(Clone)]
pub struct DotEnvProvider {
    path: PathBuf,
    prefix: String,
    separator: String,
    normalize_names: bool,
    require_file: bool,
    export_to_process: bool,
    fs: Arc<dyn FileSystem>,
}

impl DotEnvProvider {
    /// Creates a provider for `.env` in the current directory.
    pub fn new() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DOTENV_PATH),
            prefix: String::new(),
            separator: DEFAULT_SEPARATOR.to_string(),
            normalize_names: true,
            require_file: true,
            export_to_process: true,
            fs: Arc::new(SafeFileSystem::new()),
        }
    }

    /// Creates a provider for the file at `path`.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::new().path(path)
    }

    /// Sets the file path.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the variable name prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the nesting separator.
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Enables or disables the underscore-free alias for every name.
    pub fn normalize_names(mut self, enabled: bool) -> Self {
        self.normalize_names = enabled;
        self
    }

    /// Sets whether a missing file is an error.
    pub fn require_file(mut self, required: bool) -> Self {
        self.require_file = required;
        self
    }

    /// Sets whether parsed variables are written to the process environment.
    pub fn export_to_process(mut self, enabled: bool) -> Self {
        self.export_to_process = enabled;
        self
    }

    /// Sets the file system the file is read from.
    pub fn file_system(mut self, fs: impl FileSystem + 'static) -> Self {
        self.fs = Arc::new(fs);
        self
    }

    fn export(&self, vars: &BTreeMap<String, String>) -> Result<()> {
        for (key, value) in vars {
            if key.contains('\0') || value.contains('\0') {
                return Err(ConfigError::source_error(
                    DOTENV_PROVIDER_NAME,
                    format!("failed to set process environment variable {}", key),
                    None,
                ));
            }
            env::set_var(key, value);
        }
        Ok(())
    }
}

impl Default for DotEnvProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DotEnvProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DotEnvProvider")
            .field("path", &self.path)
            .field("prefix", &self.prefix)
            .field("separator", &self.separator)
            .field("normalize_names", &self.normalize_names)
            .field("require_file", &self.require_file)
            .field("export_to_process", &self.export_to_process)
            .finish_non_exhaustive()
    }
}

impl Provider for DotEnvProvider {
    fn name(&self) -> &str {
        DOTENV_PROVIDER_NAME
    }

    fn load(&self) -> Result<Map> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::source_error(
                DOTENV_PROVIDER_NAME,
                ".env file path is not set",
                None,
            ));
        }

        let bytes = match self.fs.read_file(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound && !self.require_file => {
                tracing::debug!(
                    "Optional dotenv file {} not found, skipping",
                    self.path.display()
                );
                return Ok(Map::new());
            }
            Err(e) => {
                return Err(ConfigError::source_error(
                    DOTENV_PROVIDER_NAME,
                    format!("failed to read .env file {}", self.path.display()),
                    Some(Box::new(e)),
                ));
            }
        };

        let vars = read_vars(&bytes).map_err(|e| {
            ConfigError::parse_error(
                format!("failed to parse .env file {}: {}", self.path.display(), e),
                e,
            )
        })?;
        if self.export_to_process {
            self.export(&vars)?;
        }

        tracing::debug!(
            "Loaded {} variables from {}",
            vars.len(),
            self.path.display()
        );

        Ok(normalize_variables(
            vars,
            &self.prefix,
            &self.separator,
            self.normalize_names,
        ))
    }
}
