// SPDX-License-Identifier: MIT OR Apache-2.0

//! Environment variable configuration provider.
//!
//! This module provides a provider that reads configuration values from
//! environment variables and nests them by a separator:
//!
//! ```text
//! APP_DATABASE__HOST=db   (prefix "APP_")  ->  database.host = "db"
//! ```

use crate::domain::variables::{normalize_variables, DEFAULT_SEPARATOR};
use crate::domain::{Map, Result};
use crate::ports::Provider;
use std::env;

/// Name reported by [`EnvProvider`]. [`Config::new`](crate::service::Config::new)
/// looks for it to decide whether an environment provider is already registered.
pub const ENV_PROVIDER_NAME: &str = "Environment Variables";

/// Maximum length for environment variable names (in bytes).
const MAX_ENV_KEY_LEN: usize = 512;

/// Maximum length for environment variable values (in bytes).
const MAX_ENV_VALUE_LEN: usize = 1048576; // 1MB

/// Configuration provider backed by environment variables.
///
/// Variables are read fresh on every load. Session variables such as `PATH`
/// and `HOME` are never loaded (see
/// [`is_denied_variable`](crate::domain::variables::is_denied_variable)).
///
/// # Options
///
/// - `prefix`: only variables starting with it are loaded, and it is removed
///   from the key (case-insensitive, default none)
/// - `separator`: splits names into nested keys (default `"__"`)
/// - `normalize_names`: also expose `MAX_CONNS` as `maxconns` (default true)
///
/// # Examples
///
/// ```rust
/// use mergecfg::adapters::EnvProvider;
/// use mergecfg::domain::Value;
/// use mergecfg::ports::Provider;
///
/// let provider = EnvProvider::with_vars([("APP_DATABASE__HOST", "db"), ("OTHER", "x")])
///     .prefix("APP_");
///
/// let map = provider.load().unwrap();
/// let database = map.get("database").and_then(Value::as_map).unwrap();
/// assert_eq!(database.get("host"), Some(&Value::from("db")));
/// assert!(!map.contains_key("other"));
/// ```
#[derive(Debug, Clone)]
pub struct EnvProvider {
    prefix: String,
    separator: String,
    normalize_names: bool,
    vars: Option<Vec<(String, String)>>,
}

impl EnvProvider {
    /// Creates a provider over the process environment with default options.
    pub fn new() -> Self {
        Self {
            prefix: String::new(),
            separator: DEFAULT_SEPARATOR.to_string(),
            normalize_names: true,
            vars: None,
        }
    }

    /// Creates a provider that only loads variables starting with `prefix`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self::new().prefix(prefix)
    }

    /// Creates a provider over a fixed set of variables instead of the process
    /// environment.
    ///
    /// This is primarily useful for testing.
    pub fn with_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: Some(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            ..Self::new()
        }
    }

    /// Sets the variable name prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the nesting separator. An empty separator keeps names flat.
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Enables or disables the underscore-free alias for every name.
    pub fn normalize_names(mut self, enabled: bool) -> Self {
        self.normalize_names = enabled;
        self
    }

    fn read_vars(&self) -> Vec<(String, String)> {
        let raw: Vec<(String, String)> = match &self.vars {
            Some(vars) => vars.clone(),
            None => env::vars_os()
                .filter_map(|(k, v)| match (k.into_string(), v.into_string()) {
                    (Ok(k), Ok(v)) => Some((k, v)),
                    (k, _) => {
                        tracing::debug!(
                            "Skipping non-UTF-8 environment variable: {:?}",
                            k.map_or_else(|os| os.to_string_lossy().into_owned(), |s| s)
                        );
                        None
                    }
                })
                .collect(),
        };

        raw.into_iter()
            .filter(|(key, value)| {
                // Validate input sizes to prevent DoS
                let fits = key.len() <= MAX_ENV_KEY_LEN && value.len() <= MAX_ENV_VALUE_LEN;
                if !fits {
                    tracing::debug!(
                        "Skipping oversized environment variable: key_len={}, value_len={} (max key={}, max value={})",
                        key.len(),
                        value.len(),
                        MAX_ENV_KEY_LEN,
                        MAX_ENV_VALUE_LEN
                    );
                }
                fits
            })
            .collect()
    }
}

impl Default for EnvProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for EnvProvider {
    fn name(&self) -> &str {
        ENV_PROVIDER_NAME
    }

    fn load(&self) -> Result<Map> {
        let vars = self.read_vars();
        let count = vars.len();
        let map = normalize_variables(vars, &self.prefix, &self.separator, self.normalize_names);

        tracing::debug!(
            "Loaded {} environment variables into {} top-level keys (prefix={:?}, separator={:?}, normalize={})",
            count,
            map.len(),
            self.prefix,
            self.separator,
            self.normalize_names
        );

        Ok(map)
    }
}
