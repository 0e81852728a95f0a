// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration service trait definition.
//!
//! This module defines the `ConfigurationService` trait, the read/write surface
//! of an aggregated configuration tree. Keys are dotted paths (`database.host`)
//! and are matched case-insensitively.

use crate::domain::bind::from_value;
use crate::domain::config_value::{Map, Value};
use crate::domain::errors::{ConfigError, Result};
use serde::de::DeserializeOwned;

/// The main configuration service trait.
///
/// Every value handed out is an owned copy; changing it never changes the
/// service. Keys that are empty or contain an empty segment (`"a..b"`) are
/// treated as absent by readers and ignored by writers.
///
/// # Examples
///
/// ```rust
/// use mergecfg::domain::ConfigurationService;
/// use mergecfg::domain::config_value::{Map, Value};
/// use mergecfg::service::Config;
///
/// let config = Config::new(Vec::new());
/// config.set("server.port", Value::from(8080));
///
/// assert_eq!(config.get("Server.Port"), Some(Value::from(8080)));
/// assert!(config.get("server.host").is_none());
/// ```
pub trait ConfigurationService {
    /// Returns a copy of the value at `key`.
    ///
    /// Returns `None` when the key is absent or holds an explicit null.
    fn get(&self, key: &str) -> Option<Value>;

    /// Returns a copy of the value at `key`, including an explicit null.
    ///
    /// Use this to tell "set to null" apart from "not set".
    fn find(&self, key: &str) -> Option<Value>;

    /// Returns a deep copy of the whole tree.
    fn values(&self) -> Map;

    /// Stores `value` at `key`, creating intermediate mappings as needed and
    /// replacing whatever was there.
    ///
    /// Does nothing when an intermediate segment holds a non-mapping value.
    fn set(&self, key: &str, value: Value);

    /// Stores `value` at `key` only when nothing is stored there yet.
    fn set_default(&self, key: &str, value: Value);

    /// Returns true when `key` holds any value, including null.
    fn has(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Like [`get`](Self::get), but a missing key is an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ConfigKeyNotFound`] when the key is absent or null.
    fn require(&self, key: &str) -> Result<Value> {
        self.get(key).ok_or_else(|| ConfigError::ConfigKeyNotFound {
            key: key.to_string(),
        })
    }

    /// Converts the value at `key` with the binder's coercion rules.
    ///
    /// Returns `Ok(None)` when the key is absent or null.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TypeConversionError`] when the stored value cannot
    /// become a `T`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mergecfg::domain::ConfigurationService;
    /// use mergecfg::domain::config_value::Value;
    /// use mergecfg::service::Config;
    ///
    /// let config = Config::new(Vec::new());
    /// config.set("server.port", Value::from("8080"));
    ///
    /// let port: Option<u16> = config.get_as("server.port").unwrap();
    /// assert_eq!(port, Some(8080));
    /// ```
    fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>>
    where
        Self: Sized,
    {
        match self.get(key) {
            None => Ok(None),
            Some(value) => from_value(&value)
                .map(Some)
                .map_err(|e| ConfigError::TypeConversionError {
                    key: key.to_string(),
                    target_type: std::any::type_name::<T>().to_string(),
                    source: Box::new(e),
                }),
        }
    }
}
