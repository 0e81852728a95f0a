// SPDX-License-Identifier: MIT OR Apache-2.0

//! Load lifecycle hooks.
//!
//! Extensions run around the provider merge in [`Config::load`]: every
//! `pre_load` hook before the first provider is read, every `post_load` hook
//! after the merged tree is in place. Hooks receive the configuration service
//! and may read or write it.
//!
//! [`Config::load`]: crate::service::Config::load

use crate::domain::{ConfigurationService, Result};
use std::collections::BTreeMap;

/// String attributes passed to every hook of one load.
///
/// # Examples
///
/// ```rust
/// use mergecfg::ports::LoadContext;
///
/// let ctx = LoadContext::new().with_value("profile", "test");
/// assert_eq!(ctx.value("profile"), Some("test"));
/// assert_eq!(ctx.value("region"), None);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadContext {
    values: BTreeMap<String, String>,
}

impl LoadContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attribute, replacing any previous value for `key`.
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Looks up an attribute.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// A named pair of hooks invoked around the provider merge.
///
/// Both hooks default to doing nothing. A hook error aborts the load.
///
/// # Examples
///
/// ```rust
/// use mergecfg::domain::{ConfigurationService, Result, Value};
/// use mergecfg::ports::{Extension, LoadContext};
///
/// struct Stamp;
///
/// impl Extension for Stamp {
///     fn name(&self) -> &str {
///         "stamp"
///     }
///
///     fn post_load(&self, ctx: &LoadContext, config: &dyn ConfigurationService) -> Result<()> {
///         let profile = ctx.value("profile").unwrap_or("default");
///         config.set("meta.profile", Value::from(profile));
///         Ok(())
///     }
/// }
/// ```
pub trait Extension: Send + Sync {
    /// Returns the name used in logs and error messages.
    fn name(&self) -> &str;

    /// Runs before any provider is loaded.
    fn pre_load(&self, _ctx: &LoadContext, _config: &dyn ConfigurationService) -> Result<()> {
        Ok(())
    }

    /// Runs after every provider has been merged.
    fn post_load(&self, _ctx: &LoadContext, _config: &dyn ConfigurationService) -> Result<()> {
        Ok(())
    }
}
