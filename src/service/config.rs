// SPDX-License-Identifier: MIT OR Apache-2.0

//! The configuration aggregator.
//!
//! [`Config`] owns the merged configuration tree. Providers are folded into it
//! by [`Config::load`], callers seed or override it through the
//! [`ConfigurationService`] setters, and typed records are pulled out of it
//! with [`Config::bind`].

use crate::adapters::env_var::{EnvProvider, ENV_PROVIDER_NAME};
use crate::adapters::FileProvider;
use crate::domain::bind::bind;
use crate::domain::merge::{lowercase_keys, merge, merge_without_override, normalize_value};
use crate::domain::nested::{find_nested_map, find_nested_map_mut};
use crate::domain::unbind::{unbind, unbind_map};
use crate::domain::{
    ConfigError, ConfigurationService, HookPhase, KeyPath, Map, Result, Validate, Value,
};
use crate::ports::{Extension, LoadContext, Provider};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Options for [`Config::bind_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindOptions {
    /// Run [`Validate::validate`] on the bound record (default true).
    pub validate_after_bind: bool,
}

impl BindOptions {
    /// Returns the default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables validation after binding.
    pub fn validate(mut self, enabled: bool) -> Self {
        self.validate_after_bind = enabled;
        self
    }
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            validate_after_bind: true,
        }
    }
}

/// Aggregated configuration from an ordered list of providers.
///
/// Providers are merged in registration order, so a later provider overrides
/// an earlier one key by key. Unless one of the providers is already named
/// [`ENV_PROVIDER_NAME`], an [`EnvProvider`] with default options is registered
/// first, giving every other provider precedence over the bare environment.
///
/// All reads return copies. A `Config` can be shared between threads; readers
/// never observe a half-merged tree.
///
/// # Examples
///
/// ```rust
/// use mergecfg::adapters::EnvProvider;
/// use mergecfg::domain::ConfigurationService;
/// use mergecfg::service::Config;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Server {
///     host: String,
///     port: u16,
/// }
///
/// #[derive(Deserialize)]
/// struct AppConfig {
///     server: Server,
/// }
///
/// let env = EnvProvider::with_vars([("APP_SERVER__PORT", "9090")]).prefix("APP_");
/// let config = Config::new(vec![Box::new(env)]);
/// config.set_default("server.host", "localhost".into());
/// config.set_default("server.port", 8080.into());
/// config.load().unwrap();
///
/// let app: AppConfig = config.bind().unwrap();
/// assert_eq!(app.server.host, "localhost");
/// assert_eq!(app.server.port, 9090);
/// ```
pub struct Config {
    providers: Vec<Box<dyn Provider>>,
    extensions: Vec<Box<dyn Extension>>,
    values: RwLock<Map>,
}

impl Config {
    /// Creates a configuration over `providers`.
    pub fn new(mut providers: Vec<Box<dyn Provider>>) -> Self {
        if !providers.iter().any(|p| p.name() == ENV_PROVIDER_NAME) {
            providers.insert(0, Box::new(EnvProvider::new()));
        }

        Self {
            providers,
            extensions: Vec::new(),
            values: RwLock::new(Map::new()),
        }
    }

    /// Creates a builder for constructing a configuration.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Creates a configuration with sensible defaults for an application.
    ///
    /// Reads `config.yaml` (when the `yaml` feature is enabled) from the
    /// platform configuration directory, then the environment variables
    /// prefixed with the upper-cased application name and `_`, which win.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration directory cannot be determined.
    pub fn with_defaults(app_name: &str, qualifier: &str) -> Result<Self> {
        #[allow(unused_mut)]
        let mut builder = Self::builder();

        #[cfg(feature = "yaml")]
        {
            builder = builder.with_provider(FileProvider::from_default_location(
                app_name,
                qualifier,
                "config.yaml",
            )?);
        }
        #[cfg(not(feature = "yaml"))]
        let _ = qualifier;

        let prefix = format!("{}_", app_name.to_uppercase());
        Ok(builder.with_env_prefix(prefix).build())
    }

    /// Registers an extension. Extensions run in registration order.
    pub fn with_extension(mut self, extension: impl Extension + 'static) -> Self {
        self.extensions.push(Box::new(extension));
        self
    }

    /// Registers several extensions.
    pub fn with_extensions(
        mut self,
        extensions: impl IntoIterator<Item = Box<dyn Extension>>,
    ) -> Self {
        self.extensions.extend(extensions);
        self
    }

    /// Returns the names of the registered providers in merge order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Seeds defaults from a mapping or a serializable record.
    ///
    /// Keys already present are kept; nested mappings are filled in key by
    /// key. Record fields are keyed by their serialized names, lower-cased.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::NilValues`] when `values` serializes to nothing
    ///   (`None`, `()`)
    /// - [`ConfigError::InvalidDefaults`] when it is neither a mapping nor a record
    /// - [`ConfigError::Bind`] when serialization fails
    pub fn set_defaults<T: Serialize + ?Sized>(&self, values: &T) -> Result<()> {
        let mut defaults = match unbind(values)? {
            Value::Map(map) => map,
            Value::Null => return Err(ConfigError::NilValues),
            other => {
                return Err(ConfigError::InvalidDefaults {
                    found: other.kind(),
                })
            }
        };
        lowercase_keys(&mut defaults);

        let mut tree = self.write();
        merge_without_override(&mut tree, defaults);
        Ok(())
    }

    /// Runs every provider and merges the results. See
    /// [`load_with_context`](Self::load_with_context).
    pub fn load(&self) -> Result<()> {
        self.load_with_context(&LoadContext::new())
    }

    /// Runs the extension hooks and providers, merging provider results into
    /// the tree.
    ///
    /// 1. every extension's `pre_load` hook, in registration order
    /// 2. every provider's `load`, in registration order
    /// 3. all provider results merged into the tree at once, later providers
    ///    winning
    /// 4. every extension's `post_load` hook
    ///
    /// # Errors
    ///
    /// The first failure aborts the load:
    /// [`ConfigError::ExtensionHookFailed`] for a hook and
    /// [`ConfigError::ProviderLoadFailed`] for a provider. A failing provider
    /// leaves the tree untouched.
    pub fn load_with_context(&self, ctx: &LoadContext) -> Result<()> {
        self.run_hooks(ctx, HookPhase::PreLoad)?;

        let mut loaded = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let map = provider
                .load()
                .map_err(|e| ConfigError::ProviderLoadFailed {
                    provider: provider.name().to_string(),
                    source: Box::new(e),
                })?;
            tracing::debug!(
                "Provider '{}' returned {} top-level keys",
                provider.name(),
                map.len()
            );
            loaded.push(map);
        }

        {
            let mut tree = self.write();
            for map in loaded {
                merge(&mut tree, map);
            }
            tracing::debug!(
                "Merged {} providers into {} top-level keys",
                self.providers.len(),
                tree.len()
            );
        }

        self.run_hooks(ctx, HookPhase::PostLoad)
    }

    fn run_hooks(&self, ctx: &LoadContext, phase: HookPhase) -> Result<()> {
        for extension in &self.extensions {
            let result = match phase {
                HookPhase::PreLoad => extension.pre_load(ctx, self),
                HookPhase::PostLoad => extension.post_load(ctx, self),
            };
            result.map_err(|e| ConfigError::ExtensionHookFailed {
                extension: extension.name().to_string(),
                phase,
                source: Box::new(e),
            })?;
        }
        Ok(())
    }

    /// Binds the tree onto a new `T`.
    ///
    /// Keys match field names exactly first and case-insensitively second;
    /// keys with no matching field are ignored. Missing fields follow serde:
    /// `Option` fields become `None`, `#[serde(default)]` fields take their
    /// default, and any other missing field is an error.
    ///
    /// This is the unvalidated bind. [`bind_with`](Self::bind_with) with
    /// [`BindOptions::default()`] binds and then runs [`Validate`], which is
    /// the usual entry point for records that check themselves.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Bind`] naming the first field that could not be
    /// converted.
    pub fn bind<T: DeserializeOwned>(&self) -> Result<T> {
        let tree = self.read();
        Ok(bind(&tree)?)
    }

    /// Binds the tree onto a new `T` and validates it.
    ///
    /// Validation runs unless `options.validate_after_bind` is false, so
    /// `bind_with::<T>(BindOptions::default())` always validates.
    ///
    /// # Errors
    ///
    /// As [`bind`](Self::bind), plus [`ConfigError::Validation`] when
    /// validation is enabled and the record rejects itself.
    pub fn bind_with<T: DeserializeOwned + Validate>(&self, options: BindOptions) -> Result<T> {
        let value: T = self.bind()?;
        if options.validate_after_bind {
            value.validate()?;
        }
        Ok(value)
    }

    /// Binds the tree onto an existing record.
    ///
    /// Fields the tree has no value for keep their current value. `dest` is
    /// only replaced when the whole bind succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Bind`] when `dest` is not a record or a field
    /// could not be converted.
    pub fn bind_into<T: Serialize + DeserializeOwned>(&self, dest: &mut T) -> Result<()> {
        let mut base = unbind_map(dest)?;
        lowercase_keys(&mut base);
        merge(&mut base, self.values());

        *dest = bind(&base)?;
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, Map> {
        self.values.read().unwrap_or_else(|poisoned| {
            tracing::warn!("Configuration lock was poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, Map> {
        self.values.write().unwrap_or_else(|poisoned| {
            tracing::warn!("Configuration lock was poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    fn with_leaf_map(&self, key: &str, apply: impl FnOnce(&mut Map, &str)) {
        let Some(path) = KeyPath::parse(key) else {
            tracing::debug!("Ignoring write to invalid key {:?}", key);
            return;
        };

        let mut tree = self.write();
        match find_nested_map_mut(&mut tree, path.containers(), true) {
            Some(map) => apply(map, path.leaf()),
            None => tracing::debug!("Ignoring write to {}: path is blocked by a value", path),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let extensions: Vec<&str> = self.extensions.iter().map(|e| e.name()).collect();
        f.debug_struct("Config")
            .field("providers", &self.provider_names())
            .field("extensions", &extensions)
            .field("values", &*self.read())
            .finish()
    }
}

impl ConfigurationService for Config {
    fn get(&self, key: &str) -> Option<Value> {
        self.find(key).filter(|value| !value.is_null())
    }

    fn find(&self, key: &str) -> Option<Value> {
        let path = KeyPath::parse(key)?;
        let tree = self.read();
        find_nested_map(&tree, path.containers())?
            .get(path.leaf())
            .cloned()
    }

    fn values(&self) -> Map {
        self.read().clone()
    }

    fn set(&self, key: &str, value: Value) {
        self.with_leaf_map(key, |map, leaf| {
            map.insert(leaf.to_string(), normalize_value(value));
        });
    }

    fn set_default(&self, key: &str, value: Value) {
        self.with_leaf_map(key, |map, leaf| {
            map.entry(leaf.to_string())
                .or_insert_with(|| normalize_value(value));
        });
    }
}

/// Builder for [`Config`].
///
/// # Examples
///
/// ```rust,no_run
/// use mergecfg::service::Config;
///
/// let config = Config::builder()
///     .with_yaml_file("config.yaml")
///     .with_dotenv_file(".env")
///     .with_env_prefix("APP_")
///     .build();
/// config.load().unwrap();
/// ```
#[derive(Default)]
pub struct ConfigBuilder {
    providers: Vec<Box<dyn Provider>>,
    extensions: Vec<Box<dyn Extension>>,
}

impl ConfigBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a provider. Later providers win.
    pub fn with_provider(mut self, provider: impl Provider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Appends an environment provider for variables starting with `prefix`.
    ///
    /// This replaces the default, unprefixed environment provider.
    pub fn with_env_prefix(self, prefix: impl Into<String>) -> Self {
        self.with_provider(EnvProvider::with_prefix(prefix))
    }

    /// Appends a JSON file provider.
    #[cfg(feature = "json")]
    pub fn with_json_file(self, path: impl Into<PathBuf>) -> Self {
        self.with_provider(FileProvider::json(path))
    }

    /// Appends a YAML file provider.
    #[cfg(feature = "yaml")]
    pub fn with_yaml_file(self, path: impl Into<PathBuf>) -> Self {
        self.with_provider(FileProvider::yaml(path))
    }

    /// Appends a dotenv file provider.
    #[cfg(feature = "dotenv")]
    pub fn with_dotenv_file(self, path: impl Into<PathBuf>) -> Self {
        use crate::adapters::DotEnvProvider;
        self.with_provider(DotEnvProvider::from_file(path))
    }

    /// Registers an extension.
    pub fn with_extension(mut self, extension: impl Extension + 'static) -> Self {
        self.extensions.push(Box::new(extension));
        self
    }

    /// Builds the configuration. Nothing is loaded yet.
    pub fn build(self) -> Config {
        Config::new(self.providers).with_extensions(self.extensions)
    }
}
