// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration provider trait definition.
//!
//! This module defines the `Provider` trait, the primary port for feeding
//! configuration into a [`Config`](crate::service::Config). Any source
//! (environment variables, files, embedded defaults) implements it.

use crate::domain::{Map, Result};

/// A named source of configuration.
///
/// Providers are loaded in registration order and merged so that later
/// providers override earlier ones. Keys returned by `load` may use any case;
/// the aggregator normalizes them.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow for use in multi-threaded contexts.
///
/// # Examples
///
/// ```rust
/// use mergecfg::ports::Provider;
/// use mergecfg::domain::{Map, Result, Value};
///
/// struct Defaults;
///
/// impl Provider for Defaults {
///     fn name(&self) -> &str {
///         "defaults"
///     }
///
///     fn load(&self) -> Result<Map> {
///         let mut map = Map::new();
///         map.insert("port".to_string(), Value::from(8080));
///         Ok(map)
///     }
/// }
///
/// assert_eq!(Defaults.load().unwrap().len(), 1);
/// ```
pub trait Provider: Send + Sync {
    /// Returns the name of this provider.
    ///
    /// Used for logging and error attribution. It should be stable: the
    /// aggregator recognizes a registered environment provider by its name.
    fn name(&self) -> &str;

    /// Reads the provider's current values as a nested mapping.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying source cannot be read or parsed.
    /// A failing provider aborts the whole load.
    fn load(&self) -> Result<Map>;
}

impl<P: Provider + ?Sized> Provider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn load(&self) -> Result<Map> {
        (**self).load()
    }
}
