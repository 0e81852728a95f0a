// SPDX-License-Identifier: MIT OR Apache-2.0

//! A hexagonal architecture configuration aggregation crate.
//!
//! This crate collects configuration from several named providers (environment
//! variables, `.env` files, JSON and YAML files), merges them into one
//! hierarchical tree with a fixed override order, and binds that tree onto
//! typed records through serde.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain Layer**: Core types and algorithms (`Value`, key paths, merging,
//!   binding, errors)
//! - **Ports**: Trait definitions for the pluggable parts (`Provider`,
//!   `Extension`, `ConfigParser`, `FileSystem`)
//! - **Adapters**: Providers for specific sources and file system access
//! - **Service**: `Config`, the aggregator that orchestrates everything
//!
//! # Features
//!
//! - **Deterministic Merging**: Providers merge in registration order, later
//!   providers winning key by key
//! - **Case-Insensitive Keys**: Keys are trimmed and lower-cased on the way in
//! - **Lenient Binding**: `"8080"` binds to a `u16`, `"yes"` to a `bool`, with
//!   overflow and sign checks
//! - **Defaults**: Seed defaults from a record or a mapping without
//!   overriding loaded values
//! - **Extensible**: Add providers, parsers and load hooks by implementing a trait
//!
//! # Feature Flags
//!
//! - `json`: Enable JSON file support (default)
//! - `yaml`: Enable YAML file support (default)
//! - `dotenv`: Enable `.env` file support (default)
//! - `full`: Enable all features
//!
//! # Quick Start
//!
//! ```rust
//! use mergecfg::prelude::*;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Database {
//!     host: String,
//!     port: u16,
//! }
//!
//! #[derive(Deserialize)]
//! struct AppConfig {
//!     database: Database,
//! }
//!
//! # fn main() -> Result<()> {
//! let env = EnvProvider::with_vars([("APP_DATABASE__PORT", "6543")]).prefix("APP_");
//! let config = Config::new(vec![Box::new(env)]);
//! config.set_default("database.host", Value::from("localhost"));
//! config.load()?;
//!
//! let app: AppConfig = config.bind()?;
//! assert_eq!(app.database.host, "localhost");
//! assert_eq!(app.database.port, 6543);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

/// Commonly used types and traits.
///
/// This module re-exports the most commonly used types and traits for convenient access.
pub mod prelude {
    pub use crate::domain::{
        ConfigError, ConfigurationService, KeyPath, Map, Result, Validate, ValidationError,
        Value,
    };
    pub use crate::ports::{ConfigParser, Extension, FileSystem, LoadContext, Provider};
    pub use crate::service::{BindOptions, Config};

    // Re-export adapters based on feature flags
    #[cfg(feature = "dotenv")]
    pub use crate::adapters::DotEnvProvider;
    pub use crate::adapters::{EnvProvider, FileProvider, MemoryFileSystem, SafeFileSystem};
}
