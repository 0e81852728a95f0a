// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service layer containing the configuration aggregator.
//!
//! This module contains the concrete implementation of the `ConfigurationService`
//! trait, which provides the main interface for loading, reading and binding
//! configuration values.

pub mod config;

// Re-export commonly used types
pub use config::{BindOptions, Config, ConfigBuilder};
