// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain layer containing core business logic and types.
//!
//! This module contains the key/value model, the merge and normalization
//! algorithms and the binder. It knows nothing about where configuration comes
//! from.

pub mod bind;
pub mod config_key;
pub mod config_value;
pub mod errors;
pub mod merge;
pub mod nested;
pub mod service;
pub mod unbind;
pub mod validate;
pub mod variables;

// Re-export commonly used types
pub use bind::{bind, from_value};
pub use config_key::KeyPath;
pub use config_value::{Map, Value};
pub use errors::{BindError, ConfigError, HookPhase, Result, ValidationError};
pub use service::ConfigurationService;
pub use unbind::{unbind, unbind_map};
pub use validate::Validate;
