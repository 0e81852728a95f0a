// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapters layer containing provider and file system implementations.
//!
//! This module contains concrete implementations of the traits defined in the
//! ports layer. Each provider implements the `Provider` trait to supply one
//! mapping to the merge.

#[cfg(feature = "dotenv")]
pub mod dotenv;
pub mod env_var;
pub mod file;
pub mod fs;

// Re-export adapters based on feature flags
#[cfg(feature = "dotenv")]
pub use dotenv::DotEnvProvider;
pub use env_var::EnvProvider;
pub use file::FileProvider;
#[cfg(feature = "json")]
pub use file::JsonParser;
#[cfg(feature = "yaml")]
pub use file::YamlParser;
pub use fs::{MemoryFileSystem, SafeFileSystem};
