// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ports layer containing trait definitions.
//!
//! This module contains the trait definitions (ports) that define the interfaces
//! for the pluggable parts of the configuration system. These traits are
//! implemented by adapters in the adapters layer.

pub mod extension;
pub mod fs;
pub mod parser;
pub mod provider;

// Re-export commonly used types
pub use extension::{Extension, LoadContext};
pub use fs::FileSystem;
pub use parser::ConfigParser;
pub use provider::Provider;
