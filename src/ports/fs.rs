// SPDX-License-Identifier: MIT OR Apache-2.0

//! File access port used by file-backed providers.

use std::io;
use std::path::Path;

/// Reads whole files for the file-backed providers.
///
/// Abstracting the read lets providers run against an in-memory tree in tests
/// and lets applications confine reads to a directory.
pub trait FileSystem: Send + Sync {
    /// Reads the entire file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `io::ErrorKind::NotFound` when the file does not exist, so
    /// callers can treat a missing optional file as empty.
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;
}
