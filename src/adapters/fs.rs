// SPDX-License-Identifier: MIT OR Apache-2.0

//! File system adapters for the file-backed providers.
//!
//! [`SafeFileSystem`] confines reads to a base directory and refuses symlinks
//! and oversized files. [`MemoryFileSystem`] serves files from memory.

use crate::ports::FileSystem;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Maximum size of a configuration file read through [`SafeFileSystem`].
pub const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024; // 1MB

/// Reads files that live inside a base directory.
///
/// The requested path is resolved against the base directory (the current
/// working directory unless [`with_base_dir`](Self::with_base_dir) was used)
/// and normalized lexically. A read is refused when:
///
/// - the resolved path is outside the base directory (`..` escapes, foreign
///   absolute paths)
/// - the file itself is a symlink
/// - the file is larger than [`MAX_CONFIG_FILE_SIZE`]
///
/// # Examples
///
/// ```rust
/// use mergecfg::adapters::SafeFileSystem;
/// use mergecfg::ports::FileSystem;
/// use std::io::ErrorKind;
///
/// let fs = SafeFileSystem::with_base_dir("/etc/myapp");
/// let err = fs.read_file("../passwd".as_ref()).unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::PermissionDenied);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SafeFileSystem {
    base_dir: Option<PathBuf>,
}

impl SafeFileSystem {
    /// Creates a file system rooted at the current working directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a file system rooted at `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    fn base_dir(&self) -> io::Result<PathBuf> {
        match &self.base_dir {
            Some(dir) if dir.is_absolute() => Ok(normalize_path(dir)),
            Some(dir) => Ok(normalize_path(&env::current_dir()?.join(dir))),
            None => Ok(normalize_path(&env::current_dir()?)),
        }
    }

    fn resolve(&self, path: &Path) -> io::Result<PathBuf> {
        let base = self.base_dir()?;
        let resolved = normalize_path(&base.join(path));

        if !resolved.starts_with(&base) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!(
                    "unsafe file path: {} is outside {}",
                    path.display(),
                    base.display()
                ),
            ));
        }

        Ok(resolved)
    }
}

impl FileSystem for SafeFileSystem {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        let resolved = self.resolve(path)?;

        let metadata = fs::symlink_metadata(&resolved)?;
        if metadata.file_type().is_symlink() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("unsafe file path: {} is a symlink", path.display()),
            ));
        }

        // Check file size before reading to prevent DoS via large files
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "configuration file too large: {} bytes (max {} bytes)",
                    metadata.len(),
                    MAX_CONFIG_FILE_SIZE
                ),
            ));
        }

        tracing::debug!("Reading configuration file {}", resolved.display());
        fs::read(&resolved)
    }
}

/// Resolves `.` and `..` components without touching the file system.
///
/// `..` never climbs above the root, so `/../a` becomes `/a`.
fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                ) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// In-memory file tree.
///
/// # Examples
///
/// ```rust
/// use mergecfg::adapters::MemoryFileSystem;
/// use mergecfg::ports::FileSystem;
///
/// let fs = MemoryFileSystem::new().with_file("config.json", r#"{"port": 8080}"#);
/// assert_eq!(fs.read_file("config.json".as_ref()).unwrap(), br#"{"port": 8080}"#);
/// assert!(fs.read_file("missing.json".as_ref()).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    files: HashMap<PathBuf, Vec<u8>>,
}

impl MemoryFileSystem {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file, replacing any previous contents at `path`.
    pub fn with_file(mut self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Self {
        self.insert(path, contents);
        self
    }

    /// Adds a file in place.
    pub fn insert(&mut self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) {
        self.files
            .insert(normalize_path(path.as_ref()), contents.as_ref().to_vec());
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files
            .get(&normalize_path(path))
            .cloned()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("file not found: {}", path.display()),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        path
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize_path(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize_path(Path::new("a/b/..")), PathBuf::from("a"));
    }

    #[test]
    fn test_safe_fs_reads_relative_path() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "app.json", b"{}");

        let fs = SafeFileSystem::with_base_dir(dir.path());
        assert_eq!(fs.read_file(Path::new("app.json")).unwrap(), b"{}");
    }

    #[test]
    fn test_safe_fs_reads_absolute_path_inside_base() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "app.yaml", b"a: 1");

        let fs = SafeFileSystem::with_base_dir(dir.path());
        assert_eq!(fs.read_file(&path).unwrap(), b"a: 1");
    }

    #[test]
    fn test_safe_fs_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        write_file(&dir, "secret", b"x");

        let fs = SafeFileSystem::with_base_dir(&nested);
        let err = fs.read_file(Path::new("../secret")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_safe_fs_rejects_foreign_absolute_path() {
        let dir = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let path = write_file(&other, "app.json", b"{}");

        let fs = SafeFileSystem::with_base_dir(dir.path());
        let err = fs.read_file(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[cfg(unix)]
    #[test]
    fn test_safe_fs_rejects_symlink() {
        let dir = TempDir::new().unwrap();
        let target = write_file(&dir, "real.json", b"{}");
        std::os::unix::fs::symlink(&target, dir.path().join("link.json")).unwrap();

        let fs = SafeFileSystem::with_base_dir(dir.path());
        let err = fs.read_file(Path::new("link.json")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert!(err.to_string().contains("symlink"));
    }

    #[test]
    fn test_safe_fs_rejects_large_file() {
        let dir = TempDir::new().unwrap();
        let big = vec![b'a'; MAX_CONFIG_FILE_SIZE as usize + 1];
        write_file(&dir, "big.json", &big);

        let fs = SafeFileSystem::with_base_dir(dir.path());
        let err = fs.read_file(Path::new("big.json")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_safe_fs_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let fs = SafeFileSystem::with_base_dir(dir.path());
        let err = fs.read_file(Path::new("nope.json")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_memory_fs_normalizes_paths() {
        let fs = MemoryFileSystem::new().with_file("conf/app.json", "{}");
        assert_eq!(fs.read_file(Path::new("./conf/app.json")).unwrap(), b"{}");
        assert_eq!(
            fs.read_file(Path::new("conf/other.json")).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }
}
