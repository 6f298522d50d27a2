//! File access abstractions.
//!
//! World decoding only needs to check for files and read them whole. The
//! [`FileSource`] trait covers exactly that, so worlds can be read from disk
//! or from memory.
//!
//! # Implementations
//!
//! - [`Filesystem`]: Reads from the local filesystem
//! - [`MemorySource`]: In-memory map of paths to contents

use crate::error::{Error, Result};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
};

/// Read-only access to the files of a romfs dump.
///
/// Sources are shared between worker threads while a world decodes, so
/// they must be `Send + Sync`.
pub trait FileSource: Send + Sync {
    /// Whether a file exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Read the full contents of the file at `path`.
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
}

impl<S: FileSource + ?Sized> FileSource for &S {
    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        (**self).read(path)
    }
}

/// Reads files from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct Filesystem;

impl Filesystem {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl FileSource for Filesystem {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|e| Error::io(path, e))
    }
}

/// An in-memory file source.
///
/// Files are stored in a `HashMap` protected by a `RwLock`. Clones share the
/// same storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: Arc<RwLock<HashMap<PathBuf, Vec<u8>>>>,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file.
    pub fn insert(&self, path: impl Into<PathBuf>, data: Vec<u8>) {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), data);
    }

    /// Remove a file, returning its contents if it existed.
    pub fn remove(&self, path: &Path) -> Option<Vec<u8>> {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path)
    }

    /// Number of stored files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FileSource for MemorySource {
    fn exists(&self, path: &Path) -> bool {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(path)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
            .ok_or_else(|| {
                Error::io(
                    path,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "no such file in memory"),
                )
            })
    }
}
