//! Storage traits and error types
//!
//! This module defines the trait interface for the output tree and its
//! associated error types.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while writing the mirror
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to move {from} into place at {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("Path escapes the output root: {0}")]
    OutsideRoot(PathBuf),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A file written next to its destination but not yet visible there
///
/// Staged files are moved into place with [`Storage::commit`] or removed with
/// [`Storage::discard`].
#[derive(Debug)]
#[must_use = "a staged file must be committed or discarded"]
pub struct StagedFile {
    pub(crate) temp: PathBuf,
    pub(crate) target: PathBuf,
}

impl StagedFile {
    /// Final location of the file
    pub fn target(&self) -> &Path {
        &self.target
    }
}

/// Trait for output tree implementations
///
/// All paths are relative to the storage root. Implementations must be safe
/// to use from many workers at once, including concurrent writes below the
/// same shard directories.
pub trait Storage: Send + Sync {
    /// Root directory of the mirror
    fn root(&self) -> &Path;

    /// Returns true if a file already exists at the relative path
    fn exists(&self, relative: &Path) -> bool;

    /// Writes a complete file, creating parent directories as needed
    ///
    /// Readers never observe a partially written file.
    fn write(&self, relative: &Path, contents: &[u8]) -> StorageResult<()> {
        let staged = self.stage(relative, contents)?;
        self.commit(staged)
    }

    /// Writes the contents next to their destination without publishing them
    fn stage(&self, relative: &Path, contents: &[u8]) -> StorageResult<StagedFile>;

    /// Publishes a staged file, replacing any previous file at its target
    fn commit(&self, staged: StagedFile) -> StorageResult<()>;

    /// Drops a staged file
    fn discard(&self, staged: StagedFile);

    /// Number of files published since this storage was opened
    fn files_written(&self) -> u64;
}
