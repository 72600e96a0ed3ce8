//! Storage module for persisting the mirror
//!
//! This module owns every write to the output tree:
//! - Idempotent creation of shard directories
//! - Atomic publication of files (stage, then rename)
//! - Existence checks used for resumable runs

mod fs;
mod traits;

pub use fs::{ensure_dir, FsStorage};
pub use traits::{StagedFile, Storage, StorageError, StorageResult};

use std::path::Path;

/// Opens the output tree rooted at `path`
pub fn open_storage(path: &Path) -> StorageResult<FsStorage> {
    FsStorage::new(path)
}
