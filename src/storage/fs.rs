use crate::storage::traits::{StagedFile, Storage, StorageError, StorageResult};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Filesystem-backed output tree
pub struct FsStorage {
    root: PathBuf,
    staged_counter: AtomicU64,
    files_written: AtomicU64,
}

impl FsStorage {
    /// Opens (and creates if needed) the output root
    pub fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        ensure_dir(&root)?;

        Ok(Self {
            root,
            staged_counter: AtomicU64::new(0),
            files_written: AtomicU64::new(0),
        })
    }

    fn resolve(&self, relative: &Path) -> StorageResult<PathBuf> {
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes {
            return Err(StorageError::OutsideRoot(relative.to_path_buf()));
        }
        Ok(self.root.join(relative))
    }
}

impl Storage for FsStorage {
    fn root(&self) -> &Path {
        &self.root
    }

    fn exists(&self, relative: &Path) -> bool {
        self.resolve(relative)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    fn stage(&self, relative: &Path, contents: &[u8]) -> StorageResult<StagedFile> {
        let target = self.resolve(relative)?;
        if let Some(parent) = target.parent() {
            ensure_dir(parent)?;
        }

        let sequence = self.staged_counter.fetch_add(1, Ordering::Relaxed);
        let mut temp_name = target
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        temp_name.push(format!(".{}.{}.part", std::process::id(), sequence));
        let temp = target.with_file_name(temp_name);

        std::fs::write(&temp, contents).map_err(|source| StorageError::Write {
            path: temp.clone(),
            source,
        })?;

        Ok(StagedFile { temp, target })
    }

    fn commit(&self, staged: StagedFile) -> StorageResult<()> {
        std::fs::rename(&staged.temp, &staged.target).map_err(|source| {
            let _ = std::fs::remove_file(&staged.temp);
            StorageError::Rename {
                from: staged.temp.clone(),
                to: staged.target.clone(),
                source,
            }
        })?;
        self.files_written.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Wrote {}", staged.target.display());
        Ok(())
    }

    fn discard(&self, staged: StagedFile) {
        if let Err(e) = std::fs::remove_file(&staged.temp) {
            tracing::warn!("Failed to remove {}: {}", staged.temp.display(), e);
        }
    }

    fn files_written(&self) -> u64 {
        self.files_written.load(Ordering::Relaxed)
    }
}

/// Creates a directory and all its parents
///
/// Safe to call concurrently for overlapping paths: a directory created by
/// another worker in the meantime is not an error.
pub fn ensure_dir(path: &Path) -> StorageResult<()> {
    match std::fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(_) if path.is_dir() => Ok(()),
        Err(source) => Err(StorageError::CreateDir {
            path: path.to_path_buf(),
            source,
        }),
    }
}
