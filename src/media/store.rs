use crate::media::dedup::{MediaDecision, MediaDeduplicator};
use crate::media::name::MediaName;
use crate::mirror::{FetchError, Fetcher};
use crate::paths::ShardedPath;
use crate::storage::{StagedFile, Storage, StorageError};
use std::path::Path;
use std::sync::Arc;

/// A media file referenced by a rewritten article
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRequest {
    /// Absolute URL of the requested variant
    pub url: String,
    /// Dedup key and resolution of the variant
    pub name: MediaName,
    /// Where the asset lives in the mirror
    pub path: ShardedPath,
}

/// What happened to a media request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaOutcome {
    /// First copy of the asset written
    Downloaded,
    /// A better resolution replaced the stored copy
    Upgraded,
    /// Nothing to do: already on disk or superseded
    Skipped,
}

/// Downloads media through the deduplicator into the output tree
#[derive(Clone)]
pub struct MediaStore {
    fetcher: Fetcher,
    storage: Arc<dyn Storage>,
    dedup: Arc<MediaDeduplicator>,
}

impl MediaStore {
    pub fn new(fetcher: Fetcher, storage: Arc<dyn Storage>, dedup: Arc<MediaDeduplicator>) -> Self {
        Self {
            fetcher,
            storage,
            dedup,
        }
    }

    /// The deduplication state shared by all workers
    pub fn dedup(&self) -> &MediaDeduplicator {
        &self.dedup
    }

    /// Fetches a media request unless an equal or better copy is known
    ///
    /// Requests for one base name run one at a time, so when this returns
    /// `Ok` a copy of the asset is on disk. A copy left by a previous run is
    /// kept and never replaced during this run; an upgrade always downloads
    /// and replaces the stored file.
    pub async fn download(&self, request: &MediaRequest) -> Result<MediaOutcome, FetchError> {
        let relative = request.path.relative_path();
        let base = &request.name.base;
        let resolution = request.name.resolution;

        let gate = self.dedup.gate(base);
        let _held = gate.lock().await;

        let previous = match self.dedup.decide(base, resolution) {
            MediaDecision::Skip { recorded } => {
                tracing::debug!(
                    "{} already requested at {}, skipping {}",
                    base,
                    recorded,
                    request.url
                );
                return Ok(MediaOutcome::Skipped);
            }
            MediaDecision::Fresh if self.storage.exists(&relative) => {
                tracing::info!("{} already downloaded, skipping", relative.display());
                self.dedup.adopt_existing(base);
                return Ok(MediaOutcome::Skipped);
            }
            MediaDecision::Fresh => {
                tracing::info!("Downloading {} at {}", request.url, relative.display());
                None
            }
            MediaDecision::Upgrade { previous } => {
                tracing::info!(
                    "Downloading {} at {} (replacing resolution {})",
                    request.url,
                    relative.display(),
                    previous
                );
                Some(previous)
            }
        };

        let result = self.fetch_and_publish(request, &relative).await;
        if result.is_err() {
            self.dedup.revert(base, resolution, previous);
        }
        result
    }

    async fn fetch_and_publish(
        &self,
        request: &MediaRequest,
        relative: &Path,
    ) -> Result<MediaOutcome, FetchError> {
        let body = self.fetcher.fetch_bytes(&request.url).await?;
        let staged = self
            .storage
            .stage(relative, &body)
            .map_err(|source| storage_error(request, source))?;

        let existed = self.storage.exists(relative);
        if self.publish(request, staged)? {
            Ok(if existed {
                MediaOutcome::Upgraded
            } else {
                MediaOutcome::Downloaded
            })
        } else {
            tracing::debug!(
                "{} superseded by a higher resolution, dropping {}",
                request.name.base,
                request.url
            );
            Ok(MediaOutcome::Skipped)
        }
    }

    /// Moves the staged file into place while its resolution is still the
    /// best recorded one
    fn publish(&self, request: &MediaRequest, staged: StagedFile) -> Result<bool, FetchError> {
        let mut pending = Some(staged);
        let committed = self
            .dedup
            .commit(&request.name.base, request.name.resolution, || {
                pending.take().map(|staged| self.storage.commit(staged))
            })
            .flatten();

        if let Some(staged) = pending {
            self.storage.discard(staged);
            return Ok(false);
        }

        match committed {
            Some(result) => {
                result.map_err(|source| storage_error(request, source))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn storage_error(request: &MediaRequest, source: StorageError) -> FetchError {
    FetchError::Storage {
        url: request.url.clone(),
        source,
    }
}
