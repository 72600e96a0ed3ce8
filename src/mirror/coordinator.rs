//! Mirror coordinator - main run orchestration logic
//!
//! A run goes through these steps:
//! 1. Resolve the site metadata
//! 2. Build and validate the catalogs
//! 3. Save the shared assets
//! 4. Mirror the articles with bounded concurrency
//! 5. Write the redirect stubs
//! 6. Write the entry point
//!
//! Every step skips outputs that already exist, so an interrupted run is
//! resumed by running it again.

use crate::catalog::{fetch_site_info, CatalogBuilder, Catalogs, SiteInfo};
use crate::config::Config;
use crate::media::{MediaDeduplicator, MediaStore};
use crate::mirror::{AssetSaver, Fetcher};
use crate::output::{MirrorStatistics, RunCounters};
use crate::paths::{path_for, ResourceKind, INDEX_DEPTH, INDEX_PATH};
use crate::state::{ArticleProgress, ArticleState};
use crate::storage::{open_storage, Storage};
use crate::transform::{index_stub, redirect_stub, Transformer};
use crate::{ConfigError, MirrorError};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Number of articles between two progress lines
const PROGRESS_INTERVAL: u64 = 10;

/// Main mirror coordinator
pub struct Mirror {
    config: Arc<Config>,
    fetcher: Fetcher,
    storage: Arc<dyn Storage>,
}

/// Everything an article worker needs, shared read-only
struct ArticleContext {
    fetcher: Fetcher,
    storage: Arc<dyn Storage>,
    transformer: Transformer,
    media: MediaStore,
    counters: Arc<RunCounters>,
    rendering_url: String,
    media_enabled: bool,
}

impl Mirror {
    /// Creates a mirror writing below the configured output directory
    ///
    /// # Arguments
    ///
    /// * `config` - The validated run configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Mirror)` - Ready to run
    /// * `Err(MirrorError)` - The HTTP client or the output tree could not be set up
    pub fn new(config: Config) -> Result<Self, MirrorError> {
        let storage = open_storage(Path::new(&config.mirror.output_dir))?;
        Self::with_storage(config, Arc::new(storage))
    }

    /// Creates a mirror writing into `storage`
    pub fn with_storage(config: Config, storage: Arc<dyn Storage>) -> Result<Self, MirrorError> {
        let fetcher = Fetcher::from_config(&config)?;
        Ok(Self {
            config: Arc::new(config),
            fetcher,
            storage,
        })
    }

    /// The output tree
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Resolves the site metadata and builds the validated catalogs
    pub async fn build_catalogs(&self) -> Result<(SiteInfo, Catalogs), MirrorError> {
        let site = fetch_site_info(&self.fetcher, &self.config).await?;
        let namespaces = site.mirrored_namespaces(&self.config.mirror.namespaces)?;

        let builder = CatalogBuilder::new(
            self.fetcher.clone(),
            self.config.remote.api_url.clone(),
            self.config.mirror.max_concurrent_requests as usize,
        );
        let catalogs = builder
            .build(&namespaces, self.config.mirror.articles.as_deref())
            .await?;

        tracing::info!(
            "Catalogs built: {} articles, {} redirects",
            catalogs.articles().len(),
            catalogs.redirects().len()
        );
        Ok((site, catalogs))
    }

    /// Runs the whole mirror
    ///
    /// The first fatal error stops the admission of new articles; articles
    /// already in flight are finished before the error is returned.
    pub async fn run(&self) -> Result<MirrorStatistics, MirrorError> {
        let counters = Arc::new(RunCounters::new());

        let (site, catalogs) = self.build_catalogs().await?;
        counters.set_totals(catalogs.articles().len(), catalogs.redirects().len());
        let catalogs = Arc::new(catalogs);

        let transformer = Transformer::from_config(&self.config, &site, Arc::clone(&catalogs))
            .map_err(|source| ConfigError::InvalidUrl(source.to_string()))?;

        let assets = AssetSaver::new(self.fetcher.clone(), Arc::clone(&self.storage));
        let written = assets
            .save_all(&transformer.source_url(&site.main_page))
            .await?;
        counters.assets_written(written);

        let context = Arc::new(ArticleContext {
            fetcher: self.fetcher.clone(),
            storage: Arc::clone(&self.storage),
            transformer,
            media: MediaStore::new(
                self.fetcher.clone(),
                Arc::clone(&self.storage),
                Arc::new(MediaDeduplicator::new()),
            ),
            counters: Arc::clone(&counters),
            rendering_url: self.config.remote.rendering_url.clone(),
            media_enabled: self.config.mirror.media,
        });
        self.mirror_articles(&catalogs, context).await?;

        self.write_redirects(&catalogs, &counters)?;
        self.write_index(&catalogs, &site.main_page, &counters)?;

        let stats = counters.snapshot(self.storage.files_written());
        tracing::info!(
            "Mirror complete: {} articles written, {} skipped in {:.1}s",
            stats.articles_persisted,
            stats.articles_skipped,
            stats.elapsed.as_secs_f64()
        );
        Ok(stats)
    }

    async fn mirror_articles(
        &self,
        catalogs: &Catalogs,
        context: Arc<ArticleContext>,
    ) -> Result<(), MirrorError> {
        let limit = Arc::new(Semaphore::new(
            self.config.mirror.max_concurrent_articles.max(1) as usize,
        ));
        let stop = Arc::new(AtomicBool::new(false));
        let mut workers = JoinSet::new();

        for id in catalogs.articles() {
            let permit = match Arc::clone(&limit).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            if stop.load(Ordering::SeqCst) {
                tracing::warn!("Stopping admission of new articles after a fatal error");
                break;
            }

            let context = Arc::clone(&context);
            let stop = Arc::clone(&stop);
            let id = id.clone();
            workers.spawn(async move {
                let _permit = permit;
                let result = process_article(&context, &id).await;
                if result.is_err() {
                    stop.store(true, Ordering::SeqCst);
                }
                result
            });
        }

        let mut first_error = None;
        while let Some(joined) = workers.join_next().await {
            let outcome = joined.map_err(MirrorError::from).and_then(|result| result);
            if let Err(e) = outcome {
                if first_error.is_none() {
                    first_error = Some(e);
                } else {
                    tracing::error!("Additional failure: {}", e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn write_redirects(&self, catalogs: &Catalogs, counters: &RunCounters) -> Result<(), MirrorError> {
        for (alias, target) in catalogs.redirects() {
            let relative = path_for(ResourceKind::Article, alias)?.relative_path();
            if self.storage.exists(&relative) {
                tracing::debug!("{} already exists, skipping", relative.display());
                counters.redirect(false);
                continue;
            }

            let target_url = path_for(ResourceKind::Article, target)?.relative_url();
            tracing::debug!("Writing redirect {} -> {}", alias, target);
            self.storage
                .write(&relative, redirect_stub(alias, &target_url).as_bytes())?;
            counters.redirect(true);
        }

        tracing::info!("Redirect stubs done ({} aliases)", catalogs.redirects().len());
        Ok(())
    }

    fn write_index(
        &self,
        catalogs: &Catalogs,
        main_page: &str,
        counters: &RunCounters,
    ) -> Result<(), MirrorError> {
        let relative = Path::new(INDEX_PATH);
        if self.storage.exists(relative) {
            tracing::info!("{} already exists, skipping", relative.display());
            return Ok(());
        }

        let target = match catalogs.resolve(main_page) {
            Some(target) => target,
            None => {
                tracing::warn!("Main page {} is not part of the mirror", main_page);
                main_page
            }
        };
        let main_url = path_for(ResourceKind::Article, target)?.relative_url_from(INDEX_DEPTH);

        tracing::info!("Writing {}", relative.display());
        self.storage.write(relative, index_stub(&main_url).as_bytes())?;
        counters.assets_written(1);
        Ok(())
    }
}

/// Mirrors one article, recording its final state
async fn process_article(context: &ArticleContext, id: &str) -> Result<ArticleState, MirrorError> {
    let mut progress = ArticleProgress::new(id);

    match mirror_article(context, &mut progress).await {
        Ok(()) => {
            let done = context.counters.articles_done();
            if done % PROGRESS_INTERVAL == 0 {
                let rate = done as f64 / context.counters.elapsed().as_secs_f64().max(0.001);
                tracing::info!("Progress: {} articles done, {:.2} articles/sec", done, rate);
            }
            Ok(progress.state())
        }
        Err(e) => {
            tracing::error!("Failed to mirror {}: {}", id, e);
            if !progress.state().is_terminal() {
                progress.advance(ArticleState::Failed)?;
            }
            Err(e)
        }
    }
}

async fn mirror_article(
    context: &ArticleContext,
    progress: &mut ArticleProgress,
) -> Result<(), MirrorError> {
    let id = progress.id().to_string();
    let relative = path_for(ResourceKind::Article, &id)?.relative_path();

    if context.storage.exists(&relative) {
        tracing::info!("{} already exists, skipping", relative.display());
        progress.advance(ArticleState::Skipped)?;
        context.counters.article_skipped();
        return Ok(());
    }

    progress.advance(ArticleState::Fetching)?;
    let url = format!("{}{}", context.rendering_url, urlencoding::encode(&id));
    tracing::debug!("Fetching {}", url);
    let raw = context.fetcher.fetch_text(&url).await?;

    progress.advance(ArticleState::Transforming)?;
    let article = context
        .transformer
        .rewrite(&raw, &id)
        .map_err(|source| MirrorError::Transform {
            id: id.clone(),
            source,
        })?;

    // Media first: a persisted article always has its media on disk
    if context.media_enabled {
        for request in &article.media {
            let outcome = context.media.download(request).await?;
            context.counters.media(outcome);
        }
    }

    tracing::info!("Writing {}", relative.display());
    context.storage.write(&relative, article.html.as_bytes())?;
    progress.advance(ArticleState::Persisted)?;
    context.counters.article_persisted();
    Ok(())
}
