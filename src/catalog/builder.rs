use crate::catalog::api::{query_all, query_url, AllPagesQuery, BacklinksQuery, BATCH_LIMIT};
use crate::catalog::{normalize_identifier, ArticleCatalog, CatalogError, Catalogs, RedirectCatalog};
use crate::mirror::Fetcher;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Builds the article and redirect catalogs from the query API
pub struct CatalogBuilder {
    fetcher: Fetcher,
    api_url: String,
    lookup_concurrency: usize,
}

impl CatalogBuilder {
    /// Creates a builder querying `api_url`
    ///
    /// At most `lookup_concurrency` redirect lookups are scheduled at once.
    pub fn new(fetcher: Fetcher, api_url: impl Into<String>, lookup_concurrency: usize) -> Self {
        Self {
            fetcher,
            api_url: api_url.into(),
            lookup_concurrency: lookup_concurrency.max(1),
        }
    }

    /// Enumerates every non-redirect page of the given namespaces
    ///
    /// An empty site yields an empty catalog. Any failed query is fatal.
    pub async fn build_article_ids(&self, namespaces: &[i64]) -> Result<ArticleCatalog, CatalogError> {
        let mut articles = ArticleCatalog::new();

        for namespace in namespaces {
            let namespace = namespace.to_string();
            let url = query_url(
                &self.api_url,
                &[
                    ("list", "allpages"),
                    ("apfilterredir", "nonredirects"),
                    ("aplimit", BATCH_LIMIT),
                    ("apnamespace", namespace.as_str()),
                ],
            )?;

            let before = articles.len();
            let batches = query_all(&self.fetcher, &url, |batch: AllPagesQuery| {
                articles.extend(
                    batch
                        .allpages
                        .into_iter()
                        .map(|page| normalize_identifier(&page.title))
                        .filter(|id| !id.is_empty()),
                );
            })
            .await?;

            tracing::info!(
                "Namespace {}: {} articles in {} batches",
                namespace,
                articles.len() - before,
                batches
            );
        }

        Ok(articles)
    }

    /// Finds the redirects pointing at each article
    ///
    /// A failed lookup only loses the redirects of that article: it is
    /// logged and the remaining lookups go on. A lookup task that panicked
    /// is fatal.
    pub async fn build_redirect_ids(
        &self,
        articles: &ArticleCatalog,
    ) -> Result<RedirectCatalog, CatalogError> {
        let limit = Arc::new(Semaphore::new(self.lookup_concurrency));
        let mut lookups = JoinSet::new();
        let mut redirects = RedirectCatalog::new();

        for target in articles {
            let permit = match Arc::clone(&limit).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let fetcher = self.fetcher.clone();
            let api_url = self.api_url.clone();
            let target = target.clone();

            lookups.spawn(async move {
                let _permit = permit;
                let aliases = redirects_to(&fetcher, &api_url, &target).await;
                (target, aliases)
            });
        }

        while let Some(joined) = lookups.join_next().await {
            collect_lookup(&mut redirects, joined)?;
        }

        tracing::info!("Found {} redirects", redirects.len());
        Ok(redirects)
    }

    /// Builds and validates both catalogs
    ///
    /// With `explicit` set the articles are taken from it instead of being
    /// enumerated.
    pub async fn build(
        &self,
        namespaces: &[i64],
        explicit: Option<&[String]>,
    ) -> Result<Catalogs, CatalogError> {
        let articles = match explicit {
            Some(ids) => {
                tracing::info!("Using {} configured articles", ids.len());
                ids.iter()
                    .map(|id| normalize_identifier(id))
                    .filter(|id| !id.is_empty())
                    .collect()
            }
            None => self.build_article_ids(namespaces).await?,
        };

        let redirects = self.build_redirect_ids(&articles).await?;
        Catalogs::new(articles, redirects)
    }
}

async fn redirects_to(fetcher: &Fetcher, api_url: &str, target: &str) -> Result<Vec<String>, CatalogError> {
    let url = query_url(
        api_url,
        &[
            ("list", "backlinks"),
            ("blfilterredir", "redirects"),
            ("bllimit", BATCH_LIMIT),
            ("bltitle", target),
        ],
    )?;

    let mut aliases = Vec::new();
    query_all(fetcher, &url, |batch: BacklinksQuery| {
        aliases.extend(
            batch
                .backlinks
                .into_iter()
                .map(|page| normalize_identifier(&page.title))
                .filter(|alias| !alias.is_empty()),
        );
    })
    .await?;

    Ok(aliases)
}

fn collect_lookup(
    redirects: &mut RedirectCatalog,
    joined: Result<(String, Result<Vec<String>, CatalogError>), tokio::task::JoinError>,
) -> Result<(), CatalogError> {
    match joined? {
        (target, Ok(aliases)) => {
            for alias in aliases {
                if let Some(previous) = redirects.insert(alias.clone(), target.clone()) {
                    tracing::warn!("Redirect {} points at both {} and {}", alias, previous, target);
                }
            }
        }
        (target, Err(e)) => {
            tracing::warn!("Skipping redirects of {}: {}", target, e);
        }
    }
    Ok(())
}
