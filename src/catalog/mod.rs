//! Identifier catalogs of the mirrored site
//!
//! This module contains:
//! - Site metadata (main page, direction, namespaces)
//! - Enumeration of the mirrored articles
//! - Discovery of the redirects pointing at them
//! - Validation of the resulting catalogs against the sharded layout
//!
//! Catalogs are built completely before any article is processed and are
//! read-only afterwards.

mod api;
mod builder;
mod siteinfo;

pub use api::PageRef;
pub use builder::CatalogBuilder;
pub use siteinfo::{fetch_site_info, Namespace, SiteInfo, MAIN_NAMESPACE};

use crate::mirror::FetchError;
use crate::paths::{path_for, ResourceKind};
use crate::{ConfigError, PathError};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;
use thiserror::Error;

/// Identifiers of every article to mirror
pub type ArticleCatalog = BTreeSet<String>;

/// Redirect aliases mapped to the article they point at
pub type RedirectCatalog = BTreeMap<String, String>;

/// Errors raised while building the catalogs
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog query failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Remote API error {code}: {info}")]
    Api { code: String, info: String },

    #[error("Site info is missing the {0}")]
    MissingSiteInfo(&'static str),

    #[error("{first} and {second} both map to {}", .path.display())]
    PathCollision {
        first: String,
        second: String,
        path: PathBuf,
    },

    #[error("Invalid identifier: {0}")]
    Path(#[from] PathError),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Redirect lookup task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Normalizes a page title into an identifier
///
/// Titles use spaces where identifiers (and URLs) use underscores.
pub fn normalize_identifier(title: &str) -> String {
    title.trim().replace(' ', "_")
}

/// The validated article and redirect catalogs of a run
#[derive(Debug, Clone, Default)]
pub struct Catalogs {
    articles: ArticleCatalog,
    redirects: RedirectCatalog,
}

impl Catalogs {
    /// Validates and combines the catalogs
    ///
    /// Aliases that are also articles are dropped, as are aliases whose
    /// target is not mirrored. Two identifiers sharing a sharded path are
    /// fatal since one file would silently replace the other.
    pub fn new(articles: ArticleCatalog, mut redirects: RedirectCatalog) -> Result<Self, CatalogError> {
        redirects.retain(|alias, target| {
            if articles.contains(alias) {
                tracing::warn!("Redirect {} is also an article, ignoring it", alias);
                false
            } else if !articles.contains(target) {
                tracing::warn!("Redirect {} points at unmirrored {}, ignoring it", alias, target);
                false
            } else {
                true
            }
        });

        let mut owners: HashMap<PathBuf, &str> = HashMap::new();
        for id in articles.iter().chain(redirects.keys()) {
            let path = path_for(ResourceKind::Article, id)?.relative_path();
            if let Some(first) = owners.get(&path) {
                return Err(CatalogError::PathCollision {
                    first: first.to_string(),
                    second: id.clone(),
                    path,
                });
            }
            owners.insert(path, id);
        }

        Ok(Self {
            articles,
            redirects,
        })
    }

    /// Mirrored articles
    pub fn articles(&self) -> &ArticleCatalog {
        &self.articles
    }

    /// Redirect aliases and their targets
    pub fn redirects(&self) -> &RedirectCatalog {
        &self.redirects
    }

    /// Returns true if `id` is a mirrored article
    pub fn is_article(&self, id: &str) -> bool {
        self.articles.contains(id)
    }

    /// Resolves an identifier to the article that holds its content
    ///
    /// Articles resolve to themselves and aliases to their target; anything
    /// else is not part of the mirror.
    pub fn resolve<'a>(&'a self, id: &'a str) -> Option<&'a str> {
        if self.articles.contains(id) {
            Some(id)
        } else {
            self.redirects.get(id).map(String::as_str)
        }
    }
}
