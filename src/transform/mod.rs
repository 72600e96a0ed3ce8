//! Rewriting of rendered articles into mirror documents
//!
//! A rendered article goes through these stages, in order:
//!
//! 1. Pruning of blacklisted elements (navigation boxes, edit links, ...)
//! 2. Media extraction: images point at the mirrored copy and become
//!    media requests
//! 3. Link resolution against the catalogs
//! 4. Reference markers become superscripts
//! 5. Figures become thumbnail boxes
//! 6. Renderer metadata is stripped
//! 7. An attribution footer is appended
//!
//! The result is embedded into the article template. The DOM is owned by a
//! single [`Transformer::rewrite`] call and never crosses an `.await`.

mod clean;
mod figures;
mod links;
mod template;

pub use links::LinkCounts;
pub use template::{
    article_page, display_title, escape_html, footer, index_stub, redirect_stub,
};

use crate::catalog::{Catalogs, SiteInfo};
use crate::config::{Config, TextDirection, TransformConfig};
use crate::media::{MediaNameError, MediaRequest};
use crate::PathError;
use dom_query::Document;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Errors raised while rewriting an article
///
/// All of them point at malformed rendered content and are fatal.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Wiki link without href (text {text:?})")]
    MissingHref { text: String },

    #[error("Bad media file name: {0}")]
    BadMediaName(#[from] MediaNameError),

    #[error("Unmappable name: {0}")]
    Path(#[from] PathError),

    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
}

/// A rewritten article and the media it needs
#[derive(Debug, Clone)]
pub struct RewrittenArticle {
    /// Display title
    pub title: String,
    /// Complete, self-contained document
    pub html: String,
    /// Media referenced by the document, in document order
    pub media: Vec<MediaRequest>,
    /// How the wiki links were resolved
    pub links: LinkCounts,
}

/// Rewrites rendered articles for the mirror
///
/// Holds only immutable run data, so a single instance is shared by every
/// worker.
#[derive(Debug, Clone)]
pub struct Transformer {
    rules: TransformConfig,
    catalogs: Arc<Catalogs>,
    site_url: Url,
    site_name: String,
    direction: TextDirection,
    media: bool,
    mirror_date: String,
}

impl Transformer {
    /// Creates a transformer with media enabled and today's date
    pub fn new(
        rules: TransformConfig,
        catalogs: Arc<Catalogs>,
        site_url: Url,
        site_name: impl Into<String>,
        direction: TextDirection,
    ) -> Self {
        Self {
            rules,
            catalogs,
            site_url,
            site_name: site_name.into(),
            direction,
            media: true,
            mirror_date: chrono::Utc::now().format("%Y-%m-%d").to_string(),
        }
    }

    /// Creates a transformer for a run
    pub fn from_config(
        config: &Config,
        site: &SiteInfo,
        catalogs: Arc<Catalogs>,
    ) -> Result<Self, TransformError> {
        let site_url =
            Url::parse(&config.remote.web_url).map_err(|source| TransformError::InvalidUrl {
                url: config.remote.web_url.clone(),
                source,
            })?;

        Ok(Self::new(
            config.transform.clone(),
            catalogs,
            site_url,
            site.site_name.clone(),
            site.direction,
        )
        .with_media(config.mirror.media))
    }

    /// Enables or disables media
    pub fn with_media(mut self, enabled: bool) -> Self {
        self.media = enabled;
        self
    }

    /// Overrides the date shown in the footer
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.mirror_date = date.into();
        self
    }

    /// The catalogs links are resolved against
    pub fn catalogs(&self) -> &Catalogs {
        &self.catalogs
    }

    /// Text direction of the generated documents
    pub fn direction(&self) -> TextDirection {
        self.direction
    }

    /// Public URL of an article on the source site
    pub fn source_url(&self, id: &str) -> String {
        format!("{}{}", self.site_url, urlencoding::encode(id))
    }

    /// Rewrites a rendered article
    ///
    /// # Arguments
    ///
    /// * `raw_html` - The document returned by the rendering service
    /// * `id` - Identifier of the article
    ///
    /// # Returns
    ///
    /// * `Ok(RewrittenArticle)` - The final document and its media requests
    /// * `Err(TransformError)` - The rendered content is malformed
    pub fn rewrite(&self, raw_html: &str, id: &str) -> Result<RewrittenArticle, TransformError> {
        let doc = Document::from(raw_html);

        let title = doc.select("title").text().trim().to_string();
        let title = if title.is_empty() {
            display_title(id)
        } else {
            title
        };

        let pruned = clean::prune(&doc, &self.rules);
        let media = links::extract_media(&doc, &self.site_url, self.media)?;
        let link_counts = links::resolve_links(&doc, &self.catalogs, &self.site_url)?;
        figures::convert_references(&doc);
        figures::convert_figures(&doc, self.direction);
        clean::strip_metadata(&doc, &self.rules);

        let body = doc.select("body");
        body.append_html(footer(&self.site_name, &self.source_url(id), &self.mirror_date));
        let content = body.inner_html();

        tracing::debug!(
            "{}: pruned {} elements, {} media, {} links rewritten, {} unwrapped",
            id,
            pruned,
            media.len(),
            link_counts.rewritten,
            link_counts.unwrapped
        );

        Ok(RewrittenArticle {
            html: article_page(&title, &content, self.direction),
            title,
            media,
            links: link_counts,
        })
    }
}
