//! Shared assets of the mirror
//!
//! The stylesheets, scripts and icon referenced by the web site's main page
//! are saved once per output tree and linked from every article.

use crate::mirror::{FetchError, Fetcher};
use crate::paths::{
    normalize_name, BODY_SCRIPT_PATH, FAVICON_PATH, HEAD_SCRIPT_PATH, STYLESHEET_PATH, STYLE_DIR,
};
use crate::storage::Storage;
use regex::{Captures, Regex};
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use url::Url;

/// A script of the web site
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    /// Script body embedded in the page
    Inline(String),
    /// Absolute URL of a script file
    External(String),
}

/// Assets referenced by a page of the web site
#[derive(Debug, Clone, Default)]
pub struct SiteAssets {
    /// Absolute stylesheet URLs, in document order
    pub stylesheets: Vec<String>,
    /// Scripts of the document head
    pub head_scripts: Vec<ScriptSource>,
    /// Scripts of the document body
    pub body_scripts: Vec<ScriptSource>,
    /// Absolute icon URL
    pub favicon: Option<String>,
}

/// Extracts the asset references of a web page
///
/// # Arguments
///
/// * `html` - The page content
/// * `base_url` - URL of the page, for resolving relative references
pub fn parse_site_assets(html: &str, base_url: &Url) -> SiteAssets {
    let document = Html::parse_document(html);
    let mut assets = SiteAssets::default();

    if let Ok(selector) = Selector::parse("link[rel][href]") {
        for element in document.select(&selector) {
            let rel = element.value().attr("rel").unwrap_or_default();
            let href = element.value().attr("href").unwrap_or_default();
            let Some(url) = resolve(href, base_url) else {
                continue;
            };

            let relations: Vec<String> = rel.split_whitespace().map(str::to_lowercase).collect();
            if relations.iter().any(|r| r == "stylesheet") {
                assets.stylesheets.push(url);
            } else if relations.iter().any(|r| r == "icon") && assets.favicon.is_none() {
                assets.favicon = Some(url);
            }
        }
    }

    for (scope, scripts) in [
        ("head script", &mut assets.head_scripts),
        ("body script", &mut assets.body_scripts),
    ] {
        let Ok(selector) = Selector::parse(scope) else {
            continue;
        };
        for element in document.select(&selector) {
            match element.value().attr("src") {
                Some(src) => {
                    if let Some(url) = resolve(src, base_url) {
                        scripts.push(ScriptSource::External(url));
                    }
                }
                None => {
                    let body: String = element.text().collect();
                    if !body.trim().is_empty() {
                        scripts.push(ScriptSource::Inline(body));
                    }
                }
            }
        }
    }

    assets
}

fn resolve(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with("data:") || href.starts_with("javascript:") {
        return None;
    }
    base_url
        .join(href)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map(|url| url.to_string())
}

fn css_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"url\(\s*['"]?([^'")]+?)['"]?\s*\)"#).expect("static regex"))
}

/// External resources referenced by `url(...)` in a stylesheet
///
/// Returns `(reference as written, absolute URL)` pairs; inline `data:`
/// resources are left out.
pub fn stylesheet_dependencies(css: &str, stylesheet_url: &Url) -> Vec<(String, Url)> {
    let mut dependencies = Vec::new();
    for caps in css_url_pattern().captures_iter(css) {
        let reference = caps[1].trim();
        if reference.starts_with("data:") || reference.starts_with('#') {
            continue;
        }
        if let Ok(url) = stylesheet_url.join(reference) {
            if !dependencies.iter().any(|(r, _)| r == reference) {
                dependencies.push((reference.to_string(), url));
            }
        }
    }
    dependencies
}

/// File name a stylesheet dependency is saved under, next to the stylesheet
pub fn dependency_file_name(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    let decoded = urlencoding::decode(segment).ok()?;
    let name = normalize_name(&decoded);
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name)
    }
}

/// Points the `url(...)` references of a stylesheet at local files
pub fn rewrite_stylesheet(css: &str, local_names: &HashMap<String, String>) -> String {
    css_url_pattern()
        .replace_all(css, |caps: &Captures| match local_names.get(caps[1].trim()) {
            Some(name) => format!("url(\"{}\")", name),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Saves the shared assets into the output tree
pub struct AssetSaver {
    fetcher: Fetcher,
    storage: Arc<dyn Storage>,
}

impl AssetSaver {
    pub fn new(fetcher: Fetcher, storage: Arc<dyn Storage>) -> Self {
        Self { fetcher, storage }
    }

    /// Saves stylesheet, scripts and icon of the page at `page_url`
    ///
    /// Assets already present are left alone. Missing individual resources
    /// (client errors) are logged and skipped; exhausted retries are fatal.
    ///
    /// # Returns
    ///
    /// The number of files written.
    pub async fn save_all(&self, page_url: &str) -> Result<u64, FetchError> {
        let shared = [STYLESHEET_PATH, HEAD_SCRIPT_PATH, BODY_SCRIPT_PATH, FAVICON_PATH];
        if shared.iter().all(|path| self.storage.exists(Path::new(path))) {
            tracing::info!("Shared assets already exist, skipping");
            return Ok(0);
        }

        tracing::info!("Saving shared assets from {}", page_url);
        let base_url = Url::parse(page_url).map_err(|e| FetchError::Body {
            url: page_url.to_string(),
            message: e.to_string(),
        })?;
        let page = self.fetcher.fetch_text(page_url).await?;
        let assets = parse_site_assets(&page, &base_url);

        let mut written = 0;
        if self.save_stylesheet(&assets.stylesheets).await? {
            written += 1;
        }
        if self.save_scripts(HEAD_SCRIPT_PATH, &assets.head_scripts).await? {
            written += 1;
        }
        if self.save_scripts(BODY_SCRIPT_PATH, &assets.body_scripts).await? {
            written += 1;
        }

        let favicon = match assets.favicon {
            Some(url) => url,
            None => base_url
                .join("/favicon.ico")
                .map(|url| url.to_string())
                .unwrap_or_default(),
        };
        if !favicon.is_empty() && self.save_file(FAVICON_PATH, &favicon).await? {
            written += 1;
        }

        Ok(written)
    }

    /// Concatenates the stylesheets and localizes their dependencies
    async fn save_stylesheet(&self, urls: &[String]) -> Result<bool, FetchError> {
        let target = Path::new(STYLESHEET_PATH);
        if self.storage.exists(target) {
            tracing::info!("{} already exists, skipping", target.display());
            return Ok(false);
        }

        let mut combined = String::new();
        for url in urls {
            let Some(css) = tolerate_missing(self.fetcher.fetch_text(url).await)? else {
                continue;
            };
            let stylesheet_url = Url::parse(url).map_err(|e| FetchError::Body {
                url: url.clone(),
                message: e.to_string(),
            })?;

            let mut local_names = HashMap::new();
            for (reference, dependency) in stylesheet_dependencies(&css, &stylesheet_url) {
                let Some(name) = dependency_file_name(&dependency) else {
                    continue;
                };
                let path = PathBuf::from(STYLE_DIR).join(&name);
                let saved = self
                    .fetcher
                    .download_to_file(self.storage.as_ref(), dependency.as_str(), &path, false)
                    .await;
                if tolerate_missing(saved)?.is_some() {
                    local_names.insert(reference, name);
                }
            }

            combined.push_str(&format!("/* {} */\n", url));
            combined.push_str(&rewrite_stylesheet(&css, &local_names));
            combined.push('\n');
        }

        self.write(target, combined.as_bytes())?;
        Ok(true)
    }

    async fn save_scripts(&self, target: &str, scripts: &[ScriptSource]) -> Result<bool, FetchError> {
        let target = Path::new(target);
        if self.storage.exists(target) {
            tracing::info!("{} already exists, skipping", target.display());
            return Ok(false);
        }

        let mut combined = String::new();
        for script in scripts {
            match script {
                ScriptSource::Inline(body) => combined.push_str(body),
                ScriptSource::External(url) => {
                    if let Some(body) = tolerate_missing(self.fetcher.fetch_text(url).await)? {
                        combined.push_str(&body);
                    }
                }
            }
            combined.push_str(";\n");
        }

        self.write(target, combined.as_bytes())?;
        Ok(true)
    }

    async fn save_file(&self, target: &str, url: &str) -> Result<bool, FetchError> {
        let outcome = self
            .fetcher
            .download_to_file(self.storage.as_ref(), url, Path::new(target), false)
            .await;
        Ok(matches!(
            tolerate_missing(outcome)?,
            Some(crate::mirror::DownloadOutcome::Downloaded)
        ))
    }

    fn write(&self, target: &Path, contents: &[u8]) -> Result<(), FetchError> {
        tracing::info!("Writing {}", target.display());
        self.storage
            .write(target, contents)
            .map_err(|source| FetchError::Storage {
                url: target.display().to_string(),
                source,
            })
    }
}

/// Turns a client error status into `None`, keeping every other outcome
fn tolerate_missing<T>(result: Result<T, FetchError>) -> Result<Option<T>, FetchError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(FetchError::Status { url, status }) => {
            tracing::warn!("Skipping asset {}: HTTP {}", url, status);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
