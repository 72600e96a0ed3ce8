use crate::catalog::api::{query_once, query_url, SiteInfoQuery};
use crate::catalog::{normalize_identifier, CatalogError};
use crate::config::{Config, TextDirection};
use crate::mirror::Fetcher;
use crate::ConfigError;

/// Id of the main (article) namespace, always mirrored
pub const MAIN_NAMESPACE: i64 = 0;

/// A namespace of the remote wiki
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub id: i64,
    /// Localized name, empty for the main namespace
    pub name: String,
    /// Language-independent name
    pub canonical: Option<String>,
}

/// Metadata of the mirrored site
#[derive(Debug, Clone)]
pub struct SiteInfo {
    /// Identifier of the main page
    pub main_page: String,
    pub site_name: String,
    pub direction: TextDirection,
    pub namespaces: Vec<Namespace>,
}

impl SiteInfo {
    /// Looks a namespace up by local or canonical name, ignoring case
    pub fn namespace_id(&self, name: &str) -> Option<i64> {
        let wanted = normalize_identifier(name).to_lowercase();
        self.namespaces
            .iter()
            .find(|ns| {
                normalize_identifier(&ns.name).to_lowercase() == wanted
                    || ns
                        .canonical
                        .as_deref()
                        .map(|c| normalize_identifier(c).to_lowercase() == wanted)
                        .unwrap_or(false)
            })
            .map(|ns| ns.id)
    }

    /// Resolves the configured namespaces into the ids to enumerate
    ///
    /// The main namespace always comes first. An unknown name is a
    /// configuration error.
    pub fn mirrored_namespaces(&self, configured: &[String]) -> Result<Vec<i64>, ConfigError> {
        let mut ids = vec![MAIN_NAMESPACE];
        for name in configured {
            let id = self
                .namespace_id(name)
                .ok_or_else(|| ConfigError::UnknownNamespace(name.clone()))?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}

/// Fetches the site metadata, applying configured overrides
///
/// # Arguments
///
/// * `fetcher` - Fetcher used for the query
/// * `config` - Run configuration (API URL, main page and direction overrides)
///
/// # Returns
///
/// * `Ok(SiteInfo)` - Resolved metadata
/// * `Err(CatalogError::MissingSiteInfo)` - The site reports no main page and
///   the configuration does not name one
pub async fn fetch_site_info(fetcher: &Fetcher, config: &Config) -> Result<SiteInfo, CatalogError> {
    let url = query_url(
        &config.remote.api_url,
        &[("meta", "siteinfo"), ("siprop", "general|namespaces")],
    )?;
    let query: SiteInfoQuery = query_once(fetcher, &url).await?;
    let general = query.general;

    let main_page = match &config.mirror.main_page {
        Some(page) => normalize_identifier(page),
        None => general
            .as_ref()
            .and_then(|g| g.mainpage.as_deref())
            .map(normalize_identifier)
            .filter(|page| !page.is_empty())
            .ok_or(CatalogError::MissingSiteInfo("main page"))?,
    };

    let site_name = general
        .as_ref()
        .and_then(|g| g.sitename.clone())
        .unwrap_or_else(|| main_page.replace('_', " "));

    let reported_direction = match general.as_ref().map(|g| g.rtl) {
        Some(true) => TextDirection::Rtl,
        _ => TextDirection::Ltr,
    };
    let direction = config.mirror.direction.unwrap_or(reported_direction);

    let mut namespaces: Vec<Namespace> = query
        .namespaces
        .into_values()
        .map(|ns| Namespace {
            id: ns.id,
            name: ns.name,
            canonical: ns.canonical,
        })
        .collect();
    namespaces.sort_by_key(|ns| ns.id);

    tracing::info!(
        "Site {}: main page {}, direction {}, {} namespaces",
        site_name,
        main_page,
        direction.as_str(),
        namespaces.len()
    );

    Ok(SiteInfo {
        main_page,
        site_name,
        direction,
        namespaces,
    })
}
