//! Query API requests and response shapes
//!
//! Every request uses `format=json&formatversion=2`. Continuation follows the
//! API's own protocol: all parameters of the `continue` object are copied
//! into the next request until a response comes back without one.

use crate::catalog::CatalogError;
use crate::mirror::Fetcher;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use url::Url;

/// Maximum batch size accepted by the API for anonymous clients
pub const BATCH_LIMIT: &str = "500";

#[derive(Debug, Deserialize)]
struct QueryResponse<T> {
    #[serde(default)]
    query: Option<T>,
    #[serde(default, rename = "continue")]
    continuation: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    info: String,
}

/// A page reference as returned by list queries
#[derive(Debug, Clone, Deserialize)]
pub struct PageRef {
    pub title: String,
    #[serde(default)]
    pub ns: i64,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AllPagesQuery {
    #[serde(default)]
    pub allpages: Vec<PageRef>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct BacklinksQuery {
    #[serde(default)]
    pub backlinks: Vec<PageRef>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SiteInfoQuery {
    pub general: Option<GeneralInfo>,
    #[serde(default)]
    pub namespaces: BTreeMap<String, NamespaceInfo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeneralInfo {
    pub mainpage: Option<String>,
    #[serde(default)]
    pub sitename: Option<String>,
    #[serde(default)]
    pub rtl: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NamespaceInfo {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub canonical: Option<String>,
}

/// Builds a query URL with the common parameters
pub(crate) fn query_url(api_url: &str, params: &[(&str, &str)]) -> Result<Url, CatalogError> {
    let mut url = Url::parse(api_url)?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs
            .append_pair("action", "query")
            .append_pair("format", "json")
            .append_pair("formatversion", "2");
        for (key, value) in params {
            pairs.append_pair(key, value);
        }
    }
    Ok(url)
}

/// Runs a single, non-paginated query
pub(crate) async fn query_once<T>(fetcher: &Fetcher, url: &Url) -> Result<T, CatalogError>
where
    T: DeserializeOwned + Default,
{
    let response: QueryResponse<T> = fetcher.fetch_json(url.as_str()).await?;
    if let Some(error) = response.error {
        return Err(CatalogError::Api {
            code: error.code,
            info: error.info,
        });
    }
    Ok(response.query.unwrap_or_default())
}

/// Runs a query and follows its continuation until exhausted
///
/// `collect` receives every batch; an empty first batch without a
/// continuation is a valid, empty result.
pub(crate) async fn query_all<T, F>(
    fetcher: &Fetcher,
    base: &Url,
    mut collect: F,
) -> Result<usize, CatalogError>
where
    T: DeserializeOwned + Default,
    F: FnMut(T),
{
    let mut continuation: Option<BTreeMap<String, serde_json::Value>> = None;
    let mut batches = 0;

    loop {
        let mut url = base.clone();
        if let Some(params) = &continuation {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, &continuation_value(value));
            }
        }

        tracing::debug!("Querying {}", url);
        let response: QueryResponse<T> = fetcher.fetch_json(url.as_str()).await?;
        if let Some(error) = response.error {
            return Err(CatalogError::Api {
                code: error.code,
                info: error.info,
            });
        }

        collect(response.query.unwrap_or_default());
        batches += 1;

        match response.continuation {
            Some(next) if !next.is_empty() => continuation = Some(next),
            _ => return Ok(batches),
        }
    }
}

fn continuation_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
