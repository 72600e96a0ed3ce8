//! Mirror orchestration
//!
//! This module contains the run pipeline:
//! - The bounded-retry HTTP fetcher shared by every component
//! - Saving of the shared assets (stylesheet, scripts, icon)
//! - The coordinator driving catalogs, articles, redirects and the entry point

mod assets;
mod coordinator;
mod fetcher;

pub use assets::{
    dependency_file_name, parse_site_assets, rewrite_stylesheet, stylesheet_dependencies,
    AssetSaver, ScriptSource, SiteAssets,
};
pub use coordinator::Mirror;
pub use fetcher::{build_http_client, DownloadOutcome, FetchError, Fetcher, RetryPolicy};
