//! wikimirror: an offline mirror builder for MediaWiki-style sites
//!
//! This crate enumerates the pages and redirects of a remote wiki, fetches a
//! rendered version of every page, rewrites it into a self-contained static
//! document and stores the result, together with deduplicated media, under a
//! sharded directory tree that can be browsed without network access.

pub mod catalog;
pub mod config;
pub mod media;
pub mod mirror;
pub mod output;
pub mod paths;
pub mod state;
pub mod storage;
pub mod transform;

use thiserror::Error;

/// Main error type for mirror operations
///
/// Every variant is fatal for a run: the orchestrator stops admitting new
/// work as soon as one of these surfaces.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Path error: {0}")]
    Path(#[from] PathError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] mirror::FetchError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] catalog::CatalogError),

    #[error("Transform error for {id}: {source}")]
    Transform {
        id: String,
        source: transform::TransformError,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Invalid state transition for {id}: {from:?} -> {to:?}")]
    InvalidTransition {
        id: String,
        from: state::ArticleState,
        to: state::ArticleState,
    },

    #[error("Worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Unknown namespace in config: {0}")]
    UnknownNamespace(String),
}

/// Errors raised while mapping names onto the sharded layout
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("Cannot map an empty name")]
    EmptyName,
}

/// Result type alias for mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use catalog::{ArticleCatalog, Catalogs, RedirectCatalog};
pub use config::Config;
pub use mirror::Mirror;
pub use output::MirrorStatistics;
pub use paths::{path_for, ResourceKind, ShardedPath};
pub use state::ArticleState;
