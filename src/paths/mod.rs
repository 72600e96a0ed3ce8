//! Sharded on-disk layout of the mirror
//!
//! Every article and media file lives four single-character directories
//! below its kind root, derived from the first characters of its name:
//!
//! ```text
//! html/K/i/w/i/Kiwix.html
//! media/L/o/g/o/Logo.png
//! ```
//!
//! Because every sharded document sits at the same depth, a link from any
//! article to any other resource is a fixed number of `../` segments
//! followed by the target's root-relative path.

use crate::PathError;
use std::path::{Path, PathBuf};

/// Number of single-character shard directories below a kind root
pub const SHARD_DEPTH: usize = 4;

/// Directory depth of a sharded document relative to the output root
pub const DOCUMENT_DEPTH: usize = SHARD_DEPTH + 1;

/// Concatenated stylesheet of the mirrored site
pub const STYLESHEET_PATH: &str = "style/style.css";

/// Directory receiving stylesheet dependencies (fonts, background images)
pub const STYLE_DIR: &str = "style";

/// Scripts loaded in the document head
pub const HEAD_SCRIPT_PATH: &str = "js/head.js";

/// Scripts loaded at the end of the document body
pub const BODY_SCRIPT_PATH: &str = "js/body.js";

/// Site icon
pub const FAVICON_PATH: &str = "media/favicon.png";

/// Entry point redirecting to the main page
pub const INDEX_PATH: &str = "html/index.html";

/// Depth of the entry point below the output root
pub const INDEX_DEPTH: usize = 1;

const PADDING: char = '_';

/// The kind of resource being mapped, which selects its root directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A rewritten article or a redirect stub
    Article,
    /// A media file (image, audio, ...)
    Media,
}

impl ResourceKind {
    /// Root directory of this kind, relative to the output root
    pub fn root_dir(&self) -> &'static str {
        match self {
            Self::Article => "html",
            Self::Media => "media",
        }
    }

    fn extension(&self) -> Option<&'static str> {
        match self {
            Self::Article => Some("html"),
            Self::Media => None,
        }
    }
}

/// A resource location in the sharded layout
///
/// Computed on demand from a name; never stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShardedPath {
    kind: ResourceKind,
    name: String,
    shards: [char; SHARD_DEPTH],
}

impl ShardedPath {
    /// The resource kind
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// The normalized name the path was derived from
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Leaf file name, including the kind's extension if it has one
    pub fn file_name(&self) -> String {
        match self.kind.extension() {
            Some(ext) => format!("{}.{}", self.name, ext),
            None => self.name.clone(),
        }
    }

    fn segments(&self) -> Vec<String> {
        let mut segments = Vec::with_capacity(DOCUMENT_DEPTH + 1);
        segments.push(self.kind.root_dir().to_string());
        segments.extend(self.shards.iter().map(|c| c.to_string()));
        segments.push(self.file_name());
        segments
    }

    /// Path relative to the output root
    pub fn relative_path(&self) -> PathBuf {
        self.segments().iter().collect()
    }

    /// Path below the given output root
    pub fn absolute(&self, root: &Path) -> PathBuf {
        root.join(self.relative_path())
    }

    /// URL usable from any sharded document of the mirror
    pub fn relative_url(&self) -> String {
        self.relative_url_from(DOCUMENT_DEPTH)
    }

    /// URL usable from a document `depth` directories below the output root
    pub fn relative_url_from(&self, depth: usize) -> String {
        let encoded = self
            .segments()
            .iter()
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}{}", "../".repeat(depth), encoded)
    }
}

/// Normalizes a raw identifier or file name
///
/// Spaces become underscores, and so does every path separator, so that a
/// name can never escape or deepen its shard directory.
pub fn normalize_name(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            other => other,
        })
        .collect()
}

/// Maps a name onto its sharded location
///
/// # Arguments
///
/// * `kind` - Whether the name is an article identifier or a media file name
/// * `identifier` - The raw name; it is normalized before sharding
///
/// # Returns
///
/// * `Ok(ShardedPath)` - The deterministic location of the resource
/// * `Err(PathError::EmptyName)` - The name is empty
///
/// # Example
///
/// ```
/// use wikimirror::paths::{path_for, ResourceKind};
///
/// let path = path_for(ResourceKind::Article, "Kiwix").unwrap();
/// assert_eq!(path.relative_path().to_str(), Some("html/K/i/w/i/Kiwix.html"));
/// assert_eq!(path.relative_url(), "../../../../../html/K/i/w/i/Kiwix.html");
/// ```
pub fn path_for(kind: ResourceKind, identifier: &str) -> Result<ShardedPath, PathError> {
    if identifier.is_empty() {
        return Err(PathError::EmptyName);
    }

    let name = normalize_name(identifier);
    let mut chars = name.chars();
    let mut shards = [PADDING; SHARD_DEPTH];
    for shard in shards.iter_mut() {
        *shard = match chars.next() {
            // "." would collapse the directory level
            Some('.') | None => PADDING,
            Some(c) => c,
        };
    }

    Ok(ShardedPath { kind, name, shards })
}

/// URL of a fixed shared asset (stylesheet, scripts, favicon) from a
/// document `depth` directories below the output root
pub fn asset_url(asset_path: &str, depth: usize) -> String {
    format!("{}{}", "../".repeat(depth), asset_path)
}
