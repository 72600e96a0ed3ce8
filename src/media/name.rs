use crate::paths::normalize_name;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;
use url::Url;

/// Resolution assigned to a file without a `<width>px-` prefix
///
/// Such a file is the original upload, which beats every thumbnail.
pub const ORIGINAL_RESOLUTION: u32 = u32::MAX;

/// Errors raised for media file names the mirror cannot handle
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MediaNameError {
    #[error("No file name in media URL {0}")]
    NoFileName(String),

    #[error("Media file name is not valid UTF-8 once decoded: {0}")]
    Encoding(String),

    #[error("Unparsable media file name: {0}")]
    Unparsable(String),
}

/// A media file name split into its dedup key and its resolution
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaName {
    /// Normalized file name without the resolution prefix
    pub base: String,
    /// Width requested by the prefix, or [`ORIGINAL_RESOLUTION`]
    pub resolution: u32,
}

fn thumbnail_prefix() -> &'static Regex {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    PREFIX.get_or_init(|| Regex::new(r"^(\d+)px-(.+)$").expect("static regex"))
}

impl MediaName {
    /// Parses a decoded file name such as `200px-Logo.png`
    ///
    /// # Examples
    ///
    /// ```
    /// use wikimirror::media::{MediaName, ORIGINAL_RESOLUTION};
    ///
    /// let thumb = MediaName::parse("200px-Logo.png").unwrap();
    /// assert_eq!(thumb.base, "Logo.png");
    /// assert_eq!(thumb.resolution, 200);
    ///
    /// let original = MediaName::parse("Logo.png").unwrap();
    /// assert_eq!(original.resolution, ORIGINAL_RESOLUTION);
    /// ```
    pub fn parse(filename: &str) -> Result<Self, MediaNameError> {
        let trimmed = filename.trim();
        if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
            return Err(MediaNameError::Unparsable(filename.to_string()));
        }

        let (base, resolution) = match thumbnail_prefix().captures(trimmed) {
            Some(caps) => {
                let width = caps[1]
                    .parse::<u32>()
                    .map_err(|_| MediaNameError::Unparsable(filename.to_string()))?;
                (caps[2].to_string(), width)
            }
            None => (trimmed.to_string(), ORIGINAL_RESOLUTION),
        };

        Ok(Self {
            base: normalize_name(&base),
            resolution,
        })
    }

    /// Derives the media name from the last path segment of a URL
    pub fn from_url(url: &Url) -> Result<Self, MediaNameError> {
        let segment = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| MediaNameError::NoFileName(url.to_string()))?;

        let decoded = urlencoding::decode(segment)
            .map_err(|_| MediaNameError::Encoding(segment.to_string()))?;

        Self::parse(&decoded)
    }
}
