use serde::Deserialize;

/// Main configuration structure for a mirror run
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mirror: MirrorConfig,
    pub remote: RemoteConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub transform: TransformConfig,
}

/// What to mirror and how hard to push the remote service
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MirrorConfig {
    /// Root directory of the generated mirror
    pub output_dir: String,

    /// Overrides the main page reported by the site
    #[serde(default)]
    pub main_page: Option<String>,

    /// Extra namespaces (by local or canonical name) to mirror besides the main one
    #[serde(default)]
    pub namespaces: Vec<String>,

    /// Explicit list of articles; when set, the site is not enumerated
    #[serde(default)]
    pub articles: Option<Vec<String>>,

    /// Maximum number of HTTP requests in flight
    #[serde(default = "default_concurrency")]
    pub max_concurrent_requests: u32,

    /// Maximum number of articles processed at once
    #[serde(default = "default_concurrency")]
    pub max_concurrent_articles: u32,

    /// Extra attempts after a transient failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay between attempts (milliseconds), multiplied by the attempt number
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Download and embed media
    #[serde(default = "default_true")]
    pub media: bool,

    /// Text direction; defaults to what the site reports
    #[serde(default)]
    pub direction: Option<TextDirection>,
}

/// Remote endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RemoteConfig {
    /// Query API endpoint (api.php)
    pub api_url: String,

    /// Rendering service prefix; the article identifier is appended
    pub rendering_url: String,

    /// Public article URL prefix, used for attribution and absolute links
    pub web_url: String,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the mirror tool
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the mirror tool
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the operator
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address of the operator
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the user agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// DOM pruning rules
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TransformConfig {
    /// Elements with any of these classes are removed
    pub css_class_blacklist: Vec<String>,

    /// Elements with any of these classes are removed unless they contain a link
    pub css_class_blacklist_if_no_link: Vec<String>,

    /// Elements with these ids are removed
    pub id_blacklist: Vec<String>,

    /// Class tokens stripped from every `class` attribute
    pub css_class_calls_blacklist: Vec<String>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        fn owned(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        Self {
            css_class_blacklist: owned(&["noprint", "ambox", "stub", "topicon", "magnify"]),
            css_class_blacklist_if_no_link: owned(&[
                "mainarticle",
                "seealso",
                "dablink",
                "rellink",
                "hatnote",
            ]),
            id_blacklist: owned(&["purgelink"]),
            css_class_calls_blacklist: owned(&["plainlinks"]),
        }
    }
}

/// Writing direction of the mirrored language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    Ltr,
    Rtl,
}

impl TextDirection {
    /// Value of the HTML `dir` attribute
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ltr => "ltr",
            Self::Rtl => "rtl",
        }
    }

    /// Side where unaligned thumbnails float
    pub fn default_float(&self) -> &'static str {
        match self {
            Self::Ltr => "right",
            Self::Rtl => "left",
        }
    }

    /// Text alignment of captions
    pub fn text_align(&self) -> &'static str {
        match self {
            Self::Ltr => "left",
            Self::Rtl => "right",
        }
    }
}

fn default_concurrency() -> u32 {
    10
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}
