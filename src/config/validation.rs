use crate::config::types::{Config, MirrorConfig, RemoteConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_mirror_config(&config.mirror)?;
    validate_remote_config(&config.remote)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

/// Validates mirror behaviour settings
fn validate_mirror_config(config: &MirrorConfig) -> Result<(), ConfigError> {
    if config.output_dir.is_empty() {
        return Err(ConfigError::Validation(
            "output_dir cannot be empty".to_string(),
        ));
    }

    for (name, value) in [
        ("max_concurrent_requests", config.max_concurrent_requests),
        ("max_concurrent_articles", config.max_concurrent_articles),
    ] {
        if !(1..=100).contains(&value) {
            return Err(ConfigError::Validation(format!(
                "{} must be between 1 and 100, got {}",
                name, value
            )));
        }
    }

    if config.max_retries > 20 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 20, got {}",
            config.max_retries
        )));
    }

    if let Some(main_page) = &config.main_page {
        if main_page.trim().is_empty() {
            return Err(ConfigError::Validation(
                "main_page cannot be empty when set".to_string(),
            ));
        }
    }

    if let Some(articles) = &config.articles {
        if let Some(blank) = articles.iter().find(|a| a.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "articles cannot contain blank titles, got '{}'",
                blank
            )));
        }
    }

    if config.namespaces.iter().any(|ns| ns.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "namespaces cannot contain blank names".to_string(),
        ));
    }

    Ok(())
}

/// Validates remote endpoints
fn validate_remote_config(config: &RemoteConfig) -> Result<(), ConfigError> {
    validate_http_url("api_url", &config.api_url)?;
    validate_http_url("rendering_url", &config.rendering_url)?;
    validate_http_url("web_url", &config.web_url)?;
    Ok(())
}

fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            name, value
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransformConfig;

    fn create_test_config() -> Config {
        Config {
            mirror: MirrorConfig {
                output_dir: "static".to_string(),
                main_page: None,
                namespaces: vec![],
                articles: None,
                max_concurrent_requests: 10,
                max_concurrent_articles: 10,
                max_retries: 5,
                retry_delay_ms: 1000,
                media: true,
                direction: None,
            },
            remote: RemoteConfig {
                api_url: "https://en.wikipedia.org/w/api.php".to_string(),
                rendering_url: "https://parsoid.example.org/en/".to_string(),
                web_url: "https://en.wikipedia.org/wiki/".to_string(),
            },
            user_agent: UserAgentConfig {
                crawler_name: "wikimirror".to_string(),
                crawler_version: "0.1".to_string(),
                contact_url: "https://example.org/about".to_string(),
                contact_email: "ops@example.org".to_string(),
            },
            transform: TransformConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&create_test_config()).is_ok());
    }

    #[test]
    fn test_concurrency_bounds() {
        let mut config = create_test_config();
        config.mirror.max_concurrent_requests = 0;
        assert!(validate(&config).is_err());

        let mut config = create_test_config();
        config.mirror.max_concurrent_articles = 101;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_remote_urls() {
        let mut config = create_test_config();
        config.remote.api_url = "not a url".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));

        let mut config = create_test_config();
        config.remote.web_url = "ftp://example.org/wiki/".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_blank_titles_rejected() {
        let mut config = create_test_config();
        config.mirror.articles = Some(vec!["Kiwix".to_string(), " ".to_string()]);
        assert!(validate(&config).is_err());

        let mut config = create_test_config();
        config.mirror.main_page = Some(String::new());
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("admin@sub.example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());
        assert!(validate_email("a@b@example.com").is_err());
    }
}
