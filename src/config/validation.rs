use crate::config::types::{Config, CrawlerConfig, CustomConfig, FilterConfig, HttpConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_id(&config.id)?;
    validate_urls(config)?;
    validate_crawler_config(&config.crawler)?;
    validate_filter_config(&config.filters)?;
    validate_http_config(&config.http)?;
    validate_custom_config(&config.custom)?;
    Ok(())
}

/// The crawl id ends up in file names, so keep it to a safe character set
fn validate_id(id: &str) -> Result<(), ConfigError> {
    if id.is_empty() {
        return Err(ConfigError::Validation("id cannot be empty".to_string()));
    }

    if !id
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(ConfigError::Validation(format!(
            "id must contain only alphanumeric characters, '-', '_' or '.', got '{}'",
            id
        )));
    }

    if id.starts_with('.') {
        return Err(ConfigError::Validation(format!(
            "id cannot start with '.', got '{}'",
            id
        )));
    }

    Ok(())
}

fn validate_urls(config: &Config) -> Result<(), ConfigError> {
    Url::parse(&config.start_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid start-url: {}", e)))?;

    if let Some(sitemap) = &config.sitemap_url {
        Url::parse(sitemap)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid sitemap-url: {}", e)))?;
    }

    Ok(())
}

/// Validates crawler loop settings
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.request_count < 1 {
        return Err(ConfigError::Validation(format!(
            "request-count must be >= 1, got {}",
            config.request_count
        )));
    }

    if config.max_pages != -1 && config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be -1 or >= 1, got {}",
            config.max_pages
        )));
    }

    if config.save_status_each != -1 && config.save_status_each < 1 {
        return Err(ConfigError::Validation(format!(
            "save-status-each must be -1 or >= 1, got {}",
            config.save_status_each
        )));
    }

    Ok(())
}

fn validate_filter_config(config: &FilterConfig) -> Result<(), ConfigError> {
    for protocol in &config.allowed_protocols {
        if !protocol.ends_with(':') || protocol.len() < 2 {
            return Err(ConfigError::InvalidPattern(format!(
                "Protocol '{}' must be a scheme followed by ':', e.g. 'https:'",
                protocol
            )));
        }
    }
    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.timeout == 0 {
        return Err(ConfigError::Validation(
            "http timeout must be > 0ms".to_string(),
        ));
    }

    if config.auth.enable && config.auth.user.is_empty() {
        return Err(ConfigError::Validation(
            "http auth is enabled but user is empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_custom_config(config: &CustomConfig) -> Result<(), ConfigError> {
    if !config.use_custom {
        return Ok(());
    }

    match config.custom_file.as_deref() {
        None => Err(ConfigError::Validation(
            "use-custom is set but custom-file is missing".to_string(),
        )),
        Some(name) if !crate::custom::is_builtin(name) => {
            Err(ConfigError::Validation(format!(
                "Unknown custom action '{}', expected one of: {}",
                name,
                crate::custom::BUILTIN_ACTIONS.join(", ")
            )))
        }
        Some(_) => Ok(()),
    }
}
