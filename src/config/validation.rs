use crate::config::types::{ApiConfig, Config, CrawlerConfig, OutputConfig, ProxyConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_api_config(&config.api)?;
    if let Some(proxy) = &config.proxy {
        validate_proxy_config(proxy)?;
    }
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.seed_id <= 0 {
        return Err(ConfigError::Validation(format!(
            "seed_id must be a positive node id, got {}",
            config.seed_id
        )));
    }

    if config.max_workers < 1 || config.max_workers > 100 {
        return Err(ConfigError::Validation(format!(
            "max_workers must be between 1 and 100, got {}",
            config.max_workers
        )));
    }

    if config.lease_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "lease_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.idle_backoff_ms < 10 {
        return Err(ConfigError::Validation(format!(
            "idle_backoff_ms must be >= 10ms, got {}ms",
            config.idle_backoff_ms
        )));
    }

    Ok(())
}

/// Validates API configuration
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    if config.key.is_none() {
        return Err(ConfigError::Validation(
            "API key is not set (api.key or STEAM_API_KEY)".to_string(),
        ));
    }

    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use http or https, got '{}'",
            config.base_url
        )));
    }

    if config.request_timeout_secs < 1 || config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request and connect timeouts must be >= 1s".to_string(),
        ));
    }

    Ok(())
}

/// Validates proxy configuration
fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    if config.host.trim().is_empty() {
        return Err(ConfigError::Validation(
            "proxy host cannot be empty".to_string(),
        ));
    }

    if config.port == 0 {
        return Err(ConfigError::Validation(
            "proxy port cannot be 0".to_string(),
        ));
    }

    // Credentials go together
    if config.username.is_some() != config.password.is_some() {
        return Err(ConfigError::Validation(
            "proxy username and password must both be set or both be absent".to_string(),
        ));
    }

    Url::parse(&config.url())
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy address: {}", e)))?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
