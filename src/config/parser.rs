use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment variable consulted when the config file has no API key
pub const API_KEY_ENV: &str = "STEAM_API_KEY";

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    let mut config: Config = toml::from_str(&content)?;

    config.api.key = resolve_api_key(config.api.key.take(), std::env::var(API_KEY_ENV).ok());

    validate(&config)?;

    Ok(config)
}

/// Picks the API key from the config file, falling back to the environment
///
/// Empty values and the literal `null` count as unset.
pub fn resolve_api_key(from_file: Option<String>, from_env: Option<String>) -> Option<String> {
    let usable = |key: &String| {
        let key = key.trim();
        !key.is_empty() && key != "null"
    };

    from_file
        .filter(usable)
        .or_else(|| from_env.filter(usable))
}

/// Computes a SHA-256 hash of the configuration file content
///
/// This is recorded with each crawl run so runs can be told apart by the
/// configuration that produced them.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[crawler]
seed-id = 76561197960287930
max-workers = 8
lease-timeout-secs = 120
run-duration-minutes = 10

[api]
key = "ABCDEF"
base-url = "http://localhost:8080"

[proxy]
host = "proxy.example.com"
port = 3128
username = "user"
password = "secret"

[output]
database-path = "./test.db"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.seed_id, 76561197960287930);
        assert_eq!(config.crawler.max_workers, 8);
        assert_eq!(config.crawler.lease_timeout(), Duration::from_secs(120));
        assert_eq!(config.crawler.run_duration(), Some(Duration::from_secs(600)));
        assert_eq!(config.api.key.as_deref(), Some("ABCDEF"));
        assert_eq!(config.api.base_url, "http://localhost:8080");
        let proxy = config.proxy.unwrap();
        assert_eq!(proxy.url(), "http://proxy.example.com:3128");
        assert_eq!(proxy.username.as_deref(), Some("user"));
        assert_eq!(config.output.database_path, "./test.db");
    }

    #[test]
    fn test_defaults_applied() {
        let config_content = r#"
[crawler]
seed-id = 42

[api]
key = "ABCDEF"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.max_workers, 5);
        assert_eq!(config.crawler.lease_timeout_secs, 300);
        assert_eq!(config.crawler.run_duration(), None);
        assert_eq!(config.crawler.idle_backoff(), Duration::from_secs(1));
        assert_eq!(config.api.base_url, "http://api.steampowered.com");
        assert_eq!(config.api.request_timeout_secs, 60);
        assert!(!config.api.accept_invalid_certs);
        assert!(config.proxy.is_none());
        assert_eq!(config.output.database_path, "steamer.db");
    }

    #[test]
    fn test_zero_run_duration_means_unbounded() {
        let config_content = r#"
[crawler]
seed-id = 42
run-duration-minutes = 0

[api]
key = "ABCDEF"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.crawler.run_duration(), None);
    }

    #[test]
    fn test_missing_seed_fails_to_parse() {
        let config_content = r#"
[crawler]
max-workers = 2

[api]
key = "ABCDEF"
"#;

        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/steamer.toml"));
        assert!(matches!(result.unwrap_err(), ConfigError::Io(_)));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = r#"
[crawler]
seed-id = 42
max-workers = 0

[api]
key = "ABCDEF"
"#;

        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_resolve_api_key() {
        let key = |s: &str| Some(s.to_string());

        assert_eq!(resolve_api_key(key("file"), key("env")), key("file"));
        assert_eq!(resolve_api_key(None, key("env")), key("env"));
        assert_eq!(resolve_api_key(key(""), key("env")), key("env"));
        assert_eq!(resolve_api_key(key("null"), key("env")), key("env"));
        assert_eq!(resolve_api_key(None, key("null")), None);
        assert_eq!(resolve_api_key(None, None), None);
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
