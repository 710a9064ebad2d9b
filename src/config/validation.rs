use crate::config::types::{
    Config, DownloadConfig, FetcherConfig, OutputConfig, ScannerConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Hard ceiling on redirect hops regardless of configuration
pub const MAX_REDIRECT_CAP: usize = 10;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scanner_config(&config.scanner)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_download_config(&config.download)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_scanner_config(config: &ScannerConfig) -> Result<(), ConfigError> {
    if config.max_workers < 1 || config.max_workers > 64 {
        return Err(ConfigError::Validation(format!(
            "max_workers must be between 1 and 64, got {}",
            config.max_workers
        )));
    }

    if config.max_resources < 1 {
        return Err(ConfigError::Validation(format!(
            "max_resources must be >= 1, got {}",
            config.max_resources
        )));
    }

    if config.max_duration_secs < 1 {
        return Err(ConfigError::Validation(
            "max_duration_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_secs < 1 || config.connect_timeout_secs > config.request_timeout_secs
    {
        return Err(ConfigError::Validation(format!(
            "connect_timeout_secs must be between 1 and request_timeout_secs ({}), got {}",
            config.request_timeout_secs, config.connect_timeout_secs
        )));
    }

    if config.max_redirects > MAX_REDIRECT_CAP {
        return Err(ConfigError::Validation(format!(
            "max_redirects must be <= {}, got {}",
            MAX_REDIRECT_CAP, config.max_redirects
        )));
    }

    if config.max_body_bytes < 1024 {
        return Err(ConfigError::Validation(format!(
            "max_body_bytes must be >= 1024, got {}",
            config.max_body_bytes
        )));
    }

    Ok(())
}

fn validate_download_config(config: &DownloadConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if config.backoff_base_ms > 60_000 {
        return Err(ConfigError::Validation(format!(
            "backoff_base_ms must be <= 60000, got {}",
            config.backoff_base_ms
        )));
    }

    Ok(())
}

fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.scanner_name.is_empty() {
        return Err(ConfigError::Validation(
            "scanner_name cannot be empty".to_string(),
        ));
    }

    if !config
        .scanner_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "scanner_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.scanner_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
