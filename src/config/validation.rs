use crate::config::types::{
    Config, InstagramConfig, OutputConfig, PipelineConfig, UserAgentConfig, YouTubeConfig,
};
use crate::limiter::validate_settings;
use crate::ConfigError;
use url::Url;

/// Largest id batch the YouTube Data API accepts in one `videos` call
pub const MAX_BATCH_SIZE: usize = 50;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_pipeline_config(&config.pipeline)?;
    if let Some(youtube) = &config.youtube {
        validate_youtube_config(youtube)?;
    }
    validate_instagram_config(&config.instagram)?;

    validate_settings(&config.rate_limit.api)
        .map_err(|e| ConfigError::Validation(format!("rate-limit.api: {}", e)))?;
    validate_settings(&config.rate_limit.oembed)
        .map_err(|e| ConfigError::Validation(format!("rate-limit.oembed: {}", e)))?;

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.client_name.is_empty() {
        return Err(ConfigError::Validation(
            "client_name cannot be empty".to_string(),
        ));
    }

    if !config
        .client_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "client_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.client_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.report_dir.is_empty() {
        return Err(ConfigError::Validation(
            "report_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates pipeline tuning values
fn validate_pipeline_config(config: &PipelineConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 || config.batch_size > MAX_BATCH_SIZE {
        return Err(ConfigError::Validation(format!(
            "batch_size must be between 1 and {}, got {}",
            MAX_BATCH_SIZE, config.batch_size
        )));
    }

    if config.max_items < 1 {
        return Err(ConfigError::Validation(format!(
            "max_items must be >= 1, got {}",
            config.max_items
        )));
    }

    if config.step_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "step_timeout_secs must be > 0".to_string(),
        ));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be > 0".to_string(),
        ));
    }

    if config.poll_interval_ms < 50 {
        return Err(ConfigError::Validation(format!(
            "poll_interval_ms must be >= 50ms, got {}ms",
            config.poll_interval_ms
        )));
    }

    Ok(())
}

fn validate_youtube_config(config: &YouTubeConfig) -> Result<(), ConfigError> {
    validate_http_url("youtube.base_url", &config.base_url)
}

fn validate_instagram_config(config: &InstagramConfig) -> Result<(), ConfigError> {
    validate_http_url("instagram.base_url", &config.base_url)?;
    validate_http_url("instagram.oembed_url", &config.oembed_url)?;

    if config.app_id.is_empty() || !config.app_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(ConfigError::Validation(format!(
            "instagram.app_id must be numeric, got '{}'",
            config.app_id
        )));
    }

    Ok(())
}

/// Checks that an endpoint parses and uses http or https
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::Validation(format!(
            "{} must use http or https, got '{}'",
            field, value
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_http_url() {
        assert!(validate_http_url("x", "https://www.googleapis.com/youtube/v3").is_ok());
        assert!(validate_http_url("x", "http://127.0.0.1:8080").is_ok());

        assert!(validate_http_url("x", "").is_err());
        assert!(validate_http_url("x", "ftp://example.com").is_err());
        assert!(validate_http_url("x", "not a url").is_err());
    }

    #[test]
    fn test_validate_pipeline_batch_size() {
        let mut config = PipelineConfig::default();
        assert!(validate_pipeline_config(&config).is_ok());

        config.batch_size = 0;
        assert!(validate_pipeline_config(&config).is_err());

        config.batch_size = 51;
        assert!(validate_pipeline_config(&config).is_err());

        config.batch_size = 50;
        config.step_timeout_secs = 0;
        assert!(validate_pipeline_config(&config).is_err());
    }

    #[test]
    fn test_validate_client_name() {
        let mut config = UserAgentConfig {
            client_name: "creator-scope".to_string(),
            client_version: "0.1".to_string(),
            contact_url: "https://example.com/about".to_string(),
        };
        assert!(validate_user_agent_config(&config).is_ok());

        config.client_name = "bad name!".to_string();
        assert!(validate_user_agent_config(&config).is_err());

        config.client_name = String::new();
        assert!(validate_user_agent_config(&config).is_err());
    }
}
