//! Loading and fingerprinting of the TOML configuration

use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Reads, parses and validates the configuration at `path`
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use creator_scope::config::load_config;
///
/// let config = load_config(Path::new("creator-scope.toml")).unwrap();
/// println!("Batch size: {}", config.pipeline.batch_size);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    parse_config(&std::fs::read_to_string(path)?)
}

/// Parses and validates configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// SHA-256 of the configuration file, hex encoded
///
/// Logged at startup so a database can be matched to the settings that
/// filled it.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    Ok(hash_content(&std::fs::read_to_string(path)?))
}

/// Loads the configuration together with its hash, reading the file once
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, hash_content(&content)))
}

fn hash_content(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const MINIMAL: &str = r#"
[user-agent]
client-name = "creator-scope"
client-version = "0.1"
contact-url = "https://example.com/about"

[output]
database-path = "./test.db"
"#;

    #[test]
    fn test_load_minimal_config_uses_defaults() {
        let file = create_temp_config(MINIMAL);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.user_agent.client_name, "creator-scope");
        assert_eq!(config.output.report_dir, "./reports");
        assert_eq!(config.pipeline.batch_size, 50);
        assert_eq!(config.pipeline.step_timeout_secs, 300);
        assert!(config.youtube.is_none());
        assert_eq!(config.instagram.base_url, "https://www.instagram.com");
        assert_eq!(config.rate_limit.api.max_retries, 3);
        assert_eq!(config.rate_limit.oembed.initial_rate, 1.0);
    }

    #[test]
    fn test_load_full_config() {
        let content = format!(
            r#"{}
[pipeline]
batch-size = 25
max-items = 120

[youtube]
api-key = "abc123"

[rate-limit.api]
initial-rate = 4.0
min-rate = 1.0
max-rate = 8.0
backoff-multiplier = 2.0
recovery-factor = 1.2
max-retries = 5
"#,
            MINIMAL
        );
        let file = create_temp_config(&content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.pipeline.batch_size, 25);
        assert_eq!(config.pipeline.max_items, 120);
        let youtube = config.youtube.unwrap();
        assert_eq!(youtube.api_key.as_deref(), Some("abc123"));
        assert_eq!(youtube.base_url, "https://www.googleapis.com/youtube/v3");
        assert_eq!(config.rate_limit.api.initial_rate, 4.0);
        assert_eq!(config.rate_limit.api.max_retries, 5);
    }

    #[test]
    fn test_load_errors_by_kind() {
        assert!(matches!(
            load_config(Path::new("/nonexistent/creator-scope.toml")),
            Err(ConfigError::Io(_))
        ));

        let garbled = create_temp_config("[user-agent\nclient-name = ");
        assert!(matches!(load_config(garbled.path()), Err(ConfigError::Parse(_))));

        // Well-formed TOML missing the required [output] table
        let incomplete = create_temp_config(&MINIMAL.replace("[output]", "[other]"));
        assert!(matches!(load_config(incomplete.path()), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_invalid_rate_limit_is_rejected_at_load() {
        let content = format!(
            r#"{}
[rate-limit.api]
initial-rate = 10.0
min-rate = 1.0
max-rate = 5.0
backoff-multiplier = 2.0
recovery-factor = 1.1
max-retries = 3
"#,
            MINIMAL
        );
        let file = create_temp_config(&content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_hash_tracks_file_content() {
        let first = create_temp_config(MINIMAL);
        let same = create_temp_config(MINIMAL);
        let edited = create_temp_config(&MINIMAL.replace("0.1", "0.2"));

        let hash = compute_config_hash(first.path()).unwrap();
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, compute_config_hash(same.path()).unwrap());
        assert_ne!(hash, compute_config_hash(edited.path()).unwrap());

        let (config, loaded_hash) = load_config_with_hash(first.path()).unwrap();
        assert_eq!(loaded_hash, hash);
        assert_eq!(config.output.database_path, "./test.db");
    }
}
