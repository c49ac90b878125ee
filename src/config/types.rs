use serde::Deserialize;

/// Main configuration structure for Creator-Scope
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub youtube: Option<YouTubeConfig>,
    #[serde(default)]
    pub instagram: InstagramConfig,
    #[serde(rename = "rate-limit", default)]
    pub rate_limit: RateLimitConfig,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the client
    #[serde(rename = "client-name")]
    pub client_name: String,

    /// Version of the client
    #[serde(rename = "client-version")]
    pub client_version: String,

    /// URL with information about the client
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Directory where creator reports are written
    #[serde(rename = "report-dir", default = "default_report_dir")]
    pub report_dir: String,
}

/// Background analysis behavior
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Number of child ids per detail fetch (at most 50)
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum number of content items enumerated per analysis
    #[serde(rename = "max-items", default = "default_max_items")]
    pub max_items: usize,

    /// Upper bound for any single external step, in seconds
    #[serde(rename = "step-timeout-secs", default = "default_step_timeout")]
    pub step_timeout_secs: u64,

    /// Per-request HTTP timeout, in seconds
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Interval between status polls while waiting on a job (milliseconds)
    #[serde(rename = "poll-interval-ms", default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_items: default_max_items(),
            step_timeout_secs: default_step_timeout(),
            request_timeout_secs: default_request_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

/// YouTube Data API access
#[derive(Debug, Clone, Deserialize)]
pub struct YouTubeConfig {
    /// API key; falls back to the `YOUTUBE_API_KEY` environment variable
    #[serde(rename = "api-key", default)]
    pub api_key: Option<String>,

    #[serde(rename = "base-url", default = "default_youtube_base_url")]
    pub base_url: String,
}

impl YouTubeConfig {
    /// Returns the configured API key, or the one from the environment
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("YOUTUBE_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// Instagram endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct InstagramConfig {
    #[serde(rename = "base-url", default = "default_instagram_base_url")]
    pub base_url: String,

    #[serde(rename = "oembed-url", default = "default_oembed_url")]
    pub oembed_url: String,

    /// Optional Graph API token appended to oEmbed requests
    #[serde(rename = "access-token", default)]
    pub access_token: Option<String>,

    /// Web app id sent with profile info requests
    #[serde(rename = "app-id", default = "default_instagram_app_id")]
    pub app_id: String,
}

impl Default for InstagramConfig {
    fn default() -> Self {
        Self {
            base_url: default_instagram_base_url(),
            oembed_url: default_oembed_url(),
            access_token: None,
            app_id: default_instagram_app_id(),
        }
    }
}

/// Rate limiters for the two outbound paths
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RateLimitConfig {
    /// Paces batched API calls made by the analysis pipeline
    #[serde(default)]
    pub api: RateLimitSettings,

    /// Paces single-item oEmbed lookups
    #[serde(default = "RateLimitSettings::oembed_defaults")]
    pub oembed: RateLimitSettings,
}

/// Adaptive rate limiter parameters
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RateLimitSettings {
    /// Starting rate in requests per second
    #[serde(rename = "initial-rate")]
    pub initial_rate: f64,

    #[serde(rename = "min-rate")]
    pub min_rate: f64,

    #[serde(rename = "max-rate")]
    pub max_rate: f64,

    /// Divisor applied to the rate after a failure
    #[serde(rename = "backoff-multiplier")]
    pub backoff_multiplier: f64,

    /// Factor applied to the rate after a success
    #[serde(rename = "recovery-factor")]
    pub recovery_factor: f64,

    /// Retries after the first attempt
    #[serde(rename = "max-retries")]
    pub max_retries: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            initial_rate: 2.0,
            min_rate: 0.2,
            max_rate: 5.0,
            backoff_multiplier: 2.0,
            recovery_factor: 1.1,
            max_retries: 3,
        }
    }
}

impl RateLimitSettings {
    /// Slower defaults for the oEmbed endpoint
    pub fn oembed_defaults() -> Self {
        Self {
            initial_rate: 1.0,
            min_rate: 0.1,
            max_rate: 2.0,
            backoff_multiplier: 2.0,
            recovery_factor: 1.05,
            max_retries: 3,
        }
    }
}

fn default_report_dir() -> String {
    "./reports".to_string()
}

fn default_batch_size() -> usize {
    50
}

fn default_max_items() -> usize {
    500
}

fn default_step_timeout() -> u64 {
    300
}

fn default_request_timeout() -> u64 {
    30
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_youtube_base_url() -> String {
    "https://www.googleapis.com/youtube/v3".to_string()
}

fn default_instagram_base_url() -> String {
    "https://www.instagram.com".to_string()
}

fn default_oembed_url() -> String {
    "https://www.instagram.com/oembed/".to_string()
}

fn default_instagram_app_id() -> String {
    "936619743392459".to_string()
}
