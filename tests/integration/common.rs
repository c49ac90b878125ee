use creator_scope::client::SourceRegistry;
use creator_scope::config::{
    Config, InstagramConfig, OutputConfig, PipelineConfig, RateLimitConfig, RateLimitSettings,
    UserAgentConfig, YouTubeConfig,
};
use creator_scope::pipeline::AnalysisPipeline;
use creator_scope::storage::SqliteStorage;
use creator_scope::{JobTracker, RateLimiter};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

pub const API_KEY: &str = "test-key";

/// Limiter settings fast enough to keep tests quick
pub fn fast_limits() -> RateLimitSettings {
    RateLimitSettings {
        initial_rate: 1000.0,
        min_rate: 100.0,
        max_rate: 1000.0,
        backoff_multiplier: 2.0,
        recovery_factor: 1.1,
        max_retries: 1,
    }
}

/// Creates a test configuration pointing every source at `server_uri`
pub fn create_test_config(server_uri: &str, db_path: &Path) -> Config {
    Config {
        user_agent: UserAgentConfig {
            client_name: "TestScope".to_string(),
            client_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.display().to_string(),
            report_dir: db_path
                .parent()
                .unwrap_or(Path::new("."))
                .join("reports")
                .display()
                .to_string(),
        },
        pipeline: PipelineConfig {
            batch_size: 50,
            max_items: 500,
            step_timeout_secs: 30,
            request_timeout_secs: 5,
            poll_interval_ms: 50,
        },
        youtube: Some(YouTubeConfig {
            api_key: Some(API_KEY.to_string()),
            base_url: server_uri.to_string(),
        }),
        instagram: InstagramConfig {
            base_url: server_uri.to_string(),
            oembed_url: format!("{}/oembed/", server_uri),
            access_token: None,
            app_id: "1234567890".to_string(),
        },
        rate_limit: RateLimitConfig {
            api: fast_limits(),
            oembed: fast_limits(),
        },
    }
}

/// A database file inside a fresh temporary directory
pub struct TestDb {
    pub dir: TempDir,
}

impl TestDb {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> std::path::PathBuf {
        self.dir.path().join("scope.db")
    }

    pub fn tracker(&self) -> JobTracker {
        JobTracker::new(SqliteStorage::new(&self.path()).expect("Failed to open database"))
    }
}

/// Builds a pipeline the way the binary does
pub fn create_pipeline(config: &Config, tracker: JobTracker) -> AnalysisPipeline {
    let api_limiter = RateLimiter::new("api", config.rate_limit.api.clone()).unwrap();
    let oembed_limiter = RateLimiter::new("oembed", config.rate_limit.oembed.clone()).unwrap();
    let sources = SourceRegistry::from_config(config, Arc::new(oembed_limiter)).unwrap();

    AnalysisPipeline::new(
        tracker,
        sources,
        Arc::new(api_limiter),
        config.pipeline.clone(),
    )
}
