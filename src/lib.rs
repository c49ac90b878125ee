//! Creator-Scope: creator analytics job engine
//!
//! This crate tracks long-running creator analyses (YouTube channels and
//! Instagram profiles), fetching public metadata through rate-limited external
//! clients, persisting it in SQLite, and aggregating the results into
//! paginated, performance-segmented views.

pub mod aggregate;
pub mod batch;
pub mod client;
pub mod config;
pub mod content;
pub mod limiter;
pub mod output;
pub mod pipeline;
pub mod state;
pub mod storage;
pub mod tracker;

use thiserror::Error;

/// Main error type for Creator-Scope operations
#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Analysis not found: {0}")]
    NotFound(String),

    #[error("Analysis already exists: {0}")]
    DuplicateJob(String),

    #[error("Invalid status transition for {analysis_id}: {from} -> {to}")]
    InvalidTransition {
        analysis_id: String,
        from: state::JobStatus,
        to: state::JobStatus,
    },

    #[error(transparent)]
    External(#[from] ExternalError),

    #[error("Storage error: {0}")]
    Storage(storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<storage::StorageError> for ScopeError {
    fn from(err: storage::StorageError) -> Self {
        match err {
            storage::StorageError::DuplicateAnalysis(id) => Self::DuplicateJob(id),
            storage::StorageError::AnalysisNotFound(id) => Self::NotFound(id),
            other => Self::Storage(other),
        }
    }
}

/// Configuration-specific errors
///
/// Also raised by [`limiter::RateLimiter::new`] when its settings are invalid.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Failures reported by third-party APIs and scrapers
#[derive(Debug, Error)]
pub enum ExternalError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("API quota exceeded for {url}")]
    QuotaExceeded { url: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timed out after {seconds}s: {operation}")]
    Timeout { operation: String, seconds: u64 },

    #[error("Failed to parse response from {url}: {message}")]
    Parse { url: String, message: String },
}

/// Result type alias for Creator-Scope operations
pub type Result<T> = std::result::Result<T, ScopeError>;

/// Result type alias for external service calls
pub type ExternalResult<T> = std::result::Result<T, ExternalError>;

// Re-export commonly used types
pub use config::Config;
pub use content::{ContentItem, ParentInfo, Platform, Subject};
pub use limiter::{LimiterStats, RateLimiter};
pub use state::{BatchStatus, JobStatus};
pub use tracker::JobTracker;
