//! Configuration module for Creator-Scope
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use creator_scope::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("creator-scope.toml")).unwrap();
//! println!("Database: {}", config.output.database_path);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    Config, InstagramConfig, OutputConfig, PipelineConfig, RateLimitConfig, RateLimitSettings,
    UserAgentConfig, YouTubeConfig,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::MAX_BATCH_SIZE;
