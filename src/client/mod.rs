//! Outbound clients for creator data
//!
//! This module contains the collaborators the analysis pipeline talks to:
//! - HTTP client construction with the configured user agent
//! - The `ContentSource` trait implemented per platform
//! - YouTube Data API and Instagram profile clients
//! - The rate-limited oEmbed client for single posts

mod http;
mod instagram;
mod oembed;
mod youtube;

pub use http::build_http_client;
pub use instagram::InstagramClient;
pub use oembed::{OEmbedClient, OEmbedPayload};
pub use youtube::{parse_iso8601_duration, YouTubeClient};

use crate::config::Config;
use crate::content::{ContentItem, ParentInfo, Platform, Subject};
use crate::limiter::RateLimiter;
use crate::{ConfigError, ExternalResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Largest number of ids a detail fetch accepts
pub const MAX_DETAIL_BATCH: usize = 50;

/// Identity of a subject after resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSubject {
    /// Channel id or Instagram user id
    pub subject_id: String,
    pub display_name: String,
    /// Handle or username, when the platform has one
    pub username: Option<String>,
}

/// One page of child content ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildPage {
    pub ids: Vec<String>,
    /// Token for the next page, `None` on the last page
    pub next_page_token: Option<String>,
}

/// A platform that can describe a creator and their content
///
/// Child ids are opaque to callers: they come from `enumerate_children` and
/// go back into `fetch_child_details` unchanged.
#[async_trait]
pub trait ContentSource: Send + Sync {
    fn platform(&self) -> Platform;

    /// Turns a parsed subject into a platform id and display name
    async fn resolve_subject(&self, subject: &Subject) -> ExternalResult<ResolvedSubject>;

    /// Fetches channel or profile metadata
    async fn fetch_parent(&self, resolved: &ResolvedSubject) -> ExternalResult<ParentInfo>;

    /// Returns one page of child ids
    async fn enumerate_children(
        &self,
        parent: &ParentInfo,
        page_token: Option<&str>,
    ) -> ExternalResult<ChildPage>;

    /// Whether `fetch_child_details` rate-limits each lookup itself
    ///
    /// When true the pipeline calls it without its own limiter or step
    /// timeout around the batch.
    fn paces_details(&self) -> bool {
        false
    }

    /// Fetches details for at most [`MAX_DETAIL_BATCH`] ids
    async fn fetch_child_details(
        &self,
        parent: &ParentInfo,
        ids: &[String],
    ) -> ExternalResult<Vec<ContentItem>>;
}

/// Content sources keyed by platform
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: HashMap<Platform, Arc<dyn ContentSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a source, replacing any previous one for its platform
    pub fn register(&mut self, source: Arc<dyn ContentSource>) {
        self.sources.insert(source.platform(), source);
    }

    pub fn get(&self, platform: Platform) -> Option<Arc<dyn ContentSource>> {
        self.sources.get(&platform).cloned()
    }

    /// Builds the YouTube and Instagram sources described by `config`
    ///
    /// YouTube is registered only when an API key is available.
    pub fn from_config(
        config: &Config,
        oembed_limiter: Arc<RateLimiter>,
    ) -> Result<Self, ConfigError> {
        let http = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.pipeline.request_timeout_secs),
        )
        .map_err(|e| ConfigError::Validation(format!("failed to build HTTP client: {}", e)))?;

        let mut registry = Self::new();

        if let Some(youtube) = &config.youtube {
            match YouTubeClient::new(http.clone(), youtube) {
                Ok(client) => registry.register(Arc::new(client)),
                Err(e) => tracing::warn!("YouTube source disabled: {}", e),
            }
        }

        let oembed = OEmbedClient::new(http.clone(), &config.instagram, oembed_limiter);
        registry.register(Arc::new(InstagramClient::new(
            http,
            &config.instagram,
            oembed,
        )));

        Ok(registry)
    }
}
