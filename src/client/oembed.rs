//! Rate-limited oEmbed lookups for single Instagram posts

use super::http::{redacted, send_json};
use crate::config::InstagramConfig;
use crate::content::{decode_html_entities, extract_shortcode, ContentItem, ContentKind};
use crate::limiter::RateLimiter;
use crate::{ExternalError, ExternalResult};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

/// Raw oEmbed response
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OEmbedPayload {
    /// Post caption, HTML-escaped
    pub title: Option<String>,
    pub author_name: Option<String>,
    pub author_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub thumbnail_width: Option<u32>,
    pub thumbnail_height: Option<u32>,
    pub html: Option<String>,
    pub provider_name: Option<String>,
}

impl OEmbedPayload {
    /// Converts the payload into a content item for `post_url`
    ///
    /// oEmbed carries no engagement counts, so metrics stay at zero.
    pub fn to_content_item(&self, post_url: &str) -> ContentItem {
        let caption = self
            .title
            .as_deref()
            .map(decode_html_entities)
            .unwrap_or_default();
        let kind = if post_url.contains("/reel/") || post_url.contains("/reels/") {
            ContentKind::Reel
        } else {
            ContentKind::Post
        };
        let item_id = extract_shortcode(post_url).unwrap_or_else(|| post_url.to_string());

        let mut item = ContentItem::new(&item_id, kind, post_url, &caption);
        item.thumbnail_url = self.thumbnail_url.clone();
        item
    }
}

/// oEmbed client; every request goes through the shared limiter
#[derive(Clone)]
pub struct OEmbedClient {
    http: Client,
    endpoint: String,
    access_token: Option<String>,
    limiter: Arc<RateLimiter>,
}

impl OEmbedClient {
    pub fn new(http: Client, config: &InstagramConfig, limiter: Arc<RateLimiter>) -> Self {
        Self {
            http,
            endpoint: config.oembed_url.clone(),
            access_token: config.access_token.clone().filter(|t| !t.is_empty()),
            limiter,
        }
    }

    /// Fetches the oEmbed payload of one post under the rate limiter
    ///
    /// Failures are retried by the limiter; the last error is returned.
    pub async fn fetch_single_item(&self, post_url: &str) -> ExternalResult<OEmbedPayload> {
        self.limiter.execute(|| self.request(post_url)).await
    }

    /// Fetches one post and converts it into a content item
    pub async fn fetch_item(&self, post_url: &str) -> ExternalResult<ContentItem> {
        let payload = self.fetch_single_item(post_url).await?;
        Ok(payload.to_content_item(post_url))
    }

    async fn request(&self, post_url: &str) -> ExternalResult<OEmbedPayload> {
        let mut url = Url::parse(&self.endpoint).map_err(|e| ExternalError::Parse {
            url: self.endpoint.clone(),
            message: e.to_string(),
        })?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("url", post_url);
            if let Some(token) = &self.access_token {
                query.append_pair("access_token", token);
            }
        }

        tracing::debug!("oEmbed lookup {} via {}", post_url, redacted(&url));
        send_json(self.http.get(url.clone()), &url).await
    }
}
