//! YouTube Data API v3 client

use super::http::{endpoint, send_json};
use super::{ChildPage, ContentSource, ResolvedSubject, MAX_DETAIL_BATCH};
use crate::config::YouTubeConfig;
use crate::content::{
    extract_hashtags, extract_mentions, ContentItem, ContentKind, ParentInfo, Platform, Subject,
    SubjectRef,
};
use crate::{ConfigError, ExternalError, ExternalResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::sync::LazyLock;
use url::Url;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$").expect("valid regex")
});

/// Parses an ISO-8601 video duration such as `PT1H2M3S` into seconds
pub fn parse_iso8601_duration(value: &str) -> Option<u32> {
    let caps = DURATION_RE.captures(value)?;
    let part = |i: usize| -> Option<u32> {
        caps.get(i)
            .map(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(Some(0))
    };

    let total = u64::from(part(1)?) * 86_400
        + u64::from(part(2)?) * 3_600
        + u64::from(part(3)?) * 60
        + u64::from(part(4)?);
    u32::try_from(total).ok()
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

impl Thumbnails {
    fn best(self) -> Option<String> {
        self.high.or(self.medium).or(self.default).map(|t| t.url)
    }
}

#[derive(Debug, Deserialize)]
struct ChannelSnippet {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "customUrl")]
    custom_url: Option<String>,
    #[serde(default)]
    thumbnails: Thumbnails,
}

/// Counts arrive as decimal strings
#[derive(Debug, Default, Deserialize)]
struct ChannelStatistics {
    #[serde(rename = "subscriberCount")]
    subscriber_count: Option<String>,
    #[serde(rename = "videoCount")]
    video_count: Option<String>,
    #[serde(rename = "viewCount")]
    view_count: Option<String>,
    #[serde(rename = "hiddenSubscriberCount", default)]
    hidden_subscriber_count: bool,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChannelContentDetails {
    #[serde(rename = "relatedPlaylists")]
    related_playlists: RelatedPlaylists,
}

#[derive(Debug, Deserialize)]
struct Channel {
    id: String,
    snippet: Option<ChannelSnippet>,
    statistics: Option<ChannelStatistics>,
    #[serde(rename = "contentDetails")]
    content_details: Option<ChannelContentDetails>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemDetails {
    #[serde(rename = "videoId")]
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    #[serde(rename = "contentDetails")]
    content_details: PlaylistItemDetails,
}

#[derive(Debug, Deserialize)]
struct VideoSnippet {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "publishedAt")]
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct VideoStatistics {
    #[serde(rename = "viewCount")]
    view_count: Option<String>,
    #[serde(rename = "likeCount")]
    like_count: Option<String>,
    #[serde(rename = "commentCount")]
    comment_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoContentDetails {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Video {
    id: String,
    snippet: VideoSnippet,
    #[serde(default)]
    statistics: VideoStatistics,
    #[serde(rename = "contentDetails")]
    content_details: Option<VideoContentDetails>,
}

fn count(value: Option<&String>) -> Option<u64> {
    value.and_then(|v| v.parse().ok())
}

/// YouTube channel source
pub struct YouTubeClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl YouTubeClient {
    /// Creates a client; fails if no API key is configured
    pub fn new(http: Client, config: &YouTubeConfig) -> Result<Self, ConfigError> {
        let api_key = config.resolved_api_key().ok_or_else(|| {
            ConfigError::Validation(
                "youtube.api-key is not set and YOUTUBE_API_KEY is empty".to_string(),
            )
        })?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key,
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> ExternalResult<T> {
        let mut url: Url = endpoint(&self.base_url, path)?;
        url.query_pairs_mut()
            .extend_pairs(query.iter())
            .append_pair("key", &self.api_key);

        tracing::debug!("GET {}{}", self.base_url, path);
        send_json(self.http.get(url.clone()), &url).await
    }

    async fn find_channel(&self, part: &str, filter: (&str, &str)) -> ExternalResult<Option<Channel>> {
        let response: ListResponse<Channel> =
            self.get("channels", &[("part", part), filter]).await?;
        Ok(response.items.into_iter().next())
    }

    async fn lookup_channel(&self, subject: &Subject) -> ExternalResult<Channel> {
        let found = match &subject.reference {
            SubjectRef::ChannelId(id) => self.find_channel("snippet", ("id", id.as_str())).await?,
            SubjectRef::Handle(handle) => {
                let handle = format!("@{}", handle);
                self.find_channel("snippet", ("forHandle", handle.as_str())).await?
            }
            SubjectRef::Username(name) => {
                // Custom /c/ names usually match the handle once forUsername misses
                match self.find_channel("snippet", ("forUsername", name.as_str())).await? {
                    Some(channel) => Some(channel),
                    None => {
                        let handle = format!("@{}", name);
                        self.find_channel("snippet", ("forHandle", handle.as_str())).await?
                    }
                }
            }
            SubjectRef::InstagramUsername(name) => {
                return Err(ExternalError::NotFound(format!(
                    "{} is not a YouTube channel",
                    name
                )))
            }
        };

        found.ok_or_else(|| {
            ExternalError::NotFound(format!("YouTube channel {}", subject.display_name()))
        })
    }
}

#[async_trait]
impl ContentSource for YouTubeClient {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    async fn resolve_subject(&self, subject: &Subject) -> ExternalResult<ResolvedSubject> {
        let channel = self.lookup_channel(subject).await?;
        let snippet = channel.snippet;

        Ok(ResolvedSubject {
            display_name: snippet
                .as_ref()
                .map(|s| s.title.clone())
                .unwrap_or_else(|| channel.id.clone()),
            username: snippet
                .and_then(|s| s.custom_url)
                .map(|u| u.trim_start_matches('@').to_string()),
            subject_id: channel.id,
        })
    }

    async fn fetch_parent(&self, resolved: &ResolvedSubject) -> ExternalResult<ParentInfo> {
        let channel = self
            .find_channel(
                "snippet,statistics,contentDetails",
                ("id", resolved.subject_id.as_str()),
            )
            .await?
            .ok_or_else(|| {
                ExternalError::NotFound(format!("YouTube channel {}", resolved.subject_id))
            })?;

        let mut parent = ParentInfo::new(Platform::YouTube, &channel.id, &resolved.display_name);
        parent.profile_url = Some(format!("https://www.youtube.com/channel/{}", channel.id));
        parent.username = resolved.username.clone();

        if let Some(snippet) = channel.snippet {
            parent.display_name = snippet.title;
            parent.description = Some(snippet.description).filter(|d| !d.is_empty());
            parent.avatar_url = snippet.thumbnails.best();
        }

        if let Some(stats) = channel.statistics {
            if !stats.hidden_subscriber_count {
                parent.audience_size = count(stats.subscriber_count.as_ref());
            }
            parent.media_count = count(stats.video_count.as_ref());
            parent.total_views = count(stats.view_count.as_ref());
        }

        parent.uploads_playlist_id = channel
            .content_details
            .and_then(|d| d.related_playlists.uploads);

        Ok(parent)
    }

    async fn enumerate_children(
        &self,
        parent: &ParentInfo,
        page_token: Option<&str>,
    ) -> ExternalResult<ChildPage> {
        let playlist = parent.uploads_playlist_id.as_deref().ok_or_else(|| {
            ExternalError::NotFound(format!(
                "uploads playlist for channel {}",
                parent.subject_id
            ))
        })?;

        let page_size = MAX_DETAIL_BATCH.to_string();
        let mut query = vec![
            ("part", "contentDetails"),
            ("playlistId", playlist),
            ("maxResults", page_size.as_str()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response: ListResponse<PlaylistItem> = self.get("playlistItems", &query).await?;

        Ok(ChildPage {
            ids: response
                .items
                .into_iter()
                .map(|item| item.content_details.video_id)
                .collect(),
            next_page_token: response.next_page_token,
        })
    }

    async fn fetch_child_details(
        &self,
        _parent: &ParentInfo,
        ids: &[String],
    ) -> ExternalResult<Vec<ContentItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let id_list = ids[..ids.len().min(MAX_DETAIL_BATCH)].join(",");
        let response: ListResponse<Video> = self
            .get(
                "videos",
                &[
                    ("part", "snippet,statistics,contentDetails"),
                    ("id", id_list.as_str()),
                ],
            )
            .await?;

        Ok(response.items.into_iter().map(video_to_item).collect())
    }
}

fn video_to_item(video: Video) -> ContentItem {
    let url = format!("https://www.youtube.com/watch?v={}", video.id);
    let mut item = ContentItem::new(&video.id, ContentKind::Video, &url, &video.snippet.title);

    let text = format!("{}\n{}", video.snippet.title, video.snippet.description);
    item.hashtags = extract_hashtags(&text);
    item.mentions = extract_mentions(&text);

    item.thumbnail_url = video.snippet.thumbnails.best();
    item.date_posted = video.snippet.published_at;
    item.view_count = count(video.statistics.view_count.as_ref()).unwrap_or(0);
    item.like_count = count(video.statistics.like_count.as_ref()).unwrap_or(0);
    item.comment_count = count(video.statistics.comment_count.as_ref()).unwrap_or(0);
    item.duration_seconds = video
        .content_details
        .and_then(|d| d.duration)
        .and_then(|d| parse_iso8601_duration(&d));

    item
}
