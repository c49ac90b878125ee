//! Instagram profile source
//!
//! Profile metadata comes from the web profile info endpoint. Posts are
//! enumerated by scraping `/p/` and `/reel/` links from the public profile
//! page, and each post is described through the rate-limited oEmbed client.
//!
//! oEmbed carries no engagement data. The profile payload does, for the
//! most recent posts on its timeline: likes, comments, video views and the
//! posting time are merged into the oEmbed items by shortcode.

use super::http::{endpoint, send_json, send_text};
use super::oembed::OEmbedClient;
use super::{ChildPage, ContentSource, ResolvedSubject};
use crate::config::InstagramConfig;
use crate::content::{
    extract_shortcode, ContentItem, ParentInfo, Platform, Subject, SubjectRef,
};
use crate::{ExternalError, ExternalResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinSet;

/// Profiles kept between resolution and the later steps of an analysis
const PROFILE_CACHE_LIMIT: usize = 64;

static POST_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/(p|reel|reels)/([A-Za-z0-9_-]+)").expect("valid regex")
});
static EMBEDDED_SHORTCODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""shortcode"\s*:\s*"([A-Za-z0-9_-]+)""#).expect("valid regex")
});

#[derive(Debug, Deserialize)]
struct EdgeCount {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct ProfileUser {
    id: String,
    username: String,
    full_name: Option<String>,
    biography: Option<String>,
    profile_pic_url_hd: Option<String>,
    profile_pic_url: Option<String>,
    is_verified: Option<bool>,
    is_private: Option<bool>,
    edge_followed_by: Option<EdgeCount>,
    edge_follow: Option<EdgeCount>,
    edge_owner_to_timeline_media: Option<TimelineMedia>,
}

#[derive(Debug, Deserialize)]
struct TimelineMedia {
    count: u64,
    #[serde(default)]
    edges: Vec<TimelineEdge>,
}

#[derive(Debug, Deserialize)]
struct TimelineEdge {
    node: TimelineNode,
}

#[derive(Debug, Deserialize)]
struct TimelineNode {
    shortcode: String,
    product_type: Option<String>,
    edge_liked_by: Option<EdgeCount>,
    edge_media_preview_like: Option<EdgeCount>,
    edge_media_to_comment: Option<EdgeCount>,
    video_view_count: Option<u64>,
    video_duration: Option<f64>,
    taken_at_timestamp: Option<i64>,
}

/// Engagement of one timeline post
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct PostMetrics {
    pub likes: u64,
    pub comments: u64,
    pub views: u64,
    pub posted: Option<DateTime<Utc>>,
    pub duration_seconds: Option<u32>,
}

impl PostMetrics {
    fn from_node(node: &TimelineNode) -> Self {
        let likes = node
            .edge_liked_by
            .as_ref()
            .or(node.edge_media_preview_like.as_ref())
            .map_or(0, |e| e.count);

        Self {
            likes,
            comments: node.edge_media_to_comment.as_ref().map_or(0, |e| e.count),
            views: node.video_view_count.unwrap_or(0),
            posted: node
                .taken_at_timestamp
                .and_then(|ts| DateTime::from_timestamp(ts, 0)),
            duration_seconds: node
                .video_duration
                .filter(|d| d.is_finite() && *d >= 0.0)
                .map(|d| d.round() as u32),
        }
    }

    /// Copies the metrics onto an oEmbed-built item
    pub fn apply(&self, item: &mut ContentItem) {
        item.like_count = self.likes;
        item.comment_count = self.comments;
        item.view_count = self.views;
        if self.posted.is_some() {
            item.date_posted = self.posted;
        }
        if self.duration_seconds.is_some() {
            item.duration_seconds = self.duration_seconds;
        }
    }
}

impl TimelineNode {
    fn post_url(&self, base_url: &str) -> String {
        let kind = if self.product_type.as_deref() == Some("clips") {
            "reel"
        } else {
            "p"
        };
        format!("{}/{}/{}/", base_url, kind, self.shortcode)
    }
}

impl ProfileUser {
    /// Recent posts, newest first
    fn timeline(&self) -> impl Iterator<Item = &TimelineNode> {
        self.edge_owner_to_timeline_media
            .iter()
            .flat_map(|media| &media.edges)
            .map(|edge| &edge.node)
    }

    /// Timeline metrics keyed by shortcode
    fn timeline_metrics(&self) -> HashMap<String, PostMetrics> {
        self.timeline()
            .map(|node| (node.shortcode.clone(), PostMetrics::from_node(node)))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ProfileData {
    user: Option<ProfileUser>,
}

#[derive(Debug, Deserialize)]
struct ProfileEnvelope {
    data: ProfileData,
}

/// Extracts canonical post URLs from a profile page, in page order
///
/// Anchors are read first; if the page carries none (the usual case for
/// script-rendered profiles) embedded `"shortcode"` values are used.
pub(crate) fn extract_post_urls(html: &str, base_url: &str) -> Vec<String> {
    let base = base_url.trim_end_matches('/');
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    let document = Html::parse_document(html);
    if let Ok(selector) = Selector::parse("a[href]") {
        for element in document.select(&selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            if let Some(caps) = POST_PATH_RE.captures(href) {
                let kind = if &caps[1] == "p" { "p" } else { "reel" };
                let code = caps[2].to_string();
                if seen.insert(code.clone()) {
                    urls.push(format!("{}/{}/{}/", base, kind, code));
                }
            }
        }
    }

    if urls.is_empty() {
        for caps in EMBEDDED_SHORTCODE_RE.captures_iter(html) {
            let code = caps[1].to_string();
            if seen.insert(code.clone()) {
                urls.push(format!("{}/p/{}/", base, code));
            }
        }
    }

    urls
}

/// Instagram profile source
pub struct InstagramClient {
    http: Client,
    base_url: String,
    app_id: String,
    oembed: OEmbedClient,
    /// Latest profile payload per lowercase username
    profiles: Mutex<HashMap<String, Arc<ProfileUser>>>,
}

impl InstagramClient {
    pub fn new(http: Client, config: &InstagramConfig, oembed: OEmbedClient) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            app_id: config.app_id.clone(),
            oembed,
            profiles: Mutex::new(HashMap::new()),
        }
    }

    fn lock_profiles(&self) -> MutexGuard<'_, HashMap<String, Arc<ProfileUser>>> {
        self.profiles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cached_profile(&self, username: &str) -> Option<Arc<ProfileUser>> {
        self.lock_profiles().get(&username.to_lowercase()).cloned()
    }

    /// Fetches a profile and caches it for the rest of the analysis
    async fn load_profile(&self, username: &str) -> ExternalResult<Arc<ProfileUser>> {
        let user = Arc::new(self.fetch_profile(username).await?);

        let mut profiles = self.lock_profiles();
        if profiles.len() >= PROFILE_CACHE_LIMIT {
            profiles.clear();
        }
        profiles.insert(user.username.to_lowercase(), user.clone());
        if !user.username.eq_ignore_ascii_case(username) {
            profiles.insert(username.to_lowercase(), user.clone());
        }
        Ok(user)
    }

    /// Cached profile from resolution, fetched again only if evicted
    async fn profile(&self, username: &str) -> ExternalResult<Arc<ProfileUser>> {
        match self.cached_profile(username) {
            Some(user) => Ok(user),
            None => self.load_profile(username).await,
        }
    }

    async fn fetch_profile(&self, username: &str) -> ExternalResult<ProfileUser> {
        let mut url = endpoint(&self.base_url, "api/v1/users/web_profile_info/")?;
        url.query_pairs_mut().append_pair("username", username);

        let request = self.http.get(url.clone()).header("X-IG-App-ID", &self.app_id);
        let envelope: ProfileEnvelope = send_json(request, &url).await?;

        envelope
            .data
            .user
            .ok_or_else(|| ExternalError::NotFound(format!("Instagram profile {}", username)))
    }

    fn profile_url(&self, username: &str) -> String {
        format!("{}/{}/", self.base_url, username)
    }
}

fn username_of(resolved: &ResolvedSubject) -> ExternalResult<&str> {
    resolved
        .username
        .as_deref()
        .ok_or_else(|| ExternalError::NotFound(format!("username for {}", resolved.subject_id)))
}

#[async_trait]
impl ContentSource for InstagramClient {
    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    async fn resolve_subject(&self, subject: &Subject) -> ExternalResult<ResolvedSubject> {
        let SubjectRef::InstagramUsername(username) = &subject.reference else {
            return Err(ExternalError::NotFound(format!(
                "{} is not an Instagram profile",
                subject.display_name()
            )));
        };

        let user = self.load_profile(username).await?;
        let display_name = user
            .full_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| user.username.clone());

        Ok(ResolvedSubject {
            subject_id: user.id.clone(),
            display_name,
            username: Some(user.username.clone()),
        })
    }

    async fn fetch_parent(&self, resolved: &ResolvedSubject) -> ExternalResult<ParentInfo> {
        let username = username_of(resolved)?;
        let user = self.profile(username).await?;

        let mut parent = ParentInfo::new(Platform::Instagram, &user.id, &resolved.display_name);
        if let Some(name) = user.full_name.as_deref().filter(|n| !n.trim().is_empty()) {
            parent.display_name = name.to_string();
        }
        parent.profile_url = Some(self.profile_url(&user.username));
        parent.username = Some(user.username.clone());
        parent.description = user.biography.clone().filter(|b| !b.is_empty());
        parent.avatar_url = user
            .profile_pic_url_hd
            .clone()
            .or_else(|| user.profile_pic_url.clone());
        parent.audience_size = user.edge_followed_by.as_ref().map(|e| e.count);
        parent.following_count = user.edge_follow.as_ref().map(|e| e.count);
        parent.media_count = user.edge_owner_to_timeline_media.as_ref().map(|m| m.count);
        parent.is_verified = user.is_verified;
        parent.is_private = user.is_private;

        Ok(parent)
    }

    /// The profile page is a single page of links; `page_token` is unused
    async fn enumerate_children(
        &self,
        parent: &ParentInfo,
        _page_token: Option<&str>,
    ) -> ExternalResult<ChildPage> {
        let username = parent.username.as_deref().ok_or_else(|| {
            ExternalError::NotFound(format!("username for {}", parent.subject_id))
        })?;

        if parent.is_private == Some(true) {
            tracing::warn!("Instagram profile {} is private; no posts visible", username);
            return Ok(ChildPage::default());
        }

        let url = endpoint(&self.base_url, &format!("{}/", username))?;
        let html = send_text(self.http.get(url.clone()), &url).await?;

        let mut ids = extract_post_urls(&html, &self.base_url);
        tracing::debug!("Found {} post links on {}", ids.len(), url);

        // Timeline posts the page did not link to
        if let Some(user) = self.cached_profile(username) {
            let mut known: HashSet<String> =
                ids.iter().filter_map(|u| extract_shortcode(u)).collect();
            for node in user.timeline() {
                if known.insert(node.shortcode.clone()) {
                    ids.push(node.post_url(&self.base_url));
                }
            }
        }

        Ok(ChildPage {
            ids,
            next_page_token: None,
        })
    }

    fn paces_details(&self) -> bool {
        true
    }

    /// Looks up each post through oEmbed concurrently; the limiter paces them
    ///
    /// Posts that fail after retries are skipped. The batch fails only when
    /// every post in it failed.
    async fn fetch_child_details(
        &self,
        parent: &ParentInfo,
        ids: &[String],
    ) -> ExternalResult<Vec<ContentItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let metrics = parent
            .username
            .as_deref()
            .and_then(|u| self.cached_profile(u))
            .map(|user| user.timeline_metrics())
            .unwrap_or_default();

        let mut set = JoinSet::new();
        for (index, post_url) in ids.iter().enumerate() {
            let oembed = self.oembed.clone();
            let post_url = post_url.clone();
            set.spawn(async move { (index, oembed.fetch_item(&post_url).await) });
        }

        let mut items = Vec::with_capacity(ids.len());
        let mut first_error: Option<(usize, ExternalError)> = None;

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, Ok(item))) => items.push((index, item)),
                Ok((index, Err(e))) => {
                    tracing::warn!("Skipping {}: {}", ids[index], e);
                    if first_error.as_ref().map_or(true, |(i, _)| index < *i) {
                        first_error = Some((index, e));
                    }
                }
                Err(e) => tracing::warn!("oEmbed lookup task failed: {}", e),
            }
        }

        if items.is_empty() {
            if let Some((_, e)) = first_error {
                return Err(e);
            }
        }

        items.sort_by_key(|(index, _)| *index);
        Ok(items
            .into_iter()
            .map(|(_, mut item)| {
                if let Some(m) = metrics.get(&item.item_id) {
                    m.apply(&mut item);
                }
                item
            })
            .collect())
    }
}
