//! Creator and content domain types
//!
//! - `Subject`: a parsed creator identifier (channel URL, profile URL, username)
//! - `ParentInfo`: channel / profile level metadata
//! - `ContentItem`: one video, reel or post belonging to a parent
//! - caption analysis helpers for hashtags and mentions

mod subject;
mod text;

pub use subject::{parse_subject, Subject, SubjectRef, UNKNOWN_SUBJECT_ID};
pub use text::{decode_html_entities, extract_hashtags, extract_mentions, extract_shortcode};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform a creator lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    YouTube,
    Instagram,
}

impl Platform {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::YouTube => "youtube",
            Self::Instagram => "instagram",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "youtube" => Some(Self::YouTube),
            "instagram" => Some(Self::Instagram),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Kind of content item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Video,
    Reel,
    Post,
}

impl ContentKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Reel => "reel",
            Self::Post => "post",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "video" => Some(Self::Video),
            "reel" => Some(Self::Reel),
            "post" => Some(Self::Post),
            _ => None,
        }
    }
}

/// Channel or profile metadata for one analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentInfo {
    pub platform: Platform,

    /// Channel id or Instagram user id
    pub subject_id: String,

    /// Handle or username, without a leading `@`
    pub username: Option<String>,

    pub display_name: String,
    pub description: Option<String>,
    pub profile_url: Option<String>,
    pub avatar_url: Option<String>,

    /// Subscribers (YouTube) or followers (Instagram)
    pub audience_size: Option<u64>,
    pub following_count: Option<u64>,
    pub media_count: Option<u64>,
    pub total_views: Option<u64>,
    pub is_verified: Option<bool>,
    pub is_private: Option<bool>,

    /// YouTube uploads playlist used to enumerate videos
    pub uploads_playlist_id: Option<String>,
}

impl ParentInfo {
    /// Creates metadata with only the required identity fields set
    pub fn new(platform: Platform, subject_id: &str, display_name: &str) -> Self {
        Self {
            platform,
            subject_id: subject_id.to_string(),
            username: None,
            display_name: display_name.to_string(),
            description: None,
            profile_url: None,
            avatar_url: None,
            audience_size: None,
            following_count: None,
            media_count: None,
            total_views: None,
            is_verified: None,
            is_private: None,
            uploads_playlist_id: None,
        }
    }
}

/// One video, reel or post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub item_id: String,
    pub kind: ContentKind,
    pub url: String,
    pub thumbnail_url: Option<String>,

    /// Video title or post caption
    pub caption: String,

    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    pub date_posted: Option<DateTime<Utc>>,
    pub duration_seconds: Option<u32>,

    /// In order of appearance, without `#`
    pub hashtags: Vec<String>,

    /// In order of appearance, without `@`
    pub mentions: Vec<String>,
}

impl ContentItem {
    /// Creates an item with zeroed metrics and tags taken from the caption
    pub fn new(item_id: &str, kind: ContentKind, url: &str, caption: &str) -> Self {
        Self {
            item_id: item_id.to_string(),
            kind,
            url: url.to_string(),
            thumbnail_url: None,
            caption: caption.to_string(),
            view_count: 0,
            like_count: 0,
            comment_count: 0,
            date_posted: None,
            duration_seconds: None,
            hashtags: extract_hashtags(caption),
            mentions: extract_mentions(caption),
        }
    }
}
