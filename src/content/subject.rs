//! Creator identifier parsing
//!
//! Accepts the forms users paste into the analyze box:
//!
//! - `https://www.youtube.com/channel/UC...`
//! - `https://www.youtube.com/@handle`
//! - `https://www.youtube.com/c/name` and `https://www.youtube.com/user/name`
//! - `https://www.instagram.com/username/`
//! - `username` or `@username` (Instagram)

use super::Platform;
use crate::ScopeError;
use url::Url;

/// Subject id stored on a job until the background task resolves it
pub const UNKNOWN_SUBJECT_ID: &str = "unknown";

const MAX_INSTAGRAM_USERNAME_LEN: usize = 30;

/// Instagram paths that are not profiles
const RESERVED_INSTAGRAM_PATHS: &[&str] = &[
    "p", "reel", "reels", "tv", "explore", "stories", "accounts", "direct",
];

/// How the creator was identified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectRef {
    /// `UC...` channel id, already resolved
    ChannelId(String),
    /// YouTube handle without the `@`
    Handle(String),
    /// Legacy `/user/` or `/c/` channel name
    Username(String),
    /// Lowercased Instagram username
    InstagramUsername(String),
}

/// A parsed creator identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub platform: Platform,
    pub reference: SubjectRef,
}

impl Subject {
    /// The platform id, if the identifier already carries it
    pub fn known_subject_id(&self) -> Option<&str> {
        match &self.reference {
            SubjectRef::ChannelId(id) => Some(id),
            _ => None,
        }
    }

    /// Id to store on a fresh job row
    pub fn initial_subject_id(&self) -> &str {
        self.known_subject_id().unwrap_or(UNKNOWN_SUBJECT_ID)
    }

    /// Name shown before the parent metadata is fetched
    pub fn display_name(&self) -> String {
        match &self.reference {
            SubjectRef::ChannelId(id) => id.clone(),
            SubjectRef::Handle(handle) => format!("@{}", handle),
            SubjectRef::Username(name) | SubjectRef::InstagramUsername(name) => name.clone(),
        }
    }
}

/// Parses a channel URL, profile URL or bare username
///
/// # Examples
///
/// ```
/// use creator_scope::content::{parse_subject, SubjectRef};
/// use creator_scope::Platform;
///
/// let subject = parse_subject("https://www.youtube.com/@SomeCreator").unwrap();
/// assert_eq!(subject.platform, Platform::YouTube);
/// assert_eq!(subject.reference, SubjectRef::Handle("SomeCreator".to_string()));
///
/// let subject = parse_subject("@some.creator").unwrap();
/// assert_eq!(subject.platform, Platform::Instagram);
/// ```
pub fn parse_subject(input: &str) -> Result<Subject, ScopeError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ScopeError::Validation(
            "creator identifier is empty".to_string(),
        ));
    }

    let lowered = input.to_ascii_lowercase();
    let looks_like_url = lowered.contains("://")
        || ["youtube.com", "www.youtube.com", "m.youtube.com", "instagram.com", "www.instagram.com"]
            .iter()
            .any(|host| lowered.starts_with(&format!("{}/", host)));

    if !looks_like_url {
        let username = input.strip_prefix('@').unwrap_or(input);
        return validate_instagram_username(username).map(|name| Subject {
            platform: Platform::Instagram,
            reference: SubjectRef::InstagramUsername(name),
        });
    }

    let with_scheme = if lowered.contains("://") {
        input.to_string()
    } else {
        format!("https://{}", input)
    };
    let url = Url::parse(&with_scheme)
        .map_err(|e| ScopeError::Validation(format!("invalid URL {}: {}", input, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ScopeError::Validation(format!(
            "unsupported URL scheme: {}",
            url.scheme()
        )));
    }

    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .unwrap_or(&host);

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    match host {
        "youtube.com" => parse_youtube_path(input, &segments),
        "instagram.com" => match segments.first() {
            Some(first) if !RESERVED_INSTAGRAM_PATHS.contains(first) => {
                validate_instagram_username(first).map(|name| Subject {
                    platform: Platform::Instagram,
                    reference: SubjectRef::InstagramUsername(name),
                })
            }
            _ => Err(ScopeError::Validation(format!(
                "not an Instagram profile URL: {}",
                input
            ))),
        },
        _ => Err(ScopeError::Validation(format!(
            "unsupported creator URL: {}",
            input
        ))),
    }
}

fn parse_youtube_path(input: &str, segments: &[&str]) -> Result<Subject, ScopeError> {
    let reference = match segments {
        ["channel", id, ..] if id.starts_with("UC") && id.len() > 2 => {
            SubjectRef::ChannelId(id.to_string())
        }
        [first, ..] if first.starts_with('@') && first.len() > 1 => {
            SubjectRef::Handle(first[1..].to_string())
        }
        ["c", name, ..] | ["user", name, ..] => SubjectRef::Username(name.to_string()),
        _ => {
            return Err(ScopeError::Validation(format!(
                "not a YouTube channel URL: {}",
                input
            )))
        }
    };

    Ok(Subject {
        platform: Platform::YouTube,
        reference,
    })
}

fn validate_instagram_username(name: &str) -> Result<String, ScopeError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_INSTAGRAM_USERNAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');

    if valid {
        Ok(name.to_ascii_lowercase())
    } else {
        Err(ScopeError::Validation(format!(
            "invalid Instagram username: {}",
            name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_youtube_channel_id() {
        let subject =
            parse_subject("https://www.youtube.com/channel/UCabc123XYZ/videos").unwrap();
        assert_eq!(subject.platform, Platform::YouTube);
        assert_eq!(
            subject.reference,
            SubjectRef::ChannelId("UCabc123XYZ".to_string())
        );
        assert_eq!(subject.initial_subject_id(), "UCabc123XYZ");
    }

    #[test]
    fn test_youtube_handle_without_scheme() {
        let subject = parse_subject("youtube.com/@Creator").unwrap();
        assert_eq!(subject.reference, SubjectRef::Handle("Creator".to_string()));
        assert_eq!(subject.initial_subject_id(), UNKNOWN_SUBJECT_ID);
        assert_eq!(subject.display_name(), "@Creator");
    }

    #[test]
    fn test_youtube_legacy_names() {
        assert_eq!(
            parse_subject("https://youtube.com/user/oldname").unwrap().reference,
            SubjectRef::Username("oldname".to_string())
        );
        assert_eq!(
            parse_subject("https://m.youtube.com/c/custom").unwrap().reference,
            SubjectRef::Username("custom".to_string())
        );
    }

    #[test]
    fn test_youtube_video_url_rejected() {
        assert!(matches!(
            parse_subject("https://www.youtube.com/watch?v=abc"),
            Err(ScopeError::Validation(_))
        ));
    }

    #[test]
    fn test_instagram_profile_url() {
        let subject = parse_subject("https://www.instagram.com/Some.Creator/").unwrap();
        assert_eq!(subject.platform, Platform::Instagram);
        assert_eq!(
            subject.reference,
            SubjectRef::InstagramUsername("some.creator".to_string())
        );
    }

    #[test]
    fn test_instagram_post_url_rejected() {
        assert!(parse_subject("https://www.instagram.com/p/ABC123/").is_err());
    }

    #[test]
    fn test_bare_usernames() {
        assert_eq!(
            parse_subject("@runner_jo").unwrap().reference,
            SubjectRef::InstagramUsername("runner_jo".to_string())
        );
        assert_eq!(
            parse_subject("  runner_jo ").unwrap().reference,
            SubjectRef::InstagramUsername("runner_jo".to_string())
        );
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(parse_subject("").is_err());
        assert!(parse_subject("has spaces").is_err());
        assert!(parse_subject(&"a".repeat(31)).is_err());
        assert!(parse_subject("https://example.com/creator").is_err());
        assert!(parse_subject("ftp://youtube.com/@x").is_err());
    }
}
