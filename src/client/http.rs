//! Shared HTTP plumbing

use crate::config::UserAgentConfig;
use crate::{ExternalError, ExternalResult};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use creator_scope::client::build_http_client;
/// use creator_scope::config::UserAgentConfig;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     client_name: "CreatorScope".to_string(),
///     client_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    // Format: ClientName/Version (+ContactURL)
    let user_agent = format!(
        "{}/{} (+{})",
        config.client_name, config.client_version, config.contact_url
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// URL without its query string, safe to put in errors and logs
pub(crate) fn redacted(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}

/// Sends a request and returns the body of a successful response
///
/// 404 becomes `NotFound`; 429 and quota errors become `QuotaExceeded`.
pub(crate) async fn send_text(request: RequestBuilder, url: &Url) -> ExternalResult<String> {
    let shown = redacted(url);

    let response = request.send().await.map_err(|source| ExternalError::Http {
        url: shown.clone(),
        source,
    })?;
    let status = response.status();
    let body = response.text().await.map_err(|source| ExternalError::Http {
        url: shown.clone(),
        source,
    })?;

    if status.is_success() {
        return Ok(body);
    }

    match status {
        StatusCode::NOT_FOUND => Err(ExternalError::NotFound(shown)),
        StatusCode::TOO_MANY_REQUESTS => Err(ExternalError::QuotaExceeded { url: shown }),
        StatusCode::FORBIDDEN if body.contains("quotaExceeded") || body.contains("rateLimitExceeded") => {
            Err(ExternalError::QuotaExceeded { url: shown })
        }
        _ => Err(ExternalError::Status {
            url: shown,
            status: status.as_u16(),
        }),
    }
}

/// Sends a request and decodes a JSON body
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    url: &Url,
) -> ExternalResult<T> {
    let body = send_text(request, url).await?;
    serde_json::from_str(&body).map_err(|e| ExternalError::Parse {
        url: redacted(url),
        message: e.to_string(),
    })
}

/// Parses a configured base URL joined with `path`
pub(crate) fn endpoint(base: &str, path: &str) -> ExternalResult<Url> {
    let joined = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    Url::parse(&joined).map_err(|e| ExternalError::Parse {
        url: joined.clone(),
        message: e.to_string(),
    })
}
