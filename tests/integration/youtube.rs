//! YouTube analyses against a mock Data API

use crate::common::{create_pipeline, create_test_config, TestDb, API_KEY};
use creator_scope::aggregate::{get_aggregated_result, PageRequest, ResultQuery, SortOrder};
use creator_scope::storage::{open_storage, Storage};
use creator_scope::JobStatus;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const CHANNEL_ID: &str = "UCtest0000000000000000";
const UPLOADS_ID: &str = "UUtest0000000000000000";

fn query_value(request: &Request, key: &str) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Serves `total` uploads, 50 per page, with numeric page tokens
struct UploadPages {
    total: usize,
}

impl Respond for UploadPages {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let start: usize = query_value(request, "pageToken")
            .and_then(|t| t.parse().ok())
            .unwrap_or(0);
        let end = (start + 50).min(self.total);

        let items: Vec<Value> = (start..end)
            .map(|i| json!({ "contentDetails": { "videoId": format!("vid{:03}", i) } }))
            .collect();
        let mut body = json!({ "items": items });
        if end < self.total {
            body["nextPageToken"] = json!(end.to_string());
        }
        ResponseTemplate::new(200).set_body_json(body)
    }
}

/// Describes every requested video; views grow with the video number
struct VideoDetails;

impl Respond for VideoDetails {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let ids = query_value(request, "id").unwrap_or_default();
        let items: Vec<Value> = ids
            .split(',')
            .filter(|id| !id.is_empty())
            .map(|id| {
                let n: u64 = id.trim_start_matches("vid").parse().unwrap_or(0);
                json!({
                    "id": id,
                    "snippet": {
                        "title": format!("Video {} #vlog", n),
                        "description": "with @guest",
                        "publishedAt": format!("2024-03-{:02}T12:00:00Z", n % 28 + 1),
                        "thumbnails": { "high": { "url": format!("https://i.ytimg.com/{}.jpg", id) } }
                    },
                    "statistics": {
                        "viewCount": ((n + 1) * 10).to_string(),
                        "likeCount": (n + 1).to_string(),
                        "commentCount": "0"
                    },
                    "contentDetails": { "duration": "PT4M13S" }
                })
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({ "items": items }))
    }
}

fn channel_json() -> Value {
    json!({
        "items": [{
            "id": CHANNEL_ID,
            "snippet": {
                "title": "Test Creator",
                "description": "Weekly vlogs",
                "customUrl": "@testcreator"
            },
            "statistics": {
                "subscriberCount": "2500",
                "videoCount": "120",
                "viewCount": "987654"
            },
            "contentDetails": { "relatedPlaylists": { "uploads": UPLOADS_ID } }
        }]
    })
}

async fn mount_channel(server: &MockServer, total_videos: usize) {
    Mock::given(method("GET"))
        .and(path("/channels"))
        .and(query_param("forHandle", "@testcreator"))
        .and(query_param("key", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(channel_json()))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/channels"))
        .and(query_param("id", CHANNEL_ID))
        .respond_with(ResponseTemplate::new(200).set_body_json(channel_json()))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/playlistItems"))
        .and(query_param("playlistId", UPLOADS_ID))
        .respond_with(UploadPages {
            total: total_videos,
        })
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/videos"))
        .respond_with(VideoDetails)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_analysis_of_120_videos() {
    let server = MockServer::start().await;
    mount_channel(&server, 120).await;

    let db = TestDb::new();
    let config = create_test_config(&server.uri(), &db.path());
    let pipeline = create_pipeline(&config, db.tracker());

    let job = pipeline
        .submit("https://www.youtube.com/@testcreator")
        .expect("Failed to submit");
    job.handle.await.expect("Analysis task failed");

    let record = pipeline
        .tracker()
        .get_job(&job.analysis_id)
        .unwrap()
        .expect("Job should exist");
    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(record.progress, 100);
    assert_eq!(record.subject_id, CHANNEL_ID);
    assert_eq!(record.display_name, "Test Creator");
    assert!(record.error_message.is_none());

    let result =
        get_aggregated_result(pipeline.tracker(), &job.analysis_id, &ResultQuery::default())
            .unwrap();
    assert!(result.is_final);
    assert_eq!(result.page.total_count, 120);
    assert_eq!(result.page.total_pages, 3);
    assert_eq!(result.page.items.len(), 50);

    let parent = result.parent.expect("Parent should be stored");
    assert_eq!(parent.audience_size, Some(2500));
    assert_eq!(parent.uploads_playlist_id.as_deref(), Some(UPLOADS_ID));
    assert_eq!(parent.username.as_deref(), Some("testcreator"));

    // Details were fetched in batches of 50, 50 and 20
    let requests = server.received_requests().await.expect("Recording enabled");
    let mut batch_sizes: Vec<usize> = requests
        .iter()
        .filter(|r| r.url.path() == "/videos")
        .map(|r| query_value(r, "id").unwrap_or_default().split(',').count())
        .collect();
    batch_sizes.sort_unstable();
    assert_eq!(batch_sizes, vec![20, 50, 50]);
}

#[tokio::test]
async fn test_results_survive_reopen() {
    let server = MockServer::start().await;
    mount_channel(&server, 30).await;

    let db = TestDb::new();
    let config = create_test_config(&server.uri(), &db.path());
    let pipeline = create_pipeline(&config, db.tracker());

    let job = pipeline.submit("youtube.com/@testcreator").unwrap();
    job.handle.await.unwrap();
    drop(pipeline);

    let storage = open_storage(&db.path()).unwrap();
    let items = storage.get_content_items(&job.analysis_id).unwrap();
    assert_eq!(items.len(), 30);

    let video = items.iter().find(|i| i.item_id == "vid004").unwrap();
    assert_eq!(video.view_count, 50);
    assert_eq!(video.duration_seconds, Some(253));
    assert_eq!(video.hashtags, vec!["vlog"]);
    assert_eq!(video.mentions, vec!["guest"]);
    assert_eq!(video.url, "https://www.youtube.com/watch?v=vid004");
}

#[tokio::test]
async fn test_most_viewed_last_page() {
    let server = MockServer::start().await;
    mount_channel(&server, 120).await;

    let db = TestDb::new();
    let config = create_test_config(&server.uri(), &db.path());
    let pipeline = create_pipeline(&config, db.tracker());

    let job = pipeline.submit("https://youtube.com/@testcreator").unwrap();
    job.handle.await.unwrap();

    let query = ResultQuery {
        page: PageRequest::new(3, 50),
        sort: SortOrder::MostViewed,
        ..ResultQuery::default()
    };
    let result = get_aggregated_result(pipeline.tracker(), &job.analysis_id, &query).unwrap();

    assert_eq!(result.page.items.len(), 20);
    assert!(!result.page.has_next_page);
    assert!(result.page.has_previous_page);
    // The least viewed video comes last
    assert_eq!(result.page.items.last().unwrap().item.item_id, "vid000");
}

#[tokio::test]
async fn test_quota_exceeded_fails_job() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channels"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {
                "code": 403,
                "errors": [{ "reason": "quotaExceeded", "domain": "youtube.quota" }]
            }
        })))
        .mount(&server)
        .await;

    let db = TestDb::new();
    let config = create_test_config(&server.uri(), &db.path());
    let pipeline = create_pipeline(&config, db.tracker());

    let job = pipeline.submit("https://www.youtube.com/@testcreator").unwrap();
    job.handle.await.unwrap();

    let record = pipeline.tracker().get_job(&job.analysis_id).unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Failed);
    assert_eq!(record.progress, 0);
    let message = record.error_message.unwrap();
    assert!(message.contains("quota exceeded"), "{}", message);
    assert!(!message.contains(API_KEY));
}

#[tokio::test]
async fn test_unknown_channel_fails_job() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .mount(&server)
        .await;

    let db = TestDb::new();
    let config = create_test_config(&server.uri(), &db.path());
    let pipeline = create_pipeline(&config, db.tracker());

    let job = pipeline.submit("https://www.youtube.com/@nobody").unwrap();
    job.handle.await.unwrap();

    let record = pipeline.tracker().get_job(&job.analysis_id).unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Failed);
    assert!(record.error_message.unwrap().contains("@nobody"));
    // Identity was never resolved
    assert_eq!(record.subject_id, "unknown");
}
