//! Instagram analyses against mock profile, page and oEmbed endpoints

use crate::common::{create_pipeline, create_test_config, TestDb};
use creator_scope::aggregate::{get_aggregated_result, Metric, ResultQuery, Tier};
use creator_scope::content::ContentKind;
use creator_scope::output::{generate_report, write_creator_report};
use creator_scope::JobStatus;
use serde_json::{json, Value};
use std::path::Path;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Answers oEmbed lookups; posts whose URL contains `Gone` are missing
struct OEmbedPosts;

impl Respond for OEmbedPosts {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let post_url = request
            .url
            .query_pairs()
            .find(|(k, _)| k == "url")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();

        if post_url.contains("Gone") {
            return ResponseTemplate::new(404);
        }

        let code = post_url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        ResponseTemplate::new(200).set_body_json(json!({
            "title": format!("Post {} &amp; more #running @coach", code),
            "author_name": "runner",
            "thumbnail_url": format!("https://cdn.example.com/{}.jpg", code),
            "provider_name": "Instagram"
        }))
    }
}

async fn mount_profile(server: &MockServer, private: bool) {
    mount_profile_with_timeline(server, private, json!([])).await;

    Mock::given(method("GET"))
        .and(path("/oembed/"))
        .respond_with(OEmbedPosts)
        .mount(server)
        .await;
}

/// Mounts the profile API and page; `edges` become the timeline posts
async fn mount_profile_with_timeline(server: &MockServer, private: bool, edges: Value) {
    Mock::given(method("GET"))
        .and(path("/api/v1/users/web_profile_info/"))
        .and(query_param("username", "runner"))
        .and(header("X-IG-App-ID", "1234567890"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "user": {
                "id": "17841400000",
                "username": "runner",
                "full_name": "Jo Runner",
                "biography": "Miles and coffee",
                "is_verified": false,
                "is_private": private,
                "edge_followed_by": { "count": 5000 },
                "edge_follow": { "count": 310 },
                "edge_owner_to_timeline_media": { "count": 3, "edges": edges }
            }}
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/runner/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                <a href="/p/Post1/">first</a>
                <a href="/reel/Reel2/">second</a>
                <a href="/p/Post1/">first again</a>
                <a href="/p/Gone3/">removed</a>
                <a href="/explore/">explore</a>
            </body></html>"#,
        ))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_instagram_analysis_skips_missing_posts() {
    let server = MockServer::start().await;
    mount_profile(&server, false).await;

    let db = TestDb::new();
    let config = create_test_config(&server.uri(), &db.path());
    let pipeline = create_pipeline(&config, db.tracker());

    let job = pipeline.submit("@runner").unwrap();
    job.handle.await.unwrap();

    let record = pipeline.tracker().get_job(&job.analysis_id).unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(record.subject_id, "17841400000");
    assert_eq!(record.display_name, "Jo Runner");

    let result =
        get_aggregated_result(pipeline.tracker(), &job.analysis_id, &ResultQuery::default())
            .unwrap();
    assert_eq!(result.page.total_count, 2);

    let parent = result.parent.unwrap();
    assert_eq!(parent.audience_size, Some(5000));
    assert_eq!(parent.following_count, Some(310));
    assert_eq!(parent.is_private, Some(false));

    let mut items: Vec<_> = result.page.items.into_iter().map(|s| s.item).collect();
    items.sort_by(|a, b| a.item_id.cmp(&b.item_id));

    assert_eq!(items[0].item_id, "Post1");
    assert_eq!(items[0].kind, ContentKind::Post);
    assert_eq!(items[0].caption, "Post Post1 & more #running @coach");
    assert_eq!(items[0].hashtags, vec!["running"]);
    assert_eq!(items[0].mentions, vec!["coach"]);
    assert_eq!(items[1].item_id, "Reel2");
    assert_eq!(items[1].kind, ContentKind::Reel);
}

#[tokio::test]
async fn test_private_profile_completes_empty() {
    let server = MockServer::start().await;
    mount_profile(&server, true).await;

    let db = TestDb::new();
    let config = create_test_config(&server.uri(), &db.path());
    let pipeline = create_pipeline(&config, db.tracker());

    let job = pipeline.submit("https://www.instagram.com/runner/").unwrap();
    job.handle.await.unwrap();

    let record = pipeline.tracker().get_job(&job.analysis_id).unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Completed);

    let result =
        get_aggregated_result(pipeline.tracker(), &job.analysis_id, &ResultQuery::default())
            .unwrap();
    assert_eq!(result.page.total_count, 0);
    assert!(result.tier_counts.iter().all(|(_, n)| *n == 0));
}

#[tokio::test]
async fn test_missing_profile_fails_job() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/web_profile_info/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let db = TestDb::new();
    let config = create_test_config(&server.uri(), &db.path());
    let pipeline = create_pipeline(&config, db.tracker());

    let job = pipeline.submit("ghost.account").unwrap();
    job.handle.await.unwrap();

    let record = pipeline.tracker().get_job(&job.analysis_id).unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Failed);
    assert!(record.error_message.unwrap().starts_with("Not found"));
}

#[tokio::test]
async fn test_report_for_instagram_analysis() {
    let server = MockServer::start().await;
    mount_profile(&server, false).await;

    let db = TestDb::new();
    let config = create_test_config(&server.uri(), &db.path());
    let pipeline = create_pipeline(&config, db.tracker());

    let job = pipeline.submit("runner").unwrap();
    job.handle.await.unwrap();

    let report = generate_report(pipeline.tracker(), &job.analysis_id, Metric::Likes).unwrap();
    assert_eq!(report.total_items, 2);
    assert_eq!(report.top_hashtags, vec![("running".to_string(), 2)]);

    let written = write_creator_report(&report, Path::new(&config.output.report_dir)).unwrap();
    let markdown = std::fs::read_to_string(written).unwrap();
    assert!(markdown.contains("# Creator Report: Jo Runner"));
    assert!(markdown.contains("- **Username**: @runner"));
}

fn request_count(requests: &[Request], request_path: &str) -> usize {
    requests.iter().filter(|r| r.url.path() == request_path).count()
}

#[tokio::test]
async fn test_timeline_metrics_reach_items() {
    let server = MockServer::start().await;
    mount_profile_with_timeline(
        &server,
        false,
        json!([
            { "node": {
                "shortcode": "Post1",
                "edge_liked_by": { "count": 9000 },
                "edge_media_to_comment": { "count": 40 },
                "video_view_count": 90000,
                "taken_at_timestamp": 1710000000
            }},
            { "node": {
                "shortcode": "Reel2",
                "product_type": "clips",
                "edge_liked_by": { "count": 10 },
                "video_view_count": 100,
                "video_duration": 12.0,
                "taken_at_timestamp": 1700000000
            }},
            { "node": {
                "shortcode": "Extra4",
                "edge_liked_by": { "count": 50 },
                "taken_at_timestamp": 1690000000
            }}
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/oembed/"))
        .respond_with(OEmbedPosts)
        .mount(&server)
        .await;

    let db = TestDb::new();
    let config = create_test_config(&server.uri(), &db.path());
    let pipeline = create_pipeline(&config, db.tracker());

    let job = pipeline.submit("runner").unwrap();
    job.handle.await.unwrap();

    let query = ResultQuery {
        metric: Metric::Likes,
        audience_size: Some(0),
        ..ResultQuery::default()
    };
    let result = get_aggregated_result(pipeline.tracker(), &job.analysis_id, &query).unwrap();
    assert_eq!(result.job.status, JobStatus::Completed);
    // Post1 and Reel2 from the page, Extra4 only from the timeline
    assert_eq!(result.page.total_count, 3);

    let find = |id: &str| {
        result
            .page
            .items
            .iter()
            .find(|s| s.item.item_id == id)
            .unwrap()
    };
    let top = find("Post1");
    assert_eq!(top.item.like_count, 9000);
    assert_eq!(top.item.view_count, 90000);
    assert_eq!(top.item.comment_count, 40);
    assert!(top.item.date_posted.is_some());
    assert_eq!(top.tier, Tier::Viral);

    let reel = find("Reel2");
    assert_eq!(reel.item.kind, ContentKind::Reel);
    assert_eq!(reel.item.duration_seconds, Some(12));
    assert_eq!(reel.tier, Tier::Low);

    // Newest first by default
    let order: Vec<&str> = result
        .page
        .items
        .iter()
        .map(|s| s.item.item_id.as_str())
        .collect();
    assert_eq!(order, vec!["Post1", "Reel2", "Extra4"]);

    let counts: Vec<usize> = result.tier_counts.iter().map(|(_, n)| *n).collect();
    assert_eq!(counts, vec![1, 0, 0, 0, 2]);

    // Resolution and the parent step share one profile lookup
    let requests = server.received_requests().await.unwrap();
    assert_eq!(request_count(&requests, "/api/v1/users/web_profile_info/"), 1);
}

#[tokio::test]
async fn test_failing_oembed_is_attempted_once_per_retry() {
    let server = MockServer::start().await;
    mount_profile_with_timeline(&server, false, json!([])).await;
    Mock::given(method("GET"))
        .and(path("/oembed/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let db = TestDb::new();
    let config = create_test_config(&server.uri(), &db.path());
    let pipeline = create_pipeline(&config, db.tracker());

    let job = pipeline.submit("runner").unwrap();
    job.handle.await.unwrap();

    let record = pipeline.tracker().get_job(&job.analysis_id).unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Failed);
    let message = record.error_message.unwrap();
    assert!(message.contains("HTTP 500"), "{}", message);

    // Three linked posts, each tried once and retried once
    let requests = server.received_requests().await.unwrap();
    assert_eq!(request_count(&requests, "/oembed/"), 6);
}
