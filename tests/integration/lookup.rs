//! Bulk oEmbed lookups and database statistics over a SQLite file

use crate::common::{fast_limits, TestDb};
use creator_scope::batch::{run_batch, CancelFlag};
use creator_scope::client::OEmbedClient;
use creator_scope::config::InstagramConfig;
use creator_scope::output::load_statistics;
use creator_scope::storage::Storage;
use creator_scope::{BatchStatus, RateLimiter};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn oembed_client(server: &MockServer) -> OEmbedClient {
    let config = InstagramConfig {
        oembed_url: format!("{}/oembed/", server.uri()),
        ..InstagramConfig::default()
    };
    let limiter = RateLimiter::new("oembed", fast_limits()).unwrap();
    OEmbedClient::new(reqwest::Client::new(), &config, Arc::new(limiter))
}

#[tokio::test]
async fn test_lookup_run_is_persisted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oembed/"))
        .and(query_param("url", "https://www.instagram.com/reel/Abc/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Leg day #gym",
            "author_name": "lifter"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/oembed/"))
        .and(query_param("url", "https://www.instagram.com/p/Limited/"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let db = TestDb::new();
    let tracker = db.tracker();
    let urls = vec![
        "https://www.instagram.com/reel/Abc/".to_string(),
        "https://www.instagram.com/p/Limited/".to_string(),
    ];

    let run = run_batch(&tracker, &oembed_client(&server), &urls, 1, &CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(run.status, BatchStatus::Completed);
    assert_eq!(run.succeeded, 1);
    assert_eq!(run.failed, 1);
    assert!(run.finished_at.is_some());

    // Read back through a fresh connection
    let results = db
        .tracker()
        .with_storage(|s| s.get_batch_results(run.id))
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].item.as_ref().unwrap().item_id, "Abc");
    assert!(results[1]
        .error_message
        .as_deref()
        .unwrap()
        .contains("quota exceeded"));
}

#[tokio::test]
async fn test_statistics_on_empty_database() {
    let db = TestDb::new();
    let stats = load_statistics(&db.tracker()).unwrap();

    assert_eq!(stats.total_jobs(), 0);
    assert_eq!(stats.total_items, 0);
    assert_eq!(stats.total_parents, 0);
}
