//! Recommendation lookups against a mocked search API.

use chrono::{TimeDelta, Utc};
use domain::RecommendedVideo;
use recommendation_service::{
    CacheEntry, RecommendationClient, SessionContext, VideoSearchClient, VideoSearchConfig,
    cache_key,
};
use serde_json::{Value, json};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn hits(prefix: &str, count: usize) -> Value {
    let items: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "kind": "youtube#searchResult",
                "id": { "kind": "youtube#video", "videoId": format!("{prefix}-v{i}") },
                "snippet": {
                    "channelId": format!("{prefix}-channel"),
                    "channelTitle": format!("{prefix} channel"),
                    "title": format!("{prefix} video {i}"),
                    "thumbnails": { "default": { "url": format!("https://i.example/{prefix}/{i}.jpg") } }
                }
            })
        })
        .collect();
    json!({ "kind": "youtube#searchListResponse", "items": items })
}

fn client(server: &MockServer) -> RecommendationClient {
    RecommendationClient::new(
        VideoSearchClient::new(VideoSearchConfig {
            base_url: server.uri(),
            api_key: "test-key".to_string(),
        })
        .unwrap(),
    )
}

async fn mount_keyword(server: &MockServer, keyword: &str, count: usize, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", keyword))
        .respond_with(ResponseTemplate::new(200).set_body_json(hits(keyword, count)))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn ids(videos: &[RecommendedVideo]) -> Vec<&str> {
    videos.iter().map(|v| v.video_id.as_str()).collect()
}

#[tokio::test]
async fn results_follow_keyword_order() {
    let server = MockServer::start().await;
    mount_keyword(&server, "Alice", 3, 1).await;
    mount_keyword(&server, "Bob", 2, 1).await;

    let ctx = SessionContext::new();
    let videos = client(&server)
        .recommend(&ctx, &["Alice".to_string(), "Bob".to_string()])
        .await;

    assert_eq!(
        ids(&videos),
        vec!["Alice-v0", "Alice-v1", "Alice-v2", "Bob-v0", "Bob-v1"]
    );
    assert_eq!(videos[0].channel_title, "Alice channel");
    assert_eq!(
        videos[0].video_image_url.as_deref(),
        Some("https://i.example/Alice/0.jpg")
    );
}

#[tokio::test]
async fn search_request_carries_expected_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("part", "snippet"))
        .and(query_param("type", "video"))
        .and(query_param("maxResults", "3"))
        .and(query_param("key", "test-key"))
        .and(query_param("q", "speedrun"))
        .respond_with(ResponseTemplate::new(200).set_body_json(hits("speedrun", 3)))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = SessionContext::new();
    assert_eq!(client(&server).lookup(&ctx, "speedrun").await.len(), 3);
}

#[tokio::test]
async fn extra_hits_beyond_three_are_dropped() {
    let server = MockServer::start().await;
    mount_keyword(&server, "Alice", 5, 1).await;

    let ctx = SessionContext::new();
    let videos = client(&server).lookup(&ctx, "Alice").await;

    assert_eq!(ids(&videos), vec!["Alice-v0", "Alice-v1", "Alice-v2"]);
}

#[tokio::test]
async fn repeated_keyword_is_served_from_cache() {
    let server = MockServer::start().await;
    mount_keyword(&server, "Alice", 3, 1).await;

    let ctx = SessionContext::new();
    let client = client(&server);
    let first = client.lookup(&ctx, "Alice").await;
    let second = client.lookup(&ctx, "Alice").await;

    assert_eq!(first, second);
    assert!(ctx.storage().get_item(&cache_key("Alice")).is_some());
}

#[tokio::test]
async fn same_keyword_twice_in_one_request_calls_once() {
    let server = MockServer::start().await;
    mount_keyword(&server, "Alice", 3, 1).await;

    let ctx = SessionContext::new();
    let videos = client(&server)
        .recommend(&ctx, &["Alice".to_string(), "Alice".to_string()])
        .await;

    assert_eq!(videos.len(), 6);
}

#[tokio::test]
async fn stale_cache_entry_is_refetched() {
    let server = MockServer::start().await;
    mount_keyword(&server, "Alice", 3, 1).await;

    let ctx = SessionContext::new();
    let stale = CacheEntry {
        data: vec![],
        timestamp: (Utc::now() - TimeDelta::hours(7)).timestamp_millis(),
    };
    ctx.storage()
        .set_item(cache_key("Alice"), serde_json::to_string(&stale).unwrap());

    let videos = client(&server).lookup(&ctx, "Alice").await;
    assert_eq!(videos.len(), 3);
}

#[tokio::test]
async fn fresh_cache_entry_skips_the_network() {
    let server = MockServer::start().await;
    mount_keyword(&server, "Alice", 3, 0).await;

    let ctx = SessionContext::new();
    let cached = CacheEntry {
        data: vec![RecommendedVideo {
            video_id: "cached".to_string(),
            channel_id: "c".to_string(),
            channel_title: "C".to_string(),
            video_image_url: None,
            video_title: "from cache".to_string(),
        }],
        timestamp: (Utc::now() - TimeDelta::hours(5)).timestamp_millis(),
    };
    ctx.storage()
        .set_item(cache_key("Alice"), serde_json::to_string(&cached).unwrap());

    let videos = client(&server).lookup(&ctx, "Alice").await;
    assert_eq!(ids(&videos), vec!["cached"]);
}

#[tokio::test]
async fn duplicate_in_flight_lookup_returns_empty_without_waiting() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Alice"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(hits("Alice", 3))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let ctx = SessionContext::new();
    let client = client(&server);
    let (a, b) = tokio::join!(client.lookup(&ctx, "Alice"), client.lookup(&ctx, "Alice"));

    let mut lengths = [a.len(), b.len()];
    lengths.sort();
    assert_eq!(lengths, [0, 3]);
    assert!(!ctx.is_in_flight("Alice"));
}

#[tokio::test]
async fn failed_search_yields_empty_and_releases_keyword() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Alice"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "error": { "code": 403 } })))
        .expect(1)
        .mount(&server)
        .await;
    mount_keyword(&server, "Bob", 3, 1).await;

    let ctx = SessionContext::new();
    let videos = client(&server)
        .recommend(&ctx, &["Alice".to_string(), "Bob".to_string()])
        .await;

    assert_eq!(ids(&videos), vec!["Bob-v0", "Bob-v1", "Bob-v2"]);
    assert!(!ctx.is_in_flight("Alice"));
    assert!(ctx.storage().get_item(&cache_key("Alice")).is_none());
}

#[tokio::test]
async fn sessions_do_not_share_cache() {
    let server = MockServer::start().await;
    mount_keyword(&server, "Alice", 3, 2).await;

    let client = client(&server);
    client.lookup(&SessionContext::new(), "Alice").await;
    client.lookup(&SessionContext::new(), "Alice").await;
}

#[tokio::test]
async fn no_keywords_means_no_calls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(hits("x", 3)))
        .expect(0)
        .mount(&server)
        .await;

    let videos = client(&server).recommend(&SessionContext::new(), &[]).await;
    assert!(videos.is_empty());
}
