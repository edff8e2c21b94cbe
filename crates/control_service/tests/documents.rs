use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use control_service::create_router;
use datastore::{InMemoryRepository, Repository};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

async fn send(
    repo: Arc<InMemoryRepository>,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let body = body.map_or_else(Body::empty, |b| Body::from(b.to_string()));

    let response = create_router(repo)
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn put_replaces_the_whole_document() {
    let repo = Arc::new(InMemoryRepository::new());
    let uri = "/collections/streamers/documents/ch-1";

    send(
        repo.clone(),
        Method::PUT,
        uri,
        Some(json!({ "channelName": "Old", "concurrentUserCount": 3 })),
    )
    .await;
    let (status, body) = send(
        repo.clone(),
        Method::PUT,
        uri,
        Some(json!({ "channelName": "New" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);

    let stored = repo.get("streamers", "ch-1").await.unwrap().unwrap();
    assert_eq!(Value::Object(stored), json!({ "channelName": "New" }));
}

#[tokio::test]
async fn put_rejects_non_object_bodies() {
    let repo = Arc::new(InMemoryRepository::new());

    let (status, body) = send(
        repo.clone(),
        Method::PUT,
        "/collections/streamers/documents/ch-1",
        Some(json!([1, 2])),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(repo.count("streamers").await.unwrap(), 0);
}

#[tokio::test]
async fn delete_removes_existing_and_reports_missing() {
    let repo = Arc::new(InMemoryRepository::new());
    let uri = "/collections/streamers/documents/ch-1";
    send(repo.clone(), Method::PUT, uri, Some(json!({ "a": 1 }))).await;

    let (status, body) = send(repo.clone(), Method::DELETE, uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(repo.get("streamers", "ch-1").await.unwrap().is_none());

    let (status, body) = send(repo, Method::DELETE, uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}
