//! Common test utilities

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use schoolmap::http::{create_router, AppState};
use schoolmap::storage::{MockSchoolStore, SchoolStore, SqliteSchoolStore};

/// Router over a fresh in-memory SQLite store
pub async fn sqlite_router() -> Router {
    let store = SqliteSchoolStore::in_memory().expect("in-memory store");
    store.create_table().await.expect("schema");
    create_router(AppState::new(Arc::new(store)))
}

/// Router over a mock store, returned with the store for failure injection
#[allow(dead_code)]
pub fn mock_router() -> (Router, Arc<MockSchoolStore>) {
    let store = Arc::new(MockSchoolStore::new());
    let router = create_router(AppState::new(store.clone()));
    (router, store)
}

/// Send a request and decode the JSON body
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("request failed");

    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("failed to collect body")
        .to_bytes();

    let json = serde_json::from_slice(&bytes).expect("response is not JSON");
    (status, json)
}

pub async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request");
    send(router, request).await
}

pub async fn post_json(router: &Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request");
    send(router, request).await
}

#[allow(dead_code)]
pub async fn post_raw(
    router: &Router,
    uri: &str,
    content_type: &str,
    body: &str,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body.to_string()))
        .expect("request");
    send(router, request).await
}

/// Add a school through the API and return its id
#[allow(dead_code)]
pub async fn add_school(router: &Router, name: &str, latitude: f64, longitude: f64) -> i64 {
    let body = serde_json::json!({
        "name": name,
        "address": format!("{name} Campus"),
        "latitude": latitude,
        "longitude": longitude,
    });

    let (status, json) = post_json(router, "/api/addSchool", &body).await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json["data"]["id"].as_i64().expect("id")
}
