//! End-to-end tests for the gateway router.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use loggate_authn::{PRESHARED_KEY_HEADER, SharedSecret};
use loggate_log::LOG_RETENTION;
use loggate_server::{AppState, Backend, StorageSettings, router};
use loggate_storage::testutil::mock_clock_backend;
use loggate_storage_sled::SledBackendConfig;
use serde_json::{Value, json};
use tower::ServiceExt;

const SECRET: &str = "s3cr3t";

fn app_with(backend: Backend) -> Router {
    router(AppState::new(backend, SharedSecret::new(SECRET).unwrap()))
}

fn app() -> Router {
    app_with(Backend::memory())
}

fn request(method: Method, key: Option<&str>, body: &str) -> Request<Body> {
    request_at("/", method, key, body)
}

fn request_at(path: &str, method: Method, key: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(key) = key {
        builder = builder.header(PRESHARED_KEY_HEADER, key);
    }
    builder.body(Body::from(body.to_owned())).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, String) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn post(app: &Router, body: &str) -> StatusCode {
    send(app, request(Method::POST, Some(SECRET), body)).await.0
}

async fn list(app: &Router) -> Vec<Value> {
    let (status, _, body) = send(app, request(Method::GET, Some(SECRET), "")).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_str(&body).unwrap()
}

#[tokio::test]
async fn preflight_needs_no_key() {
    // given
    let app = app();

    // when
    let (status, headers, body) = send(&app, request(Method::OPTIONS, None, "")).await;

    // then
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "GET, OPTIONS");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type, X-Preshared-Key");
}

#[tokio::test]
async fn missing_or_wrong_key_is_unauthorized() {
    let app = app();

    for key in [None, Some("wrong"), Some("")] {
        for method in [Method::GET, Method::POST] {
            let (status, _, body) = send(
                &app,
                request(method.clone(), key, r#"{"channel":"c","user":"u","content":"x"}"#),
            )
            .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} with {key:?}");
            assert_eq!(body, "Unauthorized");
        }
    }

    // nothing was written by the rejected POSTs
    assert!(list(&app).await.is_empty());
}

#[tokio::test]
async fn key_header_name_is_case_insensitive() {
    let app = app();
    let req = Request::builder()
        .method(Method::GET)
        .uri("/")
        .header("X-PRESHARED-KEY", SECRET)
        .body(Body::empty())
        .unwrap();

    let (status, _, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn default_secret_is_accepted_when_unconfigured() {
    let app = router(AppState::new(Backend::memory(), SharedSecret::default()));

    let (status, _, _) = send(&app, request(Method::GET, Some("DEFAULT_SECRET"), "")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn post_then_get_round_trips() {
    // given
    let app = app();

    // when
    let (status, _, body) = send(
        &app,
        request(Method::POST, Some(SECRET), r#"{"channel":"c1","user":"u1","content":"hello"}"#),
    )
    .await;

    // then
    assert_eq!(status, StatusCode::CREATED);
    assert!(body.is_empty());

    let (status, headers, body) = send(&app, request(Method::GET, Some(SECRET), "")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");

    let entries: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["value"], json!({"channel": "c1", "user": "u1", "content": "hello"}));
    assert_eq!(entries[0]["key"][0], "logs");
    assert_eq!(entries[0]["key"][1].as_str().unwrap().len(), 26);
}

#[tokio::test]
async fn get_on_empty_store_is_empty_array() {
    let app = app();
    let (status, _, body) = send(&app, request(Method::GET, Some(SECRET), "")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");
}

#[tokio::test]
async fn invalid_body_is_rejected_and_not_stored() {
    let app = app();

    for body in [
        r#"{"channel":"c1","user":"u1"}"#,
        r#"{"channel":"c1","user":1,"content":"x"}"#,
        r#"{"channel":"","user":"u1","content":"x"}"#,
        "not json",
        "",
    ] {
        let (status, _, text) = send(&app, request(Method::POST, Some(SECRET), body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(text, "Invalid data");
    }

    assert!(list(&app).await.is_empty());
}

#[tokio::test]
async fn other_methods_are_invalid() {
    let app = app();

    for method in [Method::PUT, Method::DELETE, Method::PATCH] {
        let (status, _, body) = send(&app, request(method.clone(), Some(SECRET), "")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{method}");
        assert_eq!(body, "Invalid method");
    }
}

#[tokio::test]
async fn other_methods_without_key_are_unauthorized_first() {
    let app = app();

    let (status, _, _) = send(&app, request(Method::DELETE, None, "")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn head_is_an_invalid_method() {
    let app = app();

    let (status, _, _) = send(&app, request(Method::HEAD, Some(SECRET), "")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, _, _) = send(&app, request(Method::HEAD, None, "")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn log_is_served_on_every_path() {
    // given
    let app = app();
    let body = r#"{"channel":"c","user":"u","content":"anywhere"}"#;

    // when an entry is posted to an arbitrary path
    let req = request_at("/api/logs", Method::POST, Some(SECRET), body);
    let (status, _, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::CREATED);

    // then every other path lists it and applies the same method and auth rules
    let (status, _, listed) =
        send(&app, request_at("/some/other/path?x=1", Method::GET, Some(SECRET), "")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<Vec<Value>>(&listed).unwrap().len(), 1);

    let (status, _, _) = send(&app, request_at("/x", Method::GET, None, "")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, body) = send(&app, request_at("/x", Method::PUT, Some(SECRET), "")).await;
    assert_eq!((status, body.as_str()), (StatusCode::METHOD_NOT_ALLOWED, "Invalid method"));

    let req = request_at("/deep/path", Method::OPTIONS, None, "");
    let (status, headers, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn entries_are_listed_in_submission_order() {
    // given
    let app = app();

    // when
    for (user, content) in [("a", "1"), ("b", "2"), ("a", "3")] {
        let body = json!({"channel": "c", "user": user, "content": content}).to_string();
        assert_eq!(post(&app, &body).await, StatusCode::CREATED);
    }

    // then
    let entries = list(&app).await;
    let contents: Vec<&str> =
        entries.iter().map(|e| e["value"]["content"].as_str().unwrap()).collect();
    assert_eq!(contents, ["1", "2", "3"]);

    let ids: Vec<&str> = entries.iter().map(|e| e["key"][1].as_str().unwrap()).collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]), "{ids:?}");
}

#[tokio::test]
async fn duplicate_submissions_are_kept() {
    let app = app();
    let body = r#"{"channel":"c","user":"u","content":"same"}"#;

    assert_eq!(post(&app, body).await, StatusCode::CREATED);
    assert_eq!(post(&app, body).await, StatusCode::CREATED);

    assert_eq!(list(&app).await.len(), 2);
}

#[tokio::test]
async fn entries_disappear_after_retention() {
    // given
    let (memory, clock) = mock_clock_backend();
    let app = app_with(Backend::Memory(memory));
    let body = r#"{"channel":"c","user":"u","content":"x"}"#;
    assert_eq!(post(&app, body).await, StatusCode::CREATED);

    // when
    clock.advance(LOG_RETENTION - Duration::from_secs(1));

    // then
    assert_eq!(list(&app).await.len(), 1);

    clock.advance(Duration::from_secs(2));
    assert!(list(&app).await.is_empty());
}

#[tokio::test]
async fn health_routes_need_no_key() {
    let app = app();

    for path in ["/-/healthy", "/-/ready"] {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let (status, _, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK, "{path}");
        assert_eq!(body, "OK");
    }
}

#[tokio::test]
async fn sled_backed_gateway_round_trips() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = SledBackendConfig::builder().path(dir.path()).build().unwrap();
    let backend = Backend::open(&StorageSettings::Sled(config)).unwrap();
    let app = app_with(backend.clone());

    for content in ["first", "second"] {
        let body = json!({"channel": "c1", "user": "u1", "content": content}).to_string();
        assert_eq!(post(&app, &body).await, StatusCode::CREATED);
    }

    let entries = list(&app).await;
    let contents: Vec<&str> =
        entries.iter().map(|e| e["value"]["content"].as_str().unwrap()).collect();
    assert_eq!(contents, ["first", "second"]);
    backend.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sled_backed_gateway_takes_concurrent_posts() {
    // given a gateway on a flushing sled backend
    let dir = tempfile::TempDir::new().unwrap();
    let config = SledBackendConfig::builder().path(dir.path()).build().unwrap();
    let backend = Backend::open(&StorageSettings::Sled(config)).unwrap();
    let app = app_with(backend.clone());

    // when 50 clients post at once
    let posts: Vec<_> = (0..50)
        .map(|n| {
            let app = app.clone();
            tokio::spawn(async move {
                let body = json!({"channel": "c", "user": format!("u{n}"), "content": "x"});
                post(&app, &body.to_string()).await
            })
        })
        .collect();
    let statuses = tokio::time::timeout(Duration::from_secs(30), async {
        let mut statuses = Vec::new();
        for task in posts {
            statuses.push(task.await.unwrap());
        }
        statuses
    })
    .await
    .expect("concurrent posts stalled");

    // then all were acknowledged and all are listed
    assert!(statuses.iter().all(|status| *status == StatusCode::CREATED), "{statuses:?}");
    assert_eq!(list(&app).await.len(), 50);
    backend.shutdown();
}
