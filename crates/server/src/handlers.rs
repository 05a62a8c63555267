//! HTTP route handlers for the gateway.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use loggate_authn::SharedSecret;
use loggate_log::{LogEntry, LogStore, StoredEntry};
use loggate_storage::{HealthProbe, StorageBackend};

use crate::{backend::Backend, error::ApiError};

/// Methods advertised to browsers in preflight responses.
pub const CORS_ALLOW_METHODS: &str = "GET, OPTIONS";

/// Request headers advertised to browsers in preflight responses.
pub const CORS_ALLOW_HEADERS: &str = "Content-Type, X-Preshared-Key";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<LogStore<Backend>>,
    pub secret: Arc<SharedSecret>,
}

impl AppState {
    /// Creates state over `backend`, authenticating against `secret`.
    pub fn new(backend: Backend, secret: SharedSecret) -> Self {
        Self { store: Arc::new(LogStore::new(backend)), secret: Arc::new(secret) }
    }
}

/// Handle OPTIONS on any log path
///
/// CORS preflight. Never authenticated.
pub async fn handle_preflight() -> Response {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, CORS_ALLOW_METHODS),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, CORS_ALLOW_HEADERS),
        ],
    )
        .into_response()
}

/// Handle GET on any log path
///
/// Returns every live entry, oldest first, as
/// `[{"key": ["logs", "<id>"], "value": {...}}, ...]`.
pub async fn handle_list(State(state): State<AppState>) -> Result<Response, ApiError> {
    let entries: Vec<StoredEntry> = state.store.list_all().await?;
    Ok(([(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")], Json(entries)).into_response())
}

/// Handle POST on any log path
///
/// The body must be a JSON object with exactly the string fields `channel`,
/// `user` and `content`. Responds 201 with an empty body once the store has
/// acknowledged the write.
pub async fn handle_append(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let entry = LogEntry::from_json(&body)?;
    let key = state.store.append(&entry).await?;
    tracing::debug!(key = %key, channel = entry.channel(), "entry accepted");
    Ok(StatusCode::CREATED)
}

/// `HEAD` and every method without a handler, on any path outside `/-/`.
pub async fn handle_invalid_method() -> ApiError {
    ApiError::InvalidMethod
}

/// Handle GET /-/healthy
///
/// Returns 200 OK if the service is running.
pub async fn handle_healthy() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

/// Handle GET /-/ready
///
/// Returns 200 OK while the backend's readiness probe reports it can serve
/// traffic, 503 otherwise.
pub async fn handle_ready(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match state.store.backend().health_check(HealthProbe::Readiness).await {
        Ok(status) if status.is_serving() => (StatusCode::OK, "OK"),
        Ok(status) => {
            tracing::warn!(status = %status, "backend not ready");
            (StatusCode::SERVICE_UNAVAILABLE, "Not Ready")
        },
        Err(err) => {
            tracing::warn!(error = %err, "readiness probe failed");
            (StatusCode::SERVICE_UNAVAILABLE, "Not Ready")
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn test_state() -> AppState {
        AppState::new(Backend::memory(), SharedSecret::default())
    }

    #[tokio::test]
    async fn should_return_ok_for_healthy() {
        // when
        let (status, body) = handle_healthy().await;

        // then
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn should_return_ok_for_ready_when_backend_serving() {
        // when
        let (status, body) = handle_ready(State(test_state())).await;

        // then
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn should_create_entry_from_valid_body() {
        // given
        let state = test_state();
        let body = Bytes::from_static(br#"{"channel":"c1","user":"u1","content":"hello"}"#);

        // when
        let status = handle_append(State(state.clone()), body).await.unwrap();

        // then
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(state.store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_reject_invalid_body_without_storing() {
        // given
        let state = test_state();
        let body = Bytes::from_static(br#"{"channel":"c1","user":"u1"}"#);

        // when
        let err = handle_append(State(state.clone()), body).await.unwrap_err();

        // then
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(state.store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_advertise_cors_in_preflight() {
        // when
        let response = handle_preflight().await;

        // then
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], CORS_ALLOW_METHODS);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], CORS_ALLOW_HEADERS);
    }
}
