//! HTTP middleware for the gateway.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};

use axum::{
    body::Body,
    extract::{Request, State},
    http::{Method, Response},
    middleware::Next,
};
use loggate_authn::PRESHARED_KEY_HEADER;
use tower::{Layer, Service};

use crate::{error::ApiError, handlers::AppState};

/// Rejects requests whose `X-Preshared-Key` does not match the configured
/// secret. CORS preflight (`OPTIONS`) passes through unauthenticated.
pub async fn require_shared_secret(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<axum::response::Response, ApiError> {
    if request.method() != Method::OPTIONS {
        // A header that is not valid UTF-8 cannot equal the secret.
        let presented =
            request.headers().get(PRESHARED_KEY_HEADER).map(|value| value.to_str().unwrap_or(""));
        state.secret.verify(presented)?;
    }
    Ok(next.run(request).await)
}

/// Layer that wraps services with request tracing.
#[derive(Clone)]
pub struct TracingLayer;

impl TracingLayer {
    /// Creates the layer.
    pub fn new() -> Self {
        Self
    }
}

impl Default for TracingLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for TracingLayer {
    type Service = TracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TracingService { inner }
    }
}

/// Service that logs HTTP requests and responses at debug level.
#[derive(Clone)]
pub struct TracingService<S> {
    inner: S,
}

impl<S, ResBody> Service<Request<Body>> for TracingService<S>
where
    S: Service<Request<Body>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ResBody: Send,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let method = request.method().clone();
        let path = request.uri().path().to_owned();
        let content_length = request
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_owned();

        // The secret header is never logged.
        tracing::debug!(
            method = %method,
            path = %path,
            content_length = %content_length,
            "HTTP request received"
        );

        let start = Instant::now();
        let future = self.inner.call(request);

        Box::pin(async move {
            let response = future.await?;
            tracing::debug!(
                method = %method,
                path = %path,
                status = response.status().as_u16(),
                duration_ms = start.elapsed().as_millis() as u64,
                "HTTP request completed"
            );
            Ok(response)
        })
    }
}
