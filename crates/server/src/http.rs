//! HTTP server implementation for loggate.

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{MethodRouter, get},
};
use tokio::{net::TcpListener, signal};

use crate::{
    config::GatewayConfig,
    handlers::{
        AppState, handle_append, handle_healthy, handle_invalid_method, handle_list,
        handle_preflight, handle_ready,
    },
    middleware::{TracingLayer, require_shared_secret},
};

/// Builds the gateway's router.
///
/// The log answers on every path: `GET` lists, `POST` appends, `OPTIONS`
/// answers CORS preflight and every other method, `HEAD` included, gets
/// 405. All of it sits behind the shared secret, which the middleware waives
/// for `OPTIONS`. Only the `/-/` probes are matched by path, and they are
/// open.
pub fn router(state: AppState) -> Router {
    let log: MethodRouter = get(handle_list)
        .post(handle_append)
        .head(handle_invalid_method)
        .options(handle_preflight)
        .fallback(handle_invalid_method)
        .layer(from_fn_with_state(state.clone(), require_shared_secret))
        .with_state(state.clone());

    Router::new()
        .route("/-/healthy", get(handle_healthy))
        .route("/-/ready", get(handle_ready))
        .fallback_service(log)
        .layer(TracingLayer::new())
        .with_state(state)
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    state: AppState,
    config: GatewayConfig,
}

impl GatewayServer {
    /// Create a new gateway server.
    pub fn new(state: AppState, config: GatewayConfig) -> Self {
        Self { state, config }
    }

    /// Run the HTTP server until SIGINT or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound or serving fails.
    pub async fn run(self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.config.addr).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` completes.
    ///
    /// # Errors
    ///
    /// Returns an error if serving fails.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        let backend = self.state.store.backend().clone();
        let app = router(self.state);

        tracing::info!(%addr, "Starting loggate HTTP server");
        axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;

        backend.shutdown();
        tracing::info!("Server shut down gracefully");
        Ok(())
    }
}

/// Listen for SIGTERM (K8s pod termination) and SIGINT (Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, starting graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
