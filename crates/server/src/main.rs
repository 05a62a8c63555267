//! loggate HTTP server binary entry point.

use anyhow::Context;
use clap::Parser;
use loggate_server::{AppState, Backend, CliArgs, GatewayConfig, GatewayServer, load_env_file};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before tracing, so RUST_LOG may come from the file.
    let env_file = load_env_file(None).context("failed to load .env")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Some(path) = &env_file {
        tracing::info!(path = %path.display(), "loaded environment file");
    }
    let args = CliArgs::parse();

    let storage = args.to_storage_settings().context("invalid storage configuration")?;
    let secret = args.to_shared_secret().context("invalid SHARED_SECRET")?;
    if secret.is_default() {
        tracing::warn!("SHARED_SECRET is not set; accepting the built-in default secret");
    }
    let server_config = GatewayConfig::from(&args);

    tracing::info!(?storage, "Opening log store");
    let backend = Backend::open(&storage).context("failed to open storage backend")?;
    tracing::info!(backend = backend.kind(), "log store ready");

    GatewayServer::new(AppState::new(backend, secret), server_config)
        .run()
        .await
        .context("HTTP server failed")?;
    Ok(())
}
