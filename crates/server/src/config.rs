//! Configuration for the gateway binary.
//!
//! Every flag also reads an environment variable, so the service can be
//! configured the way it is usually deployed (`PORT`, `SHARED_SECRET`, `KV`).
//! A `.env` file is loaded into the environment before flags are parsed;
//! variables already set in the process environment take precedence.

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
};

use clap::Parser;
use loggate_authn::{AuthError, SharedSecret};
use loggate_storage::ConfigError;
use loggate_storage_sled::SledBackendConfig;

/// CLI arguments for the gateway.
#[derive(Debug, Parser)]
#[command(name = "loggate")]
#[command(about = "Authenticated log ingestion gateway")]
pub struct CliArgs {
    /// HTTP server port.
    #[arg(long, env = "PORT", default_value = "8000")]
    pub port: u16,

    /// Address to bind.
    #[arg(long, env = "LOGGATE_HOST", default_value = "0.0.0.0")]
    pub host: std::net::IpAddr,

    /// Secret every request must present in `X-Preshared-Key`.
    ///
    /// Falls back to the well-known `DEFAULT_SECRET` when unset.
    #[arg(long, env = "SHARED_SECRET", hide_env_values = true)]
    pub shared_secret: Option<String>,

    /// Directory of the persistent key-value store.
    #[arg(long = "kv", env = "KV", default_value = ".data")]
    pub data_dir: PathBuf,

    /// Use in-memory storage (for testing); nothing survives a restart.
    #[arg(long, env = "LOGGATE_IN_MEMORY", default_value = "false")]
    pub in_memory: bool,

    /// Acknowledge writes before sled has flushed them to disk.
    #[arg(long, default_value = "false")]
    pub no_flush: bool,
}

/// Loads `KEY=value` lines from `path`, or from the first `.env` found in
/// the working directory or its ancestors when `path` is `None`.
///
/// Returns the file that was loaded. A missing file is not an error.
///
/// # Errors
///
/// Returns the [`dotenvy::Error`] if the file exists but cannot be read or
/// parsed.
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>, dotenvy::Error> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path).map(|()| path.to_path_buf()),
        None => dotenvy::dotenv(),
    };
    match loaded {
        Ok(path) => Ok(Some(path)),
        Err(err) if err.not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Which backend to open.
#[derive(Debug, Clone)]
pub enum StorageSettings {
    /// Volatile in-process store.
    InMemory,
    /// sled database on local disk.
    Sled(SledBackendConfig),
}

impl CliArgs {
    /// Convert CLI args to storage settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the data directory is empty.
    pub fn to_storage_settings(&self) -> Result<StorageSettings, ConfigError> {
        if self.in_memory {
            return Ok(StorageSettings::InMemory);
        }
        let config = SledBackendConfig::builder()
            .path(self.data_dir.clone())
            .flush_on_write(!self.no_flush)
            .build()?;
        Ok(StorageSettings::Sled(config))
    }

    /// Returns the configured secret, or the default when none is set.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::EmptySecret`] if the secret is set but empty.
    pub fn to_shared_secret(&self) -> Result<SharedSecret, AuthError> {
        match &self.shared_secret {
            Some(secret) => SharedSecret::new(secret.clone()),
            None => Ok(SharedSecret::default()),
        }
    }
}

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address to listen on.
    pub addr: SocketAddr,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self { addr: SocketAddr::from(([0, 0, 0, 0], 8000)) }
    }
}

impl From<&CliArgs> for GatewayConfig {
    fn from(args: &CliArgs) -> Self {
        Self { addr: SocketAddr::new(args.host, args.port) }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("loggate").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn should_default_to_port_8000_and_sled() {
        // given
        let args = CliArgs::try_parse_from(["loggate", "--kv", "/tmp/loggate-kv"]).unwrap();

        // when
        let config = GatewayConfig::from(&args);
        let storage = args.to_storage_settings().unwrap();

        // then
        assert_eq!(config.addr.port(), args.port);
        let StorageSettings::Sled(sled) = storage else {
            panic!("expected sled settings");
        };
        assert_eq!(sled.path(), std::path::Path::new("/tmp/loggate-kv"));
        assert!(sled.flush_on_write());
    }

    #[test]
    fn should_select_in_memory_storage() {
        let args = parse(&["--in-memory"]);
        assert!(matches!(args.to_storage_settings().unwrap(), StorageSettings::InMemory));
    }

    #[test]
    fn should_disable_flush_on_request() {
        let args = parse(&["--kv", "/tmp/x", "--no-flush"]);
        let StorageSettings::Sled(sled) = args.to_storage_settings().unwrap() else {
            panic!("expected sled settings");
        };
        assert!(!sled.flush_on_write());
    }

    #[test]
    fn should_reject_empty_data_dir() {
        let mut args = parse(&[]);
        args.in_memory = false;
        args.data_dir = PathBuf::new();
        assert_eq!(args.to_storage_settings().unwrap_err(), ConfigError::Empty { field: "path" });
    }

    #[test]
    fn should_use_explicit_secret() {
        let args = parse(&["--shared-secret", "s3cr3t"]);
        let secret = args.to_shared_secret().unwrap();
        assert!(!secret.is_default());
        assert!(secret.verify(Some("s3cr3t")).is_ok());
    }

    #[test]
    fn should_reject_empty_secret() {
        let args = parse(&["--shared-secret", ""]);
        assert_eq!(args.to_shared_secret().unwrap_err(), AuthError::EmptySecret);
    }

    #[test]
    fn should_read_flags_from_env_file() {
        // given a .env file and a variable already set in the environment
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(".env");
        let lines =
            ["LOGGATE_HOST=127.0.0.2", "LOGGATE_ENV_FILE_CHECK=a", "LOGGATE_ENV_FILE_KEPT=a"];
        std::fs::write(&path, lines.join("\n")).unwrap();
        std::env::set_var("LOGGATE_ENV_FILE_KEPT", "b");

        // when
        let loaded = load_env_file(Some(&path)).unwrap();

        // then the file fills gaps, the process environment wins, and clap sees it
        assert_eq!(loaded.as_deref(), Some(path.as_path()));
        assert_eq!(std::env::var("LOGGATE_ENV_FILE_CHECK").unwrap(), "a");
        assert_eq!(std::env::var("LOGGATE_ENV_FILE_KEPT").unwrap(), "b");
        assert_eq!(parse(&[]).host, "127.0.0.2".parse::<std::net::IpAddr>().unwrap());
    }

    #[test]
    fn should_ignore_missing_env_file() {
        let dir = tempfile::TempDir::new().unwrap();
        assert_eq!(load_env_file(Some(&dir.path().join(".env"))).unwrap(), None);
    }

    #[test]
    fn should_reject_malformed_env_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "NOT A VALID LINE\n").unwrap();

        assert!(load_env_file(Some(&path)).is_err());
    }

    #[test]
    fn should_bind_configured_host_and_port() {
        let args = parse(&["--host", "127.0.0.1", "--port", "9001"]);
        assert_eq!(GatewayConfig::from(&args).addr, "127.0.0.1:9001".parse().unwrap());
    }
}
