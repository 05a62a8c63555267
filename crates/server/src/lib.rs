//! HTTP gateway for loggate.
//!
//! Wires the [`LogStore`](loggate_log::LogStore) to axum:
//!
//! | Method | Path | Auth | Response |
//! |--------|------|------|----------|
//! | `OPTIONS` | `/` | no | 204 with CORS headers |
//! | `GET` | `/` | yes | 200, JSON list of `{key, value}` |
//! | `POST` | `/` | yes | 201, or 400 `Invalid data` |
//! | other | `/` | yes | 405 `Invalid method` |
//! | `GET` | `/-/healthy` | no | 200 `OK` |
//! | `GET` | `/-/ready` | no | 200 `OK` or 503 `Not Ready` |
//!
//! Authenticated routes answer 401 `Unauthorized` when `X-Preshared-Key` is
//! missing or wrong.

#![deny(unsafe_code)]

pub mod backend;
pub mod config;
pub mod error;
pub mod handlers;
pub mod http;
pub mod middleware;

pub use backend::Backend;
pub use config::{CliArgs, GatewayConfig, StorageSettings, load_env_file};
pub use error::ApiError;
pub use handlers::AppState;
pub use http::{GatewayServer, router};
