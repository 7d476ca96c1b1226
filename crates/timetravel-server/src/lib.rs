//! HTTP server wiring for timetravel.
//!
//! Mounts the JSON API from [`timetravel_api`] under `/api/v2` over any
//! [`InsuredStore`], and holds the runtime configuration the binary reads.

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::Router;
use serde::Deserialize;
use timetravel_core::store::InsuredStore;
use tower_http::trace::TraceLayer;

/// Prefix every API route is mounted under.
pub const API_PREFIX: &str = "/api/v2";

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `TIMETRAVEL_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:             String,
  pub port:             u16,
  pub store_path:       PathBuf,
  /// Per-operation store deadline; unset means no deadline.
  pub query_timeout_ms: Option<u64>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:             "127.0.0.1".to_owned(),
      port:             8000,
      store_path:       PathBuf::from("timetravel.db"),
      query_timeout_ms: None,
    }
  }
}

impl ServerConfig {
  pub fn query_timeout(&self) -> Option<Duration> {
    self.query_timeout_ms.map(Duration::from_millis)
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the full application router for `store`.
pub fn router<S>(store: Arc<S>) -> Router
where
  S: InsuredStore + 'static,
{
  Router::new()
    .nest(API_PREFIX, timetravel_api::api_router(store))
    .layer(TraceLayer::new_for_http())
}
