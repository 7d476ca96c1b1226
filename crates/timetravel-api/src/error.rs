//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use timetravel_core::{Classify, ErrorKind};

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unknown resource {name:?}; expected one of: {expected}")]
  UnknownResource { name: String, expected: String },

  #[error("bad request: {0}")]
  BadRequest(String),

  /// Anything the core or a store reported, with its classification.
  #[error("{source}")]
  Store {
    kind:   ErrorKind,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

impl ApiError {
  /// Wrap a classified core or store error.
  pub fn store<E>(e: E) -> Self
  where
    E: Classify + std::error::Error + Send + Sync + 'static,
  {
    Self::Store {
      kind:   e.error_kind(),
      source: Box::new(e),
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::UnknownResource { .. } | Self::BadRequest(_) => {
        StatusCode::BAD_REQUEST
      }
      Self::Store { kind, .. } => status_for(*kind),
    }
  }
}

impl From<timetravel_core::Error> for ApiError {
  fn from(e: timetravel_core::Error) -> Self { Self::store(e) }
}

/// The one place error kinds meet HTTP.
pub fn status_for(kind: ErrorKind) -> StatusCode {
  match kind {
    ErrorKind::NotFound => StatusCode::NOT_FOUND,
    ErrorKind::AlreadyExists | ErrorKind::NoOpUpdate => StatusCode::CONFLICT,
    ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
    ErrorKind::Server => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    } else {
      tracing::debug!(error = %self, %status, "request rejected");
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
