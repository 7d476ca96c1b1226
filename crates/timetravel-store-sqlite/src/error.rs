//! Error type for `timetravel-store-sqlite`.

use std::time::Duration;

use thiserror::Error;
use timetravel_core::{Classify, ErrorKind};

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] timetravel_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("database schema version {found} is newer than supported {supported}")]
  UnsupportedSchema { found: i64, supported: i64 },

  /// The operation outlived the store's query timeout and was abandoned.
  #[error("query exceeded its {0:?} deadline")]
  DeadlineExceeded(Duration),
}

impl Classify for Error {
  fn error_kind(&self) -> ErrorKind {
    match self {
      Self::Core(e) => e.error_kind(),
      _ => ErrorKind::Server,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
