//! Error types for `timetravel-core`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kind::EntityKind;

// ─── Kinds ───────────────────────────────────────────────────────────────────

/// The transport-independent category of a failure.
///
/// Storage backends and the core classify every error into one of these; only
/// the outermost layer decides what a kind means on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  /// The identity, its parent, or a version valid at the instant is missing.
  NotFound,
  /// A create collided with an existing child under the kind's uniqueness
  /// rule, or an insured update was attempted.
  AlreadyExists,
  /// Missing or malformed input.
  InvalidInput,
  /// An update identical to the current version.
  NoOpUpdate,
  /// Storage failure or anything else unexpected.
  Server,
}

/// Implemented by every error type that crosses a store boundary.
pub trait Classify {
  fn error_kind(&self) -> ErrorKind;
}

// ─── Error ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum Error {
  #[error("{kind} {id} does not exist")]
  RecordNotFound { kind: EntityKind, id: i64 },

  #[error("insured {insured_id} did not exist as of {at}")]
  InsuredNotFoundAsOf { insured_id: i64, at: DateTime<Utc> },

  #[error("insured {insured_id} has no {kind} record as of {at}")]
  NothingAsOf {
    kind:       EntityKind,
    insured_id: i64,
    at:         DateTime<Utc>,
  },

  #[error("insured {0} does not exist")]
  NonexistentParent(i64),

  #[error("insured {insured_id} has no {kind}; use create instead")]
  UseCreateInstead { kind: EntityKind, insured_id: i64 },

  #[error("{kind} already exists: {detail}")]
  AlreadyExists { kind: EntityKind, detail: String },

  #[error("insured records cannot be updated")]
  InsuredImmutable,

  #[error("{0} is required")]
  MissingField(&'static str),

  #[error("invalid {field}: {reason}")]
  InvalidField { field: &'static str, reason: String },

  #[error("{kind} {id} belongs to insured {owner}, not {requested}")]
  OwnerMismatch {
    kind:      EntityKind,
    id:        i64,
    owner:     i64,
    requested: i64,
  },

  #[error("invalid instant {0:?}")]
  InvalidInstant(String),

  #[error("unknown entity kind: {0:?}")]
  UnknownKind(String),

  #[error("update must change a value")]
  UpdateMustChangeAValue,
}

impl Classify for Error {
  fn error_kind(&self) -> ErrorKind {
    match self {
      Self::RecordNotFound { .. }
      | Self::InsuredNotFoundAsOf { .. }
      | Self::NothingAsOf { .. }
      | Self::NonexistentParent(_)
      | Self::UseCreateInstead { .. } => ErrorKind::NotFound,
      Self::AlreadyExists { .. } | Self::InsuredImmutable => {
        ErrorKind::AlreadyExists
      }
      Self::MissingField(_)
      | Self::InvalidField { .. }
      | Self::OwnerMismatch { .. }
      | Self::InvalidInstant(_)
      | Self::UnknownKind(_) => ErrorKind::InvalidInput,
      Self::UpdateMustChangeAValue => ErrorKind::NoOpUpdate,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
