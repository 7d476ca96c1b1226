//! The `InsuredStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `timetravel-store-sqlite`). The HTTP layer depends on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
  Classify, Error, EntityKind,
  fields::{FieldMap, NewRecord, RecordUpdate},
  record::{Insured, InsuredView, VersionRecord},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`InsuredStore::list_insureds`]. Every set field must match.
#[derive(Debug, Clone, Default)]
pub struct InsuredFilter {
  pub id:            Option<i64>,
  /// Case-insensitive substring match.
  pub name:          Option<String>,
  pub policy_number: Option<i64>,
  pub limit:         Option<usize>,
  pub offset:        Option<usize>,
}

/// The answer to an as-of read: a fully assembled insured, or the child
/// versions current at the instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AsOf {
  Insured(InsuredView),
  Records(Vec<VersionRecord>),
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a versioned insured store.
///
/// Employees and addresses are append-only: an update writes a new version
/// and leaves every earlier one readable. Insureds are written once. Only
/// [`delete`](InsuredStore::delete) removes rows.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait InsuredStore: Send + Sync {
  type Error: std::error::Error + Classify + From<Error> + Send + Sync + 'static;

  /// The store's current time, as it would stamp a version written now.
  fn now(&self) -> DateTime<Utc>;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Create a new identity and its first version. Insureds are assigned the
  /// next policy number.
  fn create(
    &self,
    input: NewRecord,
  ) -> impl Future<Output = Result<VersionRecord, Self::Error>> + Send + '_;

  /// Append a version to an existing child. Fails with
  /// [`Error::UpdateMustChangeAValue`] if nothing would change.
  fn update(
    &self,
    input: RecordUpdate,
  ) -> impl Future<Output = Result<VersionRecord, Self::Error>> + Send + '_;

  /// Remove an identity and every version of it, returning the version that
  /// was current. Deleting an insured also removes its children.
  fn delete(
    &self,
    kind: EntityKind,
    id: i64,
  ) -> impl Future<Output = Result<VersionRecord, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// The chronologically latest version of an identity.
  fn get_latest(
    &self,
    kind: EntityKind,
    id: i64,
  ) -> impl Future<Output = Result<VersionRecord, Self::Error>> + Send + '_;

  /// Every version of an identity, oldest first.
  fn history(
    &self,
    kind: EntityKind,
    id: i64,
  ) -> impl Future<Output = Result<Vec<VersionRecord>, Self::Error>> + Send + '_;

  /// The versions of `kind` owned by `insured_id` that were current at `at`.
  /// An empty result is not an error.
  fn select_as_of(
    &self,
    kind: EntityKind,
    insured_id: i64,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<VersionRecord>, Self::Error>> + Send + '_;

  /// The insured with its employees and addresses as of `at`. Fails with
  /// [`Error::InsuredNotFoundAsOf`] if the insured was created after `at`.
  fn assemble(
    &self,
    insured_id: i64,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<InsuredView, Self::Error>> + Send + '_;

  fn list_insureds<'a>(
    &'a self,
    filter: &'a InsuredFilter,
  ) -> impl Future<Output = Result<Vec<Insured>, Self::Error>> + Send + 'a;

  // ── Provided ──────────────────────────────────────────────────────────

  /// As-of read for any kind. Insureds are assembled; a child kind with no
  /// current version is reported as [`Error::NothingAsOf`].
  fn get_as_of(
    &self,
    kind: EntityKind,
    insured_id: i64,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<AsOf, Self::Error>> + Send + '_ {
    async move {
      if kind.is_root() {
        return self.assemble(insured_id, at).await.map(AsOf::Insured);
      }
      let records = self.select_as_of(kind, insured_id, at).await?;
      if records.is_empty() {
        return Err(
          Error::NothingAsOf {
            kind,
            insured_id,
            at,
          }
          .into(),
        );
      }
      Ok(AsOf::Records(records))
    }
  }

  /// Parse a loose field map and create from it.
  fn create_from_map<'a>(
    &'a self,
    kind: EntityKind,
    fields: &'a FieldMap,
  ) -> impl Future<Output = Result<VersionRecord, Self::Error>> + Send + 'a {
    async move {
      let input = NewRecord::parse(kind, fields)?;
      self.create(input).await
    }
  }

  /// Parse a loose field map and update from it.
  fn update_from_map<'a>(
    &'a self,
    kind: EntityKind,
    fields: &'a FieldMap,
  ) -> impl Future<Output = Result<VersionRecord, Self::Error>> + Send + 'a {
    async move {
      let input = RecordUpdate::parse(kind, fields)?;
      self.update(input).await
    }
  }
}
