//! Synchronous read queries. Each takes a borrowed connection so it can run
//! both inside a write transaction and on its own.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _};
use timetravel_core::{
  EntityKind, Error as CoreError,
  record::{Insured, InsuredView, VersionRecord},
  store::InsuredFilter,
  timeline,
};

use crate::{
  Result,
  encode::{RawVersion, encode_ts},
  layout::{Scope, select_versions},
};

/// Every version of one identity, oldest first. Empty if it does not exist.
pub fn versions(
  conn: &Connection,
  kind: EntityKind,
  id: i64,
) -> Result<Vec<VersionRecord>> {
  let mut stmt = conn.prepare_cached(&select_versions(kind, Scope::Identity))?;
  let raws = stmt
    .query_map(rusqlite::params![id], |row| RawVersion::from_row(kind, row))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawVersion::into_record).collect()
}

/// The latest version of one identity.
pub fn latest(
  conn: &Connection,
  kind: EntityKind,
  id: i64,
) -> Result<VersionRecord> {
  timeline::latest(versions(conn, kind, id)?)
    .ok_or_else(|| CoreError::RecordNotFound { kind, id }.into())
}

/// Versions of `kind` owned by `insured_id` recorded at or before `cutoff`.
pub fn candidates(
  conn: &Connection,
  kind: EntityKind,
  insured_id: i64,
  cutoff: DateTime<Utc>,
) -> Result<Vec<VersionRecord>> {
  let mut stmt = conn.prepare_cached(&select_versions(kind, Scope::OwnedUpTo))?;
  let raws = stmt
    .query_map(rusqlite::params![insured_id, encode_ts(cutoff)], |row| {
      RawVersion::from_row(kind, row)
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawVersion::into_record).collect()
}

/// The versions current at `at`, one per grouping key.
pub fn select_as_of(
  conn: &Connection,
  kind: EntityKind,
  insured_id: i64,
  at: DateTime<Utc>,
) -> Result<Vec<VersionRecord>> {
  Ok(timeline::select_as_of(
    candidates(conn, kind, insured_id, at)?,
    at,
  ))
}

pub fn insured_exists(conn: &Connection, id: i64) -> Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM insureds WHERE id = ?1",
        rusqlite::params![id],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

/// Compose an insured with the children current at `at`.
pub fn assemble(
  conn: &Connection,
  insured_id: i64,
  at: DateTime<Utc>,
) -> Result<InsuredView> {
  let insured = select_as_of(conn, EntityKind::Insured, insured_id, at)?
    .into_iter()
    .find_map(VersionRecord::into_insured);

  let Some(insured) = insured else {
    if insured_exists(conn, insured_id)? {
      return Err(CoreError::InsuredNotFoundAsOf { insured_id, at }.into());
    }
    return Err(
      CoreError::RecordNotFound {
        kind: EntityKind::Insured,
        id:   insured_id,
      }
      .into(),
    );
  };

  let employees = select_as_of(conn, EntityKind::Employee, insured_id, at)?
    .into_iter()
    .filter_map(VersionRecord::into_employee)
    .collect();
  let addresses = select_as_of(conn, EntityKind::Address, insured_id, at)?
    .into_iter()
    .filter_map(VersionRecord::into_address)
    .collect();

  Ok(InsuredView {
    insured,
    as_of: at,
    employees,
    addresses,
  })
}

pub fn list_insureds(
  conn: &Connection,
  filter: &InsuredFilter,
) -> Result<Vec<Insured>> {
  // SQLite treats a negative LIMIT as unbounded.
  let limit = filter.limit.map_or(-1, saturate);
  let offset = filter.offset.map_or(0, saturate);
  let pattern = filter.name.as_deref().map(like_pattern);

  let mut stmt = conn.prepare_cached(
    "SELECT id, id, id, record_timestamp, name, policy_number
     FROM insureds
     WHERE (?1 IS NULL OR id = ?1)
       AND (?2 IS NULL OR name LIKE ?2 ESCAPE '\\')
       AND (?3 IS NULL OR policy_number = ?3)
     ORDER BY id
     LIMIT ?4 OFFSET ?5",
  )?;
  let raws = stmt
    .query_map(
      rusqlite::params![
        filter.id,
        pattern,
        filter.policy_number,
        limit,
        offset,
      ],
      |row| RawVersion::from_row(EntityKind::Insured, row),
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok(
    raws
      .into_iter()
      .map(RawVersion::into_record)
      .collect::<Result<Vec<_>>>()?
      .into_iter()
      .filter_map(VersionRecord::into_insured)
      .collect(),
  )
}

fn saturate(n: usize) -> i64 { i64::try_from(n).unwrap_or(i64::MAX) }

/// A `LIKE` pattern matching `needle` anywhere, with its own wildcards
/// taken literally.
fn like_pattern(needle: &str) -> String {
  let mut pattern = String::with_capacity(needle.len() + 2);
  pattern.push('%');
  for c in needle.chars() {
    if matches!(c, '\\' | '%' | '_') {
      pattern.push('\\');
    }
    pattern.push(c);
  }
  pattern.push('%');
  pattern
}
