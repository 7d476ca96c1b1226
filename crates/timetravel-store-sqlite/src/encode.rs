//! Encoding and decoding helpers between domain types and the plain values
//! stored in SQLite columns.
//!
//! Timestamps are stored as Unix epoch seconds. Dates are `YYYY-MM-DD` text.

use chrono::{DateTime, NaiveDate, Utc};
use timetravel_core::{
  EntityKind,
  instant::DATE_FORMAT,
  record::{Address, Employee, Insured, VersionRecord},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_ts(dt: DateTime<Utc>) -> i64 { dt.timestamp() }

pub fn decode_ts(secs: i64) -> Result<DateTime<Utc>> {
  DateTime::from_timestamp(secs, 0)
    .ok_or_else(|| Error::DateParse(format!("timestamp out of range: {secs}")))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Kind-specific columns as read from a records row.
pub enum RawValues {
  Insured {
    name:          String,
    policy_number: i64,
  },
  Employee {
    name:       String,
    start_date: String,
    end_date:   Option<String>,
  },
  Address {
    address: String,
  },
}

/// One row produced by [`crate::layout::select_versions`].
pub struct RawVersion {
  pub id:          i64,
  pub insured_id:  i64,
  pub version_id:  i64,
  pub recorded_at: i64,
  pub values:      RawValues,
}

impl RawVersion {
  /// Read a row laid out as `id, insured_id, version_id, record_timestamp,
  /// <value columns>`.
  pub fn from_row(
    kind: EntityKind,
    row: &rusqlite::Row<'_>,
  ) -> rusqlite::Result<Self> {
    let values = match kind {
      EntityKind::Insured => RawValues::Insured {
        name:          row.get(4)?,
        policy_number: row.get(5)?,
      },
      EntityKind::Employee => RawValues::Employee {
        name:       row.get(4)?,
        start_date: row.get(5)?,
        end_date:   row.get(6)?,
      },
      EntityKind::Address => RawValues::Address {
        address: row.get(4)?,
      },
    };
    Ok(Self {
      id: row.get(0)?,
      insured_id: row.get(1)?,
      version_id: row.get(2)?,
      recorded_at: row.get(3)?,
      values,
    })
  }

  pub fn into_record(self) -> Result<VersionRecord> {
    let recorded_at = decode_ts(self.recorded_at)?;
    Ok(match self.values {
      RawValues::Insured {
        name,
        policy_number,
      } => VersionRecord::Insured(Insured {
        id: self.id,
        name,
        policy_number,
        recorded_at,
      }),
      RawValues::Employee {
        name,
        start_date,
        end_date,
      } => VersionRecord::Employee(Employee {
        id: self.id,
        insured_id: self.insured_id,
        version_id: self.version_id,
        name,
        start_date: decode_date(&start_date)?,
        end_date: end_date.as_deref().map(decode_date).transpose()?,
        recorded_at,
      }),
      RawValues::Address { address } => VersionRecord::Address(Address {
        id: self.id,
        insured_id: self.insured_id,
        version_id: self.version_id,
        address,
        recorded_at,
      }),
    })
  }
}
