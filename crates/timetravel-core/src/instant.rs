//! Parsing and normalising the instants that as-of reads are keyed by.
//!
//! Record timestamps have whole-second resolution, so every instant that
//! enters the system is truncated before it is compared.

use chrono::{DateTime, NaiveDate, NaiveTime, SubsecRound as _, Utc};

use crate::{Error, Result};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn from_epoch(secs: i64) -> Result<DateTime<Utc>> {
  DateTime::from_timestamp(secs, 0)
    .ok_or_else(|| Error::InvalidInstant(secs.to_string()))
}

pub fn truncate_to_second(at: DateTime<Utc>) -> DateTime<Utc> {
  at.trunc_subsecs(0)
}

/// The last second of `date` in UTC. A date cutoff includes every version
/// recorded on that day.
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
  let last = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
  date.and_time(last).and_utc()
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|e| {
    Error::InvalidField {
      field,
      reason: format!("{raw:?} is not a YYYY-MM-DD date ({e})"),
    }
  })
}

/// Parse a `YYYY-MM-DD` date into its end-of-day cutoff.
pub fn parse_date_cutoff(raw: &str) -> Result<DateTime<Utc>> {
  NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
    .map(end_of_day)
    .map_err(|_| Error::InvalidInstant(raw.to_owned()))
}

/// Parse a Unix timestamp in seconds.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
  raw
    .trim()
    .parse::<i64>()
    .map_err(|_| Error::InvalidInstant(raw.to_owned()))
    .and_then(from_epoch)
}

/// Parse any accepted instant: Unix seconds, a `YYYY-MM-DD` date (end of
/// day), or RFC 3339.
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
  let s = raw.trim();
  if s.is_empty() {
    return Err(Error::InvalidInstant(raw.to_owned()));
  }
  if let Ok(at) = parse_timestamp(s) {
    return Ok(at);
  }
  if let Ok(at) = parse_date_cutoff(s) {
    return Ok(at);
  }
  DateTime::parse_from_rfc3339(s)
    .map(|at| truncate_to_second(at.with_timezone(&Utc)))
    .map_err(|_| Error::InvalidInstant(raw.to_owned()))
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;

  #[test]
  fn date_cutoff_is_last_second_of_day() {
    let at = parse_date_cutoff("1999-01-14").unwrap();
    assert_eq!(at, Utc.with_ymd_and_hms(1999, 1, 14, 23, 59, 59).unwrap());
  }

  #[test]
  fn accepts_all_three_forms() {
    assert_eq!(parse_instant("86400").unwrap().timestamp(), 86_400);
    assert_eq!(
      parse_instant("1970-01-02").unwrap().timestamp(),
      86_400 + 86_399
    );
    assert_eq!(
      parse_instant("1970-01-02T00:00:00.750+00:00")
        .unwrap()
        .timestamp(),
      86_400
    );
  }

  #[test]
  fn rejects_garbage() {
    assert!(matches!(
      parse_instant("yesterday"),
      Err(Error::InvalidInstant(_))
    ));
    assert!(matches!(parse_instant("  "), Err(Error::InvalidInstant(_))));
    assert!(parse_date("startDate", "1974-13-01").is_err());
  }
}
