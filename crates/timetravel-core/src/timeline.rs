//! Point-in-time selection over version records.
//!
//! Storage hands this module every candidate version recorded at or before
//! the cutoff; selection itself is pure so every backend agrees on what
//! "current as of T" means.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::{kind::Grouping, record::VersionRecord};

/// Which versions compete with each other for "latest".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupingKey {
  Identity(i64),
  Name { insured_id: i64, name: String },
}

impl GroupingKey {
  pub fn of(record: &VersionRecord) -> Self {
    match (record.kind().grouping(), record) {
      (Grouping::InsuredAndName, VersionRecord::Employee(e)) => Self::Name {
        insured_id: e.insured_id,
        name:       e.name.clone(),
      },
      _ => Self::Identity(record.id()),
    }
  }
}

/// Newer timestamp wins; on a tie the later insertion wins.
fn supersedes(candidate: &VersionRecord, held: &VersionRecord) -> bool {
  (candidate.recorded_at(), candidate.version_id())
    > (held.recorded_at(), held.version_id())
}

/// For each grouping key, the latest version with `recorded_at <= cutoff`.
///
/// Keys whose every version is after the cutoff contribute nothing. The
/// result is ordered by identity, then version.
pub fn select_as_of<I>(records: I, cutoff: DateTime<Utc>) -> Vec<VersionRecord>
where
  I: IntoIterator<Item = VersionRecord>,
{
  let mut winners: BTreeMap<GroupingKey, VersionRecord> = BTreeMap::new();
  for record in records {
    if record.recorded_at() > cutoff {
      continue;
    }
    let key = GroupingKey::of(&record);
    match winners.get(&key) {
      Some(held) if !supersedes(&record, held) => {}
      _ => {
        winners.insert(key, record);
      }
    }
  }

  let mut out: Vec<_> = winners.into_values().collect();
  out.sort_by_key(|r| (r.id(), r.version_id()));
  out
}

/// The latest version regardless of cutoff.
pub fn latest<I>(records: I) -> Option<VersionRecord>
where
  I: IntoIterator<Item = VersionRecord>,
{
  records.into_iter().reduce(|held, candidate| {
    if supersedes(&candidate, &held) {
      candidate
    } else {
      held
    }
  })
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;
  use crate::record::{Address, Employee};

  fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
  }

  fn address(version_id: i64, secs: i64, text: &str) -> VersionRecord {
    VersionRecord::Address(Address {
      id: 1,
      insured_id: 9,
      version_id,
      address: text.into(),
      recorded_at: at(secs),
    })
  }

  fn employee(
    id: i64,
    version_id: i64,
    secs: i64,
    name: &str,
  ) -> VersionRecord {
    VersionRecord::Employee(Employee {
      id,
      insured_id: 9,
      version_id,
      name: name.into(),
      start_date: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
      end_date: None,
      recorded_at: at(secs),
    })
  }

  fn history() -> Vec<VersionRecord> {
    vec![
      address(1, 100, "first"),
      address(2, 200, "second"),
      address(3, 300, "third"),
    ]
  }

  fn address_text(selected: &[VersionRecord]) -> Vec<String> {
    selected
      .iter()
      .cloned()
      .filter_map(VersionRecord::into_address)
      .map(|a| a.address)
      .collect()
  }

  #[test]
  fn each_interval_sees_exactly_its_version() {
    for (cutoff, expected) in
      [(100, "first"), (199, "first"), (200, "second"), (299, "second")]
    {
      let got = select_as_of(history(), at(cutoff));
      assert_eq!(address_text(&got), vec![expected.to_owned()], "{cutoff}");
    }
    assert_eq!(address_text(&select_as_of(history(), at(10_000))), ["third"]);
  }

  #[test]
  fn boundary_is_inclusive() {
    let got = select_as_of(history(), at(300));
    assert_eq!(address_text(&got), ["third"]);
  }

  #[test]
  fn cutoff_before_first_version_is_empty() {
    assert!(select_as_of(history(), at(99)).is_empty());
  }

  #[test]
  fn timestamp_ties_go_to_the_later_insertion() {
    let records = vec![address(8, 100, "late"), address(7, 100, "early")];
    assert_eq!(address_text(&select_as_of(records, at(100))), ["late"]);
  }

  #[test]
  fn employees_group_by_name() {
    let records = vec![
      // Two identities sharing a name collapse onto the latest.
      employee(1, 1, 100, "Ann"),
      employee(2, 2, 200, "Ann"),
      // A rename surfaces under both names.
      employee(3, 3, 100, "Bob"),
      employee(3, 4, 150, "Robert"),
    ];
    let got: Vec<(i64, String)> = select_as_of(records, at(1_000))
      .into_iter()
      .filter_map(VersionRecord::into_employee)
      .map(|e| (e.version_id, e.name))
      .collect();
    assert_eq!(
      got,
      vec![
        (2, "Ann".to_owned()),
        (3, "Bob".to_owned()),
        (4, "Robert".to_owned()),
      ]
    );
  }

  #[test]
  fn latest_ignores_cutoff() {
    let got = latest(history()).and_then(VersionRecord::into_address);
    assert_eq!(got.map(|a| a.version_id), Some(3));
    assert!(latest(Vec::new()).is_none());
  }
}
