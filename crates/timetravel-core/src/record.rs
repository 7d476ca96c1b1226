//! Version records: immutable snapshots of an entity at one instant.
//!
//! An insured is written once and never revised, so its identity row is also
//! its only version. Employees and addresses accumulate a version per
//! accepted update; nothing here is ever mutated after it is stored.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::kind::EntityKind;

// ─── Field sets ──────────────────────────────────────────────────────────────

/// The values an insured is created with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuredFields {
  pub name: String,
}

/// The observable values of one employee version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeFields {
  pub name:       String,
  pub start_date: NaiveDate,
  /// `None` while the employment is ongoing.
  pub end_date:   Option<NaiveDate>,
}

/// The observable values of one address version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressFields {
  pub address: String,
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// The root entity. Name and policy number are fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insured {
  pub id:            i64,
  pub name:          String,
  pub policy_number: i64,
  #[serde(rename = "recordTimestamp", with = "chrono::serde::ts_seconds")]
  pub recorded_at:   DateTime<Utc>,
}

/// One version of an employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
  /// Stable identity shared by every version of this employee.
  pub id:          i64,
  pub insured_id:  i64,
  /// Row id of this particular version; increases with insertion order.
  pub version_id:  i64,
  pub name:        String,
  pub start_date:  NaiveDate,
  pub end_date:    Option<NaiveDate>,
  #[serde(rename = "recordTimestamp", with = "chrono::serde::ts_seconds")]
  pub recorded_at: DateTime<Utc>,
}

impl Employee {
  pub fn fields(&self) -> EmployeeFields {
    EmployeeFields {
      name:       self.name.clone(),
      start_date: self.start_date,
      end_date:   self.end_date,
    }
  }
}

/// One version of an insured's address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
  pub id:          i64,
  pub insured_id:  i64,
  pub version_id:  i64,
  pub address:     String,
  #[serde(rename = "recordTimestamp", with = "chrono::serde::ts_seconds")]
  pub recorded_at: DateTime<Utc>,
}

impl Address {
  pub fn fields(&self) -> AddressFields {
    AddressFields { address: self.address.clone() }
  }
}

/// A stored version of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum VersionRecord {
  Insured(Insured),
  Employee(Employee),
  Address(Address),
}

impl VersionRecord {
  pub fn kind(&self) -> EntityKind {
    match self {
      Self::Insured(_) => EntityKind::Insured,
      Self::Employee(_) => EntityKind::Employee,
      Self::Address(_) => EntityKind::Address,
    }
  }

  /// The stable identity this version belongs to.
  pub fn id(&self) -> i64 {
    match self {
      Self::Insured(i) => i.id,
      Self::Employee(e) => e.id,
      Self::Address(a) => a.id,
    }
  }

  /// The owning insured; an insured owns itself.
  pub fn insured_id(&self) -> i64 {
    match self {
      Self::Insured(i) => i.id,
      Self::Employee(e) => e.insured_id,
      Self::Address(a) => a.insured_id,
    }
  }

  /// Insertion-ordered row id, used to break timestamp ties.
  pub fn version_id(&self) -> i64 {
    match self {
      Self::Insured(i) => i.id,
      Self::Employee(e) => e.version_id,
      Self::Address(a) => a.version_id,
    }
  }

  pub fn recorded_at(&self) -> DateTime<Utc> {
    match self {
      Self::Insured(i) => i.recorded_at,
      Self::Employee(e) => e.recorded_at,
      Self::Address(a) => a.recorded_at,
    }
  }

  pub fn into_insured(self) -> Option<Insured> {
    match self {
      Self::Insured(i) => Some(i),
      _ => None,
    }
  }

  pub fn into_employee(self) -> Option<Employee> {
    match self {
      Self::Employee(e) => Some(e),
      _ => None,
    }
  }

  pub fn into_address(self) -> Option<Address> {
    match self {
      Self::Address(a) => Some(a),
      _ => None,
    }
  }
}

// ─── Composite view ──────────────────────────────────────────────────────────

/// An insured together with the children that were current at `as_of`.
///
/// Never stored; always assembled on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsuredView {
  #[serde(flatten)]
  pub insured:   Insured,
  #[serde(with = "chrono::serde::ts_seconds")]
  pub as_of:     DateTime<Utc>,
  pub employees: Vec<Employee>,
  pub addresses: Vec<Address>,
}
