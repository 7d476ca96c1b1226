//! Typed write inputs parsed from loose string field maps.
//!
//! Clients submit `{"name": "...", "insuredId": "5", ...}`. Those maps are
//! converted into [`NewRecord`] or [`RecordUpdate`] right away; nothing past
//! this module sees raw strings. Values are trimmed and a blank value counts
//! as absent.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::{
  Error, Result,
  instant::parse_date,
  kind::EntityKind,
  record::{AddressFields, EmployeeFields, InsuredFields},
};

pub type FieldMap = HashMap<String, String>;

pub const NAME: &str = "name";
pub const INSURED_ID: &str = "insuredId";
pub const START_DATE: &str = "startDate";
pub const END_DATE: &str = "endDate";
pub const ADDRESS: &str = "address";
pub const EMPLOYEE_ID: &str = "employeeId";

const INSURED_ID_ALIASES: &[&str] = &[INSURED_ID, "rootId"];
const EMPLOYEE_ID_ALIASES: &[&str] = &[EMPLOYEE_ID, "id"];

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// A validated create request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewRecord {
  Insured(InsuredFields),
  Employee {
    insured_id: i64,
    fields:     EmployeeFields,
  },
  Address {
    insured_id: i64,
    fields:     AddressFields,
  },
}

/// A validated update request. Insureds have no variant; their fields are
/// fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordUpdate {
  Employee {
    employee_id: i64,
    insured_id:  i64,
    patch:       EmployeePatch,
  },
  Address {
    insured_id: i64,
    fields:     AddressFields,
  },
}

/// The employee fields an update mentions. Anything left out keeps its
/// current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmployeePatch {
  pub name:       Option<String>,
  pub start_date: Option<NaiveDate>,
  /// `Some(None)` clears the end date; an explicit empty `endDate` does this.
  pub end_date:   Option<Option<NaiveDate>>,
}

impl EmployeePatch {
  pub fn is_empty(&self) -> bool {
    self.name.is_none() && self.start_date.is_none() && self.end_date.is_none()
  }

  /// The field set that results from applying this patch to `current`.
  pub fn apply(&self, current: &EmployeeFields) -> Result<EmployeeFields> {
    let next = EmployeeFields {
      name:       self.name.clone().unwrap_or_else(|| current.name.clone()),
      start_date: self.start_date.unwrap_or(current.start_date),
      end_date:   self.end_date.unwrap_or(current.end_date),
    };
    check_interval(&next)?;
    Ok(next)
  }
}

impl NewRecord {
  pub fn parse(kind: EntityKind, map: &FieldMap) -> Result<Self> {
    match kind {
      EntityKind::Insured => Ok(Self::Insured(InsuredFields {
        name: required(map, NAME)?.to_owned(),
      })),
      EntityKind::Employee => {
        let insured_id = required_id(map, INSURED_ID, INSURED_ID_ALIASES)?;
        let fields = EmployeeFields {
          name:       required(map, NAME)?.to_owned(),
          start_date: parse_date(START_DATE, required(map, START_DATE)?)?,
          end_date:   optional(map, END_DATE)
            .map(|raw| parse_date(END_DATE, raw))
            .transpose()?,
        };
        check_interval(&fields)?;
        Ok(Self::Employee { insured_id, fields })
      }
      EntityKind::Address => Ok(Self::Address {
        insured_id: required_id(map, INSURED_ID, INSURED_ID_ALIASES)?,
        fields:     AddressFields {
          address: required(map, ADDRESS)?.to_owned(),
        },
      }),
    }
  }

  pub fn kind(&self) -> EntityKind {
    match self {
      Self::Insured(_) => EntityKind::Insured,
      Self::Employee { .. } => EntityKind::Employee,
      Self::Address { .. } => EntityKind::Address,
    }
  }
}

impl RecordUpdate {
  pub fn parse(kind: EntityKind, map: &FieldMap) -> Result<Self> {
    match kind {
      EntityKind::Insured => Err(Error::InsuredImmutable),
      EntityKind::Employee => {
        let employee_id = required_id(map, EMPLOYEE_ID, EMPLOYEE_ID_ALIASES)?;
        let insured_id = required_id(map, INSURED_ID, INSURED_ID_ALIASES)?;
        let end_date = match map.get(END_DATE).map(|v| v.trim()) {
          None => None,
          Some("") => Some(None),
          Some(raw) => Some(Some(parse_date(END_DATE, raw)?)),
        };
        let patch = EmployeePatch {
          name: optional(map, NAME).map(str::to_owned),
          start_date: optional(map, START_DATE)
            .map(|raw| parse_date(START_DATE, raw))
            .transpose()?,
          end_date,
        };
        if patch.is_empty() {
          return Err(Error::UpdateMustChangeAValue);
        }
        Ok(Self::Employee {
          employee_id,
          insured_id,
          patch,
        })
      }
      EntityKind::Address => Ok(Self::Address {
        insured_id: required_id(map, INSURED_ID, INSURED_ID_ALIASES)?,
        fields:     AddressFields {
          address: required(map, ADDRESS)?.to_owned(),
        },
      }),
    }
  }

  pub fn kind(&self) -> EntityKind {
    match self {
      Self::Employee { .. } => EntityKind::Employee,
      Self::Address { .. } => EntityKind::Address,
    }
  }

  pub fn insured_id(&self) -> i64 {
    match self {
      Self::Employee { insured_id, .. } | Self::Address { insured_id, .. } => {
        *insured_id
      }
    }
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn optional<'a>(map: &'a FieldMap, key: &str) -> Option<&'a str> {
  map.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn required<'a>(map: &'a FieldMap, key: &'static str) -> Result<&'a str> {
  optional(map, key).ok_or(Error::MissingField(key))
}

/// Look up an identity under its canonical name or any alias.
fn required_id(
  map: &FieldMap,
  canonical: &'static str,
  aliases: &[&str],
) -> Result<i64> {
  let raw = aliases
    .iter()
    .find_map(|k| optional(map, k))
    .ok_or(Error::MissingField(canonical))?;
  parse_id(canonical, raw)
}

/// Parse a positive numeric identity.
pub fn parse_id(field: &'static str, raw: &str) -> Result<i64> {
  match raw.trim().parse::<i64>() {
    Ok(id) if id > 0 => Ok(id),
    _ => Err(Error::InvalidField {
      field,
      reason: format!("{raw:?} is not a positive integer id"),
    }),
  }
}

fn check_interval(fields: &EmployeeFields) -> Result<()> {
  match fields.end_date {
    Some(end) if end < fields.start_date => Err(Error::InvalidField {
      field:  END_DATE,
      reason: format!("{end} is before start date {}", fields.start_date),
    }),
    _ => Ok(()),
  }
}
