//! The closed set of entity kinds and the per-kind rules that drive
//! selection and write validation.

use std::str::FromStr as _;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::{Error, Result};

/// The kind of a logical entity.
///
/// `Insured` is the root; employees and addresses are always owned by
/// exactly one insured.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntityKind {
  Insured,
  Employee,
  Address,
}

/// How the point-in-time selector decides that two versions describe the
/// same logical child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
  /// One result per stable identity.
  Identity,
  /// One result per `(insured, name)` pair. Versions of one employee that
  /// carry different names are reported separately, and a re-hire under the
  /// same name collapses onto the latest version for that name.
  InsuredAndName,
}

/// The natural-key rule a create must not violate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Uniqueness {
  /// Every create mints a fresh identity.
  None,
  /// At most one identity of this kind per insured.
  OnePerInsured,
  /// At most one identity per `(insured, name)`.
  NamePerInsured,
}

impl EntityKind {
  /// Parse a canonical kind name (`insured`, `employee`, `address`).
  pub fn parse(s: &str) -> Result<Self> {
    Self::from_str(s).map_err(|_| Error::UnknownKind(s.to_owned()))
  }

  pub fn is_root(self) -> bool { matches!(self, Self::Insured) }

  pub fn grouping(self) -> Grouping {
    match self {
      Self::Insured | Self::Address => Grouping::Identity,
      Self::Employee => Grouping::InsuredAndName,
    }
  }

  pub fn uniqueness(self) -> Uniqueness {
    match self {
      Self::Insured => Uniqueness::None,
      Self::Employee => Uniqueness::NamePerInsured,
      Self::Address => Uniqueness::OnePerInsured,
    }
  }
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator as _;

  use super::*;

  #[test]
  fn canonical_names_round_trip() {
    for kind in EntityKind::iter() {
      assert_eq!(EntityKind::parse(kind.as_ref()).unwrap(), kind);
    }
    assert_eq!(EntityKind::Insured.to_string(), "insured");
  }

  #[test]
  fn unknown_name_is_rejected() {
    let err = EntityKind::parse("policyholder").unwrap_err();
    assert!(matches!(err, Error::UnknownKind(ref s) if s == "policyholder"));
  }

  #[test]
  fn only_employees_group_by_name() {
    assert_eq!(EntityKind::Employee.grouping(), Grouping::InsuredAndName);
    assert_eq!(EntityKind::Address.grouping(), Grouping::Identity);
    assert!(EntityKind::Insured.is_root());
  }
}
