//! Resource names accepted in URL paths.

use timetravel_core::EntityKind;

use crate::error::ApiError;

const SYNONYMS: &[(&str, EntityKind)] = &[
  ("insured", EntityKind::Insured),
  ("insureds", EntityKind::Insured),
  ("employee", EntityKind::Employee),
  ("employees", EntityKind::Employee),
  ("address", EntityKind::Address),
  ("addresses", EntityKind::Address),
  ("insured_addresses", EntityKind::Address),
];

/// Resolve a path segment such as `employees` to its kind. Matching ignores
/// ASCII case.
pub fn resolve(name: &str) -> Result<EntityKind, ApiError> {
  SYNONYMS
    .iter()
    .find(|(synonym, _)| synonym.eq_ignore_ascii_case(name))
    .map(|(_, kind)| *kind)
    .ok_or_else(|| ApiError::UnknownResource {
      name:     name.to_owned(),
      expected: SYNONYMS
        .iter()
        .map(|(s, _)| *s)
        .collect::<Vec<_>>()
        .join(", "),
    })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn plural_and_legacy_names_resolve() {
    assert_eq!(resolve("insureds").unwrap(), EntityKind::Insured);
    assert_eq!(resolve("Employees").unwrap(), EntityKind::Employee);
    assert_eq!(resolve("insured_addresses").unwrap(), EntityKind::Address);
  }

  #[test]
  fn unknown_names_list_the_valid_ones() {
    let err = resolve("policies").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("\"policies\""));
    assert!(message.contains("insured_addresses"));
  }
}
