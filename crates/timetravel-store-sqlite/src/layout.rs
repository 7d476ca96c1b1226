//! Where each entity kind lives in the schema, and the one query builder
//! that reads versions of any kind.
//!
//! Every SQL fragment here is a compile-time constant. Nothing from a request
//! is ever spliced into SQL text.

use timetravel_core::EntityKind;

/// Table and column names for one kind.
#[derive(Debug, Clone, Copy)]
pub struct KindLayout {
  /// One row per stable identity.
  pub identity_table: &'static str,
  /// One row per version. For insureds this is the identity table itself.
  pub records_table:  &'static str,
  /// Column of `records_table` that references the identity.
  pub identity_ref:   &'static str,
  /// Row id of a version.
  pub version_col:    &'static str,
  /// Column of `identity_table` naming the owning insured.
  pub insured_col:    &'static str,
  /// Kind-specific columns of `records_table`, in decode order.
  pub value_cols:     &'static [&'static str],
}

const INSURED: KindLayout = KindLayout {
  identity_table: "insureds",
  records_table:  "insureds",
  identity_ref:   "id",
  version_col:    "id",
  insured_col:    "id",
  value_cols:     &["name", "policy_number"],
};

const EMPLOYEE: KindLayout = KindLayout {
  identity_table: "employees",
  records_table:  "employee_records",
  identity_ref:   "employee_id",
  version_col:    "record_id",
  insured_col:    "insured_id",
  value_cols:     &["name", "start_date", "end_date"],
};

const ADDRESS: KindLayout = KindLayout {
  identity_table: "addresses",
  records_table:  "address_records",
  identity_ref:   "address_id",
  version_col:    "record_id",
  insured_col:    "insured_id",
  value_cols:     &["address"],
};

pub fn layout(kind: EntityKind) -> &'static KindLayout {
  match kind {
    EntityKind::Insured => &INSURED,
    EntityKind::Employee => &EMPLOYEE,
    EntityKind::Address => &ADDRESS,
  }
}

/// Which versions a [`select_versions`] query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
  /// Every version of one identity. Binds `?1 = id`.
  Identity,
  /// Every version owned by one insured recorded at or before a cutoff.
  /// Binds `?1 = insured_id`, `?2 = cutoff`.
  OwnedUpTo,
}

/// `SELECT id, insured_id, version_id, record_timestamp, <values...>` for
/// `kind`, oldest version first.
pub fn select_versions(kind: EntityKind, scope: Scope) -> String {
  let l = layout(kind);
  let values = l
    .value_cols
    .iter()
    .map(|c| format!("r.{c}"))
    .collect::<Vec<_>>()
    .join(", ");
  let filter = match scope {
    Scope::Identity => "i.id = ?1".to_owned(),
    Scope::OwnedUpTo => {
      format!("i.{} = ?1 AND r.record_timestamp <= ?2", l.insured_col)
    }
  };
  format!(
    "SELECT i.id, i.{insured}, r.{version}, r.record_timestamp, {values}
     FROM {identity} i
     JOIN {records} r ON r.{reference} = i.id
     WHERE {filter}
     ORDER BY r.record_timestamp, r.{version}",
    insured = l.insured_col,
    version = l.version_col,
    identity = l.identity_table,
    records = l.records_table,
    reference = l.identity_ref,
  )
}

pub fn delete_identity(kind: EntityKind) -> String {
  format!("DELETE FROM {} WHERE id = ?1", layout(kind).identity_table)
}
