//! The write path. Every operation here runs in one `IMMEDIATE` transaction:
//! it checks the current state, appends or deletes, and commits through the
//! caller's [`Deadline`]. Any error drops the transaction, which rolls it
//! back.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior, ffi};
use timetravel_core::{
  EntityKind, Error as CoreError,
  fields::{NewRecord, RecordUpdate},
  kind::Uniqueness,
  record::{
    Address, AddressFields, Employee, EmployeeFields, Insured, InsuredFields,
    VersionRecord,
  },
};
use tracing::warn;

use crate::{
  Error, Result,
  deadline::Deadline,
  encode::{encode_date, encode_ts},
  layout::{delete_identity, layout},
  read,
};

/// First policy number handed out on an empty store.
pub const FIRST_POLICY_NUMBER: i64 = 1000;

// ─── Operations ──────────────────────────────────────────────────────────────

pub fn create(
  conn: &mut Connection,
  deadline: &Deadline,
  input: NewRecord,
  now: DateTime<Utc>,
) -> Result<VersionRecord> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  let record = match input {
    NewRecord::Insured(fields) => insert_insured(&tx, fields, now)?,
    NewRecord::Employee { insured_id, fields } => {
      require_parent(&tx, insured_id)?;
      let name = fields.name.as_str();
      check_unique(&tx, EntityKind::Employee, insured_id, name, None)?;
      insert_employee(&tx, insured_id, fields, now)?
    }
    NewRecord::Address { insured_id, fields } => {
      require_parent(&tx, insured_id)?;
      check_unique(&tx, EntityKind::Address, insured_id, "", None)?;
      insert_address(&tx, insured_id, fields, now)?
    }
  };

  deadline.commit(tx)?;
  Ok(record)
}

pub fn update(
  conn: &mut Connection,
  deadline: &Deadline,
  input: RecordUpdate,
  now: DateTime<Utc>,
) -> Result<VersionRecord> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let insured_id = input.insured_id();
  require_parent(&tx, insured_id)?;

  let record = match input {
    RecordUpdate::Employee {
      employee_id,
      patch,
      ..
    } => {
      let current = read::latest(&tx, EntityKind::Employee, employee_id)?
        .into_employee()
        .ok_or(CoreError::RecordNotFound {
          kind: EntityKind::Employee,
          id:   employee_id,
        })?;
      if current.insured_id != insured_id {
        return Err(
          CoreError::OwnerMismatch {
            kind:      EntityKind::Employee,
            id:        employee_id,
            owner:     current.insured_id,
            requested: insured_id,
          }
          .into(),
        );
      }
      let next = patch.apply(&current.fields())?;
      if next == current.fields() {
        return Err(CoreError::UpdateMustChangeAValue.into());
      }
      if next.name != current.name {
        check_unique(
          &tx,
          EntityKind::Employee,
          insured_id,
          &next.name,
          Some(current.id),
        )?;
      }
      append_employee(&tx, &current, next, now)?
    }
    RecordUpdate::Address { fields, .. } => {
      let address_id: Option<i64> = tx
        .query_row(
          "SELECT id FROM addresses WHERE insured_id = ?1",
          rusqlite::params![insured_id],
          |r| r.get(0),
        )
        .optional()?;
      let Some(address_id) = address_id else {
        return Err(
          CoreError::UseCreateInstead {
            kind: EntityKind::Address,
            insured_id,
          }
          .into(),
        );
      };
      let current = read::latest(&tx, EntityKind::Address, address_id)?
        .into_address()
        .ok_or(CoreError::RecordNotFound {
          kind: EntityKind::Address,
          id:   address_id,
        })?;
      if fields == current.fields() {
        return Err(CoreError::UpdateMustChangeAValue.into());
      }
      append_address(&tx, &current, fields, now)?
    }
  };

  deadline.commit(tx)?;
  Ok(record)
}

pub fn delete(
  conn: &mut Connection,
  deadline: &Deadline,
  kind: EntityKind,
  id: i64,
) -> Result<VersionRecord> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let current = read::latest(&tx, kind, id)?;
  tx.execute(&delete_identity(kind), rusqlite::params![id])?;
  deadline.commit(tx)?;
  Ok(current)
}

// ─── Validation ──────────────────────────────────────────────────────────────

fn require_parent(conn: &Connection, insured_id: i64) -> Result<()> {
  if read::insured_exists(conn, insured_id)? {
    Ok(())
  } else {
    Err(CoreError::NonexistentParent(insured_id).into())
  }
}

/// Application-level half of the natural-key rules; the schema's `UNIQUE`
/// constraints back it up against concurrent creators. Versions of `except`
/// never count against it, so an identity can take back its own old name.
fn check_unique(
  conn: &Connection,
  kind: EntityKind,
  insured_id: i64,
  name: &str,
  except: Option<i64>,
) -> Result<()> {
  let taken = match kind.uniqueness() {
    Uniqueness::None => false,
    Uniqueness::OnePerInsured => conn.query_row(
      &format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE {} = ?1)",
        layout(kind).identity_table,
        layout(kind).insured_col,
      ),
      rusqlite::params![insured_id],
      |r| r.get(0),
    )?,
    Uniqueness::NamePerInsured => conn.query_row(
      "SELECT EXISTS (
         SELECT 1 FROM employees i
         JOIN employee_records r ON r.employee_id = i.id
         WHERE i.insured_id = ?1 AND r.name = ?2
           AND (?3 IS NULL OR i.id != ?3)
       )",
      rusqlite::params![insured_id, name, except],
      |r| r.get(0),
    )?,
  };
  if taken {
    warn!(%kind, insured_id, "duplicate natural key rejected");
    return Err(
      CoreError::AlreadyExists {
        kind,
        detail: duplicate_detail(kind, insured_id, name),
      }
      .into(),
    );
  }
  Ok(())
}

fn duplicate_detail(kind: EntityKind, insured_id: i64, name: &str) -> String {
  match kind.uniqueness() {
    Uniqueness::NamePerInsured => {
      format!(
        "insured {insured_id} already has {} {kind} named {name:?}",
        article(kind)
      )
    }
    Uniqueness::OnePerInsured => {
      format!("insured {insured_id} already has {} {kind}", article(kind))
    }
    Uniqueness::None => "policy number already assigned".to_owned(),
  }
}

fn article(kind: EntityKind) -> &'static str {
  match kind.as_ref().chars().next() {
    Some('a' | 'e' | 'i' | 'o' | 'u') => "an",
    _ => "a",
  }
}

/// Map storage constraint failures onto the domain errors they stand for.
fn constraint(
  kind: EntityKind,
  insured_id: i64,
  name: &str,
) -> impl FnOnce(rusqlite::Error) -> Error + '_ {
  move |e| {
    if let rusqlite::Error::SqliteFailure(failure, _) = &e {
      match failure.extended_code {
        ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
          return CoreError::AlreadyExists {
            kind,
            detail: duplicate_detail(kind, insured_id, name),
          }
          .into();
        }
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
          return CoreError::NonexistentParent(insured_id).into();
        }
        _ => {}
      }
    }
    Error::Sqlite(e)
  }
}

// ─── Inserts ─────────────────────────────────────────────────────────────────

fn insert_insured(
  conn: &Connection,
  fields: InsuredFields,
  now: DateTime<Utc>,
) -> Result<VersionRecord> {
  let policy_number: i64 = conn.query_row(
    "SELECT coalesce(max(policy_number) + 1, ?1) FROM insureds",
    rusqlite::params![FIRST_POLICY_NUMBER],
    |r| r.get(0),
  )?;
  conn
    .execute(
      "INSERT INTO insureds (name, policy_number, record_timestamp)
       VALUES (?1, ?2, ?3)",
      rusqlite::params![fields.name, policy_number, encode_ts(now)],
    )
    .map_err(constraint(EntityKind::Insured, 0, &fields.name))?;

  Ok(VersionRecord::Insured(Insured {
    id: conn.last_insert_rowid(),
    name: fields.name,
    policy_number,
    recorded_at: now,
  }))
}

fn insert_employee(
  conn: &Connection,
  insured_id: i64,
  fields: EmployeeFields,
  now: DateTime<Utc>,
) -> Result<VersionRecord> {
  conn
    .execute(
      "INSERT INTO employees (insured_id, name) VALUES (?1, ?2)",
      rusqlite::params![insured_id, fields.name],
    )
    .map_err(constraint(EntityKind::Employee, insured_id, &fields.name))?;
  let id = conn.last_insert_rowid();
  insert_employee_version(conn, id, insured_id, fields, now)
}

fn insert_employee_version(
  conn: &Connection,
  id: i64,
  insured_id: i64,
  fields: EmployeeFields,
  recorded_at: DateTime<Utc>,
) -> Result<VersionRecord> {
  conn.execute(
    "INSERT INTO employee_records
       (employee_id, name, start_date, end_date, record_timestamp)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    rusqlite::params![
      id,
      fields.name,
      encode_date(fields.start_date),
      fields.end_date.map(encode_date),
      encode_ts(recorded_at),
    ],
  )?;

  Ok(VersionRecord::Employee(Employee {
    id,
    insured_id,
    version_id: conn.last_insert_rowid(),
    name: fields.name,
    start_date: fields.start_date,
    end_date: fields.end_date,
    recorded_at,
  }))
}

fn insert_address(
  conn: &Connection,
  insured_id: i64,
  fields: AddressFields,
  now: DateTime<Utc>,
) -> Result<VersionRecord> {
  conn
    .execute(
      "INSERT INTO addresses (insured_id) VALUES (?1)",
      rusqlite::params![insured_id],
    )
    .map_err(constraint(EntityKind::Address, insured_id, ""))?;
  let id = conn.last_insert_rowid();
  insert_address_version(conn, id, insured_id, fields, now)
}

fn insert_address_version(
  conn: &Connection,
  id: i64,
  insured_id: i64,
  fields: AddressFields,
  recorded_at: DateTime<Utc>,
) -> Result<VersionRecord> {
  conn.execute(
    "INSERT INTO address_records (address_id, address, record_timestamp)
     VALUES (?1, ?2, ?3)",
    rusqlite::params![id, fields.address, encode_ts(recorded_at)],
  )?;

  Ok(VersionRecord::Address(Address {
    id,
    insured_id,
    version_id: conn.last_insert_rowid(),
    address: fields.address,
    recorded_at,
  }))
}

// Versions of one identity never go back in time, even if the clock does.

fn append_employee(
  conn: &Connection,
  current: &Employee,
  next: EmployeeFields,
  now: DateTime<Utc>,
) -> Result<VersionRecord> {
  let at = now.max(current.recorded_at);
  insert_employee_version(conn, current.id, current.insured_id, next, at)
}

fn append_address(
  conn: &Connection,
  current: &Address,
  next: AddressFields,
  now: DateTime<Utc>,
) -> Result<VersionRecord> {
  let at = now.max(current.recorded_at);
  insert_address_version(conn, current.id, current.insured_id, next, at)
}
