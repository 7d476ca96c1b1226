//! SQL schema for the timetravel SQLite store.
//!
//! Applied at connection startup. The schema version is stamped into
//! `PRAGMA user_version`; a database stamped by a newer build is refused.

/// The version [`SCHEMA`] stamps.
pub const SCHEMA_VERSION: i64 = 1;

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Timestamps are Unix epoch seconds. Employee dates are `YYYY-MM-DD` text.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- An insured is its own (only) version.
CREATE TABLE IF NOT EXISTS insureds (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    name             TEXT    NOT NULL,
    policy_number    INTEGER NOT NULL UNIQUE,
    record_timestamp INTEGER NOT NULL
);

-- Employee identities. `name` is the name at creation; it backs the
-- one-employee-per-name rule for concurrent creators.
CREATE TABLE IF NOT EXISTS employees (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    insured_id INTEGER NOT NULL REFERENCES insureds(id) ON DELETE CASCADE,
    name       TEXT    NOT NULL,
    UNIQUE (insured_id, name)
);

-- Append-only; rows leave only when their employee is deleted.
CREATE TABLE IF NOT EXISTS employee_records (
    record_id        INTEGER PRIMARY KEY AUTOINCREMENT,
    employee_id      INTEGER NOT NULL REFERENCES employees(id) ON DELETE CASCADE,
    name             TEXT    NOT NULL,
    start_date       TEXT    NOT NULL,
    end_date         TEXT,
    record_timestamp INTEGER NOT NULL
);

-- At most one address identity per insured.
CREATE TABLE IF NOT EXISTS addresses (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    insured_id INTEGER NOT NULL UNIQUE REFERENCES insureds(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS address_records (
    record_id        INTEGER PRIMARY KEY AUTOINCREMENT,
    address_id       INTEGER NOT NULL REFERENCES addresses(id) ON DELETE CASCADE,
    address          TEXT    NOT NULL,
    record_timestamp INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS employee_records_owner_idx
    ON employee_records(employee_id, record_timestamp);
CREATE INDEX IF NOT EXISTS employee_records_name_idx
    ON employee_records(name);
CREATE INDEX IF NOT EXISTS address_records_owner_idx
    ON address_records(address_id, record_timestamp);

PRAGMA user_version = 1;
";
