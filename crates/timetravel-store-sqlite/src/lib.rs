//! SQLite backend for the timetravel insured store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Reads and writes each run as one
//! transaction; writes take the lock up front (`BEGIN IMMEDIATE`).

mod deadline;
mod encode;
mod layout;
mod read;
mod schema;
mod store;
mod write;

pub mod error;

pub use error::{Error, Result};
pub use store::{Clock, SqliteStore};
pub use write::FIRST_POLICY_NUMBER;
