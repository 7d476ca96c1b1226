//! The SQLite implementation of [`InsuredStore`].

use std::{path::Path, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use rusqlite::InterruptHandle;
use timetravel_core::{
  EntityKind,
  fields::{NewRecord, RecordUpdate},
  instant::truncate_to_second,
  record::{Insured, InsuredView, VersionRecord},
  store::{InsuredFilter, InsuredStore},
};
use tracing::{debug, warn};

use crate::{
  Error, Result,
  deadline::{Deadline, Expiry},
  read,
  schema::{SCHEMA, SCHEMA_VERSION},
  write,
};

/// Source of record timestamps.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A versioned insured store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:      tokio_rusqlite::Connection,
  interrupt: Arc<InterruptHandle>,
  clock:     Clock,
  timeout:   Option<Duration>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let (found, interrupt) = conn
      .call(|conn| {
        let found: i64 =
          conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
        if found <= SCHEMA_VERSION {
          conn.execute_batch(SCHEMA)?;
        }
        Ok((found, conn.get_interrupt_handle()))
      })
      .await?;

    if found > SCHEMA_VERSION {
      return Err(Error::UnsupportedSchema {
        found,
        supported: SCHEMA_VERSION,
      });
    }

    Ok(Self {
      conn,
      interrupt: Arc::new(interrupt),
      clock: Arc::new(Utc::now),
      timeout: None,
    })
  }

  /// Replace the source of record timestamps. Readings are truncated to
  /// whole seconds.
  pub fn with_clock(
    mut self,
    clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static,
  ) -> Self {
    self.clock = Arc::new(clock);
    self
  }

  /// Abandon any operation that takes longer than `timeout`. The running
  /// statement is interrupted and its transaction rolled back.
  pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
    self.timeout = timeout;
    self
  }

  /// Run `f` on the connection thread under this store's deadline.
  pub(crate) async fn run<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&mut rusqlite::Connection, &Deadline) -> Result<T>
      + Send
      + 'static,
  {
    let deadline = Deadline::new(self.timeout);
    let ticket = deadline.clone();
    let call = self.conn.call(move |conn| {
      let outcome = ticket.begin().and_then(|()| f(conn, &ticket));
      Ok(ticket.finish(outcome))
    });

    let Some(limit) = self.timeout else {
      return call.await?;
    };

    let mut call = std::pin::pin!(call);
    match tokio::time::timeout(limit, &mut call).await {
      Ok(outcome) => outcome?,
      Err(_) => match deadline.expire(&self.interrupt) {
        Expiry::Cancelled => {
          warn!(?limit, "store call cancelled before it started");
          Err(deadline.error())
        }
        Expiry::Interrupted => {
          warn!(?limit, "store call interrupted");
          call.await?
        }
        Expiry::AlreadyDone => call.await?,
      },
    }
  }
}

// ─── InsuredStore impl ───────────────────────────────────────────────────────

impl InsuredStore for SqliteStore {
  type Error = Error;

  fn now(&self) -> DateTime<Utc> { truncate_to_second((self.clock)()) }

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn create(&self, input: NewRecord) -> Result<VersionRecord> {
    let kind = input.kind();
    let now = self.now();
    let record = self
      .run(move |conn, deadline| write::create(conn, deadline, input, now))
      .await?;
    debug!(%kind, id = record.id(), insured_id = record.insured_id(), "created");
    Ok(record)
  }

  async fn update(&self, input: RecordUpdate) -> Result<VersionRecord> {
    let kind = input.kind();
    let now = self.now();
    let record = self
      .run(move |conn, deadline| write::update(conn, deadline, input, now))
      .await?;
    debug!(
      %kind,
      id = record.id(),
      version_id = record.version_id(),
      "appended version"
    );
    Ok(record)
  }

  async fn delete(&self, kind: EntityKind, id: i64) -> Result<VersionRecord> {
    let record = self
      .run(move |conn, deadline| write::delete(conn, deadline, kind, id))
      .await?;
    debug!(%kind, id, "deleted");
    Ok(record)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_latest(&self, kind: EntityKind, id: i64) -> Result<VersionRecord> {
    self
      .run(move |conn, _| {
        let tx = conn.transaction()?;
        read::latest(&tx, kind, id)
      })
      .await
  }

  async fn history(&self, kind: EntityKind, id: i64) -> Result<Vec<VersionRecord>> {
    let versions = self
      .run(move |conn, _| {
        let tx = conn.transaction()?;
        read::versions(&tx, kind, id)
      })
      .await?;
    if versions.is_empty() {
      return Err(timetravel_core::Error::RecordNotFound { kind, id }.into());
    }
    Ok(versions)
  }

  async fn select_as_of(
    &self,
    kind: EntityKind,
    insured_id: i64,
    at: DateTime<Utc>,
  ) -> Result<Vec<VersionRecord>> {
    let at = truncate_to_second(at);
    self
      .run(move |conn, _| {
        let tx = conn.transaction()?;
        read::select_as_of(&tx, kind, insured_id, at)
      })
      .await
  }

  async fn assemble(
    &self,
    insured_id: i64,
    at: DateTime<Utc>,
  ) -> Result<InsuredView> {
    let at = truncate_to_second(at);
    let view = self
      .run(move |conn, _| {
        let tx = conn.transaction()?;
        read::assemble(&tx, insured_id, at)
      })
      .await?;
    debug!(
      insured_id,
      %at,
      employees = view.employees.len(),
      addresses = view.addresses.len(),
      "assembled"
    );
    Ok(view)
  }

  async fn list_insureds(&self, filter: &InsuredFilter) -> Result<Vec<Insured>> {
    let filter = filter.clone();
    self
      .run(move |conn, _| {
        let tx = conn.transaction()?;
        read::list_insureds(&tx, &filter)
      })
      .await
  }
}
