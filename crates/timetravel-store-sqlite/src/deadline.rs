//! Per-operation deadlines for calls running on the connection thread.
//!
//! The async side and the connection thread share one [`Deadline`]. When the
//! async side gives up it calls [`Deadline::expire`]: a call still waiting in
//! the connection's queue is cancelled before it starts, and a running one
//! has its current statement interrupted. Commits take the same lock, so a
//! transaction either commits before expiry or never does.

use std::{
  sync::{Arc, Mutex, MutexGuard, PoisonError},
  time::Duration,
};

use rusqlite::{InterruptHandle, Transaction};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
  Queued,
  Running,
  /// Expired while running; the closure must not commit.
  Interrupted,
  /// Expired before the closure started; it must not start.
  Cancelled,
  Done,
}

/// What [`Deadline::expire`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
  /// The call never started and never will.
  Cancelled,
  /// The call was running and has been interrupted; its result is an error.
  Interrupted,
  /// The call finished first; its result stands.
  AlreadyDone,
}

#[derive(Clone)]
pub struct Deadline {
  phase: Arc<Mutex<Phase>>,
  limit: Option<Duration>,
}

impl Deadline {
  pub fn new(limit: Option<Duration>) -> Self {
    Self {
      phase: Arc::new(Mutex::new(Phase::Queued)),
      limit,
    }
  }

  fn lock(&self) -> MutexGuard<'_, Phase> {
    self.phase.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn exceeded(&self) -> Error {
    Error::DeadlineExceeded(self.limit.unwrap_or_default())
  }

  /// Called on the connection thread before any work.
  pub fn begin(&self) -> Result<()> {
    let mut phase = self.lock();
    match *phase {
      Phase::Queued => {
        *phase = Phase::Running;
        Ok(())
      }
      _ => Err(self.exceeded()),
    }
  }

  /// Commit `tx` unless the deadline has already passed.
  pub fn commit(&self, tx: Transaction<'_>) -> Result<()> {
    let mut phase = self.lock();
    if *phase != Phase::Running {
      return Err(self.exceeded());
    }
    tx.commit()?;
    *phase = Phase::Done;
    Ok(())
  }

  /// Called on the connection thread with the closure's result. Any failure
  /// after an interrupt is reported as the deadline.
  pub fn finish<T>(&self, outcome: Result<T>) -> Result<T> {
    let mut phase = self.lock();
    let interrupted = *phase == Phase::Interrupted;
    *phase = Phase::Done;
    match outcome {
      Err(_) if interrupted => Err(self.exceeded()),
      other => other,
    }
  }

  /// Called on the async side once the limit has elapsed.
  pub fn expire(&self, interrupt: &InterruptHandle) -> Expiry {
    let mut phase = self.lock();
    match *phase {
      Phase::Queued => {
        *phase = Phase::Cancelled;
        Expiry::Cancelled
      }
      Phase::Running => {
        *phase = Phase::Interrupted;
        interrupt.interrupt();
        Expiry::Interrupted
      }
      Phase::Interrupted | Phase::Cancelled => Expiry::Interrupted,
      Phase::Done => Expiry::AlreadyDone,
    }
  }

  pub fn error(&self) -> Error { self.exceeded() }
}
