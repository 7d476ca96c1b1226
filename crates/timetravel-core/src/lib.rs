//! Core types and trait definitions for the timetravel record store.
//!
//! Insureds own employees and addresses. Every change to an employee or an
//! address is kept as a new immutable version, so the store can answer "what
//! did this insured look like at instant T". This crate holds the domain
//! model, the point-in-time selection rules and the [`store::InsuredStore`]
//! abstraction; it has no HTTP or database dependencies.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod fields;
pub mod instant;
pub mod kind;
pub mod record;
pub mod store;
pub mod timeline;

pub use error::{Classify, Error, ErrorKind, Result};
pub use kind::EntityKind;
