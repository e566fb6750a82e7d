#![forbid(unsafe_code)]
//! Derivation engine for portdb.
//!
//! Takes an immutable [`portdb_core::facts::FactStore`] and derives a
//! [`snapshot::DerivedSnapshot`]: package statuses, group closures, naming
//! buckets and porting tiers.
//!
//! # Conventions
//!
//! - **Errors**: library functions return [`portdb_core::error::PortdbError`].
//! - **Logging**: `tracing` macros; pipeline stages are `#[instrument]`ed.

pub mod classify;
pub mod graph;
pub mod naming;
pub mod snapshot;
pub mod tree;

pub use snapshot::{DerivedSnapshot, SnapshotCell, derive};
