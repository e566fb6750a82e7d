#![forbid(unsafe_code)]
//! Core data layer for portdb.
//!
//! Holds the package/status model, the immutable [`facts::FactStore`],
//! loading from data directories and configuration. Derivation lives in
//! `portdb-engine`.

pub mod config;
pub mod error;
pub mod facts;
pub mod load;
pub mod model;
