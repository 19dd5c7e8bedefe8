//! # ChronoDB Configuration Module
//!
//! This module centralizes the tunables of the query execution core. Constants
//! are grouped by functional area and their interdependencies are enforced
//! through compile-time assertions.
//!
//! ## Module Organization
//!
//! - [`constants`]: Numeric defaults with dependency documentation
//! - [`query`]: Per-plan-node settings ([`QueryConfig`]) validated before execution

pub mod constants;
mod query;

pub use constants::*;
pub use query::QueryConfig;
