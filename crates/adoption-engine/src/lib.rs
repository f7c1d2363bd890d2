//! Adoption workflow engine.
//!
//! Validates adoption requests against catalog availability, decides acceptance from requester
//! history, and tracks each accepted adoption from `preparation` to `success` through persisted
//! deferred transitions.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
