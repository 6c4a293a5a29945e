//! Integration test aggregator.
//!
//! Scenario modules live in `suite/`; fakes for every collaborator live in `common/`.

mod common;
mod suite;
