//! Unit tests for the job module.
//!
//! Tests are organised by concern: pure domain behaviour, the status
//! state machines, and each orchestration service against the in-memory
//! adapters.

pub mod support;

mod confirmation_tests;
mod sweep_tests;
