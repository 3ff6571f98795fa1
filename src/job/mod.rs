//! Job/contract lifecycle for the Changa marketplace.
//!
//! This module centralizes every status transition, deadline rule, and
//! dual-confirmation decision the marketplace makes about a job and its
//! contracts: publication, worker selection (explicit and deadline-driven),
//! budget changes, pausing and cancellation, and escrow-gated completion.
//! The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
