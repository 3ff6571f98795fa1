//! Changa: job/contract lifecycle engine for a local-services marketplace.
//!
//! This crate provides the lifecycle state machine that coordinates
//! clients and workers: job publication, proposal selection, deadline
//! sweeps, and dual-confirmation completion with escrow release.
//!
//! # Architecture
//!
//! Changa follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, APIs, etc.)
//!
//! # Modules
//!
//! - [`job`]: Job, proposal, and contract lifecycle coordination

pub mod job;
