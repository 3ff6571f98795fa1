//! Orchestration services for the job/contract lifecycle.
//!
//! Services load aggregates through the repository port, apply domain
//! decisions, persist with optimistic version checks, and emit events to
//! the outbound port. They hold no business rules of their own.

mod confirmation;
mod lifecycle;
mod sweep;

pub use confirmation::{ConfirmationMatrix, ConfirmationRow, ConfirmationService};
pub use lifecycle::{JobLifecycleService, PostJobRequest, SubmitProposalRequest};
pub use sweep::{DeadlineSweep, SweepReport};

use crate::job::{
    domain::LifecycleError,
    ports::{EventSinkError, RepositoryError},
};
use thiserror::Error;

/// Service-level errors for lifecycle operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A domain rule rejected the action.
    #[error(transparent)]
    Domain(#[from] LifecycleError),
    /// Persistence failed or the aggregate was modified concurrently.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    /// Event publication failed.
    #[error(transparent)]
    Events(#[from] EventSinkError),
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
