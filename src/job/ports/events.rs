//! Outbound event port for the payment and notification collaborators.
//!
//! The lifecycle core emits events; delivering them (push notification,
//! chat, payment gateway call) is an external concern behind this port.

use crate::job::domain::{
    ContractId, DoerId, JobId, JobStatus, Money, PaymentBreakdown, ProposalId,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Result type for event publication.
pub type EventResult<T> = Result<T, EventSinkError>;

/// Domain events emitted by the lifecycle services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// A worker applied to a job.
    ProposalSubmitted {
        /// Job the proposal targets.
        job_id: JobId,
        /// The new proposal.
        proposal_id: ProposalId,
        /// Worker who applied.
        doer_id: DoerId,
    },

    /// A proposal was approved or rejected.
    ProposalResolved {
        /// Job the proposal targeted.
        job_id: JobId,
        /// The resolved proposal.
        proposal_id: ProposalId,
        /// True when approved, false when rejected.
        approved: bool,
    },

    /// A contract was created from an approved proposal.
    ContractCreated {
        /// Job the contract belongs to.
        job_id: JobId,
        /// The new contract.
        contract_id: ContractId,
        /// Worker under contract.
        doer_id: DoerId,
    },

    /// A job's details changed without a status transition.
    JobUpdated {
        /// Job that changed.
        job_id: JobId,
    },

    /// A job moved to a new lifecycle status.
    JobStatusChanged {
        /// Job that changed.
        job_id: JobId,
        /// Status before the change.
        from: JobStatus,
        /// Status after the change.
        to: JobStatus,
    },

    /// A job was cancelled, with its refund consequences.
    JobCancelled {
        /// Cancelled job.
        job_id: JobId,
        /// Recorded reason.
        reason: String,
        /// Whether the held price is refunded in full.
        price_refunded: bool,
        /// Publication commission forfeited, if any.
        commission_forfeited: Option<Money>,
    },

    /// A budget increase needs a supplemental payment.
    SupplementalPaymentRequested {
        /// Job the increase applies to.
        job_id: JobId,
        /// Amounts owed.
        breakdown: PaymentBreakdown,
    },

    /// Both parties confirmed a contract; escrow may be released.
    EscrowReleaseRequested {
        /// Job the contract belongs to.
        job_id: JobId,
        /// Completed contract.
        contract_id: ContractId,
        /// Amount to release to the worker.
        amount: Money,
    },

    /// Every contract of a job is confirmed complete.
    JobCompleted {
        /// Completed job.
        job_id: JobId,
    },
}

/// Delivery contract for lifecycle events.
#[async_trait]
pub trait LifecycleEventSink: Send + Sync {
    /// Publishes one event to the external collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`EventSinkError::Delivery`] when the underlying transport
    /// rejects the event.
    async fn publish(&self, event: LifecycleEvent) -> EventResult<()>;
}

/// Errors returned by event sink implementations.
#[derive(Debug, Clone, Error)]
pub enum EventSinkError {
    /// The transport failed to accept the event.
    #[error("event delivery failed: {0}")]
    Delivery(Arc<dyn std::error::Error + Send + Sync>),
}

impl EventSinkError {
    /// Wraps a transport error.
    pub fn delivery(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Delivery(Arc::new(err))
    }
}
