//! Error taxonomy for lifecycle and confirmation decisions.
//!
//! Every condition here is local and recoverable: the caller surfaces a
//! human-readable message and re-initiates the action once the condition
//! is resolved. A failed transition never leaves partial mutation behind.

use super::{
    ContractId, ContractStatus, DoerId, JobId, JobStatus, Money, PartyRole, ProposalId,
    ProposalStatus, TeamSize,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Client- or system-initiated action attempted on a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobAction {
    /// Confirm the publication payment.
    ConfirmPayment,
    /// Approve the publication after payment.
    ApprovePublication,
    /// Pause an open job.
    Pause,
    /// Resume a paused or suspended job.
    Resume,
    /// Cancel the job.
    Cancel,
    /// Delete an unpublished job.
    Delete,
    /// Submit a worker proposal.
    SubmitProposal,
    /// Select a worker's proposal.
    SelectWorker,
    /// Change the job budget.
    ChangeBudget,
    /// Confirm a supplemental budget payment.
    ConfirmSupplement,
    /// Suspend a flexible-end job at its selection deadline.
    Suspend,
    /// Supply an end date to lift a suspension.
    SetEndDate,
    /// Accept a contract as the doer.
    AcceptContract,
    /// Begin work under an accepted contract.
    StartWork,
    /// Confirm completion of a contract.
    Confirm,
}

impl JobAction {
    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConfirmPayment => "confirm_payment",
            Self::ApprovePublication => "approve_publication",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Cancel => "cancel",
            Self::Delete => "delete",
            Self::SubmitProposal => "submit_proposal",
            Self::SelectWorker => "select_worker",
            Self::ChangeBudget => "change_budget",
            Self::ConfirmSupplement => "confirm_supplement",
            Self::Suspend => "suspend",
            Self::SetEndDate => "set_end_date",
            Self::AcceptContract => "accept_contract",
            Self::StartWork => "start_work",
            Self::Confirm => "confirm",
        }
    }
}

/// Breakdown of a supplemental payment owed on a budget increase.
///
/// This is the payload an HTTP layer maps onto a 402 response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentBreakdown {
    /// Price currently in force.
    pub current_price: Money,
    /// Price requested by the client.
    pub new_price: Money,
    /// Additional amount that must be paid before the increase applies.
    pub supplement: Money,
}

/// Resource through which a rejected action must be performed instead.
///
/// This is the payload an HTTP layer maps onto a 400 response carrying a
/// `redirectTo` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RedirectTarget {
    /// The change must go through a contract-level budget amendment.
    ContractAmendment {
        /// Contract the amendment applies to.
        contract_id: ContractId,
    },
}

/// Errors returned by lifecycle and confirmation decision logic.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LifecycleError {
    /// The action is not permitted in the job's current status or time
    /// window.
    #[error("action '{}' is not allowed while job {job_id} is {}", action.as_str(), status.as_str())]
    InvalidTransition {
        /// Job the action was attempted on.
        job_id: JobId,
        /// Status the job held when the action was rejected.
        status: JobStatus,
        /// Action that was attempted.
        action: JobAction,
    },

    /// The contract is not in a state that accepts the action.
    #[error(
        "contract {contract_id} is {} and cannot accept '{}'",
        status.as_str(),
        action.as_str()
    )]
    InvalidContractState {
        /// Contract the action was attempted on.
        contract_id: ContractId,
        /// Status the contract held when the action was rejected.
        status: ContractStatus,
        /// Action that was attempted.
        action: JobAction,
    },

    /// Selecting another worker would exceed the team capacity.
    #[error("job {job_id} already has all {max_workers} worker slots filled")]
    CapacityExceeded {
        /// Job whose team is full.
        job_id: JobId,
        /// Configured team capacity.
        max_workers: TeamSize,
    },

    /// The proposal was already approved or rejected.
    #[error("proposal {proposal_id} is already {}", status.as_str())]
    ProposalAlreadyResolved {
        /// Proposal the action targeted.
        proposal_id: ProposalId,
        /// Resolution the proposal already holds.
        status: ProposalStatus,
    },

    /// The worker is already part of the job's selected team.
    #[error("worker {doer_id} is already selected for job {job_id}")]
    WorkerAlreadySelected {
        /// Job the selection targeted.
        job_id: JobId,
        /// Worker who was already selected.
        doer_id: DoerId,
    },

    /// The same party attempted to confirm a contract twice.
    #[error("contract {contract_id} is already confirmed by the {}", actor.as_str())]
    AlreadyConfirmed {
        /// Contract the duplicate confirmation targeted.
        contract_id: ContractId,
        /// Party that had already confirmed.
        actor: PartyRole,
    },

    /// Confirmation was attempted before the window opened.
    #[error("confirmation window for contract {contract_id} opens at {opens_at}")]
    WindowNotOpen {
        /// Contract the confirmation targeted.
        contract_id: ContractId,
        /// Instant the window opens.
        opens_at: DateTime<Utc>,
    },

    /// A supplemental payment must complete before the action applies.
    #[error(
        "supplemental payment of {} required before the budget increase applies",
        breakdown.supplement
    )]
    PaymentRequired {
        /// Amounts owed for the pending increase.
        breakdown: PaymentBreakdown,
    },

    /// The action must be performed through a different resource.
    #[error("action must be performed through a different resource")]
    RedirectRequired {
        /// Resource the caller is redirected to.
        target: RedirectTarget,
    },

    /// The supplied pairing code did not match or has expired.
    #[error("pairing code rejected for contract {contract_id}")]
    PairingRejected {
        /// Contract the verification targeted.
        contract_id: ContractId,
    },

    /// A job team must allow at least one worker.
    #[error("team size must be at least one worker")]
    EmptyTeam,

    /// Prices must be strictly positive.
    #[error("price must be positive, got {0}")]
    NonPositivePrice(Money),

    /// A monetary computation overflowed.
    #[error("monetary amount overflowed")]
    AmountOverflow,

    /// The end date precedes the start date.
    #[error("end date {end} precedes start date {start}")]
    DatesOutOfOrder {
        /// Scheduled start.
        start: DateTime<Utc>,
        /// Scheduled end.
        end: DateTime<Utc>,
    },
}

/// Error returned while parsing job statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown job status: {0}")]
pub struct ParseJobStatusError(pub String);

/// Error returned while parsing contract statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown contract status: {0}")]
pub struct ParseContractStatusError(pub String);

/// Error returned while parsing proposal statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown proposal status: {0}")]
pub struct ParseProposalStatusError(pub String);

/// Error returned while parsing party roles from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown party role: {0}")]
pub struct ParsePartyRoleError(pub String);
