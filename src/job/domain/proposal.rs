//! Worker proposals: applications to perform a posted job.

use super::{DoerId, JobId, Money, ProposalId, ProposalStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A worker's application to a job, possibly with a counter-offered price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    id: ProposalId,
    job_id: JobId,
    doer_id: DoerId,
    proposed_price: Money,
    is_counter_offer: bool,
    status: ProposalStatus,
    submitted_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedProposalData {
    /// Persisted proposal identifier.
    pub id: ProposalId,
    /// Job the proposal targets.
    pub job_id: JobId,
    /// Worker who submitted the proposal.
    pub doer_id: DoerId,
    /// Price the worker proposed.
    pub proposed_price: Money,
    /// Whether the price differs from the job's asking price.
    pub is_counter_offer: bool,
    /// Persisted resolution status.
    pub status: ProposalStatus,
    /// Submission timestamp.
    pub submitted_at: DateTime<Utc>,
}

impl Proposal {
    /// Creates a new pending proposal.
    #[must_use]
    pub fn new(
        job_id: JobId,
        doer_id: DoerId,
        proposed_price: Money,
        is_counter_offer: bool,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ProposalId::new(),
            job_id,
            doer_id,
            proposed_price,
            is_counter_offer,
            status: ProposalStatus::Pending,
            submitted_at,
        }
    }

    /// Reconstructs a proposal from persisted storage.
    #[must_use]
    pub const fn from_persisted(data: PersistedProposalData) -> Self {
        Self {
            id: data.id,
            job_id: data.job_id,
            doer_id: data.doer_id,
            proposed_price: data.proposed_price,
            is_counter_offer: data.is_counter_offer,
            status: data.status,
            submitted_at: data.submitted_at,
        }
    }

    /// Returns the proposal identifier.
    #[must_use]
    pub const fn id(&self) -> ProposalId {
        self.id
    }

    /// Returns the job the proposal targets.
    #[must_use]
    pub const fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Returns the worker who submitted the proposal.
    #[must_use]
    pub const fn doer_id(&self) -> DoerId {
        self.doer_id
    }

    /// Returns the proposed price.
    #[must_use]
    pub const fn proposed_price(&self) -> Money {
        self.proposed_price
    }

    /// Returns true when the price differs from the job's asking price.
    #[must_use]
    pub const fn is_counter_offer(&self) -> bool {
        self.is_counter_offer
    }

    /// Returns the resolution status.
    #[must_use]
    pub const fn status(&self) -> ProposalStatus {
        self.status
    }

    /// Returns the submission timestamp.
    #[must_use]
    pub const fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    /// Returns true while the proposal awaits resolution.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.status, ProposalStatus::Pending)
    }

    /// Marks the proposal approved. Resolution is recorded once; repeat
    /// calls on a resolved proposal are ignored by callers that check
    /// [`Proposal::is_pending`] first.
    pub const fn approve(&mut self) {
        self.status = ProposalStatus::Approved;
    }

    /// Marks the proposal rejected.
    pub const fn reject(&mut self) {
        self.status = ProposalStatus::Rejected;
    }
}
