//! Repository port for job, contract, and proposal persistence.
//!
//! Mutations are optimistic: callers submit the version they loaded, and
//! the adapter rejects the write when another writer got there first. The
//! loser re-reads and re-decides, which is what makes deadline sweeps and
//! concurrent confirmations idempotent.

use crate::job::domain::{Contract, ContractId, Job, JobId, Proposal, ProposalId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// A worker selection applied as one atomic unit: the versioned job
/// update, the new contract, the approved proposal, and any proposals
/// rejected because the team filled.
///
/// Routing both explicit selection and deadline auto-selection through
/// this single commit is what keeps the two from filling the same slot.
#[derive(Debug, Clone)]
pub struct SelectionCommit {
    /// Job with the worker added, carrying its bumped version.
    pub job: Job,
    /// Version the job held when the caller loaded it.
    pub job_expected_version: i64,
    /// Contract created from the approved proposal.
    pub contract: Contract,
    /// The proposal that was approved.
    pub approved: Proposal,
    /// Proposals rejected because no slots remain.
    pub rejected: Vec<Proposal>,
}

/// Time thresholds the deadline sweep asks the repository to filter by.
///
/// The policy arithmetic stays in the service; the repository only
/// compares stored timestamps against the precomputed cutoffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepCriteria {
    /// Jobs whose start date is at or before this instant have reached
    /// their selection deadline.
    pub start_cutoff: DateTime<Utc>,
    /// Paused jobs paused at or before this instant are due to resume.
    pub paused_before: DateTime<Utc>,
}

/// Persistence contract for the marketplace lifecycle.
#[async_trait]
pub trait MarketplaceRepository: Send + Sync {
    /// Stores a new job.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::DuplicateJob`] when the identifier
    /// already exists.
    async fn store_job(&self, job: &Job) -> RepositoryResult<()>;

    /// Finds a job by identifier. Returns `None` when absent.
    async fn find_job(&self, id: JobId) -> RepositoryResult<Option<Job>>;

    /// Persists changes to an existing job.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::JobNotFound`] when the job does not
    /// exist or [`RepositoryError::JobVersionConflict`] when the stored
    /// version no longer matches `expected_version`.
    async fn update_job(&self, job: &Job, expected_version: i64) -> RepositoryResult<()>;

    /// Removes an unpublished job. Draft-only enforcement lives in the
    /// service; the repository removes unconditionally.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::JobNotFound`] when the job does not
    /// exist.
    async fn delete_job(&self, id: JobId) -> RepositoryResult<()>;

    /// Stores a new proposal.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::DuplicateProposal`] when the identifier
    /// already exists.
    async fn store_proposal(&self, proposal: &Proposal) -> RepositoryResult<()>;

    /// Finds a proposal by identifier. Returns `None` when absent.
    async fn find_proposal(&self, id: ProposalId) -> RepositoryResult<Option<Proposal>>;

    /// Returns every proposal submitted to the given job, oldest first.
    async fn proposals_by_job(&self, job_id: JobId) -> RepositoryResult<Vec<Proposal>>;

    /// Persists changes to an existing proposal.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::ProposalNotFound`] when the proposal
    /// does not exist.
    async fn update_proposal(&self, proposal: &Proposal) -> RepositoryResult<()>;

    /// Finds a contract by identifier. Returns `None` when absent.
    async fn find_contract(&self, id: ContractId) -> RepositoryResult<Option<Contract>>;

    /// Returns every contract created for the given job.
    async fn contracts_by_job(&self, job_id: JobId) -> RepositoryResult<Vec<Contract>>;

    /// Persists changes to an existing contract.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::ContractNotFound`] when the contract
    /// does not exist or [`RepositoryError::ContractVersionConflict`]
    /// when the stored version no longer matches `expected_version`.
    async fn update_contract(
        &self,
        contract: &Contract,
        expected_version: i64,
    ) -> RepositoryResult<()>;

    /// Applies a worker selection atomically: versioned job update,
    /// contract insert, proposal resolution.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::JobVersionConflict`] when another
    /// writer updated the job first; no part of the commit is applied.
    async fn commit_selection(&self, commit: SelectionCommit) -> RepositoryResult<()>;

    /// Returns jobs the deadline sweep should evaluate: open jobs whose
    /// start date is at or before the start cutoff, and paused jobs that
    /// are due to resume or whose selection deadline has arrived.
    async fn jobs_due_for_sweep(&self, criteria: SweepCriteria) -> RepositoryResult<Vec<Job>>;
}

/// Errors returned by repository implementations.
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    /// A job with the same identifier already exists.
    #[error("duplicate job identifier: {0}")]
    DuplicateJob(JobId),

    /// A proposal with the same identifier already exists.
    #[error("duplicate proposal identifier: {0}")]
    DuplicateProposal(ProposalId),

    /// A contract with the same identifier already exists.
    #[error("duplicate contract identifier: {0}")]
    DuplicateContract(ContractId),

    /// The job was not found.
    #[error("job not found: {0}")]
    JobNotFound(JobId),

    /// The proposal was not found.
    #[error("proposal not found: {0}")]
    ProposalNotFound(ProposalId),

    /// The contract was not found.
    #[error("contract not found: {0}")]
    ContractNotFound(ContractId),

    /// Another writer updated the job since it was loaded.
    #[error("job {0} was modified concurrently")]
    JobVersionConflict(JobId),

    /// Another writer updated the contract since it was loaded.
    #[error("contract {0} was modified concurrently")]
    ContractVersionConflict(ContractId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl RepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
